//! Derives the roles a user holds with respect to a record.
//!
//! The acting user always holds a site role. Scoped roles are found through the cross-link
//! tables, but only for the scopes the rules under consideration actually mention. A scope table
//! relates to the table under test in one of three ways:
//!
//! * *own*: the record itself is a scope record, look up the user's cross-link to it.
//! * *master*: a scope record owns the record, walk up the master fields to find it.
//! * *detail*: the record owns scope records, enumerate them and collect every cross-link.
//!
//! New records have no id yet, so only their masters are consulted.

use crate::authority::Authority;
use crate::role::Scope;
use crate::rules::{RoleMap, Relation};
use crate::store::{Record, RecordStore};
use log::{debug, trace, warn};
use std::borrow::Cow;
use std::collections::BTreeSet;

impl<'a, S: RecordStore + ?Sized> Authority<'a, S> {

    /// The roles of the acting user relevant for the given rules on a record, or on a new record
    /// with the given masters if `record` is None.
    pub(crate) fn roles_for<'m, I>(&self, table: &str, record: Option<&Record>, masters: &[(&str, &str)], rules: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'m RoleMap>,
    {
        let mut roles = BTreeSet::new();

        roles.insert(self.site_role().to_string());

        let user = match &self.user {
            Some(user) => user,
            None       => {
                trace!("    logged out, no scoped roles");
                return roles;
            }, // None
        }; // match

        let hierarchy = self.rules.roles();
        let scopes: BTreeSet<Scope> = rules.into_iter()
            .flat_map(|permissions| permissions.iter())
            .filter(|(_, permission)| !permission.is_void())
            .filter_map(|(role, _)| hierarchy.scope_of(role))
            .filter(|scope| *scope != Scope::Site)
            .collect();

        for scope in scopes {
            let scope_table = scope.table();

            match self.rules.relation(table, scope_table) {
                Relation::Own => {
                    if let Some(record) = record {
                        roles.extend(self.link_role(&user.id, scope_table, record.id()));
                    } // if
                }, // Own
                Relation::Master(path) => {
                    if let Some(id) = self.master_id(table, record, masters, &path) {
                        roles.extend(self.link_role(&user.id, scope_table, &id));
                    } // if
                }, // Master
                Relation::Detail(path) => {
                    if let Some(record) = record {
                        for id in self.detail_ids(table, record, &path) {
                            roles.extend(self.link_role(&user.id, scope_table, &id));
                        } // for
                    } // if
                }, // Detail
                Relation::Unrelated => warn!("{} roles do not relate to {}", scope, table),
            } // match
        } // for

        trace!("    roles of {} on {}: {:?}", user.id, table, roles);
        roles
    } // roles_for

    /// The role a user holds on one record of a scope table, read from its cross-link.
    pub(crate) fn link_role(&self, user: &str, scope_table: &str, id: &str) -> Option<String> {
        let scope = Scope::from_table(scope_table)?;
        let link  = match self.rules.link_of(scope_table) {
            Some(link) => link,
            None       => {
                warn!("no cross-link table for {}", scope_table);
                return None;
            }, // None
        }; // match

        let links     = self.store.get_records_where(&link.table, &[(link.user.as_str(), user), (link.record.as_str(), id)]);
        let hierarchy = self.rules.roles();

        if links.len() > 1 {
            warn!("{} cross-links between {} and {}/{}, taking the strongest", links.len(), user, scope_table, id);
        } // if

        let role = links.iter()
            .filter_map(|record| record.field(&link.role))
            .filter_map(|role| match hierarchy.rank(scope, role) {
                Some(rank) => Some((rank, role)),
                None       => {
                    warn!("cross-link of {} to {}/{} holds unknown role {}", user, scope_table, id, role);
                    None
                }, // None
            })
            .min()
            .map(|(_, role)| role.to_string());

        trace!("    {} on {}/{}: {:?}", user, scope_table, id, role);
        role
    } // link_role

    /// Walks up `path` from the record and returns the id of the last table on the path. For a
    /// new record the walk starts at the farthest master whose id was supplied.
    fn master_id(&self, table: &str, record: Option<&Record>, masters: &[(&str, &str)], path: &[String]) -> Option<String> {
        let mut current       = record.map(Cow::Borrowed);
        let mut current_table = table;
        let mut start         = 0;

        let supplied = path.iter().enumerate().rev().find_map(|(i, t)| {
            masters.iter().find(|(m, _)| *m == t.as_str()).map(|(_, id)| (i, *id))
        });

        if let Some((i, id)) = supplied {
            if i + 1 == path.len() {
                return Some(id.to_string());
            } // if
            current       = Some(Cow::Owned(self.fetch(&path[i], id)?));
            current_table = path[i].as_str();
            start         = i + 1;
        } // if

        for (i, next) in path.iter().enumerate().skip(start) {
            let link   = self.rules.master_of(current_table)?;
            let source = current.as_ref()?;
            let id     = match source.field(&link.field) {
                Some(id) => id.to_string(),
                None     => {
                    debug!("{}/{} has no {}", current_table, source.id(), link.field);
                    return None;
                }, // None
            }; // match

            if i + 1 == path.len() {
                return Some(id);
            } // if
            current       = Some(Cow::Owned(self.fetch(next, &id)?));
            current_table = next.as_str();
        } // for
        None
    } // master_id

    fn fetch(&self, table: &str, id: &str) -> Option<Record> {
        let record = self.store.get_by_id(table, id);

        if record.is_none() {
            debug!("missing master {}/{}", table, id);
        } // if
        record
    } // fetch

    /// Walks down `path` from the record and returns the ids of the records at its end.
    fn detail_ids(&self, table: &str, record: &Record, path: &[String]) -> Vec<String> {
        let mut ids = vec![record.id().to_string()];

        for child in path {
            let link = match self.rules.master_of(child) {
                Some(link) => link,
                None       => return vec![],
            }; // match

            ids = ids.iter()
                .flat_map(|id| self.store.get_records_where(child, &[(link.field.as_str(), id.as_str())]))
                .map(|detail| detail.id().to_string())
                .collect();
            trace!("    details of {} in {}: {:?}", table, child, ids);
        } // for
        ids
    } // detail_ids

} // impl Authority


// Tests //////////////////////////////////////////////////////////////////////////////////////////


// mod tests
