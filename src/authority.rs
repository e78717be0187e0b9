//! The permission check.
//!
//! An [`Authority`] answers, for one acting user, whether an action is permitted on a record.
//! It looks up the record and its lifecycle state, fetches the rules of the table in that state,
//! derives every role the user holds with respect to the record and grants the action if any
//! of those roles is permitted to perform it.
//!
//! Decisions never fail. A record that cannot be found, a user that does not exist and a call
//! that violates the calling contract all end in the deny default; only the log tells them apart.

use crate::rules::{RoleMap, RuleTable};
use crate::role::Scope;
use crate::store::{Record, RecordStore};
use log::{debug, error, trace, warn};
use std::borrow::Cow;
use std::collections::BTreeSet;


// Helper types ///////////////////////////////////////////////////////////////////////////////////


/// The action inserting a new record.
pub const CREATE: &str = "create";

/// The action `demote` falls back to.
pub const READ: &str = "read";

/// A logged-in user and the site role the decisions are made with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id:   String,
    pub role: String,
} // struct User

/// The record an action is checked on.
#[derive(Clone, Copy, Debug)]
pub enum Target<'r> {
    /// An existing, already loaded record.
    Record(&'r Record),
    /// An existing record known by id.
    Id(&'r str),
    /// A record about to be created, with the ids of its masters keyed by master table.
    Insert(&'r [(&'r str, &'r str)]),
} // enum Target

impl<'r> From<&'r Record> for Target<'r> {

    fn from(record: &'r Record) -> Self {
        Target::Record(record)
    } // from

} // impl From<&Record> for Target


// Authority //////////////////////////////////////////////////////////////////////////////////////


/// Makes decisions for one acting user over an immutable rule table and a record store.
/// Cheap to create; create one per request.
pub struct Authority<'a, S: ?Sized> {
    pub(crate) rules: &'a RuleTable,
    pub(crate) store: &'a S,
    pub(crate) user:  Option<User>,
} // struct Authority

impl<'a, S: RecordStore + ?Sized> Authority<'a, S> {

    /// Creates an authority acting for `user`, or for a logged-out caller if `user` is None.
    /// A user id unknown to the store is treated as logged out.
    pub fn new(rules: &'a RuleTable, store: &'a S, user: Option<&str>) -> Self {
        let mut authority = Authority{rules, store, user: None};

        if let Some(id) = user {
            match authority.base_role(id) {
                Some(role) => {
                    trace!("acting as {} with site role {}", id, role);
                    authority.user = Some(User{id: id.to_string(), role});
                }, // Some
                None => debug!("unknown user {}, acting as logged out", id),
            } // match
        } // if
        authority
    } // new

    #[inline]
    pub fn rules(&self) -> &'a RuleTable {
        self.rules
    } // rules

    #[inline]
    pub fn store(&self) -> &'a S {
        self.store
    } // store

    /// The acting user, None if logged out.
    #[inline]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    } // user

    /// The site role of the acting user. Logged-out callers hold the anonymous role.
    pub fn site_role(&self) -> &str {
        match &self.user {
            Some(user) => &user.role,
            None       => self.rules.roles().anonymous(),
        } // match
    } // site_role

    /// The site role of an existing user. Users without a valid role of their own are guests.
    /// None if the user does not exist.
    pub(crate) fn base_role(&self, user: &str) -> Option<String> {
        self.store.get_by_id(&self.rules.users().table, user)?;

        let roles = self.rules.roles();

        match self.store.get_user_base_role(user) {
            Some(role) if roles.rank(Scope::Site, &role).is_some() => Some(role),
            Some(role) => {
                warn!("user {} has unknown site role {}, treating as {}", user, role, roles.guest());
                Some(roles.guest().to_string())
            }, // Some
            None => Some(roles.guest().to_string()),
        } // match
    } // base_role

    /// Returns true if the acting user may perform `action` on the target. `namespace` selects
    /// the field namespace for actions granted per namespace; without one the global namespace
    /// is checked.
    pub fn authorize(&self, table: &str, target: Target, action: &str, namespace: Option<&str>) -> bool {
        !self.decide(table, target, Some(action), namespace).is_empty()
    } // authorize

    /// Returns every action the acting user may perform on an existing record.
    pub fn permitted(&self, table: &str, target: Target, namespace: Option<&str>) -> BTreeSet<String> {
        self.decide(table, target, None, namespace)
    } // permitted

    /// Returns `desired` if it is permitted, otherwise `read` if that is permitted, otherwise
    /// None.
    pub fn demote(&self, table: &str, target: Target, desired: &str) -> Option<String> {
        if self.authorize(table, target, desired, None) {
            return Some(desired.to_string());
        } // if
        if desired != READ && self.authorize(table, target, READ, None) {
            trace!("demoting {} to {} on {}", desired, READ, table);
            return Some(READ.to_string());
        } // if
        None
    } // demote

    fn decide(&self, table: &str, target: Target, action: Option<&str>, namespace: Option<&str>) -> BTreeSet<String> {
        trace!("deciding {:?} on {} for {:?}", action, table, self.user.as_ref().map(|u| &u.id));
        let inserting = matches!(target, Target::Insert(_));

        if inserting != (action == Some(CREATE)) {
            error!("programming error: action {:?} on {} does not fit target {:?}", action, table, target);
            return BTreeSet::new();
        } // if

        let record = match target {
            Target::Record(record) => Some(Cow::Borrowed(record)),
            Target::Id(id)         => match self.store.get_by_id(table, id) {
                Some(record) => Some(Cow::Owned(record)),
                None         => {
                    debug!("no record {} in {}", id, table);
                    return BTreeSet::new();
                }, // None
            }, // Target::Id
            Target::Insert(_)      => None,
        }; // match

        if let Some(record) = &record {
            if record.table() != table {
                error!("programming error: record {} of {} checked as {}", record.id(), record.table(), table);
                return BTreeSet::new();
            } // if
        } // if

        let masters: &[(&str, &str)] = match target {
            Target::Insert(masters) => masters,
            _                       => &[],
        }; // match

        let state   = self.rules.state_of(table, record.as_deref());
        let actions = self.rules.actions(table, state);
        let candidates: Vec<(&String, &RoleMap)> = match action {
            Some(action) => actions.get_key_value(action).into_iter().collect(),
            None         => actions.iter().filter(|(name, _)| name.as_str() != CREATE).collect(),
        }; // match

        if candidates.is_empty() {
            trace!("    no rules for {:?} on {} in state {:?}", action, table, state);
            return BTreeSet::new();
        } // if

        let roles = self.roles_for(table, record.as_deref(), masters, candidates.iter().map(|(_, r)| *r));

        candidates.into_iter()
            .filter(|(_, permissions)| {
                permissions.iter().any(|(role, permission)| roles.contains(role) && permission.grants(namespace))
            })
            .map(|(name, _)| name.clone())
            .collect()
    } // decide

} // impl Authority


// Tests //////////////////////////////////////////////////////////////////////////////////////////


// mod tests
