//! Governance of role changes: which roles may the acting user give to another user, or to
//! themself, on the site, on a project or on an edition.
//!
//! This policy does not consult the rule table. It works on ranks only:
//!
//! * Site: ranks 0, 1 and 2 of the site vocabulary (root, admin and user in the standard
//!   deployment) drive the decisions. Only rank 0 and 1 manage roles. Rank 0 manages everybody
//!   except other rank 0 holders; rank 1 may demote itself and manage users below rank 1, up to
//!   rank 1. Nobody can be made anonymous.
//! * Bootstrap: while nobody holds rank 0, a user may raise their own role. A rank 1 holder may
//!   take rank 0; if nobody holds rank 1 either, a rank 2 holder may take rank 1.
//! * Project: rank 0 and 1 hand out project roles.
//! * Edition: the organiser of the edition's project hands out every edition role, the
//!   strongest edition role hands out the weaker ones. Organisers are untouchable at edition
//!   level and only organisers touch holders of the strongest edition role.
//!
//! Guests and logged-out callers never change roles.

use crate::authority::{Authority, User};
use crate::role::Scope;
use crate::store::{Record, RecordRef, RecordStore};
use log::{debug, error, trace, warn};
use std::collections::BTreeSet;


// Assignable /////////////////////////////////////////////////////////////////////////////////////


/// The outcome of a role assignment query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignable {
    /// Whether the acting user may change the target's role in this scope at all.
    pub allowed: bool,
    /// The roles that may be given to the target. Never contains the target's current role,
    /// always empty if not allowed.
    pub roles:   BTreeSet<String>,
    /// The target's current role in the scope, if known.
    pub current: Option<String>,
} // struct Assignable

impl Assignable {

    fn denied() -> Self {
        Assignable::default()
    } // denied

    fn granted<'r, I: IntoIterator<Item = &'r str>>(roles: I, current: Option<String>) -> Self {
        let roles = roles.into_iter()
            .filter(|role| Some(*role) != current.as_deref())
            .map(String::from)
            .collect();

        Assignable{allowed: true, roles, current}
    } // granted

} // impl Assignable


// Authority //////////////////////////////////////////////////////////////////////////////////////


impl<'a, S: RecordStore + ?Sized> Authority<'a, S> {

    /// Computes the roles the acting user may assign to `target`. Without a table the site
    /// scope applies; with `project` or `edition` the scope of the given record. `target` None
    /// asks for a user not yet known to the scope; at site scope that is never allowed.
    pub fn resolve_assignable(&self, target: Option<&str>, table: Option<&str>, record: Option<RecordRef>) -> Assignable {
        trace!("resolving assignable roles for {:?} on {:?}", target, table);
        let hierarchy = self.rules.roles();
        let actor     = match &self.user {
            Some(actor) => actor,
            None        => {
                trace!("    logged out");
                return Assignable::denied();
            }, // None
        }; // match

        if !hierarchy.outranks(Scope::Site, Some(actor.role.as_str()), Some(hierarchy.guest())) {
            trace!("    {} is {} and manages no roles", actor.id, actor.role);
            return Assignable::denied();
        } // if

        let scope = match table {
            None        => Scope::Site,
            Some(table) => match Scope::from_table(table) {
                Some(scope) => scope,
                None        => {
                    warn!("roles cannot be assigned on {}", table);
                    return Assignable::denied();
                }, // None
            }, // Some
        }; // match

        if scope == Scope::Site {
            return self.assignable_on_site(actor, target);
        } // if

        let record = match record.and_then(|r| r.resolve(self.store, scope.table())) {
            Some(record) => record,
            None         => {
                debug!("no {} record to assign roles on", scope);
                return Assignable::denied();
            }, // None
        }; // match

        if record.table() != scope.table() {
            error!("programming error: record {} of {} used as {}", record.id(), record.table(), scope);
            return Assignable::denied();
        } // if

        if let Some(target) = target {
            if self.base_role(target).is_none() {
                debug!("no target user {}", target);
                return Assignable::denied();
            } // if
        } // if

        match scope {
            Scope::Project => self.assignable_on_project(actor, target, &record),
            _              => self.assignable_on_edition(actor, target, &record),
        } // match
    } // resolve_assignable

    /// Returns true if the acting user may give `role` to `target`, or remove the target's role
    /// if `role` is None. Site roles can only be replaced, never removed.
    pub fn may_assign(&self, target: Option<&str>, table: Option<&str>, record: Option<RecordRef>, role: Option<&str>) -> bool {
        let assignable = self.resolve_assignable(target, table, record);

        match role {
            Some(role) => assignable.roles.contains(role),
            None       => {
                let site = table.map_or(true, |t| Scope::from_table(t) == Some(Scope::Site));

                !site && assignable.allowed && assignable.current.is_some()
            }, // None
        } // match
    } // may_assign

    /// Returns true if some user holds the site role.
    fn has_holder(&self, role: &str) -> bool {
        let found = self.store.has_user_with_role(role);

        trace!("    holder of {}: {}", role, found);
        found
    } // has_holder

    fn assignable_on_site(&self, actor: &User, target: Option<&str>) -> Assignable {
        let target = match target {
            Some(target) => target,
            None         => {
                trace!("    no target user");
                return Assignable::denied();
            }, // None
        }; // match

        let current = match self.base_role(target) {
            Some(role) => role,
            None       => {
                debug!("no target user {}", target);
                return Assignable::denied();
            }, // None
        }; // match

        let hierarchy = self.rules.roles();
        let anonymous = hierarchy.anonymous();
        let top       = hierarchy.site_role(0).unwrap_or_default();
        let second    = hierarchy.site_role(1).unwrap_or_default();
        let third     = hierarchy.site_role(2).unwrap_or_default();
        let is_self   = actor.id == target;
        let site      = move || hierarchy.roles(Scope::Site).iter().map(String::as_str).filter(move |r| *r != anonymous);

        if is_self && !self.has_holder(top) {
            if !self.has_holder(second) {
                if actor.role == third {
                    debug!("bootstrap: {} may become {}", actor.id, second);
                    return Assignable::granted(site().filter(|r| *r != top), Some(current));
                } // if
            } else if actor.role == second {
                debug!("bootstrap: {} may become {}", actor.id, top);
                return Assignable::granted(site(), Some(current));
            } // else
        } // if

        let weakest = hierarchy.roles(Scope::Site).len();
        let target_rank = hierarchy.rank(Scope::Site, &current).unwrap_or(weakest);

        match hierarchy.rank(Scope::Site, &actor.role) {
            Some(0) => {
                if target_rank == 0 && !is_self {
                    trace!("    {} is {} as well", target, top);
                    return Assignable::denied();
                } // if
                Assignable::granted(site(), Some(current))
            }, // Some(0)
            Some(1) => {
                if is_self {
                    let lower = hierarchy.weaker_than(Scope::Site, &actor.role).filter(|r| *r != anonymous);

                    return Assignable::granted(lower, Some(current));
                } // if
                if target_rank <= 1 {
                    trace!("    {} outranks or equals {}", target, actor.id);
                    return Assignable::denied();
                } // if
                Assignable::granted(site().filter(|r| *r != top), Some(current))
            }, // Some(1)
            _ => Assignable::denied(),
        } // match
    } // assignable_on_site

    fn assignable_on_project(&self, actor: &User, target: Option<&str>, project: &Record) -> Assignable {
        let hierarchy = self.rules.roles();

        if hierarchy.rank(Scope::Site, &actor.role).map_or(true, |rank| rank > 1) {
            trace!("    {} may not assign project roles", actor.id);
            return Assignable::denied();
        } // if

        let current = target.and_then(|t| self.link_role(t, project.table(), project.id()));
        let roles   = hierarchy.roles(Scope::Project).iter().map(String::as_str);

        Assignable::granted(roles, current)
    } // assignable_on_project

    fn assignable_on_edition(&self, actor: &User, target: Option<&str>, edition: &Record) -> Assignable {
        let hierarchy     = self.rules.roles();
        let project_table = Scope::Project.table();
        let project_id    = self.rules.master_of(edition.table())
            .filter(|master| master.table == project_table)
            .and_then(|master| edition.field(&master.field));

        let project_role = |user: &str| project_id.and_then(|id| self.link_role(user, project_table, id));
        let edition_role = |user: &str| self.link_role(user, edition.table(), edition.id());

        let organiser = hierarchy.top(Scope::Project);
        let editor    = hierarchy.top(Scope::Edition);
        let roles     = move || hierarchy.roles(Scope::Edition).iter().map(String::as_str);

        let organises     = organiser.is_some() && project_role(&actor.id).as_deref() == organiser;
        let actor_edition = edition_role(&actor.id);
        let edits         = editor.is_some() && actor_edition.as_deref() == editor;

        if target == Some(actor.id.as_str()) {
            if organises || edits {
                return Assignable::granted(roles(), actor_edition);
            } // if
            trace!("    {} may not change own edition role", actor.id);
            return Assignable::denied();
        } // if

        let (target_project, target_edition) = match target {
            Some(target) => (project_role(target), edition_role(target)),
            None         => (None, None),
        }; // match

        if organiser.is_some() && target_project.as_deref() == organiser {
            trace!("    {:?} organises the project", target);
            return Assignable::denied();
        } // if
        if organises {
            return Assignable::granted(roles(), target_edition);
        } // if
        if let (true, Some(editor)) = (edits, editor) {
            if target_edition.as_deref() == Some(editor) {
                trace!("    {:?} is {} as well", target, editor);
                return Assignable::denied();
            } // if
            return Assignable::granted(hierarchy.weaker_than(Scope::Edition, editor), target_edition);
        } // if
        Assignable::denied()
    } // assignable_on_edition

} // impl Authority


// Tests //////////////////////////////////////////////////////////////////////////////////////////


#[cfg(test)]
mod tests {

    use super::*;
    use crate::fixture;
    use crate::rules::RuleTable;
    use crate::store::MemoryStore;
    use test_env_log::test;

    fn set(roles: &[&str]) -> BTreeSet<String> {
        roles.iter().map(|r| r.to_string()).collect()
    } // set

    fn site(rules: &RuleTable, store: &MemoryStore, actor: &str, target: Option<&str>) -> Assignable {
        Authority::new(rules, store, Some(actor)).resolve_assignable(target, None, None)
    } // site

    fn scoped(rules: &RuleTable, store: &MemoryStore, actor: &str, target: Option<&str>, table: &str, id: &str) -> Assignable {
        Authority::new(rules, store, Some(actor)).resolve_assignable(target, Some(table), Some(RecordRef::Id(id)))
    } // scoped

    fn granted(roles: &[&str], current: &str) -> Assignable {
        Assignable{allowed: true, roles: set(roles), current: Some(current.to_string())}
    } // granted

    #[test]
    fn nobodies() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        let nobody = Authority::new(&rules, &store, None);

        assert_eq!(nobody.resolve_assignable(Some("alice"), None, None), Assignable::denied());
        assert_eq!(nobody.resolve_assignable(Some("alice"), Some("project"), Some(RecordRef::Id("p1"))), Assignable::denied());

        assert_eq!(site(&rules, &store, "guest1", Some("guest1")), Assignable::denied());
        assert_eq!(site(&rules, &store, "norole", Some("alice")), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "guest1", Some("bob"), "edition", "e1"), Assignable::denied());
    } // nobodies

    #[test]
    fn site_targets() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        // no users are created through role assignment
        assert_eq!(site(&rules, &store, "root1", None), Assignable::denied());
        assert_eq!(site(&rules, &store, "root1", Some("ghost")), Assignable::denied());

        // anything but a site or scope table is refused
        let root = Authority::new(&rules, &store, Some("root1"));

        assert_eq!(root.resolve_assignable(Some("alice"), Some("comment"), None), Assignable::denied());
        assert_eq!(root.resolve_assignable(Some("alice"), Some("site"), None), granted(&["root", "admin", "guest"], "user"));
    } // site_targets

    #[test]
    fn root() {
        let rules = fixture::rules();
        let mut store = fixture::store(&rules);

        assert_eq!(site(&rules, &store, "root1", Some("alice")), granted(&["root", "admin", "guest"], "user"));
        assert_eq!(site(&rules, &store, "root1", Some("admin1")), granted(&["root", "user", "guest"], "admin"));
        assert_eq!(site(&rules, &store, "root1", Some("norole")), granted(&["root", "admin", "user"], "guest"));
        assert_eq!(site(&rules, &store, "root1", Some("root1")), granted(&["admin", "user", "guest"], "root"));

        // another root is out of reach
        store.add_user("root2", Some("root"));
        assert_eq!(site(&rules, &store, "root1", Some("root2")), Assignable::denied());
    } // root

    #[test]
    fn admin() {
        let rules = fixture::rules();
        let mut store = fixture::store(&rules);

        // admins only demote themselves
        assert_eq!(site(&rules, &store, "admin1", Some("admin1")), granted(&["user", "guest"], "admin"));

        // and never reach root
        assert_eq!(site(&rules, &store, "admin1", Some("alice")), granted(&["admin", "guest"], "user"));
        assert_eq!(site(&rules, &store, "admin1", Some("guest1")), granted(&["admin", "user"], "guest"));
        assert_eq!(site(&rules, &store, "admin1", Some("root1")), Assignable::denied());

        store.add_user("admin2", Some("admin"));
        assert_eq!(site(&rules, &store, "admin1", Some("admin2")), Assignable::denied());
    } // admin

    #[test]
    fn users() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        // no self promotion outside bootstrap
        assert_eq!(site(&rules, &store, "alice", Some("alice")), Assignable::denied());
        assert_eq!(site(&rules, &store, "alice", Some("bob")), Assignable::denied());
    } // users

    #[test]
    fn bootstrap() {
        let rules     = fixture::rules();
        let mut store = MemoryStore::new();

        store.add_user("alice", Some("user"));
        store.add_user("bob", Some("user"));

        // no root, no admin: a user may become admin, but not root
        assert_eq!(site(&rules, &store, "alice", Some("alice")), granted(&["admin", "guest"], "user"));
        assert_eq!(site(&rules, &store, "alice", Some("bob")), Assignable::denied());

        store.add_user("alice", Some("admin"));

        // the admin path takes over
        let bob = site(&rules, &store, "bob", Some("bob"));

        assert!(!bob.allowed);
        assert!(!bob.roles.contains("admin"));
        assert_eq!(site(&rules, &store, "alice", Some("alice")), granted(&["root", "user", "guest"], "admin"));

        store.add_user("alice", Some("root"));

        // bootstrap is over
        assert_eq!(site(&rules, &store, "alice", Some("alice")), granted(&["admin", "user", "guest"], "root"));
        assert_eq!(site(&rules, &store, "bob", Some("bob")), Assignable::denied());

        // guests do not bootstrap
        let mut store = MemoryStore::new();

        store.add_user("gus", Some("guest"));
        assert_eq!(site(&rules, &store, "gus", Some("gus")), Assignable::denied());
    } // bootstrap

    #[test]
    fn bootstrap_with_own_user_layout() {
        let rules     = fixture::rules();
        let mut store = MemoryStore::with_users("user", "level");

        store.add_user("root1", Some("root"));
        store.add_user("admin1", Some("admin"));
        store.add_user("alice", Some("user"));

        assert_eq!(Authority::new(&rules, &store, Some("alice")).site_role(), "user");

        // root and admin exist, so there is nothing to bootstrap
        let alice = site(&rules, &store, "alice", Some("alice"));

        assert!(!alice.allowed);
        assert!(!alice.roles.contains("admin"));
        assert_eq!(site(&rules, &store, "admin1", Some("admin1")), granted(&["user", "guest"], "admin"));

        // without them it opens up as usual
        let mut store = MemoryStore::with_users("user", "level");

        store.add_user("alice", Some("user"));
        assert_eq!(site(&rules, &store, "alice", Some("alice")), granted(&["admin", "guest"], "user"));
    } // bootstrap_with_own_user_layout

    #[test]
    fn project() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        assert_eq!(
            scoped(&rules, &store, "admin1", Some("bob"), "project", "p1"),
            Assignable{allowed: true, roles: set(&["organiser"]), current: None}
        );
        assert_eq!(
            scoped(&rules, &store, "root1", Some("alice"), "project", "p1"),
            Assignable{allowed: true, roles: set(&[]), current: Some(String::from("organiser"))}
        );
        assert_eq!(
            scoped(&rules, &store, "admin1", None, "project", "p2"),
            Assignable{allowed: true, roles: set(&["organiser"]), current: None}
        );

        // organisers do not appoint organisers
        assert_eq!(scoped(&rules, &store, "alice", Some("bob"), "project", "p1"), Assignable::denied());

        // missing data
        assert_eq!(scoped(&rules, &store, "admin1", Some("bob"), "project", "p9"), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "admin1", Some("ghost"), "project", "p1"), Assignable::denied());

        let admin = Authority::new(&rules, &store, Some("admin1"));

        assert_eq!(admin.resolve_assignable(Some("bob"), Some("project"), None), Assignable::denied());
    } // project

    #[test]
    fn edition_organiser() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        assert_eq!(scoped(&rules, &store, "alice", Some("bob"), "edition", "e1"), granted(&["reviewer"], "editor"));
        assert_eq!(scoped(&rules, &store, "alice", Some("carol"), "edition", "e1"), granted(&["editor"], "reviewer"));
        assert_eq!(
            scoped(&rules, &store, "alice", Some("dave"), "edition", "e1"),
            Assignable{allowed: true, roles: set(&["editor", "reviewer"]), current: None}
        );
        assert_eq!(
            scoped(&rules, &store, "alice", Some("alice"), "edition", "e1"),
            Assignable{allowed: true, roles: set(&["editor", "reviewer"]), current: None}
        );

        // organising p1 says nothing about editions of p2
        assert_eq!(scoped(&rules, &store, "alice", Some("dave"), "edition", "e3"), Assignable::denied());
    } // edition_organiser

    #[test]
    fn edition_editor() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        // editors hand out and take back the weaker roles only
        assert_eq!(scoped(&rules, &store, "bob", Some("carol"), "edition", "e1"), granted(&[], "reviewer"));
        assert_eq!(
            scoped(&rules, &store, "bob", Some("dave"), "edition", "e1"),
            Assignable{allowed: true, roles: set(&["reviewer"]), current: None}
        );
        assert_eq!(scoped(&rules, &store, "bob", Some("bob"), "edition", "e1"), granted(&["reviewer"], "editor"));

        // organisers and fellow editors are out of reach
        assert_eq!(scoped(&rules, &store, "bob", Some("alice"), "edition", "e1"), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "dave", Some("carol"), "edition", "e3"), Assignable::denied());
    } // edition_editor

    #[test]
    fn edition_others() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        assert_eq!(scoped(&rules, &store, "carol", Some("dave"), "edition", "e1"), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "carol", Some("carol"), "edition", "e1"), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "root1", Some("dave"), "edition", "e1"), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "admin1", Some("admin1"), "edition", "e1"), Assignable::denied());
        assert_eq!(scoped(&rules, &store, "alice", Some("bob"), "edition", "does-not-exist"), Assignable::denied());
    } // edition_others

    #[test]
    fn editor_ceiling() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);

        for target in &["root1", "admin1", "carol", "dave", "guest1", "norole"] {
            let result = scoped(&rules, &store, "bob", Some(*target), "edition", "e1");

            assert!(!result.roles.contains("editor"), "bob may make {} editor", target);
        } // for
    } // editor_ceiling

    #[test]
    fn current_role_excluded() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);
        let users = ["root1", "admin1", "alice", "bob", "carol", "dave", "guest1", "norole"];

        for actor in &users {
            for target in &users {
                let result = site(&rules, &store, actor, Some(*target));

                if !result.allowed {
                    assert!(result.roles.is_empty());
                } // if
                if let Some(current) = &result.current {
                    assert!(!result.roles.contains(current), "{} may give {} to {}", actor, current, target);
                } // if
                assert!(!result.roles.contains("none"));

                for (table, id) in &[("project", "p1"), ("edition", "e1"), ("edition", "e3")] {
                    let result = scoped(&rules, &store, actor, Some(*target), table, id);

                    if !result.allowed {
                        assert!(result.roles.is_empty());
                    } // if
                    if let Some(current) = &result.current {
                        assert!(!result.roles.contains(current));
                    } // if
                } // for
            } // for
        } // for
    } // current_role_excluded

    #[test]
    fn may_assign() {
        let rules = fixture::rules();
        let store = fixture::store(&rules);
        let p1    = Some(RecordRef::Id("p1"));
        let e1    = Some(RecordRef::Id("e1"));

        let root = Authority::new(&rules, &store, Some("root1"));

        assert!( root.may_assign(Some("alice"), None, None, Some("admin")));
        assert!(!root.may_assign(Some("alice"), None, None, Some("user")));
        assert!(!root.may_assign(Some("alice"), None, None, Some("none")));
        assert!(!root.may_assign(Some("alice"), None, None, None));

        let admin = Authority::new(&rules, &store, Some("admin1"));

        assert!( admin.may_assign(Some("bob"), Some("project"), p1, Some("organiser")));
        assert!( admin.may_assign(Some("alice"), Some("project"), p1, None));
        assert!(!admin.may_assign(Some("bob"), Some("project"), p1, None));

        let bob = Authority::new(&rules, &store, Some("bob"));

        assert!( bob.may_assign(Some("carol"), Some("edition"), e1, None));
        assert!(!bob.may_assign(Some("carol"), Some("edition"), e1, Some("editor")));
        assert!( bob.may_assign(Some("dave"), Some("edition"), e1, Some("reviewer")));
        assert!(!bob.may_assign(Some("dave"), Some("edition"), e1, None));
        assert!(!bob.may_assign(Some("alice"), Some("edition"), e1, None));
    } // may_assign

} // mod tests
