//! Record-level access control for a multi-tenant content management system.
//!
//! The CMS hosts *projects*. Each project holds *editions*, and every edition belongs to exactly
//! one project. Users hold a role on the site and, in addition, roles on individual projects and
//! editions. Whether a user may perform an action on a record depends on all of these roles, on
//! how the record is related to the projects and editions the roles were granted on, and on the
//! lifecycle state the record is in.
//!
//! The crate answers two questions:
//!
//! * May the acting user perform an action on a record? See [`Authority::authorize`].
//! * Which roles may the acting user give to another user? See
//!   [`Authority::resolve_assignable`].
//!
//! # Roles
//!
//! Roles come in three scopes, each an ordered vocabulary from most to least powerful:
//!
//! | scope   | vocabulary                              | granted by                      |
//! |---------|-----------------------------------------|---------------------------------|
//! | site    | `root`, `admin`, `user`, `guest`, `none` | the user's base role            |
//! | project | `organiser`                             | a cross-link user - project     |
//! | edition | `editor`, `reviewer`                    | a cross-link user - edition     |
//!
//! The last site role is the role of a logged-out caller, the second-last the role of a
//! logged-in user without privileges. Only the position in the vocabulary carries meaning, so
//! deployments may rename the roles freely. See [`RoleHierarchy`].
//!
//! Roles do not inherit. A rule granting an action to `reviewer` says nothing about `editor`;
//! every role a rule is meant for must be named in it.
//!
//! # Rules
//!
//! A [`RuleTable`] maps, per table, an action to the roles permitted to perform it. A table with
//! a state field keeps one such map per state value, so a published edition can be readable by
//! everybody while an unpublished one is not. A permission is either plain (`true`, `false`) or
//! a list of field namespaces the role may touch:
//!
//! ```json
//! "edit": {"root": true, "organiser": ["", "dc"], "reviewer": ["comment"]}
//! ```
//!
//! Tables name the table they belong to through a *master* link, e.g. an edition names its
//! project. Along these links a project or edition role reaches records below its scope (a
//! project organiser acts on every edition of the project) and above it (an edition editor acts
//! on the project the edition belongs to). See [`Relation`].
//!
//! A standard rule table ships with the crate:
//!
//! ```rust
//! # use zorq_cms_acl::*;
//! let rules = RuleTable::builtin()?;
//!
//! assert_eq!(rules.roles().top(Scope::Project), Some("organiser"));
//! assert_eq!(rules.lineage("edition"), vec!["edition", "project"]);
//! # Ok::<(), Error>(())
//! ```
//!
//! # Records
//!
//! Records live in an external store behind the [`RecordStore`] trait. The crate only reads
//! from it. A [`MemoryStore`] is included for tests and small deployments:
//!
//! ```rust
//! # use zorq_cms_acl::*;
//! let rules     = RuleTable::builtin()?;
//! let mut store = MemoryStore::new();
//!
//! store.add_user("alice", Some("user"));
//! store.add_user("bob", Some("user"));
//! store.insert(Record::new("project", "p1").with("isVisible", "false"));
//! store.insert(Record::new("edition", "e1").with("projectId", "p1"));
//!
//! if let Some(link) = rules.link_of("project") {
//!     store.link(link, "pu1", "alice", "p1", "organiser");
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! # Decisions
//!
//! An [`Authority`] makes the decisions for one acting user. It is cheap to create and borrows
//! the rule table and the store, so create one per request:
//!
//! ```rust
//! # use zorq_cms_acl::*;
//! # let rules     = RuleTable::builtin()?;
//! # let mut store = MemoryStore::new();
//! # store.add_user("alice", Some("user"));
//! # store.add_user("bob", Some("user"));
//! # store.insert(Record::new("project", "p1").with("isVisible", "false"));
//! # store.insert(Record::new("edition", "e1").with("projectId", "p1"));
//! # if let Some(link) = rules.link_of("project") {
//! #     store.link(link, "pu1", "alice", "p1", "organiser");
//! # }
//! let alice = Authority::new(&rules, &store, Some("alice"));
//!
//! // organisers update their project, and every edition in it
//! assert!(alice.authorize("project", Target::Id("p1"), "update", None));
//! assert!(alice.authorize("edition", Target::Id("e1"), "update", None));
//!
//! // namespaced permissions
//! assert!( alice.authorize("edition", Target::Id("e1"), "edit", Some("dc")));
//! assert!(!alice.authorize("edition", Target::Id("e1"), "edit", Some("comment")));
//!
//! // new records are checked against the masters they will belong to
//! assert!(alice.authorize("edition", Target::Insert(&[("project", "p1")]), CREATE, None));
//!
//! // bob holds no role on p1, and the project is hidden
//! let bob = Authority::new(&rules, &store, Some("bob"));
//!
//! assert!(!bob.authorize("project", Target::Id("p1"), "read", None));
//! assert_eq!(bob.demote("project", Target::Id("p1"), "update"), None);
//! # Ok::<(), Error>(())
//! ```
//!
//! Decisions never fail: missing records, unknown users and misuse all deny. The reason is
//! logged through the [`log`](https://docs.rs/log) facade.
//!
//! # Assigning roles
//!
//! Role changes follow a fixed policy based on rank, independent of the rule table. Root and
//! admin manage site roles and project roles, organisers and editors manage edition roles:
//!
//! ```rust
//! # use zorq_cms_acl::*;
//! # let rules     = RuleTable::builtin()?;
//! # let mut store = MemoryStore::new();
//! # store.add_user("alice", Some("user"));
//! # store.add_user("bob", Some("user"));
//! # store.insert(Record::new("project", "p1").with("isVisible", "false"));
//! # store.insert(Record::new("edition", "e1").with("projectId", "p1"));
//! # if let Some(link) = rules.link_of("project") {
//! #     store.link(link, "pu1", "alice", "p1", "organiser");
//! # }
//! let alice = Authority::new(&rules, &store, Some("alice"));
//! let e1    = Some(RecordRef::Id("e1"));
//!
//! assert!( alice.may_assign(Some("bob"), Some("edition"), e1, Some("editor")));
//! assert!(!alice.may_assign(Some("bob"), None, None, Some("admin")));
//! # Ok::<(), Error>(())
//! ```

use thiserror::Error;

mod assign;
mod authority;
mod resolver;
mod role;
mod rules;
mod store;

#[cfg(test)]
mod fixture;

pub use assign::Assignable;
pub use authority::{Authority, Target, User, CREATE, READ};
pub use role::{RoleHierarchy, Scope, MIN_SITE_ROLES};
pub use rules::{
    ActionMap, CrossLink, MasterLink, Permission, Relation, RoleMap, RuleTable, StateField,
    TableRules, UserTable, GLOBAL_NAMESPACE,
};
pub use store::{MemoryStore, Record, RecordRef, RecordStore};


// Error //////////////////////////////////////////////////////////////////////////////////////////


/// Errors raised while loading or validating a rule table. Decisions themselves never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read rule table: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed rule table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate role: {0}")]
    DuplicateRole(String),
    #[error("site vocabulary has {got} roles, at least {min} required")]
    ShortHierarchy{got: usize, min: usize},
    #[error("Missing table: {0}")]
    MissingTable(String),
    #[error("master links of {0} form a cycle")]
    MasterCycle(String),
    #[error("table {0} has both stateless and per state rules")]
    MixedRules(String),
    #[error("table {table} has no rules for state {state}")]
    MissingState{table: String, state: String},
    #[error("rule {table}.{action} names unknown role {role}")]
    UnknownRole{table: String, action: String, role: String},
    #[error("scope table {0} has no cross-link")]
    MissingLink(String),
    #[error("role {role} has no relation to table {table}")]
    UnrelatedRole{table: String, role: String},
} // enum Error


// Tests //////////////////////////////////////////////////////////////////////////////////////////


// mod tests
