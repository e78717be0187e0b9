//! The rule table: which roles may perform which action on which table, optionally depending on
//! the lifecycle state of the record.
//!
//! Besides the permissions the table also describes how tables relate to each other. A table
//! may name a *master* table it belongs to (an edition belongs to a project) and a scope table
//! may name the *link* table holding the role-tagged cross-links between users and its records.
//!
//! Rule tables are written in JSON:
//!
//! ```json
//! {
//!   "roles": {
//!     "site": ["root", "admin", "user", "guest", "none"],
//!     "project": ["organiser"],
//!     "edition": ["editor", "reviewer"]
//!   },
//!   "tables": {
//!     "project": {
//!       "link": {"table": "projectUser", "user": "user", "record": "projectId", "role": "role"},
//!       "actions": {
//!         "read":   {"root": true, "admin": true, "organiser": true},
//!         "update": {"organiser": ["", "dc"]}
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! A permission is either a flag or the list of field namespaces the role may act upon.

use crate::role::{RoleHierarchy, Scope};
use crate::store::Record;
use crate::Error;
use log::{debug, trace, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;


// Permission /////////////////////////////////////////////////////////////////////////////////////


/// The namespace assumed when a permission check names none.
pub const GLOBAL_NAMESPACE: &str = "";

/// What a rule grants to a role for an action.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(from = "RawPermission")]
pub enum Permission {
    Allowed,
    Denied,
    /// Allowed, but only for fields in the given namespaces.
    Namespaces(BTreeSet<String>),
} // enum Permission

impl Permission {

    /// Returns true if the permission covers the namespace. Without a namespace the global
    /// namespace is checked.
    pub fn grants(&self, namespace: Option<&str>) -> bool {
        match self {
            Permission::Allowed           => true,
            Permission::Denied            => false,
            Permission::Namespaces(names) => names.contains(namespace.unwrap_or(GLOBAL_NAMESPACE)),
        } // match
    } // grants

    /// Returns true if the permission can never grant anything.
    pub fn is_void(&self) -> bool {
        match self {
            Permission::Allowed           => false,
            Permission::Denied            => true,
            Permission::Namespaces(names) => names.is_empty(),
        } // match
    } // is_void

} // impl Permission

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPermission {
    Flag(bool),
    Namespaces(BTreeSet<String>),
} // enum RawPermission

impl From<RawPermission> for Permission {

    fn from(raw: RawPermission) -> Self {
        match raw {
            RawPermission::Flag(true)        => Permission::Allowed,
            RawPermission::Flag(false)       => Permission::Denied,
            RawPermission::Namespaces(names) => Permission::Namespaces(names),
        } // match
    } // from

} // impl From<RawPermission> for Permission

/// Role name to permission.
pub type RoleMap = BTreeMap<String, Permission>;

/// Action name to the permissions of the roles.
pub type ActionMap = BTreeMap<String, RoleMap>;

static NO_ROLES: RoleMap = BTreeMap::new();
static NO_ACTIONS: ActionMap = BTreeMap::new();


// Table configuration ////////////////////////////////////////////////////////////////////////////


/// Names the master table of a table and the field holding the master id.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MasterLink {
    pub table: String,
    pub field: String,
} // struct MasterLink

/// Describes the cross-link table coupling users to the records of a scope table.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CrossLink {
    pub table:  String,
    pub user:   String,
    pub record: String,
    pub role:   String,
} // struct CrossLink

/// The field carrying the lifecycle state of a table's records and the state of new records.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StateField {
    pub field:   String,
    pub initial: String,
} // struct StateField

/// Where users and their site roles are stored.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserTable {
    #[serde(default = "UserTable::default_table")]
    pub table: String,
    #[serde(default = "UserTable::default_role")]
    pub role:  String,
} // struct UserTable

impl UserTable {

    fn default_table() -> String {
        String::from("user")
    } // default_table

    fn default_role() -> String {
        String::from("role")
    } // default_role

} // impl UserTable

impl Default for UserTable {

    fn default() -> Self {
        UserTable{table: UserTable::default_table(), role: UserTable::default_role()}
    } // default

} // impl Default for UserTable

/// Relationships and rules of one table. A table has either plain `actions` or, if it
/// declares a `state` field, one action map per state in `states`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableRules {
    #[serde(default)]
    pub master:  Option<MasterLink>,
    #[serde(default)]
    pub link:    Option<CrossLink>,
    #[serde(default)]
    pub state:   Option<StateField>,
    #[serde(default)]
    actions:     ActionMap,
    #[serde(default)]
    states:      BTreeMap<String, ActionMap>,
} // struct TableRules

impl TableRules {

    fn action_maps(&self) -> impl Iterator<Item = &ActionMap> {
        std::iter::once(&self.actions).chain(self.states.values())
    } // action_maps

} // impl TableRules

/// How the records of one table relate to the records of another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Both are the same table.
    Own,
    /// The other table is an ancestor. Holds the tables walked to reach it, ending with it.
    Master(Vec<String>),
    /// The other table is a descendant. Holds the tables walked to reach it, ending with it.
    Detail(Vec<String>),
    Unrelated,
} // enum Relation


// RuleTable //////////////////////////////////////////////////////////////////////////////////////


/// The validated, immutable rule table. Build it once and hand it to every
/// [`Authority`](crate::Authority) by reference.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleTable {
    roles:  RoleHierarchy,
    #[serde(default)]
    users:  UserTable,
    #[serde(default)]
    tables: BTreeMap<String, TableRules>,
} // struct RuleTable

impl RuleTable {

    /// Creates and validates a rule table.
    pub fn new(roles: RoleHierarchy, users: UserTable, tables: BTreeMap<String, TableRules>) -> Result<Self, Error> {
        let rules = RuleTable{roles, users, tables};

        rules.validate()?;
        Ok(rules)
    } // new

    /// Parses and validates a rule table from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        trace!("parsing rule table");
        let rules: RuleTable = serde_json::from_str(json)?;

        rules.validate()?;
        Ok(rules)
    } // from_json

    /// Reads a rule table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        debug!("loading rule table from {}", path.display());
        RuleTable::from_json(&fs::read_to_string(path)?)
    } // load

    /// The rules of the standard CMS deployment.
    pub fn builtin() -> Result<Self, Error> {
        RuleTable::from_json(include_str!("builtin.json"))
    } // builtin

    fn validate(&self) -> Result<(), Error> {
        trace!("validating rule table");
        self.roles.validate()?;

        for (name, table) in &self.tables {
            if let Some(master) = &table.master {
                if !self.tables.contains_key(&master.table) {
                    warn!("table {} names unknown master {}", name, master.table);
                    return Err(Error::MissingTable(master.table.clone()));
                } // if
            } // if
        } // for

        for name in self.tables.keys() {
            let mut seen = vec![name.as_str()];
            let mut next = self.master_of(name);

            while let Some(master) = next {
                if seen.contains(&master.table.as_str()) {
                    warn!("master cycle through table {}", name);
                    return Err(Error::MasterCycle(name.clone()));
                } // if
                seen.push(&master.table);
                next = self.master_of(&master.table);
            } // while
        } // for

        for (name, table) in &self.tables {
            match &table.state {
                Some(state) => {
                    if !table.actions.is_empty() {
                        warn!("table {} has a state field and stateless rules", name);
                        return Err(Error::MixedRules(name.clone()));
                    } // if
                    if !table.states.contains_key(&state.initial) {
                        warn!("table {} has no rules for its initial state {}", name, state.initial);
                        return Err(Error::MissingState{table: name.clone(), state: state.initial.clone()});
                    } // if
                }, // Some
                None => {
                    if !table.states.is_empty() {
                        warn!("table {} has per state rules but no state field", name);
                        return Err(Error::MixedRules(name.clone()));
                    } // if
                }, // None
            } // match

            for actions in table.action_maps() {
                for (action, roles) in actions {
                    for role in roles.keys() {
                        self.validate_role(name, action, role)?;
                    } // for
                } // for
            } // for
        } // for
        Ok(())
    } // validate

    fn validate_role(&self, table: &str, action: &str, role: &str) -> Result<(), Error> {
        let scope = match self.roles.scope_of(role) {
            Some(scope) => scope,
            None        => {
                warn!("rule {}.{} names unknown role {}", table, action, role);
                return Err(Error::UnknownRole{
                    table:  table.to_string(),
                    action: action.to_string(),
                    role:   role.to_string(),
                });
            }, // None
        }; // match

        if scope == Scope::Site {
            return Ok(());
        } // if

        match self.tables.get(scope.table()) {
            None => {
                warn!("role {} needs the undefined scope table {}", role, scope.table());
                Err(Error::MissingTable(scope.table().to_string()))
            }, // None
            Some(scoped) if scoped.link.is_none() => {
                warn!("role {} needs a cross-link on {}", role, scope.table());
                Err(Error::MissingLink(scope.table().to_string()))
            }, // Some
            Some(_) => {
                if self.relation(table, scope.table()) == Relation::Unrelated {
                    warn!("role {} has no relation to table {}", role, table);
                    return Err(Error::UnrelatedRole{table: table.to_string(), role: role.to_string()});
                } // if
                Ok(())
            }, // Some
        } // match
    } // validate_role

    #[inline]
    pub fn roles(&self) -> &RoleHierarchy {
        &self.roles
    } // roles

    #[inline]
    pub fn users(&self) -> &UserTable {
        &self.users
    } // users

    /// Returns true if rules are defined for the table.
    #[inline]
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    } // has_table

    pub fn table(&self, table: &str) -> Option<&TableRules> {
        self.tables.get(table)
    } // table

    pub fn master_of(&self, table: &str) -> Option<&MasterLink> {
        self.tables.get(table).and_then(|t| t.master.as_ref())
    } // master_of

    pub fn link_of(&self, table: &str) -> Option<&CrossLink> {
        self.tables.get(table).and_then(|t| t.link.as_ref())
    } // link_of

    /// The state of new records of a table. None if the table has no lifecycle state.
    pub fn initial_state(&self, table: &str) -> Option<&str> {
        self.tables.get(table)
            .and_then(|t| t.state.as_ref())
            .map(|s| s.initial.as_str())
    } // initial_state

    /// The lifecycle state of a record. Records without a state value, and new records, are in
    /// the initial state. None if the table has no lifecycle state.
    pub fn state_of<'a>(&'a self, table: &str, record: Option<&'a Record>) -> Option<&'a str> {
        let state = self.tables.get(table)?.state.as_ref()?;

        match record.and_then(|r| r.field(&state.field)) {
            Some(value) => Some(value),
            None        => Some(state.initial.as_str()),
        } // match
    } // state_of

    /// The states a table declares rules for, or a single `None` for a stateless table.
    pub fn states(&self, table: &str) -> Vec<Option<&str>> {
        match self.tables.get(table) {
            None                                   => vec![],
            Some(t) if t.state.is_none()           => vec![None],
            Some(t)                                => t.states.keys().map(|s| Some(s.as_str())).collect(),
        } // match
    } // states

    /// All rules of a table in a state. Unknown tables and states yield an empty map.
    pub fn actions(&self, table: &str, state: Option<&str>) -> &ActionMap {
        trace!("getting actions for {} in state {:?}", table, state);
        let rules = match self.tables.get(table) {
            Some(rules) => rules,
            None        => return &NO_ACTIONS,
        }; // match

        match &rules.state {
            None        => &rules.actions,
            Some(field) => {
                let state = state.unwrap_or(&field.initial);

                match rules.states.get(state) {
                    Some(actions) => actions,
                    None          => {
                        warn!("no rules for {} in state {}", table, state);
                        &NO_ACTIONS
                    }, // None
                } // match
            }, // Some
        } // match
    } // actions

    /// The permissions of all roles for an action. Anything undeclared yields an empty map,
    /// which denies the action for every role.
    pub fn lookup(&self, table: &str, state: Option<&str>, action: &str) -> &RoleMap {
        self.actions(table, state).get(action).unwrap_or(&NO_ROLES)
    } // lookup

    /// Returns the table followed by its masters, nearest first. Returns an empty vector if the
    /// table is undefined.
    pub fn lineage<'a>(&'a self, table: &'a str) -> Vec<&'a str> {
        if !self.tables.contains_key(table) {
            return vec![];
        } // if

        let mut lineage = vec![table];
        let mut next    = self.master_of(table);

        while let Some(master) = next {
            if lineage.contains(&master.table.as_str()) {
                break;
            } // if
            lineage.push(&master.table);
            next = self.master_of(&master.table);
        } // while
        lineage
    } // lineage

    /// How records of `other` relate to records of `table`.
    pub fn relation(&self, table: &str, other: &str) -> Relation {
        if table == other {
            return Relation::Own;
        } // if

        let up = self.lineage(table);

        if let Some(k) = up.iter().position(|t| *t == other) {
            return Relation::Master(up[1..=k].iter().map(|t| t.to_string()).collect());
        } // if

        let down = self.lineage(other);

        if let Some(k) = down.iter().position(|t| *t == table) {
            return Relation::Detail(down[..k].iter().rev().map(|t| t.to_string()).collect());
        } // if
        Relation::Unrelated
    } // relation

} // impl RuleTable


// Tests //////////////////////////////////////////////////////////////////////////////////////////


// mod tests
