//! Ordered role vocabularies for the three scopes of the CMS.
//!
//! Every role belongs to exactly one scope. Within a scope roles are ranked from the most
//! powerful (rank 0) to the weakest. Roles of different scopes never compare: an "organiser" is
//! neither more nor less powerful than an "editor".
//!
//! The site vocabulary carries two special entries at its end. The last role is held by callers
//! who are not logged in (*anonymous*), the one before it by logged-in users without an explicit
//! role (*guest*).

use crate::Error;
use log::{trace, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;


// Scope //////////////////////////////////////////////////////////////////////////////////////////


/// The scopes roles are defined for. Records of a scope live in the table of the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Site,
    Project,
    Edition,
} // enum Scope

impl Scope {

    pub const ALL: [Scope; 3] = [Scope::Site, Scope::Project, Scope::Edition];

    /// Name of the table holding the records of this scope.
    pub fn table(self) -> &'static str {
        match self {
            Scope::Site    => "site",
            Scope::Project => "project",
            Scope::Edition => "edition",
        } // match
    } // table

    /// Maps a table name back to its scope, if the table is a scope table.
    pub fn from_table(table: &str) -> Option<Scope> {
        Scope::ALL.iter().copied().find(|scope| scope.table() == table)
    } // from_table

} // impl Scope

impl fmt::Display for Scope {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.table())
    } // fmt

} // impl fmt::Display for Scope


// RoleHierarchy //////////////////////////////////////////////////////////////////////////////////


/// Site roles needed by the assignment policy: three privileged ranks, guest and anonymous.
pub const MIN_SITE_ROLES: usize = 5;

/// The role vocabularies, each ordered from the most powerful role to the weakest one.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoleHierarchy {
    site:    Vec<String>,
    #[serde(default)]
    project: Vec<String>,
    #[serde(default)]
    edition: Vec<String>,
} // struct RoleHierarchy

impl RoleHierarchy {

    /// Creates and validates a hierarchy. Returns an error if a role is declared twice or if
    /// the site vocabulary has fewer than [`MIN_SITE_ROLES`] entries.
    pub fn new<S: Into<String>>(site: Vec<S>, project: Vec<S>, edition: Vec<S>) -> Result<Self, Error> {
        let hierarchy = RoleHierarchy{
            site:    site.into_iter().map(Into::into).collect(),
            project: project.into_iter().map(Into::into).collect(),
            edition: edition.into_iter().map(Into::into).collect(),
        }; // RoleHierarchy

        hierarchy.validate()?;
        Ok(hierarchy)
    } // new

    pub(crate) fn validate(&self) -> Result<(), Error> {
        trace!("validating role hierarchy");
        if self.site.len() < MIN_SITE_ROLES {
            warn!("site vocabulary too short: {:?}", self.site);
            return Err(Error::ShortHierarchy{got: self.site.len(), min: MIN_SITE_ROLES});
        } // if

        let mut seen = HashSet::new();

        for scope in Scope::ALL.iter() {
            for role in self.roles(*scope) {
                if !seen.insert(role.as_str()) {
                    warn!("role declared twice: {}", role);
                    return Err(Error::DuplicateRole(role.clone()));
                } // if
            } // for
        } // for
        Ok(())
    } // validate

    /// Roles of a scope, most powerful first.
    pub fn roles(&self, scope: Scope) -> &[String] {
        match scope {
            Scope::Site    => &self.site,
            Scope::Project => &self.project,
            Scope::Edition => &self.edition,
        } // match
    } // roles

    /// Rank of a role within a scope. Lower is more powerful. None if the role is not part of
    /// the scope's vocabulary.
    pub fn rank(&self, scope: Scope, role: &str) -> Option<usize> {
        self.roles(scope).iter().position(|r| r == role)
    } // rank

    /// The scope a role is declared in.
    pub fn scope_of(&self, role: &str) -> Option<Scope> {
        Scope::ALL.iter().copied().find(|scope| self.rank(*scope, role).is_some())
    } // scope_of

    /// Returns true if the role is declared in any scope.
    #[inline]
    pub fn has_role(&self, role: &str) -> bool {
        self.scope_of(role).is_some()
    } // has_role

    /// The most powerful role of a scope.
    pub fn top(&self, scope: Scope) -> Option<&str> {
        self.roles(scope).first().map(String::as_str)
    } // top

    /// The site role at a given rank. Ranks below [`MIN_SITE_ROLES`] always exist.
    pub fn site_role(&self, rank: usize) -> Option<&str> {
        self.site.get(rank).map(String::as_str)
    } // site_role

    /// Site role of callers who are not logged in.
    pub fn anonymous(&self) -> &str {
        self.site.last().map(String::as_str).unwrap_or_default()
    } // anonymous

    /// Site role of logged-in users who have no role of their own.
    pub fn guest(&self) -> &str {
        self.site.len()
            .checked_sub(2)
            .and_then(|rank| self.site_role(rank))
            .unwrap_or_default()
    } // guest

    /// Returns true if `role` is strictly more powerful than `other`. Roles missing from the
    /// scope rank below every declared role, so `None` and unknown names never outrank anything.
    pub fn outranks(&self, scope: Scope, role: Option<&str>, other: Option<&str>) -> bool {
        let weakest = self.roles(scope).len();
        let a = role.and_then(|r| self.rank(scope, r)).unwrap_or(weakest);
        let b = other.and_then(|r| self.rank(scope, r)).unwrap_or(weakest);

        a < b
    } // outranks

    /// Roles of the scope ranked strictly below `role`, most powerful first.
    pub fn weaker_than<'h>(&'h self, scope: Scope, role: &str) -> impl Iterator<Item = &'h str> + 'h {
        let start = self.rank(scope, role).map_or(self.roles(scope).len(), |rank| rank + 1);

        self.roles(scope)[start..].iter().map(String::as_str)
    } // weaker_than

} // impl RoleHierarchy

impl Default for RoleHierarchy {

    /// The vocabularies of the standard CMS deployment.
    fn default() -> Self {
        RoleHierarchy{
            site:    vec!["root", "admin", "user", "guest", "none"].into_iter().map(String::from).collect(),
            project: vec![String::from("organiser")],
            edition: vec![String::from("editor"), String::from("reviewer")],
        } // RoleHierarchy
    } // default

} // impl Default for RoleHierarchy


// Tests //////////////////////////////////////////////////////////////////////////////////////////


// mod tests
