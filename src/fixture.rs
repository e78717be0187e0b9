//! A small publishing site shared by the tests.
//!
//! | user    | site role | project roles | edition roles          |
//! |---------|-----------|---------------|------------------------|
//! | root1   | root      |               |                        |
//! | admin1  | admin     |               |                        |
//! | alice   | user      | p1 organiser  |                        |
//! | bob     | user      |               | e1 editor              |
//! | carol   | user      |               | e1 reviewer, e3 editor |
//! | dave    | user      |               | e3 editor              |
//! | guest1  | guest     |               |                        |
//! | norole  | (none)    |               |                        |
//!
//! Project p1 is hidden, p2 visible. Editions e1 and e2 belong to p1, e3 to p2; only e2 is
//! published.

use crate::{MemoryStore, Record, RuleTable};

pub(crate) fn rules() -> RuleTable {
    RuleTable::builtin().unwrap()
} // rules

pub(crate) fn store(rules: &RuleTable) -> MemoryStore {
    let mut store = MemoryStore::new();

    store.add_user("root1", Some("root"));
    store.add_user("admin1", Some("admin"));
    store.add_user("alice", Some("user"));
    store.add_user("bob", Some("user"));
    store.add_user("carol", Some("user"));
    store.add_user("dave", Some("user"));
    store.add_user("guest1", Some("guest"));
    store.add_user("norole", None);

    store.insert(Record::new("site", "s1"));
    store.insert(Record::new("project", "p1").with("isVisible", "false"));
    store.insert(Record::new("project", "p2").with("isVisible", "true"));
    store.insert(Record::new("edition", "e1").with("projectId", "p1"));
    store.insert(Record::new("edition", "e2").with("projectId", "p1").with("isPublished", "true"));
    store.insert(Record::new("edition", "e3").with("projectId", "p2").with("isPublished", "false"));

    let projects = rules.link_of("project").unwrap();
    let editions = rules.link_of("edition").unwrap();

    store.link(projects, "pu1", "alice", "p1", "organiser");
    store.link(editions, "eu1", "bob", "e1", "editor");
    store.link(editions, "eu2", "carol", "e1", "reviewer");
    store.link(editions, "eu3", "carol", "e3", "editor");
    store.link(editions, "eu4", "dave", "e3", "editor");
    store
} // store
