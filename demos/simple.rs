use log::info;
use zorq_cms_acl::*;

fn main() -> Result<(), Error> {
    env_logger::init();

    let rules = match std::env::args().nth(1) {
        Some(path) => RuleTable::load(path)?,
        None       => RuleTable::builtin()?,
    }; // match

    let mut store = MemoryStore::new();

    store.add_user("root1", Some("root"));
    store.add_user("alice", Some("user"));
    store.add_user("bob", Some("user"));
    store.add_user("carol", Some("user"));

    store.insert(Record::new("project", "p1").with("isVisible", "true"));
    store.insert(Record::new("edition", "e1").with("projectId", "p1"));
    store.insert(Record::new("edition", "e2").with("projectId", "p1").with("isPublished", "true"));

    // alice organises the project, bob edits e1 and carol reviews it
    if let Some(link) = rules.link_of("project") {
        store.link(link, "pu1", "alice", "p1", "organiser");
    } // if
    if let Some(link) = rules.link_of("edition") {
        store.link(link, "eu1", "bob", "e1", "editor");
        store.link(link, "eu2", "carol", "e1", "reviewer");
    } // if

    for user in [None, Some("root1"), Some("alice"), Some("bob"), Some("carol")].iter() {
        let auth = Authority::new(&rules, &store, *user);

        for (table, id) in [("project", "p1"), ("edition", "e1"), ("edition", "e2")].iter() {
            let actions = auth.permitted(table, Target::Id(*id), None);

            info!("{} may {:?} on {} {}", user.unwrap_or("nobody"), actions, table, id);
        } // for

        let create = auth.authorize("edition", Target::Insert(&[("project", "p1")]), CREATE, None);
        let review = auth.authorize("edition", Target::Id("e1"), "edit", Some("comment"));
        let assign = auth.resolve_assignable(Some("carol"), Some("edition"), Some(RecordRef::Id("e1")));

        info!("{} may create editions: {}, comment on e1: {}", user.unwrap_or("nobody"), create, review);
        info!("{} may give carol {:?} on e1", user.unwrap_or("nobody"), assign.roles);
    } // for

    Ok(())
} // main
