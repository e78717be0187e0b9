//! Records and the lookup capabilities the engine needs from the content layer.

use log::trace;
use std::borrow::Cow;
use std::collections::BTreeMap;


// Record /////////////////////////////////////////////////////////////////////////////////////////


/// A snapshot of one record: its table, its id and its field values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    table:  String,
    id:     String,
    fields: BTreeMap<String, String>,
} // struct Record

impl Record {

    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        Record{table: table.into(), id: id.into(), fields: BTreeMap::new()}
    } // new

    /// Builder style field assignment.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    } // with

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    } // table

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    } // id

    /// Value of a field, None if the record has no such field.
    #[inline]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    } // field

    /// Returns true if every `(field, value)` pair matches.
    pub fn matches(&self, criteria: &[(&str, &str)]) -> bool {
        criteria.iter().all(|(field, value)| self.field(field) == Some(*value))
    } // matches

} // impl Record

/// A record handed over by the caller, either already loaded or by id only.
#[derive(Clone, Copy, Debug)]
pub enum RecordRef<'r> {
    Loaded(&'r Record),
    Id(&'r str),
} // enum RecordRef

impl<'r> RecordRef<'r> {

    /// Loads the record from the store if only its id is known.
    pub fn resolve<S: RecordStore + ?Sized>(self, store: &S, table: &str) -> Option<Cow<'r, Record>> {
        match self {
            RecordRef::Loaded(record) => Some(Cow::Borrowed(record)),
            RecordRef::Id(id)         => store.get_by_id(table, id).map(Cow::Owned),
        } // match
    } // resolve

} // impl RecordRef

impl<'r> From<&'r Record> for RecordRef<'r> {

    fn from(record: &'r Record) -> Self {
        RecordRef::Loaded(record)
    } // from

} // impl From<&Record> for RecordRef

impl<'r> From<&'r str> for RecordRef<'r> {

    fn from(id: &'r str) -> Self {
        RecordRef::Id(id)
    } // from

} // impl From<&str> for RecordRef


// RecordStore ////////////////////////////////////////////////////////////////////////////////////


/// Read access to the data the decisions are made over. Implementations must answer from a
/// consistent snapshot for the duration of one call; the engine never writes.
pub trait RecordStore {

    /// The record with the given id, if any.
    fn get_by_id(&self, table: &str, id: &str) -> Option<Record>;

    /// All records of a table whose fields equal the given values.
    fn get_records_where(&self, table: &str, criteria: &[(&str, &str)]) -> Vec<Record>;

    /// The site role stored for a user, if the user exists and has one.
    fn get_user_base_role(&self, user: &str) -> Option<String>;

    /// Returns true if at least one user holds the site role. Must read the same field as
    /// `get_user_base_role`.
    fn has_user_with_role(&self, role: &str) -> bool;

} // trait RecordStore

impl<S: RecordStore + ?Sized> RecordStore for &S {

    fn get_by_id(&self, table: &str, id: &str) -> Option<Record> {
        (**self).get_by_id(table, id)
    } // get_by_id

    fn get_records_where(&self, table: &str, criteria: &[(&str, &str)]) -> Vec<Record> {
        (**self).get_records_where(table, criteria)
    } // get_records_where

    fn get_user_base_role(&self, user: &str) -> Option<String> {
        (**self).get_user_base_role(user)
    } // get_user_base_role

    fn has_user_with_role(&self, role: &str) -> bool {
        (**self).has_user_with_role(role)
    } // has_user_with_role

} // impl RecordStore for &S


// MemoryStore ////////////////////////////////////////////////////////////////////////////////////


/// An in-memory snapshot of records, keyed by table and id. Users are records of the user
/// table and carry their site role in the role field (`user` and `role` by default).
#[derive(Clone, Debug)]
pub struct MemoryStore {
    tables:     BTreeMap<String, BTreeMap<String, Record>>,
    user_table: String,
    role_field: String,
} // struct MemoryStore

impl MemoryStore {

    pub fn new() -> Self {
        MemoryStore::with_users("user", "role")
    } // new

    /// Creates a store keeping users in `table` with their site role in `role_field`.
    pub fn with_users(table: impl Into<String>, role_field: impl Into<String>) -> Self {
        MemoryStore{
            tables:     BTreeMap::new(),
            user_table: table.into(),
            role_field: role_field.into(),
        } // MemoryStore
    } // with_users

    /// Inserts or replaces a record.
    pub fn insert(&mut self, record: Record) {
        trace!("storing {}/{}", record.table(), record.id());
        self.tables
            .entry(record.table().to_string())
            .or_default()
            .insert(record.id().to_string(), record);
    } // insert

    /// Removes a record and returns it.
    pub fn remove(&mut self, table: &str, id: &str) -> Option<Record> {
        trace!("removing {}/{}", table, id);
        self.tables.get_mut(table).and_then(|records| records.remove(id))
    } // remove

    /// Inserts a user with an optional site role.
    pub fn add_user(&mut self, id: &str, role: Option<&str>) {
        let mut user = Record::new(self.user_table.as_str(), id);

        if let Some(role) = role {
            user = user.with(self.role_field.as_str(), role);
        } // if
        self.insert(user);
    } // add_user

    /// Inserts a cross-link record.
    pub fn link(&mut self, link: &crate::CrossLink, id: &str, user: &str, record: &str, role: &str) {
        self.insert(
            Record::new(link.table.as_str(), id)
                .with(link.user.as_str(), user)
                .with(link.record.as_str(), record)
                .with(link.role.as_str(), role)
        );
    } // link

} // impl MemoryStore

impl Default for MemoryStore {

    fn default() -> Self {
        MemoryStore::new()
    } // default

} // impl Default for MemoryStore

impl RecordStore for MemoryStore {

    fn get_by_id(&self, table: &str, id: &str) -> Option<Record> {
        self.tables.get(table).and_then(|records| records.get(id)).cloned()
    } // get_by_id

    fn get_records_where(&self, table: &str, criteria: &[(&str, &str)]) -> Vec<Record> {
        match self.tables.get(table) {
            None          => vec![],
            Some(records) => records.values().filter(|r| r.matches(criteria)).cloned().collect(),
        } // match
    } // get_records_where

    fn get_user_base_role(&self, user: &str) -> Option<String> {
        self.get_by_id(&self.user_table, user)
            .and_then(|record| record.field(&self.role_field).map(String::from))
    } // get_user_base_role

    fn has_user_with_role(&self, role: &str) -> bool {
        self.tables.get(&self.user_table)
            .map_or(false, |users| users.values().any(|user| user.field(&self.role_field) == Some(role)))
    } // has_user_with_role

} // impl RecordStore for MemoryStore


// Tests //////////////////////////////////////////////////////////////////////////////////////////


// mod tests
