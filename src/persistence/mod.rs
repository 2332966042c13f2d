//! Persistence as tables needs to have the following components
//! - Schema (tables of typed columns, order of columns is important)
//! - Row (an open mapping of column names to values, plus a row uid)
//! - DataTable (the rows of one table, checked against its definition)
//! - DataTables (one DataTable per table of a schema, the persisted document)
//!

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

//  All modules of this lib
mod database;
mod datatype;
mod random;
mod row;
mod schema;
mod table;

//  External API
pub use database::{DataTables, DataTablesDocument};
pub use datatype::{ColumnReference, ColumnType};
pub use random::{NANOID_ALPHABET, NANOID_DEFAULT_SIZE, RandomSource};
pub use row::{Row, RowRef};
pub use schema::{
    Column, Entity, Layout, Model, Schema, SchemaRef, Table, TableRef, default_title,
};
pub use table::{DataTable, Sample};

/// Lock access that takes the guard of a poisoned lock instead of panicking.
pub trait LockExt<T> {
    fn read_lock(&self) -> RwLockReadGuard<'_, T>;
    fn write_lock(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> LockExt<T> for RwLock<T> {
    fn read_lock(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(string) => string.clone(),
        Value::Null => "NIL".to_string(),
        other => other.to_string(),
    }
}
