//! The storage contract of the engine.
//!
//! A storage exposes four entry points over five categories of entities
//! (`schema`, `table`, `column`, `datatable`, `row`) and answers every call
//! with a [`StorageResult`]. Failures of the data (missing parents, missing
//! files) are reported in the envelope; only a misconfigured backend is an
//! error proper, see [`from_config`].
//!
//! Per entity the life cycle is:
//!
//! ```text
//! (absent) --post(no uid)--> created --post(with uid)--> updated
//! created/updated --delete--> (absent)
//! created/updated --get--> loaded
//! ```

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::StorageConfig;
use crate::persistence::{Column, DataTables, LockExt, Model, SchemaRef, TableRef};

mod json;

pub use json::JsonStorage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schema,
    Table,
    Column,
    #[serde(rename = "datatable")]
    DataTable,
    Row,
}

/// Where an operation got to. `Pending` until the operation completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    #[serde(rename = "")]
    Pending,
    Created,
    Updated,
    Loaded,
    Error,
}

/// The objects an operation materialised, ready for use without a second
/// fetch.
#[derive(Default)]
pub struct ResultData {
    pub schema: Option<SchemaRef>,
    pub table: Option<TableRef>,
    pub column: Option<Column>,
    pub datatable: Option<DataTables>,
}

/// The envelope every storage operation answers with.
///
/// `data` is only meaningful when [`StorageResult::exists`] is true.
#[derive(Default)]
pub struct StorageResult {
    pub category: Option<Category>,
    pub uid: String,
    pub name: String,
    pub title: String,
    pub status: Status,
    pub message: String,
    pub data: ResultData,
}

/// The payload of [`DataTableStorage::post`].
///
/// `schema` and `table` are the uids of the parents of the posted entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostData {
    pub category: Option<Category>,
    pub uid: String,
    pub name: String,
    pub title: String,
    pub dtype: String,
    pub schema: String,
    pub table: String,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Schema => "schema",
            Category::Table => "table",
            Category::Column => "column",
            Category::DataTable => "datatable",
            Category::Row => "row",
        }
    }

    pub fn is_schema_part(&self) -> bool {
        //! Schemas, tables and columns all live in the schema document.

        matches!(self, Category::Schema | Category::Table | Category::Column)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schema" => Ok(Category::Schema),
            "table" => Ok(Category::Table),
            "column" => Ok(Category::Column),
            "datatable" => Ok(Category::DataTable),
            "row" => Ok(Category::Row),
            other => Err(format!("invalid category {}: not supported", other)),
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "",
            Status::Created => "created",
            Status::Updated => "updated",
            Status::Loaded => "loaded",
            Status::Error => "error",
        }
    }
}

impl StorageResult {
    pub fn new(category: Option<Category>, uid: &str) -> StorageResult {
        StorageResult {
            category,
            uid: uid.to_string(),
            ..StorageResult::default()
        }
    }

    pub fn exists(&self) -> bool {
        //! True when the operation did not fail and produced an entity:
        //! status is not `error`, and both uid and category are set.

        self.status != Status::Error && !self.uid.is_empty() && self.category.is_some()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.status = Status::Error;
        self.message = message.into();
    }

    pub fn to_json(&self, with_data: bool) -> Value {
        //! A plain summary of the envelope, `data` holds the dumps of the
        //! materialised objects when asked for.

        let mut summary = json!({
            "category": self.category.map(|c| c.as_str()).unwrap_or_default(),
            "uid": self.uid,
            "name": self.name,
            "title": self.title,
            "status": self.status.as_str(),
            "message": self.message,
        });

        if with_data {
            let mut data = serde_json::Map::new();
            if let Some(schema) = &self.data.schema {
                data.insert("schema".to_string(), json!(schema.read_lock().dump()));
            }
            if let Some(table) = &self.data.table {
                data.insert("table".to_string(), json!(table.read_lock().uid()));
            }
            if let Some(column) = &self.data.column {
                data.insert("column".to_string(), json!(column));
            }
            if let Some(datatable) = &self.data.datatable {
                data.insert("datatable".to_string(), json!(datatable.dump()));
            }
            summary["data"] = Value::Object(data);
        }

        summary
    }
}

/// The create, read, update and delete contract over the storage categories.
///
/// Every mutation is persisted before the call returns. A backend decides
/// the granularity; the JSON backend rewrites whole documents.
pub trait DataTableStorage {
    /// Summaries of all stored entities of a top level category.
    fn get_list(&self, category: Category) -> Vec<StorageResult>;

    /// Read one entity, `data` carries the loaded object.
    fn get(&self, category: Category, uid: &str) -> StorageResult;

    /// Create an entity (no uid) or update one (with uid).
    fn post(&self, data: &PostData) -> StorageResult;

    /// Remove an entity. Returns false when there was nothing to remove.
    fn delete(&self, category: Category, uid: &str) -> bool;

    /// Persist the documents behind a result whose data the caller changed.
    fn store(&self, result: &StorageResult) -> Result<(), String>;

    fn post_schema(&self, name: &str, title: &str) -> StorageResult {
        self.post(&PostData {
            category: Some(Category::Schema),
            name: name.to_string(),
            title: title.to_string(),
            ..PostData::default()
        })
    }

    fn post_tables(&self, schema: &str, tables: &[(&str, &str)]) -> Vec<StorageResult> {
        //! Create one table per `(name, title)`.

        tables
            .iter()
            .map(|(name, title)| {
                self.post(&PostData {
                    category: Some(Category::Table),
                    name: name.to_string(),
                    title: title.to_string(),
                    schema: schema.to_string(),
                    ..PostData::default()
                })
            })
            .collect()
    }

    fn post_columns(&self, schema: &str, table: &str, columns: &[(&str, &str)]) -> Vec<StorageResult> {
        //! Create one column per `(name, dtype)`.

        columns
            .iter()
            .map(|(name, dtype)| {
                self.post(&PostData {
                    category: Some(Category::Column),
                    name: name.to_string(),
                    dtype: dtype.to_string(),
                    schema: schema.to_string(),
                    table: table.to_string(),
                    ..PostData::default()
                })
            })
            .collect()
    }
}

pub fn from_config(config: &StorageConfig) -> Result<Box<dyn DataTableStorage>, String> {
    //! Build the storage backend named by the configuration.
    //!
    //! An unknown backend is the one error that is not reported in-band.

    match config.backend.as_str() {
        "json" => Ok(Box::new(JsonStorage::new(&config.workdir))),
        other => Err(format!("storage not supported \"{}\"", other)),
    }
}
