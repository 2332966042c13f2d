use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::datatype::ColumnType;
use crate::persistence::random::RandomSource;
use crate::persistence::{LockExt, Model, SchemaRef};

use super::table::{DataTable, Sample};

/// The collective of the [`DataTable`]s of one schema.
///
/// Holds one [`DataTable`] per table of the schema, keyed by table name, and
/// is persisted as a whole with [`DataTables::dump`]. The schema is shared,
/// never owned.
///
/// # Issues
/// - Tables added to the schema after construction get no [`DataTable`] until
/// the document is rebuilt.
pub struct DataTables {
    uid: String,
    name: String,
    title: String,
    schema: SchemaRef,
    tables: IndexMap<String, DataTable>,
}

/// The persisted form of a [`DataTables`].
///
/// Each row is stored as `[row_uid, value, ...]` with the values in the
/// column order of its table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTablesDocument {
    pub schema: String,
    pub uid: String,
    pub name: String,
    pub title: String,
    pub tables: IndexMap<String, Vec<Vec<Value>>>,
}

impl DataTables {
    pub fn new(schema: SchemaRef, title: &str) -> DataTables {
        //! Create one empty [`DataTable`] per table of the schema.

        let (uid, tables) = {
            let schema = schema.read_lock();
            let tables = schema
                .tables()
                .values()
                .map(|table| (table.read_lock().name().to_string(), DataTable::new(Arc::clone(table))))
                .collect();
            (schema.random().uuid(), tables)
        };

        DataTables {
            uid,
            name: title.to_string(),
            title: title.to_string(),
            schema,
            tables,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn get(&self, table_name: &str) -> Option<&DataTable> {
        self.tables.get(table_name)
    }

    pub fn get_mut(&mut self, table_name: &str) -> Option<&mut DataTable> {
        self.tables.get_mut(table_name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataTable)> {
        self.tables.iter()
    }

    fn random(&self) -> RandomSource {
        self.schema.read_lock().random().clone()
    }

    pub fn update_choices(&self) {
        //! Rebuild the choices of every reference column (`table.column`)
        //! from the current rows: row uid of the referenced table mapped to
        //! that row's value in the referenced column.
        //!
        //! A reference to a table that is not in this document is skipped.

        let schema = self.schema.read_lock();
        for table in schema.tables().values() {
            let mut table = table.write_lock();
            let references: Vec<(String, _)> = table
                .columns()
                .values()
                .filter_map(|c| match c.column_type() {
                    ColumnType::Reference(reference) => Some((c.uid.clone(), reference)),
                    _ => None,
                })
                .collect();

            for (column_uid, reference) in references {
                let Some(source) = self.tables.get(&reference.table_name) else {
                    warn!(
                        "datatable {}: no table '{}' for choices of column {}",
                        self.uid, reference.table_name, column_uid
                    );
                    continue;
                };

                let choices: IndexMap<String, Value> = source
                    .rows()
                    .iter()
                    .map(|row| {
                        let value = row.get(&reference.column_name).cloned();
                        (row.uid().to_string(), value.unwrap_or(Value::Null))
                    })
                    .collect();

                if let Some(column) = table.column_mut(&column_uid) {
                    debug!(
                        "datatable {}: {} choices for column {} from {}",
                        self.uid,
                        choices.len(),
                        column.name,
                        reference
                    );
                    column.choices = choices;
                }
            }
        }
    }

    pub fn generate(&mut self, max_rows: usize, samples: &IndexMap<String, Sample>) {
        //! Fill every table with a random number of rows, between 2 and
        //! `max_rows`.

        let random = self.random();
        for table in self.tables.values_mut() {
            let row_count = random.int_between(2, max_rows.max(2) as i64) as usize;
            table.generate(row_count, samples);
        }
    }

    pub fn dump(&self) -> DataTablesDocument {
        let tables = self
            .tables
            .iter()
            .map(|(name, table)| {
                let column_names = table.table().read_lock().column_names();
                let rows = table
                    .rows()
                    .iter()
                    .map(|row| {
                        std::iter::once(Value::String(row.uid().to_string()))
                            .chain(
                                column_names
                                    .iter()
                                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null)),
                            )
                            .collect()
                    })
                    .collect();
                (name.clone(), rows)
            })
            .collect();

        DataTablesDocument {
            schema: self.schema.read_lock().uid().to_string(),
            uid: self.uid.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            tables,
        }
    }

    pub fn load(&mut self, document: &DataTablesDocument) -> usize {
        //! Replay a persisted document into this one.
        //!
        //! Rows go through positional insertion, so `inc`, `uuid` and `nanoid`
        //! primary keys are derived again rather than restored; row uids are
        //! kept. Rows of tables unknown to the schema are dropped, the number
        //! of dropped rows is returned.

        if !document.uid.is_empty() {
            self.uid = document.uid.clone();
        }
        self.name = document.name.clone();
        self.title = document.title.clone();

        let mut n_dropped = 0;
        for (name, rows) in document.tables.iter() {
            let Some(table) = self.tables.get_mut(name) else {
                warn!(
                    "datatable {}: dropped {} rows of unknown table '{}'",
                    self.uid,
                    rows.len(),
                    name
                );
                n_dropped += rows.len();
                continue;
            };

            let primary_key_position = {
                let definition = table.table();
                let definition = definition.read_lock();
                definition
                    .primary_key()
                    .and_then(|pk| definition.column_names().iter().position(|c| c == pk))
            };

            for stored in rows {
                let mut values = stored.iter().cloned();
                let uid = match values.next() {
                    Some(Value::String(uid)) => uid,
                    _ => String::new(),
                };
                let values: Vec<Value> = values
                    .enumerate()
                    .filter(|(index, _)| Some(*index) != primary_key_position)
                    .map(|(_, value)| value)
                    .collect();
                table.push_loaded(&uid, values);
            }
        }

        n_dropped
    }
}
