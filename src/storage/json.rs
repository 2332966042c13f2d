use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Value;

use crate::persistence::{
    DataTables, DataTablesDocument, LockExt, Model, RandomSource, Schema, SchemaRef,
};

use super::{Category, DataTableStorage, PostData, Status, StorageResult};

/// A storage keeping one JSON file per document under a working directory.
///
/// ```text
/// <workdir>/schema/<schema-uid>.json        flat list of schema, table, column records
/// <workdir>/datatable/<datatable-uid>.json  {schema, uid, name, title, tables}
/// ```
///
/// Every mutation rewrites the whole document it touches.
///
/// # Issues
/// - There is no locking, two writers of the same document race and the
/// last write wins.
pub struct JsonStorage {
    workdir: PathBuf,
    random: RandomSource,
}

impl JsonStorage {
    pub fn new(workdir: impl AsRef<Path>) -> JsonStorage {
        JsonStorage::with_random(workdir, RandomSource::from_entropy())
    }

    pub fn with_random(workdir: impl AsRef<Path>, random: RandomSource) -> JsonStorage {
        //! A storage whose new and loaded schemas all draw from `random`.

        JsonStorage {
            workdir: workdir.as_ref().to_path_buf(),
            random,
        }
    }

    fn _empty_schema(&self) -> Schema {
        Schema::with_random(self.random.clone(), "", "")
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn _file(&self, category: Category, uid: &str) -> Result<PathBuf, String> {
        //! The document path of `uid`. A uid that is not a single plain file
        //! name component is rejected.

        let plain = !uid.is_empty()
            && !uid.contains(['/', '\\'])
            && Path::new(uid).file_name() == Some(OsStr::new(uid));
        if !plain {
            return Err(format!("invalid {} uid \"{}\"", category, uid));
        }

        Ok(self
            .workdir
            .join(category.as_str())
            .join(format!("{}.json", uid)))
    }

    fn _files(&self, category: Category) -> Vec<PathBuf> {
        //! All documents of a category, in file name order.

        let Ok(entries) = fs::read_dir(self.workdir.join(category.as_str())) else {
            return vec![];
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        files
    }

    fn _read(&self, file: &Path) -> Result<Value, String> {
        let text = fs::read_to_string(file)
            .map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
        serde_json::from_str(&text).map_err(|e| format!("cannot parse {}: {}", file.display(), e))
    }

    fn _write(&self, file: &Path, value: &Value) -> Result<(), String> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
        }
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| format!("cannot serialize {}: {}", file.display(), e))?;
        fs::write(file, text).map_err(|e| format!("cannot write {}: {}", file.display(), e))?;
        debug!("wrote {}", file.display());
        Ok(())
    }

    fn _write_schema(&self, schema: &Schema) -> Result<(), String> {
        let file = self._file(Category::Schema, schema.uid())?;
        self._write(&file, &Value::Array(schema.dump()))
    }

    fn _write_datatable(&self, tables: &DataTables) -> Result<(), String> {
        let file = self._file(Category::DataTable, tables.uid())?;
        let document = serde_json::to_value(tables.dump())
            .map_err(|e| format!("cannot serialize datatable {}: {}", tables.uid(), e))?;
        self._write(&file, &document)
    }

    fn _load_schema(&self, uid: &str) -> Result<SchemaRef, String> {
        let file = self._file(Category::Schema, uid)?;
        if !file.exists() {
            return Err(format!("schema not found \"{}\"", uid));
        }

        let records = self._read(&file)?;
        let mut schema = self._empty_schema();
        let n_dropped = schema.load(&records);
        if n_dropped > 0 {
            warn!("schema {}: {} records dropped on load", uid, n_dropped);
        }
        Ok(schema.into_shared())
    }

    fn _parent_schema(&self, uid: &str) -> Option<SchemaRef> {
        //! The schema a posted entity belongs to. A failed load is logged and
        //! left to the caller as a soft failure.

        match self._load_schema(uid) {
            Ok(schema) => Some(schema),
            Err(message) => {
                warn!("no parent schema: {}", message);
                None
            }
        }
    }

    fn _load_datatable(&self, uid: &str) -> Result<DataTables, String> {
        let file = self._file(Category::DataTable, uid)?;
        if !file.exists() {
            return Err(format!("datatable not found \"{}\"", uid));
        }

        let document: DataTablesDocument = serde_json::from_value(self._read(&file)?)
            .map_err(|e| format!("cannot parse {}: {}", file.display(), e))?;
        let schema = self._load_schema(&document.schema)?;

        let mut tables = DataTables::new(schema, &document.title);
        let n_dropped = tables.load(&document);
        if n_dropped > 0 {
            warn!("datatable {}: {} rows dropped on load", uid, n_dropped);
        }
        Ok(tables)
    }

    fn _delete_from_schemas(&self, uid: &str) -> Result<bool, String> {
        //! Remove a table or column from whichever schema document holds it.

        for file in self._files(Category::Schema) {
            let Ok(records) = self._read(&file) else {
                continue;
            };
            let mut schema = self._empty_schema();
            schema.load(&records);

            if schema.delete(uid) {
                self._write_schema(&schema)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn _delete_row(&self, uid: &str) -> Result<bool, String> {
        //! Remove the row entry whose leading uid matches from whichever
        //! data-table document holds it.

        for file in self._files(Category::DataTable) {
            let Ok(mut document) = self._read(&file) else {
                continue;
            };
            let Some(tables) = document.get_mut("tables").and_then(Value::as_object_mut) else {
                continue;
            };

            let mut found = false;
            for rows in tables.values_mut() {
                let Some(rows) = rows.as_array_mut() else {
                    continue;
                };
                if let Some(index) = rows
                    .iter()
                    .position(|row| row.get(0).and_then(Value::as_str) == Some(uid))
                {
                    rows.remove(index);
                    found = true;
                    break;
                }
            }

            if found {
                self._write(&file, &document)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn _post_schema_part(&self, data: &PostData, result: &mut StorageResult) {
        let Some(category) = result.category else {
            return;
        };

        match category {
            Category::Schema => {
                let schema = Schema::with_random(self.random.clone(), &data.name, &data.title);
                result.uid = schema.uid().to_string();
                result.name = schema.name().to_string();
                result.title = schema.title().to_string();
                result.status = Status::Created;
                result.data.schema = Some(schema.into_shared());
            }
            Category::Table => {
                let Some(schema) = self._parent_schema(&data.schema) else {
                    return;
                };
                let table = schema.write_lock().add(&data.name, &data.title, &[]);
                {
                    let table = table.read_lock();
                    result.uid = table.uid().to_string();
                    result.name = table.name().to_string();
                    result.title = table.title().to_string();
                }
                result.status = Status::Created;
                result.data.schema = Some(schema);
                result.data.table = Some(table);
            }
            Category::Column => {
                let Some(schema) = self._parent_schema(&data.schema) else {
                    return;
                };
                result.data.schema = Some(schema.clone());

                let Some(table) = schema.read_lock().tables().get(&data.table).cloned() else {
                    result.error(format!("table not found {}", data.table));
                    return;
                };

                let column = table
                    .write_lock()
                    .add(&data.name, &data.title, &data.dtype, None)
                    .clone();
                result.uid = column.uid.clone();
                result.name = column.name.clone();
                result.title = column.title.clone();
                result.status = Status::Created;
                result.data.table = Some(table);
                result.data.column = Some(column);
            }
            Category::DataTable | Category::Row => {}
        }
    }
}

impl DataTableStorage for JsonStorage {
    fn get_list(&self, category: Category) -> Vec<StorageResult> {
        //! Summaries read from the head of each document: the `schema`
        //! record of a schema document, the header of a data-table document.

        let mut items = Vec::new();

        for file in self._files(category) {
            let data = match self._read(&file) {
                Ok(data) => data,
                Err(message) => {
                    warn!("{}", message);
                    continue;
                }
            };

            let header = match category {
                Category::Schema => data.as_array().and_then(|records| {
                    records
                        .iter()
                        .find(|r| r.get("dtype").and_then(Value::as_str) == Some("schema"))
                        .cloned()
                }),
                Category::DataTable => data.is_object().then_some(data),
                _ => None,
            };

            if let Some(header) = header {
                let field = |key: &str| {
                    header
                        .get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let mut item = StorageResult::new(Some(category), &field("uid"));
                item.name = field("name");
                item.title = field("title");
                item.status = Status::Loaded;
                items.push(item);
            }
        }

        items
    }

    fn get(&self, category: Category, uid: &str) -> StorageResult {
        let mut result = StorageResult::new(Some(category), uid);

        match category {
            Category::Schema => match self._load_schema(uid) {
                Ok(schema) => {
                    {
                        let schema = schema.read_lock();
                        result.name = schema.name().to_string();
                        result.title = schema.title().to_string();
                    }
                    result.status = Status::Loaded;
                    result.data.schema = Some(schema);
                }
                Err(message) => result.error(message),
            },
            Category::DataTable => match self._load_datatable(uid) {
                Ok(tables) => {
                    result.name = tables.name().to_string();
                    result.title = tables.title().to_string();
                    result.status = Status::Loaded;
                    result.data.schema = Some(tables.schema());
                    result.data.datatable = Some(tables);
                }
                Err(message) => result.error(message),
            },
            other => result.error(format!("{} not found \"{}\"", other, uid)),
        }

        result
    }

    fn post(&self, data: &PostData) -> StorageResult {
        let mut result = StorageResult::new(data.category, &data.uid);

        if !result.uid.is_empty() {
            warn!(
                "{} {}: updating through post is not implemented, nothing stored",
                data.category.map(|c| c.as_str()).unwrap_or_default(),
                data.uid
            );
            result.status = Status::Updated;
            return result;
        }

        match data.category {
            Some(category) if category.is_schema_part() => {
                self._post_schema_part(data, &mut result);
            }
            Some(Category::DataTable) => {
                if let Some(schema) = self._parent_schema(&data.schema) {
                    let tables = DataTables::new(schema, &data.title);
                    result.uid = tables.uid().to_string();
                    result.name = tables.name().to_string();
                    result.title = tables.title().to_string();
                    result.status = Status::Created;
                    result.data.schema = Some(tables.schema());
                    result.data.datatable = Some(tables);
                }
            }
            _ => {}
        }

        if let Err(message) = self.store(&result) {
            result.error(message);
        }
        result
    }

    fn delete(&self, category: Category, uid: &str) -> bool {
        let outcome = match category {
            Category::Schema | Category::DataTable => {
                self._file(category, uid).and_then(|file| {
                    if !file.exists() {
                        return Ok(false);
                    }
                    fs::remove_file(&file)
                        .map(|_| true)
                        .map_err(|e| format!("cannot remove {}: {}", file.display(), e))
                })
            }
            Category::Table | Category::Column => self._delete_from_schemas(uid),
            Category::Row => self._delete_row(uid),
        };

        match outcome {
            Ok(deleted) => {
                debug!("delete {} {}: {}", category, uid, deleted);
                deleted
            }
            Err(message) => {
                warn!("delete {} {}: {}", category, uid, message);
                false
            }
        }
    }

    fn store(&self, result: &StorageResult) -> Result<(), String> {
        //! Rewrite the schema document for schema, table and column results,
        //! the data-table document for datatable and row results. Results
        //! that do not exist, or carry no data, store nothing.

        if !result.exists() {
            return Ok(());
        }

        match result.category {
            Some(category) if category.is_schema_part() => match &result.data.schema {
                Some(schema) => self._write_schema(&schema.read_lock()),
                None => Ok(()),
            },
            Some(Category::DataTable) | Some(Category::Row) => match &result.data.datatable {
                Some(tables) => self._write_datatable(tables),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}
