use datatable_engine::config::StorageConfig;
use datatable_engine::generator::{EXAMPLE_SCHEMA, Generator};
use datatable_engine::persistence::{Entity, Model, RandomSource};
use datatable_engine::storage::{
    Category, DataTableStorage, JsonStorage, PostData, Status, StorageResult, from_config,
};
use serde_json::json;
use tempfile::TempDir;

fn _prepare_storage() -> (TempDir, JsonStorage) {
    let workdir = tempfile::tempdir().unwrap();
    let storage = JsonStorage::with_random(workdir.path(), RandomSource::seeded(5));
    (workdir, storage)
}

fn _prepare_schema(storage: &JsonStorage) -> (String, String, String) {
    //! A stored schema "s" with table "t" and column "c", returns their uids.

    let schema = storage.post_schema("s", "S");
    let table = storage.post_tables(&schema.uid, &[("t", "T")]).remove(0);
    let column = storage
        .post_columns(&schema.uid, &table.uid, &[("c", "str")])
        .remove(0);
    (schema.uid, table.uid, column.uid)
}

fn _post_datatable(storage: &JsonStorage, schema: &str) -> StorageResult {
    storage.post(&PostData {
        category: Some(Category::DataTable),
        title: "Example 1".to_string(),
        schema: schema.to_string(),
        ..PostData::default()
    })
}

#[test]
fn storage_post_then_get_schema() {
    let (_workdir, storage) = _prepare_storage();

    let schema = storage.post_schema("s", "S");
    assert!(schema.exists());
    assert_eq!(schema.status, Status::Created);

    let tables = storage.post_tables(&schema.uid, &[("t", "T")]);
    assert!(tables[0].exists());
    assert_ne!(tables[0].uid, schema.uid);

    let columns = storage.post_columns(&schema.uid, &tables[0].uid, &[("c", "str")]);
    assert!(columns[0].exists());
    assert_ne!(columns[0].uid, tables[0].uid);

    let loaded = storage.get(Category::Schema, &schema.uid);
    assert!(loaded.exists());
    assert_eq!(loaded.status, Status::Loaded);
    assert_eq!(loaded.title, "S");

    let schema = loaded.data.schema.unwrap();
    let table = schema.read().unwrap().table("t").unwrap();
    let table = table.read().unwrap();
    assert_eq!(table.title(), "T");
    let column = table.find("c").unwrap();
    assert_eq!(column.dtype, "str");
    assert_eq!(column.uid, columns[0].uid);
}

#[test]
fn storage_writes_one_file_per_document() {
    let (workdir, storage) = _prepare_storage();
    let (schema, _, _) = _prepare_schema(&storage);
    let datatable = _post_datatable(&storage, &schema);

    let schema_file = workdir.path().join("schema").join(format!("{}.json", schema));
    let datatable_file = workdir
        .path()
        .join("datatable")
        .join(format!("{}.json", datatable.uid));
    assert!(schema_file.exists());
    assert!(datatable_file.exists());

    let records: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(schema_file).unwrap()).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 3);
    assert_eq!(records[0]["dtype"], json!("schema"));

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(datatable_file).unwrap()).unwrap();
    assert_eq!(document["schema"], json!(schema));
    assert_eq!(document["tables"]["t"], json!([]));
}

#[test]
fn storage_table_post_without_schema_soft_fails() {
    let (workdir, storage) = _prepare_storage();

    let result = storage.post_tables("missing", &[("t", "T")]).remove(0);

    assert!(!result.exists());
    assert!(result.uid.is_empty());
    assert!(result.message.is_empty());
    assert_eq!(result.status, Status::Pending);
    assert!(!workdir.path().join("schema").exists());
}

#[test]
fn storage_column_post_without_table_errors() {
    let (_workdir, storage) = _prepare_storage();
    let schema = storage.post_schema("s", "");

    let result = storage
        .post_columns(&schema.uid, "missing", &[("c", "str")])
        .remove(0);

    assert!(!result.exists());
    assert_eq!(result.status, Status::Error);
    assert_eq!(result.message, "table not found missing");
}

#[test]
fn storage_datatable_post_without_schema_soft_fails() {
    let (_workdir, storage) = _prepare_storage();

    let result = _post_datatable(&storage, "missing");

    assert!(!result.exists());
    assert!(result.data.datatable.is_none());
}

#[test]
fn storage_post_with_uid_is_an_update_without_effect() {
    let (_workdir, storage) = _prepare_storage();
    let (schema, _, _) = _prepare_schema(&storage);

    let result = storage.post(&PostData {
        category: Some(Category::Schema),
        uid: schema.clone(),
        name: "renamed".to_string(),
        ..PostData::default()
    });

    assert_eq!(result.status, Status::Updated);
    assert!(result.exists());
    assert_eq!(storage.get(Category::Schema, &schema).name, "s");
}

#[test]
fn storage_get_missing_documents_errors() {
    let (_workdir, storage) = _prepare_storage();

    let schema = storage.get(Category::Schema, "missing");
    assert!(!schema.exists());
    assert_eq!(schema.status, Status::Error);
    assert!(schema.data.schema.is_none());

    assert!(!storage.get(Category::DataTable, "missing").exists());
    assert!(!storage.get(Category::Row, "missing").exists());
}

#[test]
fn storage_get_list_reads_document_headers() {
    let (_workdir, storage) = _prepare_storage();
    assert!(storage.get_list(Category::Schema).is_empty());

    let (first, _, _) = _prepare_schema(&storage);
    let second = storage.post_schema("other", "").uid;
    _post_datatable(&storage, &first);

    let schemas = storage.get_list(Category::Schema);
    assert_eq!(schemas.len(), 2);
    let mut uids: Vec<&str> = schemas.iter().map(|s| s.uid.as_str()).collect();
    uids.sort();
    let mut expected = vec![first.as_str(), second.as_str()];
    expected.sort();
    assert_eq!(uids, expected);
    assert!(schemas.iter().any(|s| s.name == "other" && s.title == "Other"));

    let datatables = storage.get_list(Category::DataTable);
    assert_eq!(datatables.len(), 1);
    assert_eq!(datatables[0].title, "Example 1");
    assert_eq!(datatables[0].category, Some(Category::DataTable));

    assert!(storage.get_list(Category::Column).is_empty());
}

#[test]
fn storage_delete_table_removes_columns() {
    let (_workdir, storage) = _prepare_storage();
    let (schema, table, column) = _prepare_schema(&storage);

    assert!(storage.delete(Category::Table, &table));

    let loaded = storage.get(Category::Schema, &schema);
    let loaded = loaded.data.schema.unwrap();
    let loaded = loaded.read().unwrap();
    assert!(loaded.tables().is_empty());
    assert!(loaded.find(&table).is_none());
    assert!(loaded.find(&column).is_none());
}

#[test]
fn storage_delete_column() {
    let (_workdir, storage) = _prepare_storage();
    let (schema, table, column) = _prepare_schema(&storage);

    assert!(storage.delete(Category::Column, &column));

    let loaded = storage.get(Category::Schema, &schema);
    let loaded = loaded.data.schema.unwrap();
    assert!(matches!(loaded.read().unwrap().find(&table), Some(Entity::Table(_))));
    assert!(loaded.read().unwrap().find(&column).is_none());
}

#[test]
fn storage_delete_missing_returns_false() {
    let (_workdir, storage) = _prepare_storage();
    _prepare_schema(&storage);

    for category in [
        Category::Schema,
        Category::Table,
        Category::Column,
        Category::DataTable,
        Category::Row,
    ] {
        assert!(!storage.delete(category, "missing"));
    }
}

#[test]
fn storage_delete_documents() {
    let (_workdir, storage) = _prepare_storage();
    let (schema, _, _) = _prepare_schema(&storage);
    let datatable = _post_datatable(&storage, &schema);

    assert!(storage.delete(Category::DataTable, &datatable.uid));
    assert!(!storage.get(Category::DataTable, &datatable.uid).exists());
    assert!(storage.delete(Category::Schema, &schema));
    assert!(storage.get_list(Category::Schema).is_empty());
}

#[test]
fn storage_store_then_delete_row() {
    let (_workdir, storage) = _prepare_storage();
    let (schema, _, _) = _prepare_schema(&storage);
    let mut result = _post_datatable(&storage, &schema);

    let rows = result.data.datatable.as_mut().unwrap().get_mut("t").unwrap();
    rows.add_row_named([("c", json!("first"))]);
    let uid = rows.add_row_named([("c", json!("second"))]).uid().to_string();
    storage.store(&result).unwrap();

    assert!(storage.delete(Category::Row, &uid));
    assert!(!storage.delete(Category::Row, &uid));

    let loaded = storage.get(Category::DataTable, &result.uid);
    assert!(loaded.exists());
    let rows = loaded.data.datatable.as_ref().unwrap().get("t").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.get_cell(0usize, "c"), Some(&json!("first")));
}

#[test]
fn storage_result_summary() {
    let (_workdir, storage) = _prepare_storage();
    let result = storage.post_schema("s", "S");

    let summary = result.to_json(false);
    assert_eq!(summary["category"], json!("schema"));
    assert_eq!(summary["status"], json!("created"));
    assert!(summary.get("data").is_none());

    let summary = result.to_json(true);
    assert_eq!(summary["data"]["schema"][0]["uid"], json!(result.uid));
}

#[test]
fn storage_from_config_rejects_unknown_backends() {
    let workdir = tempfile::tempdir().unwrap();

    assert!(from_config(&StorageConfig::new("json", workdir.path())).is_ok());
    match from_config(&StorageConfig::new("sqlite", workdir.path())) {
        Err(message) => assert_eq!(message, "storage not supported \"sqlite\""),
        Ok(_) => panic!("sqlite is not a backend"),
    }
}

#[test]
fn storage_config_overrides() {
    let config = StorageConfig::default().with_overrides(None, Some("/tmp/data".into()));

    assert_eq!(config.backend, "json");
    assert_eq!(config.workdir, std::path::PathBuf::from("/tmp/data"));
}

#[test]
fn generator_creates_example_document() {
    let (_workdir, storage) = _prepare_storage();
    let generator = Generator::new(&storage);

    let result = generator.generate_examples().unwrap();
    let again = generator.generate_examples().unwrap();

    let schemas = storage.get_list(Category::Schema);
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, EXAMPLE_SCHEMA);
    assert_eq!(storage.get_list(Category::DataTable).len(), 2);
    assert_ne!(result.uid, again.uid);

    let loaded = storage.get(Category::DataTable, &result.uid);
    let tables = loaded.data.datatable.as_ref().unwrap();
    assert_eq!(tables.get("alloy").unwrap().len(), 4);
    assert_eq!(tables.get("treatment").unwrap().len(), 5);
    assert_eq!(tables.get("tests").unwrap().len(), 15);

    tables.update_choices();
    let schema = tables.schema();
    let table = schema.read().unwrap().table("tests").unwrap();
    let table = table.read().unwrap();
    assert_eq!(table.find("alloy").unwrap().choices.len(), 4);
    assert_eq!(table.find("treatment").unwrap().choices.len(), 5);
}

#[test]
fn storage_rejects_uids_outside_their_directory() {
    let (workdir, storage) = _prepare_storage();
    let (schema, _, _) = _prepare_schema(&storage);
    let datatable = _post_datatable(&storage, &schema);
    let datatable_file = workdir
        .path()
        .join("datatable")
        .join(format!("{}.json", datatable.uid));

    let escaping = format!("../datatable/{}", datatable.uid);
    assert!(!storage.delete(Category::Schema, &escaping));
    assert!(datatable_file.exists());

    for uid in [format!("../schema/{}", schema), "..".to_string(), String::new()] {
        let result = storage.get(Category::Schema, &uid);
        assert!(!result.exists());
        assert_eq!(result.status, Status::Error);
        assert!(result.data.schema.is_none());
    }
    let backslashed = format!("..\\datatable\\{}", datatable.uid);
    assert!(!storage.get(Category::DataTable, &backslashed).exists());
    assert!(storage.get(Category::Schema, &schema).exists());
}

#[test]
fn storage_corrupt_schema_file_fails_softly() {
    let (workdir, storage) = _prepare_storage();
    let folder = workdir.path().join("schema");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("broken.json"), "[{\"uid\": ").unwrap();

    let loaded = storage.get(Category::Schema, "broken");
    assert_eq!(loaded.status, Status::Error);
    assert!(loaded.message.starts_with("cannot parse"));

    let table = storage.post_tables("broken", &[("t", "T")]).remove(0);
    assert!(!table.exists());
    assert!(table.uid.is_empty());
    assert!(!_post_datatable(&storage, "broken").exists());
}
