use datatable_engine::persistence::{
    ColumnType, Entity, Layout, Model, NANOID_ALPHABET, RandomSource, Schema, TableRef,
    default_title,
};
use serde_json::{Value, json};

fn _prepare_schema() -> Schema {
    Schema::with_random(RandomSource::seeded(7), "alloys", "Alloys")
}

fn _column_uid(table: &TableRef, name: &str) -> String {
    table.read().unwrap().find(name).unwrap().uid.clone()
}

#[test]
fn schema_titles_default_from_names() {
    let mut schema = Schema::new("heat_treatment", "");
    let table = schema.add("test_type", "", &[("max_load", "float")]);

    assert_eq!(schema.title(), "Heat Treatment");
    assert_eq!(table.read().unwrap().title(), "Test Type");
    assert_eq!(table.read().unwrap().find("max_load").unwrap().title, "Max Load");
    assert_eq!(default_title("a__b"), "A  B");
}

#[test]
fn table_primary_key_is_first_generator_column() {
    let mut schema = _prepare_schema();
    let table = schema.add(
        "alloy",
        "",
        &[("name", "str"), ("id", "nanoid-8"), ("code", "uuid"), ("n", "inc")],
    );

    assert_eq!(table.read().unwrap().primary_key(), Some("id"));
}

#[test]
fn table_primary_key_absent() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("name", "str"), ("Mn", "float")]);

    assert_eq!(table.read().unwrap().primary_key(), None);
}

#[test]
fn table_primary_key_ignores_lookalike_types() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("a", "increment"), ("b", "uuids"), ("c", "inc-4")]);

    assert_eq!(table.read().unwrap().primary_key(), Some("c"));
}

#[test]
fn table_find_checks_name_before_title_before_uid() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[]);
    let mut table = table.write().unwrap();

    let first_uid = table.add("first", "second", "str", None).uid.clone();
    let second_uid = table.add("second", "Other", "str", None).uid.clone();
    let third_uid = table.add("third", &first_uid, "str", None).uid.clone();

    assert_eq!(table.find("second").unwrap().uid, second_uid);
    assert_eq!(table.find("Other").unwrap().uid, second_uid);
    assert_eq!(table.find(&first_uid).unwrap().uid, third_uid);
    assert_eq!(table.find(&second_uid).unwrap().name, "second");
    assert!(table.find("missing").is_none());
}

#[test]
fn table_default_values_follow_column_types() {
    let mut schema = _prepare_schema();
    let table = schema.add(
        "alloy",
        "",
        &[("n", "inc"), ("id", "uuid"), ("short", "nanoid-8"), ("long", "nanoid"), ("name", "str")],
    );

    let values = table.read().unwrap().default_values(4);

    assert_eq!(values["n"], json!(5));
    assert_eq!(values["name"], Value::Null);

    let uuid = values["id"].as_str().unwrap();
    assert_eq!(uuid.len(), 36);
    assert!(uuid::Uuid::parse_str(uuid).is_ok());
    for index in [8, 13, 18, 23] {
        assert_eq!(uuid.as_bytes()[index], b'-');
    }

    let short = values["short"].as_str().unwrap();
    assert_eq!(short.len(), 8);
    assert!(short.bytes().all(|b| NANOID_ALPHABET.contains(&b)));
    assert_eq!(values["long"].as_str().unwrap().len(), 21);
}

#[test]
fn nanoid_values_stay_in_alphabet() {
    let random = RandomSource::from_entropy();

    for _ in 0..100 {
        let id = random.nanoid(8);
        assert_eq!(id.len(), 8);
        assert!(id.bytes().all(|b| NANOID_ALPHABET.contains(&b)));
    }
}

#[test]
fn seeded_sources_repeat_themselves() {
    let first = RandomSource::seeded(42);
    let second = RandomSource::seeded(42);

    assert_eq!(first.uuid(), second.uuid());
    assert_eq!(first.nanoid(12), second.nanoid(12));
}

#[test]
fn column_type_parses_tags() {
    assert_eq!(ColumnType::parse("inc"), ColumnType::Increment);
    assert_eq!(ColumnType::parse("nanoid-8"), ColumnType::NanoId(8));
    assert_eq!(ColumnType::parse("nanoid"), ColumnType::NanoId(21));
    assert_eq!(ColumnType::parse("float"), ColumnType::Plain("float".to_string()));

    match ColumnType::parse("alloy.name") {
        ColumnType::Reference(reference) => {
            assert_eq!(reference.table_name, "alloy");
            assert_eq!(reference.column_name, "name");
        }
        other => panic!("not a reference: {:?}", other),
    }
}

#[test]
fn schema_find_table_then_column() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("name", "str")]);
    let table_uid = table.read().unwrap().uid().to_string();
    let column_uid = _column_uid(&table, "name");

    assert!(matches!(schema.find(&table_uid), Some(Entity::Table(_))));
    match schema.find(&column_uid) {
        Some(Entity::Column(column)) => assert_eq!(column.name, "name"),
        _ => panic!("column not found"),
    }
    assert!(schema.find("nothing").is_none());
}

#[test]
fn schema_table_by_name_or_uid() {
    let mut schema = _prepare_schema();
    let first = schema.add("alloy", "", &[]);
    schema.add("alloy", "Second", &[]);
    let uid = first.read().unwrap().uid().to_string();

    assert_eq!(schema.tables().len(), 2);
    assert_eq!(schema.table("alloy").unwrap().read().unwrap().uid(), uid);
    assert_eq!(schema.table(&uid).unwrap().read().unwrap().name(), "alloy");
    assert!(schema.table("treatment").is_none());
}

#[test]
fn schema_update_sets_known_fields_only() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("Mn", "float")]);
    let table_uid = table.read().unwrap().uid().to_string();
    let column_uid = _column_uid(&table, "Mn");

    assert!(schema.update(&table_uid, "title", json!("Alloy composition")));
    assert!(schema.update(&column_uid, "default", json!(0.1)));
    assert!(schema.update(&column_uid, "concept", json!("manganese")));

    assert!(!schema.update(&column_uid, "uid", json!("other")));
    assert!(!schema.update(&column_uid, "unknown", json!(1)));
    assert!(!schema.update(&table_uid, "title", json!(12)));
    assert!(!schema.update("nothing", "title", json!("x")));

    let table = table.read().unwrap();
    assert_eq!(table.title(), "Alloy composition");
    let column = table.find("Mn").unwrap();
    assert_eq!(column.default, json!(0.1));
    assert_eq!(column.concept, "manganese");
    assert_eq!(column.uid, column_uid);
}

#[test]
fn schema_delete_table_removes_its_columns() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("name", "str"), ("Mn", "float")]);
    let table_uid = table.read().unwrap().uid().to_string();
    let column_uids = vec![_column_uid(&table, "name"), _column_uid(&table, "Mn")];

    assert!(schema.delete(&table_uid));

    assert!(schema.find(&table_uid).is_none());
    for uid in column_uids {
        assert!(schema.find(&uid).is_none());
    }
    assert!(!schema.delete(&table_uid));
}

#[test]
fn schema_delete_single_column() {
    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("name", "str"), ("Mn", "float")]);
    let column_uid = _column_uid(&table, "Mn");

    assert!(schema.delete(&column_uid));
    assert_eq!(table.read().unwrap().column_names(), vec!["name".to_string()]);
    assert!(!schema.delete("nothing"));
}

#[test]
fn schema_dump_tags_records() {
    let mut schema = _prepare_schema();
    schema.add("alloy", "", &[("name", "str")]);

    let records = schema.dump();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["dtype"], json!("schema"));
    assert_eq!(records[1]["dtype"], json!("table"));
    assert_eq!(records[1]["schema"], json!(schema.uid()));
    assert_eq!(records[2]["dtype"], json!("str"));
    assert_eq!(records[2]["table"], records[1]["uid"]);
}

#[test]
fn schema_dump_then_load_rebuilds_tables() {
    let mut schema = _prepare_schema();
    schema.add("alloy", "Alloy composition", &[("name", "str"), ("Mn", "float")]);
    schema.add("tests", "", &[("id", "nanoid-8"), ("alloy", "alloy.name")]);

    let mut loaded = Schema::default();
    let n_dropped = loaded.load(&Value::Array(schema.dump()));

    assert_eq!(n_dropped, 0);
    assert_eq!(loaded.uid(), schema.uid());
    assert_eq!(loaded.name(), "alloys");
    assert_eq!(loaded.tables().len(), 2);

    for (uid, table) in schema.tables() {
        let table = table.read().unwrap();
        let other = loaded.tables()[uid].read().unwrap();
        assert_eq!(other.name(), table.name());
        assert_eq!(other.title(), table.title());
        assert_eq!(other.columns(), table.columns());
    }
}

#[test]
fn schema_load_drops_orphan_records() {
    let mut schema = _prepare_schema();
    schema.add("alloy", "", &[("name", "str")]);
    let mut records = schema.dump();
    records.push(json!({"uid": "t1", "name": "lost", "dtype": "table", "schema": "elsewhere"}));
    records.push(json!({"uid": "c1", "name": "lost", "dtype": "str", "schema": schema.uid(), "table": "t9"}));
    records.push(json!("not a record"));

    let mut loaded = Schema::default();
    let n_dropped = loaded.load(&Value::Array(records));

    assert_eq!(n_dropped, 3);
    assert_eq!(loaded.tables().len(), 1);
    assert!(loaded.find("c1").is_none());
}

#[test]
fn schema_load_is_additive() {
    let mut schema = _prepare_schema();
    schema.add("alloy", "", &[("name", "str")]);
    let records = schema.dump();

    let mut loaded = Schema::default();
    loaded.load(&records[0]);
    loaded.load(&records[1]);
    assert_eq!(loaded.tables().len(), 1);
    assert!(loaded.find(records[2]["uid"].as_str().unwrap()).is_none());

    loaded.load(&records[2]);
    assert!(loaded.find(records[2]["uid"].as_str().unwrap()).is_some());
}

#[test]
fn column_choices_keep_insertion_order() {
    let mut schema = _prepare_schema();
    let table = schema.add("tests", "", &[("test_type", "choice")]);
    let mut table = table.write().unwrap();
    let column = table.find_mut("test_type").unwrap();

    column.add_choice("tensile", None);
    column.add_choice("bending", Some(json!("Plate bending test")));

    let values: Vec<&String> = column.choices.keys().collect();
    assert_eq!(values, vec!["tensile", "bending"]);
    assert_eq!(column.choices["tensile"], json!("tensile"));
    assert!(!table.add_choices("missing", Default::default()));
}

#[test]
fn schema_render_lists_columns_and_choices() {
    let mut schema = _prepare_schema();
    let table = schema.add("tests", "", &[("test_type", "choice"), ("result", "filepath")]);
    table
        .write()
        .unwrap()
        .find_mut("test_type")
        .unwrap()
        .add_choice("tensile", Some(json!("Tensile test")));

    let columns = schema.render(Layout::Columns);
    let choices = schema.render(Layout::Choices);

    assert_eq!(columns.lines().count(), 3);
    assert!(columns.contains("filepath"));
    assert_eq!(choices.lines().count(), 2);
    assert!(choices.contains("Tensile test"));

    let overview = schema.column_table();
    assert_eq!(overview["class"], json!("table"));
    assert_eq!(overview["rows"].as_array().unwrap().len(), 2);
}

#[test]
fn sized_inc_and_uuid_tags_generate_nothing() {
    assert_eq!(ColumnType::parse("inc-3"), ColumnType::Plain("inc-3".to_string()));
    assert_eq!(ColumnType::parse("uuid-5"), ColumnType::Plain("uuid-5".to_string()));

    let mut schema = _prepare_schema();
    let table = schema.add("alloy", "", &[("n", "inc-3"), ("code", "uuid-5")]);
    let column_uid = _column_uid(&table, "code");
    schema.update(&column_uid, "default", json!("none"));

    let table = table.read().unwrap();
    assert_eq!(table.primary_key(), Some("n"));
    let values = table.default_values(0);
    assert_eq!(values["n"], Value::Null);
    assert_eq!(values["code"], json!("none"));
}
