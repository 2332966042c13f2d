//! Example content for a fresh storage.
//!
//! Registers the "alloys" schema (alloy compositions, heat treatments and
//! mechanical tests referring to both) and fills a data-table document with
//! random rows. The values are random on every run.

use indexmap::IndexMap;
use log::info;
use serde_json::{Value, json};

use crate::persistence::Sample;
use crate::storage::{Category, DataTableStorage, PostData, StorageResult};

pub const EXAMPLE_SCHEMA: &str = "example-alloys";

const ALLOYS: [&str; 4] = ["AA6005.63", "AA7046.63", "AA7046.42", "AA6082.60"];
const COOLING: [&str; 2] = ["Cold water quench", "Air cooling"];
const TEST_TYPES: [&str; 3] = ["Tensile test", "Plate bending test", "Component test"];

pub struct Generator<'a> {
    storage: &'a dyn DataTableStorage,
}

fn values(items: &[&str]) -> Vec<Value> {
    items.iter().map(|item| json!(item)).collect()
}

impl<'a> Generator<'a> {
    pub fn new(storage: &'a dyn DataTableStorage) -> Generator<'a> {
        Generator { storage }
    }

    pub fn register_schema_alloys(&self) -> Result<String, String> {
        //! Create the example schema with its three tables and their columns.
        //!
        //! Returns the uid of the new schema.

        let schema = self
            .storage
            .post_schema(EXAMPLE_SCHEMA, "Heat Treatment of Alloys");
        if !schema.exists() {
            return Err(format!("cannot create schema: {}", schema.message));
        }

        let tables = self.storage.post_tables(
            &schema.uid,
            &[
                ("alloy", "Alloy composition"),
                ("treatment", "Heat treatment"),
                ("tests", "Mechanical tests"),
            ],
        );
        if let Some(failed) = tables.iter().find(|t| !t.exists()) {
            return Err(format!("cannot create table {}: {}", failed.name, failed.message));
        }

        let columns: [&[(&str, &str)]; 3] = [
            &[("name", "str"), ("Mn", "float"), ("Fe", "float")],
            &[("name", "str"), ("cooling", "str"), ("temperature", "float")],
            &[
                ("alloy", "alloy.name"),
                ("treatment", "treatment.name"),
                ("test_type", "choice"),
                ("result", "filepath"),
            ],
        ];
        for (table, columns) in tables.iter().zip(columns) {
            let results = self.storage.post_columns(&schema.uid, &table.uid, columns);
            if let Some(failed) = results.iter().find(|c| !c.exists()) {
                return Err(format!("cannot create column {}: {}", failed.name, failed.message));
            }
        }

        info!("registered example schema {}", schema.uid);
        Ok(schema.uid)
    }

    pub fn generate_examples(&self) -> Result<StorageResult, String> {
        //! Make sure the example schema exists, then create and store a
        //! data-table document with random rows for it.

        let existing = self
            .storage
            .get_list(Category::Schema)
            .into_iter()
            .find(|s| s.name == EXAMPLE_SCHEMA)
            .map(|s| s.uid);
        let schema_uid = match existing {
            Some(uid) => uid,
            None => self.register_schema_alloys()?,
        };

        let mut result = self.storage.post(&PostData {
            category: Some(Category::DataTable),
            title: "Example 1".to_string(),
            schema: schema_uid.clone(),
            ..PostData::default()
        });
        if !result.exists() {
            return Err(format!("cannot create datatable for schema {}", schema_uid));
        }

        let methods: Vec<String> = (1..=5).map(|i| format!("Method {}", i)).collect();
        let method_refs: Vec<&str> = methods.iter().map(String::as_str).collect();

        let mut samples: IndexMap<String, Sample> = IndexMap::from([
            ("name".to_string(), Sample::Choices(values(&ALLOYS))),
            ("alloy".to_string(), Sample::Choices(values(&ALLOYS))),
            ("treatment".to_string(), Sample::Choices(values(&method_refs))),
            ("Mn".to_string(), Sample::FloatRange(0.1, 0.5)),
            ("Fe".to_string(), Sample::FloatRange(0.1, 0.5)),
            ("temperature".to_string(), Sample::IntRange(140, 220)),
            ("cooling".to_string(), Sample::Choices(values(&COOLING))),
            ("test_type".to_string(), Sample::Choices(values(&TEST_TYPES))),
        ]);

        let Some(tables) = result.data.datatable.as_mut() else {
            return Err(format!("no datatable created for schema {}", schema_uid));
        };

        if let Some(alloy) = tables.get_mut("alloy") {
            alloy.generate(ALLOYS.len(), &samples);
            for (row, name) in alloy.rows_mut().iter_mut().zip(ALLOYS) {
                row.set("name", json!(name));
            }
        }

        samples.insert("name".to_string(), Sample::Choices(values(&method_refs)));
        if let Some(treatment) = tables.get_mut("treatment") {
            treatment.generate(methods.len(), &samples);
            for (row, name) in treatment.rows_mut().iter_mut().zip(&methods) {
                row.set("name", json!(name));
            }
        }

        if let Some(tests) = tables.get_mut("tests") {
            tests.generate(15, &samples);
        }
        tables.update_choices();

        self.storage.store(&result)?;
        info!("generated example datatable {}", result.uid);
        Ok(result)
    }
}
