use std::fmt::Write as _;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::persistence::datatype::ColumnType;
use crate::persistence::random::RandomSource;
use crate::persistence::{LockExt, display_value};

/// A [`Table`] shared between its [`Schema`] and the data tables built on it.
pub type TableRef = Arc<RwLock<Table>>;

/// A [`Schema`] shared between the storage layer and its data tables.
pub type SchemaRef = Arc<RwLock<Schema>>;

/// The fields every schema entity carries.
pub trait Model {
    fn uid(&self) -> &str;
    fn name(&self) -> &str;
    fn title(&self) -> &str;
    fn dtype(&self) -> &str;
}

pub fn default_title(name: &str) -> String {
    //! Turn a snake case name into a title: `test_type` becomes `Test Type`.

    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn default_dtype() -> String {
    "str".to_string()
}

/// A typed field declaration of a [`Table`].
///
/// This is also the persisted record of a column, the owning schema and
/// table are stored by uid under `schema` and `table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    pub uid: String,
    pub name: String,
    pub title: String,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(rename = "schema")]
    pub schema_id: String,
    #[serde(rename = "table")]
    pub table_id: String,
    pub default: Value,
    pub choices: IndexMap<String, Value>,
    pub concept: String,
}

/// A named collection of [`Column`]s, in insertion order.
pub struct Table {
    uid: String,
    name: String,
    title: String,
    schema_id: String,
    columns: IndexMap<String, Column>,
    random: RandomSource,
}

/// A named collection of [`Table`]s.
///
/// # Issues
/// - Names are not unique, lookups by name return the first match.
pub struct Schema {
    uid: String,
    name: String,
    title: String,
    tables: IndexMap<String, TableRef>,
    random: RandomSource,
}

/// What [`Schema::find`] found for an identifier.
///
/// A column is handed out as a copy, mutations go through
/// [`Schema::update`] or the owning table.
pub enum Entity {
    Table(TableRef),
    Column(Column),
}

/// The two text layouts of [`Schema::render`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Layout {
    Columns,
    Choices,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct SchemaRecord {
    uid: String,
    name: String,
    title: String,
    dtype: String,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct TableRecord {
    uid: String,
    name: String,
    title: String,
    dtype: String,
    schema: String,
}

impl Default for Column {
    fn default() -> Self {
        Column {
            uid: String::new(),
            name: String::new(),
            title: String::new(),
            dtype: default_dtype(),
            schema_id: String::new(),
            table_id: String::new(),
            default: Value::Null,
            choices: IndexMap::new(),
            concept: String::new(),
        }
    }
}

impl Column {
    pub fn column_type(&self) -> ColumnType {
        ColumnType::parse(&self.dtype)
    }

    pub fn default_value(&self, row_ordinal: usize, random: &RandomSource) -> Value {
        //! The value a new row at `row_ordinal` gets for this column.

        match self.column_type() {
            ColumnType::Increment => json!(row_ordinal + 1),
            ColumnType::Uuid => Value::String(random.uuid()),
            ColumnType::NanoId(size) => Value::String(random.nanoid(size)),
            ColumnType::Reference(_) | ColumnType::Plain(_) => self.default.clone(),
        }
    }

    pub fn add_choice(&mut self, value: &str, text: Option<Value>) {
        //! Register a legal value, its label defaults to the value itself.

        let text = text.unwrap_or_else(|| Value::String(value.to_string()));
        self.choices.insert(value.to_string(), text);
    }

    pub fn add_choices(&mut self, choices: IndexMap<String, Value>) {
        self.choices.extend(choices);
    }

    fn fill_missing(&mut self, random: &RandomSource) {
        if self.uid.is_empty() {
            self.uid = random.uuid();
        }
        if self.title.is_empty() {
            self.title = default_title(&self.name);
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> bool {
        match (field, value) {
            ("name", Value::String(v)) => self.name = v,
            ("title", Value::String(v)) => self.title = v,
            ("dtype", Value::String(v)) => self.dtype = v,
            ("concept", Value::String(v)) => self.concept = v,
            ("default", v) => self.default = v,
            ("choices", Value::Object(map)) => self.choices = map.into_iter().collect(),
            _ => return false,
        }
        true
    }
}

impl Model for Column {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn dtype(&self) -> &str {
        &self.dtype
    }
}

impl Table {
    pub fn new(
        random: RandomSource,
        schema_id: &str,
        uid: Option<String>,
        name: &str,
        title: &str,
    ) -> Table {
        //! Create an empty table owned by the schema `schema_id`.
        //!
        //! A missing `uid` is generated, an empty `title` is derived from the name.

        Table {
            uid: uid.filter(|uid| !uid.is_empty()).unwrap_or_else(|| random.uuid()),
            name: name.to_string(),
            title: if title.is_empty() {
                default_title(name)
            } else {
                title.to_string()
            },
            schema_id: schema_id.to_string(),
            columns: IndexMap::new(),
            random,
        }
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn columns(&self) -> &IndexMap<String, Column> {
        &self.columns
    }

    pub fn random(&self) -> &RandomSource {
        &self.random
    }

    pub fn add(&mut self, name: &str, title: &str, dtype: &str, uid: Option<String>) -> &Column {
        //! Append a column. The column order defines the positional order of
        //! row values.

        let mut column = Column {
            uid: uid.unwrap_or_default(),
            name: name.to_string(),
            title: title.to_string(),
            dtype: dtype.to_string(),
            schema_id: self.schema_id.clone(),
            table_id: self.uid.clone(),
            ..Column::default()
        };
        column.fill_missing(&self.random);

        let uid = column.uid.clone();
        self.columns.insert(uid.clone(), column);
        &self.columns[&uid]
    }

    pub fn find(&self, column: &str) -> Option<&Column> {
        //! Find a column by name, then by title, then by uid.

        self.position(column).map(|index| &self.columns[index])
    }

    pub fn find_mut(&mut self, column: &str) -> Option<&mut Column> {
        self.position(column).map(|index| &mut self.columns[index])
    }

    pub fn column_mut(&mut self, uid: &str) -> Option<&mut Column> {
        self.columns.get_mut(uid)
    }

    fn position(&self, column: &str) -> Option<usize> {
        let columns = || self.columns.values();
        columns()
            .position(|c| c.name == column)
            .or_else(|| columns().position(|c| c.title == column))
            .or_else(|| self.columns.get_index_of(column))
    }

    pub fn primary_key(&self) -> Option<&str> {
        //! The name of the first column whose type generates its own values
        //! (`inc`, `uuid`, `nanoid[-N]`).

        self.columns
            .values()
            .find(|c| ColumnType::is_key_generator(&c.dtype))
            .map(|c| c.name.as_str())
    }

    pub fn default_values(&self, row_ordinal: usize) -> IndexMap<String, Value> {
        self.columns
            .values()
            .map(|c| (c.name.clone(), c.default_value(row_ordinal, &self.random)))
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.values().map(|c| c.name.clone()).collect()
    }

    pub fn add_choices(&mut self, column: &str, choices: IndexMap<String, Value>) -> bool {
        match self.find_mut(column) {
            Some(column) => {
                column.add_choices(choices);
                true
            }
            None => false,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> bool {
        match (field, value) {
            ("name", Value::String(v)) => self.name = v,
            ("title", Value::String(v)) => self.title = v,
            _ => return false,
        }
        true
    }

    fn record(&self) -> TableRecord {
        TableRecord {
            uid: self.uid.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            dtype: "table".to_string(),
            schema: self.schema_id.clone(),
        }
    }
}

impl Model for Table {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn dtype(&self) -> &str {
        "table"
    }
}

impl Schema {
    pub fn new(name: &str, title: &str) -> Schema {
        Schema::with_random(RandomSource::from_entropy(), name, title)
    }

    pub fn with_random(random: RandomSource, name: &str, title: &str) -> Schema {
        //! Create an empty schema drawing every identifier from `random`.

        Schema {
            uid: random.uuid(),
            name: name.to_string(),
            title: if title.is_empty() {
                default_title(name)
            } else {
                title.to_string()
            },
            tables: IndexMap::new(),
            random,
        }
    }

    pub fn into_shared(self) -> SchemaRef {
        Arc::new(RwLock::new(self))
    }

    pub fn tables(&self) -> &IndexMap<String, TableRef> {
        &self.tables
    }

    pub fn random(&self) -> &RandomSource {
        &self.random
    }

    pub fn add(&mut self, name: &str, title: &str, columns: &[(&str, &str)]) -> TableRef {
        //! Add a table, optionally seeded with `(name, dtype)` columns.
        //!
        //! Always succeeds, table names are not checked for duplicates.

        let mut table = Table::new(self.random.clone(), &self.uid, None, name, title);
        for (column, dtype) in columns {
            table.add(column, "", dtype, None);
        }

        let uid = table.uid.clone();
        let table = Arc::new(RwLock::new(table));
        self.tables.insert(uid, Arc::clone(&table));
        table
    }

    pub fn table(&self, table: &str) -> Option<TableRef> {
        //! Get a table by uid or by name.

        self.tables
            .get(table)
            .or_else(|| {
                self.tables
                    .values()
                    .find(|t| t.read_lock().name == table)
            })
            .map(Arc::clone)
    }

    pub fn find(&self, uid: &str) -> Option<Entity> {
        //! Find a table by uid, else a column of any table by uid.

        if let Some(table) = self.tables.get(uid) {
            return Some(Entity::Table(Arc::clone(table)));
        }

        self.tables
            .values()
            .find_map(|table| table.read_lock().columns.get(uid).cloned())
            .map(Entity::Column)
    }

    pub fn update(&mut self, uid: &str, field: &str, value: Value) -> bool {
        //! Set `field` of the table or column `uid`.
        //!
        //! Returns false when there is no such entity or field, or when the
        //! value has the wrong shape for the field. Identifiers and owner
        //! references cannot be updated.

        if let Some(table) = self.tables.get(uid) {
            return table.write_lock().set_field(field, value);
        }

        for table in self.tables.values() {
            let mut table = table.write_lock();
            if let Some(column) = table.columns.get_mut(uid) {
                return column.set_field(field, value);
            }
        }

        false
    }

    pub fn delete(&mut self, uid: &str) -> bool {
        //! Remove a table, and with it its columns, or a single column.

        if self.tables.shift_remove(uid).is_some() {
            debug!("schema {}: removed table {}", self.uid, uid);
            return true;
        }

        for table in self.tables.values() {
            if table.write_lock().columns.shift_remove(uid).is_some() {
                debug!("schema {}: removed column {}", self.uid, uid);
                return true;
            }
        }

        false
    }

    pub fn dump(&self) -> Vec<Value> {
        //! Flatten the schema into records: the schema itself, then every
        //! table, then every column. Each record is tagged by `dtype`.

        let mut records = vec![json!(SchemaRecord {
            uid: self.uid.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            dtype: "schema".to_string(),
        })];

        for table in self.tables.values() {
            records.push(json!(table.read_lock().record()));
        }

        for table in self.tables.values() {
            for column in table.read_lock().columns.values() {
                records.push(json!(column));
            }
        }

        records
    }

    pub fn load(&mut self, data: &Value) -> usize {
        //! Merge records from `data`, a single record or a list of them.
        //!
        //! Loading is additive and lenient: a table whose schema is not this
        //! one, or a column whose table is not (yet) known, is dropped without
        //! an error. Returns the number of dropped records.

        match data {
            Value::Array(items) => items.iter().map(|item| self.load(item)).sum(),
            Value::Object(record) => {
                let dtype = record.get("dtype").and_then(Value::as_str).unwrap_or_default();
                let loaded = match dtype {
                    "schema" => self.load_schema_record(data),
                    "table" => self.load_table_record(data),
                    _ => self.load_column_record(data),
                };
                if loaded {
                    0
                } else {
                    warn!("schema {}: dropped record {}", self.uid, data);
                    1
                }
            }
            _ => {
                warn!("schema {}: dropped record {}", self.uid, data);
                1
            }
        }
    }

    fn load_schema_record(&mut self, data: &Value) -> bool {
        let Ok(record) = SchemaRecord::deserialize(data) else {
            return false;
        };

        if !record.uid.is_empty() {
            self.uid = record.uid;
        }
        self.name = record.name;
        if !record.title.is_empty() {
            self.title = record.title;
        } else {
            self.title = default_title(&self.name);
        }
        true
    }

    fn load_table_record(&mut self, data: &Value) -> bool {
        let Ok(record) = TableRecord::deserialize(data) else {
            return false;
        };
        if record.schema != self.uid {
            return false;
        }

        if let Some(table) = self.tables.get(&record.uid) {
            let mut table = table.write_lock();
            table.name = record.name;
            table.title = record.title;
        } else {
            let table = Table::new(
                self.random.clone(),
                &self.uid,
                Some(record.uid),
                &record.name,
                &record.title,
            );
            self.tables
                .insert(table.uid.clone(), Arc::new(RwLock::new(table)));
        }
        true
    }

    fn load_column_record(&mut self, data: &Value) -> bool {
        let Ok(mut column) = Column::deserialize(data) else {
            return false;
        };
        if column.schema_id != self.uid {
            return false;
        }
        let Some(table) = self.tables.get(&column.table_id) else {
            return false;
        };

        column.fill_missing(&self.random);
        table
            .write_lock()
            .columns
            .insert(column.uid.clone(), column);
        true
    }

    pub fn render(&self, layout: Layout) -> String {
        //! A plain text view of the schema, one line per column (or per
        //! choice with [`Layout::Choices`]).

        let mut lines: Vec<Vec<String>> = match layout {
            Layout::Columns => vec![vec!["schema", "table", "column", "type", "concept"]],
            Layout::Choices => vec![vec!["table", "column", "value", "text"]],
        }
        .into_iter()
        .map(|header| header.into_iter().map(String::from).collect())
        .collect();

        for table in self.tables.values() {
            let table = table.read_lock();
            for column in table.columns.values() {
                match layout {
                    Layout::Columns => lines.push(vec![
                        self.name.clone(),
                        table.name.clone(),
                        column.name.clone(),
                        column.dtype.clone(),
                        column.concept.clone(),
                    ]),
                    Layout::Choices => {
                        for (value, text) in column.choices.iter() {
                            lines.push(vec![
                                table.name.clone(),
                                column.name.clone(),
                                value.clone(),
                                display_value(text),
                            ]);
                        }
                    }
                }
            }
        }

        let n_fields = lines[0].len();
        let widths: Vec<usize> = (0..n_fields)
            .map(|i| lines.iter().map(|line| line[i].chars().count()).max().unwrap_or(0))
            .collect();

        let mut out = String::new();
        for line in lines {
            let cells: Vec<String> = line
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{:width$}", cell, width = *width))
                .collect();
            let _ = writeln!(out, "{}", cells.join(" | ").trim_end());
        }
        out
    }

    pub fn column_table(&self) -> Value {
        //! Column overview in the `{class, cols, rows}` shape used by table
        //! widgets.

        let rows: Vec<Value> = self
            .tables
            .values()
            .flat_map(|table| {
                let table = table.read_lock();
                table
                    .columns
                    .values()
                    .map(|c| {
                        json!([
                            table.name,
                            c.name,
                            c.dtype,
                            c.default,
                            c.choices.len(),
                            c.concept
                        ])
                    })
                    .collect::<Vec<Value>>()
            })
            .collect();

        json!({
            "class": "table",
            "cols": ["Table", "Column", "Data Type", "Default", "Choices", "Concept"],
            "rows": rows,
        })
    }
}

impl Model for Schema {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn dtype(&self) -> &str {
        "schema"
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new("", "")
    }
}
