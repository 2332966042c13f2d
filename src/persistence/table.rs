use std::fmt::Display;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use super::row::{Row, RowRef};
use super::schema::{Model, TableRef};
use crate::persistence::LockExt;
use crate::persistence::random::RandomSource;

/// The rows of one [`super::Table`].
///
/// The table definition is shared with the schema and only read from here.
/// Every lookup that comes up empty (unknown row, unknown column) makes the
/// operation a no-op instead of an error.
pub struct DataTable {
    table: TableRef,
    rows: Vec<Row>,
}

/// How [`DataTable::generate`] fills a column.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample {
    /// Uniform pick, with replacement, from the values.
    Choices(Vec<Value>),
    /// Uniform integer in the inclusive range.
    IntRange(i64, i64),
    /// Uniform float in the range.
    FloatRange(f64, f64),
}

impl Sample {
    pub fn range(low: &Number, high: &Number) -> Option<Sample> {
        //! A float range if either bound is a float, an integer range otherwise.

        if low.is_f64() || high.is_f64() {
            Some(Sample::FloatRange(low.as_f64()?, high.as_f64()?))
        } else {
            Some(Sample::IntRange(low.as_i64()?, high.as_i64()?))
        }
    }

    fn draw(&self, random: &RandomSource) -> Option<Value> {
        match self {
            Sample::Choices(values) => random.pick(values),
            Sample::IntRange(low, high) => Some(Value::from(random.int_between(*low, *high))),
            Sample::FloatRange(low, high) => {
                Number::from_f64(random.float_between(*low, *high)).map(Value::Number)
            }
        }
    }
}

impl DataTable {
    pub fn new(table: TableRef) -> DataTable {
        DataTable {
            table,
            rows: Vec::new(),
        }
    }

    pub fn table(&self) -> TableRef {
        Arc::clone(&self.table)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn _new_row(&self) -> Row {
        let table = self.table.read_lock();
        let uid = table.random().uuid();
        Row::new(uid, table.default_values(self.rows.len()))
    }

    fn _push(&mut self, row: Row) -> &Row {
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    pub fn add_row(&mut self) -> &Row {
        //! Append a row holding only the schema defaults.

        let row = self._new_row();
        self._push(row)
    }

    pub fn add_row_named<K: AsRef<str>>(&mut self, values: impl IntoIterator<Item = (K, Value)>) -> &Row {
        //! Append a row from the schema defaults, overlaid with `values`.
        //!
        //! Names that are not columns of the table are ignored.

        let mut row = self._new_row();
        {
            let table = self.table.read_lock();
            for (name, value) in values {
                let name = name.as_ref();
                if table.columns().values().any(|c| c.name == name) {
                    row.set(name, value);
                }
            }
        }
        self._push(row)
    }

    pub fn add_row_positional(&mut self, values: Vec<Value>) -> &Row {
        //! Append a row from the schema defaults, with `values` assigned in
        //! column order.
        //!
        //! The primary key column is skipped: it is always derived, never
        //! given. Extra values are ignored, missing ones keep their defaults.

        let mut row = self._new_row();
        {
            let table = self.table.read_lock();
            let primary_key = table.primary_key();
            let names = table
                .columns()
                .values()
                .map(|c| c.name.as_str())
                .filter(|name| Some(*name) != primary_key);

            for (name, value) in names.zip(values) {
                row.set(name, value);
            }
        }
        self._push(row)
    }

    pub(crate) fn push_loaded(&mut self, uid: &str, values: Vec<Value>) {
        //! Replay a persisted row: positional values with the row uid restored.

        let row_index = self.rows.len();
        self.add_row_positional(values);
        if !uid.is_empty() {
            self.rows[row_index].restore_uid(uid);
        }
    }

    fn _row_index(&self, row: &RowRef) -> Option<usize> {
        match row {
            RowRef::Index(index) => (*index < self.rows.len()).then_some(*index),
            RowRef::Key(key) => {
                let table = self.table.read_lock();
                let primary_key = table.primary_key()?;
                self.rows
                    .iter()
                    .position(|r| r.get(primary_key) == Some(key))
            }
        }
    }

    fn _col_name(&self, column: &str) -> Option<String> {
        self.table.read_lock().find(column).map(|c| c.name.clone())
    }

    pub fn row(&self, row: impl Into<RowRef>) -> Option<&Row> {
        let index = self._row_index(&row.into())?;
        self.rows.get(index)
    }

    pub fn set_cell(&mut self, row: impl Into<RowRef>, column: &str, value: Value) -> bool {
        //! Set one cell. Returns false, changing nothing, when the row or the
        //! column cannot be resolved.

        let (Some(index), Some(name)) = (self._row_index(&row.into()), self._col_name(column))
        else {
            return false;
        };
        self.rows[index].set(&name, value)
    }

    pub fn get_cell(&self, row: impl Into<RowRef>, column: &str) -> Option<&Value> {
        let index = self._row_index(&row.into())?;
        let name = self._col_name(column)?;
        self.rows[index].get(&name)
    }

    pub fn search(&self, criteria: &[(&str, Value)]) -> Vec<&Row> {
        //! All rows matching the criteria, see [`Row::matches`].

        self.rows.iter().filter(|row| row.matches(criteria)).collect()
    }

    pub fn drop_rows(&mut self, criteria: &[(&str, Value)]) -> Vec<Row> {
        //! Remove and return all rows matching the criteria.

        let (dropped, kept): (Vec<Row>, Vec<Row>) = std::mem::take(&mut self.rows)
            .into_iter()
            .partition(|row| row.matches(criteria));
        self.rows = kept;
        dropped
    }

    pub fn generate(&mut self, row_count: usize, samples: &IndexMap<String, Sample>) {
        //! Append `row_count` rows. Columns named in `samples` get a drawn
        //! value, every other column keeps its default.

        let random = self.table.read_lock().random().clone();

        for _ in 0..row_count {
            let mut row = self._new_row();
            for (column, sample) in samples.iter() {
                if !row.contains(column) {
                    continue;
                }
                if let Some(value) = sample.draw(&random) {
                    row.set(column, value);
                }
            }
            self.rows.push(row);
        }
    }
}

impl Display for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header: Vec<String> = {
            let table = self.table.read_lock();
            std::iter::once("Id".to_string())
                .chain(table.columns().values().map(|c| c.title.clone()))
                .collect()
        };
        let rows: Vec<String> = self.rows.iter().map(|row| format!("{}", row)).collect();

        writeln!(
            f,
            "{} ({} rows)\n{}\n{}",
            self.table.read_lock().title(),
            self.rows.len(),
            header.join(" | "),
            rows.join("\n")
        )
    }
}
