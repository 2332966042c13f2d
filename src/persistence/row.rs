use std::fmt::Display;

use indexmap::IndexMap;
use serde_json::Value;

use crate::persistence::display_value;

/// One record of a [`super::DataTable`].
///
/// An open mapping of column names to values. The synthetic `uid` key is
/// always present and always first; declared columns follow. A column that
/// was never set is absent, which is not the same as a `null` value. A
/// declared column named `uid` cannot hold values, its key belongs to the row.
#[derive(Clone, Debug, PartialEq)]
pub struct Row(IndexMap<String, Value>);

/// How a row is addressed: by position or by primary key value.
#[derive(Clone, Debug, PartialEq)]
pub enum RowRef {
    Index(usize),
    Key(Value),
}

pub const ROW_UID: &str = "uid";

impl Row {
    pub fn new(uid: String, values: IndexMap<String, Value>) -> Row {
        let mut row = IndexMap::with_capacity(values.len() + 1);
        row.insert(ROW_UID.to_string(), Value::String(uid));
        row.extend(
            values
                .into_iter()
                .filter(|(key, _)| key != ROW_UID),
        );
        Row(row)
    }

    pub fn uid(&self) -> &str {
        self.0
            .get(ROW_UID)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn set(&mut self, column: &str, value: Value) -> bool {
        //! Set a column value. The row uid is not a column and is never
        //! overwritten, setting it returns false.

        if column == ROW_UID {
            return false;
        }
        self.0.insert(column.to_string(), value);
        true
    }

    pub(crate) fn restore_uid(&mut self, uid: &str) {
        self.0
            .insert(ROW_UID.to_string(), Value::String(uid.to_string()));
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.0
    }

    pub fn to_list(&self) -> Vec<Value> {
        //! All values in key order, the row uid first.

        self.0.values().cloned().collect()
    }

    pub fn matches(&self, criteria: &[(&str, Value)]) -> bool {
        //! A row matches when every criterion is satisfied by a key present
        //! in the row: equal value, or membership when the criterion is a list.
        //! A criterion on a key the row lacks is never satisfied.

        let satisfied = criteria
            .iter()
            .filter(|(key, expected)| match (self.0.get(*key), expected) {
                (Some(value), Value::Array(options)) => options.contains(value),
                (Some(value), expected) => value == expected,
                (None, _) => false,
            })
            .count();

        satisfied == criteria.len()
    }
}

impl From<usize> for RowRef {
    fn from(index: usize) -> Self {
        RowRef::Index(index)
    }
}

impl From<&str> for RowRef {
    fn from(key: &str) -> Self {
        RowRef::Key(Value::String(key.to_string()))
    }
}

impl From<Value> for RowRef {
    fn from(key: Value) -> Self {
        RowRef::Key(key)
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let row: Vec<String> = self.0.values().map(display_value).collect();
        write!(f, "{}", row.join(" | "))
    }
}
