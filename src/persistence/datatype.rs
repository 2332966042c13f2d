use std::fmt::Display;

use crate::persistence::random::NANOID_DEFAULT_SIZE;

/// The behaviour carried by a column's `dtype` tag.
///
/// The tag itself is an open vocabulary and stays a plain string on the
/// [`super::Column`]; this is only the parsed view of it. Three tags generate
/// their own values and make a column the table's primary key:
/// - `inc`: 1-based row ordinal
/// - `uuid`: random uuid
/// - `nanoid[-N]`: random short identifier of `N` characters (21 by default)
///
/// A tag with a dot, `other_table.column`, is a [`ColumnType::Reference`] and
/// takes its choices from the rows of another table.
///
/// Only `nanoid` takes a size suffix. A tag like `inc-3` still makes its
/// column the primary key (see [`ColumnType::is_key_generator`]) but
/// generates nothing, its rows get the column's static default.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnType {
    Increment,
    Uuid,
    NanoId(usize),
    Reference(ColumnReference),
    Plain(String),
}

/// A `table.column` link from a choice column to the column that feeds it.
///
/// The link is resolved by name against the data at hand, it is never
/// enforced as a constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnReference {
    pub table_name: String,
    pub column_name: String,
}

const KEY_GENERATORS: [&str; 3] = ["inc", "uuid", "nanoid"];

impl ColumnType {
    pub fn parse(dtype: &str) -> ColumnType {
        if let Some(reference) = ColumnReference::parse(dtype) {
            return ColumnType::Reference(reference);
        }

        match dtype {
            "inc" => return ColumnType::Increment,
            "uuid" => return ColumnType::Uuid,
            _ => {}
        }

        let mut parts = dtype.split('-');
        match parts.next().unwrap_or_default() {
            "nanoid" => {
                let size = match (parts.next(), parts.next()) {
                    (Some(size), None) => size.parse().unwrap_or(NANOID_DEFAULT_SIZE),
                    _ => NANOID_DEFAULT_SIZE,
                };
                ColumnType::NanoId(size)
            }
            _ => ColumnType::Plain(dtype.to_string()),
        }
    }

    pub fn is_key_generator(dtype: &str) -> bool {
        //! Whether the tag prefix, the text before an optional `-size`
        //! suffix, is one of `inc`, `uuid` or `nanoid`.

        let prefix = dtype.split('-').next().unwrap_or_default();
        KEY_GENERATORS.contains(&prefix)
    }
}

impl ColumnReference {
    pub fn parse(dtype: &str) -> Option<ColumnReference> {
        let (table_name, column_name) = dtype.split_once('.')?;
        Some(ColumnReference {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
        })
    }
}

impl Display for ColumnReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table_name, self.column_name)
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Increment => write!(f, "inc"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::NanoId(size) => write!(f, "nanoid-{}", size),
            ColumnType::Reference(reference) => write!(f, "{}", reference),
            ColumnType::Plain(dtype) => write!(f, "{}", dtype),
        }
    }
}
