//! The place where the command line is defined.
//!
//! The same [`Command`] set is parsed from the process arguments and, inside
//! the shell, from every line the user types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::storage::Category;

#[derive(Parser)]
#[command(name = "datatable")]
#[command(about = "A schema-driven tabular data engine", long_about = None)]
pub struct CliParser {
    /// Storage backend, overrides DATATABLE_STORAGE_BACKEND.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Storage directory, overrides DATATABLE_STORAGE_WORKDIR.
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// A line typed in the shell, parsed without the global options.
#[derive(Parser)]
#[command(name = "", no_binary_name = true, disable_help_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// List the stored schemas.
    Schemas,

    /// List the stored data-table documents.
    Datatables,

    /// Show the tables, columns and choices of a schema.
    Show { schema: String },

    /// Create a schema.
    CreateSchema {
        name: String,
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Add a table to a schema.
    AddTable {
        schema: String,
        name: String,
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Add a column to a table, `--dtype other_table.column` for a reference.
    AddColumn {
        schema: String,
        table: String,
        name: String,
        #[arg(long, default_value = "str")]
        dtype: String,
    },

    /// Create an empty data-table document for a schema.
    CreateDatatable {
        schema: String,
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Print the rows of one table of a data-table document.
    Rows { datatable: String, table: String },

    /// Delete a schema, table, column, datatable or row by uid.
    Delete {
        #[arg(value_parser = parse_category)]
        category: Category,
        uid: String,
    },

    /// Register the example alloys schema and generate a document for it.
    Demo,

    /// Start an interactive shell.
    Shell,
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse()
}

pub fn split_line(line: &str) -> Result<Vec<String>, String> {
    //! Split a shell line into arguments on whitespace. Single or double
    //! quotes group words into one argument, `"Heat Treatment"` included.
    //!
    //! # Issues
    //! - There are no escapes, a quote character cannot appear inside an
    //! argument quoted with the same character.

    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), c) => word.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if let Some(open) = quote {
        return Err(format!("unterminated quote {} in: {}", open, line));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}
