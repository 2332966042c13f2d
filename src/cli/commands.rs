//! This module where all the commands are executed.
//!
//! Command line syntax:
//!
//! - datatable --help | Command Line Help
//! - datatable shell | Run the interactive shell.
//! - datatable <command> | Run a single command, see [`Command`].
//!
//! Every command goes through the [`DataTableStorage`] API only, exactly as a
//! web front end would.

use std::fmt::Display;

use crate::cli::messages::{dim_identifier, highlight_argument, system_message};
use crate::cli::parsers::Command;
use crate::generator::Generator;
use crate::persistence::{Layout, LockExt};
use crate::storage::{Category, DataTableStorage, PostData, StorageResult};

/// The executor that runs one [`Command`] against a storage.
pub struct CommandExecutor<'a> {
    command: Command,
    storage: &'a dyn DataTableStorage,
}

/// What a command has to show once it completes.
///
/// `lines` are printed as they are, `n_processed` counts the entities
/// created, listed or removed.
pub struct CommandOutput {
    pub lines: Vec<String>,
    pub n_processed: usize,
}

impl Display for CommandOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

fn _summary_line(result: &StorageResult) -> String {
    format!(
        "{:24} {} {}",
        result.name,
        dim_identifier(&result.uid),
        result.title
    )
}

fn _check(result: &StorageResult, what: &str) -> Result<(), String> {
    //! Turn a result that does not exist into the error message of the command.

    if result.exists() {
        Ok(())
    } else if result.message.is_empty() {
        Err(system_message(
            "storage",
            format!("Could not create {}; check the parent uids.", highlight_argument(what)),
        ))
    } else {
        Err(system_message("storage", result.message.clone()))
    }
}

impl<'a> CommandExecutor<'a> {
    pub fn new(command: Command, storage: &'a dyn DataTableStorage) -> CommandExecutor<'a> {
        CommandExecutor { command, storage }
    }

    fn _list(&self, category: Category) -> CommandOutput {
        let items = self.storage.get_list(category);
        let mut lines = vec![format!("There are {} {} document(s).", items.len(), category)];
        lines.extend(items.iter().map(_summary_line));
        CommandOutput {
            lines,
            n_processed: items.len(),
        }
    }

    fn _created(&self, result: StorageResult, what: &str) -> Result<CommandOutput, String> {
        _check(&result, what)?;
        Ok(CommandOutput {
            lines: vec![format!(
                "Created {} {} {}",
                what,
                highlight_argument(&result.name),
                dim_identifier(&result.uid)
            )],
            n_processed: 1,
        })
    }

    pub fn execute(&self) -> Result<CommandOutput, String> {
        match &self.command {
            Command::Schemas => Ok(self._list(Category::Schema)),
            Command::Datatables => Ok(self._list(Category::DataTable)),
            Command::Show { schema } => {
                let result = self.storage.get(Category::Schema, schema);
                let Some(schema) = result.data.schema.as_ref().filter(|_| result.exists()) else {
                    return Err(system_message("storage", result.message.clone()));
                };

                let schema = schema.read_lock();
                let mut lines = vec![format!(
                    "{} {}",
                    highlight_argument(&result.title),
                    dim_identifier(&result.uid)
                )];
                lines.push(schema.render(Layout::Columns));
                let choices = schema.render(Layout::Choices);
                if choices.lines().count() > 1 {
                    lines.push(choices);
                }

                Ok(CommandOutput {
                    lines,
                    n_processed: schema.tables().len(),
                })
            }
            Command::CreateSchema { name, title } => {
                self._created(self.storage.post_schema(name, title), "schema")
            }
            Command::AddTable {
                schema,
                name,
                title,
            } => {
                let result = self
                    .storage
                    .post_tables(schema, &[(name.as_str(), title.as_str())])
                    .pop()
                    .unwrap_or_default();
                self._created(result, "table")
            }
            Command::AddColumn {
                schema,
                table,
                name,
                dtype,
            } => {
                let result = self
                    .storage
                    .post_columns(schema, table, &[(name.as_str(), dtype.as_str())])
                    .pop()
                    .unwrap_or_default();
                self._created(result, "column")
            }
            Command::CreateDatatable { schema, title } => {
                let result = self.storage.post(&PostData {
                    category: Some(Category::DataTable),
                    title: title.clone(),
                    schema: schema.clone(),
                    ..PostData::default()
                });
                self._created(result, "datatable")
            }
            Command::Rows { datatable, table } => {
                let result = self.storage.get(Category::DataTable, datatable);
                let Some(tables) = result.data.datatable.as_ref().filter(|_| result.exists()) else {
                    return Err(system_message("storage", result.message.clone()));
                };

                tables.update_choices();
                match tables.get(table) {
                    Some(rows) => Ok(CommandOutput {
                        lines: vec![format!("{}", rows)],
                        n_processed: rows.len(),
                    }),
                    None => Err(system_message(
                        "storage",
                        format!("Table {} does not exist!", highlight_argument(table)),
                    )),
                }
            }
            Command::Delete { category, uid } => {
                if self.storage.delete(*category, uid) {
                    Ok(CommandOutput {
                        lines: vec![format!("Deleted {} {}", category, dim_identifier(uid))],
                        n_processed: 1,
                    })
                } else {
                    Err(system_message(
                        "storage",
                        format!("No {} {} to delete.", category, highlight_argument(uid)),
                    ))
                }
            }
            Command::Demo => {
                let result = Generator::new(self.storage).generate_examples()?;
                let mut lines = vec![format!(
                    "Generated datatable {} {}",
                    highlight_argument(&result.title),
                    dim_identifier(&result.uid)
                )];
                let mut n_processed = 0;
                if let Some(tables) = &result.data.datatable {
                    for (_, table) in tables.iter() {
                        n_processed += table.len();
                        lines.push(format!("{}", table));
                    }
                }
                Ok(CommandOutput { lines, n_processed })
            }
            Command::Shell => Err(system_message(
                "system",
                "Already inside the shell.".to_string(),
            )),
        }
    }
}
