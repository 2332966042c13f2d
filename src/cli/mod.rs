use std::io::{self, BufRead, Write};

use clap::Parser;
use colored::Colorize;
use log::debug;

use crate::{
    cli::{
        colors::ACCENT,
        commands::CommandExecutor,
        messages::{highlight_argument, system_message},
        parsers::{ShellLine, split_line},
    },
    sessions::session::Session,
    storage::DataTableStorage,
};

mod colors;
mod commands;
mod messages;
pub mod parsers;

pub use commands::CommandOutput;
pub use parsers::{CliParser, Command};

const DEFAULT_LAST_COMMAND_DELIMITER: &str = "!";

const SHELL_COMMANDS_LIST: [(&str, &str); 4] = [
    ("!", "execute the last command, add more to go further back"),
    ("help", "list all available commands"),
    ("history", "list command history for this session"),
    ("exit", "close the session"),
];

pub fn run_command(
    command: Command,
    storage: &dyn DataTableStorage,
) -> Result<CommandOutput, String> {
    //! Run a single command and hand back what it has to show.

    debug!("running {:?}", command);
    CommandExecutor::new(command, storage).execute()
}

pub fn show_help() {
    println!(
        "{}",
        system_message(
            "info",
            format!(
                "Any other line is parsed as a {}, try '{}'.",
                highlight_argument("command"),
                highlight_argument("schemas")
            )
        )
    );

    println!();
    println!("{:18} {}", "COMMAND".color(ACCENT), "DETAILS");
    for (command, details) in SHELL_COMMANDS_LIST {
        println!("{:18} {}", command.color(ACCENT), details)
    }
    for (command, details) in [
        ("schemas", "list schemas"),
        ("datatables", "list data-table documents"),
        ("show", "<schema>"),
        ("create-schema", "<name> [--title T]"),
        ("add-table", "<schema> <name> [--title T]"),
        ("add-column", "<schema> <table> <name> [--dtype D]"),
        ("create-datatable", "<schema> [--title T]"),
        ("rows", "<datatable> <table>"),
        ("delete", "<category> <uid>"),
        ("demo", "generate the example alloys document"),
    ] {
        println!("{:18} {}", command.color(ACCENT), details)
    }
}

pub fn run_shell(storage: Box<dyn DataTableStorage>) {
    let mut session = Session::client(storage);

    println!(
        "{}",
        system_message(
            "system",
            format!(
                "Use '{}' to quit and '{}' to know all commands available.",
                highlight_argument("exit"),
                highlight_argument("help"),
            ),
        )
    );
    println!(
        "{}",
        system_message(
            "system",
            format!(
                "New session initiated at '{}'.",
                highlight_argument(&session.start_time_string())
            ),
        )
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!();
        print!("{:9} > ", "datatable".color(ACCENT).bold());
        let _ = io::stdout().flush();

        let mut buffer = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        if buffer.starts_with(DEFAULT_LAST_COMMAND_DELIMITER) {
            let last = buffer.matches(DEFAULT_LAST_COMMAND_DELIMITER).count();
            match session.get_last_command(last) {
                Some(command) => buffer = command.to_string(),
                None => {
                    println!(
                        "{}",
                        system_message(
                            "system",
                            format!(
                                "No command {} steps back.",
                                highlight_argument(&last.to_string())
                            ),
                        )
                    );
                    continue;
                }
            }
        }

        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        session.add_to_command_history(line);

        match line {
            "history" => {
                for entry in session.command_history(None) {
                    println!("{}", entry);
                }
            }
            "help" => show_help(),
            "exit" | "quit" => break,
            line => match split_line(line).and_then(|words| {
                ShellLine::try_parse_from(words).map_err(|error| error.to_string())
            }) {
                Ok(ShellLine { command }) => match run_command(command, session.storage()) {
                    Ok(output) => {
                        println!("{}", output);
                        println!(
                            "{}",
                            system_message(
                                "engine",
                                format!("{} item(s) processed!", output.n_processed)
                            )
                        );
                    }
                    Err(error) => println!("{}", error),
                },
                Err(error) => println!("{}", error),
            },
        }
    }

    println!("Goodbye!")
}
