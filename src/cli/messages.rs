//! General message formatting functions for prettifying the CLI.
//!
//! - Highlight an argument (accent color, not bold)
//! - Dim an identifier (muted color)
//! - System messages, all in the same `[source] message` format

use colored::Colorize;

use crate::cli::colors::{ACCENT, MUTED};

pub fn highlight_argument(argument: &str) -> String {
    format!("{}", argument.color(ACCENT))
}

pub fn dim_identifier(uid: &str) -> String {
    format!("{}", uid.color(MUTED))
}

pub fn system_message(source_name: &str, message: String) -> String {
    //! Prefix `message` with its source (`storage`, `engine`, `system`)
    //! in the accent color.

    let source_formatted = format!("{:7}", source_name.color(ACCENT).bold());
    format!("[{}] {}", source_formatted, message)
}
