//! Everything one shell session knows: the storage every command runs
//! against, the commands typed so far and when the session started.
//!
//! The history lives as long as the session and is never persisted.

use std::fmt::Display;

use chrono::{DateTime, Local};

use crate::storage::DataTableStorage;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

struct HistoryEntry {
    line: String,
    typed_at: DateTime<Local>,
}

impl Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.typed_at.format(TIME_FORMAT), self.line)
    }
}

pub struct Session {
    history: Vec<HistoryEntry>,
    started_at: DateTime<Local>,
    storage: Box<dyn DataTableStorage>,
}

impl Session {
    pub fn client(storage: Box<dyn DataTableStorage>) -> Session {
        Session {
            history: Vec::new(),
            started_at: Local::now(),
            storage,
        }
    }

    pub fn storage(&self) -> &dyn DataTableStorage {
        self.storage.as_ref()
    }

    pub fn add_to_command_history(&mut self, line: &str) {
        self.history.push(HistoryEntry {
            line: line.to_string(),
            typed_at: Local::now(),
        });
    }

    pub fn start_time_string(&self) -> String {
        self.started_at.format(TIME_FORMAT).to_string()
    }

    pub fn command_history(&self, n_prev: Option<usize>) -> Vec<String> {
        //! The latest commands first, `n_prev` limits how many.

        self.history
            .iter()
            .rev()
            .take(n_prev.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(index, entry)| format!("{:3} | {}", index, entry))
            .collect()
    }

    pub fn get_last_command(&self, nth_back: usize) -> Option<&str> {
        //! The `nth_back` latest command, 1 being the latest.

        if nth_back == 0 {
            return None;
        }
        let index = self.history.len().checked_sub(nth_back)?;
        self.history.get(index).map(|entry| entry.line.as_str())
    }
}
