//! Storage configuration.
//!
//! Values come from the process environment, after a `.env` file in the
//! working directory (if any) has been loaded into it:
//!
//! - `DATATABLE_STORAGE_BACKEND`: the storage backend, only `json` for now
//! - `DATATABLE_STORAGE_WORKDIR`: the directory the backend keeps its files in

use std::env;
use std::path::PathBuf;

use log::debug;

pub const BACKEND_VAR: &str = "DATATABLE_STORAGE_BACKEND";
pub const WORKDIR_VAR: &str = "DATATABLE_STORAGE_WORKDIR";

const DEFAULT_BACKEND: &str = "json";
const DEFAULT_WORKDIR: &str = "storage";

#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    pub backend: String,
    pub workdir: PathBuf,
}

impl StorageConfig {
    pub fn new(backend: &str, workdir: impl Into<PathBuf>) -> StorageConfig {
        StorageConfig {
            backend: backend.to_string(),
            workdir: workdir.into(),
        }
    }

    pub fn from_env() -> StorageConfig {
        //! Read the configuration from `.env` and the environment, falling back
        //! to the `json` backend in `./storage`.

        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("no environment file loaded: {}", e),
        }

        StorageConfig {
            backend: env::var(BACKEND_VAR).unwrap_or_else(|_| DEFAULT_BACKEND.to_string()),
            workdir: env::var(WORKDIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORKDIR)),
        }
    }

    pub fn with_overrides(mut self, backend: Option<String>, workdir: Option<PathBuf>) -> StorageConfig {
        //! Replace the values given on the command line.

        if let Some(backend) = backend {
            self.backend = backend;
        }
        if let Some(workdir) = workdir {
            self.workdir = workdir;
        }
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::new(DEFAULT_BACKEND, DEFAULT_WORKDIR)
    }
}
