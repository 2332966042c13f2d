use std::process;

use clap::Parser;
use datatable_engine::cli::{self, CliParser, Command};
use datatable_engine::config::StorageConfig;
use datatable_engine::storage;
use env_logger::Env;
use log::debug;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = CliParser::parse();
    let config = StorageConfig::from_env().with_overrides(args.backend, args.workdir);
    debug!("storage config {:?}", config);

    let storage = match storage::from_config(&config) {
        Ok(storage) => storage,
        Err(message) => {
            eprintln!("err: {}", message);
            process::exit(1);
        }
    };

    match args.command {
        Command::Shell => cli::run_shell(storage),
        command => match cli::run_command(command, storage.as_ref()) {
            Ok(output) => println!("{}", output),
            Err(message) => {
                eprintln!("{}", message);
                process::exit(1);
            }
        },
    }
}
