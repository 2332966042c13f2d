pub mod cli;
pub mod config;
pub mod generator;
pub mod persistence;
pub mod sessions;
pub mod storage;
