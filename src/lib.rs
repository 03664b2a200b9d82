pub mod config;
pub mod database;
pub mod executor;
pub mod repl;
pub mod sql;
pub mod storage;
