//! slotdb - interactive shell over a single-file page store

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use slotdb::config::{StorageConfig, DEFAULT_POOL_CAPACITY};
use slotdb::database::Database;
use slotdb::repl;
use slotdb::storage::page::DEFAULT_PAGE_SIZE;
use slotdb::storage::ReplacerKind;
use std::io;
use std::path::PathBuf;

/// slotdb - a tiny SQL shell backed by slotted pages and a buffer pool
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data file
    #[arg(short = 'D', long, default_value = "./db")]
    db_path: PathBuf,

    /// Buffer pool capacity in pages
    #[arg(short, long, default_value_t = DEFAULT_POOL_CAPACITY)]
    capacity: usize,

    /// Page size in bytes
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Page replacement policy
    #[arg(short, long, value_enum, default_value_t = ReplacerKind::Lru)]
    replacer: ReplacerKind,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = StorageConfig {
        page_size: args.page_size,
        pool_capacity: args.capacity,
        replacer: args.replacer,
    };

    let database = Database::open_or_create(&args.db_path, config)
        .with_context(|| format!("Failed to open database at {}", args.db_path.display()))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run(&database, stdin.lock(), &mut stdout)
}
