//! refcheck: validate the references of fixture documents.
//!
//! Loads a JSON fixture (schemas, seed records, documents), seeds a backend,
//! validates every document and prints a report. Exits with status 1 when any
//! document is invalid or could not be checked.
//!
//! Usage:
//!   refcheck --fixture cars.json
//!   refcheck --fixture cars.json --backend duckdb --database refs.duckdb

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use refcheck_cli::{Fixture, run};
use refcheck_storage::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Memory,
    Duckdb,
}

#[derive(Parser, Debug)]
#[command(name = "refcheck")]
#[command(about = "Check that document references point at existing records")]
struct Args {
    /// Fixture file with schemas, records and documents
    #[arg(short, long)]
    fixture: PathBuf,

    /// Store to seed and query
    #[arg(short, long, value_enum, default_value = "memory")]
    backend: BackendKind,

    /// DuckDB database file (in-memory when omitted)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Failure message template; {PATH} is replaced by the field path
    #[arg(short, long)]
    message: Option<String>,

    /// Check each distinct id in a list once
    #[arg(long)]
    allow_duplicates: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let fallback = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let fixture = Fixture::load(&args.fixture)?;
    info!(
        "loaded {} schema(s) and {} document(s) from {}",
        fixture.schemas.len(),
        fixture.documents.len(),
        args.fixture.display()
    );

    let mut options = fixture.options.clone();
    if let Some(message) = args.message {
        options = options.with_message(message);
    }
    if args.allow_duplicates {
        options = options.with_allow_duplicates(true);
    }

    let connection: Connection = match args.backend {
        BackendKind::Memory => fixture.seed_memory()? as Connection,
        BackendKind::Duckdb => fixture.seed_duckdb(args.database.as_deref())? as Connection,
    };

    let report = run(&fixture, connection, options).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if report.failed() {
        std::process::exit(1);
    }
    Ok(())
}
