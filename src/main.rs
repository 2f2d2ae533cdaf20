#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use benchmark_db::DbResult;
use benchmark_db::config::{SaveOptions, log_filter};
use benchmark_db::save_cmd::{self, SaveCommand, parse_artifact_arg};

#[derive(Parser, Debug)]
#[command(name = "benchmark-db")]
#[command(about = "Save benchmark results to CSV or a results database", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set BENCHMARK_DB_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Config file with default options (TOML, default ~/.ch_benchmark)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save rows from a JSON file to a benchmark table
    Save {
        /// Table the rows belong to (e.g., fio)
        #[arg(long)]
        table: String,
        /// JSON array or JSON-lines file with one object per row
        #[arg(long)]
        rows: PathBuf,
        /// Archive a file and record its URL: COLUMN=PATH (repeatable)
        #[arg(long = "artifact", value_parser = parse_artifact_arg)]
        artifacts: Vec<(String, PathBuf)>,
        /// Directory searched (with its parents) for benchmark.ini
        #[arg(long)]
        benchmark_dir: Option<PathBuf>,
        #[command(flatten)]
        db: DbArgs,
    },
}

#[derive(Args, Debug)]
struct DbArgs {
    /// Backend: bigquery, callback, mysql or postgresql (CSV only when unset)
    #[arg(long)]
    db: Option<String>,
    /// Keep the CSV file after a successful import
    #[arg(long)]
    db_and_csv: bool,
    /// Extra header for the callback backend, `Name: value` (repeatable)
    #[arg(long)]
    db_callback_header: Vec<String>,
    /// Database host, or the URL for the callback backend
    #[arg(long)]
    db_host: Option<String>,
    /// Database (BigQuery dataset) name
    #[arg(long)]
    db_name: Option<String>,
    #[arg(long)]
    db_port: Option<u16>,
    #[arg(long)]
    db_pswd: Option<String>,
    /// Prefix of table names in the database [default: block_storage_]
    #[arg(long)]
    db_prefix: Option<String>,
    #[arg(long)]
    db_user: Option<String>,
    /// Directory for CSV output (default: working directory)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Columns to drop from every schema (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    remove: Vec<String>,
    /// Artifact store base URL
    #[arg(long)]
    store: Option<String>,
    /// Directory with common.json and per-table schema files [default: schema]
    #[arg(long)]
    schema_dir: Option<PathBuf>,
}

impl DbArgs {
    fn into_options(self, verbose: bool) -> SaveOptions {
        SaveOptions {
            db: self.db,
            db_and_csv: self.db_and_csv,
            db_callback_header: self.db_callback_header,
            db_host: self.db_host,
            db_name: self.db_name,
            db_port: self.db_port,
            db_pswd: self.db_pswd,
            db_prefix: self.db_prefix,
            db_user: self.db_user,
            output: self.output,
            remove: self.remove,
            store: self.store,
            schema_dir: self.schema_dir,
            verbose,
        }
    }
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("BENCHMARK_DB_LOG").unwrap_or_else(|_| log_filter(verbose).to_string());
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn run(cli: Cli) -> DbResult<()> {
    match cli.command {
        Commands::Save { table, rows, artifacts, benchmark_dir, db } => {
            // The config file may turn on verbose output, so merge it first.
            let options =
                save_cmd::resolve_options(db.into_options(cli.verbose), cli.config.as_deref())?;
            init_tracing(options.verbose);
            save_cmd::run(SaveCommand {
                options,
                table,
                rows,
                artifacts,
                benchmark_dir,
            })
        }
    }
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
