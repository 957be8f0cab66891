//! hiredb-load - bulk loader for the hiring CSV files

use anyhow::Result;
use clap::{Parser, Subcommand};
use hiredb_common::logging::{init_logging, LogConfig, LogLevel};
use hiredb_common::types::TableName;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use hiredb_server::{
    config::Config,
    db,
    ingest::{
        Diagnostics, HeaderMode, IngestOptions, IngestSummary, Ingestor, PgRecordSink,
        TracingObserver,
    },
};

#[derive(Parser, Debug)]
#[command(name = "hiredb-load")]
#[command(author, version, about = "Load hiring CSV files into PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Rows per transaction (defaults to INGEST_BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Files start with a header row naming the columns
    #[arg(long, global = true)]
    header: bool,

    /// Log debug output and list every dropped row
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Apply database migrations before loading
    #[arg(long, global = true)]
    migrate: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load departments.csv, jobs.csv and hired_employees.csv, in that order
    All {
        /// Directory holding the CSV files (defaults to INGEST_DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Load a single file into one table
    Table {
        /// departments, jobs or hired_employees
        name: TableName,

        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("hiredb-load")
        .filter_directives("sqlx=warn")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = Config::load()?;

    let pool = db::create_pool(&db::DbConfig::from(&config.database)).await?;
    if cli.migrate {
        db::run_migrations(&pool).await?;
    }

    let verbose = cli.verbose || config.ingest.verbose;
    let options = IngestOptions::batch()
        .with_batch_size(cli.batch_size.unwrap_or(config.ingest.batch_size))
        .with_header(if cli.header {
            HeaderMode::FromInput
        } else {
            HeaderMode::Headerless
        })
        .with_diagnostics(if verbose {
            Diagnostics::Verbose
        } else {
            Diagnostics::Terse
        });

    let ingestor = Ingestor::new(Arc::new(PgRecordSink::new(pool.clone())), options)
        .with_observer(Arc::new(TracingObserver));

    let summaries = match cli.command {
        Command::All { data_dir } => {
            let dir = data_dir.unwrap_or(config.ingest.data_dir);
            info!(dir = %dir.display(), "Loading all tables");
            ingestor.ingest_dir(&dir).await?
        },
        Command::Table { name, path } => {
            vec![ingestor.ingest_file(name.as_str(), &path).await?]
        },
    };

    for summary in &summaries {
        report(summary);
    }

    pool.close().await;
    info!("Load complete");
    Ok(())
}

fn report(summary: &IngestSummary) {
    info!(
        table = %summary.table,
        rows_read = summary.rows_read,
        rows_written = summary.rows_written,
        rows_rejected = summary.rows_rejected,
        batches = summary.batches,
        "Table loaded"
    );

    for rejection in summary.rejections.iter().flatten() {
        info!(table = %summary.table, "Dropped {}", rejection);
    }
}
