//! # stowage
//!
//! Retention engine for CI scan reports in object storage: keeps the newest
//! `keepCount` reports per category at the source prefix and moves the rest
//! to the archive prefix.
//!
//! ## Usage
//!
//! ```bash
//! # Full run from a request document
//! stowage run --request retention.json
//!
//! # Request on stdin, bucket from the environment
//! STOWAGE_BUCKET=s3://ci-reports stowage run < retention.json
//!
//! # Ad-hoc single category
//! stowage category --name sonar \
//!     --source-prefix reports/sonar --archive-prefix archive/sonar \
//!     --keep-count 3
//! ```
//!
//! The invocation report is printed to stdout as JSON. The exit code is 0
//! for `ok`, 1 for `partial`, and 2 for `error`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use stowage_core::observability::{init_logging, LogFormat};
use stowage_core::storage::BucketStore;
use stowage_core::ObjectStore;
use stowage_engine::{
    EngineConfig, RetentionEngine, RetentionPolicy, RunRequest, RunStatus,
};

/// CI scan-report retention engine.
#[derive(Debug, Parser)]
#[command(name = "stowage")]
#[command(about = "Archives all but the newest CI scan reports per category")]
#[command(version)]
struct Args {
    /// Object storage bucket (e.g. `my-bucket`, `s3://my-bucket`,
    /// `gs://my-bucket`). Overrides the bucket in the request document.
    #[arg(long, env = "STOWAGE_BUCKET", global = true)]
    bucket: Option<String>,

    /// Emit JSON logs instead of pretty output.
    #[arg(long, env = "STOWAGE_LOG_JSON", global = true)]
    log_json: bool,

    /// Overall run timeout in seconds.
    #[arg(long, env = "STOWAGE_TIMEOUT_SECS", default_value = "300", global = true)]
    timeout_secs: u64,

    /// Maximum concurrent moves per category.
    #[arg(long, env = "STOWAGE_MAX_IN_FLIGHT", default_value = "8", global = true)]
    max_in_flight: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run retention from a JSON request document.
    Run {
        /// Path to the request JSON, or `-` for stdin.
        #[arg(long, default_value = "-")]
        request: String,
    },

    /// Run retention for a single category given on the command line.
    Category {
        /// Category identifier.
        #[arg(long)]
        name: String,

        /// Prefix the category's live reports are stored under.
        #[arg(long)]
        source_prefix: String,

        /// Prefix demoted reports are moved under.
        #[arg(long)]
        archive_prefix: String,

        /// Number of most-recent reports to retain.
        #[arg(long, default_value = "3")]
        keep_count: usize,
    },
}

fn load_request(path: &str) -> Result<RunRequest> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading request file {path}"))?
    };
    serde_json::from_str(&raw).context("parsing request document")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let (bucket, categories) = match args.command {
        Commands::Run { ref request } => {
            let request = load_request(request)?;
            let bucket = args
                .bucket
                .clone()
                .filter(|b| !b.is_empty())
                .unwrap_or(request.bucket);
            (bucket, request.categories)
        }
        Commands::Category {
            ref name,
            ref source_prefix,
            ref archive_prefix,
            keep_count,
        } => {
            let bucket = args
                .bucket
                .clone()
                .ok_or_else(|| anyhow!("missing STOWAGE_BUCKET (required for category mode)"))?;
            let policy = RetentionPolicy {
                name: name.clone(),
                source_prefix: source_prefix.clone(),
                archive_prefix: archive_prefix.clone(),
                keep_count,
            };
            (bucket, vec![policy])
        }
    };

    if bucket.is_empty() {
        return Err(anyhow!("no bucket given (flag, STOWAGE_BUCKET, or request document)"));
    }

    let store: Arc<dyn ObjectStore> = Arc::new(BucketStore::from_bucket(&bucket)?);
    let engine = RetentionEngine::with_config(
        store,
        EngineConfig {
            max_in_flight: args.max_in_flight,
            run_timeout: Duration::from_secs(args.timeout_secs),
            ..EngineConfig::default()
        },
    );

    let report = engine.run(&categories).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(match report.status {
        RunStatus::Ok => ExitCode::SUCCESS,
        RunStatus::Partial => ExitCode::from(1),
        RunStatus::Error => ExitCode::from(2),
    })
}
