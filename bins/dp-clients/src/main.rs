//! dp clients CLI
//!
//! Reads and edits dimension options on the dataset and filter services.

use clap::{Args, Parser, Subcommand};
use dp_api_client::endpoints::DimensionRef;
use owo_colors::OwoColorize;
use std::num::NonZeroUsize;
use std::process::ExitCode;

mod commands;

use commands::{options, patch, RequestArgs};

/// Command line access to the dp dataset and filter services
#[derive(Parser)]
#[command(name = "dp-clients")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// User auth token
    #[arg(long, global = true, env = "DP_USER_AUTH_TOKEN", hide_env_values = true)]
    user_token: Option<String>,

    /// Collection the request belongs to
    #[arg(long, global = true)]
    collection_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Paging settings shared by the listing commands
#[derive(Args)]
struct PagingArgs {
    /// Items per page (defaults to DP_BATCH_SIZE or 100)
    #[arg(short, long)]
    page_size: Option<NonZeroUsize>,

    /// Pages fetched at once (defaults to DP_BATCH_MAX_WORKERS or 10)
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every option of a dataset dimension
    DatasetOptions {
        /// Dataset ID
        dataset: String,

        /// Edition name
        edition: String,

        /// Version number
        version: String,

        /// Dimension name
        dimension: String,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// List the options selected for a filter dimension
    FilterOptions {
        /// Filter ID
        filter_id: String,

        /// Dimension name
        dimension: String,

        /// Fail if the filter changes while it is being read
        #[arg(long)]
        validate_etag: bool,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Add and remove options of a filter dimension
    PatchFilter {
        /// Filter ID
        filter_id: String,

        /// Dimension name
        dimension: String,

        /// Options to add (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        add: Vec<String>,

        /// Options to remove (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        remove: Vec<String>,

        /// Options sent per request
        #[arg(short, long, default_value = "100")]
        batch_size: NonZeroUsize,

        /// Expected ETag of the filter before the first request
        #[arg(long)]
        if_match: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("dp_clients=debug,dp_api_client=debug,dp_core=debug")
            .init();
    }

    let request = RequestArgs {
        user_token: cli.user_token,
        collection_id: cli.collection_id,
    };

    let result = match cli.command {
        Commands::DatasetOptions {
            dataset,
            edition,
            version,
            dimension,
            paging,
        } => {
            let dimension = DimensionRef::new(dataset, edition, version, dimension);
            options::run_dataset(
                &request,
                &dimension,
                paging.page_size,
                paging.workers,
                &cli.format,
            )
            .await
        }

        Commands::FilterOptions {
            filter_id,
            dimension,
            validate_etag,
            paging,
        } => {
            options::run_filter(
                &request,
                &filter_id,
                &dimension,
                paging.page_size,
                paging.workers,
                validate_etag,
                &cli.format,
            )
            .await
        }

        Commands::PatchFilter {
            filter_id,
            dimension,
            add,
            remove,
            batch_size,
            if_match,
        } => {
            let change = patch::Change { add, remove };
            patch::run(
                &request,
                &filter_id,
                &dimension,
                &change,
                batch_size,
                if_match,
                &cli.format,
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
