use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use post_harvester::harvest::{
    DateBound, HarvestError, HarvestPipeline, HarvestResult, HttpPostSource, SearchCriteria,
};
use post_harvester::{HarvesterExecutor, SourceConfig, DEFAULT_PAGE_SIZE};
use tracing::{error, info, warn};

/// Harvest posts or account profiles from a search service into CSV files
#[derive(Parser, Debug)]
#[command(name = "post-harvester", version)]
#[command(about = "Appends matching posts or account profiles to a CSV file as they arrive")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// Directory the CSV file is written to
    #[arg(short = 'o', long, default_value = ".")]
    output_dir: PathBuf,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Base URL of the search service
    #[arg(long, env = "POST_HARVESTER_API_URL")]
    api_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "POST_HARVESTER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Posts requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write every matching post to tweets_<query-or-user>.csv
    Posts {
        /// Free-text search
        #[arg(short, long)]
        query: Option<String>,

        /// Only posts authored by this handle
        #[arg(short, long)]
        user: Option<String>,

        /// First day included (default: yesterday)
        #[arg(long, conflicts_with = "no_since")]
        since: Option<NaiveDate>,

        /// First day excluded (default: tomorrow)
        #[arg(long, conflicts_with = "no_until")]
        until: Option<NaiveDate>,

        /// Do not bound the search from below
        #[arg(long)]
        no_since: bool,

        /// Do not bound the search from above
        #[arg(long)]
        no_until: bool,
    },

    /// Write one profile row per handle to tweets_<label>_users.csv
    Users {
        /// Handles to look up, in output order
        #[arg(required = true)]
        handles: Vec<String>,

        /// Output label (default: handles joined with '_')
        #[arg(short, long)]
        label: Option<String>,

        /// Lookups allowed in flight at once
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,
    },
}

fn date_bound(date: Option<NaiveDate>, open: bool, default: DateBound) -> DateBound {
    match (date, open) {
        (_, true) => DateBound::Open,
        (Some(date), false) => DateBound::On(date),
        (None, false) => default,
    }
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} rows")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn run(cli: Cli) -> Result<HarvestResult, HarvestError> {
    let config = SourceConfig::new(cli.source.api_url)
        .with_token(cli.source.token)
        .with_page_size(cli.source.page_size);
    let source = Arc::new(HttpPostSource::new(&config)?);

    let progress = progress_bar(cli.no_progress);
    let pipeline = HarvestPipeline::new(source)
        .with_output_dir(cli.output_dir)
        .with_progress(progress.clone());

    let result = match cli.command {
        Command::Posts {
            query,
            user,
            since,
            until,
            no_since,
            no_until,
        } => {
            let defaults = SearchCriteria::default();
            let criteria = SearchCriteria {
                query,
                author: user,
                since: date_bound(since, no_since, defaults.since),
                until: date_bound(until, no_until, defaults.until),
            };
            pipeline.harvest_posts(&criteria).await
        }
        Command::Users {
            handles,
            label,
            concurrency,
        } => {
            HarvesterExecutor::new(concurrency)
                .harvest_users(&pipeline, &handles, label.as_deref())
                .await
        }
    };

    progress.finish_and_clear();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => match result {
            Ok(result) => {
                info!(
                    path = %result.path.display(),
                    records = result.stats.records_written,
                    "Harvest finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Harvest failed: {}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, output file keeps the rows written so far");
            ExitCode::from(130)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_bound_precedence() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let default = DateBound::Relative(-1);

        assert_eq!(date_bound(None, false, default), default);
        assert_eq!(date_bound(Some(day), false, default), DateBound::On(day));
        assert_eq!(date_bound(None, true, default), DateBound::Open);
        assert_eq!(date_bound(Some(day), true, default), DateBound::Open);
    }

    #[test]
    fn test_cli_rejects_date_with_open_flag() {
        let parsed = Cli::try_parse_from([
            "post-harvester",
            "--api-url",
            "https://example.com",
            "posts",
            "--query",
            "rust",
            "--since",
            "2024-01-01",
            "--no-since",
        ]);
        assert!(parsed.is_err());
    }
}
