//! Incremental harvest loops.
//!
//! This module provides the [`HarvestPipeline`] coordinator that drives a
//! [`PostSource`] into a CSV file with:
//! - Header written before the source is consulted
//! - One row appended and flushed per record pulled, in source order
//! - Structured logging via `tracing`
//! - Optional progress reporting via `indicatif`

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::StreamExt;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::executor::HarvesterExecutor;
use crate::harvest::query::{build_expression, DateBound, SearchCriteria};
use crate::harvest::sink::{posts_file_name, users_file_name, CsvSink};
use crate::harvest::traits::{ConfigurationError, HarvestError, PostRow, UserRow};
use crate::model::Author;
use crate::traits::PostSource;

// ============================================================================
// Pipeline Types
// ============================================================================

/// Complete harvest result.
#[derive(Debug)]
pub struct HarvestResult {
    /// Output file that was written
    pub path: PathBuf,

    /// Counters for the run
    pub stats: HarvestStats,
}

/// Statistics about the harvest operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    /// Data rows appended (header excluded)
    pub records_written: u64,

    /// Handles with no discoverable post (users harvest only)
    pub handles_skipped: u64,

    /// Wall time for the entire harvest (milliseconds)
    pub total_duration_ms: u64,
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Harvest coordinator over a single [`PostSource`].
///
/// # Example
///
/// ```ignore
/// use post_harvester::harvest::{HarvestPipeline, SearchCriteria};
///
/// let pipeline = HarvestPipeline::new(source).with_output_dir("out");
/// let result = pipeline.harvest_posts(&SearchCriteria::query("rust")).await?;
/// println!("{} rows in {}", result.stats.records_written, result.path.display());
/// ```
pub struct HarvestPipeline<S>
where
    S: PostSource,
{
    source: S,

    /// Directory output files are created in (default: current directory)
    output_dir: PathBuf,

    progress: Option<ProgressBar>,
}

impl<S> HarvestPipeline<S>
where
    S: PostSource,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            output_dir: PathBuf::from("."),
            progress: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Ticks `progress` once per row written.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Harvests every post matching `criteria` into `tweets_<name>.csv`.
    ///
    /// The criteria are validated before the output file is touched, so a
    /// configuration error never leaves a file behind.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if:
    /// - Neither query nor author is set
    /// - The output file cannot be created or appended to
    /// - The source fails while producing the next post; rows already
    ///   written stay on disk
    pub async fn harvest_posts(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<HarvestResult, HarvestError> {
        let expression = build_expression(criteria)?;
        let name = criteria.target_name()?;
        let path = self.output_dir.join(posts_file_name(name));
        self.harvest_expression(&expression, path).await
    }

    /// Harvests every post matching a pre-built `expression` into `path`.
    pub async fn harvest_expression(
        &self,
        expression: &str,
        path: PathBuf,
    ) -> Result<HarvestResult, HarvestError> {
        let start = Instant::now();
        info!(source = self.source.source_id(), expression, "Starting posts harvest");

        let mut sink = CsvSink::<PostRow>::create(&path)?;
        let mut posts = self.source.search(expression);

        while let Some(post) = posts.next().await {
            let row = PostRow::from(post?);
            sink.append(&row)?;
            self.tick();
        }

        let stats = HarvestStats {
            records_written: sink.rows(),
            handles_skipped: 0,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            records = stats.records_written,
            duration_ms = stats.total_duration_ms,
            path = %path.display(),
            "Posts harvest completed"
        );

        Ok(HarvestResult { path, stats })
    }

    /// Writes one profile row per handle to `tweets_<label>_users.csv`.
    ///
    /// Handles are looked up one after another; rows follow input order.
    /// A handle with no posts produces no row and is counted in
    /// [`HarvestStats::handles_skipped`].
    ///
    /// See [`HarvesterExecutor`] for overlapping lookups.
    pub async fn harvest_users(
        &self,
        handles: &[String],
        label: Option<&str>,
    ) -> Result<HarvestResult, HarvestError> {
        HarvesterExecutor::new(1)
            .harvest_users(self, handles, label)
            .await
    }

    /// Resolves the users output path; an absent label falls back to the
    /// handles joined with `_`.
    pub(crate) fn users_path(
        &self,
        handles: &[String],
        label: Option<&str>,
    ) -> Result<PathBuf, ConfigurationError> {
        let label = match label.filter(|l| !l.is_empty()) {
            Some(label) => label.to_string(),
            None if handles.is_empty() => return Err(ConfigurationError::MissingLabel),
            None => handles.join("_"),
        };
        Ok(self.output_dir.join(users_file_name(&label)))
    }

    pub(crate) fn tick(&self) {
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
    }
}

/// Profile attached to the first post authored by `handle`, if any.
pub(crate) async fn first_author<S>(
    source: &S,
    handle: &str,
) -> Result<Option<Author>, HarvestError>
where
    S: PostSource + ?Sized,
{
    let criteria = SearchCriteria::author(handle)
        .with_since(DateBound::Open)
        .with_until(DateBound::Open);
    let expression = build_expression(&criteria)?;

    debug!(handle, expression = %expression, "Looking up profile");
    Ok(source.first(&expression).await?.map(|post| post.user))
}

/// Appends the profile row for `handle`; returns `false` if it was skipped.
pub(crate) fn write_profile(
    sink: &mut CsvSink<UserRow>,
    handle: &str,
    author: Option<Author>,
) -> Result<bool, HarvestError> {
    match author {
        Some(author) => {
            sink.append(&UserRow::from(author))?;
            Ok(true)
        }
        None => {
            warn!(handle, "No posts found, skipping handle");
            Ok(false)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
