use crate::harvest::pipeline::{
    first_author, write_profile, HarvestPipeline, HarvestResult, HarvestStats,
};
use crate::harvest::sink::CsvSink;
use crate::harvest::traits::{HarvestError, UserRow};
use crate::traits::PostSource;
use futures::StreamExt;
use std::time::Instant;
use tracing::{info, instrument};

/// Runs per-handle profile lookups with bounded overlap.
///
/// Lookups start in input-handle order, at most `concurrency_limit` at a
/// time, and rows are written in that same order. With a limit of 1 each
/// lookup starts only after the previous one finished. Dropping the harvest
/// future drops every lookup still in flight.
pub struct HarvesterExecutor {
    concurrency_limit: usize,
}

impl HarvesterExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    #[instrument(skip(self, pipeline, handles), fields(handles = handles.len()))]
    pub async fn harvest_users<S>(
        &self,
        pipeline: &HarvestPipeline<S>,
        handles: &[String],
        label: Option<&str>,
    ) -> Result<HarvestResult, HarvestError>
    where
        S: PostSource,
    {
        let start = Instant::now();
        let path = pipeline.users_path(handles, label)?;
        let mut sink = CsvSink::<UserRow>::create(&path)?;

        info!(
            path = %path.display(),
            concurrency = self.concurrency_limit,
            "Starting users harvest"
        );

        let source = pipeline.source();
        let mut lookups = futures::stream::iter(handles)
            .map(|handle| async move { (handle, first_author(source, handle).await) })
            .buffered(self.concurrency_limit);

        let mut skipped = 0;
        while let Some((handle, author)) = lookups.next().await {
            if write_profile(&mut sink, handle, author?)? {
                pipeline.tick();
            } else {
                skipped += 1;
            }
        }

        let stats = HarvestStats {
            records_written: sink.rows(),
            handles_skipped: skipped,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            records = stats.records_written,
            skipped = stats.handles_skipped,
            duration_ms = stats.total_duration_ms,
            "Users harvest completed"
        );

        Ok(HarvestResult { path, stats })
    }
}
