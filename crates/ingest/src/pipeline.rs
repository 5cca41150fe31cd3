//! Batch refresh pipeline: staleness gate, bounded worker pool, per-item
//! scrape, match, classify, append, snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use market_core::config::IngestConfig;
use market_core::{
    CatalogItem, Config, ItemId, NewObservation, RawListing, Result, TimestampUtc,
};
use market_matching::{ListingMatcher, TreatmentClassifier};
use market_store::{CatalogRepo, ObservationRepo, SnapshotRepo};

use crate::snapshot::SnapshotBuilder;
use crate::source::ListingSource;

/// Cooperative stop flag for a pipeline run. Cancelling lets in-flight
/// items finish; queued items are dropped without work.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tally of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub items_total: usize,
    /// Items whose latest snapshot was younger than the staleness cutoff.
    pub items_skipped_fresh: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub items_timed_out: usize,
    pub observations_appended: usize,
    /// Listings the matcher refused for their item.
    pub listings_rejected: usize,
    /// Blank-title or non-positive-price listings.
    pub listings_invalid: usize,
    /// Appended observations no classifier rule labeled.
    pub unclassified_treatments: usize,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct ItemTally {
    appended: usize,
    rejected: usize,
    invalid: usize,
    unclassified: usize,
}

enum TaskOutcome {
    Done(ItemTally),
    Failed,
    TimedOut,
    Cancelled,
}

/// Refreshes stale catalog items from a [`ListingSource`].
#[derive(Clone)]
pub struct IngestPipeline {
    source: Arc<dyn ListingSource>,
    catalog: Arc<dyn CatalogRepo>,
    observations: Arc<dyn ObservationRepo>,
    snapshots: Arc<dyn SnapshotRepo>,
    matcher: ListingMatcher,
    classifier: TreatmentClassifier,
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn ListingSource>,
        catalog: Arc<dyn CatalogRepo>,
        observations: Arc<dyn ObservationRepo>,
        snapshots: Arc<dyn SnapshotRepo>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            catalog,
            observations,
            snapshots,
            matcher: ListingMatcher::new(config.matcher.clone()),
            classifier: TreatmentClassifier::new(),
            config: config.ingest.clone(),
        }
    }

    /// True when the item has no snapshot or its latest one is older than
    /// the configured staleness cutoff.
    pub fn needs_refresh(&self, item_id: ItemId, now: TimestampUtc) -> Result<bool> {
        Ok(match self.snapshots.latest(item_id)? {
            Some(snapshot) => snapshot.is_stale(self.config.snapshot_max_age_hours, now),
            None => true,
        })
    }

    /// Refresh every due item. `force` ignores the staleness gate. Fetch
    /// failures and timeouts mark single items failed; only repository
    /// errors on the catalog itself abort the run.
    pub async fn run(&self, force: bool, cancel: &CancelFlag) -> Result<IngestReport> {
        let now = Utc::now();
        let items = self.catalog.all()?;
        let mut report = IngestReport { items_total: items.len(), ..IngestReport::default() };

        let mut due = Vec::new();
        for item in items {
            if !force && !self.needs_refresh(item.id, now)? {
                report.items_skipped_fresh += 1;
                continue;
            }
            due.push(item);
        }
        if self.config.batch_limit > 0 && due.len() > self.config.batch_limit {
            due.truncate(self.config.batch_limit);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let timeout = Duration::from_secs(self.config.task_timeout_secs);
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        for item in due {
            let worker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return TaskOutcome::Failed,
                };
                if cancel.is_cancelled() {
                    return TaskOutcome::Cancelled;
                }
                match tokio::time::timeout(timeout, worker.refresh_item(&item)).await {
                    Ok(Ok(tally)) => TaskOutcome::Done(tally),
                    Ok(Err(err)) => {
                        warn!(item = %item.name, error = %err, "item refresh failed");
                        TaskOutcome::Failed
                    }
                    Err(_) => {
                        warn!(
                            item = %item.name,
                            timeout_secs = timeout.as_secs(),
                            "item refresh timed out"
                        );
                        TaskOutcome::TimedOut
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Done(tally)) => {
                    report.items_succeeded += 1;
                    report.observations_appended += tally.appended;
                    report.listings_rejected += tally.rejected;
                    report.listings_invalid += tally.invalid;
                    report.unclassified_treatments += tally.unclassified;
                }
                Ok(TaskOutcome::Failed) => report.items_failed += 1,
                Ok(TaskOutcome::TimedOut) => report.items_timed_out += 1,
                Ok(TaskOutcome::Cancelled) => {}
                Err(err) => {
                    warn!(error = %err, "ingest worker panicked");
                    report.items_failed += 1;
                }
            }
        }

        report.cancelled = cancel.is_cancelled();
        info!(
            succeeded = report.items_succeeded,
            failed = report.items_failed,
            timed_out = report.items_timed_out,
            appended = report.observations_appended,
            "ingest run finished"
        );
        Ok(report)
    }

    async fn refresh_item(&self, item: &CatalogItem) -> Result<ItemTally> {
        let query = item.search_query();
        let active = self.source.fetch_active(&query).await?;
        let sold = self.source.fetch_sold(&query).await?;

        let sibling_names: Vec<String> = self
            .catalog
            .siblings(item.id)?
            .into_iter()
            .map(|s| s.name)
            .collect();

        let mut tally = ItemTally::default();
        let mut builder = SnapshotBuilder::new(item.id);
        builder.sold_total_hint(sold.total_hint);
        for listing in active.listings.iter().chain(sold.listings.iter()) {
            self.process_listing(item, listing, &sibling_names, &mut builder, &mut tally);
        }

        self.snapshots.record(builder.build())?;
        info!(
            item = %item.name,
            appended = tally.appended,
            rejected = tally.rejected,
            "item refreshed"
        );
        Ok(tally)
    }

    fn process_listing(
        &self,
        item: &CatalogItem,
        listing: &RawListing,
        sibling_names: &[String],
        builder: &mut SnapshotBuilder,
        tally: &mut ItemTally,
    ) {
        if !listing.is_processable() {
            tally.invalid += 1;
            return;
        }
        if !self.matcher.is_match(&listing.title, &item.name, sibling_names) {
            tally.rejected += 1;
            return;
        }
        builder.add(listing);

        let treatment =
            self.classifier
                .detect_for_platform(&listing.title, item.product, &listing.platform);
        if !treatment.is_classified() {
            tally.unclassified += 1;
        }

        let new = NewObservation {
            item_id: item.id,
            title: listing.title.clone(),
            price: listing.price,
            kind: listing.kind,
            observed_at: listing.timestamp,
            treatment,
            platform: listing.platform.clone(),
            url: listing.url.clone(),
        };
        match self.observations.append(new) {
            Ok(_) => tally.appended += 1,
            Err(err) => {
                warn!(item = %item.name, error = %err, "observation refused");
                tally.invalid += 1;
            }
        }
    }
}
