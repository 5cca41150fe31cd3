//! Repository seams for the listing-market engine.
//!
//! Persistence is a collaborator, not a concern of this workspace: the
//! engine code talks to these traits and never to a concrete database.
//! [`memory::MemoryStore`] implements all three for tests and small runs.

use serde::{Deserialize, Serialize};

use market_core::{
    CatalogItem, ItemId, ListingKind, NewObservation, Observation, ObservationId, Period, Result,
    Snapshot, Treatment,
};

pub mod memory;

pub use memory::MemoryStore;

/// Filter for observation reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationQuery {
    /// Restrict to one item; `None` spans the whole catalog.
    pub item_id: Option<ItemId>,
    pub period: Period,
    /// Restrict to one listing kind; `None` includes all kinds.
    pub kind: Option<ListingKind>,
}

impl ObservationQuery {
    /// Everything ever stored.
    pub fn all() -> Self {
        Self { item_id: None, period: Period::All, kind: None }
    }

    /// Every kind for one item within a period.
    pub fn for_item(item_id: ItemId, period: Period) -> Self {
        Self { item_id: Some(item_id), period, kind: None }
    }

    /// Sold observations for one item within a period.
    pub fn sold(item_id: ItemId, period: Period) -> Self {
        Self { item_id: Some(item_id), period, kind: Some(ListingKind::Sold) }
    }

    /// Sold observations across the whole catalog within a period.
    pub fn sold_anywhere(period: Period) -> Self {
        Self { item_id: None, period, kind: Some(ListingKind::Sold) }
    }
}

/// Read access to the tracked catalog.
pub trait CatalogRepo: Send + Sync {
    fn get(&self, id: ItemId) -> Result<Option<CatalogItem>>;

    fn all(&self) -> Result<Vec<CatalogItem>>;

    /// Every catalog item other than `id`, for matcher disambiguation.
    fn siblings(&self, id: ItemId) -> Result<Vec<CatalogItem>>;
}

/// Append-dominant store of listing observations.
///
/// `delete`, `reassign`, and `relabel` exist solely for the audit and
/// relabel maintenance passes; nothing else mutates stored rows.
pub trait ObservationRepo: Send + Sync {
    /// Validates and stores an observation, returning its assigned id.
    fn append(&self, new: NewObservation) -> Result<ObservationId>;

    /// Matching observations sorted ascending by observation timestamp.
    fn query(&self, query: &ObservationQuery) -> Result<Vec<Observation>>;

    /// Returns whether the observation existed.
    fn delete(&self, id: ObservationId) -> Result<bool>;

    /// Re-point an observation at another catalog item.
    fn reassign(&self, id: ObservationId, item_id: ItemId) -> Result<bool>;

    /// Replace the stored treatment label.
    fn relabel(&self, id: ObservationId, treatment: Treatment) -> Result<bool>;
}

/// Store of per-scrape market snapshots.
pub trait SnapshotRepo: Send + Sync {
    /// Most recent snapshot for an item, by capture timestamp.
    fn latest(&self, item_id: ItemId) -> Result<Option<Snapshot>>;

    fn record(&self, snapshot: Snapshot) -> Result<()>;
}
