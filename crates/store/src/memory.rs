//! In-memory implementation of the repository traits, used by tests and
//! single-process runs.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use market_core::{
    CatalogItem, Error, ItemId, NewObservation, Observation, ObservationId, Result, Snapshot,
    Treatment,
};

use crate::{CatalogRepo, ObservationQuery, ObservationRepo, SnapshotRepo};

/// Thread-safe in-memory store backing all three repository traits.
///
/// Writes take the lock per call, so an append is atomic: concurrent
/// readers see either the row or its absence, never a partial record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    items: BTreeMap<ItemId, CatalogItem>,
    observations: Vec<Observation>,
    snapshots: Vec<Snapshot>,
    next_observation_id: ObservationId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a catalog item. Ids must be unique and names non-blank.
    pub fn add_item(&self, item: CatalogItem) -> Result<()> {
        if item.name.trim().is_empty() {
            return Err(Error::catalog(format!("blank name for item {}", item.id)));
        }
        let mut inner = self.write()?;
        if inner.items.contains_key(&item.id) {
            return Err(Error::catalog(format!("duplicate item id {}", item.id)));
        }
        inner.items.insert(item.id, item);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| Error::store("store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| Error::store("store lock poisoned"))
    }
}

impl CatalogRepo for MemoryStore {
    fn get(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn all(&self) -> Result<Vec<CatalogItem>> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn siblings(&self, id: ItemId) -> Result<Vec<CatalogItem>> {
        Ok(self.read()?.items.values().filter(|item| item.id != id).cloned().collect())
    }
}

impl ObservationRepo for MemoryStore {
    fn append(&self, new: NewObservation) -> Result<ObservationId> {
        new.validate()?;
        let mut inner = self.write()?;
        inner.next_observation_id += 1;
        let id = inner.next_observation_id;
        inner.observations.push(new.into_observation(id));
        Ok(id)
    }

    fn query(&self, query: &ObservationQuery) -> Result<Vec<Observation>> {
        let inner = self.read()?;
        let now = Utc::now();
        let mut rows: Vec<Observation> = inner
            .observations
            .iter()
            .filter(|o| query.item_id.map_or(true, |id| o.item_id == id))
            .filter(|o| query.kind.map_or(true, |k| o.kind == k))
            .filter(|o| query.period.contains(o.observed_at, now))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.observed_at.cmp(&b.observed_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn delete(&self, id: ObservationId) -> Result<bool> {
        let mut inner = self.write()?;
        let before = inner.observations.len();
        inner.observations.retain(|o| o.id != id);
        Ok(inner.observations.len() < before)
    }

    fn reassign(&self, id: ObservationId, item_id: ItemId) -> Result<bool> {
        let mut inner = self.write()?;
        if !inner.items.contains_key(&item_id) {
            return Err(Error::catalog(format!("cannot reassign to unknown item {item_id}")));
        }
        match inner.observations.iter_mut().find(|o| o.id == id) {
            Some(o) => {
                o.item_id = item_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn relabel(&self, id: ObservationId, treatment: Treatment) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.observations.iter_mut().find(|o| o.id == id) {
            Some(o) => {
                o.treatment = treatment;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl SnapshotRepo for MemoryStore {
    fn latest(&self, item_id: ItemId) -> Result<Option<Snapshot>> {
        let inner = self.read()?;
        Ok(inner
            .snapshots
            .iter()
            .filter(|s| s.item_id == item_id)
            .max_by_key(|s| s.captured_at)
            .cloned())
    }

    fn record(&self, snapshot: Snapshot) -> Result<()> {
        self.write()?.snapshots.push(snapshot);
        Ok(())
    }
}
