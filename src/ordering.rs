//! The active sequence: play order restricted to the assets that are active right now.
//!
//! Only active assets carry a meaningful `play_order`, and among them the values are
//! always `0..N-1`. Every lifecycle operation rebuilds the sequence from the store,
//! edits it in memory and writes it back, all inside one [Database::write] scope.
//!
//! [Database::write]: crate::db::Database::write

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::asset::{Asset, AssetId};
use crate::db::AssetStore;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveOrder {
    ids: Vec<AssetId>,
}

impl ActiveOrder {
    /// The canonical sequence for `now`: active assets, stable-sorted by their stored
    /// `play_order`. Ties keep the order of `assets`.
    pub fn rebuild(assets: &[Asset], now: DateTime<Utc>) -> Self {
        let mut active: Vec<&Asset> = assets.iter().filter(|a| a.is_active(now)).collect();
        active.sort_by_key(|a| a.play_order);

        Self {
            ids: active.into_iter().map(|a| a.asset_id.clone()).collect(),
        }
    }

    /// Insert at `position`, clamped into `[0, len]`. Later entries shift right.
    pub fn insert(&mut self, id: AssetId, position: i64) -> usize {
        self.remove(&id);

        let position = position.clamp(0, self.ids.len() as i64) as usize;
        self.ids.insert(position, id);

        position
    }

    /// Remove `id` if present. Later entries shift left.
    pub fn remove(&mut self, id: &AssetId) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.ids.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Move the named ids to the front, in the given order. Ids not in the sequence and
    /// repeats are skipped; the rest keep their relative order behind them.
    pub fn arrange(&mut self, requested: &[AssetId]) {
        let present: HashSet<&AssetId> = self.ids.iter().collect();
        let mut seen = HashSet::new();

        let mut ids: Vec<AssetId> = requested
            .iter()
            .filter(|id| present.contains(id) && seen.insert(*id))
            .cloned()
            .collect();
        ids.extend(self.ids.iter().filter(|id| !seen.contains(id)).cloned());

        self.ids = ids;
    }

    /// Write `play_order = index` for every id. Rows whose stored value in `stored` already
    /// matches are skipped, and assets outside the sequence are left alone.
    pub fn persist(&self, store: &dyn AssetStore, stored: &[Asset]) -> Result<usize> {
        let current: HashMap<&AssetId, u32> = stored
            .iter()
            .map(|a| (&a.asset_id, a.play_order))
            .collect();

        let mut written = 0;
        for (idx, id) in self.ids.iter().enumerate() {
            let idx = idx as u32;
            if current.get(id) != Some(&idx) {
                store.set_play_order(id, idx)?;
                written += 1;
            }
        }

        debug!(written, active = self.ids.len(), "persisted active order");
        Ok(written)
    }

    pub fn position(&self, id: &AssetId) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    pub fn ids(&self) -> &[AssetId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Whether the stored `play_order` of the assets active at `now` is exactly `0..N-1`.
///
/// Time alone can break this: an asset whose window opens keeps whatever stale position
/// it had when it was last active.
pub fn is_contiguous(assets: &[Asset], now: DateTime<Utc>) -> bool {
    let mut orders: Vec<u32> = assets
        .iter()
        .filter(|a| a.is_active(now))
        .map(|a| a.play_order)
        .collect();
    orders.sort_unstable();

    orders.iter().enumerate().all(|(idx, order)| *order == idx as u32)
}
