//! Create, update and delete assets while keeping the active sequence contiguous.
//!
//! Every mutation follows the same cycle inside one [Database::write] scope: snapshot the
//! active order, change the row, remove the asset from the snapshot, re-insert it if it
//! is active now, persist. Reachability checks happen before the lock is taken and file
//! removal after it is released.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::asset::{Asset, AssetId};
use crate::clock::{Clock, SystemClock};
use crate::content::ContentChecker;
use crate::db::{AssetStore, Database};
use crate::error::{Error, Result};
use crate::input::{CreateAsset, PatchAsset};
use crate::ordering::{is_contiguous, ActiveOrder};
use crate::playlist::Playlist;
use crate::storage::AssetFiles;

/// An asset as returned to callers: the stored fields plus activity at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetStatus {
    #[serde(flatten)]
    pub asset: Asset,
    pub is_active: bool,
}

impl AssetStatus {
    fn at(asset: Asset, now: DateTime<Utc>) -> Self {
        let is_active = asset.is_active(now);
        Self { asset, is_active }
    }
}

#[derive(Clone)]
pub struct AssetManager {
    db: Database,
    clock: Arc<dyn Clock>,
    checker: Arc<dyn ContentChecker>,
    files: Arc<dyn AssetFiles>,
}

impl AssetManager {
    pub fn new(db: Database, checker: Arc<dyn ContentChecker>, files: Arc<dyn AssetFiles>) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            checker,
            files,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;

        self
    }
}

impl AssetManager {
    pub fn get(&self, id: &AssetId) -> Result<AssetStatus> {
        let now = self.clock.now();
        let asset = self
            .db
            .write(|store| repaired(store, now))?
            .into_iter()
            .find(|a| &a.asset_id == id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        Ok(AssetStatus::at(asset, now))
    }

    /// All assets: active ones first in play order, then the inactive ones.
    pub fn list(&self) -> Result<Vec<AssetStatus>> {
        let now = self.clock.now();
        let assets = self.db.write(|store| repaired(store, now))?;

        Ok(listing(assets, now))
    }

    /// The player's view of the current playlist.
    pub fn playlist(&self) -> Result<Playlist> {
        let now = self.clock.now();
        let assets = self.db.write(|store| repaired(store, now))?;

        Ok(Playlist::build(&assets, now))
    }

    /// Rewrite the active order from scratch if it has drifted.
    pub fn repair(&self) -> Result<()> {
        let now = self.clock.now();
        self.db.write(|store| repaired(store, now).map(|_| ()))
    }

    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create(&self, input: CreateAsset) -> Result<AssetStatus> {
        let asset = input.into_asset(AssetId::generate())?;
        if !asset.skip_asset_check {
            self.ensure_reachable(&asset.uri).await?;
        }

        let now = self.clock.now();
        let asset = self.db.write(|store| {
            let assets = store.list()?;
            let mut order = ActiveOrder::rebuild(&assets, now);

            let mut asset = asset;
            asset.name = unique_name(&store.names()?, asset.name);
            store.insert(&asset)?;

            if asset.is_active(now) {
                order.insert(asset.asset_id.clone(), asset.play_order.into());
            }
            order.persist(store, &assets)?;

            stored(store, &asset.asset_id)
        })?;

        info!(asset_id = %asset.asset_id, play_order = asset.play_order, "created asset");
        Ok(AssetStatus::at(asset, now))
    }

    /// Full update: every field comes from `input`. Without a `play_order` the asset keeps
    /// its stored position.
    #[instrument(skip(self, input))]
    pub async fn replace(&self, id: &AssetId, input: CreateAsset) -> Result<AssetStatus> {
        let existing = self.get(id)?.asset;
        let keep_position = input.play_order.is_none();
        let candidate = input.clone().into_asset(id.clone())?;
        if !candidate.skip_asset_check && candidate.uri != existing.uri {
            self.ensure_reachable(&candidate.uri).await?;
        }

        self.save(id, move |current| {
            let mut asset = input.into_asset(current.asset_id)?;
            if keep_position {
                asset.play_order = current.play_order;
            }
            Ok(asset)
        })
    }

    /// Partial update: absent fields keep their stored value.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &AssetId, patch: PatchAsset) -> Result<AssetStatus> {
        let existing = self.get(id)?.asset;
        let candidate = patch.clone().apply(existing.clone())?;
        if !candidate.skip_asset_check && candidate.uri != existing.uri {
            self.ensure_reachable(&candidate.uri).await?;
        }

        self.save(id, move |current| patch.apply(current))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &AssetId) -> Result<()> {
        let now = self.clock.now();
        let asset = self.db.write(|store| {
            let assets = store.list()?;
            let asset = assets
                .iter()
                .find(|a| &a.asset_id == id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.clone()))?;

            let mut order = ActiveOrder::rebuild(&assets, now);
            order.remove(id);
            store.delete(id)?;
            order.persist(store, &assets)?;

            Ok(asset)
        })?;
        info!("deleted asset");

        // The row is gone either way; a file left behind is only logged.
        if self.files.manages(&asset.uri) {
            if let Err(e) = self.files.remove(&asset.uri).await {
                warn!(error = %e, uri = %asset.uri, "could not remove asset file");
            }
        }

        Ok(())
    }

    /// Set the active order from `ids`. Inactive assets and repeats are skipped, active
    /// assets not named keep their relative order behind the named ones.
    #[instrument(skip_all, fields(requested = ids.len()))]
    pub fn reorder(&self, ids: &[AssetId]) -> Result<Vec<AssetStatus>> {
        let now = self.clock.now();
        let assets = self.db.write(|store| {
            let assets = store.list()?;
            let known: HashSet<&AssetId> = assets.iter().map(|a| &a.asset_id).collect();
            if let Some(unknown) = ids.iter().find(|id| !known.contains(id)) {
                return Err(Error::validation(format!("unknown asset id {unknown}")));
            }

            let mut order = ActiveOrder::rebuild(&assets, now);
            order.arrange(ids);
            order.persist(store, &assets)?;

            store.list()
        })?;

        Ok(listing(assets, now))
    }

    /// The snapshot -> mutate -> remove -> insert -> persist cycle shared by the updates.
    fn save<F>(&self, id: &AssetId, change: F) -> Result<AssetStatus>
    where
        F: FnOnce(Asset) -> Result<Asset>,
    {
        let now = self.clock.now();
        let asset = self.db.write(|store| {
            let assets = store.list()?;
            let current = assets
                .iter()
                .find(|a| &a.asset_id == id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.clone()))?;

            let mut order = ActiveOrder::rebuild(&assets, now);
            let asset = change(current)?;
            store.update(&asset)?;

            order.remove(id);
            if asset.is_active(now) {
                order.insert(id.clone(), asset.play_order.into());
            }
            // Compare against the row just written, its play_order is the unclamped request.
            order.persist(store, &store.list()?)?;

            stored(store, id)
        })?;

        info!(
            asset_id = %asset.asset_id,
            active = asset.is_active(now),
            play_order = asset.play_order,
            "updated asset"
        );
        Ok(AssetStatus::at(asset, now))
    }

    async fn ensure_reachable(&self, uri: &str) -> Result<()> {
        if self.checker.check(uri).await {
            Ok(())
        } else {
            Err(Error::ContentUnreachable(uri.to_string()))
        }
    }
}

fn stored(store: &dyn AssetStore, id: &AssetId) -> Result<Asset> {
    store.get(id)?.ok_or_else(|| Error::NotFound(id.clone()))
}

/// Current assets, with the active order rewritten first if time has broken it.
fn repaired(store: &dyn AssetStore, now: DateTime<Utc>) -> Result<Vec<Asset>> {
    let assets = store.list()?;
    if is_contiguous(&assets, now) {
        return Ok(assets);
    }

    let order = ActiveOrder::rebuild(&assets, now);
    let written = order.persist(store, &assets)?;
    warn!(written, active = order.len(), "repaired inconsistent play order");

    store.list()
}

fn listing(assets: Vec<Asset>, now: DateTime<Utc>) -> Vec<AssetStatus> {
    let mut assets: Vec<AssetStatus> = assets
        .into_iter()
        .map(|a| AssetStatus::at(a, now))
        .collect();
    assets.sort_by_key(|s| (!s.is_active, if s.is_active { s.asset.play_order } else { 0 }));

    assets
}

fn unique_name(names: &HashSet<String>, name: String) -> String {
    if !names.contains(&name) {
        return name;
    }

    let mut suffix = 1;
    loop {
        let candidate = format!("{name}-{suffix}");
        if !names.contains(&candidate) {
            debug!(%name, %candidate, "renamed duplicate asset name");
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::asset::test::now;
    use crate::asset::AssetId;
    use crate::clock::{Clock, ManualClock};
    use crate::content::ContentChecker;
    use crate::db::Database;
    use crate::error::Error;
    use crate::input::{CreateAsset, PatchAsset};
    use crate::lifecycle::{AssetManager, AssetStatus};
    use crate::ordering::is_contiguous;
    use crate::storage::{AssetFiles, FilesError};

    pub(crate) struct FakeChecker {
        pub reachable: AtomicBool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentChecker for FakeChecker {
        async fn check(&self, _uri: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable.load(Ordering::SeqCst)
        }
    }

    pub(crate) struct FakeFiles {
        pub fail: bool,
        pub removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetFiles for FakeFiles {
        fn manages(&self, uri: &str) -> bool {
            uri.starts_with("/assets/")
        }

        async fn remove(&self, uri: &str) -> Result<(), FilesError> {
            if self.fail {
                return Err(FilesError::Io(std::io::ErrorKind::PermissionDenied.into()));
            }
            self.removed.lock().unwrap().push(uri.to_string());
            Ok(())
        }
    }

    pub(crate) struct Harness {
        pub manager: AssetManager,
        pub clock: Arc<ManualClock>,
        pub checker: Arc<FakeChecker>,
        pub files: Arc<FakeFiles>,
        pub db: Database,
    }

    pub(crate) fn harness() -> Harness {
        harness_with(false)
    }

    fn harness_with(failing_files: bool) -> Harness {
        let db = Database::memory().unwrap();
        let clock = Arc::new(ManualClock::new(now()));
        let checker = Arc::new(FakeChecker {
            reachable: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        });
        let files = Arc::new(FakeFiles {
            fail: failing_files,
            removed: Mutex::new(Vec::new()),
        });

        let manager = AssetManager::new(db.clone(), checker.clone(), files.clone())
            .with_clock(clock.clone());

        Harness {
            manager,
            clock,
            checker,
            files,
            db,
        }
    }

    pub(crate) fn create(name: &str, play_order: i64, enabled: bool) -> CreateAsset {
        window(name, play_order, enabled, now() - TimeDelta::days(1), now() + TimeDelta::days(1))
    }

    fn window(
        name: &str,
        play_order: i64,
        enabled: bool,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> CreateAsset {
        CreateAsset {
            name: name.to_string(),
            uri: format!("https://example.com/{name}"),
            mimetype: "web".to_string(),
            start_date,
            end_date,
            is_enabled: enabled,
            md5: None,
            duration: None,
            is_processing: false,
            nocache: false,
            play_order: Some(play_order),
            skip_asset_check: false,
        }
    }

    impl Harness {
        /// Names of the active assets in play order, read straight from storage.
        fn active(&self) -> Vec<String> {
            let now = self.clock.now();
            let mut assets = self.db.read(|store| store.list()).unwrap();
            assert!(is_contiguous(&assets, now), "active order has gaps: {assets:?}");

            assets.retain(|a| a.is_active(now));
            assets.sort_by_key(|a| a.play_order);
            assets.into_iter().map(|a| a.name).collect()
        }

        async fn add(&self, name: &str, play_order: i64, enabled: bool) -> AssetId {
            self.manager
                .create(create(name, play_order, enabled))
                .await
                .unwrap()
                .asset
                .asset_id
        }
    }

    #[tokio::test]
    pub async fn test_create_inserts_at_requested_position() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        h.add("c", 0, true).await;

        assert_eq!(h.active(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    pub async fn test_create_clamps_position() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        h.add("c", 2, true).await;

        let d = h.manager.create(create("d", 50, true)).await.unwrap();
        assert_eq!(d.asset.play_order, 3);
        assert!(d.is_active);
        assert_eq!(h.active(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    pub async fn test_create_unreachable() {
        let h = harness();
        h.checker.reachable.store(false, Ordering::SeqCst);

        let result = h.manager.create(create("a", 0, true)).await;
        assert!(matches!(result, Err(Error::ContentUnreachable(_))));
        assert!(h.manager.list().unwrap().is_empty());

        let mut skipped = create("b", 0, true);
        skipped.skip_asset_check = true;
        h.manager.create(skipped).await.unwrap();
        assert_eq!(h.checker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.active(), vec!["b"]);
    }

    #[tokio::test]
    pub async fn test_create_invalid_stores_nothing() {
        let h = harness();
        let mut input = create("a", 0, true);
        input.end_date = now() - TimeDelta::days(5);

        let result = h.manager.create(input).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(h.checker.calls.load(Ordering::SeqCst), 0);
        assert!(h.manager.list().unwrap().is_empty());
    }

    #[tokio::test]
    pub async fn test_create_inactive_leaves_order() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;

        let c = h.manager.create(create("c", 0, false)).await.unwrap();
        assert!(!c.is_active);
        assert_eq!(h.active(), vec!["a", "b"]);
    }

    #[tokio::test]
    pub async fn test_unique_names() {
        let h = harness();
        h.add("Homepage", 0, true).await;
        h.add("Homepage", 0, true).await;
        h.add("Homepage", 0, true).await;

        let mut names: Vec<_> = h
            .manager
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.asset.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Homepage", "Homepage-1", "Homepage-2"]);
    }

    #[tokio::test]
    pub async fn test_deactivate_shifts_left() {
        let h = harness();
        h.add("a", 0, true).await;
        let b = h.add("b", 1, true).await;
        h.add("c", 2, true).await;
        h.add("d", 3, true).await;

        let patch = PatchAsset {
            is_enabled: Some(false),
            ..Default::default()
        };
        let updated = h.manager.update(&b, patch).await.unwrap();
        assert!(!updated.is_active);
        assert_eq!(h.active(), vec!["a", "c", "d"]);
    }

    #[tokio::test]
    pub async fn test_activate_at_front_shifts_right() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        let c = h.add("c", 5, false).await;

        let patch = PatchAsset {
            is_enabled: Some(true),
            play_order: Some(0),
            ..Default::default()
        };
        let updated = h.manager.update(&c, patch).await.unwrap();
        assert!(updated.is_active);
        assert_eq!(updated.asset.play_order, 0);
        assert_eq!(h.active(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    pub async fn test_move_within_active() {
        let h = harness();
        let a = h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        h.add("c", 2, true).await;

        let patch = PatchAsset {
            play_order: Some(2),
            ..Default::default()
        };
        h.manager.update(&a, patch).await.unwrap();
        assert_eq!(h.active(), vec!["b", "c", "a"]);

        // A patch that does not mention play_order leaves the position alone.
        let patch = PatchAsset {
            name: Some("a2".to_string()),
            ..Default::default()
        };
        h.manager.update(&a, patch).await.unwrap();
        assert_eq!(h.active(), vec!["b", "c", "a2"]);
    }

    #[tokio::test]
    pub async fn test_update_clamps_position_past_end() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        let c = h.add("c", 2, true).await;

        let patch = PatchAsset {
            play_order: Some(50),
            ..Default::default()
        };
        let updated = h.manager.update(&c, patch).await.unwrap();
        assert_eq!(updated.asset.play_order, 2);
        assert_eq!(h.manager.get(&c).unwrap().asset.play_order, 2);
        assert_eq!(h.active(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    pub async fn test_replace_clamps_position_past_end() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        let c = h.add("c", 2, true).await;

        let replaced = h.manager.replace(&c, create("c", 50, true)).await.unwrap();
        assert_eq!(replaced.asset.play_order, 2);
        let stored = h.db.read(|store| store.get(&c)).unwrap().unwrap();
        assert_eq!(stored.play_order, 2);
        assert_eq!(h.active(), vec!["a", "b", "c"]);

        // Moving the first asset past the end lands it last.
        let a = h.manager.list().unwrap()[0].asset.asset_id.clone();
        let replaced = h.manager.replace(&a, create("a", 50, true)).await.unwrap();
        assert_eq!(replaced.asset.play_order, 2);
        assert_eq!(h.active(), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    pub async fn test_update_checks_changed_uri_only() {
        let h = harness();
        let a = h.add("a", 0, true).await;
        assert_eq!(h.checker.calls.load(Ordering::SeqCst), 1);

        h.checker.reachable.store(false, Ordering::SeqCst);
        let patch = PatchAsset {
            duration: Some(30),
            ..Default::default()
        };
        h.manager.update(&a, patch).await.unwrap();
        assert_eq!(h.checker.calls.load(Ordering::SeqCst), 1);

        let patch = PatchAsset {
            uri: Some("https://example.com/elsewhere".to_string()),
            ..Default::default()
        };
        let result = h.manager.update(&a, patch).await;
        assert!(matches!(result, Err(Error::ContentUnreachable(_))));
        assert_eq!(h.manager.get(&a).unwrap().asset.uri, "https://example.com/a");
    }

    #[tokio::test]
    pub async fn test_replace() {
        let h = harness();
        h.add("a", 0, true).await;
        let b = h.add("b", 1, true).await;
        h.add("c", 2, true).await;

        let mut input = create("b", 0, true);
        input.play_order = None;
        input.duration = Some(42);
        let replaced = h.manager.replace(&b, input).await.unwrap();
        assert_eq!(replaced.asset.duration, 42);
        assert_eq!(replaced.asset.asset_id, b);
        assert_eq!(h.active(), vec!["a", "b", "c"]);

        let input = create("b", 0, true);
        h.manager.replace(&b, input).await.unwrap();
        assert_eq!(h.active(), vec!["b", "a", "c"]);

        let input = create("b", 0, false);
        h.manager.replace(&b, input).await.unwrap();
        assert_eq!(h.active(), vec!["a", "c"]);
    }

    #[tokio::test]
    pub async fn test_missing_asset() {
        let h = harness();
        let missing = AssetId::from("missing");

        assert!(matches!(h.manager.get(&missing), Err(Error::NotFound(_))));
        assert!(matches!(
            h.manager.update(&missing, PatchAsset::default()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            h.manager.replace(&missing, create("x", 0, true)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            h.manager.delete(&missing).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    pub async fn test_delete_inactive_keeps_order() {
        let h = harness();
        h.add("a", 0, true).await;
        let b = h.add("b", 0, false).await;
        h.add("c", 1, true).await;
        let before = h.active();

        h.manager.delete(&b).await.unwrap();
        assert_eq!(h.active(), before);
    }

    #[tokio::test]
    pub async fn test_delete_twice() {
        let h = harness();
        let a = h.add("a", 0, true).await;
        h.add("b", 1, true).await;

        h.manager.delete(&a).await.unwrap();
        assert!(matches!(h.manager.delete(&a).await, Err(Error::NotFound(_))));
        assert_eq!(h.active(), vec!["b"]);
    }

    #[tokio::test]
    pub async fn test_delete_then_create_scenario() {
        let h = harness();
        let a = h.add("A", 0, true).await;
        h.add("B", 1, true).await;
        h.add("C", 0, false).await;

        h.manager.delete(&a).await.unwrap();
        assert_eq!(h.active(), vec!["B"]);

        h.add("D", 0, true).await;
        assert_eq!(h.active(), vec!["D", "B"]);
    }

    #[tokio::test]
    pub async fn test_delete_removes_managed_file() {
        let h = harness();
        let mut local = create("clip", 0, true);
        local.uri = "/assets/clip.mp4".to_string();
        local.skip_asset_check = true;
        let clip = h.manager.create(local).await.unwrap().asset.asset_id;
        let web = h.add("web", 1, true).await;

        h.manager.delete(&clip).await.unwrap();
        h.manager.delete(&web).await.unwrap();
        assert_eq!(*h.files.removed.lock().unwrap(), vec!["/assets/clip.mp4"]);
    }

    #[tokio::test]
    pub async fn test_delete_survives_file_failure() {
        let h = harness_with(true);
        let mut local = create("clip", 0, true);
        local.uri = "/assets/clip.mp4".to_string();
        local.skip_asset_check = true;
        let clip = h.manager.create(local).await.unwrap().asset.asset_id;

        h.manager.delete(&clip).await.unwrap();
        assert!(matches!(h.manager.get(&clip), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    pub async fn test_time_boundaries() {
        let h = harness();

        let starts_now = window("starts", 0, true, now(), now() + TimeDelta::hours(1));
        let starts = h.manager.create(starts_now).await.unwrap();
        assert!(starts.is_active);

        let ends_now = window("ends", 0, true, now() - TimeDelta::hours(1), now());
        let ends = h.manager.create(ends_now).await.unwrap();
        assert!(!ends.is_active);

        assert_eq!(h.active(), vec!["starts"]);

        h.clock.advance(TimeDelta::hours(1));
        assert!(!h.manager.get(&starts.asset.asset_id).unwrap().is_active);
        assert!(h.active().is_empty());
    }

    #[tokio::test]
    pub async fn test_list_repairs_drift() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        let later = window("later", 0, true, now() + TimeDelta::hours(1), now() + TimeDelta::days(1));
        h.manager.create(later).await.unwrap();

        h.clock.advance(TimeDelta::hours(1));
        let stored = h.db.read(|store| store.list()).unwrap();
        assert!(!is_contiguous(&stored, h.clock.now()));

        let listed: Vec<_> = h
            .manager
            .list()
            .unwrap()
            .into_iter()
            .map(|s: AssetStatus| (s.asset.name, s.asset.play_order, s.is_active))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("a".to_string(), 0, true),
                ("later".to_string(), 1, true),
                ("b".to_string(), 2, true),
            ]
        );
        assert_eq!(h.active(), vec!["a", "later", "b"]);
    }

    #[tokio::test]
    pub async fn test_get_repairs_drift() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 1, true).await;
        let later = window("later", 0, true, now() + TimeDelta::hours(1), now() + TimeDelta::days(1));
        let later = h.manager.create(later).await.unwrap().asset.asset_id;

        h.clock.advance(TimeDelta::hours(1));
        let fetched = h.manager.get(&later).unwrap();
        assert!(fetched.is_active);
        assert_eq!(fetched.asset.play_order, 1);
        assert_eq!(h.active(), vec!["a", "later", "b"]);
    }

    #[tokio::test]
    pub async fn test_list_puts_inactive_last() {
        let h = harness();
        h.add("off", 0, false).await;
        h.add("b", 0, true).await;
        h.add("a", 0, true).await;

        let listed: Vec<_> = h
            .manager
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.asset.name)
            .collect();
        assert_eq!(listed, vec!["a", "b", "off"]);
    }

    #[tokio::test]
    pub async fn test_reorder() {
        let h = harness();
        let a = h.add("a", 0, true).await;
        let b = h.add("b", 1, true).await;
        let c = h.add("c", 2, true).await;
        let off = h.add("off", 0, false).await;

        let listed = h.manager.reorder(&[c.clone(), off.clone(), a.clone()]).unwrap();
        assert_eq!(h.active(), vec!["c", "a", "b"]);
        assert_eq!(listed.len(), 4);
        assert!(!listed[3].is_active);

        let result = h.manager.reorder(&[b.clone(), AssetId::from("nope")]);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(h.active(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    pub async fn test_playlist() {
        let h = harness();
        h.add("a", 0, true).await;
        h.add("b", 0, true).await;
        let later = window("later", 0, true, now() + TimeDelta::hours(3), now() + TimeDelta::days(1));
        h.manager.create(later).await.unwrap();

        let playlist = h.manager.playlist().unwrap();
        let names: Vec<_> = playlist.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(playlist.deadline, Some(now() + TimeDelta::hours(3)));
    }

    #[tokio::test]
    pub async fn test_concurrent_creates_stay_contiguous() {
        let h = harness();
        let mut tasks = Vec::new();
        for i in 0..16 {
            let manager = h.manager.clone();
            tasks.push(tokio::spawn(async move {
                manager.create(create(&format!("a{i}"), i % 3, true)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.active().len(), 16);
    }

    #[tokio::test]
    pub async fn test_random_operations_keep_order_contiguous() {
        for seed in [0x5eed, 1, 7, 42, 1234] {
            random_operations(seed).await;
        }
    }

    async fn random_operations(seed: u64) {
        let h = harness();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ids: Vec<AssetId> = Vec::new();

        for step in 0..300 {
            match rng.gen_range(0..6) {
                0 | 1 => {
                    let start = now() + TimeDelta::minutes(rng.gen_range(-120..120));
                    let end = start + TimeDelta::minutes(rng.gen_range(1..240));
                    let input = window(
                        &format!("asset{step}"),
                        rng.gen_range(-2..12),
                        rng.gen_bool(0.8),
                        start,
                        end,
                    );
                    ids.push(h.manager.create(input).await.unwrap().asset.asset_id);
                }
                2 if !ids.is_empty() => {
                    let id = ids[rng.gen_range(0..ids.len())].clone();
                    let patch = PatchAsset {
                        is_enabled: Some(rng.gen_bool(0.7)),
                        play_order: rng.gen_bool(0.5).then(|| rng.gen_range(-1..60)),
                        ..Default::default()
                    };
                    let updated = h.manager.update(&id, patch).await.unwrap();
                    if updated.is_active {
                        assert!((updated.asset.play_order as usize) < h.active().len());
                    }
                }
                3 if !ids.is_empty() => {
                    let id = ids.swap_remove(rng.gen_range(0..ids.len()));
                    h.manager.delete(&id).await.unwrap();
                    assert!(matches!(h.manager.delete(&id).await, Err(Error::NotFound(_))));
                }
                4 => {
                    h.clock.advance(TimeDelta::minutes(rng.gen_range(1..30)));
                    // Time alone may break contiguity, the next access repairs it.
                    h.manager.list().unwrap();
                }
                _ if !ids.is_empty() => {
                    let mut requested = ids.clone();
                    requested.truncate(rng.gen_range(0..=ids.len()));
                    h.manager.reorder(&requested).unwrap();
                }
                _ => continue,
            }

            h.active();
        }
    }
}
