use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{params, OptionalExtension, Row};

use crate::asset::{Asset, AssetId};
use crate::error::Result;

/// Narrow read/write access to the asset table.
///
/// Each call is atomic on its own. Keeping the play order of several rows consistent is
/// the caller's job, see [Database::write].
pub trait AssetStore {
    /// All assets, in insertion order.
    fn list(&self) -> Result<Vec<Asset>>;

    fn get(&self, id: &AssetId) -> Result<Option<Asset>>;

    fn insert(&self, asset: &Asset) -> Result<()>;

    /// Overwrite every field of an existing row. Returns false when no row matched.
    fn update(&self, asset: &Asset) -> Result<bool>;

    /// Returns false when no row matched.
    fn delete(&self, id: &AssetId) -> Result<bool>;

    fn set_play_order(&self, id: &AssetId, play_order: u32) -> Result<()>;

    fn names(&self) -> Result<HashSet<String>>;
}

/// The device's asset database.
///
/// A single connection behind a mutex: whoever holds the lock is the only writer, which is
/// what keeps concurrent lifecycle requests from interleaving their ordering updates.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<rusqlite::Connection>>,
}

impl Database {
    pub fn memory() -> Result<Self> {
        // Construct a new SQLite database in-memory.
        let db = rusqlite::Connection::open_in_memory()?;
        setup_connection(&db)?;

        let db = Arc::new(Mutex::new(db));
        Ok(Self { inner: db })
    }

    pub fn file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let db = rusqlite::Connection::open(file)?;
        setup_connection(&db)?;

        let db = Arc::new(Mutex::new(db));
        Ok(Self { inner: db })
    }
}

impl Database {
    /// Run `f` against the store without opening a transaction.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn AssetStore) -> Result<T>,
    {
        let db = self.lock();
        f(&SqliteStore { conn: &db })
    }

    /// Run `f` as the single writer, inside one transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back otherwise (including on
    /// unwind), so a snapshot -> mutate -> persist cycle is never observed half-done.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn AssetStore) -> Result<T>,
    {
        let mut db = self.lock();
        let tx = db.transaction()?;
        let out = f(&SqliteStore { conn: &tx })?;
        tx.commit()?;

        Ok(out)
    }

    fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        // A panicking writer leaves its transaction rolled back, so the connection is
        // still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const COLUMNS: &str = "asset_id, name, uri, md5, start_date, end_date, duration, mimetype, \
     is_enabled, is_processing, nocache, play_order, skip_asset_check";

struct SqliteStore<'c> {
    conn: &'c rusqlite::Connection,
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        asset_id: AssetId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        uri: row.get(2)?,
        md5: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        duration: row.get(6)?,
        mimetype: row.get(7)?,
        is_enabled: row.get(8)?,
        is_processing: row.get(9)?,
        nocache: row.get(10)?,
        play_order: row.get(11)?,
        skip_asset_check: row.get(12)?,
    })
}

impl AssetStore for SqliteStore<'_> {
    fn list(&self) -> Result<Vec<Asset>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {COLUMNS} FROM assets ORDER BY rowid"))?;

        let rows = stmt
            .query_map([], asset_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn get(&self, id: &AssetId) -> Result<Option<Asset>> {
        let asset = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM assets WHERE asset_id = ?1"),
                [id.as_str()],
                asset_from_row,
            )
            .optional()?;

        Ok(asset)
    }

    fn insert(&self, asset: &Asset) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO assets ({COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                asset.asset_id.as_str(),
                asset.name,
                asset.uri,
                asset.md5,
                asset.start_date,
                asset.end_date,
                asset.duration,
                asset.mimetype,
                asset.is_enabled,
                asset.is_processing,
                asset.nocache,
                asset.play_order,
                asset.skip_asset_check,
            ],
        )?;

        Ok(())
    }

    fn update(&self, asset: &Asset) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE assets SET name = ?2, uri = ?3, md5 = ?4, start_date = ?5, end_date = ?6, \
             duration = ?7, mimetype = ?8, is_enabled = ?9, is_processing = ?10, nocache = ?11, \
             play_order = ?12, skip_asset_check = ?13 WHERE asset_id = ?1",
            params![
                asset.asset_id.as_str(),
                asset.name,
                asset.uri,
                asset.md5,
                asset.start_date,
                asset.end_date,
                asset.duration,
                asset.mimetype,
                asset.is_enabled,
                asset.is_processing,
                asset.nocache,
                asset.play_order,
                asset.skip_asset_check,
            ],
        )?;

        Ok(changed > 0)
    }

    fn delete(&self, id: &AssetId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM assets WHERE asset_id = ?1", [id.as_str()])?;

        Ok(changed > 0)
    }

    fn set_play_order(&self, id: &AssetId, play_order: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE assets SET play_order = ?2 WHERE asset_id = ?1",
            params![id.as_str(), play_order],
        )?;

        Ok(())
    }

    fn names(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare_cached("SELECT name FROM assets")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;

        Ok(names)
    }
}

fn setup_connection(db: &rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(
        r#"
            CREATE TABLE IF NOT EXISTS assets (
                asset_id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                uri TEXT NOT NULL,
                md5 TEXT,
                start_date DATETIME NOT NULL,
                end_date DATETIME NOT NULL,
                duration INTEGER NOT NULL DEFAULT 0,
                mimetype TEXT NOT NULL,
                is_enabled INTEGER NOT NULL DEFAULT 0,
                is_processing INTEGER NOT NULL DEFAULT 0,
                nocache INTEGER NOT NULL DEFAULT 0,
                play_order INTEGER NOT NULL DEFAULT 0,
                skip_asset_check INTEGER NOT NULL DEFAULT 0
            )
            "#,
    )
}
