// 🗄️ Item Store Adapter - SQLite-backed document store
//
// Wraps the persistent collections behind ItemStore / SellerStore traits so
// the view engine, aggregator, and workflows never touch SQL directly.
// Change notifications are push-based: after every committed write the store
// hands each subscriber the full current snapshot (no incremental diffing).

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::auth::SellerAccount;
use crate::items::{DropItem, ItemStatus, NewItem};

/// Backend batch-write limit: one committed batch may carry at most this
/// many operations.
pub const MAX_BATCH_OPS: usize = 250;

// ============================================================================
// PATCH & BATCH TYPES
// ============================================================================

/// Partial field merge for update-by-id. `None` leaves the field untouched;
/// `claimed_at` uses a nested Option so `Some(None)` can clear the timestamp.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub item_name: Option<String>,
    pub buyer_name: Option<String>,
    pub price: Option<String>,
    pub transfer_fee: Option<String>,
    pub location: Option<String>,
    pub is_paid_externally: Option<bool>,
    pub status: Option<ItemStatus>,
    pub claimed_at: Option<Option<DateTime<Utc>>>,
}

impl ItemPatch {
    /// Patch that only rewrites the status (used by batched cash-out)
    pub fn status_only(status: ItemStatus) -> Self {
        ItemPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply this patch to an item in memory
    pub fn apply_to(&self, item: &mut DropItem) {
        if let Some(v) = &self.item_name {
            item.item_name = v.clone();
        }
        if let Some(v) = &self.buyer_name {
            item.buyer_name = v.clone();
        }
        if let Some(v) = &self.price {
            item.price = v.clone();
        }
        if let Some(v) = &self.transfer_fee {
            item.transfer_fee = v.clone();
        }
        if let Some(v) = &self.location {
            item.location = v.clone();
        }
        if let Some(v) = self.is_paid_externally {
            item.is_paid_externally = v;
        }
        if let Some(v) = self.status {
            item.status = v;
        }
        if let Some(v) = self.claimed_at {
            item.claimed_at = v;
        }
    }
}

/// One operation inside a batched write
#[derive(Debug, Clone)]
pub enum BatchOp {
    Update { id: String, patch: ItemPatch },
    Delete { id: String },
}

/// Snapshot subscriber: receives the full current item collection after
/// every committed mutation.
pub type SnapshotListener = Box<dyn Fn(&[DropItem]) + Send>;

// ============================================================================
// STORE TRAITS
// ============================================================================

/// Persistent collection of drop items
pub trait ItemStore {
    /// Create with generated id and server-assigned created_at
    fn create_item(&self, new_item: &NewItem) -> Result<DropItem>;

    /// Partial field merge by id; fails if the item does not exist
    fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<()>;

    fn delete_item(&self, id: &str) -> Result<()>;

    fn get_item(&self, id: &str) -> Result<Option<DropItem>>;

    /// Full current snapshot, newest first
    fn all_items(&self) -> Result<Vec<DropItem>>;

    /// Atomic batched write: all ops commit or none do. Rejected before any
    /// mutation when ops.len() > MAX_BATCH_OPS.
    fn commit_batch(&self, ops: &[BatchOp]) -> Result<()>;

    fn subscribe(&self, listener: SnapshotListener);
}

/// Persistent collection of seller accounts
pub trait SellerStore {
    fn create_seller(&self, account: &SellerAccount) -> Result<()>;
    fn get_seller(&self, id: &str) -> Result<Option<SellerAccount>>;
    fn update_password(&self, id: &str, password_digest: &str) -> Result<()>;
    fn delete_seller(&self, id: &str) -> Result<()>;
    /// All accounts, sorted by display name
    fn all_sellers(&self) -> Result<Vec<SellerAccount>>;
}

// ============================================================================
// STATUS CHANGE (single-item admin action)
// ============================================================================

/// Validated single-item status change. Stamps claimed_at when entering
/// Claimed and clears it on revert to Dropped.
pub fn apply_status_change(store: &dyn ItemStore, id: &str, next: ItemStatus) -> Result<()> {
    let item = store
        .get_item(id)?
        .ok_or_else(|| anyhow!("Item not found: {}", id))?;

    if !item.status.can_transition_to(next) {
        bail!(
            "Invalid status change for {}: {} -> {}",
            id,
            item.status,
            next
        );
    }

    let mut patch = ItemPatch::status_only(next);
    match next {
        ItemStatus::Claimed => patch.claimed_at = Some(Some(Utc::now())),
        ItemStatus::Dropped => patch.claimed_at = Some(None),
        _ => {}
    }

    store.update_item(id, &patch)
}

// ============================================================================
// AUDIT EVENT
// ============================================================================

/// Audit trail entry: every store mutation is an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(event_type: &str, entity_id: &str, data: serde_json::Value, actor: &str) -> Self {
        Event {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// SQLite-backed implementation of both stores.
///
/// The connection is shared behind Arc<Mutex<..>> so the CLI, the server
/// binary, and subscribers can hold the same store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    listeners: Arc<Mutex<Vec<SnapshotListener>>>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory store for tests and demos
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
            listeners: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Audit trail, newest first
    pub fn events(&self) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_id, data, actor
             FROM events ORDER BY timestamp DESC, id DESC",
        )?;

        let events = stmt
            .query_map([], |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(4)?;
                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    entity_id: row.get(3)?,
                    data: serde_json::from_str(&data_json)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    actor: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn record_event(conn: &Connection, event: &Event) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;
        conn.execute(
            "INSERT INTO events (event_id, timestamp, event_type, entity_id, data, actor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;
        Ok(())
    }

    fn notify(&self) {
        let snapshot = match self.all_items() {
            Ok(snapshot) => snapshot,
            Err(_) => return,
        };
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(&snapshot);
        }
    }
}

impl ItemStore for SqliteStore {
    fn create_item(&self, new_item: &NewItem) -> Result<DropItem> {
        let item = DropItem {
            id: uuid::Uuid::new_v4().to_string(),
            item_name: new_item.item_name.clone(),
            buyer_name: new_item.buyer_name.clone(),
            seller_name: new_item.seller_name.clone(),
            location: new_item.location.clone(),
            price: new_item.price.clone(),
            transfer_fee: new_item.transfer_fee.clone(),
            status: ItemStatus::Dropped,
            is_paid_externally: false,
            created_at: Utc::now(),
            claimed_at: None,
        };

        {
            let conn = self.conn.lock().unwrap();
            insert_item(&conn, &item)?;
            Self::record_event(
                &conn,
                &Event::new(
                    "item_created",
                    &item.id,
                    serde_json::json!({
                        "item_name": item.item_name,
                        "seller_name": item.seller_name,
                    }),
                    "store",
                ),
            )?;
        }

        self.notify();
        Ok(item)
    }

    fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<()> {
        {
            let conn = self.conn.lock().unwrap();
            let mut item =
                load_item(&conn, id)?.ok_or_else(|| anyhow!("Item not found: {}", id))?;
            patch.apply_to(&mut item);
            write_item(&conn, &item)?;
            Self::record_event(
                &conn,
                &Event::new(
                    "item_updated",
                    id,
                    serde_json::json!({ "status": item.status.as_str() }),
                    "store",
                ),
            )?;
        }

        self.notify();
        Ok(())
    }

    fn delete_item(&self, id: &str) -> Result<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM dropping_items WHERE id = ?1", params![id])?;
            Self::record_event(
                &conn,
                &Event::new("item_deleted", id, serde_json::json!({}), "store"),
            )?;
        }

        self.notify();
        Ok(())
    }

    fn get_item(&self, id: &str) -> Result<Option<DropItem>> {
        let conn = self.conn.lock().unwrap();
        load_item(&conn, id)
    }

    fn all_items(&self) -> Result<Vec<DropItem>> {
        let conn = self.conn.lock().unwrap();
        load_items(&conn)
    }

    fn commit_batch(&self, ops: &[BatchOp]) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        if ops.len() > MAX_BATCH_OPS {
            bail!(
                "Batch too large: {} operations (limit {})",
                ops.len(),
                MAX_BATCH_OPS
            );
        }

        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let mut updates = 0usize;
            let mut deletes = 0usize;

            for op in ops {
                match op {
                    BatchOp::Update { id, patch } => {
                        let mut item = load_item(&tx, id)?
                            .ok_or_else(|| anyhow!("Item not found in batch: {}", id))?;
                        patch.apply_to(&mut item);
                        write_item(&tx, &item)?;
                        updates += 1;
                    }
                    BatchOp::Delete { id } => {
                        tx.execute("DELETE FROM dropping_items WHERE id = ?1", params![id])?;
                        deletes += 1;
                    }
                }
            }

            Self::record_event(
                &tx,
                &Event::new(
                    "batch_committed",
                    "",
                    serde_json::json!({ "updates": updates, "deletes": deletes }),
                    "store",
                ),
            )?;

            tx.commit()?;
        }

        self.notify();
        Ok(())
    }

    fn subscribe(&self, listener: SnapshotListener) {
        self.listeners.lock().unwrap().push(listener);
    }
}

impl SellerStore for SqliteStore {
    fn create_seller(&self, account: &SellerAccount) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sellers (id, display_name, password_digest, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.id,
                account.display_name,
                account.password_digest,
                account.role,
                account.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_seller(&self, id: &str) -> Result<Option<SellerAccount>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, display_name, password_digest, role, created_at
             FROM sellers WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_seller)?;
        match rows.next() {
            Some(account) => Ok(Some(account?)),
            None => Ok(None),
        }
    }

    fn update_password(&self, id: &str, password_digest: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE sellers SET password_digest = ?1 WHERE id = ?2",
            params![password_digest, id],
        )?;
        if changed == 0 {
            bail!("Seller not found: {}", id);
        }
        Ok(())
    }

    fn delete_seller(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sellers WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn all_sellers(&self) -> Result<Vec<SellerAccount>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, display_name, password_digest, role, created_at
             FROM sellers ORDER BY display_name COLLATE NOCASE",
        )?;
        let sellers = stmt
            .query_map([], row_to_seller)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sellers)
    }
}

// ============================================================================
// SCHEMA & ROW MAPPING
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (no-op for in-memory connections)
    let _ = conn.pragma_update(None, "journal_mode", "WAL");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS dropping_items (
            id TEXT PRIMARY KEY,
            item_name TEXT NOT NULL,
            buyer_name TEXT NOT NULL,
            seller_name TEXT NOT NULL,
            location TEXT NOT NULL,
            price TEXT NOT NULL,
            transfer_fee TEXT NOT NULL,
            status TEXT NOT NULL,
            is_paid_externally INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            claimed_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sellers (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            password_digest TEXT NOT NULL,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_status ON dropping_items(status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_seller ON dropping_items(seller_name)",
        [],
    )?;

    Ok(())
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<DropItem> {
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;
    let claimed_at_str: Option<String> = row.get(10)?;

    let claimed_at = match claimed_at_str {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(&s)
                .map_err(|_| rusqlite::Error::InvalidQuery)?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(DropItem {
        id: row.get(0)?,
        item_name: row.get(1)?,
        buyer_name: row.get(2)?,
        seller_name: row.get(3)?,
        location: row.get(4)?,
        price: row.get(5)?,
        transfer_fee: row.get(6)?,
        status: ItemStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
        is_paid_externally: row.get::<_, i64>(8)? != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
        claimed_at,
    })
}

fn row_to_seller(row: &rusqlite::Row<'_>) -> rusqlite::Result<SellerAccount> {
    let created_at_str: String = row.get(4)?;
    Ok(SellerAccount {
        id: row.get(0)?,
        display_name: row.get(1)?,
        password_digest: row.get(2)?,
        role: row.get(3)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| rusqlite::Error::InvalidQuery)?
            .with_timezone(&Utc),
    })
}

const ITEM_COLUMNS: &str = "id, item_name, buyer_name, seller_name, location, price,
                            transfer_fee, status, is_paid_externally, created_at, claimed_at";

fn load_items(conn: &Connection) -> Result<Vec<DropItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM dropping_items ORDER BY created_at DESC",
        ITEM_COLUMNS
    ))?;
    let items = stmt
        .query_map([], row_to_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn load_item(conn: &Connection, id: &str) -> Result<Option<DropItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM dropping_items WHERE id = ?1",
        ITEM_COLUMNS
    ))?;
    let mut rows = stmt.query_map(params![id], row_to_item)?;
    match rows.next() {
        Some(item) => Ok(Some(item?)),
        None => Ok(None),
    }
}

fn insert_item(conn: &Connection, item: &DropItem) -> Result<()> {
    conn.execute(
        "INSERT INTO dropping_items (
            id, item_name, buyer_name, seller_name, location, price,
            transfer_fee, status, is_paid_externally, created_at, claimed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            item.id,
            item.item_name,
            item.buyer_name,
            item.seller_name,
            item.location,
            item.price,
            item.transfer_fee,
            item.status.as_str(),
            item.is_paid_externally as i64,
            item.created_at.to_rfc3339(),
            item.claimed_at.map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn write_item(conn: &Connection, item: &DropItem) -> Result<()> {
    conn.execute(
        "UPDATE dropping_items SET
            item_name = ?2, buyer_name = ?3, seller_name = ?4, location = ?5,
            price = ?6, transfer_fee = ?7, status = ?8, is_paid_externally = ?9,
            claimed_at = ?10
         WHERE id = ?1",
        params![
            item.id,
            item.item_name,
            item.buyer_name,
            item.seller_name,
            item.location,
            item.price,
            item.transfer_fee,
            item.status.as_str(),
            item.is_paid_externally as i64,
            item.claimed_at.map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
