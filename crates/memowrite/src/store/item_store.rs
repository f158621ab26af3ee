//! SQLite-backed item store
//!
//! Every mutation commits immediately. Review updates run inside an
//! IMMEDIATE transaction that re-reads the item's current state, so reviews
//! from separate handles or separate processes are serialized by SQLite's
//! write lock and never overwrite each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};
use uuid::Uuid;

use super::Store;
use super::types::{Item, ItemRecord, ProgressStats, ReviewRecord};
use crate::error::{MemoWriteError, Result};
use crate::scheduler::{MemoryState, Quality, Scheduler};

const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    id               TEXT NOT NULL UNIQUE,
    question         TEXT NOT NULL,
    reference_answer TEXT NOT NULL,
    source           TEXT,
    created_at       TEXT NOT NULL,
    repetitions      INTEGER NOT NULL,
    ease_factor      REAL NOT NULL,
    interval_days    INTEGER NOT NULL,
    due_at           TEXT,
    last_reviewed_at TEXT,
    total_attempts   INTEGER NOT NULL,
    total_correct    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_due ON items (due_at, ease_factor, seq);

CREATE TABLE IF NOT EXISTS reviews (
    review_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id          TEXT NOT NULL REFERENCES items (id) ON DELETE CASCADE,
    quality          INTEGER NOT NULL,
    score            REAL,
    user_answer      TEXT,
    feedback         TEXT,
    missing_concepts TEXT NOT NULL,
    interval_days    INTEGER NOT NULL,
    ease_factor      REAL NOT NULL,
    reviewed_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_item ON reviews (item_id, review_id);
";

const ITEM_COLUMNS: &str = "seq, id, question, reference_answer, source, created_at, \
     repetitions, ease_factor, interval_days, due_at, last_reviewed_at, \
     total_attempts, total_correct";

// NULL sorts first, which puts never-reviewed items ahead
const DUE_ORDER: &str = "ORDER BY due_at, ease_factor, seq";

/// Item store over a single SQLite connection
#[derive(Debug)]
pub struct ItemStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ItemStore {
    /// Store that lives only in memory
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::migrate(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Open a store file, creating it and its directory if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MemoWriteError::Storage(format!(
                        "Failed to create data directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let storage_err = |e: MemoWriteError| {
            MemoWriteError::Storage(format!("Failed to open store {}: {}", path.display(), e))
        };

        let mut conn = Connection::open(path).map_err(|e| storage_err(e.into()))?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| storage_err(e.into()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| storage_err(e.into()))?;
        Self::migrate(&mut conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        info!("Opened store at {} with {} items", path.display(), store.len()?);
        Ok(store)
    }

    /// Create the schema on a fresh database and reject unknown versions
    fn migrate(conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version: i32 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        match version {
            0 => {
                tx.execute_batch(SCHEMA)?;
                tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
                debug!("Created store schema version {}", SCHEMA_VERSION);
            }
            SCHEMA_VERSION => {}
            other => {
                return Err(MemoWriteError::Storage(format!(
                    "Unsupported store version {} (expected {})",
                    other, SCHEMA_VERSION
                )));
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MemoWriteError::Storage("Store connection lock poisoned".to_string()))
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert a new item with its initial memory state
    pub fn add_item(&self, item: Item, state: MemoryState) -> Result<Uuid> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO items (id, question, reference_answer, source, created_at, \
             repetitions, ease_factor, interval_days, due_at, last_reviewed_at, \
             total_attempts, total_correct) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                item.id.to_string(),
                item.question,
                item.reference_answer,
                item.source,
                format_timestamp(item.created_at),
                state.repetitions,
                state.ease_factor,
                state.interval_days,
                state.due_at.map(format_timestamp),
                state.last_reviewed_at.map(format_timestamp),
                state.total_attempts,
                state.total_correct,
            ],
        )?;
        debug!("Added item {}", item.id);
        Ok(item.id)
    }

    /// Full record for an item
    pub fn get(&self, id: Uuid) -> Result<ItemRecord> {
        let conn = self.conn()?;
        let (seq, item, state) = read_item(&conn, id)?.ok_or(MemoWriteError::NotFound(id))?;
        let history = read_history(&conn, id)?;
        Ok(ItemRecord {
            seq,
            item,
            state,
            history,
        })
    }

    pub fn get_item(&self, id: Uuid) -> Result<Item> {
        let conn = self.conn()?;
        read_item(&conn, id)?
            .map(|(_, item, _)| item)
            .ok_or(MemoWriteError::NotFound(id))
    }

    /// Review history, oldest first
    pub fn history(&self, id: Uuid) -> Result<Vec<ReviewRecord>> {
        let conn = self.conn()?;
        if read_item(&conn, id)?.is_none() {
            return Err(MemoWriteError::NotFound(id));
        }
        read_history(&conn, id)
    }

    /// All records in insertion order
    pub fn list_items(&self) -> Result<Vec<ItemRecord>> {
        let conn = self.conn()?;
        let rows = query_items(&conn, &format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY seq"))?;

        rows.into_iter()
            .map(|(seq, item, state)| -> Result<ItemRecord> {
                let history = read_history(&conn, item.id)?;
                Ok(ItemRecord {
                    seq,
                    item,
                    state,
                    history,
                })
            })
            .collect()
    }

    /// Replace the question and reference answer of an item
    pub fn update_item(&self, id: Uuid, question: String, reference_answer: String) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE items SET question = ?1, reference_answer = ?2 WHERE id = ?3",
            params![question, reference_answer, id.to_string()],
        )?;
        if changed == 0 {
            return Err(MemoWriteError::NotFound(id));
        }
        Ok(())
    }

    /// Remove an item together with its state and history
    pub fn delete_item(&self, id: Uuid) -> Result<ItemRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (seq, item, state) = read_item(&tx, id)?.ok_or(MemoWriteError::NotFound(id))?;
        let history = read_history(&tx, id)?;
        tx.execute("DELETE FROM items WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;

        debug!("Deleted item {}", id);
        Ok(ItemRecord {
            seq,
            item,
            state,
            history,
        })
    }

    /// Remove every item, returning how many were removed
    pub fn clear(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM reviews", [])?;
        let removed = tx.execute("DELETE FROM items", [])?;
        tx.commit()?;
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether an item with exactly this question text exists
    pub fn contains_question(&self, question: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT question FROM items")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let existing: String = row.get(0)?;
            if existing.trim() == question.trim() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Apply a review to an item atomically.
    ///
    /// `review` receives the item and its current committed memory state and
    /// returns the replacement state plus the history entry. It runs inside
    /// a write transaction; if it fails the transaction is rolled back and
    /// nothing is changed.
    pub fn apply_review<F>(&self, id: Uuid, review: F) -> Result<MemoryState>
    where
        F: FnOnce(&Item, &MemoryState) -> Result<(MemoryState, ReviewRecord)>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (_, item, current) = read_item(&tx, id)?.ok_or(MemoWriteError::NotFound(id))?;
        let (state, entry) = review(&item, &current)?;
        write_state(&tx, id, &state)?;
        tx.execute(
            "INSERT INTO reviews (item_id, quality, score, user_answer, feedback, \
             missing_concepts, interval_days, ease_factor, reviewed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.to_string(),
                entry.quality.value(),
                entry.score,
                entry.user_answer,
                entry.feedback,
                serde_json::to_string(&entry.missing_concepts)?,
                entry.interval_days,
                entry.ease_factor,
                format_timestamp(entry.reviewed_at),
            ],
        )?;
        tx.commit()?;

        Ok(state)
    }

    /// The item to study next: the first due item, otherwise the item
    /// with the earliest upcoming due date
    pub fn next_item(&self) -> Result<Option<ItemRecord>> {
        let conn = self.conn()?;
        let first = query_items(
            &conn,
            &format!("SELECT {ITEM_COLUMNS} FROM items {DUE_ORDER} LIMIT 1"),
        )?
        .into_iter()
        .next();

        let Some((seq, item, state)) = first else {
            return Ok(None);
        };
        let history = read_history(&conn, item.id)?;
        Ok(Some(ItemRecord {
            seq,
            item,
            state,
            history,
        }))
    }

    /// Aggregate progress at `now`
    pub fn stats(&self, now: DateTime<Utc>, scheduler: &Scheduler) -> Result<ProgressStats> {
        let conn = self.conn()?;
        let rows = query_items(&conn, &format!("SELECT {ITEM_COLUMNS} FROM items"))?;

        let mut due_now = 0;
        let mut total_attempts = 0u64;
        let mut total_correct = 0u64;
        let mut ease_sum = 0.0;
        let mut by_mastery = BTreeMap::new();

        for (_, _, state) in &rows {
            if state.is_due(now) {
                due_now += 1;
            }
            total_attempts += u64::from(state.total_attempts);
            total_correct += u64::from(state.total_correct);
            ease_sum += state.ease_factor;
            *by_mastery.entry(scheduler.mastery(state)).or_insert(0) += 1;
        }

        let total_items = rows.len();
        let success_rate = if total_attempts == 0 {
            0.0
        } else {
            total_correct as f64 / total_attempts as f64 * 100.0
        };
        let average_ease = if total_items == 0 {
            0.0
        } else {
            ease_sum / total_items as f64
        };

        Ok(ProgressStats {
            total_items,
            due_now,
            total_attempts,
            total_correct,
            success_rate,
            average_ease,
            by_mastery,
        })
    }
}

impl Store for ItemStore {
    fn load(&self, item_id: Uuid) -> Result<MemoryState> {
        let conn = self.conn()?;
        read_item(&conn, item_id)?
            .map(|(_, _, state)| state)
            .ok_or(MemoWriteError::NotFound(item_id))
    }

    fn save(&self, item_id: Uuid, state: MemoryState) -> Result<()> {
        let conn = self.conn()?;
        write_state(&conn, item_id, &state)
    }

    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM items WHERE due_at IS NULL OR due_at <= ?1 {DUE_ORDER}"
        ))?;
        let ids = stmt
            .query_map(params![format_timestamp(now)], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        ids.iter().map(|id| parse_id(id)).collect()
    }
}

/// Fixed-width RFC 3339 in UTC, so text order matches time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MemoWriteError::Storage(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| MemoWriteError::Storage(format!("Invalid item id '{}': {}", value, e)))
}

/// Raw column values of one `items` row
struct ItemRow {
    seq: u64,
    id: String,
    question: String,
    reference_answer: String,
    source: Option<String>,
    created_at: String,
    repetitions: u32,
    ease_factor: f64,
    interval_days: u32,
    due_at: Option<String>,
    last_reviewed_at: Option<String>,
    total_attempts: u32,
    total_correct: u32,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            id: row.get(1)?,
            question: row.get(2)?,
            reference_answer: row.get(3)?,
            source: row.get(4)?,
            created_at: row.get(5)?,
            repetitions: row.get(6)?,
            ease_factor: row.get(7)?,
            interval_days: row.get(8)?,
            due_at: row.get(9)?,
            last_reviewed_at: row.get(10)?,
            total_attempts: row.get(11)?,
            total_correct: row.get(12)?,
        })
    }

    fn into_parts(self) -> Result<(u64, Item, MemoryState)> {
        let item = Item {
            id: parse_id(&self.id)?,
            question: self.question,
            reference_answer: self.reference_answer,
            source: self.source,
            created_at: parse_timestamp(&self.created_at)?,
        };
        let state = MemoryState {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            due_at: self.due_at.as_deref().map(parse_timestamp).transpose()?,
            last_reviewed_at: self
                .last_reviewed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            total_attempts: self.total_attempts,
            total_correct: self.total_correct,
        };
        Ok((self.seq, item, state))
    }
}

fn query_items(conn: &Connection, sql: &str) -> Result<Vec<(u64, Item, MemoryState)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], ItemRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ItemRow::into_parts).collect()
}

fn read_item(conn: &Connection, id: Uuid) -> Result<Option<(u64, Item, MemoryState)>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
        params![id.to_string()],
        ItemRow::from_row,
    )
    .optional()?
    .map(ItemRow::into_parts)
    .transpose()
}

fn write_state(conn: &Connection, id: Uuid, state: &MemoryState) -> Result<()> {
    let changed = conn.execute(
        "UPDATE items SET repetitions = ?1, ease_factor = ?2, interval_days = ?3, \
         due_at = ?4, last_reviewed_at = ?5, total_attempts = ?6, total_correct = ?7 \
         WHERE id = ?8",
        params![
            state.repetitions,
            state.ease_factor,
            state.interval_days,
            state.due_at.map(format_timestamp),
            state.last_reviewed_at.map(format_timestamp),
            state.total_attempts,
            state.total_correct,
            id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(MemoWriteError::NotFound(id));
    }
    Ok(())
}

/// Raw column values of one `reviews` row
struct ReviewRow {
    quality: u8,
    score: Option<f64>,
    user_answer: Option<String>,
    feedback: Option<String>,
    missing_concepts: String,
    interval_days: u32,
    ease_factor: f64,
    reviewed_at: String,
}

impl ReviewRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            quality: row.get(0)?,
            score: row.get(1)?,
            user_answer: row.get(2)?,
            feedback: row.get(3)?,
            missing_concepts: row.get(4)?,
            interval_days: row.get(5)?,
            ease_factor: row.get(6)?,
            reviewed_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<ReviewRecord> {
        Ok(ReviewRecord {
            quality: Quality::new(self.quality)?,
            score: self.score,
            user_answer: self.user_answer,
            feedback: self.feedback,
            missing_concepts: serde_json::from_str(&self.missing_concepts)?,
            interval_days: self.interval_days,
            ease_factor: self.ease_factor,
            reviewed_at: parse_timestamp(&self.reviewed_at)?,
        })
    }
}

fn read_history(conn: &Connection, id: Uuid) -> Result<Vec<ReviewRecord>> {
    let mut stmt = conn.prepare(
        "SELECT quality, score, user_answer, feedback, missing_concepts, \
         interval_days, ease_factor, reviewed_at \
         FROM reviews WHERE item_id = ?1 ORDER BY review_id",
    )?;
    let rows = stmt
        .query_map(params![id.to_string()], ReviewRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ReviewRow::into_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()
    }

    fn store() -> ItemStore {
        ItemStore::in_memory().unwrap()
    }

    fn add(store: &ItemStore, question: &str) -> Uuid {
        let scheduler = Scheduler::default();
        store
            .add_item(
                Item::new(question.to_string(), "answer".to_string()),
                scheduler.seed_state(),
            )
            .unwrap()
    }

    fn reviewed_state(due_in_days: i64, ease_factor: f64) -> MemoryState {
        MemoryState {
            repetitions: 1,
            ease_factor,
            interval_days: 1,
            due_at: Some(now() + Duration::days(due_in_days)),
            last_reviewed_at: Some(now() + Duration::days(due_in_days - 1)),
            total_attempts: 1,
            total_correct: 1,
        }
    }

    #[test]
    fn test_load_save_round_trip() {
        let store = store();
        let id = add(&store, "Q1");

        let state = reviewed_state(3, 2.4);
        store.save(id, state.clone()).unwrap();
        assert_eq!(store.load(id).unwrap(), state);
    }

    #[test]
    fn test_item_round_trips_exactly() {
        let store = store();
        let item = Item::new("Q".to_string(), "A".to_string()).with_source("deck".to_string());
        let id = store
            .add_item(item.clone(), Scheduler::default().seed_state())
            .unwrap();
        assert_eq!(store.get_item(id).unwrap(), item);
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = now();
        let late = now() + Duration::days(40_000);
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(format_timestamp(early).len(), format_timestamp(late).len());
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let store = store();
        let id = Uuid::new_v4();
        assert!(matches!(store.load(id), Err(MemoWriteError::NotFound(_))));
        assert!(store.save(id, Scheduler::default().seed_state()).is_err());
        assert!(store.delete_item(id).is_err());
        assert!(matches!(store.history(id), Err(MemoWriteError::NotFound(_))));
        assert!(store.update_item(id, "Q".into(), "A".into()).is_err());
    }

    #[test]
    fn test_list_due_order() {
        let store = store();
        let later = add(&store, "later");
        let hard = add(&store, "hard");
        let easy = add(&store, "easy");
        let new = add(&store, "new");
        let future = add(&store, "future");

        store.save(later, reviewed_state(-1, 2.5)).unwrap();
        store.save(hard, reviewed_state(-3, 1.5)).unwrap();
        store.save(easy, reviewed_state(-3, 2.5)).unwrap();
        store.save(future, reviewed_state(2, 2.5)).unwrap();

        let due = store.list_due(now()).unwrap();
        assert_eq!(due, vec![new, hard, easy, later]);
    }

    #[test]
    fn test_list_due_includes_items_due_exactly_now() {
        let store = store();
        let id = add(&store, "Q");
        store.save(id, reviewed_state(0, 2.5)).unwrap();
        assert_eq!(store.list_due(now()).unwrap(), vec![id]);
    }

    #[test]
    fn test_list_due_ties_use_insertion_order() {
        let store = store();
        let ids: Vec<Uuid> = (0..5).map(|i| add(&store, &format!("Q{i}"))).collect();
        assert_eq!(store.list_due(now()).unwrap(), ids);
    }

    #[test]
    fn test_next_item_falls_back_to_earliest_upcoming() {
        let store = store();
        assert!(store.next_item().unwrap().is_none());

        let far = add(&store, "far");
        let soon = add(&store, "soon");
        store.save(far, reviewed_state(10, 2.5)).unwrap();
        store.save(soon, reviewed_state(2, 2.5)).unwrap();

        assert!(store.list_due(now()).unwrap().is_empty());
        assert_eq!(store.next_item().unwrap().unwrap().item.id, soon);
    }

    #[test]
    fn test_apply_review_appends_history() {
        let scheduler = Scheduler::default();
        let store = store();
        let id = add(&store, "Q");
        let quality = Quality::new(4).unwrap();

        let state = store
            .apply_review(id, |_, current| {
                let next = scheduler.record_review(current, quality, now())?;
                let mut entry = ReviewRecord::rated(quality, &next, now());
                entry.missing_concepts = vec!["ownership".to_string()];
                Ok((next, entry))
            })
            .unwrap();

        assert_eq!(state.repetitions, 1);
        assert_eq!(store.load(id).unwrap(), state);
        let history = store.history(id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quality, quality);
        assert_eq!(history[0].interval_days, 1);
        assert_eq!(history[0].missing_concepts, vec!["ownership"]);
        assert_eq!(history[0].reviewed_at, now());
    }

    #[test]
    fn test_failed_review_leaves_no_trace() {
        let store = store();
        let id = add(&store, "Q");
        let before = store.get(id).unwrap();

        let result = store.apply_review(id, |_, _| {
            Err(MemoWriteError::InvalidAnswer("rejected".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.get(id).unwrap(), before);
    }

    #[test]
    fn test_update_and_delete_item() {
        let store = store();
        let id = add(&store, "Old question");

        store
            .update_item(id, "New question".to_string(), "New answer".to_string())
            .unwrap();
        let item = store.get_item(id).unwrap();
        assert_eq!(item.question, "New question");
        assert_eq!(item.reference_answer, "New answer");
        assert!(store.contains_question("New question").unwrap());
        assert!(!store.contains_question("Old question").unwrap());

        let removed = store.delete_item(id).unwrap();
        assert_eq!(removed.item.id, id);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_delete_removes_history() {
        let scheduler = Scheduler::default();
        let store = store();
        let id = add(&store, "Q");
        let quality = Quality::new(5).unwrap();
        store
            .apply_review(id, |_, current| {
                let next = scheduler.record_review(current, quality, now())?;
                Ok((next.clone(), ReviewRecord::rated(quality, &next, now())))
            })
            .unwrap();

        assert_eq!(store.delete_item(id).unwrap().history.len(), 1);
        let conn = store.conn().unwrap();
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_clear() {
        let store = store();
        add(&store, "A");
        add(&store, "B");
        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let scheduler = Scheduler::default();
        let store = store();
        let _new = add(&store, "new");
        let reviewed = add(&store, "reviewed");

        let mut state = reviewed_state(-1, 2.3);
        state.total_attempts = 4;
        state.total_correct = 3;
        store.save(reviewed, state).unwrap();

        let stats = store.stats(now(), &scheduler).unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.due_now, 2);
        assert_eq!(stats.total_attempts, 4);
        assert_eq!(stats.total_correct, 3);
        assert_eq!(stats.success_rate, 75.0);
        assert!((stats.average_ease - 2.4).abs() < 1e-9);
        assert_eq!(stats.by_mastery.get(&crate::Mastery::New), Some(&1));
        assert_eq!(stats.by_mastery.get(&crate::Mastery::Learning), Some(&1));
    }

    #[test]
    fn test_empty_stats() {
        let stats = store().stats(now(), &Scheduler::default()).unwrap();
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_ease, 0.0);
    }
}
