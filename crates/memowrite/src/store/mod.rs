//! Item storage
//!
//! Persists question items, their memory state and review history. The
//! store is the only owner of memory state; the scheduler just computes
//! replacement values for it.

pub mod item_store;
pub mod types;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::scheduler::MemoryState;

pub use item_store::ItemStore;
pub use types::{Item, ItemRecord, ProgressStats, ReviewRecord};

/// Minimal persistence contract the review flow relies on
pub trait Store: Send + Sync {
    /// Current memory state of an item
    fn load(&self, item_id: Uuid) -> Result<MemoryState>;

    /// Replace the memory state of an existing item
    fn save(&self, item_id: Uuid, state: MemoryState) -> Result<()>;

    /// Ids of items due at `now`, in a stable order
    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;
}
