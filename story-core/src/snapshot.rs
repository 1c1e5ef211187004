//! Exported frames and the reorderable strip that lists them.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A flattened, exported frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier.
    pub id: Uuid,
    /// Where the exported image lives.
    pub uri: String,
    /// Export time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            timestamp_ms: current_timestamp_ms(),
        }
    }
}

/// Milliseconds since the Unix epoch, `0` if the clock is before it.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Ordered list of exported snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStrip {
    items: Vec<Snapshot>,
}

impl SnapshotStrip {
    /// Create an empty strip.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot at the end.
    pub fn push(&mut self, snapshot: Snapshot) {
        tracing::debug!("Snapshot {} added to strip", snapshot.id);
        self.items.push(snapshot);
    }

    /// Remove a snapshot by ID.
    pub fn remove(&mut self, id: Uuid) -> Option<Snapshot> {
        let index = self.items.iter().position(|s| s.id == id)?;
        Some(self.items.remove(index))
    }

    /// Move the item at `from` so it ends up at `to`.
    ///
    /// Returns `false` (and changes nothing) if either index is out of range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        true
    }

    /// Snapshots in display order.
    #[must_use]
    pub fn items(&self) -> &[Snapshot] {
        &self.items
    }

    /// Get a snapshot by ID.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Snapshot> {
        self.items.iter().find(|s| s.id == id)
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the strip is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
