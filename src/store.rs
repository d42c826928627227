// External storage interfaces.
//
// The engine owns draft semantics; candidate data, the durable pick log,
// and session snapshots live behind these traits. The SQLite implementation
// is in `db.rs`, but nothing in the engine depends on it directly.

use async_trait::async_trait;
use thiserror::Error;

use crate::draft::pick::PickRecord;
use crate::draft::session::DraftSession;
use crate::pool::{Candidate, PositionCategory, SeasonFilter};

/// Storage-layer failure, classified for retry decisions.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend is temporarily unavailable (lock contention, busy
    /// timeout). Safe to retry.
    #[error("storage busy: {0}")]
    Busy(String),

    /// An I/O-level failure. Safe to retry.
    #[error("storage I/O failure: {0}")]
    Io(String),

    /// The stored data is malformed or internally inconsistent. Retrying
    /// will not help.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_) | StoreError::Io(_))
    }
}

/// A page request for candidate listing.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Page { limit, offset: 0 }
    }

    pub fn next(&self) -> Self {
        Page {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}

/// Result of appending a pick to the durable log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The pick was written.
    Committed,
    /// A pick with this number already exists for the session. Not an
    /// error; the caller resolves it by loading the existing record.
    Duplicate,
}

/// Read-only source of historical player-seasons, ordered by rating
/// descending. Implementations must support paging through the full result
/// set; the engine never assumes a single page covers it.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn list_candidates(
        &self,
        filter: &SeasonFilter,
        category: PositionCategory,
        page: Page,
    ) -> Result<Vec<Candidate>, StoreError>;
}

/// Durable, append-only pick log. The uniqueness constraint on
/// `(session_id, pick_number)` is the ultimate at-most-once backstop; the
/// in-memory session guard only avoids wasted work.
#[async_trait]
pub trait PickLogStore: Send + Sync {
    async fn append_pick(
        &self,
        session_id: &str,
        record: &PickRecord,
    ) -> Result<AppendOutcome, StoreError>;

    async fn load_pick(
        &self,
        session_id: &str,
        pick_number: u32,
    ) -> Result<Option<PickRecord>, StoreError>;

    /// All picks for a session, ordered by pick number.
    async fn load_picks(&self, session_id: &str) -> Result<Vec<PickRecord>, StoreError>;
}

/// Session snapshot storage. Snapshots are a convenience; the pick log is
/// authoritative and a lagging snapshot is rebuilt from it on load.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session(&self, id: &str) -> Result<Option<DraftSession>, StoreError>;

    async fn save_session(&self, session: &DraftSession) -> Result<(), StoreError>;
}
