// Engine-wide error taxonomy.
//
// Every rejected operation returns one of these typed reasons; nothing is
// swallowed. Validation errors leave session state untouched. Duplicate
// commits are not errors at all (they resolve to the existing pick) and so
// do not appear here.

use thiserror::Error;

use crate::draft::position::{CodeError, SlotPosition};
use crate::draft::session::SessionStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DraftError {
    /// The commit targeted a pick number the session is not at.
    #[error("wrong turn: request targets pick {expected}, session is at pick {current}")]
    NotYourTurn { expected: u32, current: u32 },

    /// Picks are only accepted while a session is in progress.
    #[error("session {id} is {status:?}; picks are only accepted while in progress")]
    SessionNotActive { id: String, status: SessionStatus },

    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("roster slot {position} #{slot_index} is already filled")]
    SlotTaken {
        position: SlotPosition,
        slot_index: usize,
    },

    #[error("no roster slot {position} #{slot_index} exists")]
    UnknownSlot {
        position: SlotPosition,
        slot_index: usize,
    },

    #[error("season {season_id} is not eligible for slot {position}: {reason}")]
    Ineligible {
        season_id: String,
        position: SlotPosition,
        reason: String,
    },

    #[error("player {player_id} is already on a roster in this session")]
    AlreadyDrafted { player_id: String },

    #[error("no season {season_id} in the candidate pool")]
    UnknownCandidate { season_id: String },

    #[error("no team {team_id} in this session")]
    UnknownTeam { team_id: String },

    #[error("no session {0}")]
    UnknownSession(String),

    /// Open roster slots remain but no eligible, undrafted candidate does.
    /// Distinct from roster completion, which is a normal no-op success.
    #[error("candidate pool exhausted with {open_slots} roster slots still open")]
    PoolExhausted { open_slots: usize },

    #[error("pool reserves too small: {0}")]
    InsufficientReserves(String),

    #[error("invalid session configuration: {0}")]
    InvalidSession(String),

    /// Transient storage failures were retried up to the configured cap.
    /// The session has been paused; resuming retries the pick.
    #[error("commit failed after {attempts} attempts; session paused")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// The per-session worker task is no longer running.
    #[error("session worker stopped before answering")]
    WorkerStopped,

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
