// Commit protocol.
//
// Turns a chosen (candidate, position, slot) into a durable pick with
// at-most-once semantics. The caller holds the session guard across the
// whole call; this module re-verifies turn legality and slot state anyway,
// because the selection that produced the request and the commit are not
// one atomic step. The durable key on (session_id, pick_number) is what
// actually guarantees uniqueness; a duplicate-key append resolves to the
// existing record rather than an error.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::draft::pick::PickRecord;
use crate::draft::session::{DraftSession, SessionStatus};
use crate::error::DraftError;
use crate::store::{AppendOutcome, PickLogStore, StoreError};

/// Bounded exponential backoff for transient storage failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (1-based): the base delay
    /// doubled per attempt, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// How a pick request resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// This call wrote the pick.
    Committed(PickRecord),
    /// The pick number was already durably committed; the existing record
    /// is returned. A retry resolving here is success, not an error.
    AlreadyCommitted(PickRecord),
    /// The acting team's roster was already full; nothing to do.
    RosterComplete,
}

impl PickOutcome {
    /// The committed record, when one exists.
    pub fn record(&self) -> Option<&PickRecord> {
        match self {
            PickOutcome::Committed(r) | PickOutcome::AlreadyCommitted(r) => Some(r),
            PickOutcome::RosterComplete => None,
        }
    }
}

/// Commit a pick: verify the session still accepts it, append it to the
/// durable log (retrying transient failures with bounded backoff), and
/// apply it to in-memory state. Exhausting the retry budget pauses the
/// session and surfaces the cause.
pub async fn commit_pick(
    session: &mut DraftSession,
    log: &dyn PickLogStore,
    record: PickRecord,
    retry: &RetryPolicy,
) -> Result<PickOutcome, DraftError> {
    if session.status != SessionStatus::InProgress {
        return Err(DraftError::SessionNotActive {
            id: session.id.clone(),
            status: session.status,
        });
    }
    if record.pick_number != session.current_pick {
        return Err(DraftError::NotYourTurn {
            expected: record.pick_number,
            current: session.current_pick,
        });
    }

    // The roster slot chosen during selection may have been taken by a
    // commit that raced in between; check again before touching the log.
    let team = session
        .team(&record.team_id)
        .ok_or_else(|| DraftError::UnknownTeam {
            team_id: record.team_id.clone(),
        })?;
    match team.roster.slot(record.position, record.slot_index) {
        None => {
            return Err(DraftError::UnknownSlot {
                position: record.position,
                slot_index: record.slot_index,
            })
        }
        Some(slot) if slot.occupant.is_some() => {
            return Err(DraftError::SlotTaken {
                position: record.position,
                slot_index: record.slot_index,
            })
        }
        Some(_) => {}
    }

    let mut attempt = 1u32;
    loop {
        match log.append_pick(&session.id, &record).await {
            Ok(AppendOutcome::Committed) => {
                session.apply_pick(record.clone())?;
                return Ok(PickOutcome::Committed(record));
            }
            Ok(AppendOutcome::Duplicate) => {
                let existing = log
                    .load_pick(&session.id, record.pick_number)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "pick {} reported duplicate but is absent from the log",
                            record.pick_number
                        ))
                    })?;
                info!(
                    "pick {} was already committed ({}); resolving as duplicate",
                    record.pick_number, existing.season_id
                );
                session.apply_pick(existing.clone())?;
                return Ok(PickOutcome::AlreadyCommitted(existing));
            }
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                let delay = retry.delay(attempt);
                warn!(
                    "transient store failure on pick {} (attempt {}/{}): {e}; retrying in {:?}",
                    record.pick_number, attempt, retry.max_attempts, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "pick {} failed after {} attempts; pausing session {}",
                    record.pick_number, attempt, session.id
                );
                session.pause()?;
                return Err(DraftError::RetriesExhausted {
                    attempts: attempt,
                    source: e,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
}
