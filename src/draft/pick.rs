// Pick log entry types.

use serde::{Deserialize, Serialize};

use crate::draft::position::SlotPosition;

/// A committed pick as persisted and transmitted. Every field here must
/// survive a store round-trip: dropping the persistent player identity or
/// the assigned position/slot makes roster reconstruction impossible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    /// Sequential pick number, 1-indexed, unique within the session.
    pub pick_number: u32,
    pub round: u32,
    pub pick_in_round: u32,
    /// The team that made the pick.
    pub team_id: String,
    /// Season-scoped identity of the drafted record.
    pub season_id: String,
    /// Persistent player identity, shared across the player's seasons.
    /// Empty when the historical record has no resolvable identity; the
    /// season identity then carries deduplication on its own.
    pub player_id: String,
    pub player_name: String,
    /// The roster slot position this pick was assigned to.
    pub position: SlotPosition,
    /// Index among the team's slots of that position.
    pub slot_index: usize,
}

/// One entry in a session's pre-allocated pick log. The slot's number,
/// round, and owning team are fixed at session creation; the occupant is
/// written exactly once by the commit protocol and never changes after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickSlot {
    pub pick_number: u32,
    pub round: u32,
    pub pick_in_round: u32,
    pub team_id: String,
    pub occupant: Option<PickRecord>,
}

impl PickSlot {
    pub fn is_filled(&self) -> bool {
        self.occupant.is_some()
    }
}
