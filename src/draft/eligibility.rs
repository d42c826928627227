// Slot eligibility rules.
//
// Two independent rules, applied in sequence: a static position-match table
// (which player positions a slot accepts) and a playing-time threshold per
// slot category. A candidate clears a slot only if it clears both. The
// rules are separate functions so a change to one cannot bypass the other.

use serde::Deserialize;

use crate::draft::position::{Position, SlotPosition};
use crate::pool::Candidate;

/// Minimum playing-time requirements per slot category. Values come from
/// `config/engine.toml` `[eligibility]`.
#[derive(Debug, Clone, Deserialize)]
pub struct EligibilityThresholds {
    /// Minimum plate appearances for position-player slots (and bench).
    pub min_plate_appearances: u32,
    /// Minimum innings pitched for a starting pitcher slot.
    pub min_sp_innings: f64,
    /// Minimum innings pitched for relief and closer slots.
    pub min_rp_innings: f64,
    /// Minimum saves for a closer slot, on top of the relief innings floor.
    pub min_closer_saves: u32,
}

/// The static position-match table: which player primary positions a roster
/// slot accepts. Pure function of the two enums, independent of any stats.
pub fn slot_accepts_position(slot: SlotPosition, pos: Position) -> bool {
    match slot {
        SlotPosition::Catcher => pos == Position::Catcher,
        SlotPosition::FirstBase => pos == Position::FirstBase,
        SlotPosition::SecondBase => pos == Position::SecondBase,
        SlotPosition::ThirdBase => pos == Position::ThirdBase,
        SlotPosition::ShortStop => pos == Position::ShortStop,
        SlotPosition::OutField => pos.is_outfield(),
        // DH and bench take any position player, never a pure pitcher.
        SlotPosition::DesignatedHitter | SlotPosition::Bench => !pos.is_pitcher(),
        SlotPosition::StartingPitcher => {
            matches!(pos, Position::Pitcher | Position::StartingPitcher)
        }
        SlotPosition::ReliefPitcher | SlotPosition::Closer => matches!(
            pos,
            Position::Pitcher | Position::ReliefPitcher | Position::Closer
        ),
    }
}

/// Whether the season carries enough hitting volume to count as a hitter.
pub fn hitting_qualified(candidate: &Candidate, t: &EligibilityThresholds) -> bool {
    candidate.plate_appearances >= t.min_plate_appearances
}

/// Whether the season carries enough pitching volume to count as a pitcher.
/// The relief innings floor is the qualification bar; specific slots may
/// demand more.
pub fn pitching_qualified(candidate: &Candidate, t: &EligibilityThresholds) -> bool {
    candidate.innings_pitched >= t.min_rp_innings
}

/// A season qualifying under both the hitting and pitching thresholds.
/// Two-way seasons appear in both candidate views and may fill either slot
/// category.
pub fn is_two_way(candidate: &Candidate, t: &EligibilityThresholds) -> bool {
    hitting_qualified(candidate, t) && pitching_qualified(candidate, t)
}

/// The playing-time rule for a slot, independent of position match.
pub fn meets_playing_time(
    slot: SlotPosition,
    candidate: &Candidate,
    t: &EligibilityThresholds,
) -> bool {
    match slot {
        SlotPosition::StartingPitcher => candidate.innings_pitched >= t.min_sp_innings,
        SlotPosition::ReliefPitcher => candidate.innings_pitched >= t.min_rp_innings,
        SlotPosition::Closer => {
            candidate.innings_pitched >= t.min_rp_innings && candidate.saves >= t.min_closer_saves
        }
        _ => candidate.plate_appearances >= t.min_plate_appearances,
    }
}

/// Full eligibility: position match, then playing time.
///
/// Two-way seasons pass position match for the opposite category's slots
/// (a pitcher-listed two-way may fill DH or bench, a position-player-listed
/// two-way may fill pitching slots); each slot's own playing-time rule still
/// applies afterwards.
pub fn is_eligible(slot: SlotPosition, candidate: &Candidate, t: &EligibilityThresholds) -> bool {
    let two_way_crossover = match slot {
        SlotPosition::DesignatedHitter | SlotPosition::Bench => {
            candidate.position.is_pitcher() && is_two_way(candidate, t)
        }
        s if s.is_pitching() => !candidate.position.is_pitcher() && is_two_way(candidate, t),
        _ => false,
    };
    let position_ok = slot_accepts_position(slot, candidate.position) || two_way_crossover;
    position_ok && meets_playing_time(slot, candidate, t)
}
