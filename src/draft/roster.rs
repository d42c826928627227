// Roster construction and slot occupancy.
//
// A roster's slot vector is fixed at team creation: the quota determines
// how many slots of each position exist, and nothing ever resizes it.
// Occupancy is the only mutable part, and slots are always addressed by
// their recorded (position, slot_index) key, never positionally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::draft::eligibility::{is_eligible, EligibilityThresholds};
use crate::draft::position::{CodeError, SlotPosition};
use crate::error::DraftError;
use crate::pool::Candidate;

/// A fixed per-league roster quota: how many slots of each position every
/// team carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterQuota {
    counts: Vec<(SlotPosition, usize)>,
}

impl RosterQuota {
    /// Build a quota from code-keyed counts (the shape league config uses).
    /// Unknown codes are rejected loudly.
    pub fn from_codes(codes: &HashMap<String, usize>) -> Result<Self, CodeError> {
        let mut counts = Vec::new();
        for (code, &count) in codes {
            let position = SlotPosition::parse(code)?;
            if count > 0 {
                counts.push((position, count));
            }
        }
        counts.sort_by_key(|(pos, _)| pos.sort_order());
        Ok(RosterQuota { counts })
    }

    pub fn from_counts(mut counts: Vec<(SlotPosition, usize)>) -> Self {
        counts.sort_by_key(|(pos, _)| pos.sort_order());
        counts.retain(|&(_, n)| n > 0);
        RosterQuota { counts }
    }

    pub fn total_slots(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Slots filled by position players, bench and DH included.
    pub fn hitting_slots(&self) -> usize {
        self.counts
            .iter()
            .filter(|(pos, _)| pos.is_hitting())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn pitching_slots(&self) -> usize {
        self.counts
            .iter()
            .filter(|(pos, _)| pos.is_pitching())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn counts(&self) -> &[(SlotPosition, usize)] {
        &self.counts
    }
}

/// The player occupying a roster slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterAssignment {
    pub season_id: String,
    pub player_id: String,
    pub name: String,
}

/// A single slot on a team's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSlot {
    pub position: SlotPosition,
    /// Disambiguates multiple slots of the same position (0-based).
    pub slot_index: usize,
    pub occupant: Option<RosterAssignment>,
}

/// A team's complete roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub slots: Vec<RosterSlot>,
}

impl Roster {
    /// Create an empty roster laid out per the quota, slots in deterministic
    /// position order with per-position indices.
    pub fn new(quota: &RosterQuota) -> Self {
        let mut slots = Vec::with_capacity(quota.total_slots());
        for &(position, count) in quota.counts() {
            for slot_index in 0..count {
                slots.push(RosterSlot {
                    position,
                    slot_index,
                    occupant: None,
                });
            }
        }
        Roster { slots }
    }

    pub fn slot(&self, position: SlotPosition, slot_index: usize) -> Option<&RosterSlot> {
        self.slots
            .iter()
            .find(|s| s.position == position && s.slot_index == slot_index)
    }

    /// Fill a slot addressed by its (position, index) key.
    pub fn fill(
        &mut self,
        position: SlotPosition,
        slot_index: usize,
        assignment: RosterAssignment,
    ) -> Result<(), DraftError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.position == position && s.slot_index == slot_index)
            .ok_or(DraftError::UnknownSlot {
                position,
                slot_index,
            })?;
        if slot.occupant.is_some() {
            return Err(DraftError::SlotTaken {
                position,
                slot_index,
            });
        }
        slot.occupant = Some(assignment);
        Ok(())
    }

    /// Empty every slot. Used when rebuilding occupancy from the pick log.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.occupant = None;
        }
    }

    pub fn has_empty(&self, position: SlotPosition) -> bool {
        self.slots
            .iter()
            .any(|s| s.position == position && s.occupant.is_none())
    }

    /// Distinct positions that still have an empty slot, in layout order.
    pub fn open_positions(&self) -> Vec<SlotPosition> {
        let mut open = Vec::new();
        for slot in &self.slots {
            if slot.occupant.is_none() && !open.contains(&slot.position) {
                open.push(slot.position);
            }
        }
        open
    }

    /// Resolve where a candidate would land: the first open slot (in layout
    /// order) the candidate is eligible for, with bench considered only when
    /// no starting slot wants them.
    pub fn target_slot(
        &self,
        candidate: &Candidate,
        thresholds: &EligibilityThresholds,
    ) -> Option<(SlotPosition, usize)> {
        let starting = self.slots.iter().find(|s| {
            s.occupant.is_none()
                && s.position != SlotPosition::Bench
                && is_eligible(s.position, candidate, thresholds)
        });
        starting
            .or_else(|| {
                self.slots.iter().find(|s| {
                    s.occupant.is_none()
                        && s.position == SlotPosition::Bench
                        && is_eligible(SlotPosition::Bench, candidate, thresholds)
                })
            })
            .map(|s| (s.position, s.slot_index))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_some()).count()
    }

    pub fn total_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.occupant.is_some())
    }

    /// Season ids of everyone on the roster, in slot order.
    pub fn occupants(&self) -> impl Iterator<Item = &RosterAssignment> {
        self.slots.iter().filter_map(|s| s.occupant.as_ref())
    }
}
