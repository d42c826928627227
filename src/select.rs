// Automated selection.
//
// Given a bounded, deduplicated candidate set and the acting team's roster,
// pick one (candidate, position, slot). The score compares candidates
// across every open position at once, so the best available player wins
// regardless of which need they fill. All weights and thresholds are
// configuration; none of the numbers here are structural.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::draft::eligibility::{is_eligible, EligibilityThresholds};
use crate::draft::position::{Handedness, SlotPosition};
use crate::draft::roster::Roster;
use crate::pool::Candidate;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-slot-position base scarcity weights. Positions absent from the table
/// are neutral (1.0).
#[derive(Debug, Clone, Default)]
pub struct ScarcityWeights {
    weights: HashMap<SlotPosition, f64>,
}

impl ScarcityWeights {
    pub fn new(weights: HashMap<SlotPosition, f64>) -> Self {
        ScarcityWeights { weights }
    }

    pub fn base(&self, position: SlotPosition) -> f64 {
        self.weights.get(&position).copied().unwrap_or(1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotPosition, &f64)> {
        self.weights.iter()
    }
}

/// Workload thresholds for the volume multiplier. Hitters are judged by
/// plate appearances, starters and relievers by their own innings bars.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct VolumeCurve {
    pub qualifying_pa: f64,
    pub heavy_pa: f64,
    pub qualifying_ip: f64,
    pub heavy_ip: f64,
    pub rp_qualifying_ip: f64,
    pub rp_heavy_ip: f64,
    /// Multiplier for workloads at or above the heavy bar.
    pub heavy_bonus: f64,
    /// Lowest multiplier a token season can be penalized down to.
    pub light_floor: f64,
}

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Half-width of the multiplicative jitter band, in [0, 1).
    pub jitter: f64,
    /// Scaling of scarcity influence in round 1 (negative mutes it).
    pub early_round_adjust: f64,
    /// Scaling of scarcity influence in the final round (positive amplifies it).
    pub late_round_adjust: f64,
    pub platoon_minority_bonus: f64,
    pub platoon_switch_bonus: f64,
    pub scarcity: ScarcityWeights,
    pub volume: VolumeCurve,
}

impl SelectionConfig {
    /// The effective scarcity weight for a position at a given round.
    ///
    /// The base weight's excess over neutral is scaled by a ramp that runs
    /// linearly from `early_round_adjust` to `late_round_adjust` across the
    /// draft, so early rounds let raw rating dominate and late rounds push
    /// teams toward their remaining needs. Scaling the excess rather than
    /// the whole weight keeps a uniform factor from cancelling out across
    /// positions.
    pub fn scarcity_weight(&self, position: SlotPosition, round: u32, rounds: u32) -> f64 {
        let base = self.scarcity.base(position);
        let progress = if rounds <= 1 {
            0.0
        } else {
            (round.saturating_sub(1)) as f64 / (rounds - 1) as f64
        };
        let ramp = self.early_round_adjust
            + (self.late_round_adjust - self.early_round_adjust) * progress;
        1.0 + (base - 1.0) * (1.0 + ramp)
    }

    /// Reward full-workload seasons and penalize token ones, judged by the
    /// category of the slot being scored.
    pub fn volume_multiplier(&self, candidate: &Candidate, slot: SlotPosition) -> f64 {
        let v = &self.volume;
        let (load, qualifying, heavy) = match slot {
            SlotPosition::StartingPitcher => {
                (candidate.innings_pitched, v.qualifying_ip, v.heavy_ip)
            }
            SlotPosition::ReliefPitcher | SlotPosition::Closer => {
                (candidate.innings_pitched, v.rp_qualifying_ip, v.rp_heavy_ip)
            }
            _ => (
                candidate.plate_appearances as f64,
                v.qualifying_pa,
                v.heavy_pa,
            ),
        };
        if load >= heavy {
            v.heavy_bonus
        } else if load >= qualifying {
            1.0
        } else if qualifying > 0.0 {
            (load / qualifying).max(v.light_floor)
        } else {
            1.0
        }
    }

    /// Position players only: favor a batting side the roster is short on,
    /// favor switch-hitters more.
    pub fn platoon_bonus(&self, candidate: &Candidate, counts: &PlatoonCounts) -> f64 {
        if candidate.position.is_pitcher() {
            return 1.0;
        }
        match candidate.bats {
            Handedness::Switch => self.platoon_switch_bonus,
            Handedness::Left if counts.left < counts.right => self.platoon_minority_bonus,
            Handedness::Right if counts.right < counts.left => self.platoon_minority_bonus,
            _ => 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Platoon counts
// ---------------------------------------------------------------------------

/// Batting-side tally of the position players already on a roster.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatoonCounts {
    pub left: usize,
    pub right: usize,
    pub switch: usize,
}

impl PlatoonCounts {
    pub fn tally<'a, I>(rostered: I) -> Self
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let mut counts = PlatoonCounts::default();
        for candidate in rostered {
            if candidate.position.is_pitcher() {
                continue;
            }
            match candidate.bats {
                Handedness::Left => counts.left += 1,
                Handedness::Right => counts.right += 1,
                Handedness::Switch => counts.switch += 1,
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Choice
// ---------------------------------------------------------------------------

/// The engine's pick: which season, and exactly where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub season_id: String,
    pub position: SlotPosition,
    pub slot_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Choice(Selection),
    /// Every roster slot is filled. A no-op success, not an error.
    RosterComplete,
    /// Open slots remain but no candidate in the set can legally fill any
    /// of them. Never conflated with roster completion.
    PoolExhausted,
}

/// Score the candidate set against the roster's open positions and return
/// the single best legal choice.
///
/// Ties on score fall back to raw rating, then to input order, so a run is
/// reproducible given the same jitter seed and candidate ordering.
#[allow(clippy::too_many_arguments)]
pub fn choose(
    candidates: &[&Candidate],
    roster: &Roster,
    platoon: &PlatoonCounts,
    round: u32,
    rounds: u32,
    config: &SelectionConfig,
    thresholds: &EligibilityThresholds,
    rng: &mut StdRng,
) -> SelectionOutcome {
    let open = roster.open_positions();
    if open.is_empty() {
        return SelectionOutcome::RosterComplete;
    }

    let mut best: Option<(f64, f64, usize)> = None; // (score, rating, input index)
    for (index, candidate) in candidates.iter().enumerate() {
        let eligible: Vec<SlotPosition> = open
            .iter()
            .copied()
            .filter(|&slot| is_eligible(slot, candidate, thresholds))
            .collect();
        if eligible.is_empty() {
            continue;
        }

        let jitter = 1.0 + config.jitter * (rng.gen::<f64>() * 2.0 - 1.0);
        let platoon_factor = config.platoon_bonus(candidate, platoon);

        for slot in eligible {
            let score = candidate.rating
                * config.scarcity_weight(slot, round, rounds)
                * config.volume_multiplier(candidate, slot)
                * platoon_factor
                * jitter;
            let better = match best {
                None => true,
                Some((best_score, best_rating, _)) => {
                    score > best_score
                        || (score == best_score && candidate.rating > best_rating)
                }
            };
            if better {
                best = Some((score, candidate.rating, index));
            }
        }
    }

    let Some((score, _, index)) = best else {
        return SelectionOutcome::PoolExhausted;
    };
    let candidate = candidates[index];

    match roster.target_slot(candidate, thresholds) {
        Some((position, slot_index)) => {
            debug!(
                "selected {} (rating {:.1}, score {:.2}) for {} #{}",
                candidate.season_id, candidate.rating, score, position, slot_index
            );
            SelectionOutcome::Choice(Selection {
                season_id: candidate.season_id.clone(),
                position,
                slot_index,
            })
        }
        // Eligible for an open position but placeable nowhere: the open set
        // and the slot scan disagree, which only happens on an empty
        // remainder. Treat as exhaustion rather than guessing a slot.
        None => SelectionOutcome::PoolExhausted,
    }
}
