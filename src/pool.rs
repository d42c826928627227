// Candidate pool: season records, drafted-set derivation, and the bounded
// working set fed to the automated selection engine.
//
// Pool contents are read-only for the lifetime of a draft. Exclusion of
// drafted players is always derived from the pick log through a
// `DraftedIndex`; the pool itself is never mutated by a pick.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::draft::eligibility::{
    self, hitting_qualified, pitching_qualified, EligibilityThresholds,
};
use crate::draft::pick::PickRecord;
use crate::draft::position::{Handedness, Position, SlotPosition};
use crate::store::{CandidateSource, Page, StoreError};

/// One historical player-season, with the raw counting stats the
/// eligibility rules need. The rating is a precomputed scalar; the engine
/// never recomputes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Season-scoped identity, unique per season record.
    pub season_id: String,
    /// Persistent player identity, shared by all of a player's seasons.
    pub player_id: String,
    pub name: String,
    pub season: u16,
    pub position: Position,
    pub rating: f64,
    pub plate_appearances: u32,
    pub innings_pitched: f64,
    pub saves: u32,
    pub bats: Handedness,
}

/// Which half of the pool a source query targets, split on primary position.
/// Two-way coverage is handled engine-side after the halves are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionCategory {
    Hitter,
    Pitcher,
}

/// Inclusive season-year bounds for a draft. `None` bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonFilter {
    pub min_season: Option<u16>,
    pub max_season: Option<u16>,
}

impl SeasonFilter {
    pub fn contains(&self, season: u16) -> bool {
        self.min_season.map_or(true, |min| season >= min)
            && self.max_season.map_or(true, |max| season <= max)
    }
}

/// Per-category sizes of the bounded working set.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolReserves {
    pub hitter_reserve: usize,
    pub pitcher_reserve: usize,
}

// ---------------------------------------------------------------------------
// Drafted index
// ---------------------------------------------------------------------------

/// The two keyed exclusion sets, derived from the immutable pick log and
/// never stored independently of it: persistent player identities (which
/// exclude every season of a drafted player) and season identities (the
/// fallback for records whose persistent identity could not be resolved).
#[derive(Debug, Clone, Default)]
pub struct DraftedIndex {
    players: HashSet<String>,
    seasons: HashSet<String>,
}

impl DraftedIndex {
    pub fn from_picks<'a, I>(picks: I) -> Self
    where
        I: IntoIterator<Item = &'a PickRecord>,
    {
        let mut index = DraftedIndex::default();
        for pick in picks {
            index.insert(pick);
        }
        index
    }

    pub fn insert(&mut self, pick: &PickRecord) {
        if !pick.player_id.is_empty() {
            self.players.insert(pick.player_id.clone());
        }
        self.seasons.insert(pick.season_id.clone());
    }

    /// Whether the candidate (or any season of the same player) is drafted.
    pub fn excludes(&self, candidate: &Candidate) -> bool {
        self.players.contains(&candidate.player_id) || self.seasons.contains(&candidate.season_id)
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Candidate pool
// ---------------------------------------------------------------------------

/// All season records matching a session's filter, sorted by rating
/// descending.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    by_season: HashMap<String, usize>,
    thresholds: EligibilityThresholds,
    reserves: PoolReserves,
}

impl CandidatePool {
    /// Page through both category listings of the source and assemble the
    /// merged, rating-sorted pool. Paging continues until a short page, so
    /// no fixed row cap silently truncates the result.
    pub async fn load(
        source: &dyn CandidateSource,
        filter: &SeasonFilter,
        thresholds: EligibilityThresholds,
        reserves: PoolReserves,
        page_size: usize,
    ) -> Result<Self, StoreError> {
        let mut merged: Vec<Candidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for category in [PositionCategory::Hitter, PositionCategory::Pitcher] {
            let mut page = Page::first(page_size);
            loop {
                let batch = source.list_candidates(filter, category, page).await?;
                let batch_len = batch.len();
                for candidate in batch {
                    if seen.insert(candidate.season_id.clone()) {
                        merged.push(candidate);
                    }
                }
                if batch_len < page_size {
                    break;
                }
                page = page.next();
            }
        }

        merged.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.season_id.cmp(&b.season_id))
        });

        let by_season = merged
            .iter()
            .enumerate()
            .map(|(i, c)| (c.season_id.clone(), i))
            .collect();

        info!("candidate pool loaded: {} seasons", merged.len());

        Ok(CandidatePool {
            candidates: merged,
            by_season,
            thresholds,
            reserves,
        })
    }

    /// Build a pool directly from records (tests, fixtures).
    pub fn from_candidates(
        mut candidates: Vec<Candidate>,
        thresholds: EligibilityThresholds,
        reserves: PoolReserves,
    ) -> Self {
        candidates.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.season_id.cmp(&b.season_id))
        });
        let by_season = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.season_id.clone(), i))
            .collect();
        CandidatePool {
            candidates,
            by_season,
            thresholds,
            reserves,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn thresholds(&self) -> &EligibilityThresholds {
        &self.thresholds
    }

    pub fn candidate_by_season(&self, season_id: &str) -> Option<&Candidate> {
        self.by_season.get(season_id).map(|&i| &self.candidates[i])
    }

    /// Rating-ordered view of seasons qualified as hitters. Two-way seasons
    /// appear here and in the pitcher view.
    pub fn hitter_view(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(|c| hitting_qualified(c, &self.thresholds))
    }

    /// Rating-ordered view of seasons qualified as pitchers.
    pub fn pitcher_view(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(|c| pitching_qualified(c, &self.thresholds))
    }

    /// The bounded candidate set for one automated pick: the top
    /// `hitter_reserve` undrafted hitters plus the top `pitcher_reserve`
    /// undrafted pitchers, in overall rating order. Reserves are taken from
    /// the undrafted remainder on every call, so the set cannot thin out as
    /// the draft progresses.
    ///
    /// After the reserves are cut, any still-open position with no eligible
    /// member gets the best-rated deeper candidate appended, so the
    /// truncation can never starve a required position that the full pool
    /// could cover.
    pub fn working_set(
        &self,
        drafted: &DraftedIndex,
        open_positions: &[SlotPosition],
    ) -> Vec<&Candidate> {
        let mut set: Vec<&Candidate> = Vec::new();
        let mut in_set: HashSet<&str> = HashSet::new();
        let mut hitters = 0usize;
        let mut pitchers = 0usize;

        for candidate in &self.candidates {
            if drafted.excludes(candidate) {
                continue;
            }
            let as_hitter =
                hitting_qualified(candidate, &self.thresholds) && hitters < self.reserves.hitter_reserve;
            let as_pitcher = pitching_qualified(candidate, &self.thresholds)
                && pitchers < self.reserves.pitcher_reserve;
            if !as_hitter && !as_pitcher {
                continue;
            }
            if as_hitter {
                hitters += 1;
            }
            if as_pitcher {
                pitchers += 1;
            }
            if in_set.insert(candidate.season_id.as_str()) {
                set.push(candidate);
            }
            if hitters >= self.reserves.hitter_reserve && pitchers >= self.reserves.pitcher_reserve {
                break;
            }
        }

        // Backfill any open position the reserve cut left uncovered.
        for &slot in open_positions {
            let covered = set
                .iter()
                .any(|c| eligibility::is_eligible(slot, c, &self.thresholds));
            if covered {
                continue;
            }
            let rescue = self.candidates.iter().find(|c| {
                !drafted.excludes(c)
                    && !in_set.contains(c.season_id.as_str())
                    && eligibility::is_eligible(slot, c, &self.thresholds)
            });
            match rescue {
                Some(candidate) => {
                    debug!(
                        "working set backfill: {} for open slot {}",
                        candidate.season_id, slot
                    );
                    in_set.insert(candidate.season_id.as_str());
                    set.push(candidate);
                }
                None => {
                    warn!("no undrafted candidate left for open slot {}", slot);
                }
            }
        }

        set
    }

    /// Assert that the configured reserves satisfy the sufficiency bound:
    /// each category's reserve must exceed the league-wide draft demand for
    /// that category (`num_teams` times the per-team quota).
    pub fn validate_reserves(
        &self,
        num_teams: u32,
        hitting_slots_per_team: usize,
        pitching_slots_per_team: usize,
    ) -> Result<(), String> {
        let hitter_demand = num_teams as usize * hitting_slots_per_team;
        let pitcher_demand = num_teams as usize * pitching_slots_per_team;
        if self.reserves.hitter_reserve <= hitter_demand {
            return Err(format!(
                "hitter reserve {} must exceed league demand {}",
                self.reserves.hitter_reserve, hitter_demand
            ));
        }
        if self.reserves.pitcher_reserve <= pitcher_demand {
            return Err(format!(
                "pitcher reserve {} must exceed league demand {}",
                self.reserves.pitcher_reserve, pitcher_demand
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> EligibilityThresholds {
        EligibilityThresholds {
            min_plate_appearances: 300,
            min_sp_innings: 140.0,
            min_rp_innings: 45.0,
            min_closer_saves: 15,
        }
    }

    fn reserves(h: usize, p: usize) -> PoolReserves {
        PoolReserves {
            hitter_reserve: h,
            pitcher_reserve: p,
        }
    }

    fn hitter(season_id: &str, player_id: &str, pos: Position, rating: f64) -> Candidate {
        Candidate {
            season_id: season_id.into(),
            player_id: player_id.into(),
            name: format!("Player {player_id}"),
            season: 1950,
            position: pos,
            rating,
            plate_appearances: 550,
            innings_pitched: 0.0,
            saves: 0,
            bats: Handedness::Right,
        }
    }

    fn arm(season_id: &str, player_id: &str, rating: f64) -> Candidate {
        Candidate {
            season_id: season_id.into(),
            player_id: player_id.into(),
            name: format!("Arm {player_id}"),
            season: 1950,
            position: Position::StartingPitcher,
            rating,
            plate_appearances: 40,
            innings_pitched: 200.0,
            saves: 0,
            bats: Handedness::Left,
        }
    }

    fn record(pick_number: u32, season_id: &str, player_id: &str) -> PickRecord {
        PickRecord {
            pick_number,
            round: 1,
            pick_in_round: pick_number,
            team_id: "team-1".into(),
            season_id: season_id.into(),
            player_id: player_id.into(),
            player_name: format!("Player {player_id}"),
            position: SlotPosition::OutField,
            slot_index: 0,
        }
    }

    #[test]
    fn season_filter_bounds() {
        let filter = SeasonFilter {
            min_season: Some(1920),
            max_season: Some(1960),
        };
        assert!(filter.contains(1920));
        assert!(filter.contains(1960));
        assert!(!filter.contains(1919));
        assert!(!filter.contains(1961));
        assert!(SeasonFilter::default().contains(1876));
    }

    #[test]
    fn pool_sorts_by_rating_desc() {
        let pool = CandidatePool::from_candidates(
            vec![
                hitter("a_1950", "a", Position::OutField, 60.0),
                hitter("b_1950", "b", Position::OutField, 90.0),
                hitter("c_1950", "c", Position::OutField, 75.0),
            ],
            thresholds(),
            reserves(10, 10),
        );
        let ratings: Vec<f64> = pool
            .hitter_view()
            .map(|c| c.rating)
            .collect();
        assert_eq!(ratings, vec![90.0, 75.0, 60.0]);
    }

    #[test]
    fn drafted_index_excludes_all_seasons_of_player() {
        let index = DraftedIndex::from_picks([&record(1, "ruth_1927", "ruth")]);
        let other_season = hitter("ruth_1921", "ruth", Position::OutField, 95.0);
        assert!(index.excludes(&other_season));
        let someone_else = hitter("cobb_1911", "cobb", Position::OutField, 94.0);
        assert!(!index.excludes(&someone_else));
    }

    #[test]
    fn drafted_index_season_fallback_without_player_id() {
        let mut pick = record(1, "mystery_1894", "");
        pick.player_id = String::new();
        let index = DraftedIndex::from_picks([&pick]);
        let mut same_season = hitter("mystery_1894", "", Position::OutField, 70.0);
        same_season.player_id = String::new();
        assert!(index.excludes(&same_season));
    }

    #[test]
    fn working_set_respects_reserves() {
        let mut candidates: Vec<Candidate> = (0..20)
            .map(|i| {
                hitter(
                    &format!("h{i}_1950"),
                    &format!("h{i}"),
                    Position::OutField,
                    90.0 - i as f64,
                )
            })
            .collect();
        for i in 0..20 {
            candidates.push(arm(&format!("p{i}_1950"), &format!("p{i}"), 89.5 - i as f64));
        }
        let pool = CandidatePool::from_candidates(candidates, thresholds(), reserves(5, 5));

        let set = pool.working_set(&DraftedIndex::default(), &[]);
        assert_eq!(set.len(), 10);
        let hitters = set.iter().filter(|c| !c.position.is_pitcher()).count();
        assert_eq!(hitters, 5);
    }

    #[test]
    fn working_set_refills_after_picks() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| {
                hitter(
                    &format!("h{i}_1950"),
                    &format!("h{i}"),
                    Position::OutField,
                    90.0 - i as f64,
                )
            })
            .collect();
        let pool = CandidatePool::from_candidates(candidates, thresholds(), reserves(4, 4));

        let empty = DraftedIndex::default();
        let before = pool.working_set(&empty, &[]);
        assert_eq!(before.len(), 4);
        assert_eq!(before[0].season_id, "h0_1950");

        // Draft the top two; the set must slide down, not shrink.
        let picks = [record(1, "h0_1950", "h0"), record(2, "h1_1950", "h1")];
        let drafted = DraftedIndex::from_picks(picks.iter());
        let after = pool.working_set(&drafted, &[]);
        assert_eq!(after.len(), 4);
        assert_eq!(after[0].season_id, "h2_1950");
    }

    #[test]
    fn working_set_backfills_uncovered_position() {
        // Twenty outfielders outrank the only catcher; a reserve of 5 would
        // cut the catcher out entirely.
        let mut candidates: Vec<Candidate> = (0..20)
            .map(|i| {
                hitter(
                    &format!("of{i}_1950"),
                    &format!("of{i}"),
                    Position::OutField,
                    90.0 - i as f64,
                )
            })
            .collect();
        candidates.push(hitter("c_1950", "c", Position::Catcher, 40.0));
        let pool = CandidatePool::from_candidates(candidates, thresholds(), reserves(5, 5));

        let without = pool.working_set(&DraftedIndex::default(), &[]);
        assert!(!without.iter().any(|c| c.position == Position::Catcher));

        let with = pool.working_set(&DraftedIndex::default(), &[SlotPosition::Catcher]);
        assert!(with.iter().any(|c| c.position == Position::Catcher));
    }

    #[test]
    fn two_way_counts_against_both_reserves() {
        let mut two_way = arm("tw_1950", "tw", 99.0);
        two_way.plate_appearances = 500;
        let pool = CandidatePool::from_candidates(
            vec![
                two_way,
                hitter("h_1950", "h", Position::OutField, 80.0),
                arm("p_1950", "p", 79.0),
            ],
            thresholds(),
            reserves(1, 1),
        );
        // The two-way season fills both one-deep reserves by itself.
        let set = pool.working_set(&DraftedIndex::default(), &[]);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].season_id, "tw_1950");
    }

    #[test]
    fn reserve_validation_bounds() {
        let pool = CandidatePool::from_candidates(vec![], thresholds(), reserves(41, 33));
        // 4 teams, 10 hitting slots, 8 pitching slots.
        assert!(pool.validate_reserves(4, 10, 8).is_ok());
        let tight = CandidatePool::from_candidates(vec![], thresholds(), reserves(40, 33));
        assert!(tight.validate_reserves(4, 10, 8).is_err());
    }
}
