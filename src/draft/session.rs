// Draft session state machine.
//
// A session owns the team list, the pick counters, and the pre-allocated
// pick log. It is the unit of concurrency control: all mutation happens
// through `apply_pick` / the status transition methods, under the service's
// per-session guard. Derived state (roster occupancy, drafted sets) is
// always rebuilt from the pick log using each record's recorded keys.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::draft::pick::{PickRecord, PickSlot};
use crate::draft::roster::{Roster, RosterAssignment};
use crate::draft::schedule;
use crate::error::DraftError;
use crate::pool::{DraftedIndex, SeasonFilter};
use crate::store::StoreError;

/// Session lifecycle. Transitions only move forward, except the
/// `InProgress` / `Paused` pair; `Abandoned` is reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Setup,
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

/// Who drives a team's picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    Human,
    Automated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub control: ControlMode,
    /// Position in the round-one pick order, 1..=num_teams.
    pub draft_position: u32,
    pub roster: Roster,
}

/// Generate a unique session identifier from the current UTC time. The
/// millisecond suffix keeps two sessions created in the same second apart.
pub fn generate_session_id() -> String {
    Utc::now().format("sess_%Y%m%d_%H%M%S_%3f").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSession {
    pub id: String,
    pub status: SessionStatus,
    /// The next pick to be made, 1-based. Never decreases; ends at
    /// `total_picks() + 1` once the session completes.
    pub current_pick: u32,
    pub current_round: u32,
    pub num_teams: u32,
    pub rounds: u32,
    /// Seed for the selection jitter. Recorded on the session so automated
    /// behavior is reproducible.
    pub jitter_seed: u64,
    pub season_filter: SeasonFilter,
    /// Teams ordered by draft position.
    pub teams: Vec<Team>,
    /// The pick log, pre-allocated at creation; index + 1 = pick number.
    pub pick_slots: Vec<PickSlot>,
}

impl DraftSession {
    /// Create a session in `Setup` with its full pick log pre-allocated and
    /// team-assigned via the snake order.
    ///
    /// Rounds are derived from the roster size so that roster completion
    /// and pick-count completion coincide; mismatched team rosters are
    /// rejected.
    pub fn new(
        id: String,
        mut teams: Vec<Team>,
        jitter_seed: u64,
        season_filter: SeasonFilter,
    ) -> Result<Self, DraftError> {
        if teams.is_empty() {
            return Err(DraftError::InvalidSession("a session needs at least one team".into()));
        }
        teams.sort_by_key(|t| t.draft_position);
        let num_teams = teams.len() as u32;
        for (i, team) in teams.iter().enumerate() {
            if team.draft_position != i as u32 + 1 {
                return Err(DraftError::InvalidSession(format!(
                    "draft positions must cover 1..={num_teams} exactly; team {} has {}",
                    team.id, team.draft_position
                )));
            }
        }
        let mut ids: Vec<&str> = teams.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != teams.len() {
            return Err(DraftError::InvalidSession("team ids must be unique".into()));
        }

        let roster_size = teams[0].roster.total_count();
        if teams.iter().any(|t| t.roster.total_count() != roster_size) {
            return Err(DraftError::InvalidSession(
                "all teams must share the same roster quota".into(),
            ));
        }
        if roster_size == 0 {
            return Err(DraftError::InvalidSession("roster quota is empty".into()));
        }
        let rounds = roster_size as u32;

        let total = num_teams * rounds;
        let mut pick_slots = Vec::with_capacity(total as usize);
        for pick_number in 1..=total {
            let slot = schedule::slot_on_clock(pick_number, num_teams);
            let team = &teams[(slot - 1) as usize];
            pick_slots.push(PickSlot {
                pick_number,
                round: schedule::round_of(pick_number, num_teams),
                pick_in_round: schedule::pick_in_round(pick_number, num_teams),
                team_id: team.id.clone(),
                occupant: None,
            });
        }

        Ok(DraftSession {
            id,
            status: SessionStatus::Setup,
            current_pick: 1,
            current_round: 1,
            num_teams,
            rounds,
            jitter_seed,
            season_filter,
            teams,
            pick_slots,
        })
    }

    pub fn total_picks(&self) -> u32 {
        self.num_teams * self.rounds
    }

    pub fn filled_picks(&self) -> usize {
        self.pick_slots.iter().filter(|s| s.is_filled()).count()
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    fn transition(&mut self, from: SessionStatus, to: SessionStatus) -> Result<(), DraftError> {
        if self.status != from {
            return Err(DraftError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), DraftError> {
        self.transition(SessionStatus::Setup, SessionStatus::InProgress)?;
        info!("session {} started: {} teams, {} rounds", self.id, self.num_teams, self.rounds);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), DraftError> {
        self.transition(SessionStatus::InProgress, SessionStatus::Paused)
    }

    pub fn resume(&mut self) -> Result<(), DraftError> {
        self.transition(SessionStatus::Paused, SessionStatus::InProgress)
    }

    pub fn abandon(&mut self) -> Result<(), DraftError> {
        if self.status.is_terminal() {
            return Err(DraftError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Abandoned,
            });
        }
        self.status = SessionStatus::Abandoned;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teams and turn order
    // ------------------------------------------------------------------

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    /// The team whose turn the current pick is.
    pub fn team_on_clock(&self) -> &Team {
        let pick = self.current_pick.min(self.total_picks());
        let slot = schedule::slot_on_clock(pick, self.num_teams);
        &self.teams[(slot - 1) as usize]
    }

    // ------------------------------------------------------------------
    // Pick application
    // ------------------------------------------------------------------

    /// Apply a durably committed pick to in-memory state: fill the pick
    /// slot and the recorded roster slot, advance the counters, and
    /// complete the session when the last slot lands. Re-applying a pick
    /// that is already present is a no-op.
    pub fn apply_pick(&mut self, record: PickRecord) -> Result<(), DraftError> {
        if self.status != SessionStatus::InProgress {
            return Err(DraftError::SessionNotActive {
                id: self.id.clone(),
                status: self.status,
            });
        }
        if record.pick_number != self.current_pick {
            // Already applied?
            let already = record
                .pick_number
                .checked_sub(1)
                .and_then(|i| self.pick_slots.get(i as usize))
                .and_then(|slot| slot.occupant.as_ref())
                .is_some_and(|existing| existing.season_id == record.season_id);
            if already {
                return Ok(());
            }
            return Err(DraftError::NotYourTurn {
                expected: record.pick_number,
                current: self.current_pick,
            });
        }
        self.apply_record(record)
    }

    /// Shared application path for live commits and log replay. Does not
    /// gate on status; callers do.
    fn apply_record(&mut self, record: PickRecord) -> Result<(), DraftError> {
        let idx = record.pick_number as usize - 1;
        {
            let slot = self.pick_slots.get(idx).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "pick {} outside the session's {} slots",
                    record.pick_number,
                    self.total_picks()
                ))
            })?;
            if let Some(existing) = &slot.occupant {
                if existing.season_id == record.season_id {
                    return Ok(());
                }
                return Err(StoreError::Corrupt(format!(
                    "pick {} already holds {}, refusing to overwrite with {}",
                    record.pick_number, existing.season_id, record.season_id
                ))
                .into());
            }
            if slot.team_id != record.team_id {
                return Err(StoreError::Corrupt(format!(
                    "pick {} belongs to team {}, record names team {}",
                    record.pick_number, slot.team_id, record.team_id
                ))
                .into());
            }
        }

        let team = self
            .teams
            .iter_mut()
            .find(|t| t.id == record.team_id)
            .ok_or_else(|| DraftError::UnknownTeam {
                team_id: record.team_id.clone(),
            })?;
        team.roster.fill(
            record.position,
            record.slot_index,
            RosterAssignment {
                season_id: record.season_id.clone(),
                player_id: record.player_id.clone(),
                name: record.player_name.clone(),
            },
        )?;

        info!(
            "pick {}/{}: {} takes {} ({} #{})",
            record.pick_number,
            self.total_picks(),
            record.team_id,
            record.player_name,
            record.position,
            record.slot_index
        );

        self.pick_slots[idx].occupant = Some(record);

        // Counters are monotonic.
        self.current_pick = self.current_pick.max(idx as u32 + 2);
        let clamped = self.current_pick.min(self.total_picks());
        self.current_round = schedule::round_of(clamped, self.num_teams);

        if self.filled_picks() as u32 == self.total_picks() {
            self.status = SessionStatus::Completed;
            info!("session {} completed with {} picks", self.id, self.total_picks());
        }
        Ok(())
    }

    /// Rebuild all derived state from the authoritative pick log. Rosters
    /// are refilled from each record's recorded position and slot index.
    pub fn rebuild_from_picks(&mut self, mut picks: Vec<PickRecord>) -> Result<(), DraftError> {
        picks.sort_by_key(|p| p.pick_number);
        for (i, pick) in picks.iter().enumerate() {
            if pick.pick_number != i as u32 + 1 {
                return Err(StoreError::Corrupt(format!(
                    "pick log has a gap: expected pick {}, found {}",
                    i + 1,
                    pick.pick_number
                ))
                .into());
            }
        }

        for team in &mut self.teams {
            team.roster.clear();
        }
        for slot in &mut self.pick_slots {
            slot.occupant = None;
        }
        self.current_pick = 1;
        self.current_round = 1;
        if !picks.is_empty() && self.status == SessionStatus::Setup {
            self.status = SessionStatus::InProgress;
        }

        let count = picks.len();
        for pick in picks {
            self.apply_record(pick)?;
        }
        info!("session {} rebuilt from {} logged picks", self.id, count);
        Ok(())
    }

    /// The committed picks, in order.
    pub fn committed_picks(&self) -> impl Iterator<Item = &PickRecord> {
        self.pick_slots.iter().filter_map(|s| s.occupant.as_ref())
    }

    /// Derive the exclusion sets from the pick log.
    pub fn drafted_index(&self) -> DraftedIndex {
        DraftedIndex::from_picks(self.committed_picks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::position::SlotPosition;
    use crate::draft::roster::RosterQuota;
    use std::collections::HashMap;

    fn small_quota() -> RosterQuota {
        let mut codes = HashMap::new();
        codes.insert("C".to_string(), 1);
        codes.insert("OF".to_string(), 2);
        RosterQuota::from_codes(&codes).unwrap()
    }

    fn teams(n: u32) -> Vec<Team> {
        (1..=n)
            .map(|i| Team {
                id: format!("team-{i}"),
                name: format!("Team {i}"),
                control: ControlMode::Automated,
                draft_position: i,
                roster: Roster::new(&small_quota()),
            })
            .collect()
    }

    fn session(n: u32) -> DraftSession {
        DraftSession::new(format!("sess_test_{n}"), teams(n), 7, SeasonFilter::default()).unwrap()
    }

    fn record(
        pick_number: u32,
        team_id: &str,
        season_id: &str,
        position: SlotPosition,
        slot_index: usize,
    ) -> PickRecord {
        PickRecord {
            pick_number,
            round: schedule::round_of(pick_number, 2),
            pick_in_round: schedule::pick_in_round(pick_number, 2),
            team_id: team_id.into(),
            season_id: season_id.into(),
            player_id: season_id.split('_').next().unwrap().into(),
            player_name: season_id.into(),
            position,
            slot_index,
        }
    }

    #[test]
    fn new_session_preallocates_snaked_pick_log() {
        let s = session(2);
        assert_eq!(s.status, SessionStatus::Setup);
        assert_eq!(s.rounds, 3);
        assert_eq!(s.pick_slots.len(), 6);
        let owners: Vec<&str> = s.pick_slots.iter().map(|p| p.team_id.as_str()).collect();
        assert_eq!(
            owners,
            vec!["team-1", "team-2", "team-2", "team-1", "team-1", "team-2"]
        );
        assert_eq!(s.pick_slots[3].round, 2);
        assert_eq!(s.pick_slots[3].pick_in_round, 2);
    }

    #[test]
    fn new_session_rejects_bad_draft_positions() {
        let mut ts = teams(2);
        ts[1].draft_position = 3;
        let err = DraftSession::new("s".into(), ts, 0, SeasonFilter::default()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidSession(_)));
    }

    #[test]
    fn new_session_rejects_duplicate_team_ids() {
        let mut ts = teams(2);
        ts[1].id = "team-1".into();
        let err = DraftSession::new("s".into(), ts, 0, SeasonFilter::default()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidSession(_)));
    }

    #[test]
    fn new_session_rejects_mismatched_rosters() {
        let mut ts = teams(2);
        let mut codes = HashMap::new();
        codes.insert("C".to_string(), 2);
        ts[1].roster = Roster::new(&RosterQuota::from_codes(&codes).unwrap());
        let err = DraftSession::new("s".into(), ts, 0, SeasonFilter::default()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidSession(_)));
    }

    #[test]
    fn status_transitions() {
        let mut s = session(2);
        assert!(s.pause().is_err());
        s.start().unwrap();
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.start().is_err());
        s.pause().unwrap();
        assert_eq!(s.status, SessionStatus::Paused);
        s.resume().unwrap();
        assert_eq!(s.status, SessionStatus::InProgress);
        s.abandon().unwrap();
        assert_eq!(s.status, SessionStatus::Abandoned);
        assert!(s.abandon().is_err());
        assert!(s.resume().is_err());
    }

    #[test]
    fn apply_pick_rejected_while_setup() {
        let mut s = session(2);
        let err = s
            .apply_pick(record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0))
            .unwrap_err();
        assert!(matches!(err, DraftError::SessionNotActive { .. }));
    }

    #[test]
    fn apply_pick_advances_counters() {
        let mut s = session(2);
        s.start().unwrap();
        s.apply_pick(record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0))
            .unwrap();
        assert_eq!(s.current_pick, 2);
        assert_eq!(s.current_round, 1);
        assert_eq!(s.team_on_clock().id, "team-2");
        s.apply_pick(record(2, "team-2", "cobb_1911", SlotPosition::OutField, 0))
            .unwrap();
        s.apply_pick(record(3, "team-2", "speaker_1916", SlotPosition::OutField, 1))
            .unwrap();
        assert_eq!(s.current_pick, 4);
        assert_eq!(s.current_round, 2);
        assert_eq!(s.team_on_clock().id, "team-1");
    }

    #[test]
    fn apply_pick_rejects_wrong_pick_number() {
        let mut s = session(2);
        s.start().unwrap();
        let err = s
            .apply_pick(record(3, "team-2", "cobb_1911", SlotPosition::OutField, 0))
            .unwrap_err();
        assert!(matches!(err, DraftError::NotYourTurn { expected: 3, current: 1 }));
    }

    #[test]
    fn apply_pick_is_idempotent() {
        let mut s = session(2);
        s.start().unwrap();
        let r = record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0);
        s.apply_pick(r.clone()).unwrap();
        // Same record again: no-op, counters unchanged.
        s.apply_pick(r).unwrap();
        assert_eq!(s.current_pick, 2);
        assert_eq!(s.filled_picks(), 1);
    }

    #[test]
    fn apply_pick_refuses_conflicting_occupant() {
        let mut s = session(2);
        s.start().unwrap();
        s.apply_pick(record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0))
            .unwrap();
        // A different player for an already-filled pick number is corrupt
        // state, not a retry.
        let mut conflicting = record(1, "team-1", "cobb_1911", SlotPosition::OutField, 1);
        conflicting.pick_number = 1;
        let err = s.apply_pick(conflicting).unwrap_err();
        assert!(matches!(err, DraftError::NotYourTurn { .. } | DraftError::Store(_)));
    }

    #[test]
    fn session_completes_on_last_pick() {
        let mut s = session(2);
        s.start().unwrap();
        let picks = [
            record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0),
            record(2, "team-2", "cobb_1911", SlotPosition::OutField, 0),
            record(3, "team-2", "speaker_1916", SlotPosition::OutField, 1),
            record(4, "team-1", "mays_1954", SlotPosition::OutField, 1),
            record(5, "team-1", "bench_1970", SlotPosition::Catcher, 0),
            record(6, "team-2", "berra_1954", SlotPosition::Catcher, 0),
        ];
        for p in picks {
            s.apply_pick(p).unwrap();
        }
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.filled_picks(), 6);
        assert!(s.teams.iter().all(|t| t.roster.is_complete()));
    }

    #[test]
    fn rebuild_honors_recorded_slot_keys() {
        let mut s = session(2);
        s.start().unwrap();
        // Pick 1 goes to OF slot #1, not the first unfilled OF slot.
        let picks = vec![
            record(1, "team-1", "mays_1954", SlotPosition::OutField, 1),
            record(2, "team-2", "cobb_1911", SlotPosition::OutField, 0),
        ];
        for p in &picks {
            s.apply_pick(p.clone()).unwrap();
        }

        let mut restored = session(2);
        restored.rebuild_from_picks(picks).unwrap();
        assert_eq!(restored.status, SessionStatus::InProgress);
        assert_eq!(restored.current_pick, 3);
        let team1 = restored.team("team-1").unwrap();
        assert!(team1
            .roster
            .slot(SlotPosition::OutField, 0)
            .unwrap()
            .occupant
            .is_none());
        assert_eq!(
            team1
                .roster
                .slot(SlotPosition::OutField, 1)
                .unwrap()
                .occupant
                .as_ref()
                .unwrap()
                .season_id,
            "mays_1954"
        );
    }

    #[test]
    fn rebuild_rejects_gapped_log() {
        let mut s = session(2);
        let picks = vec![
            record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0),
            record(3, "team-2", "cobb_1911", SlotPosition::OutField, 0),
        ];
        let err = s.rebuild_from_picks(picks).unwrap_err();
        assert!(matches!(err, DraftError::Store(StoreError::Corrupt(_))));
    }

    #[test]
    fn drafted_index_derived_from_log() {
        let mut s = session(2);
        s.start().unwrap();
        s.apply_pick(record(1, "team-1", "ruth_1927", SlotPosition::OutField, 0))
            .unwrap();
        let index = s.drafted_index();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn generated_ids_have_session_prefix() {
        let id = generate_session_id();
        assert!(id.starts_with("sess_"), "{id}");
        assert!(id.len() >= 24, "{id}");
    }
}
