// Draft service: the engine's request surface.
//
// One `DraftService` owns every live session. Each session entry wraps its
// state in a `tokio::sync::Mutex`, and the whole select -> commit span for
// a pick runs under that lock, so two concurrently triggered attempts can
// never both choose for the same pick number. The guard is released on
// every exit path, including cancellation of the calling future; the
// durable pick-log key remains the backstop if a second process races this
// one.
//
// `SessionActor` funnels requests through an mpsc queue, one at a time.
// State changes are outputs of the request being processed, never inputs
// that re-trigger it.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::commit::{self, PickOutcome};
use crate::config::{EngineSettings, LeagueSettings};
use crate::draft::eligibility::{is_eligible, meets_playing_time};
use crate::draft::pick::PickRecord;
use crate::draft::position::SlotPosition;
use crate::draft::roster::Roster;
use crate::draft::schedule;
use crate::draft::session::{
    generate_session_id, ControlMode, DraftSession, SessionStatus, Team,
};
use crate::error::DraftError;
use crate::pool::{Candidate, CandidatePool};
use crate::select::{self, PlatoonCounts, SelectionOutcome};
use crate::store::{CandidateSource, PickLogStore, SessionStore, StoreError};

/// What a caller supplies for each team at session creation.
#[derive(Debug, Clone)]
pub struct TeamSpec {
    pub name: String,
    pub control: ControlMode,
}

struct SessionState {
    session: DraftSession,
    pool: CandidatePool,
    rng: StdRng,
}

struct SessionEntry {
    state: Mutex<SessionState>,
}

pub struct DraftService {
    candidates: Arc<dyn CandidateSource>,
    pick_log: Arc<dyn PickLogStore>,
    session_store: Arc<dyn SessionStore>,
    league: LeagueSettings,
    engine: EngineSettings,
    entries: Mutex<HashMap<String, Arc<SessionEntry>>>,
}

impl DraftService {
    pub fn new(
        candidates: Arc<dyn CandidateSource>,
        pick_log: Arc<dyn PickLogStore>,
        session_store: Arc<dyn SessionStore>,
        league: LeagueSettings,
        engine: EngineSettings,
    ) -> Self {
        DraftService {
            candidates,
            pick_log,
            session_store,
            league,
            engine,
            entries: Mutex::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Create a session in `Setup` with one team per spec, draft order
    /// following spec order. The candidate pool is loaded up front and the
    /// reserve sufficiency bound is enforced before anything is persisted.
    pub async fn create_session(
        &self,
        specs: Vec<TeamSpec>,
        jitter_seed: Option<u64>,
    ) -> Result<String, DraftError> {
        let teams: Vec<Team> = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Team {
                id: format!("team-{}", i + 1),
                name: spec.name,
                control: spec.control,
                draft_position: i as u32 + 1,
                roster: Roster::new(&self.league.quota),
            })
            .collect();
        let num_teams = teams.len() as u32;

        let seed = jitter_seed.unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64);
        let session = DraftSession::new(
            generate_session_id(),
            teams,
            seed,
            self.league.seasons.clone(),
        )?;

        let pool = CandidatePool::load(
            self.candidates.as_ref(),
            &session.season_filter,
            self.engine.thresholds.clone(),
            self.engine.reserves.clone(),
            self.engine.page_size,
        )
        .await?;
        pool.validate_reserves(
            num_teams,
            self.league.quota.hitting_slots(),
            self.league.quota.pitching_slots(),
        )
        .map_err(DraftError::InsufficientReserves)?;

        self.session_store.save_session(&session).await?;

        let id = session.id.clone();
        let rng = StdRng::seed_from_u64(seed);
        let entry = Arc::new(SessionEntry {
            state: Mutex::new(SessionState { session, pool, rng }),
        });
        self.entries.lock().await.insert(id.clone(), entry);
        info!("created session {id} with {num_teams} teams");
        Ok(id)
    }

    /// Look up a live session entry, loading and rebuilding from storage if
    /// this process has not seen it yet.
    async fn entry(&self, id: &str) -> Result<Arc<SessionEntry>, DraftError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(id) {
            return Ok(Arc::clone(entry));
        }

        let mut session = self
            .session_store
            .load_session(id)
            .await?
            .ok_or_else(|| DraftError::UnknownSession(id.to_string()))?;

        // The log is authoritative; a snapshot that lags it is rebuilt from
        // the recorded keys.
        let picks = self.pick_log.load_picks(id).await?;
        if picks.len() != session.filled_picks() {
            info!(
                "session {id}: snapshot has {} picks, log has {}; rebuilding",
                session.filled_picks(),
                picks.len()
            );
            session.rebuild_from_picks(picks)?;
        }

        let pool = CandidatePool::load(
            self.candidates.as_ref(),
            &session.season_filter,
            self.engine.thresholds.clone(),
            self.engine.reserves.clone(),
            self.engine.page_size,
        )
        .await?;
        let rng = StdRng::seed_from_u64(session.jitter_seed);

        let entry = Arc::new(SessionEntry {
            state: Mutex::new(SessionState { session, pool, rng }),
        });
        entries.insert(id.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    async fn with_transition<F>(&self, id: &str, apply: F) -> Result<(), DraftError>
    where
        F: FnOnce(&mut DraftSession) -> Result<(), DraftError>,
    {
        let entry = self.entry(id).await?;
        let mut state = entry.state.lock().await;
        apply(&mut state.session)?;
        self.session_store.save_session(&state.session).await?;
        Ok(())
    }

    pub async fn start_session(&self, id: &str) -> Result<(), DraftError> {
        self.with_transition(id, |s| s.start()).await
    }

    pub async fn pause_session(&self, id: &str) -> Result<(), DraftError> {
        self.with_transition(id, |s| s.pause()).await
    }

    pub async fn resume_session(&self, id: &str) -> Result<(), DraftError> {
        self.with_transition(id, |s| s.resume()).await
    }

    pub async fn abandon_session(&self, id: &str) -> Result<(), DraftError> {
        self.with_transition(id, |s| s.abandon()).await
    }

    /// A point-in-time copy of the session for display and turn decisions.
    pub async fn session_snapshot(&self, id: &str) -> Result<DraftSession, DraftError> {
        let entry = self.entry(id).await?;
        let state = entry.state.lock().await;
        Ok(state.session.clone())
    }

    // ------------------------------------------------------------------
    // Pick requests
    // ------------------------------------------------------------------

    /// Run one automated pick for the pick number the caller expects to
    /// fill. Safe to re-invoke: an expectation already committed resolves
    /// to the existing record instead of drafting again.
    pub async fn request_cpu_pick(
        &self,
        id: &str,
        expected_pick: u32,
    ) -> Result<PickOutcome, DraftError> {
        let entry = self.entry(id).await?;
        let mut guard = entry.state.lock().await;
        let state = &mut *guard;
        let session = &mut state.session;

        if let Some(existing) = self
            .resolve_already_committed(session, expected_pick)
            .await?
        {
            return Ok(PickOutcome::AlreadyCommitted(existing));
        }
        if session.status != SessionStatus::InProgress {
            return Err(DraftError::SessionNotActive {
                id: session.id.clone(),
                status: session.status,
            });
        }
        if expected_pick != session.current_pick {
            return Err(DraftError::NotYourTurn {
                expected: expected_pick,
                current: session.current_pick,
            });
        }

        let (team_id, control) = {
            let team = session.team_on_clock();
            (team.id.clone(), team.control)
        };
        if control != ControlMode::Automated {
            debug!("cpu pick requested while {team_id} (human) is on the clock");
            return Err(DraftError::NotYourTurn {
                expected: expected_pick,
                current: session.current_pick,
            });
        }

        let drafted = session.drafted_index();
        let selection = {
            let team = session
                .team(&team_id)
                .ok_or_else(|| DraftError::UnknownTeam {
                    team_id: team_id.clone(),
                })?;
            let open = team.roster.open_positions();
            let working_set = state.pool.working_set(&drafted, &open);
            let rostered: Vec<&Candidate> = team
                .roster
                .occupants()
                .filter_map(|a| state.pool.candidate_by_season(&a.season_id))
                .collect();
            let platoon = PlatoonCounts::tally(rostered);

            match select::choose(
                &working_set,
                &team.roster,
                &platoon,
                session.current_round,
                session.rounds,
                &self.engine.selection,
                state.pool.thresholds(),
                &mut state.rng,
            ) {
                SelectionOutcome::RosterComplete => return Ok(PickOutcome::RosterComplete),
                SelectionOutcome::PoolExhausted => {
                    return Err(DraftError::PoolExhausted {
                        open_slots: open.len(),
                    })
                }
                SelectionOutcome::Choice(selection) => selection,
            }
        };

        let candidate = state
            .pool
            .candidate_by_season(&selection.season_id)
            .ok_or_else(|| DraftError::UnknownCandidate {
                season_id: selection.season_id.clone(),
            })?;
        let record = build_record(
            session,
            &team_id,
            candidate,
            selection.position,
            selection.slot_index,
        );

        let outcome =
            commit::commit_pick(session, self.pick_log.as_ref(), record, &self.engine.retry)
                .await?;
        self.persist(session).await;
        Ok(outcome)
    }

    /// Commit a human team's explicit choice, under the same turn-legality
    /// and commit-protocol guarantees as the automated path.
    pub async fn request_human_pick(
        &self,
        id: &str,
        season_id: &str,
        position: SlotPosition,
        slot_index: usize,
    ) -> Result<PickOutcome, DraftError> {
        let entry = self.entry(id).await?;
        let mut guard = entry.state.lock().await;
        let state = &mut *guard;
        let session = &mut state.session;

        if session.status != SessionStatus::InProgress {
            return Err(DraftError::SessionNotActive {
                id: session.id.clone(),
                status: session.status,
            });
        }

        let (team_id, control) = {
            let team = session.team_on_clock();
            (team.id.clone(), team.control)
        };
        if control != ControlMode::Human {
            return Err(DraftError::NotYourTurn {
                expected: session.current_pick,
                current: session.current_pick,
            });
        }

        let candidate = state
            .pool
            .candidate_by_season(season_id)
            .ok_or_else(|| DraftError::UnknownCandidate {
                season_id: season_id.to_string(),
            })?;

        let drafted = session.drafted_index();
        if drafted.excludes(candidate) {
            return Err(DraftError::AlreadyDrafted {
                player_id: candidate.player_id.clone(),
            });
        }

        {
            let team = session
                .team(&team_id)
                .ok_or_else(|| DraftError::UnknownTeam {
                    team_id: team_id.clone(),
                })?;
            match team.roster.slot(position, slot_index) {
                None => {
                    return Err(DraftError::UnknownSlot {
                        position,
                        slot_index,
                    })
                }
                Some(slot) if slot.occupant.is_some() => {
                    return Err(DraftError::SlotTaken {
                        position,
                        slot_index,
                    })
                }
                Some(_) => {}
            }
        }

        let thresholds = state.pool.thresholds();
        if !is_eligible(position, candidate, thresholds) {
            let reason = if !meets_playing_time(position, candidate, thresholds) {
                "playing time is below the slot minimum"
            } else {
                "position does not fit this slot"
            };
            return Err(DraftError::Ineligible {
                season_id: season_id.to_string(),
                position,
                reason: reason.to_string(),
            });
        }

        let record = build_record(session, &team_id, candidate, position, slot_index);
        let outcome =
            commit::commit_pick(session, self.pick_log.as_ref(), record, &self.engine.retry)
                .await?;
        self.persist(session).await;
        Ok(outcome)
    }

    /// Drive automated picks until the session leaves `InProgress` or a
    /// human team comes on the clock. Returns the number of picks made.
    pub async fn run_automated(&self, id: &str) -> Result<u32, DraftError> {
        let mut made = 0u32;
        loop {
            let snapshot = self.session_snapshot(id).await?;
            if snapshot.status != SessionStatus::InProgress {
                break;
            }
            if snapshot.team_on_clock().control != ControlMode::Automated {
                break;
            }
            match self.request_cpu_pick(id, snapshot.current_pick).await? {
                PickOutcome::Committed(_) | PickOutcome::AlreadyCommitted(_) => made += 1,
                PickOutcome::RosterComplete => break,
            }
        }
        Ok(made)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// A retried request for a pick number the session has moved past
    /// resolves to the record already in the log.
    async fn resolve_already_committed(
        &self,
        session: &DraftSession,
        expected_pick: u32,
    ) -> Result<Option<PickRecord>, DraftError> {
        if expected_pick == 0 {
            return Err(DraftError::NotYourTurn {
                expected: 0,
                current: session.current_pick,
            });
        }
        if expected_pick >= session.current_pick {
            return Ok(None);
        }
        let existing = self
            .pick_log
            .load_pick(&session.id, expected_pick)
            .await?
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "session {} is past pick {expected_pick} but the log has no record of it",
                    session.id
                ))
            })?;
        Ok(Some(existing))
    }

    /// Snapshot persistence is best effort: the pick log already holds the
    /// durable truth, and a stale snapshot is rebuilt from it on load.
    async fn persist(&self, session: &DraftSession) {
        if let Err(e) = self.session_store.save_session(session).await {
            warn!("failed to persist session {} snapshot: {e}", session.id);
        }
    }
}

fn build_record(
    session: &DraftSession,
    team_id: &str,
    candidate: &Candidate,
    position: SlotPosition,
    slot_index: usize,
) -> PickRecord {
    let pick_number = session.current_pick;
    PickRecord {
        pick_number,
        round: schedule::round_of(pick_number, session.num_teams),
        pick_in_round: schedule::pick_in_round(pick_number, session.num_teams),
        team_id: team_id.to_string(),
        season_id: candidate.season_id.clone(),
        player_id: candidate.player_id.clone(),
        player_name: candidate.name.clone(),
        position,
        slot_index,
    }
}

// ---------------------------------------------------------------------------
// Session actor
// ---------------------------------------------------------------------------

/// One request to a session's worker.
pub enum SessionCommand {
    CpuPick {
        expected_pick: u32,
        respond_to: oneshot::Sender<Result<PickOutcome, DraftError>>,
    },
    HumanPick {
        season_id: String,
        position: SlotPosition,
        slot_index: usize,
        respond_to: oneshot::Sender<Result<PickOutcome, DraftError>>,
    },
}

/// Handle for sending requests to a session's worker task.
#[derive(Clone)]
pub struct SessionClient {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionClient {
    pub async fn cpu_pick(&self, expected_pick: u32) -> Result<PickOutcome, DraftError> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(SessionCommand::CpuPick {
                expected_pick,
                respond_to,
            })
            .await
            .map_err(|_| DraftError::WorkerStopped)?;
        response.await.map_err(|_| DraftError::WorkerStopped)?
    }

    pub async fn human_pick(
        &self,
        season_id: &str,
        position: SlotPosition,
        slot_index: usize,
    ) -> Result<PickOutcome, DraftError> {
        let (respond_to, response) = oneshot::channel();
        self.tx
            .send(SessionCommand::HumanPick {
                season_id: season_id.to_string(),
                position,
                slot_index,
                respond_to,
            })
            .await
            .map_err(|_| DraftError::WorkerStopped)?;
        response.await.map_err(|_| DraftError::WorkerStopped)?
    }
}

/// Spawn the per-session worker: requests drain from the queue one at a
/// time, so a burst of duplicate triggers serializes instead of racing.
/// Dropping every `SessionClient` stops the worker.
pub fn spawn_session_actor(
    service: Arc<DraftService>,
    session_id: String,
    buffer: usize,
) -> SessionClient {
    let (tx, mut rx) = mpsc::channel::<SessionCommand>(buffer);
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                SessionCommand::CpuPick {
                    expected_pick,
                    respond_to,
                } => {
                    let result = service.request_cpu_pick(&session_id, expected_pick).await;
                    // The requester may have gone away; the pick stands.
                    let _ = respond_to.send(result);
                }
                SessionCommand::HumanPick {
                    season_id,
                    position,
                    slot_index,
                    respond_to,
                } => {
                    let result = service
                        .request_human_pick(&session_id, &season_id, position, slot_index)
                        .await;
                    let _ = respond_to.send(result);
                }
            }
        }
        debug!("session worker for {session_id} stopped");
    });
    SessionClient { tx }
}
