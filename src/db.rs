// SQLite persistence: candidate tables, the durable pick log, and session
// snapshots.
//
// One `Database` value implements all three store traits. The pick log's
// composite primary key (session_id, pick_number) is the durable
// at-most-once constraint the commit protocol leans on.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode};

use crate::draft::pick::PickRecord;
use crate::draft::position::{Handedness, Position, SlotPosition};
use crate::draft::session::DraftSession;
use crate::pool::{Candidate, PositionCategory, SeasonFilter};
use crate::store::{
    AppendOutcome, CandidateSource, Page, PickLogStore, SessionStore, StoreError,
};

/// SQLite-backed storage for players, seasons, draft picks, and session
/// snapshots.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                player_id TEXT PRIMARY KEY,
                name      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS seasons (
                season_id         TEXT PRIMARY KEY,
                player_id         TEXT NOT NULL REFERENCES players(player_id),
                season            INTEGER NOT NULL,
                position          TEXT NOT NULL,
                rating            REAL NOT NULL,
                plate_appearances INTEGER NOT NULL,
                innings_pitched   REAL NOT NULL,
                saves             INTEGER NOT NULL,
                bats              TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_seasons_rating
                ON seasons(rating DESC);

            CREATE TABLE IF NOT EXISTS draft_picks (
                session_id    TEXT NOT NULL,
                pick_number   INTEGER NOT NULL,
                round         INTEGER NOT NULL,
                pick_in_round INTEGER NOT NULL,
                team_id       TEXT NOT NULL,
                season_id     TEXT NOT NULL,
                player_id     TEXT NOT NULL,
                player_name   TEXT NOT NULL,
                position      TEXT NOT NULL,
                slot_index    INTEGER NOT NULL,
                committed_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (session_id, pick_number)
            );

            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                snapshot   TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Number of season records in the pool tables.
    pub fn season_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM seasons", [], |row| row.get(0))
            .context("failed to count seasons")?;
        Ok(count as usize)
    }

    /// Import candidates in a single transaction. Player rows are upserted
    /// so repeated imports refresh names without duplicating identities.
    pub fn import_seasons(&self, candidates: &[Candidate]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for c in candidates {
            tx.execute(
                "INSERT INTO players (player_id, name) VALUES (?1, ?2)
                 ON CONFLICT(player_id) DO UPDATE SET name = excluded.name",
                params![c.player_id, c.name],
            )
            .context("failed to upsert player")?;

            tx.execute(
                "INSERT OR REPLACE INTO seasons
                    (season_id, player_id, season, position, rating,
                     plate_appearances, innings_pitched, saves, bats)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    c.season_id,
                    c.player_id,
                    c.season,
                    c.position.code(),
                    c.rating,
                    c.plate_appearances,
                    c.innings_pitched,
                    c.saves,
                    c.bats.code(),
                ],
            )
            .context("failed to insert season")?;
        }

        tx.commit().context("failed to commit season import")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_sqlite(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(inner, _)
            if matches!(inner.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            StoreError::Busy(e.to_string())
        }
        _ => StoreError::Io(e.to_string()),
    }
}

fn row_to_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Candidate, String, String)> {
    // Position and handedness codes are validated after the row closure so
    // unknown codes surface as typed corruption errors, not silent drops.
    let position_code: String = row.get(4)?;
    let bats_code: String = row.get(9)?;
    let candidate = Candidate {
        season_id: row.get(0)?,
        player_id: row.get(1)?,
        name: row.get(2)?,
        season: row.get::<_, i64>(3)? as u16,
        position: Position::Catcher, // placeholder until code is parsed
        rating: row.get(5)?,
        plate_appearances: row.get::<_, i64>(6)? as u32,
        innings_pitched: row.get(7)?,
        saves: row.get::<_, i64>(8)? as u32,
        bats: Handedness::Right, // placeholder until code is parsed
    };
    Ok((candidate, position_code, bats_code))
}

const PITCHER_CODES: &str = "('P','SP','RP','CL')";

#[async_trait]
impl CandidateSource for Database {
    async fn list_candidates(
        &self,
        filter: &SeasonFilter,
        category: PositionCategory,
        page: Page,
    ) -> Result<Vec<Candidate>, StoreError> {
        let category_clause = match category {
            PositionCategory::Pitcher => format!("position IN {PITCHER_CODES}"),
            PositionCategory::Hitter => format!("position NOT IN {PITCHER_CODES}"),
        };
        let sql = format!(
            "SELECT s.season_id, s.player_id, p.name, s.season, s.position, s.rating,
                    s.plate_appearances, s.innings_pitched, s.saves, s.bats
             FROM seasons s JOIN players p ON p.player_id = s.player_id
             WHERE {category_clause}
               AND s.season >= COALESCE(?1, s.season)
               AND s.season <= COALESCE(?2, s.season)
             ORDER BY s.rating DESC, s.season_id
             LIMIT ?3 OFFSET ?4"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite)?;
        let rows = stmt
            .query_map(
                params![
                    filter.min_season,
                    filter.max_season,
                    page.limit as i64,
                    page.offset as i64
                ],
                row_to_candidate,
            )
            .map_err(map_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for (mut candidate, position_code, bats_code) in rows {
            candidate.position = Position::parse(&position_code).map_err(|e| {
                StoreError::Corrupt(format!("season {}: {e}", candidate.season_id))
            })?;
            candidate.bats = Handedness::parse(&bats_code).map_err(|e| {
                StoreError::Corrupt(format!("season {}: {e}", candidate.season_id))
            })?;
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}

fn row_to_pick(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PickRecord, String)> {
    let position_code: String = row.get(7)?;
    let record = PickRecord {
        pick_number: row.get(0)?,
        round: row.get(1)?,
        pick_in_round: row.get(2)?,
        team_id: row.get(3)?,
        season_id: row.get(4)?,
        player_id: row.get(5)?,
        player_name: row.get(6)?,
        position: SlotPosition::Bench, // placeholder until code is parsed
        slot_index: row.get::<_, i64>(8)? as usize,
    };
    Ok((record, position_code))
}

fn finish_pick((mut record, position_code): (PickRecord, String)) -> Result<PickRecord, StoreError> {
    record.position = SlotPosition::parse(&position_code)
        .map_err(|e| StoreError::Corrupt(format!("pick {}: {e}", record.pick_number)))?;
    Ok(record)
}

const PICK_COLUMNS: &str = "pick_number, round, pick_in_round, team_id, season_id, \
                            player_id, player_name, position, slot_index";

#[async_trait]
impl PickLogStore for Database {
    async fn append_pick(
        &self,
        session_id: &str,
        record: &PickRecord,
    ) -> Result<AppendOutcome, StoreError> {
        let conn = self.conn();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO draft_picks
                    (session_id, pick_number, round, pick_in_round, team_id,
                     season_id, player_id, player_name, position, slot_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session_id,
                    record.pick_number,
                    record.round,
                    record.pick_in_round,
                    record.team_id,
                    record.season_id,
                    record.player_id,
                    record.player_name,
                    record.position.code(),
                    record.slot_index as i64,
                ],
            )
            .map_err(map_sqlite)?;
        if inserted == 1 {
            Ok(AppendOutcome::Committed)
        } else {
            Ok(AppendOutcome::Duplicate)
        }
    }

    async fn load_pick(
        &self,
        session_id: &str,
        pick_number: u32,
    ) -> Result<Option<PickRecord>, StoreError> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {PICK_COLUMNS} FROM draft_picks
             WHERE session_id = ?1 AND pick_number = ?2"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite)?;
        let mut rows = stmt
            .query_map(params![session_id, pick_number], row_to_pick)
            .map_err(map_sqlite)?;
        match rows.next() {
            Some(row) => Ok(Some(finish_pick(row.map_err(map_sqlite)?)?)),
            None => Ok(None),
        }
    }

    async fn load_picks(&self, session_id: &str) -> Result<Vec<PickRecord>, StoreError> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {PICK_COLUMNS} FROM draft_picks
             WHERE session_id = ?1 ORDER BY pick_number"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite)?;
        let rows = stmt
            .query_map(params![session_id], row_to_pick)
            .map_err(map_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite)?;
        rows.into_iter().map(finish_pick).collect()
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn load_session(&self, id: &str) -> Result<Option<DraftSession>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT snapshot FROM sessions WHERE session_id = ?1")
            .map_err(map_sqlite)?;
        let mut rows = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))
            .map_err(map_sqlite)?;
        match rows.next() {
            Some(row) => {
                let json = row.map_err(map_sqlite)?;
                let session: DraftSession = serde_json::from_str(&json).map_err(|e| {
                    StoreError::Corrupt(format!("session {id} snapshot: {e}"))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save_session(&self, session: &DraftSession) -> Result<(), StoreError> {
        let json = serde_json::to_string(session)
            .map_err(|e| StoreError::Corrupt(format!("session {} snapshot: {e}", session.id)))?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (session_id, snapshot, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(session_id) DO UPDATE SET
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at",
            params![session.id, json],
        )
        .map_err(map_sqlite)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::roster::{Roster, RosterQuota};
    use crate::draft::session::{ControlMode, Team};

    const TEST_SESSION: &str = "sess_db_test";

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_candidate(season_id: &str, player_id: &str, position: Position, rating: f64) -> Candidate {
        Candidate {
            season_id: season_id.into(),
            player_id: player_id.into(),
            name: format!("Player {player_id}"),
            season: 1936,
            position,
            rating,
            plate_appearances: 550,
            innings_pitched: if position.is_pitcher() { 240.0 } else { 0.0 },
            saves: 0,
            bats: Handedness::Left,
        }
    }

    fn sample_pick(pick_number: u32) -> PickRecord {
        PickRecord {
            pick_number,
            round: 1,
            pick_in_round: pick_number,
            team_id: "team-1".into(),
            season_id: format!("season_{pick_number}"),
            player_id: format!("player_{pick_number}"),
            player_name: format!("Player {pick_number}"),
            position: SlotPosition::OutField,
            slot_index: 0,
        }
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        assert!(tables.contains(&"players".to_string()));
        assert!(tables.contains(&"seasons".to_string()));
        assert!(tables.contains(&"draft_picks".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
    }

    #[tokio::test]
    async fn list_candidates_orders_by_rating_and_splits_categories() {
        let db = test_db();
        db.import_seasons(&[
            sample_candidate("foxx_1933", "foxx", Position::FirstBase, 88.0),
            sample_candidate("gehrig_1927", "gehrig", Position::FirstBase, 96.0),
            sample_candidate("grove_1931", "grove", Position::StartingPitcher, 94.0),
        ])
        .unwrap();

        let hitters = db
            .list_candidates(&SeasonFilter::default(), PositionCategory::Hitter, Page::first(10))
            .await
            .unwrap();
        assert_eq!(hitters.len(), 2);
        assert_eq!(hitters[0].season_id, "gehrig_1927");
        assert_eq!(hitters[1].season_id, "foxx_1933");

        let pitchers = db
            .list_candidates(&SeasonFilter::default(), PositionCategory::Pitcher, Page::first(10))
            .await
            .unwrap();
        assert_eq!(pitchers.len(), 1);
        assert_eq!(pitchers[0].season_id, "grove_1931");
    }

    #[tokio::test]
    async fn list_candidates_honors_season_filter() {
        let db = test_db();
        let mut early = sample_candidate("young_1901", "young", Position::StartingPitcher, 90.0);
        early.season = 1901;
        let mut late = sample_candidate("seaver_1971", "seaver", Position::StartingPitcher, 91.0);
        late.season = 1971;
        db.import_seasons(&[early, late]).unwrap();

        let filter = SeasonFilter {
            min_season: Some(1950),
            max_season: None,
        };
        let found = db
            .list_candidates(&filter, PositionCategory::Pitcher, Page::first(10))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].season_id, "seaver_1971");
    }

    #[tokio::test]
    async fn list_candidates_pages_without_truncation() {
        let db = test_db();
        let candidates: Vec<Candidate> = (0..25)
            .map(|i| {
                sample_candidate(
                    &format!("h{i:02}_1950"),
                    &format!("h{i:02}"),
                    Position::OutField,
                    90.0 - i as f64,
                )
            })
            .collect();
        db.import_seasons(&candidates).unwrap();

        let mut page = Page::first(10);
        let mut all = Vec::new();
        loop {
            let batch = db
                .list_candidates(&SeasonFilter::default(), PositionCategory::Hitter, page)
                .await
                .unwrap();
            let len = batch.len();
            all.extend(batch);
            if len < 10 {
                break;
            }
            page = page.next();
        }
        assert_eq!(all.len(), 25);
        // Strictly descending ratings across page boundaries.
        assert!(all.windows(2).all(|w| w[0].rating >= w[1].rating));
    }

    #[tokio::test]
    async fn unknown_position_code_is_rejected_loudly() {
        let db = test_db();
        {
            let conn = db.conn();
            conn.execute(
                "INSERT INTO players (player_id, name) VALUES ('x', 'X')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO seasons (season_id, player_id, season, position, rating,
                                      plate_appearances, innings_pitched, saves, bats)
                 VALUES ('x_1950', 'x', 1950, 'Qb', 80.0, 500, 0.0, 0, 'R')",
                [],
            )
            .unwrap();
        }
        let err = db
            .list_candidates(&SeasonFilter::default(), PositionCategory::Hitter, Page::first(10))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)), "{err:?}");
    }

    #[tokio::test]
    async fn append_pick_commits_then_reports_duplicate() {
        let db = test_db();
        let pick = sample_pick(1);
        assert_eq!(
            db.append_pick(TEST_SESSION, &pick).await.unwrap(),
            AppendOutcome::Committed
        );
        // Same pick number again, even with a different payload.
        let mut rival = sample_pick(1);
        rival.season_id = "someone_else_1950".into();
        assert_eq!(
            db.append_pick(TEST_SESSION, &rival).await.unwrap(),
            AppendOutcome::Duplicate
        );
        // The original row is untouched.
        let stored = db.load_pick(TEST_SESSION, 1).await.unwrap().unwrap();
        assert_eq!(stored.season_id, "season_1");
    }

    #[tokio::test]
    async fn concurrent_appends_yield_one_commit() {
        let db = std::sync::Arc::new(test_db());
        let a = sample_pick(1);
        let mut b = sample_pick(1);
        b.season_id = "rival_1950".into();

        let (ra, rb) = tokio::join!(
            db.append_pick(TEST_SESSION, &a),
            db.append_pick(TEST_SESSION, &b)
        );
        let outcomes = [ra.unwrap(), rb.unwrap()];
        let commits = outcomes
            .iter()
            .filter(|o| **o == AppendOutcome::Committed)
            .count();
        assert_eq!(commits, 1);
        assert_eq!(db.load_picks(TEST_SESSION).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pick_round_trip_preserves_every_field() {
        let db = test_db();
        let pick = PickRecord {
            pick_number: 9,
            round: 3,
            pick_in_round: 1,
            team_id: "team-3".into(),
            season_id: "paige_1952".into(),
            player_id: "paige".into(),
            player_name: "Satchel Paige".into(),
            position: SlotPosition::Closer,
            slot_index: 0,
        };
        db.append_pick(TEST_SESSION, &pick).await.unwrap();
        let loaded = db.load_pick(TEST_SESSION, 9).await.unwrap().unwrap();
        assert_eq!(loaded, pick);
        // The identities and slot keys roster reconstruction depends on.
        assert_eq!(loaded.player_id, "paige");
        assert_eq!(loaded.season_id, "paige_1952");
        assert_eq!(loaded.position, SlotPosition::Closer);
        assert_eq!(loaded.slot_index, 0);
        assert_eq!(loaded.round, 3);
        assert_eq!(loaded.pick_in_round, 1);
        assert_eq!(loaded.team_id, "team-3");
    }

    #[tokio::test]
    async fn picks_are_scoped_by_session() {
        let db = test_db();
        db.append_pick("sess_a", &sample_pick(1)).await.unwrap();
        db.append_pick("sess_a", &sample_pick(2)).await.unwrap();
        db.append_pick("sess_b", &sample_pick(1)).await.unwrap();

        assert_eq!(db.load_picks("sess_a").await.unwrap().len(), 2);
        assert_eq!(db.load_picks("sess_b").await.unwrap().len(), 1);
        assert!(db.load_pick("sess_c", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_snapshot_round_trip() {
        let db = test_db();
        let quota = RosterQuota::from_counts(vec![
            (SlotPosition::Catcher, 1),
            (SlotPosition::OutField, 1),
        ]);
        let teams = (1..=2)
            .map(|i| Team {
                id: format!("team-{i}"),
                name: format!("Team {i}"),
                control: ControlMode::Automated,
                draft_position: i,
                roster: Roster::new(&quota),
            })
            .collect();
        let mut session = DraftSession::new(
            "sess_snapshot".into(),
            teams,
            99,
            SeasonFilter {
                min_season: Some(1901),
                max_season: Some(1976),
            },
        )
        .unwrap();
        session.start().unwrap();

        db.save_session(&session).await.unwrap();
        let loaded = db.load_session("sess_snapshot").await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.status, session.status);
        assert_eq!(loaded.jitter_seed, 99);
        assert_eq!(loaded.season_filter, session.season_filter);
        assert_eq!(loaded.pick_slots.len(), 4);

        // Overwrite works.
        session.pause().unwrap();
        db.save_session(&session).await.unwrap();
        let reloaded = db.load_session("sess_snapshot").await.unwrap().unwrap();
        assert_eq!(reloaded.status, session.status);
    }

    #[tokio::test]
    async fn load_session_missing_returns_none() {
        let db = test_db();
        assert!(db.load_session("sess_nope").await.unwrap().is_none());
    }

    #[test]
    fn import_is_idempotent_per_season() {
        let db = test_db();
        let c = sample_candidate("ott_1938", "ott", Position::OutField, 87.0);
        db.import_seasons(std::slice::from_ref(&c)).unwrap();
        db.import_seasons(std::slice::from_ref(&c)).unwrap();
        assert_eq!(db.season_count().unwrap(), 1);
    }
}
