// Season fixture ingestion.
//
// Reads historical player-season CSVs into candidates, validating position
// and handedness codes at the boundary. Rating computation happens far
// upstream of this crate; the CSV already carries the scalar.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::draft::position::{Handedness, Position};
use crate::pool::Candidate;

/// One CSV row. Header:
/// `season_id,player_id,name,season,position,rating,pa,ip,saves,bats`
#[derive(Debug, Deserialize)]
struct SeasonRow {
    season_id: String,
    player_id: String,
    name: String,
    season: u16,
    position: String,
    rating: f64,
    pa: u32,
    ip: f64,
    saves: u32,
    bats: String,
}

/// Load season records from a CSV file. Any unrecognized position or
/// handedness code fails the whole load with the offending row named.
pub fn load_seasons_csv(path: &Path) -> Result<Vec<Candidate>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open seasons file {}", path.display()))?;

    let mut candidates = Vec::new();
    for (line, row) in reader.deserialize::<SeasonRow>().enumerate() {
        let row = row.with_context(|| format!("malformed season row {}", line + 2))?;
        let position = Position::parse(&row.position)
            .with_context(|| format!("season {} (row {})", row.season_id, line + 2))?;
        let bats = Handedness::parse(&row.bats)
            .with_context(|| format!("season {} (row {})", row.season_id, line + 2))?;
        candidates.push(Candidate {
            season_id: row.season_id,
            player_id: row.player_id,
            name: row.name,
            season: row.season,
            position,
            rating: row.rating,
            plate_appearances: row.pa,
            innings_pitched: row.ip,
            saves: row.saves,
            bats,
        });
    }

    info!("loaded {} seasons from {}", candidates.len(), path.display());
    Ok(candidates)
}
