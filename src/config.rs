// Configuration loading and parsing (league.toml, engine.toml).
//
// Every tuning number the selection engine uses lives here rather than in
// code: scarcity weights, the round ramp, volume thresholds, platoon
// bonuses, jitter, pool reserves, eligibility floors, and the retry policy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::commit::RetryPolicy;
use crate::draft::eligibility::EligibilityThresholds;
use crate::draft::position::SlotPosition;
use crate::draft::roster::RosterQuota;
use crate::pool::{PoolReserves, SeasonFilter};
use crate::select::{ScarcityWeights, SelectionConfig, VolumeCurve};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueSettings,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone)]
pub struct LeagueSettings {
    pub name: String,
    pub num_teams: u32,
    pub quota: RosterQuota,
    pub seasons: SeasonFilter,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub selection: SelectionConfig,
    pub thresholds: EligibilityThresholds,
    pub reserves: PoolReserves,
    pub retry: RetryPolicy,
    /// Page size for candidate-source listing.
    pub page_size: usize,
    pub db_path: String,
    pub seasons_path: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LeagueFile {
    league: LeagueSection,
}

#[derive(Debug, Deserialize)]
struct LeagueSection {
    name: String,
    num_teams: u32,
    /// Slot code -> count, e.g. `{"C": 1, "OF": 3, "SP": 4, "BE": 2}`.
    roster: HashMap<String, usize>,
    #[serde(default)]
    seasons: SeasonsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SeasonsSection {
    min: Option<u16>,
    max: Option<u16>,
}

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EngineFile {
    selection: SelectionSection,
    eligibility: EligibilityThresholds,
    pool: PoolSection,
    retry: RetryPolicy,
    database: DatabaseSection,
    data: DataSection,
}

#[derive(Debug, Deserialize)]
struct SelectionSection {
    jitter: f64,
    early_round_adjust: f64,
    late_round_adjust: f64,
    platoon_minority_bonus: f64,
    platoon_switch_bonus: f64,
    /// Slot code -> base scarcity weight.
    scarcity: HashMap<String, f64>,
    volume: VolumeCurve,
}

#[derive(Debug, Deserialize)]
struct PoolSection {
    hitter_reserve: usize,
    pitcher_reserve: usize,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Deserialize)]
struct DataSection {
    seasons: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/engine.toml` relative to `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path,
            source: e,
        })?;

    let engine_path = config_dir.join("engine.toml");
    let engine_text = read_file(&engine_path)?;
    let engine_file: EngineFile =
        toml::from_str(&engine_text).map_err(|e| ConfigError::ParseError {
            path: engine_path,
            source: e,
        })?;

    let config = assemble(league_file, engine_file)?;
    validate(&config)?;
    Ok(config)
}

fn assemble(league: LeagueFile, engine: EngineFile) -> Result<Config, ConfigError> {
    let quota =
        RosterQuota::from_codes(&league.league.roster).map_err(|e| ConfigError::ValidationError {
            field: "league.roster".into(),
            message: e.to_string(),
        })?;

    let mut weights = HashMap::new();
    for (code, weight) in &engine.selection.scarcity {
        let position = SlotPosition::parse(code).map_err(|e| ConfigError::ValidationError {
            field: "selection.scarcity".into(),
            message: e.to_string(),
        })?;
        weights.insert(position, *weight);
    }

    Ok(Config {
        league: LeagueSettings {
            name: league.league.name,
            num_teams: league.league.num_teams,
            quota,
            seasons: SeasonFilter {
                min_season: league.league.seasons.min,
                max_season: league.league.seasons.max,
            },
        },
        engine: EngineSettings {
            selection: SelectionConfig {
                jitter: engine.selection.jitter,
                early_round_adjust: engine.selection.early_round_adjust,
                late_round_adjust: engine.selection.late_round_adjust,
                platoon_minority_bonus: engine.selection.platoon_minority_bonus,
                platoon_switch_bonus: engine.selection.platoon_switch_bonus,
                scarcity: ScarcityWeights::new(weights),
                volume: engine.selection.volume,
            },
            thresholds: engine.eligibility,
            reserves: PoolReserves {
                hitter_reserve: engine.pool.hitter_reserve,
                pitcher_reserve: engine.pool.pitcher_reserve,
            },
            retry: engine.retry,
            page_size: engine.pool.page_size,
            db_path: engine.database.path,
            seasons_path: engine.data.seasons,
        },
    })
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.num_teams == 0 {
        return Err(invalid("league.num_teams", "must be greater than 0"));
    }
    if league.quota.total_slots() == 0 {
        return Err(invalid("league.roster", "must define at least one slot"));
    }
    if let (Some(min), Some(max)) = (league.seasons.min_season, league.seasons.max_season) {
        if min > max {
            return Err(invalid(
                "league.seasons",
                format!("min {min} is after max {max}"),
            ));
        }
    }

    let sel = &config.engine.selection;
    if !(0.0..1.0).contains(&sel.jitter) {
        return Err(invalid(
            "selection.jitter",
            format!("must be in [0.0, 1.0), got {}", sel.jitter),
        ));
    }
    for (field, value) in [
        ("selection.early_round_adjust", sel.early_round_adjust),
        ("selection.late_round_adjust", sel.late_round_adjust),
    ] {
        if value <= -1.0 {
            return Err(invalid(field, format!("must be greater than -1.0, got {value}")));
        }
    }
    for (field, value) in [
        ("selection.platoon_minority_bonus", sel.platoon_minority_bonus),
        ("selection.platoon_switch_bonus", sel.platoon_switch_bonus),
    ] {
        if value <= 0.0 {
            return Err(invalid(field, format!("must be > 0, got {value}")));
        }
    }
    for (position, weight) in sel.scarcity.iter() {
        if *weight <= 0.0 {
            return Err(invalid(
                "selection.scarcity",
                format!("weight for {position} must be > 0, got {weight}"),
            ));
        }
    }

    let v = &sel.volume;
    let pairs = [
        ("selection.volume.qualifying_pa", v.qualifying_pa, v.heavy_pa),
        ("selection.volume.qualifying_ip", v.qualifying_ip, v.heavy_ip),
        (
            "selection.volume.rp_qualifying_ip",
            v.rp_qualifying_ip,
            v.rp_heavy_ip,
        ),
    ];
    for (field, qualifying, heavy) in pairs {
        if qualifying <= 0.0 {
            return Err(invalid(field, format!("must be > 0, got {qualifying}")));
        }
        if heavy < qualifying {
            return Err(invalid(
                field,
                format!("heavy bar {heavy} must be at or above the qualifying bar {qualifying}"),
            ));
        }
    }
    if v.heavy_bonus <= 0.0 {
        return Err(invalid("selection.volume.heavy_bonus", "must be > 0"));
    }
    if !(0.0..=1.0).contains(&v.light_floor) || v.light_floor == 0.0 {
        return Err(invalid(
            "selection.volume.light_floor",
            format!("must be in (0.0, 1.0], got {}", v.light_floor),
        ));
    }

    let t = &config.engine.thresholds;
    if t.min_plate_appearances == 0 {
        return Err(invalid("eligibility.min_plate_appearances", "must be > 0"));
    }
    if t.min_sp_innings <= 0.0 {
        return Err(invalid("eligibility.min_sp_innings", "must be > 0"));
    }
    if t.min_rp_innings <= 0.0 {
        return Err(invalid("eligibility.min_rp_innings", "must be > 0"));
    }

    let reserves = &config.engine.reserves;
    let hitter_demand = league.num_teams as usize * league.quota.hitting_slots();
    let pitcher_demand = league.num_teams as usize * league.quota.pitching_slots();
    if reserves.hitter_reserve <= hitter_demand {
        return Err(invalid(
            "pool.hitter_reserve",
            format!("must exceed league hitting demand {hitter_demand}"),
        ));
    }
    if reserves.pitcher_reserve <= pitcher_demand {
        return Err(invalid(
            "pool.pitcher_reserve",
            format!("must exceed league pitching demand {pitcher_demand}"),
        ));
    }
    if config.engine.page_size == 0 {
        return Err(invalid("pool.page_size", "must be > 0"));
    }

    let retry = &config.engine.retry;
    if retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts", "must be at least 1"));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        return Err(invalid(
            "retry.base_delay_ms",
            format!(
                "base delay {} exceeds max delay {}",
                retry.base_delay_ms, retry.max_delay_ms
            ),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
