// Draft engine entry point: run a fully automated draft end to end.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Open database, ingest fixture seasons if the pool is empty
// 4. Build the draft service
// 5. Create and start an all-automated session
// 6. Drive it to completion through the session worker
// 7. Log the finished rosters

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use barnstorm::config;
use barnstorm::db::Database;
use barnstorm::draft::session::{ControlMode, SessionStatus};
use barnstorm::ingest;
use barnstorm::service::{spawn_session_actor, DraftService, TeamSpec};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("barnstorm starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "config loaded: league={}, {} teams, {} roster slots",
        config.league.name,
        config.league.num_teams,
        config.league.quota.total_slots()
    );

    // 3. Open database, ingest seasons on first run
    let db = Database::open(&config.engine.db_path).context("failed to open database")?;
    if db.season_count()? == 0 {
        let seasons = ingest::load_seasons_csv(Path::new(&config.engine.seasons_path))
            .context("failed to load season data")?;
        db.import_seasons(&seasons)
            .context("failed to import seasons")?;
    }
    info!("candidate pool holds {} seasons", db.season_count()?);
    let db = Arc::new(db);

    // 4. Build the service
    let service = Arc::new(DraftService::new(
        db.clone(),
        db.clone(),
        db,
        config.league.clone(),
        config.engine.clone(),
    ));

    // 5. Create and start a session
    let specs: Vec<TeamSpec> = (1..=config.league.num_teams)
        .map(|i| TeamSpec {
            name: format!("Barnstormers {i}"),
            control: ControlMode::Automated,
        })
        .collect();
    let session_id = service
        .create_session(specs, None)
        .await
        .context("failed to create session")?;
    service
        .start_session(&session_id)
        .await
        .context("failed to start session")?;

    // 6. Run it through the session worker, one request at a time
    let client = spawn_session_actor(Arc::clone(&service), session_id.clone(), 16);
    loop {
        let snapshot = service.session_snapshot(&session_id).await?;
        if snapshot.status != SessionStatus::InProgress {
            break;
        }
        client.cpu_pick(snapshot.current_pick).await?;
    }

    // 7. Summarize
    let finished = service.session_snapshot(&session_id).await?;
    info!(
        "session {} finished as {:?} after {} picks",
        finished.id,
        finished.status,
        finished.filled_picks()
    );
    for team in &finished.teams {
        info!("--- {} ---", team.name);
        for slot in &team.roster.slots {
            match &slot.occupant {
                Some(player) => info!(
                    "  {:>2} #{}: {} ({})",
                    slot.position.code(),
                    slot.slot_index,
                    player.name,
                    player.season_id
                ),
                None => info!("  {:>2} #{}: (open)", slot.position.code(), slot.slot_index),
            }
        }
    }

    Ok(())
}

/// Initialize tracing to stderr, filtered by RUST_LOG.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barnstorm=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;
    Ok(())
}
