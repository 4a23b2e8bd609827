use std::sync::Arc;

use delvebot::infra::{LogCallback, StatusCallback, get_env_var, is_fast};
use delvebot::{DungeonSession, ExplorationConfig, SimulatedDungeon};
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("delvebot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let dungeons = get_env_var::<u32>("DELVE_DUNGEONS").unwrap_or(3);
    let seed = get_env_var::<u64>("DELVE_SEED").unwrap_or(1);
    let size = get_env_var::<i32>("DELVE_SIZE").unwrap_or(7);
    let config = ExplorationConfig::from_env();

    tracing::info!("Dungeons: {}", dungeons);
    tracing::info!("Seed: {}, size: {}x{}", seed, size, size);
    if is_fast() {
        tracing::info!("Running without delays");
    }

    let game = SimulatedDungeon::random(seed, size);
    let mut session = DungeonSession::new(Box::new(game), config);

    let on_log: LogCallback = Arc::new(|line: &str| println!("{}", line));
    let on_status: StatusCallback = Arc::new(|status: &str| tracing::debug!("status: {}", status));
    if !session.start(dungeons, on_log, on_status) {
        return Err("session did not start".into());
    }

    let cancel = session.cancel_handle();
    let mut worker = tokio::task::spawn_blocking(move || {
        session.join();
        session.stats()
    });

    let stats = tokio::select! {
        stats = &mut worker => stats?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping session");
            cancel.cancel();
            worker.await?
        }
    };

    println!(
        "Completed {}/{} dungeons, {} chests ({} rare), {} enemies defeated",
        stats.dungeons_completed,
        stats.dungeons_attempted,
        stats.total_chests_found,
        stats.total_rare_chests,
        stats.total_enemies_defeated
    );

    Ok(())
}
