use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

use ashenmoor_server::config::Config;
use ashenmoor_server::db::Db;
use ashenmoor_server::game::GameServer;
use ashenmoor_server::net;
use ashenmoor_server::world::World;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    ashenmoor_core::initialize_logger(config.log_level, config.log_file.as_deref())?;

    log::info!("Starting Ashenmoor server.");
    log::info!("Process PID: {}", std::process::id());

    // Single-threaded cooperative scheduling: every piece of world-mutating
    // code runs on this one runtime thread and yields only at I/O.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let db = Db::connect(&config.database_url).await?;
    log::info!("Database open at {}.", config.database_url);

    let world = World::build(db.clone()).await?;

    let listener = TcpListener::bind(config.bind_addr()).await?;
    log::info!("Listening on {}.", config.bind_addr());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener_task =
        tokio::task::spawn_local(net::run_listener(listener, events_tx, shutdown_rx.clone()));
    let game_task =
        tokio::task::spawn_local(GameServer::new(world, events_rx, shutdown_rx, config.tick_secs).run());

    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown signal received; stopping listener and draining sessions.");
    let _ = shutdown_tx.send(true);

    if let Err(e) = listener_task.await {
        log::warn!("Listener task ended abnormally: {e}");
    }
    if let Err(e) = game_task.await {
        log::warn!("Game task ended abnormally: {e}");
    }

    db.close().await;
    log::info!("Goodnight.");
    Ok(())
}
