use std::{sync::Arc, time::Duration};

use tokio::signal;
use tracing_subscriber::EnvFilter;

use tenderdesk::{
    auth::jwt::JwtService, config::AppConfig, db, default_handlers, state::AppState, Scheduler,
    Worker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "worker",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let jwt = JwtService::from_config(&config)?;

    let worker_poll = Duration::from_secs(config.worker_poll_seconds);
    let scheduler_poll = Duration::from_secs(config.scheduler_poll_seconds);

    let state = Arc::new(AppState::new(pool, config, jwt));
    let worker = Worker::new(state.clone(), default_handlers(), worker_poll);
    let scheduler = Scheduler::new(state, scheduler_poll);

    tokio::select! {
        _ = worker.run() => {}
        _ = scheduler.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("worker received shutdown signal");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
