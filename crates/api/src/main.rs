use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use clubhouse_api::{
    app::{self, AppState, Stores},
    config::Config,
    jobs::{JobScheduler, PoolMetricsJob, RateLimitCleanupJob, SessionCleanupJob},
    middleware,
    services::EmailService,
};
use domain::repositories::SystemClock;
use persistence::repositories::SessionRepository;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    middleware::logging::init_logging(&config.logging)
        .context("Failed to initialize logging")?;
    middleware::init_metrics().context("Failed to initialize metrics")?;

    info!("Starting Clubhouse API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let mailer = EmailService::new(&config.email).context("Failed to set up email delivery")?;
    info!(transport = ?config.email.transport, "Email delivery configured");

    let addr = config.socket_addr()?;
    let state = AppState::new(
        config,
        Stores::postgres(pool.clone()),
        Arc::new(mailer),
        Arc::new(SystemClock),
    );

    let mut scheduler = JobScheduler::new();
    scheduler.register(SessionCleanupJob::new(
        Arc::new(SessionRepository::new(pool.clone())),
        state.clock.clone(),
    ));
    scheduler.register(RateLimitCleanupJob::new(state.sign_in_limiter.clone()));
    scheduler.register(PoolMetricsJob::new(pool));
    scheduler.start();

    let app = app::create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown(Duration::from_secs(10)).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
