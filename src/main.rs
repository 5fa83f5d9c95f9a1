//! Hawkeye CLI
//!
//! Captures a `before` snapshot, waits for Ctrl+C (or SIGTERM), captures an
//! `after` snapshot and prints what changed in between.
//!
//! Configuration comes from the environment (or `.env`):
//! - `DATABASE_URL` or `DB_HOST` / `DB_PORT` / `DB_USER` / `DB_PASSWORD` / `DB_NAME`
//! - `HAWKEYE_TABLES`: comma-separated tables, all tables when unset
//! - `HAWKEYE_PROBES`: comma-separated bundled probes
//! - `HAWKEYE_LOG_LEVEL`: threshold for printed events

use hawkeye_db::config::Settings;
use hawkeye_db::db::{self, PgDatabase};
use hawkeye_db::{CatalogProbeSource, Hawkeye};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::load()?;
    info!("Configuration loaded, probes: {:?}", settings.hawkeye.probes);

    let pool = db::create_pool(&settings.database)?;
    let database = PgDatabase::new(pool);
    database.ping().await?;
    info!("Connected to {}", settings.database.database);

    let mut hawkeye = Hawkeye::builder(Arc::new(database))
        .config(settings.hawkeye.probe_config())
        .log_level(settings.hawkeye.log_level)
        .source(CatalogProbeSource::new(settings.hawkeye.probes.clone()))
        .build()
        .await?;

    hawkeye.capture_snapshot(Some("before")).await?;
    info!(
        "Watching {} tables, press Ctrl+C to capture the after snapshot",
        hawkeye.options().tables.len()
    );

    shutdown_signal().await?;

    hawkeye.capture_snapshot(Some("after")).await?;
    let diff = hawkeye.diff_named("before", "after")?;
    print!("{}", hawkeye.render_diff(Some(&diff))?);

    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,hawkeye_db=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
    Ok(())
}
