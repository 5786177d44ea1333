//! # Vaultcord API Server
//!
//! Dashboard backend: serves Discord data through the response cache and the
//! rate-limited request queue.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Vaultcord API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to build application state");
        std::io::Error::other(e)
    })?;

    #[cfg(feature = "scheduler")]
    let _scheduler = start_scheduler(&config, &state).await;

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

/// Start the cache sweep. A scheduler failure is logged and the server runs without it.
#[cfg(feature = "scheduler")]
async fn start_scheduler(config: &AppConfig, state: &AppState) -> Option<background::Scheduler> {
    use background::{Scheduler, SchedulerConfig};

    let scheduler = Scheduler::new(SchedulerConfig::from_env()).await;
    let result = match scheduler {
        Ok(scheduler) => scheduler
            .register_cache_sweep(&config.cache_cleanup_schedule, state.cache.clone())
            .await
            .map(|()| scheduler),
        Err(e) => Err(e),
    };

    let scheduler = match result {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register cache sweep");
            return None;
        }
    };

    if let Err(e) = scheduler.start().await {
        tracing::error!(error = %e, "Failed to start scheduler");
        return None;
    }
    Some(scheduler)
}
