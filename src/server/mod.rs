//! Process bootstrap: logging, store connection and the HTTP listeners.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DbErr};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::services::{HabitStore, MemoryHabitStore, SeaOrmHabitStore, ensure_schema};
use crate::web::{AppState, create_admin_axum_router, create_axum_router};

pub mod config;

use config::ServerConfig;

/// Database URLs with this prefix select the in-process store.
pub const MEMORY_URL_SCHEME: &str = "memory://";

pub fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

/// Builds the single store handle shared by every request.
///
/// SQL connections are lazy, so the server still comes up when the database is
/// down; the health check then reports it as disconnected.
pub async fn connect_store(config: &ServerConfig) -> Result<Arc<dyn HabitStore>, DbErr> {
    if config.database_url.starts_with(MEMORY_URL_SCHEME) {
        warn!("Using the in-memory habit store; records are lost on exit.");
        return Ok(Arc::new(MemoryHabitStore::new()));
    }

    let mut opt = ConnectOptions::new(config.database_url.to_owned());
    opt.max_connections(config.max_connections)
        .connect_lazy(true)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    match ensure_schema(&db).await {
        Ok(()) => info!("Connected to record store."),
        Err(e) => error!(error = %e, "Could not prepare the habit schema; store calls will fail until it is reachable."),
    }

    Ok(Arc::new(SeaOrmHabitStore::new(db)))
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store = connect_store(&config).await?;
    let app_state = AppState::new(store);

    let app = create_axum_router(app_state.clone(), config.admin_on_main_listener());
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        admin_routes = config.admin_on_main_listener(),
        "HTTP server listening"
    );
    if !config.admin_routes_enabled() {
        info!("Admin routes are disabled.");
    }

    let main_server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    match &config.admin_bind {
        Some(admin_addr) => {
            let admin_listener = TcpListener::bind(admin_addr).await?;
            info!(address = %admin_addr, "Admin server listening");
            let admin_server = axum::serve(admin_listener, create_admin_axum_router(app_state))
                .with_graceful_shutdown(shutdown_signal());
            tokio::try_join!(main_server.into_future(), admin_server.into_future())?;
        }
        None => main_server.await?,
    }

    info!("Server shut down.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
