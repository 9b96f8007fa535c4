//! sessionguard HTTP server.
//!
//! Session-backed login with CSRF protection and throttling.

use sessionguard_auth::stores::{
    AnySessionStore, MemoryAttemptStore, PostgresCredentialRepository,
};
use sessionguard_auth::{ExpirySweeper, LoginService, LoginThrottle};
use sessionguard_web::{AppState, CookieSettings, ServerConfig, TrustProxy, build_router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sessionguard=debug,sqlx=warn,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sessionguard HTTP server");

    // Load configuration
    let config = ServerConfig::from_env();
    info!(
        production = config.auth.production,
        session_backend = config.auth.session.backend.as_str(),
        session_table = %config.auth.session.table,
        trust_proxy = config.trust_proxy,
        "Configuration loaded"
    );

    let Some(database_url) = config.auth.database_url.as_deref() else {
        anyhow::bail!("DATABASE_URL is required for the credential store");
    };

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    info!("Database connected");

    let sessions = AnySessionStore::open(&config.auth, Some(pool.clone())).await?;
    if sessions.backend() != config.auth.session.backend {
        warn!(
            requested = config.auth.session.backend.as_str(),
            active = sessions.backend().as_str(),
            "Session store fell back to a different backend"
        );
    }

    let credentials = PostgresCredentialRepository::new(pool, &config.auth.credentials_table);
    credentials.ensure_table().await?;

    let throttle = LoginThrottle::new(MemoryAttemptStore::new(), config.auth.throttle);
    let login = LoginService::new(credentials, throttle);

    let sweeper = ExpirySweeper::start(sessions.clone(), config.auth.session.sweep_interval);

    let backend = sessions.backend();
    let state = AppState::new(sessions, login, backend);
    let app = build_router(
        state,
        CookieSettings::from_config(&config.auth.session),
        TrustProxy(config.trust_proxy),
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.stop().await;
    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
