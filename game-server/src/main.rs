use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use game_persistence::connection::connect_and_migrate;
use game_server::{
    build_orchestrator, config::Config, create_routes, word_pool::WordSource,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Intesa server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if config.uses_default_api_key() {
        warn!("INTESA_API_KEY is not set, using the default development key");
    }

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize database connection and run migrations
    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    info!("Reading words from {}", config.words_file.display());
    if !config.words_file.exists() {
        warn!(
            "Word list {} does not exist yet; every start will report no words",
            config.words_file.display()
        );
    }

    let orchestrator = build_orchestrator(
        db,
        &config,
        WordSource::File(config.words_file.clone()),
    );
    let routes = create_routes(orchestrator.clone(), config.transport());

    // Start cleanup task
    let connections = orchestrator.connections().clone();
    let connection_timeout = config.connection_timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let removed = connections
                .cleanup_inactive_connections(connection_timeout)
                .await;
            if removed > 0 {
                info!("Reaped {} idle connections", removed);
            }
        }
    });

    info!("Server starting on {}", addr);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (mut sigint, mut sigterm) = match (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            _ => {
                error!("Failed to install signal handlers; shutdown needs a kill");
                std::future::pending::<()>().await;
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
