use actix_web::{web, App, HttpServer};
use tracing::{error, info};

mod config;
mod handlers;
mod logging;
mod middleware;
mod routes;
mod state;
mod workers;

use config::ApiConfig;
use middleware::{setup_cors, ErrorHandler, RequestId};
use state::AppState;
use workers::{Dispatcher, StatusPoller, StuckLeaseReaper};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match ApiConfig::from_env() {
        Ok(config) => {
            if let Err(e) = config.validate() {
                eprintln!("configuration validation failed: {e}");
                std::process::exit(1);
            }
            config
        }
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!(
        "starting sms-api v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.server_address()
    );

    let app_state = match AppState::new(config.clone()).await {
        Ok(state) => {
            info!("application state initialized");
            state
        }
        Err(e) => {
            error!("failed to initialize application state: {e}");
            std::process::exit(1);
        }
    };

    spawn_background_workers(&app_state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(RequestId)
            .wrap(ErrorHandler)
            .wrap(setup_cors(&app_state.config.cors))
            .configure(routes::configure_routes)
    });

    let server = if let Some(workers) = config.server.workers {
        info!(workers, "setting worker thread count");
        server.workers(workers)
    } else {
        server
    };

    let server = server.bind(&config.server_address())?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server.run());

    info!("sms-api ready and listening on {}", config.server_address());

    shutdown_signal().await;
    info!("sms-api shutting down");
    server_handle.stop(true).await;

    match server_task.await {
        Ok(Ok(())) => info!("server shut down cleanly"),
        Ok(Err(e)) => error!("server error during shutdown: {e}"),
        Err(e) => error!("server task panicked during shutdown: {e}"),
    }

    Ok(())
}

/// Starts the dispatcher, status poller, and stuck-lease reaper as
/// independent periodic loops. None of these block server startup; each
/// runs for the lifetime of the process and stops only on shutdown.
fn spawn_background_workers(app_state: &AppState) {
    let dispatcher = Dispatcher::new(
        app_state.queue_service.clone(),
        app_state.logging_service.clone(),
        app_state.carrier.clone(),
        app_state.contacts.clone(),
        app_state.config.sms.base_url.clone(),
        app_state.config.sms.default_country_code.clone(),
        app_state.config.sms.rate_limit,
        10,
    );
    tokio::spawn(async move {
        loop {
            dispatcher.run_once().await;
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    });

    let poller = StatusPoller::new(app_state.logging_service.clone(), app_state.carrier.clone());
    tokio::spawn(async move {
        loop {
            poller.run_once().await;
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    });

    let lease_timeout = chrono::Duration::seconds(app_state.config.sms.lease_timeout_seconds);
    let reaper = StuckLeaseReaper::new(app_state.queue_service.clone(), lease_timeout);
    tokio::spawn(async move {
        loop {
            reaper.run_once().await;
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
