mod api;
mod config;
mod range;
mod scan;
mod state;
mod utils;

use axum::Router;
use api::api_router;
use config::{config_path_from_env, library_roots, load_or_create_config, resolve_path};
use library::Library;
use scan::start_scan;
use state::AppState;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let db_path = resolve_path(&config_path, &config.database_path);
    let library = Library::open(&db_path)?;
    library.initialize()?;
    info!("Catalog database at {:?}", db_path);

    let roots = library_roots(&config_path, &config);
    if roots.is_empty() {
        warn!("No library paths configured; add some under `libraries` in {:?}", config_path);
    }
    for root in roots {
        library.add_library_path(root);
    }

    let state = AppState::new(library.clone());
    if config.scan_on_start {
        start_scan(state.clone());
    }

    let app = Router::new()
        .nest("/api/v1", api_router(state))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let bind_addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    library.close();
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
