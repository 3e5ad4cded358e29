//! Serves the REST dispatcher over HTTP.
//!
//! Run from repo root: `REST_CONFIG_PATH=rest.json cargo run -p rest-dispatch-server`

use axum::Router;
use rest_dispatch::{
    common_routes_with_ready, load_from_path, resolve, rest_routes, AppState, Dispatcher, ObjectManager, PgStorage,
    ServiceRegistry, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Loads configuration and builds the dispatcher; any failure aborts startup.
async fn bootstrap(settings: &Settings) -> Result<AppState, Box<dyn std::error::Error>> {
    let config = load_from_path(&settings.config_path).await?;
    let configuration = resolve(&config)?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&settings.database_url)?;
    let storage = Arc::new(PgStorage::new(pool));

    let manager = ObjectManager::new(ServiceRegistry::with_defaults(), Arc::new(configuration), storage);
    manager.verify()?;
    Ok(AppState::new(Arc::new(Dispatcher::new(Arc::new(manager)))))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rest_dispatch=info")),
        )
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("rest-dispatch: {}", e);
            std::process::exit(1);
        }
    };
    let state = match bootstrap(&settings).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("rest-dispatch: startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/rest", rest_routes(state));
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
