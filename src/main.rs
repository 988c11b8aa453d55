use std::sync::Arc;

use vidtube_api_rust::config;
use vidtube_api_rust::state::AppState;
use vidtube_api_rust::store::memory::MemoryStore;
use vidtube_api_rust::store::postgres::PostgresStore;
use vidtube_api_rust::store::Datastore;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, VIDTUBE_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting VidTube API in {:?} mode", config.environment);

    let store: Arc<dyn Datastore> = match std::env::var("APP_STORE").as_deref() {
        Ok("memory") => {
            tracing::warn!("using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        _ => {
            let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
            let store = PostgresStore::connect(&url, config.database.max_connections)
                .await
                .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
            Arc::new(store)
        }
    };

    let state = AppState::new(store, config);
    let app = vidtube_api_rust::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 VidTube API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
