use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use fareport_server::config::Config;
use fareport_server::gateway::{HttpGateway, MockGateway, PaymentGateway};
use fareport_server::routes::create_routes;
use fareport_server::state::AppState;
use fareport_server::store::PgStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let gateway: Arc<dyn PaymentGateway> = match config.gateway_secret_key.as_deref() {
        Some(secret) => Arc::new(HttpGateway::new(config.gateway_base_url.clone(), secret)),
        None => {
            tracing::warn!("GATEWAY_SECRET_KEY not set; using the mock payment gateway");
            Arc::new(MockGateway::new())
        }
    };

    let port = config.port;
    let state = AppState::new(Arc::new(PgStore::new(pool)), gateway, config);
    let app: Router = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
