use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header, header::InvalidHeaderValue};
use axum::{Router, response::Html, routing::get};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passkey_ceremony_axum::{PasskeyCeremony, PasskeyConfig, StoreConfig, passkey_router};

const ROUTE_PREFIX: &str = "/api/auth";

async fn index() -> Html<&'static str> {
    Html("<h1>passkey ceremony demo</h1><p>POST JSON to /api/auth/register/start to begin.</p>")
}

/// Lets the relying party's own front end call the ceremony endpoints.
fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

fn init_tracing(app_name: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            format!("passkey_ceremony_axum=trace,passkey_ceremony=trace,{app_name}=trace,info")
                .into()
        }
        #[cfg(not(debug_assertions))]
        {
            "info".into()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("demo_passkey");

    let config = PasskeyConfig::from_env()?;
    let (credentials, challenges) = StoreConfig::from_env()?.build().await?;
    tracing::info!("Relying party {} at {}", config.rp_id, config.origin);

    let cors = cors_layer(&config.origin)?;
    let ceremony = Arc::new(PasskeyCeremony::new(config, credentials, challenges));
    let app = Router::new()
        .route("/", get(index))
        .nest(ROUTE_PREFIX, passkey_router(ceremony).layer(cors));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
