#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use antimatter_api::{construct_router, state::State};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = config::Config::from_env()?;

    let _sentry_guard = match &config.sentry_endpoint {
        None => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(env_filter())
                .init();
            None
        }
        Some(endpoint) => {
            let guard = sentry::init((
                endpoint.as_str(),
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    traces_sample_rate: 0.3,
                    ..Default::default()
                },
            ));
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(env_filter())
                .with(sentry_tracing::layer())
                .init();
            Some(guard)
        }
    };

    tracing::info!("Starting Anti-Matter API Service");

    let state = Arc::new(State::from_env().await?);
    let app = construct_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
