mod config;
mod error;
mod hello;
mod query;

use std::sync::Arc;

use axum::Router;
use lambda_http::{run, tracing, Error};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env();
    let max_level = config.max_level();

    tracing_subscriber::fmt()
        .json()
        .with_max_level(max_level.clone().unwrap_or(tracing::Level::INFO))
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .init();

    if let Err(raw) = max_level {
        tracing::warn!(value = %raw, "Unrecognised log level, using INFO");
    }

    let app = Router::new().merge(hello::router(Arc::new(config)));

    run(app).await
}
