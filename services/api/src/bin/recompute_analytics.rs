//! services/api/src/bin/recompute_analytics.rs
//!
//! Rebuilds the analytics row of every activity from its stored responses.
//! Run after imports or manual edits to the responses table.

use campus_api::{adapters::DbAdapter, config::Config, error::ApiError};
use campus_core::service::ActivityService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    db_adapter.run_migrations().await?;

    let service = ActivityService::new(db_adapter);
    let refreshed = service.recompute_all().await?;
    info!("Backfill finished: {} activities recomputed", refreshed.len());

    Ok(())
}
