use std::env;

use anyhow::{Context, Result};
use billmanager_repository::PostgresRepository;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("BILLMANAGER_DATABASE_URL"))
        .context("DATABASE_URL or BILLMANAGER_DATABASE_URL must be set")?;

    let repo = PostgresRepository::connect(&database_url, 5)
        .await
        .context("failed to connect to database")?;
    repo.run_migrations()
        .await
        .context("failed to run migrations")?;
    Ok(())
}
