use anyhow::Result;
use sqlx::{Postgres, migrate::MigrateDatabase, postgres::PgPool};

pub mod backends;
pub mod models;
pub mod realtime;
pub mod repositories;

pub async fn init_database(database_url: &str) -> Result<PgPool> {
    // Create database if it doesn't exist
    if !Postgres::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database {}", database_url);
        Postgres::create_database(database_url).await?;
    }

    let pool = PgPool::connect(database_url).await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Migrations completed successfully");

    Ok(pool)
}
