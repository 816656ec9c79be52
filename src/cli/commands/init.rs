use anyhow::{Context, Result};

use crate::database::manager::DatabaseManager;

const SCHEMA_SQL: &str = include_str!("../../../db/schema.sql");

/// Apply the bootstrap schema. Statements are idempotent
/// (CREATE TABLE IF NOT EXISTS) so re-running is safe.
pub async fn run() -> Result<()> {
    let pool = DatabaseManager::pool()
        .await
        .context("failed to connect to DATABASE_URL")?;

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&pool)
        .await
        .context("failed to apply schema")?;

    println!("Schema applied");
    Ok(())
}
