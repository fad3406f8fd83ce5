mod models;
pub mod application_repository;
pub mod decision_repository;
pub mod profile_repository;

#[cfg(test)]
mod repository_tests;

pub use application_repository::SqliteApplicationStore;
pub use decision_repository::SqliteDecisionStore;
pub use profile_repository::SqliteProfileStore;

use crate::error::{Result, StorageError};
use crate::version::{get_schema_version, is_compatible};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

const EXPECTED_USER_VERSION: &str = "1.0.0";

/// Embedded migrations, exposed for test harnesses that manage their own
/// pools (e.g. single-connection in-memory databases).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations_user");

/// Initialize the user database with migrations.
pub async fn init_user_db(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    sqlx::migrate!("./migrations_user").run(&pool).await?;

    let db_version = get_schema_version(&pool, "user_meta").await?;
    if !is_compatible(&db_version, EXPECTED_USER_VERSION) {
        return Err(StorageError::IncompatibleSchema {
            db_version,
            app_version: EXPECTED_USER_VERSION.to_string(),
            message: "User database schema is incompatible with this build".to_string(),
        });
    }

    tracing::info!(
        "User DB initialized: schema v{}, expected v{}",
        db_version,
        EXPECTED_USER_VERSION
    );

    Ok(pool)
}
