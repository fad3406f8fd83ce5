mod models;
pub mod repository;


pub use repository::SqliteCollegeStore;

use crate::error::{Result, StorageError};
use crate::version::{get_schema_version, is_compatible};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

const EXPECTED_CATALOG_VERSION: &str = "1.0.0";

/// Embedded migrations, exposed for test harnesses that manage their own
/// pools (e.g. single-connection in-memory databases).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations_catalog");

/// Initialize the catalog database with migrations.
pub async fn init_catalog_db(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    sqlx::migrate!("./migrations_catalog").run(&pool).await?;

    let db_version = get_schema_version(&pool, "catalog_meta").await?;
    if !is_compatible(&db_version, EXPECTED_CATALOG_VERSION) {
        return Err(StorageError::IncompatibleSchema {
            db_version,
            app_version: EXPECTED_CATALOG_VERSION.to_string(),
            message: "Catalog database schema is incompatible with this build".to_string(),
        });
    }

    tracing::info!(
        "Catalog DB initialized: schema v{}, expected v{}",
        db_version,
        EXPECTED_CATALOG_VERSION
    );

    Ok(pool)
}
