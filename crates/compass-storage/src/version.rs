//! Schema-version gate. Each database stores its version in a meta table;
//! the app refuses to open a database whose major version differs.

use crate::error::{Result, StorageError};
use sqlx::SqlitePool;

/// Read the schema version from a meta table (`catalog_meta` / `user_meta`).
pub async fn get_schema_version(pool: &SqlitePool, meta_table: &str) -> Result<String> {
    let query = format!("SELECT value FROM {} WHERE key = 'schema_version'", meta_table);
    let row: Option<(String,)> = sqlx::query_as(&query).fetch_optional(pool).await?;
    row.map(|(v,)| v)
        .ok_or_else(|| StorageError::Other(format!("no schema_version in {}", meta_table)))
}

/// Major-version compatibility: "1.2.0" is compatible with "1.0.0".
pub fn is_compatible(db_version: &str, app_version: &str) -> bool {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    match (major(db_version), major(app_version)) {
        (Some(db), Some(app)) => db == app,
        _ => false,
    }
}
