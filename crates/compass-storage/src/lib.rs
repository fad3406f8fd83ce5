pub mod catalog;
pub mod error;
pub mod user;
pub mod version;

mod convert;

pub use catalog::{init_catalog_db, SqliteCollegeStore};
pub use error::{Result, StorageError};
pub use user::{
    init_user_db, SqliteApplicationStore, SqliteDecisionStore, SqliteProfileStore,
};
