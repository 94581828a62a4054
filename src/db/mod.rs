//! Local persistence for installation records.
//!
//! Layout:
//! - `models.rs`: row struct and conversion into the domain record
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `sqlite.rs`: the store itself

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::DbInstallation;
pub use schema::SQLITE_INIT;
pub use sqlite::{SqliteInstallations, SqlitePool};
