//! Database module
//!
//! Handles SQLite connection, migrations, and the standard unit seed.

pub mod connection;
pub mod migrations;
pub mod seed;

pub use connection::{Database, DbError, DbResult};
