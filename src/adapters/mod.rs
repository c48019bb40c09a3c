// Adapters layer: sqlx-backed implementations of the migration ports.

pub mod mysql;
pub mod sql;
pub mod sqlite;

pub use mysql::MySqlDestination;
pub use sqlite::{SqliteDestination, SqliteOpener, SqliteSource};
