pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{MigrateCli, ProxyCli};

pub use adapters::{MySqlDestination, SqliteDestination, SqliteOpener};
pub use config::{DestinationConfig, MigrationPlan, ProxyConfig};
pub use core::{fetch::ResilientClient, fetch::RetryPolicy, migrate::Migrator};
pub use utils::error::{BridgeError, Result};
