pub mod fetch;
pub mod migrate;

pub use crate::domain::model::{MigrationSummary, Row, SqlValue};
pub use crate::domain::ports::{DestinationDatabase, SourceDatabase, SourceOpener};
pub use crate::utils::error::Result;
pub use fetch::{ResilientClient, RetryPolicy, UpstreamRequest, UpstreamResponse};
pub use migrate::Migrator;
