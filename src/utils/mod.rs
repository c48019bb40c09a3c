pub mod error;
pub mod logger;
pub mod monitor;
pub mod password;
pub mod report;
pub mod validation;
