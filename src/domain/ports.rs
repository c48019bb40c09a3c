use crate::domain::model::{ConflictPolicy, IndexDef, InsertOutcome, Row, TableDef};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 唯讀的來源資料庫
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// 使用者表格（排除內部系統表）
    async fn list_tables(&self) -> Result<Vec<String>>;
    /// 整張表一次讀入記憶體
    async fn read_rows(&self, table: &str) -> Result<Vec<Row>>;
    async fn close(&self);
}

#[async_trait]
pub trait SourceOpener: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn SourceDatabase>>;
}

#[async_trait]
pub trait DestinationDatabase: Send + Sync {
    /// 不存在才建立
    async fn create_table(&self, table: &TableDef) -> Result<()>;
    async fn table_exists(&self, table: &str) -> Result<bool>;
    async fn insert_row(
        &self,
        table: &str,
        row: &Row,
        policy: ConflictPolicy,
    ) -> Result<InsertOutcome>;
    async fn create_index(&self, index: &IndexDef) -> Result<()>;
    async fn close(&self);
}

pub trait ProxyConfigProvider: Send + Sync {
    fn upstream_for(&self, route: &str) -> Option<&str>;
    fn route_names(&self) -> Vec<String>;
    fn propagate_client_errors(&self) -> bool;
    fn expose_backend_url(&self) -> bool;
}
