use serde::{Deserialize, Serialize};
use std::fmt;

/// 來源資料列中的單一純量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// 依欄位順序保存的一筆資料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.columns.push((column.to_string(), value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    pub default: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub prefix: String,
}

impl SourceSpec {
    pub fn destination_table(&self, source_table: &str) -> String {
        format!("{}{}", self.prefix, source_table)
    }
}

/// 主鍵或唯一鍵衝突時的處理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Ignore,
    Overwrite,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(ConflictPolicy::Ignore),
            "overwrite" | "upsert" => Ok(ConflictPolicy::Overwrite),
            other => Err(format!(
                "unknown conflict policy '{}', expected 'ignore' or 'overwrite'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableStatus {
    Migrated,
    Empty,
    MissingDestination,
    Failed,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TableStatus::Migrated => "migrated",
            TableStatus::Empty => "empty",
            TableStatus::MissingDestination => "missing_destination",
            TableStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutcome {
    pub source: String,
    pub source_table: String,
    pub dest_table: String,
    pub status: TableStatus,
    pub rows_read: usize,
    pub rows_inserted: usize,
    pub rows_ignored: usize,
    pub rows_failed: usize,
}

impl TableOutcome {
    pub fn new(source: &str, source_table: &str, dest_table: &str) -> Self {
        Self {
            source: source.to_string(),
            source_table: source_table.to_string(),
            dest_table: dest_table.to_string(),
            status: TableStatus::Migrated,
            rows_read: 0,
            rows_inserted: 0,
            rows_ignored: 0,
            rows_failed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationSummary {
    pub tables_created: usize,
    pub tables_failed: usize,
    pub sources_missing: Vec<String>,
    pub sources_failed: Vec<String>,
    pub tables: Vec<TableOutcome>,
    pub indexes_created: usize,
    pub indexes_existing: usize,
    pub indexes_failed: usize,
    pub admin_seeded: Option<InsertSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsertSummary {
    Inserted,
    AlreadyPresent,
    Failed,
}

impl MigrationSummary {
    pub fn rows_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }

    pub fn rows_ignored(&self) -> usize {
        self.tables.iter().map(|t| t.rows_ignored).sum()
    }

    pub fn rows_failed(&self) -> usize {
        self.tables.iter().map(|t| t.rows_failed).sum()
    }

    pub fn tables_with_status(&self, status: TableStatus) -> usize {
        self.tables.iter().filter(|t| t.status == status).count()
    }

    pub fn outcome(&self, dest_table: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|t| t.dest_table == dest_table)
    }
}
