use crate::adapters::sql::Dialect;
use crate::domain::model::{ConflictPolicy, IndexDef, InsertOutcome, Row, SqlValue, TableDef};
use crate::domain::ports::{DestinationDatabase, SourceDatabase, SourceOpener};
use crate::utils::error::Result;
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::path::Path;

async fn open_pool(path: &Path, read_only: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(read_only)
        .create_if_missing(!read_only);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// 唯讀開啟的 SQLite 來源資料庫
pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            pool: open_pool(path, true).await?,
        })
    }
}

#[async_trait]
impl SourceDatabase for SqliteSource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Row>> {
        let sql = Dialect::Sqlite.select_all(table);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            // SQLite 的值型別以實際儲存類別為準，不是欄位宣告的型別
            let type_name = raw.type_info().name().to_ascii_uppercase();
            if type_name.contains("INT") || type_name == "BOOLEAN" {
                SqlValue::Integer(row.try_get_unchecked::<i64, _>(index)?)
            } else if type_name == "REAL" || type_name.contains("FLOAT") || type_name.contains("DOUBLE") {
                SqlValue::Real(row.try_get_unchecked::<f64, _>(index)?)
            } else if type_name == "BLOB" {
                SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?)
            } else {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                SqlValue::Text(decode_text(column.name(), bytes))
            }
        };
        columns.push((column.name().to_string(), value));
    }

    Ok(Row { columns })
}

/// 非 UTF-8 的文字以替換字元保留，不讓單一欄位拖垮整張表
fn decode_text(column: &str, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                "⚠️ Column '{}' holds invalid UTF-8 text, replacing bad bytes",
                column
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqliteOpener;

#[async_trait]
impl SourceOpener for SqliteOpener {
    async fn open(&self, path: &Path) -> Result<Box<dyn SourceDatabase>> {
        Ok(Box::new(SqliteSource::open(path).await?))
    }
}

/// 本機開發與測試用的 SQLite 目標資料庫
pub struct SqliteDestination {
    pool: SqlitePool,
}

impl SqliteDestination {
    pub async fn connect(path: &Path) -> Result<Self> {
        tracing::info!("🔌 Connecting to SQLite destination {}", path.display());
        Ok(Self {
            pool: open_pool(path, false).await?,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Blob(v) => query.bind(v.as_slice()),
    }
}

#[async_trait]
impl DestinationDatabase for SqliteDestination {
    async fn create_table(&self, table: &TableDef) -> Result<()> {
        let sql = Dialect::Sqlite.create_table(table);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn insert_row(
        &self,
        table: &str,
        row: &Row,
        policy: ConflictPolicy,
    ) -> Result<InsertOutcome> {
        let columns: Vec<String> = row.column_names().map(str::to_string).collect();
        let sql = Dialect::Sqlite.insert(table, &columns, policy);

        let mut query = sqlx::query(&sql);
        for (_, value) in &row.columns {
            query = bind_value(query, value);
        }
        let result = query.execute(&self.pool).await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::Ignored
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn create_index(&self, index: &IndexDef) -> Result<()> {
        let sql = Dialect::Sqlite.create_index(index);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
