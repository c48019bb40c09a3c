use crate::adapters::sql::Dialect;
use crate::config::DestinationConfig;
use crate::domain::model::{ConflictPolicy, IndexDef, InsertOutcome, Row, SqlValue, TableDef};
use crate::domain::ports::DestinationDatabase;
use crate::utils::error::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::MySql;
use std::time::Duration;

/// 遷移目標 MySQL，整個流程共用單一連線
pub struct MySqlDestination {
    pool: MySqlPool,
}

impl MySqlDestination {
    pub async fn connect(config: &DestinationConfig) -> Result<Self> {
        tracing::info!(
            "🔌 Connecting to MySQL {}@{}:{}/{}",
            config.user,
            config.host,
            config.port,
            config.database
        );

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Blob(v) => query.bind(v.as_slice()),
    }
}

#[async_trait]
impl DestinationDatabase for MySqlDestination {
    async fn create_table(&self, table: &TableDef) -> Result<()> {
        let sql = Dialect::MySql.create_table(table);
        tracing::debug!("{}", sql);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
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
        let sql = Dialect::MySql.insert(table, &columns, policy);

        let mut query = sqlx::query(&sql);
        for (_, value) in &row.columns {
            query = bind_value(query, value);
        }
        let result = query.execute(&self.pool).await?;

        // INSERT IGNORE 衝突時 affected rows 為 0
        Ok(if result.rows_affected() == 0 {
            InsertOutcome::Ignored
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn create_index(&self, index: &IndexDef) -> Result<()> {
        let sql = Dialect::MySql.create_index(index);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
