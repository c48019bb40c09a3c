use crate::adapters::sql::is_index_exists_message;
use crate::config::{AdminSeed, MigrationPlan};
use crate::domain::model::{
    ConflictPolicy, InsertOutcome, InsertSummary, MigrationSummary, Row, SourceSpec, TableOutcome,
    TableStatus,
};
use crate::domain::ports::{DestinationDatabase, SourceDatabase, SourceOpener};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::password::hash_password;
use crate::utils::validation::Validate;

/// 一次性的跨資料庫遷移：建表 → 逐個來源複製資料 → 建索引 → 建立預設管理員
pub struct Migrator<O: SourceOpener> {
    opener: O,
    plan: MigrationPlan,
    monitor: SystemMonitor,
}

impl<O: SourceOpener> Migrator<O> {
    pub fn new(opener: O, plan: MigrationPlan) -> Self {
        Self {
            opener,
            plan,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(opener: O, plan: MigrationPlan, monitor_enabled: bool) -> Self {
        Self {
            opener,
            plan,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// 目標資料庫的連線由呼叫端建立；無論成功或失敗都會在這裡關閉
    pub async fn run(&self, destination: &dyn DestinationDatabase) -> Result<MigrationSummary> {
        let outcome = self.run_steps(destination).await;
        destination.close().await;
        tracing::info!("🔌 Destination connection closed");
        self.monitor.log_final_stats();
        outcome
    }

    async fn run_steps(&self, destination: &dyn DestinationDatabase) -> Result<MigrationSummary> {
        self.plan.validate()?;

        let mut summary = MigrationSummary::default();
        tracing::info!(
            "🚀 Starting migration of {} source database(s) (conflict policy: {:?})",
            self.plan.sources.len(),
            self.plan.conflict_policy
        );

        self.provision_schema(destination, &mut summary).await;

        for source in &self.plan.sources {
            self.migrate_source(source, destination, &mut summary).await;
            self.monitor.log_stats(&format!("After source '{}'", source.name));
        }

        self.provision_indexes(destination, &mut summary).await;

        if let Some(admin) = &self.plan.admin {
            summary.admin_seeded = Some(self.seed_admin(admin, destination).await);
        }

        log_summary(&summary);
        Ok(summary)
    }

    async fn provision_schema(
        &self,
        destination: &dyn DestinationDatabase,
        summary: &mut MigrationSummary,
    ) {
        tracing::info!("🏗️ Creating {} destination table(s)", self.plan.tables.len());
        for table in &self.plan.tables {
            match destination.create_table(table).await {
                Ok(()) => {
                    summary.tables_created += 1;
                    tracing::debug!("✅ Table '{}' ready", table.name);
                }
                Err(e) => {
                    summary.tables_failed += 1;
                    tracing::error!("❌ Failed to create table '{}': {}", table.name, e);
                }
            }
        }
    }

    async fn migrate_source(
        &self,
        source: &SourceSpec,
        destination: &dyn DestinationDatabase,
        summary: &mut MigrationSummary,
    ) {
        let path = self.plan.source_path(source);

        // 零位元組的檔案視同不存在，避免 SQLite 把它當成空資料庫開啟
        let present = std::fs::metadata(&path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !present {
            tracing::warn!(
                "⚠️ Source '{}' skipped: file not found at {}",
                source.name,
                path.display()
            );
            summary.sources_missing.push(source.name.clone());
            return;
        }

        tracing::info!("📂 Migrating source '{}' from {}", source.name, path.display());
        let database = match self.opener.open(&path).await {
            Ok(database) => database,
            Err(e) => {
                tracing::error!("❌ Failed to open source '{}': {}", source.name, e);
                summary.sources_failed.push(source.name.clone());
                return;
            }
        };

        match database.list_tables().await {
            Ok(tables) => {
                tracing::info!("📋 Source '{}' has {} table(s)", source.name, tables.len());
                for table in tables {
                    let outcome = self
                        .migrate_table(source, database.as_ref(), &table, destination)
                        .await;
                    summary.tables.push(outcome);
                }
            }
            Err(e) => {
                tracing::error!("❌ Failed to list tables of '{}': {}", source.name, e);
                summary.sources_failed.push(source.name.clone());
            }
        }

        database.close().await;
    }

    async fn migrate_table(
        &self,
        source: &SourceSpec,
        database: &dyn SourceDatabase,
        table: &str,
        destination: &dyn DestinationDatabase,
    ) -> TableOutcome {
        let dest_table = source.destination_table(table);
        let mut outcome = TableOutcome::new(&source.name, table, &dest_table);

        match destination.table_exists(&dest_table).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    "⚠️ {}.{} skipped: destination table '{}' does not exist",
                    source.name,
                    table,
                    dest_table
                );
                outcome.status = TableStatus::MissingDestination;
                return outcome;
            }
            Err(e) => {
                tracing::error!("❌ Could not check destination table '{}': {}", dest_table, e);
                outcome.status = TableStatus::Failed;
                return outcome;
            }
        }

        let rows = match database.read_rows(table).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("❌ Failed to read {}.{}: {}", source.name, table, e);
                outcome.status = TableStatus::Failed;
                return outcome;
            }
        };
        outcome.rows_read = rows.len();

        if rows.is_empty() {
            tracing::info!("ℹ️ {}.{}: no data to migrate", source.name, table);
            outcome.status = TableStatus::Empty;
            return outcome;
        }

        for (index, row) in rows.iter().enumerate() {
            match destination
                .insert_row(&dest_table, row, self.plan.conflict_policy)
                .await
            {
                Ok(InsertOutcome::Inserted) => outcome.rows_inserted += 1,
                Ok(InsertOutcome::Ignored) => outcome.rows_ignored += 1,
                Err(e) => {
                    outcome.rows_failed += 1;
                    tracing::error!("❌ {} row {}: {}", dest_table, index + 1, e);
                }
            }
        }

        tracing::info!(
            "✅ {}.{} → {}: {} inserted, {} ignored, {} failed",
            source.name,
            table,
            dest_table,
            outcome.rows_inserted,
            outcome.rows_ignored,
            outcome.rows_failed
        );
        outcome
    }

    async fn provision_indexes(
        &self,
        destination: &dyn DestinationDatabase,
        summary: &mut MigrationSummary,
    ) {
        tracing::info!("🗂️ Creating {} index(es)", self.plan.indexes.len());
        for index in &self.plan.indexes {
            match destination.create_index(index).await {
                Ok(()) => {
                    summary.indexes_created += 1;
                    tracing::debug!("✅ Index '{}' created", index.name);
                }
                Err(e) if is_index_exists_message(&e.to_string()) => {
                    summary.indexes_existing += 1;
                    tracing::debug!("Index '{}' already exists", index.name);
                }
                Err(e) => {
                    summary.indexes_failed += 1;
                    tracing::error!("❌ Failed to create index '{}': {}", index.name, e);
                }
            }
        }
    }

    async fn seed_admin(
        &self,
        admin: &AdminSeed,
        destination: &dyn DestinationDatabase,
    ) -> InsertSummary {
        if admin.uses_default_password() {
            tracing::warn!(
                "🔑 Admin account '{}' uses the default password '{}'. Change it after migration!",
                admin.username,
                admin.password
            );
        }

        let row = match admin_row(admin) {
            Ok(row) => row,
            Err(e) => {
                tracing::error!("❌ Failed to hash admin password: {}", e);
                return InsertSummary::Failed;
            }
        };

        // 已存在的管理員不覆蓋
        match destination
            .insert_row(&admin.table, &row, ConflictPolicy::Ignore)
            .await
        {
            Ok(InsertOutcome::Inserted) => {
                tracing::info!("👤 Default admin account '{}' created", admin.username);
                InsertSummary::Inserted
            }
            Ok(InsertOutcome::Ignored) => {
                tracing::info!("👤 Admin account '{}' already exists", admin.username);
                InsertSummary::AlreadyPresent
            }
            Err(e) => {
                tracing::error!("❌ Failed to seed admin account: {}", e);
                InsertSummary::Failed
            }
        }
    }
}

fn admin_row(admin: &AdminSeed) -> Result<Row> {
    Ok(Row::new()
        .with("username", admin.username.as_str())
        .with("email", admin.email.as_str())
        .with("password", hash_password(&admin.password)?)
        .with("full_name", admin.full_name.clone())
        .with("role", admin.role.as_str()))
}

fn log_summary(summary: &MigrationSummary) {
    let banner = "=".repeat(50);
    println!("{}", banner);
    println!("📊 Migration Summary");
    println!("{}", banner);
    println!(
        "  Tables created:        {} ({} failed)",
        summary.tables_created, summary.tables_failed
    );
    println!(
        "  Tables migrated:       {}",
        summary.tables_with_status(TableStatus::Migrated)
    );
    println!(
        "  Tables empty:          {}",
        summary.tables_with_status(TableStatus::Empty)
    );
    println!(
        "  Tables skipped:        {}",
        summary.tables_with_status(TableStatus::MissingDestination)
    );
    println!(
        "  Tables failed:         {}",
        summary.tables_with_status(TableStatus::Failed)
    );
    println!(
        "  Rows inserted/ignored/failed: {}/{}/{}",
        summary.rows_inserted(),
        summary.rows_ignored(),
        summary.rows_failed()
    );
    println!(
        "  Indexes created/existing/failed: {}/{}/{}",
        summary.indexes_created, summary.indexes_existing, summary.indexes_failed
    );
    if !summary.sources_missing.is_empty() {
        println!("  Missing sources:       {}", summary.sources_missing.join(", "));
    }
    if !summary.sources_failed.is_empty() {
        println!("  Failed sources:        {}", summary.sources_failed.join(", "));
    }
    if let Some(admin) = summary.admin_seeded {
        println!("  Admin account:         {:?}", admin);
    }
    println!("{}", banner);

    tracing::info!(
        "🎉 Migration finished: {} rows inserted, {} ignored, {} failed",
        summary.rows_inserted(),
        summary.rows_ignored(),
        summary.rows_failed()
    );
}
