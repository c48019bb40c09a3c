use desa_bridge::adapters::{SqliteDestination, SqliteOpener};
use desa_bridge::domain::model::{InsertSummary, TableStatus};
use desa_bridge::{MigrationPlan, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

async fn create_db(path: &Path, statements: &[&str]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
}

async fn seed_sources(dir: &Path) {
    create_db(
        &dir.join("desa.db"),
        &[
            "CREATE TABLE news (id INTEGER PRIMARY KEY, title TEXT NOT NULL, slug TEXT NOT NULL)",
            "INSERT INTO news VALUES (1, 'Kerja Bakti', 'kerja-bakti'), (2, 'Posyandu', 'posyandu')",
            "CREATE TABLE regulations (id INTEGER PRIMARY KEY, title TEXT)",
        ],
    )
    .await;
    create_db(
        &dir.join("umkm.db"),
        &[
            "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            "INSERT INTO products VALUES (1, 'Keripik Singkong')",
            "CREATE TABLE drafts (id INTEGER PRIMARY KEY, note TEXT)",
            "INSERT INTO drafts VALUES (1, 'not migrated')",
        ],
    )
    .await;
}

fn plan_for(dir: &Path) -> MigrationPlan {
    let toml = format!(
        r#"
base_dir = "{base}"

[[sources]]
name = "main"
path = "desa.db"
prefix = ""

[[sources]]
name = "umkm"
path = "umkm.db"
prefix = "umkm_"

[[sources]]
name = "location"
path = "location.db"
prefix = "location_"

[[tables]]
name = "users"
primary_key = ["id"]
unique = [["username"]]
columns = [
  {{ name = "id", sql_type = "INTEGER", nullable = false, auto_increment = true }},
  {{ name = "username", sql_type = "TEXT", nullable = false }},
  {{ name = "email", sql_type = "TEXT", nullable = false }},
  {{ name = "password", sql_type = "TEXT", nullable = false }},
  {{ name = "full_name", sql_type = "TEXT" }},
  {{ name = "role", sql_type = "TEXT", nullable = false }},
]

[[tables]]
name = "news"
primary_key = ["id"]
unique = [["slug"]]
columns = [
  {{ name = "id", sql_type = "INTEGER", nullable = false, auto_increment = true }},
  {{ name = "title", sql_type = "TEXT", nullable = false }},
  {{ name = "slug", sql_type = "TEXT", nullable = false }},
]

[[tables]]
name = "regulations"
primary_key = ["id"]
columns = [
  {{ name = "id", sql_type = "INTEGER", nullable = false }},
  {{ name = "title", sql_type = "TEXT" }},
]

[[tables]]
name = "umkm_products"
primary_key = ["id"]
columns = [
  {{ name = "id", sql_type = "INTEGER", nullable = false }},
  {{ name = "name", sql_type = "TEXT", nullable = false }},
]

[[indexes]]
name = "idx_news_slug_title"
table = "news"
columns = ["slug", "title"]

[admin]
username = "admin"
email = "admin@desa.id"
password = "admin123"
full_name = "Administrator Desa"
"#,
        base = dir.display()
    );
    MigrationPlan::from_toml_str(&toml).unwrap()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sqlite_to_sqlite_migration_is_rerunnable() {
    let dir = TempDir::new().unwrap();
    seed_sources(dir.path()).await;
    let dest_path = dir.path().join("dest.db");
    let migrator = Migrator::new(SqliteOpener, plan_for(dir.path()));

    // 第一次執行
    let destination = SqliteDestination::connect(&dest_path).await.unwrap();
    let first = migrator.run(&destination).await.unwrap();

    assert_eq!(first.tables_created, 4);
    assert_eq!(first.sources_missing, vec!["location".to_string()]);
    assert!(first.sources_failed.is_empty());
    assert_eq!(first.outcome("news").unwrap().rows_inserted, 2);
    assert_eq!(first.outcome("umkm_products").unwrap().rows_inserted, 1);
    assert_eq!(first.outcome("regulations").unwrap().status, TableStatus::Empty);
    assert_eq!(
        first.outcome("umkm_drafts").unwrap().status,
        TableStatus::MissingDestination
    );
    assert_eq!(first.rows_inserted(), 3);
    assert_eq!(first.indexes_created, 1);
    assert_eq!(first.admin_seeded, Some(InsertSummary::Inserted));

    // 第二次執行：不得產生重複資料
    let destination = SqliteDestination::connect(&dest_path).await.unwrap();
    let second = migrator.run(&destination).await.unwrap();

    assert_eq!(second.rows_inserted(), 0);
    assert_eq!(second.rows_ignored(), 3);
    assert_eq!(second.rows_failed(), 0);
    assert_eq!(second.indexes_created, 0);
    assert_eq!(second.indexes_existing, 1);
    assert_eq!(second.admin_seeded, Some(InsertSummary::AlreadyPresent));

    let check = SqliteDestination::connect(&dest_path).await.unwrap();
    assert_eq!(count(check.pool(), "news").await, 2);
    assert_eq!(count(check.pool(), "umkm_products").await, 1);
    assert_eq!(count(check.pool(), "regulations").await, 0);
    assert_eq!(count(check.pool(), "users").await, 1);

    let stored: String = sqlx::query_scalar("SELECT password FROM users WHERE username = 'admin'")
        .fetch_one(check.pool())
        .await
        .unwrap();
    assert_ne!(stored, "admin123");
    assert!(stored.starts_with("$2b$"));
    assert!(desa_bridge::utils::password::verify_password("admin123", &stored));
}

#[tokio::test]
async fn test_all_sources_missing_still_provisions_schema() {
    let dir = TempDir::new().unwrap();
    let dest_path = dir.path().join("dest.db");
    let migrator = Migrator::new(SqliteOpener, plan_for(dir.path()));

    let destination = SqliteDestination::connect(&dest_path).await.unwrap();
    let summary = migrator.run(&destination).await.unwrap();

    assert_eq!(summary.sources_missing.len(), 3);
    assert!(summary.tables.is_empty());
    assert_eq!(summary.tables_created, 4);
    assert_eq!(summary.admin_seeded, Some(InsertSummary::Inserted));
}

#[tokio::test]
async fn test_invalid_text_cell_does_not_drop_the_table() {
    let dir = TempDir::new().unwrap();
    create_db(
        &dir.path().join("desa.db"),
        &[
            "CREATE TABLE news (id INTEGER PRIMARY KEY, title TEXT NOT NULL, slug TEXT NOT NULL)",
            "INSERT INTO news VALUES (1, 'Kerja Bakti', 'kerja-bakti')",
            "INSERT INTO news VALUES (2, CAST(X'FF' AS TEXT), 'rusak')",
            "INSERT INTO news VALUES (3, 'Posyandu', 'posyandu')",
        ],
    )
    .await;
    let dest_path = dir.path().join("dest.db");
    let migrator = Migrator::new(SqliteOpener, plan_for(dir.path()));

    let destination = SqliteDestination::connect(&dest_path).await.unwrap();
    let summary = migrator.run(&destination).await.unwrap();

    let news = summary.outcome("news").unwrap();
    assert_eq!(news.status, TableStatus::Migrated);
    assert_eq!(news.rows_read, 3);
    assert_eq!(news.rows_inserted, 3);

    let check = SqliteDestination::connect(&dest_path).await.unwrap();
    assert_eq!(count(check.pool(), "news").await, 3);
}
