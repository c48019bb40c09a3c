use crate::config::substitute_env_vars;
use crate::domain::model::{ConflictPolicy, IndexDef, SourceSpec, TableDef};
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_identifier, validate_non_empty_string, validate_path,
    validate_positive_number, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 內建的預設遷移計畫（來源清單、目標表結構、索引、管理員帳號）
pub const DEFAULT_PLAN_TOML: &str = include_str!("../../config/migration.default.toml");

const SOURCE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    pub admin: Option<AdminSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSeed {
    #[serde(default = "default_users_table")]
    pub table: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_admin_role")]
    pub role: String,
}

/// 內建計畫的管理員預設密碼
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

impl AdminSeed {
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_users_table() -> String {
    "users".to_string()
}

fn default_admin_role() -> String {
    "admin".to_string()
}

impl MigrationPlan {
    /// 從 TOML 檔案載入遷移計畫
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BridgeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析（支援 ${VAR} 環境變數替換）
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_PLAN_TOML)
    }

    pub fn source_path(&self, source: &SourceSpec) -> PathBuf {
        let path = Path::new(&source.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_dir).join(path)
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }
}

impl Validate for MigrationPlan {
    fn validate(&self) -> Result<()> {
        validate_positive_number("sources", self.sources.len(), 1)?;

        let mut names = HashSet::new();
        for source in &self.sources {
            validate_non_empty_string("sources.name", &source.name)?;
            validate_path("sources.path", &source.path)?;
            if !source.prefix.is_empty() {
                validate_identifier("sources.prefix", &source.prefix)?;
            }
            if !names.insert(source.name.as_str()) {
                return Err(BridgeError::InvalidConfigValueError {
                    field: "sources.name".to_string(),
                    value: source.name.clone(),
                    reason: "Duplicate source name".to_string(),
                });
            }
        }
        let paths: Vec<String> = self.sources.iter().map(|s| s.path.clone()).collect();
        validate_file_extensions("sources.path", &paths, &SOURCE_EXTENSIONS)?;

        for table in &self.tables {
            validate_identifier("tables.name", &table.name)?;
            validate_positive_number(&format!("tables.{}.columns", table.name), table.columns.len(), 1)?;
            let columns: HashSet<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            for column in &table.columns {
                validate_identifier(&format!("tables.{}.columns", table.name), &column.name)?;
                validate_non_empty_string(&format!("tables.{}.{}.sql_type", table.name, column.name), &column.sql_type)?;
            }
            let key_columns = table.primary_key.iter().chain(table.unique.iter().flatten());
            for key in key_columns {
                if !columns.contains(key.as_str()) {
                    return Err(BridgeError::InvalidConfigValueError {
                        field: format!("tables.{}", table.name),
                        value: key.clone(),
                        reason: "Key column is not defined in the table".to_string(),
                    });
                }
            }
        }

        for index in &self.indexes {
            validate_identifier("indexes.name", &index.name)?;
            validate_identifier("indexes.table", &index.table)?;
            validate_positive_number(&format!("indexes.{}.columns", index.name), index.columns.len(), 1)?;
            for column in &index.columns {
                validate_identifier(&format!("indexes.{}.columns", index.name), column)?;
            }
        }

        if let Some(admin) = &self.admin {
            validate_identifier("admin.table", &admin.table)?;
            validate_non_empty_string("admin.username", &admin.username)?;
            validate_non_empty_string("admin.email", &admin.email)?;
            validate_non_empty_string("admin.password", &admin.password)?;
        }

        Ok(())
    }
}

/// 目標 MySQL 連線參數，來自 DB_HOST / DB_PORT / DB_USER / DB_PASSWORD / DB_NAME
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DestinationConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| BridgeError::InvalidConfigValueError {
                    field: "DB_PORT".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => 3306,
        };

        let database = lookup("DB_NAME").ok_or_else(|| BridgeError::MissingConfigError {
            field: "DB_NAME".to_string(),
        })?;

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port,
            user: lookup("DB_USER").unwrap_or_else(|| "root".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            database,
        })
    }
}

impl Validate for DestinationConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("DB_HOST", &self.host)?;
        validate_non_empty_string("DB_USER", &self.user)?;
        validate_non_empty_string("DB_NAME", &self.database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_plan_is_valid() {
        let plan = MigrationPlan::builtin().unwrap();
        assert!(plan.validate().is_ok());

        let names: Vec<&str> = plan.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["main", "umkm", "admin", "location"]);
        assert_eq!(plan.conflict_policy, ConflictPolicy::Ignore);
        assert!(plan.table("users").is_some());
        assert!(plan.table("umkm_businesses").is_some());
        assert_eq!(plan.admin.as_ref().unwrap().table, "users");
    }

    #[test]
    fn test_builtin_admin_is_flagged_until_password_changes() {
        let mut admin = MigrationPlan::builtin().unwrap().admin.unwrap();
        assert!(admin.uses_default_password());

        admin.password = "s3cret-desa".to_string();
        assert!(!admin.uses_default_password());
    }

    #[test]
    fn test_every_index_targets_a_defined_table() {
        let plan = MigrationPlan::builtin().unwrap();
        for index in &plan.indexes {
            let table = plan.table(&index.table).unwrap();
            for column in &index.columns {
                assert!(table.columns.iter().any(|c| &c.name == column));
            }
        }
    }

    #[test]
    fn test_source_path_resolution() {
        let plan = MigrationPlan::from_toml_str(
            r#"
base_dir = "/srv/desa"

[[sources]]
name = "main"
path = "database/desa.db"

[[sources]]
name = "abs"
path = "/tmp/other.db"
prefix = "abs_"
"#,
        )
        .unwrap();

        assert_eq!(
            plan.source_path(&plan.sources[0]),
            PathBuf::from("/srv/desa/database/desa.db")
        );
        assert_eq!(plan.source_path(&plan.sources[1]), PathBuf::from("/tmp/other.db"));
        assert!(plan.admin.is_none());
    }

    #[test]
    fn test_env_var_substitution_in_plan() {
        std::env::set_var("DESA_TEST_DATA_DIR", "/data/desa");

        let plan = MigrationPlan::from_toml_str(
            r#"
base_dir = "${DESA_TEST_DATA_DIR}"
conflict_policy = "overwrite"

[[sources]]
name = "main"
path = "desa.db"
"#,
        )
        .unwrap();

        assert_eq!(plan.base_dir, "/data/desa");
        assert_eq!(plan.conflict_policy, ConflictPolicy::Overwrite);

        std::env::remove_var("DESA_TEST_DATA_DIR");
    }

    #[test]
    fn test_validation_rejects_bad_identifiers_and_keys() {
        let bad_table = MigrationPlan::from_toml_str(
            r#"
[[sources]]
name = "main"
path = "desa.db"

[[tables]]
name = "news; DROP TABLE users"
columns = [{ name = "id", sql_type = "INT" }]
"#,
        )
        .unwrap();
        assert!(bad_table.validate().is_err());

        let bad_key = MigrationPlan::from_toml_str(
            r#"
[[sources]]
name = "main"
path = "desa.db"

[[tables]]
name = "news"
primary_key = ["missing"]
columns = [{ name = "id", sql_type = "INT" }]
"#,
        )
        .unwrap();
        assert!(bad_key.validate().is_err());

        let bad_extension = MigrationPlan::from_toml_str(
            r#"
[[sources]]
name = "main"
path = "desa.sql"
"#,
        )
        .unwrap();
        assert!(bad_extension.validate().is_err());
    }

    #[test]
    fn test_plan_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"
[[sources]]
name = "main"
path = "desa.db"
"#,
            )
            .unwrap();

        let plan = MigrationPlan::from_file(temp_file.path()).unwrap();
        assert_eq!(plan.sources.len(), 1);
        assert_eq!(plan.base_dir, ".");
    }

    #[test]
    fn test_destination_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_USER", "desa"),
            ("DB_PASSWORD", "rahasia"),
            ("DB_NAME", "desa_db"),
        ]
        .into_iter()
        .collect();

        let config =
            DestinationConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.database, "desa_db");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_destination_config_defaults_and_errors() {
        let only_name = |k: &str| (k == "DB_NAME").then(|| "desa_db".to_string());
        let config = DestinationConfig::from_lookup(only_name).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "");

        assert!(matches!(
            DestinationConfig::from_lookup(|_| None),
            Err(BridgeError::MissingConfigError { .. })
        ));

        let bad_port = |k: &str| match k {
            "DB_NAME" => Some("desa_db".to_string()),
            "DB_PORT" => Some("not-a-port".to_string()),
            _ => None,
        };
        assert!(DestinationConfig::from_lookup(bad_port).is_err());
    }
}
