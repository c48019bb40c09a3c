//! SQL text rendering shared by the sqlx adapters.
//!
//! Identifiers reaching this module have been checked by
//! `validate_identifier` (plan) or come from the source catalog, and are
//! quoted with the dialect's quote character; values are always bound.

use crate::domain::model::{ConflictPolicy, IndexDef, TableDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    fn quote_list(&self, idents: &[String]) -> String {
        idents
            .iter()
            .map(|i| self.quote(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_table(&self, table: &TableDef) -> String {
        // SQLite 只有單一 INTEGER PRIMARY KEY 欄位可以 AUTOINCREMENT
        let sqlite_rowid_pk = |column: &str| {
            table.primary_key.len() == 1 && table.primary_key[0] == column
        };

        let mut lines: Vec<String> = Vec::new();
        for column in &table.columns {
            let mut line = match self {
                Dialect::Sqlite if column.auto_increment && sqlite_rowid_pk(&column.name) => {
                    format!(
                        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
                        self.quote(&column.name)
                    )
                }
                _ => format!("{} {}", self.quote(&column.name), column.sql_type),
            };

            let inline_pk = matches!(self, Dialect::Sqlite)
                && column.auto_increment
                && sqlite_rowid_pk(&column.name);
            if !inline_pk {
                if !column.nullable {
                    line.push_str(" NOT NULL");
                }
                if let Some(default) = &column.default {
                    line.push_str(&format!(" DEFAULT {}", default));
                }
                if column.auto_increment && matches!(self, Dialect::MySql) {
                    line.push_str(" AUTO_INCREMENT");
                }
            }
            lines.push(line);
        }

        let has_inline_pk = matches!(self, Dialect::Sqlite)
            && table
                .columns
                .iter()
                .any(|c| c.auto_increment && sqlite_rowid_pk(&c.name));
        if !table.primary_key.is_empty() && !has_inline_pk {
            lines.push(format!("PRIMARY KEY ({})", self.quote_list(&table.primary_key)));
        }

        for unique in &table.unique {
            match self {
                Dialect::MySql => lines.push(format!(
                    "UNIQUE KEY {} ({})",
                    self.quote(&format!("uq_{}_{}", table.name, unique.join("_"))),
                    self.quote_list(unique)
                )),
                Dialect::Sqlite => lines.push(format!("UNIQUE ({})", self.quote_list(unique))),
            }
        }

        let suffix = match self {
            Dialect::MySql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            Dialect::Sqlite => "",
        };

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n){}",
            self.quote(&table.name),
            lines.join(",\n  "),
            suffix
        )
    }

    pub fn insert(&self, table: &str, columns: &[String], policy: ConflictPolicy) -> String {
        let column_list = self.quote_list(columns);
        let placeholders = vec!["?"; columns.len()].join(", ");

        match (self, policy) {
            (Dialect::MySql, ConflictPolicy::Ignore) => format!(
                "INSERT IGNORE INTO {} ({}) VALUES ({})",
                self.quote(table),
                column_list,
                placeholders
            ),
            (Dialect::MySql, ConflictPolicy::Overwrite) => {
                let updates = columns
                    .iter()
                    .map(|c| format!("{0} = VALUES({0})", self.quote(c)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
                    self.quote(table),
                    column_list,
                    placeholders,
                    updates
                )
            }
            (Dialect::Sqlite, ConflictPolicy::Ignore) => format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
                self.quote(table),
                column_list,
                placeholders
            ),
            (Dialect::Sqlite, ConflictPolicy::Overwrite) => format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
                self.quote(table),
                column_list,
                placeholders
            ),
        }
    }

    pub fn create_index(&self, index: &IndexDef) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote(&index.name),
            self.quote(&index.table),
            self.quote_list(&index.columns)
        )
    }

    pub fn select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {}", self.quote(table))
    }
}

/// 索引已存在時的錯誤訊息（MySQL: Duplicate key name, SQLite: already exists）
pub fn is_index_exists_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("duplicate key name") || lower.contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ColumnDef;

    fn column(name: &str, sql_type: &str) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            default: None,
            auto_increment: false,
        }
    }

    fn news_table() -> TableDef {
        TableDef {
            name: "news".to_string(),
            columns: vec![
                ColumnDef {
                    nullable: false,
                    auto_increment: true,
                    ..column("id", "INT")
                },
                ColumnDef {
                    nullable: false,
                    ..column("slug", "VARCHAR(255)")
                },
                ColumnDef {
                    default: Some("'draft'".to_string()),
                    ..column("status", "VARCHAR(20)")
                },
            ],
            primary_key: vec!["id".to_string()],
            unique: vec![vec!["slug".to_string()]],
        }
    }

    #[test]
    fn test_mysql_create_table() {
        let sql = Dialect::MySql.create_table(&news_table());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `news` ("));
        assert!(sql.contains("`id` INT NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("`status` VARCHAR(20) DEFAULT 'draft'"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains("UNIQUE KEY `uq_news_slug` (`slug`)"));
        assert!(sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    }

    #[test]
    fn test_sqlite_create_table_inlines_rowid_primary_key() {
        let sql = Dialect::Sqlite.create_table(&news_table());
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(!sql.contains("PRIMARY KEY (\"id\")"));
        assert!(!sql.contains("AUTO_INCREMENT"));
        assert!(sql.contains("UNIQUE (\"slug\")"));
    }

    #[test]
    fn test_insert_statements_per_policy() {
        let columns = vec!["id".to_string(), "title".to_string()];
        assert_eq!(
            Dialect::MySql.insert("news", &columns, ConflictPolicy::Ignore),
            "INSERT IGNORE INTO `news` (`id`, `title`) VALUES (?, ?)"
        );
        assert_eq!(
            Dialect::MySql.insert("news", &columns, ConflictPolicy::Overwrite),
            "INSERT INTO `news` (`id`, `title`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `id` = VALUES(`id`), `title` = VALUES(`title`)"
        );
        assert_eq!(
            Dialect::Sqlite.insert("news", &columns, ConflictPolicy::Ignore),
            "INSERT OR IGNORE INTO \"news\" (\"id\", \"title\") VALUES (?, ?)"
        );
        assert!(Dialect::Sqlite
            .insert("news", &columns, ConflictPolicy::Overwrite)
            .starts_with("INSERT OR REPLACE"));
    }

    #[test]
    fn test_create_index_and_quoting() {
        let index = IndexDef {
            name: "idx_news_status".to_string(),
            table: "news".to_string(),
            columns: vec!["status".to_string(), "published_at".to_string()],
            unique: false,
        };
        assert_eq!(
            Dialect::MySql.create_index(&index),
            "CREATE INDEX `idx_news_status` ON `news` (`status`, `published_at`)"
        );
        assert_eq!(Dialect::MySql.quote("we`ird"), "`we``ird`");
        assert_eq!(Dialect::Sqlite.quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_index_exists_detection() {
        assert!(is_index_exists_message(
            "error returned from database: 1061 (42000): Duplicate key name 'idx_news_status'"
        ));
        assert!(is_index_exists_message(
            "error returned from database: (code: 1) index idx_news_status already exists"
        ));
        assert!(!is_index_exists_message("Table 'desa.news' doesn't exist"));
    }
}
