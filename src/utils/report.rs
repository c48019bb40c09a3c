use crate::domain::model::MigrationSummary;
use crate::utils::error::Result;
use std::path::Path;

/// 將每個表格的遷移結果寫成 CSV
pub fn write_summary_csv<P: AsRef<Path>>(summary: &MigrationSummary, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record([
        "source",
        "source_table",
        "dest_table",
        "status",
        "rows_read",
        "rows_inserted",
        "rows_ignored",
        "rows_failed",
    ])?;

    for table in &summary.tables {
        writer.write_record([
            table.source.clone(),
            table.source_table.clone(),
            table.dest_table.clone(),
            table.status.to_string(),
            table.rows_read.to_string(),
            table.rows_inserted.to_string(),
            table.rows_ignored.to_string(),
            table.rows_failed.to_string(),
        ])?;
    }

    writer.flush()?;
    tracing::debug!("Report written to {}", path.as_ref().display());
    Ok(())
}
