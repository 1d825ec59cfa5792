//! 结果导出服务 - 业务能力层
//!
//! 只负责"把结果表变成可下载的文件"

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::info;

use crate::error::ExportError;
use crate::models::ResultTable;

/// 导出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("不支持的导出格式: {}", other)),
        }
    }
}

/// 导出得到的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// 下载响应使用的 Content-Disposition 头
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// 写入目录，返回文件路径
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let write_failed = |path: &Path, source| ExportError::WriteFailed {
            path: path.display().to_string(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(|e| write_failed(dir, e))?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes).map_err(|e| write_failed(&path, e))?;

        info!("💾 已导出 {} ({} 字节)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// 结果表导出器
#[derive(Debug, Clone, Copy, Default)]
pub struct Exporter {
    format: ExportFormat,
    reval: bool,
}

impl Exporter {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            reval: false,
        }
    }

    /// 复查结果使用不同的文件名
    pub fn reval(mut self, reval: bool) -> Self {
        self.reval = reval;
        self
    }

    pub fn filename(&self) -> String {
        let stem = if self.reval { "Reval Results" } else { "Sem Results" };
        format!("{}.{}", stem, self.format.extension())
    }

    /// 导出结果表；空表不导出
    pub fn export(&self, table: &ResultTable) -> Result<ExportedFile, ExportError> {
        if table.is_empty() {
            return Err(ExportError::EmptyTable);
        }

        let bytes = match self.format {
            ExportFormat::Csv => delimited(table, ','),
            ExportFormat::Tsv => delimited(table, '\t'),
            ExportFormat::Json => json(table)?,
        };

        Ok(ExportedFile {
            filename: self.filename(),
            content_type: self.format.content_type(),
            bytes,
        })
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn format_row(cells: &[&str], sep: char) -> String {
    let mut line = cells
        .iter()
        .map(|cell| {
            if needs_quotes(cell, sep) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&sep.to_string());
    line.push('\n');
    line
}

/// CSV / TSV；空单元格写成空字段
fn delimited(table: &ResultTable, sep: char) -> Vec<u8> {
    let header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    let mut out = format_row(&header, sep);
    for row in &table.rows {
        let cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("")).collect();
        out.push_str(&format_row(&cells, sep));
    }
    out.into_bytes()
}

/// JSON 数组，每行一个对象；空单元格为 null
fn json(table: &ResultTable) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<JsonValue> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, JsonValue> = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| {
                    let value = cell.clone().map(JsonValue::String).unwrap_or(JsonValue::Null);
                    (column.clone(), value)
                })
                .collect();
            JsonValue::Object(object)
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRecord;
    use crate::services::aggregate;
    use pretty_assertions::assert_eq;

    fn table() -> ResultTable {
        aggregate(&[
            StudentRecord::new("X1", "Rao, Asha").with_mark("MATH", "80"),
            StudentRecord::new("X2", "Ravi \"R\"").with_mark("PHY", "70"),
        ])
    }

    #[test]
    fn csv_quotes_and_leaves_nulls_empty() {
        let file = Exporter::new(ExportFormat::Csv).export(&table()).unwrap();
        assert_eq!(file.filename, "Sem Results.csv");
        assert_eq!(
            String::from_utf8(file.bytes).unwrap(),
            "USN,Student Name,MATH,PHY\nX1,\"Rao, Asha\",80,\nX2,\"Ravi \"\"R\"\"\",,70\n"
        );
    }

    #[test]
    fn json_uses_null_for_missing_subjects() {
        let file = Exporter::new(ExportFormat::Json).export(&table()).unwrap();
        let rows: Vec<JsonValue> = serde_json::from_slice(&file.bytes).unwrap();
        assert_eq!(rows[0]["MATH"], JsonValue::String("80".into()));
        assert_eq!(rows[0]["PHY"], JsonValue::Null);
    }

    #[test]
    fn reval_changes_the_filename() {
        let exporter = Exporter::new(ExportFormat::Tsv).reval(true);
        let file = exporter.export(&table()).unwrap();
        assert_eq!(file.content_disposition(), "attachment; filename=\"Reval Results.tsv\"");
    }

    #[test]
    fn empty_table_is_not_exported() {
        assert!(matches!(
            Exporter::default().export(&ResultTable::empty()),
            Err(ExportError::EmptyTable)
        ));
    }

    #[test]
    fn writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = Exporter::default().export(&table()).unwrap();
        let path = file.write_to_dir(&dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), file.bytes);
    }

    #[test]
    fn format_parses_from_text() {
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
