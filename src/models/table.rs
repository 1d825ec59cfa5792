//! 汇总结果表

use std::collections::HashSet;

use serde::Serialize;

use super::record::{NAME_COLUMN, USN_COLUMN};

/// 已发现的科目代码集合
///
/// 只增不减，按首次出现的顺序排列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectColumns {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl SubjectColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记科目代码，首次出现时返回 true
    pub fn observe(&mut self, code: &str) -> bool {
        if self.seen.contains(code) {
            return false;
        }
        self.seen.insert(code.to_string());
        self.ordered.push(code.to_string());
        true
    }

    pub fn contains(&self, code: &str) -> bool {
        self.seen.contains(code)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

/// 最终结果表：`["USN", "Student Name", 科目...]`，缺失单元格为 `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultTable {
    /// 不含任何行和列的空表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 以固定列加科目列构造表头
    pub fn with_subjects(subjects: &SubjectColumns) -> Self {
        let mut columns = vec![USN_COLUMN.to_string(), NAME_COLUMN.to_string()];
        columns.extend(subjects.iter().map(str::to_string));
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// 取某行某列的值；列不存在或单元格为空时返回 None
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// 按 USN 查找行号
    pub fn find_row(&self, usn: &str) -> Option<usize> {
        let col = self.column_index(USN_COLUMN)?;
        self.rows
            .iter()
            .position(|row| row.get(col).and_then(|c| c.as_deref()) == Some(usn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_columns_keep_first_seen_order() {
        let mut cols = SubjectColumns::new();
        assert!(cols.observe("18CS51"));
        assert!(cols.observe("18CS52"));
        assert!(!cols.observe("18CS51"));
        assert_eq!(cols.iter().collect::<Vec<_>>(), vec!["18CS51", "18CS52"]);
    }

    #[test]
    fn table_lookup_by_usn_and_column() {
        let mut subjects = SubjectColumns::new();
        subjects.observe("MATH");
        let mut table = ResultTable::with_subjects(&subjects);
        table.rows.push(vec![Some("X1".into()), Some("Asha".into()), None]);

        assert_eq!(table.find_row("X1"), Some(0));
        assert_eq!(table.cell(0, "Student Name"), Some("Asha"));
        assert_eq!(table.cell(0, "MATH"), None);
        assert_eq!(table.cell(0, "PHY"), None);
    }
}
