//! 抓取结果与学生成绩记录

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 结果表中的 USN 列名
pub const USN_COLUMN: &str = "USN";
/// 结果表中的姓名列名
pub const NAME_COLUMN: &str = "Student Name";

/// 一次成功查询得到的原始结果页
///
/// `usn` 是从页面上读回的 USN，而不是查询时使用的 USN，两者可能大小写不同。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPage {
    pub usn: String,
    pub name: String,
    pub markup: String,
}

impl CapturedPage {
    pub fn new(usn: impl Into<String>, name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            usn: usn.into(),
            name: name.into(),
            markup: markup.into(),
        }
    }

    /// 结果页的键：`"<USN>+<姓名>"`
    pub fn key(&self) -> String {
        format!("{}+{}", self.usn, self.name)
    }
}

/// 按成功顺序保存的结果页集合，以 `"<USN>+<姓名>"` 为键
///
/// 同一个键再次出现时替换原页面，但保留原来的位置。
#[derive(Debug, Clone, Default)]
pub struct CapturedPages {
    pages: Vec<CapturedPage>,
    index: HashMap<String, usize>,
}

impl CapturedPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入页面，返回该键是否已存在
    pub fn insert(&mut self, page: CapturedPage) -> bool {
        let key = page.key();
        match self.index.get(&key) {
            Some(&pos) => {
                self.pages[pos] = page;
                true
            }
            None => {
                self.index.insert(key, self.pages.len());
                self.pages.push(page);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&CapturedPage> {
        self.index.get(key).map(|&pos| &self.pages[pos])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.pages.iter().map(CapturedPage::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CapturedPage> {
        self.pages.iter()
    }
}

impl<'a> IntoIterator for &'a CapturedPages {
    type Item = &'a CapturedPage;
    type IntoIter = std::slice::Iter<'a, CapturedPage>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

/// 单科成绩
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMark {
    /// 科目代码
    pub code: String,
    /// 科目名称（页面上有时缺失）
    pub name: Option<String>,
    /// 总分，保持页面上的原始字符串
    pub total: String,
    /// 结果列（P / F / A ...）
    pub result: Option<String>,
}

impl SubjectMark {
    pub fn new(code: impl Into<String>, total: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
            total: total.into(),
            result: None,
        }
    }
}

/// 单个学生的成绩记录
///
/// 科目列在解析时才被发现；同一科目重复出现时以后出现的成绩为准。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub usn: String,
    pub name: String,
    pub marks: Vec<SubjectMark>,
}

impl StudentRecord {
    pub fn new(usn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            usn: usn.into(),
            name: name.into(),
            marks: Vec::new(),
        }
    }

    /// 写入一科成绩
    pub fn set_mark(&mut self, mark: SubjectMark) {
        match self.marks.iter_mut().find(|m| m.code == mark.code) {
            Some(existing) => *existing = mark,
            None => self.marks.push(mark),
        }
    }

    /// 便捷写入：只有科目代码和总分
    pub fn with_mark(mut self, code: impl Into<String>, total: impl Into<String>) -> Self {
        self.set_mark(SubjectMark::new(code, total));
        self
    }

    /// 按列名取值；`USN` 和 `Student Name` 是固定列
    pub fn get(&self, column: &str) -> Option<&str> {
        match column {
            USN_COLUMN => Some(&self.usn),
            NAME_COLUMN => Some(&self.name),
            code => self
                .marks
                .iter()
                .find(|m| m.code == code)
                .map(|m| m.total.as_str()),
        }
    }

    /// 按出现顺序返回科目代码
    pub fn subject_codes(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().map(|m| m.code.as_str())
    }

    /// 除 USN / 姓名外没有任何科目时视为无可用数据
    pub fn has_marks(&self) -> bool {
        !self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_pages_keep_first_position_on_duplicate_key() {
        let mut pages = CapturedPages::new();
        assert!(!pages.insert(CapturedPage::new("A1", "Asha", "<p>1</p>")));
        assert!(!pages.insert(CapturedPage::new("A2", "Ravi", "<p>2</p>")));
        assert!(pages.insert(CapturedPage::new("A1", "Asha", "<p>3</p>")));

        let keys: Vec<String> = pages.keys().collect();
        assert_eq!(keys, vec!["A1+Asha", "A2+Ravi"]);
        assert_eq!(pages.get("A1+Asha").map(|p| p.markup.as_str()), Some("<p>3</p>"));
    }

    #[test]
    fn record_lookup_covers_fixed_and_subject_columns() {
        let record = StudentRecord::new("X1", "Asha")
            .with_mark("MATH", "80")
            .with_mark("MATH", "85");
        assert_eq!(record.get(USN_COLUMN), Some("X1"));
        assert_eq!(record.get(NAME_COLUMN), Some("Asha"));
        assert_eq!(record.get("MATH"), Some("85"));
        assert_eq!(record.get("PHY"), None);
        assert_eq!(record.marks.len(), 1);
    }
}
