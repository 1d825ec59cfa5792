//! 结果页解析服务 - 业务能力层
//!
//! 只负责"从一张结果页里取出身份和各科总分"，不关心页面从哪来。

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ParseError;
use crate::models::{CapturedPage, StudentRecord, SubjectMark};

/// 结果页的结构标记
///
/// 门户改版时只需要调整这里，不用改解析逻辑。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    /// 学期成绩块之前的标记容器（CSS 选择器）
    pub semester_marker: String,
    /// 成绩行（在成绩块内查找）
    pub marks_row: String,
    /// 成绩单元格（在成绩行内查找）
    pub marks_cell: String,
    /// 身份信息单元格
    pub identity_cell: String,
    /// USN 所在的身份单元格序号
    pub usn_cell_index: usize,
    /// 姓名所在的身份单元格序号
    pub name_cell_index: usize,
    pub subject_code_header: String,
    pub subject_name_header: String,
    pub total_header: String,
    pub result_header: String,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            semester_marker: r#"div[style="text-align:center;padding:5px;"]"#.to_string(),
            marks_row: "div.divTableRow".to_string(),
            marks_cell: "div.divTableCell".to_string(),
            identity_cell: "td".to_string(),
            usn_cell_index: 1,
            name_cell_index: 3,
            subject_code_header: "Subject Code".to_string(),
            subject_name_header: "Subject Name".to_string(),
            total_header: "Total".to_string(),
            result_header: "Result".to_string(),
        }
    }
}

/// 结果页解析器
#[derive(Debug, Clone)]
pub struct ResultParser {
    layout: PageLayout,
    semester_marker: Selector,
    marks_row: Selector,
    marks_cell: Selector,
    identity_cell: Selector,
}

impl ResultParser {
    /// 按给定布局编译选择器
    pub fn new(layout: PageLayout) -> Result<Self, ParseError> {
        Ok(Self {
            semester_marker: compile(&layout.semester_marker)?,
            marks_row: compile(&layout.marks_row)?,
            marks_cell: compile(&layout.marks_cell)?,
            identity_cell: compile(&layout.identity_cell)?,
            layout,
        })
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// 从结果页读回 USN（转大写）和姓名
    ///
    /// 身份单元格的文本形如 `University Seat Number : 1AB21CS001`，取第一个冒号之后的部分。
    pub fn parse_identity(&self, markup: &str) -> Result<(String, String), ParseError> {
        let doc = Html::parse_document(markup);
        let cells: Vec<String> = doc.select(&self.identity_cell).map(element_text).collect();

        let value_of = |index: usize| -> Option<String> {
            let text = cells.get(index)?;
            let (_, value) = text.split_once(':')?;
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        let usn = value_of(self.layout.usn_cell_index).ok_or(ParseError::MissingIdentity)?;
        let name = value_of(self.layout.name_cell_index).ok_or(ParseError::MissingIdentity)?;
        Ok((usn.to_uppercase(), name))
    }

    /// 解析一张结果页
    ///
    /// 找不到学期成绩块、或者一科有效成绩都没有时返回 None。
    /// 缺少科目代码、缺少总分或总分不是纯整数的行只跳过该行。
    pub fn parse(&self, markup: &str, usn: &str, name: &str) -> Option<StudentRecord> {
        let doc = Html::parse_document(markup);

        let Some(marker) = doc.select(&self.semester_marker).next() else {
            debug!("[USN {}] 页面中没有学期成绩块", usn);
            return None;
        };

        let block = marker
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "div")?;

        let table: Vec<Vec<String>> = block
            .select(&self.marks_row)
            .map(|row| row.select(&self.marks_cell).map(element_text).collect())
            .collect();

        if table.len() < 2 {
            debug!("[USN {}] 成绩块中没有数据行", usn);
            return None;
        }

        let header = &table[0];
        let column = |title: &str| header.iter().position(|h| h == title);
        let code_col = column(self.layout.subject_code_header.as_str());
        let total_col = column(self.layout.total_header.as_str());
        let name_col = column(self.layout.subject_name_header.as_str());
        let result_col = column(self.layout.result_header.as_str());

        let (Some(code_col), Some(total_col)) = (code_col, total_col) else {
            debug!("[USN {}] 表头缺少科目代码或总分列: {:?}", usn, header);
            return None;
        };

        let mut record = StudentRecord::new(usn, name);
        for row in &table[1..] {
            let code = row.get(code_col).filter(|c| !c.is_empty());
            let total = row.get(total_col).filter(|t| is_integer(t));

            let (Some(code), Some(total)) = (code, total) else {
                debug!("[USN {}] 跳过无效成绩行: {:?}", usn, row);
                continue;
            };

            record.set_mark(SubjectMark {
                code: code.clone(),
                name: name_col.and_then(|i| row.get(i)).filter(|n| !n.is_empty()).cloned(),
                total: total.clone(),
                result: result_col.and_then(|i| row.get(i)).filter(|r| !r.is_empty()).cloned(),
            });
        }

        record.has_marks().then_some(record)
    }

    /// 解析已抓取的结果页
    pub fn parse_captured(&self, page: &CapturedPage) -> Option<StudentRecord> {
        self.parse(&page.markup, &page.usn, &page.name)
    }
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|_| ParseError::InvalidSelector {
        selector: selector.to_string(),
    })
}

/// 元素文本，连续空白折叠为单个空格
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_integer(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <table>
        <tr><td>University Seat Number</td><td> : 1ab21cs001</td></tr>
        <tr><td>Student Name</td><td> : ASHA RAO</td></tr>
      </table>
      <div style="text-align:center;padding:5px;"><b>Semester : 5</b></div>
      <div class="divTable">
        <div class="divTableBody">
          <div class="divTableRow">
            <div class="divTableCell">Subject Code</div>
            <div class="divTableCell">Subject Name</div>
            <div class="divTableCell">Internal Marks</div>
            <div class="divTableCell">External Marks</div>
            <div class="divTableCell">Total</div>
            <div class="divTableCell">Result</div>
          </div>
          <div class="divTableRow">
            <div class="divTableCell">18CS51</div>
            <div class="divTableCell">Management</div>
            <div class="divTableCell">38</div>
            <div class="divTableCell">45</div>
            <div class="divTableCell">83</div>
            <div class="divTableCell">P</div>
          </div>
          <div class="divTableRow">
            <div class="divTableCell">18CS52</div>
            <div class="divTableCell">Networks</div>
            <div class="divTableCell">30</div>
            <div class="divTableCell">AB</div>
            <div class="divTableCell">AB</div>
            <div class="divTableCell">A</div>
          </div>
          <div class="divTableRow">
            <div class="divTableCell">18CS53</div>
            <div class="divTableCell">DBMS</div>
            <div class="divTableCell">35</div>
            <div class="divTableCell">40</div>
            <div class="divTableCell">75</div>
            <div class="divTableCell">P</div>
          </div>
        </div>
      </div>
    </body></html>
    "#;

    fn parser() -> ResultParser {
        ResultParser::new(PageLayout::default()).unwrap()
    }

    #[test]
    fn identity_is_read_back_and_upper_cased() {
        let (usn, name) = parser().parse_identity(PAGE).unwrap();
        assert_eq!(usn, "1AB21CS001");
        assert_eq!(name, "ASHA RAO");
    }

    #[test]
    fn identity_missing_is_an_error() {
        assert_eq!(
            parser().parse_identity("<html><body><p>busy</p></body></html>"),
            Err(ParseError::MissingIdentity)
        );
    }

    #[test]
    fn non_integer_total_skips_only_that_subject() {
        let record = parser().parse(PAGE, "1AB21CS001", "ASHA RAO").unwrap();
        let codes: Vec<&str> = record.subject_codes().collect();
        assert_eq!(codes, vec!["18CS51", "18CS53"]);
        assert_eq!(record.get("18CS51"), Some("83"));
        assert_eq!(record.marks[0].name.as_deref(), Some("Management"));
        assert_eq!(record.marks[0].result.as_deref(), Some("P"));
    }

    #[test]
    fn row_missing_total_cell_skips_only_that_subject() {
        // 18CS53 这一行只有四个单元格，Total 列不存在
        let page = PAGE.replace(
            r#"<div class="divTableCell">40</div>
            <div class="divTableCell">75</div>
            <div class="divTableCell">P</div>"#,
            "",
        );
        assert_ne!(page, PAGE);

        let record = parser().parse(&page, "1AB21CS001", "ASHA RAO").unwrap();
        let codes: Vec<&str> = record.subject_codes().collect();
        assert_eq!(codes, vec!["18CS51"]);
        assert_eq!(record.get("18CS51"), Some("83"));
        assert_eq!(record.get("18CS53"), None);
    }

    #[test]
    fn page_without_semester_block_has_no_data() {
        let page = "<html><body><table><tr><td>x</td></tr></table></body></html>";
        assert!(parser().parse(page, "X", "Y").is_none());
    }

    #[test]
    fn header_without_total_column_has_no_data() {
        let page = PAGE.replace(">Total<", ">Grand<");
        assert!(parser().parse(&page, "X", "Y").is_none());
    }

    #[test]
    fn invalid_selector_is_reported() {
        let layout = PageLayout {
            marks_row: "div[".to_string(),
            ..PageLayout::default()
        };
        assert!(matches!(
            ResultParser::new(layout),
            Err(ParseError::InvalidSelector { .. })
        ));
    }
}
