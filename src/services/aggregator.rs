//! 成绩汇总服务 - 业务能力层
//!
//! 把所有学生记录折叠成一张表，科目列取所有记录的并集。

use crate::models::{ResultTable, StudentRecord, SubjectColumns};

/// 按记录顺序收集科目代码（首次出现顺序）
pub fn discover_columns(records: &[StudentRecord]) -> SubjectColumns {
    let mut columns = SubjectColumns::new();
    for record in records.iter().filter(|r| r.has_marks()) {
        for code in record.subject_codes() {
            columns.observe(code);
        }
    }
    columns
}

/// 汇总记录
///
/// - 输入为空（或全部没有科目）时返回空表
/// - 行顺序与记录顺序一致
/// - 记录中缺失的科目单元格填 `None`
pub fn aggregate(records: &[StudentRecord]) -> ResultTable {
    let usable: Vec<&StudentRecord> = records.iter().filter(|r| r.has_marks()).collect();
    if usable.is_empty() {
        return ResultTable::empty();
    }

    let mut table = ResultTable::with_subjects(&discover_columns(records));
    for record in usable {
        let row = table
            .columns
            .iter()
            .map(|column| record.get(column).map(str::to_string))
            .collect();
        table.rows.push(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_gives_empty_table() {
        let table = aggregate(&[]);
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }

    #[test]
    fn disjoint_subjects_are_unioned_with_nulls() {
        let records = vec![
            StudentRecord::new("X1", "Asha").with_mark("MATH", "80"),
            StudentRecord::new("X2", "Ravi").with_mark("PHY", "70"),
        ];
        let table = aggregate(&records);

        assert_eq!(table.columns, vec!["USN", "Student Name", "MATH", "PHY"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Some("X1".into()), Some("Asha".into()), Some("80".into()), None],
                vec![Some("X2".into()), Some("Ravi".into()), None, Some("70".into())],
            ]
        );
    }

    #[test]
    fn records_without_marks_are_left_out() {
        let records = vec![
            StudentRecord::new("X1", "Asha"),
            StudentRecord::new("X2", "Ravi").with_mark("PHY", "70"),
        ];
        let table = aggregate(&records);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.find_row("X1"), None);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let records = vec![
            StudentRecord::new("X2", "Ravi").with_mark("PHY", "70").with_mark("CHEM", "55"),
            StudentRecord::new("X1", "Asha").with_mark("MATH", "80").with_mark("PHY", "66"),
        ];
        let first = aggregate(&records);
        assert_eq!(first, aggregate(&records));
        assert_eq!(first.columns, vec!["USN", "Student Name", "PHY", "CHEM", "MATH"]);
    }
}
