//! 成绩持久化接口
//!
//! 只定义按自然键 upsert 的能力；关系型存储由调用方实现。
//! 自带一个内存实现，供测试和单次运行内去重使用。

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::StudentRecord;

/// 学生
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEntry {
    pub usn: String,
    pub name: String,
    pub branch_code: Option<String>,
    pub batch_year: Option<String>,
}

/// 科目，自然键为 (科目代码, 学期)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectEntry {
    pub code: String,
    pub name: Option<String>,
    pub semester: u8,
}

/// 成绩，自然键为 (USN, 科目代码, 学期)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkEntry {
    pub usn: String,
    pub subject_code: String,
    pub semester: u8,
    pub marks: u32,
    pub grade: Option<String>,
}

/// 按自然键 upsert 的存储
pub trait MarkStore {
    fn upsert_student(&mut self, student: StudentEntry);
    fn upsert_subject(&mut self, subject: SubjectEntry);
    fn upsert_mark(&mut self, mark: MarkEntry);
}

/// 内存存储
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarkStore {
    students: BTreeMap<String, StudentEntry>,
    subjects: BTreeMap<(String, u8), SubjectEntry>,
    marks: BTreeMap<(String, String, u8), MarkEntry>,
}

impl InMemoryMarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student(&self, usn: &str) -> Option<&StudentEntry> {
        self.students.get(usn)
    }

    pub fn subject(&self, code: &str, semester: u8) -> Option<&SubjectEntry> {
        self.subjects.get(&(code.to_string(), semester))
    }

    pub fn mark(&self, usn: &str, subject_code: &str, semester: u8) -> Option<&MarkEntry> {
        self.marks
            .get(&(usn.to_string(), subject_code.to_string(), semester))
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn mark_count(&self) -> usize {
        self.marks.len()
    }
}

impl MarkStore for InMemoryMarkStore {
    fn upsert_student(&mut self, student: StudentEntry) {
        self.students.insert(student.usn.clone(), student);
    }

    fn upsert_subject(&mut self, subject: SubjectEntry) {
        let key = (subject.code.clone(), subject.semester);
        match self.subjects.get_mut(&key) {
            // 已知科目名不被空值覆盖
            Some(_) if subject.name.is_none() => {}
            _ => {
                self.subjects.insert(key, subject);
            }
        }
    }

    fn upsert_mark(&mut self, mark: MarkEntry) {
        let key = (mark.usn.clone(), mark.subject_code.clone(), mark.semester);
        self.marks.insert(key, mark);
    }
}

/// 把解析出的记录写入存储
///
/// 总分不是整数的科目不写入成绩表。
pub fn persist_records<S: MarkStore + ?Sized>(
    store: &mut S,
    records: &[StudentRecord],
    semester: u8,
    branch_code: Option<&str>,
    batch_year: Option<&str>,
) {
    for record in records {
        store.upsert_student(StudentEntry {
            usn: record.usn.clone(),
            name: record.name.clone(),
            branch_code: branch_code.map(str::to_string),
            batch_year: batch_year.map(str::to_string),
        });

        for mark in &record.marks {
            store.upsert_subject(SubjectEntry {
                code: mark.code.clone(),
                name: mark.name.clone(),
                semester,
            });

            let Ok(marks) = mark.total.parse::<u32>() else {
                debug!("[USN {}] {} 总分无法转换为整数: {}", record.usn, mark.code, mark.total);
                continue;
            };
            store.upsert_mark(MarkEntry {
                usn: record.usn.clone(),
                subject_code: mark.code.clone(),
                semester,
                marks,
                grade: mark.result.clone(),
            });
        }
    }
}
