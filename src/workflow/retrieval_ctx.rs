//! 查询上下文
//!
//! 封装"我正在查询第几个 USN"这一信息

use std::fmt::Display;

use crate::models::Identifier;

/// 单个 USN 的查询上下文
#[derive(Debug, Clone)]
pub struct RetrievalCtx {
    /// 查询使用的 USN
    pub identifier: Identifier,

    /// 在本批次中的序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本批次 USN 总数
    pub total: usize,
}

impl RetrievalCtx {
    pub fn new(identifier: Identifier, index: usize, total: usize) -> Self {
        Self {
            identifier,
            index,
            total,
        }
    }
}

impl Display for RetrievalCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[USN {} ({}/{})]", self.identifier, self.index, self.total)
    }
}
