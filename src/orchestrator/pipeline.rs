//! 抓取流水线 - 编排层
//!
//! 范围展开 → 逐个查询 → 解析结果页 → 汇总成表

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppResult;
use crate::infrastructure::SessionProvider;
use crate::models::{expand_with_warnings, CapturedPages, ResultTable, ScrapeRequest, StudentRecord};
use crate::orchestrator::batch_processor::{retrieve_batch, BatchReport};
use crate::services::{aggregate, ResultParser};
use crate::utils::logging;
use crate::workflow::RetrievalFlow;

/// 一次抓取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// 至少有一条可用记录
    Data {
        table: ResultTable,
        records: Vec<StudentRecord>,
        report: BatchReport,
    },
    /// 会话正常跑完，但没有任何可用记录
    NoData { report: BatchReport },
}

impl ScrapeOutcome {
    pub fn report(&self) -> &BatchReport {
        match self {
            ScrapeOutcome::Data { report, .. } | ScrapeOutcome::NoData { report } => report,
        }
    }

    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            ScrapeOutcome::Data { table, .. } => Some(table),
            ScrapeOutcome::NoData { .. } => None,
        }
    }
}

/// 解析所有结果页并汇总
///
/// 没有学期成绩块或没有有效科目的页面不进入汇总。
pub fn consolidate(parser: &ResultParser, pages: &CapturedPages) -> (Vec<StudentRecord>, ResultTable) {
    let records: Vec<StudentRecord> = pages
        .iter()
        .filter_map(|page| {
            let record = parser.parse_captured(page);
            if record.is_none() {
                debug!("[USN {}] 结果页没有可用成绩，已忽略", page.usn);
            }
            record
        })
        .collect();

    let table = aggregate(&records);
    (records, table)
}

/// 成绩抓取器
pub struct ResultScraper<P> {
    provider: P,
    flow: RetrievalFlow,
    parser: Arc<ResultParser>,
}

impl<P: SessionProvider> ResultScraper<P> {
    pub fn new(provider: P, flow: RetrievalFlow, parser: Arc<ResultParser>) -> Self {
        Self {
            provider,
            flow,
            parser,
        }
    }

    /// 执行一次完整抓取
    ///
    /// 浏览器无法启动或查询页无法打开时返回错误；其余失败都在内部消化。
    pub async fn execute(&self, request: &ScrapeRequest) -> AppResult<ScrapeOutcome> {
        let expansion = expand_with_warnings(&request.prefix, &request.range);
        logging::log_identifiers_expanded(expansion.identifiers.len(), expansion.warnings.len());

        if expansion.identifiers.is_empty() {
            info!("⚠️ 没有可查询的 USN，不启动浏览器");
            return Ok(ScrapeOutcome::NoData {
                report: BatchReport::default(),
            });
        }

        let retrieval =
            retrieve_batch(&self.provider, &request.url, &expansion.identifiers, &self.flow).await?;

        let (records, table) = consolidate(&self.parser, &retrieval.pages);
        info!(
            "📋 解析完成: {} 个结果页, {} 条可用记录, {} 个科目列",
            retrieval.pages.len(),
            records.len(),
            table.columns.len().saturating_sub(2)
        );

        if table.is_empty() {
            return Ok(ScrapeOutcome::NoData {
                report: retrieval.report,
            });
        }

        Ok(ScrapeOutcome::Data {
            table,
            records,
            report: retrieval.report,
        })
    }
}
