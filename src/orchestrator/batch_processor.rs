//! 批量查询处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量 USN 的查询和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：日志文件、OCR 引擎、解析器、查询流程
//! 2. **会话管理**：每批只打开一个浏览器会话，无论成功与否结束时都关闭
//! 3. **顺序查询**：会话有状态（表单、验证码、弹窗），只能一个一个查
//! 4. **全局统计**：汇总成功、不存在、重试耗尽的数量
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有浏览器会话的模块
//! - **向下委托**：单个 USN 的重试逻辑交给 `RetrievalFlow`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::chromium_session::BrowserSource;
use crate::infrastructure::{BrowserSession, ChromiumProvider, SessionProvider};
use crate::models::{CapturedPages, Identifier, ScrapeRequest};
use crate::orchestrator::pipeline::{ResultScraper, ScrapeOutcome};
use crate::services::{
    persist_records, CaptchaSolver, Exporter, InMemoryMarkStore, OcrConfig, OcrEngine, ResultParser,
};
use crate::utils::logging;
use crate::workflow::{
    AlertClassifier, RetrievalCtx, RetrievalFlow, RetrievalOutcome, RetrievalSettings, SkipReason,
};

/// 批次统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 请求查询的 USN 数量
    pub requested: usize,
    /// 成功拿到结果页的数量
    pub retrieved: usize,
    /// 门户提示不存在的数量
    pub not_found: usize,
    /// 重试耗尽后跳过的数量
    pub exhausted: usize,
    /// 所有 USN 的尝试次数之和
    pub attempts: usize,
}

/// 批量查询结果
#[derive(Debug, Clone, Default)]
pub struct BatchRetrieval {
    /// 按成功顺序保存的结果页
    pub pages: CapturedPages,
    pub report: BatchReport,
}

/// 在一个会话内顺序查询所有 USN
///
/// 会话在这里打开，也一定在这里关闭；打开失败的错误直接返回。
pub async fn retrieve_batch<P>(
    provider: &P,
    url: &str,
    identifiers: &[Identifier],
    flow: &RetrievalFlow,
) -> AppResult<BatchRetrieval>
where
    P: SessionProvider + ?Sized,
{
    let mut session = provider.open(url).await?;

    let retrieval = retrieve_all(&mut session, identifiers, flow).await;

    if let Err(e) = session.close().await {
        warn!("⚠️ 关闭浏览器会话失败: {}", e);
    }

    Ok(retrieval)
}

async fn retrieve_all<S>(session: &mut S, identifiers: &[Identifier], flow: &RetrievalFlow) -> BatchRetrieval
where
    S: BrowserSession + ?Sized,
{
    let total = identifiers.len();
    let mut retrieval = BatchRetrieval {
        report: BatchReport {
            requested: total,
            ..Default::default()
        },
        ..Default::default()
    };

    for (idx, identifier) in identifiers.iter().enumerate() {
        let ctx = RetrievalCtx::new(identifier.clone(), idx + 1, total);
        let report = flow.run(session, &ctx).await;
        retrieval.report.attempts += report.attempts;

        match report.outcome {
            RetrievalOutcome::Success(page) => {
                retrieval.report.retrieved += 1;
                if retrieval.pages.insert(page) {
                    warn!("{} ⚠️ 结果页重复，已用最新页面覆盖", ctx);
                }
            }
            RetrievalOutcome::Skipped(SkipReason::NotFound) => retrieval.report.not_found += 1,
            RetrievalOutcome::Skipped(SkipReason::RetriesExhausted) => {
                retrieval.report.exhausted += 1
            }
        }
    }

    retrieval
}

/// 一次运行的结果摘要
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: BatchReport,
    /// 导出文件路径；没有数据时为 None
    pub exported: Option<PathBuf>,
    /// 指定学期时写入的成绩
    pub store: Option<InMemoryMarkStore>,
}

/// 应用主结构
pub struct App {
    config: Config,
    scraper: ResultScraper<ChromiumProvider>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)
            .with_context(|| format!("无法写入日志文件: {}", config.output_log_file))?;

        let parser = Arc::new(ResultParser::new(config.layout.clone()).context("结果页布局配置无效")?);

        let solver = CaptchaSolver::new(ocr_engine(&config))
            .with_config(OcrConfig {
                languages: config.ocr_languages.clone(),
                ..OcrConfig::default()
            })
            .with_band(config.glyph_band);

        let flow = RetrievalFlow::new(
            config.locators.clone(),
            solver,
            parser.clone(),
            AlertClassifier::from_needles(&config.not_found_alerts),
            RetrievalSettings {
                max_retries: config.max_retries.max(1),
                alert_timeout: config.alert_timeout(),
                attempt_delay: config.attempt_delay(),
            },
        );

        let source = match config.browser_debug_port {
            Some(port) => BrowserSource::Attach { port },
            None => BrowserSource::Launch {
                executable: config.browser_executable_path(),
                headless: config.headless,
            },
        };

        Ok(Self {
            scraper: ResultScraper::new(ChromiumProvider::new(source), flow, parser),
            config,
        })
    }

    /// 运行一次抓取，有数据时导出到输出目录
    pub async fn run(&self, request: &ScrapeRequest) -> Result<RunSummary> {
        request.validate().context("请求参数无效")?;
        logging::log_startup(&request.url, self.config.max_retries);
        if let (Some(year), Some(branch)) = (request.batch_year(), request.branch_code()) {
            info!(
                "🎓 批次 {} / 专业 {} ({})",
                year,
                branch,
                request.branch_name().unwrap_or("未知专业")
            );
        }

        let started = Instant::now();
        let outcome = self.scraper.execute(request).await.context("抓取失败")?;

        let report = *outcome.report();
        logging::print_final_stats(
            report.retrieved,
            report.not_found,
            report.exhausted,
            report.requested,
            started.elapsed(),
        );

        let (table, records) = match outcome {
            ScrapeOutcome::Data { table, records, .. } => (table, records),
            ScrapeOutcome::NoData { .. } => {
                warn!("⚠️ 没有获取到任何数据，请检查 USN、范围或 URL");
                return Ok(RunSummary {
                    report,
                    exported: None,
                    store: None,
                });
            }
        };

        let file = Exporter::new(self.config.export_format)
            .reval(request.is_reval())
            .export(&table)?;
        let path = file.write_to_dir(Path::new(&self.config.output_dir))?;
        info!("💾 结果已导出: {}", path.display());

        let store = request.semester.map(|semester| {
            let mut store = InMemoryMarkStore::new();
            let batch_year = request.batch_year();
            persist_records(
                &mut store,
                &records,
                semester,
                request.branch_code(),
                batch_year.as_deref(),
            );
            info!(
                "🗂️ 第 {} 学期: {} 名学生, {} 个科目, {} 条成绩",
                semester,
                store.student_count(),
                store.subject_count(),
                store.mark_count()
            );
            store
        });

        Ok(RunSummary {
            report,
            exported: Some(path),
            store,
        })
    }
}

#[cfg(not(feature = "ocr"))]
fn ocr_engine(config: &Config) -> Arc<dyn OcrEngine> {
    Arc::new(crate::services::TesseractCli::new(&config.tesseract_path))
}

#[cfg(feature = "ocr")]
fn ocr_engine(_config: &Config) -> Arc<dyn OcrEngine> {
    Arc::new(crate::services::BundledTesseract::default())
}
