//! # Result Scrape
//!
//! 一个用于批量抓取大学考试成绩的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器会话），只暴露能力
//! - `BrowserSession` / `SessionProvider` - 会话抽象，测试时可替换
//! - `ChromiumSession` - 基于 chromiumoxide 的实现
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `CaptchaSolver` - 灰度带过滤 + OCR，永远返回 6 个字符
//! - `ResultParser` - 从结果页读取身份和各科成绩
//! - `aggregate` - 把多个学生的成绩汇总成一张表
//! - `Exporter` / `MarkStore` - 导出表格、持久化成绩
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个 USN"的完整查询流程
//! - `RetrievalCtx` - 上下文封装（USN + 序号）
//! - `RetrievalFlow` - 状态机（FillForm → SolveCaptcha → Interpret）和重试策略
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量查询，持有并关闭会话
//! - `orchestrator/pipeline` - 范围展开 → 查询 → 解析 → 汇总
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{Locator, LocatorSet};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserSession, ChromiumProvider, JsExecutor, SessionProvider};
pub use models::{expand, CapturedPage, CapturedPages, Identifier, ResultTable, ScrapeRequest, StudentRecord};
pub use orchestrator::{retrieve_batch, App, BatchReport, ResultScraper, ScrapeOutcome};
pub use services::{aggregate, CaptchaSolver, Exporter, OcrEngine, ResultParser};
pub use workflow::{RetrievalCtx, RetrievalFlow, RetrievalOutcome};
