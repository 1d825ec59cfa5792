//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量查询和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量查询处理器
//! - 管理应用生命周期（初始化、运行）
//! - 持有浏览器会话，保证批次结束后一定释放
//! - 顺序查询每个 USN（一个会话只能串行使用）
//! - 输出全局统计信息
//!
//! ### `pipeline` - 抓取流水线
//! - 展开 USN 范围
//! - 调用批量查询
//! - 解析结果页并汇总成表
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (ScrapeRequest → ResultTable)
//!     ↓
//! batch_processor (处理 Vec<Identifier>)
//!     ↓
//! workflow::RetrievalFlow (处理单个 USN)
//!     ↓
//! services (能力层：captcha / parser / aggregator / exporter)
//!     ↓
//! infrastructure (基础设施：BrowserSession / JsExecutor)
//! ```

pub mod batch_processor;
pub mod pipeline;

pub use batch_processor::{retrieve_batch, App, BatchReport, BatchRetrieval, RunSummary};
pub use pipeline::{consolidate, ResultScraper, ScrapeOutcome};
