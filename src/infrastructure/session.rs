//! 浏览器会话抽象 - 基础设施层
//!
//! 查询流程只依赖这两个 trait，测试时可以换成脚本化的假会话。

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::Locator;
use crate::error::AppResult;

/// 一个独占的、有状态的浏览器会话
///
/// 所有方法都要求 `&mut self`：一个批次内只有查询流程在操作它。
#[async_trait]
pub trait BrowserSession: Send {
    /// 清空并填写输入框
    async fn set_field(&mut self, locator: &Locator, value: &str) -> AppResult<()>;

    /// 截取元素区域，返回 PNG 字节
    async fn screenshot_element(&mut self, locator: &Locator) -> AppResult<Vec<u8>>;

    /// 点击元素
    async fn click(&mut self, locator: &Locator) -> AppResult<()>;

    /// 在超时内等待弹窗；出现时确认弹窗并返回其文本
    async fn wait_for_alert(&mut self, timeout: Duration) -> AppResult<Option<String>>;

    /// 当前页面的 HTML
    async fn page_source(&mut self) -> AppResult<String>;

    /// 返回上一页
    async fn go_back(&mut self) -> AppResult<()>;

    /// 重新打开会话最初导航到的查询页
    async fn reset(&mut self) -> AppResult<()>;

    /// 结束会话并释放浏览器资源
    async fn close(&mut self) -> AppResult<()>;
}

/// 会话提供者：打开浏览器并导航到查询页
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: BrowserSession;

    /// 打开会话；无法启动浏览器或无法打开 URL 时返回致命错误
    async fn open(&self, url: &str) -> AppResult<Self::Session>;
}
