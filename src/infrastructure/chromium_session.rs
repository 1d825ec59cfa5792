//! 基于 chromiumoxide 的浏览器会话

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventJavascriptDialogOpening, GetNavigationHistoryParams,
    HandleJavaScriptDialogParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::{self, LaunchOptions, Locator};
use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::{BrowserSession, JsExecutor, SessionProvider};

/// 浏览器来源
#[derive(Debug, Clone)]
pub enum BrowserSource {
    /// 启动新的浏览器进程
    Launch {
        executable: Option<PathBuf>,
        headless: bool,
    },
    /// 连接到已在运行的浏览器（远程调试端口）
    Attach { port: u16 },
}

/// chromiumoxide 会话提供者
#[derive(Debug, Clone)]
pub struct ChromiumProvider {
    source: BrowserSource,
}

impl ChromiumProvider {
    pub fn new(source: BrowserSource) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SessionProvider for ChromiumProvider {
    type Session = ChromiumSession;

    async fn open(&self, url: &str) -> AppResult<ChromiumSession> {
        let (browser, handler, attached) = match &self.source {
            BrowserSource::Launch {
                executable,
                headless,
            } => {
                let options = LaunchOptions {
                    executable: executable.as_deref(),
                    headless: *headless,
                };
                let (browser, handler) = browser::launch_headless_browser(options).await?;
                (browser, handler, false)
            }
            BrowserSource::Attach { port } => {
                let (browser, handler) = browser::connect_to_browser(*port).await?;
                (browser, handler, true)
            }
        };

        let mut session = ChromiumSession::start(browser, handler, attached).await?;

        // 导航失败也要先释放浏览器再返回错误
        if let Err(e) = session.navigate(url).await {
            if let Err(close_err) = session.close().await {
                warn!("⚠️ 导航失败后关闭浏览器出错: {}", close_err);
            }
            return Err(e);
        }

        Ok(session)
    }
}

/// chromiumoxide 浏览器会话
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    executor: JsExecutor,
    dialogs: EventStream<EventJavascriptDialogOpening>,
    attached: bool,
    /// 最近一次成功打开的查询页
    form_url: Option<String>,
}

impl ChromiumSession {
    async fn start(browser: Browser, handler: JoinHandle<()>, attached: bool) -> AppResult<Self> {
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::LaunchFailed {
                    source: Box::new(e),
                }
                .into());
            }
        };

        // 必须在提交表单之前订阅，否则会错过弹窗事件
        let dialogs = match page.event_listener::<EventJavascriptDialogOpening>().await {
            Ok(dialogs) => dialogs,
            Err(e) => {
                handler.abort();
                return Err(e.into());
            }
        };

        Ok(Self {
            browser: Some(browser),
            handler,
            executor: JsExecutor::new(page),
            dialogs,
            attached,
            form_url: None,
        })
    }

    async fn navigate(&mut self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.executor
            .page()
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        info!("✓ 已打开查询页: {}", url);
        self.form_url = Some(url.to_string());
        Ok(())
    }

    /// 在页面里执行一段针对单个元素的脚本，元素不存在时返回 ElementNotFound
    async fn with_element(&self, locator: &Locator, body: &str) -> AppResult<()> {
        let js = format!(
            "(() => {{ const el = {}; if (!el) return false; {} return true; }})()",
            locator.js_expression(),
            body
        );
        let found: bool = self.executor.eval_as(js).await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound {
                locator: locator.to_string(),
            }
            .into())
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn set_field(&mut self, locator: &Locator, value: &str) -> AppResult<()> {
        let literal = serde_json::to_string(value).map_err(|e| BrowserError::ScriptExecutionFailed {
            source: Box::new(e),
        })?;
        let body = format!(
            "el.value = ''; el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            literal
        );
        self.with_element(locator, &body).await
    }

    async fn screenshot_element(&mut self, locator: &Locator) -> AppResult<Vec<u8>> {
        let page = self.executor.page();
        let element = match locator {
            Locator::XPath(xpath) => page.find_xpath(xpath.as_str()).await,
            other => page.find_element(other.css_selector().unwrap_or_default()).await,
        }
        .map_err(|_| BrowserError::ElementNotFound {
            locator: locator.to_string(),
        })?;

        Ok(element.screenshot(CaptureScreenshotFormat::Png).await?)
    }

    async fn click(&mut self, locator: &Locator) -> AppResult<()> {
        // 提交后页面可能立刻弹出 alert 并阻塞渲染线程，
        // 所以点击放进 setTimeout，脚本本身立即返回
        self.with_element(locator, "setTimeout(() => el.click(), 0);")
            .await
    }

    async fn wait_for_alert(&mut self, timeout: Duration) -> AppResult<Option<String>> {
        match tokio::time::timeout(timeout, self.dialogs.next()).await {
            Ok(Some(event)) => {
                let message = event.message.clone();
                debug!("收到弹窗: {}", message);
                self.executor
                    .page()
                    .execute(HandleJavaScriptDialogParams::new(true))
                    .await?;
                Ok(Some(message))
            }
            // 事件流关闭说明页面已经没了
            Ok(None) => Err(BrowserError::ScriptExecutionFailed {
                source: "弹窗事件流已关闭".into(),
            }
            .into()),
            Err(_) => Ok(None),
        }
    }

    async fn page_source(&mut self) -> AppResult<String> {
        let page = self.executor.page();
        if let Err(e) = page.wait_for_navigation().await {
            debug!("等待页面加载完成失败: {}", e);
        }
        Ok(page.content().await?)
    }

    async fn go_back(&mut self) -> AppResult<()> {
        let page = self.executor.page();
        let history = page.execute(GetNavigationHistoryParams::default()).await?;

        let current = history.result.current_index;
        if current <= 0 {
            return Err(BrowserError::NoHistory.into());
        }
        let entry = history
            .result
            .entries
            .get((current - 1) as usize)
            .ok_or(BrowserError::NoHistory)?;

        page.execute(NavigateToHistoryEntryParams::new(entry.id))
            .await?;
        page.wait_for_navigation().await?;
        Ok(())
    }

    async fn reset(&mut self) -> AppResult<()> {
        let url = self.form_url.clone().ok_or(BrowserError::NoHistory)?;
        self.navigate(&url).await
    }

    async fn close(&mut self) -> AppResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let result = if self.attached {
            // 连接模式只关闭自己打开的标签页，不关闭用户的浏览器
            self.executor.page().clone().close().await.map_err(AppError::from)
        } else {
            match browser.close().await {
                Ok(_) => browser.wait().await.map(|_| ()).map_err(|e| {
                    BrowserError::LaunchFailed {
                        source: Box::new(e),
                    }
                    .into()
                }),
                Err(e) => Err(AppError::from(e)),
            }
        };

        self.handler.abort();
        info!("🔒 浏览器会话已关闭");
        result
    }
}
