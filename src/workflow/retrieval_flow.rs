//! 单个 USN 的查询流程 - 流程层
//!
//! 每次尝试依次经过三个阶段：
//! 1. FillForm：清空并填写 USN
//! 2. SolveCaptcha：截取验证码、识别、填写、提交
//! 3. Interpret：短暂等待弹窗，判断是"不存在"、"验证码被拒"还是成功
//!
//! 提交后没有弹窗时，尝试结束前一定回到查询表单：成功时后退，读取失败时重新打开查询页。
//!
//! 尝试的结果交给 [`transition`] 决定下一步：重试、跳过或成功。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::LocatorSet;
use crate::error::{AppError, AppResult};
use crate::infrastructure::BrowserSession;
use crate::models::CapturedPage;
use crate::services::{CaptchaSolver, ResultParser};
use crate::utils::logging::truncate_text;
use crate::workflow::alert::{AlertClassifier, AlertKind};
use crate::workflow::retrieval_ctx::RetrievalCtx;

/// 每个 USN 的默认最大尝试次数
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// 一次尝试中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalState {
    FillForm,
    SolveCaptcha,
    Interpret,
}

/// 一次尝试的结果
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 门户提示 USN 不存在
    NotFound { alert: String },
    /// 其他弹窗，视为验证码被拒
    CaptchaRejected { alert: String },
    /// 没有弹窗，拿到了结果页
    Retrieved(CapturedPage),
    /// 某个阶段出错（元素缺失、超时、网络抖动等）
    Failed {
        stage: RetrievalState,
        error: AppError,
    },
}

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    RetriesExhausted,
}

/// 状态转移
#[derive(Debug)]
pub enum Transition {
    /// 回到 FillForm 再试一次
    Retry { next_attempt: usize },
    /// 结束：成功
    Succeed(CapturedPage),
    /// 结束：跳过
    Skip(SkipReason),
}

/// 根据本次尝试的结果决定下一步
///
/// `attempt` 从 1 开始计数。"不存在"从不重试；验证码被拒和阶段错误都消耗一次重试。
pub fn transition(attempt: usize, max_retries: usize, outcome: AttemptOutcome) -> Transition {
    match outcome {
        AttemptOutcome::Retrieved(page) => Transition::Succeed(page),
        AttemptOutcome::NotFound { .. } => Transition::Skip(SkipReason::NotFound),
        AttemptOutcome::CaptchaRejected { .. } | AttemptOutcome::Failed { .. } => {
            if attempt < max_retries {
                Transition::Retry {
                    next_attempt: attempt + 1,
                }
            } else {
                Transition::Skip(SkipReason::RetriesExhausted)
            }
        }
    }
}

/// 单个 USN 的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Success(CapturedPage),
    Skipped(SkipReason),
}

/// 单个 USN 的查询报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalReport {
    pub outcome: RetrievalOutcome,
    /// 实际进行的尝试次数
    pub attempts: usize,
}

/// 查询节奏参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub max_retries: usize,
    /// 提交后等待弹窗的时间
    pub alert_timeout: Duration,
    /// 每次尝试之后的固定间隔，避免请求过快
    pub attempt_delay: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            alert_timeout: Duration::from_secs(1),
            attempt_delay: Duration::from_secs(1),
        }
    }
}

/// 查询流程
///
/// - 编排一次尝试的三个阶段
/// - 决定何时重试、何时放弃
/// - 不持有浏览器会话，由编排层借给它
pub struct RetrievalFlow {
    locators: LocatorSet,
    solver: CaptchaSolver,
    parser: Arc<ResultParser>,
    classifier: AlertClassifier,
    settings: RetrievalSettings,
}

impl RetrievalFlow {
    pub fn new(
        locators: LocatorSet,
        solver: CaptchaSolver,
        parser: Arc<ResultParser>,
        classifier: AlertClassifier,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            locators,
            solver,
            parser,
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// 查询一个 USN，直到成功、确认不存在或用完重试次数
    pub async fn run<S>(&self, session: &mut S, ctx: &RetrievalCtx) -> RetrievalReport
    where
        S: BrowserSession + ?Sized,
    {
        let mut attempt = 1;

        loop {
            debug!("{} 第 {}/{} 次尝试", ctx, attempt, self.settings.max_retries);
            let outcome = self.attempt(session, ctx).await;
            self.log_outcome(ctx, attempt, &outcome);

            if !self.settings.attempt_delay.is_zero() {
                sleep(self.settings.attempt_delay).await;
            }

            match transition(attempt, self.settings.max_retries, outcome) {
                Transition::Retry { next_attempt } => attempt = next_attempt,
                Transition::Succeed(page) => {
                    info!("{} ✓ 成功获取 {} 的成绩", ctx, page.key());
                    return RetrievalReport {
                        outcome: RetrievalOutcome::Success(page),
                        attempts: attempt,
                    };
                }
                Transition::Skip(reason) => {
                    match reason {
                        SkipReason::NotFound => warn!("{} ⚠️ USN 不存在，跳过", ctx),
                        SkipReason::RetriesExhausted => {
                            warn!("{} ⚠️ 已尝试 {} 次仍失败，跳过", ctx, attempt)
                        }
                    }
                    return RetrievalReport {
                        outcome: RetrievalOutcome::Skipped(reason),
                        attempts: attempt,
                    };
                }
            }
        }
    }

    /// 执行一次完整尝试：FillForm → SolveCaptcha → Interpret
    async fn attempt<S>(&self, session: &mut S, ctx: &RetrievalCtx) -> AttemptOutcome
    where
        S: BrowserSession + ?Sized,
    {
        if let Err(error) = self.fill_form(session, ctx).await {
            return AttemptOutcome::Failed {
                stage: RetrievalState::FillForm,
                error,
            };
        }

        if let Err(error) = self.solve_captcha(session).await {
            return AttemptOutcome::Failed {
                stage: RetrievalState::SolveCaptcha,
                error,
            };
        }

        let outcome = match self.interpret(session).await {
            Ok(outcome) => outcome,
            Err(error) => AttemptOutcome::Failed {
                stage: RetrievalState::Interpret,
                error,
            },
        };

        // 弹窗确认后仍停在查询页；其余情况都已经离开了表单，或者不确定停在哪一页
        match &outcome {
            AttemptOutcome::Retrieved(_) => self.restore_form(session, ctx).await,
            AttemptOutcome::Failed { .. } => self.reopen_form(session, ctx).await,
            AttemptOutcome::NotFound { .. } | AttemptOutcome::CaptchaRejected { .. } => {}
        }

        outcome
    }

    async fn fill_form<S>(&self, session: &mut S, ctx: &RetrievalCtx) -> AppResult<()>
    where
        S: BrowserSession + ?Sized,
    {
        session
            .set_field(&self.locators.identifier_field, ctx.identifier.as_str())
            .await
    }

    async fn solve_captcha<S>(&self, session: &mut S) -> AppResult<()>
    where
        S: BrowserSession + ?Sized,
    {
        let image = session.screenshot_element(&self.locators.captcha_image).await?;
        let guess = self.solver.solve(&image).await;
        session.set_field(&self.locators.captcha_field, &guess).await?;
        session.click(&self.locators.submit_button).await
    }

    async fn interpret<S>(&self, session: &mut S) -> AppResult<AttemptOutcome>
    where
        S: BrowserSession + ?Sized,
    {
        if let Some(alert) = session.wait_for_alert(self.settings.alert_timeout).await? {
            return Ok(match self.classifier.classify(&alert) {
                AlertKind::NotFound => AttemptOutcome::NotFound { alert },
                AlertKind::Rejected => AttemptOutcome::CaptchaRejected { alert },
            });
        }

        // 没有弹窗：页面上读回的 USN 才是权威值
        let markup = session.page_source().await?;
        let (usn, name) = self.parser.parse_identity(&markup)?;
        Ok(AttemptOutcome::Retrieved(CapturedPage::new(usn, name, markup)))
    }

    /// 回到查询表单：先后退，后退失败时重新打开查询页
    async fn restore_form<S>(&self, session: &mut S, ctx: &RetrievalCtx)
    where
        S: BrowserSession + ?Sized,
    {
        let Err(e) = session.go_back().await else {
            return;
        };
        warn!("{} ⚠️ 返回查询页失败: {}", ctx, e);
        self.reopen_form(session, ctx).await;
    }

    async fn reopen_form<S>(&self, session: &mut S, ctx: &RetrievalCtx)
    where
        S: BrowserSession + ?Sized,
    {
        debug!("{} 重新打开查询页", ctx);
        if let Err(e) = session.reset().await {
            warn!("{} ❌ 重新打开查询页失败: {}", ctx, e);
        }
    }

    fn log_outcome(&self, ctx: &RetrievalCtx, attempt: usize, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::NotFound { alert } => {
                debug!("{} 弹窗: {}", ctx, truncate_text(alert, 80))
            }
            AttemptOutcome::CaptchaRejected { alert } => warn!(
                "{} 验证码被拒 ({}/{}): {}",
                ctx,
                attempt,
                self.settings.max_retries,
                truncate_text(alert, 80)
            ),
            AttemptOutcome::Retrieved(_) => {}
            AttemptOutcome::Failed { stage, error } => warn!(
                "{} 尝试出错 ({}/{}) 阶段 {:?}: {}",
                ctx, attempt, self.settings.max_retries, stage, error
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;

    fn rejected() -> AttemptOutcome {
        AttemptOutcome::CaptchaRejected {
            alert: "Invalid captcha code !!!".into(),
        }
    }

    #[test]
    fn not_found_is_terminal_on_first_attempt() {
        let next = transition(
            1,
            3,
            AttemptOutcome::NotFound {
                alert: "University Seat Number is not available or Invalid..!".into(),
            },
        );
        assert!(matches!(next, Transition::Skip(SkipReason::NotFound)));
    }

    #[test]
    fn rejection_retries_until_budget_is_spent() {
        assert!(matches!(
            transition(1, 3, rejected()),
            Transition::Retry { next_attempt: 2 }
        ));
        assert!(matches!(
            transition(2, 3, rejected()),
            Transition::Retry { next_attempt: 3 }
        ));
        assert!(matches!(
            transition(3, 3, rejected()),
            Transition::Skip(SkipReason::RetriesExhausted)
        ));
    }

    #[test]
    fn stage_errors_consume_a_retry() {
        let failed = AttemptOutcome::Failed {
            stage: RetrievalState::FillForm,
            error: BrowserError::ElementNotFound {
                locator: "name=lns".into(),
            }
            .into(),
        };
        assert!(matches!(
            transition(1, 3, failed),
            Transition::Retry { next_attempt: 2 }
        ));
    }

    #[test]
    fn retrieved_page_succeeds_even_on_last_attempt() {
        let page = CapturedPage::new("X1", "Asha", "<html/>");
        assert!(matches!(
            transition(3, 3, AttemptOutcome::Retrieved(page)),
            Transition::Succeed(_)
        ));
    }
}
