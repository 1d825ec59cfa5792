/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 默认级别为 info（verbose 时为 debug），可通过 `RUST_LOG` 覆盖
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能重复初始化，忽略已初始化的错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n成绩抓取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `url`: 查询页 URL
/// - `max_retries`: 每个 USN 的最大尝试次数
pub fn log_startup(url: &str, max_retries: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 成绩批量抓取");
    info!("🌐 查询页: {}", url);
    info!("🔁 每个 USN 最多尝试 {} 次", max_retries);
    info!("{}", "=".repeat(60));
}

/// 记录 USN 展开信息
///
/// # 参数
/// - `total`: 展开得到的 USN 数量
/// - `skipped_segments`: 被跳过的范围段数量
pub fn log_identifiers_expanded(total: usize, skipped_segments: usize) {
    info!("✓ 共展开 {} 个待查询的 USN", total);
    if skipped_segments > 0 {
        info!("⚠️ 有 {} 个范围段无效，已跳过", skipped_segments);
    }
}

/// 打印最终统计信息
///
/// # 参数
/// - `retrieved`: 成功数量
/// - `not_found`: 不存在的数量
/// - `exhausted`: 重试耗尽的数量
/// - `total`: 总数
/// - `elapsed`: 耗时
pub fn print_final_stats(
    retrieved: usize,
    not_found: usize,
    exhausted: usize,
    total: usize,
    elapsed: Duration,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("耗时: {:.1} 秒", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", retrieved, total);
    info!("🚫 不存在: {}", not_found);
    info!("❌ 重试耗尽: {}", exhausted);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("成绩抓取日志", 2), "成绩...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn log_file_gets_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        init_log_file(path.to_str().unwrap()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("成绩抓取日志"));
    }
}
