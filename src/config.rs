use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::browser::LocatorSet;
use crate::error::ConfigError;
use crate::services::{ExportFormat, GlyphBand, PageLayout};
use crate::workflow::alert::DEFAULT_NOT_FOUND_ALERT;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器可执行文件路径，留空时自动查找
    pub browser_executable: Option<String>,
    /// 是否无头运行
    pub headless: bool,
    /// 设置后连接到该调试端口上已运行的浏览器，而不是启动新浏览器
    pub browser_debug_port: Option<u16>,
    /// 每个 USN 的最大尝试次数
    pub max_retries: usize,
    /// 每次尝试后的固定等待（毫秒）
    pub attempt_delay_ms: u64,
    /// 提交后等待弹窗的时间（毫秒）
    pub alert_timeout_ms: u64,
    /// tesseract 可执行文件路径
    pub tesseract_path: String,
    /// OCR 语言
    pub ocr_languages: String,
    /// 验证码字形灰度区间
    pub glyph_band: GlyphBand,
    /// 导出目录
    pub output_dir: String,
    /// 导出格式
    pub export_format: ExportFormat,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 表示"USN 不存在"的弹窗文本片段
    pub not_found_alerts: Vec<String>,
    /// 查询表单定位器
    pub locators: LocatorSet,
    /// 结果页结构
    pub layout: PageLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_executable: None,
            headless: true,
            browser_debug_port: None,
            max_retries: 3,
            attempt_delay_ms: 1000,
            alert_timeout_ms: 1000,
            tesseract_path: "tesseract".to_string(),
            ocr_languages: "eng".to_string(),
            glyph_band: GlyphBand::default(),
            output_dir: "output".to_string(),
            export_format: ExportFormat::Csv,
            output_log_file: "scrape_log.txt".to_string(),
            verbose_logging: false,
            not_found_alerts: vec![DEFAULT_NOT_FOUND_ALERT.to_string()],
            locators: LocatorSet::default(),
            layout: PageLayout::default(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，缺失或无法解析的值使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_executable: std::env::var("BROWSER_EXECUTABLE").ok().or(default.browser_executable),
            headless: std::env::var("BROWSER_HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).or(default.browser_debug_port),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            attempt_delay_ms: std::env::var("ATTEMPT_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.attempt_delay_ms),
            alert_timeout_ms: std::env::var("ALERT_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.alert_timeout_ms),
            tesseract_path: std::env::var("TESSERACT_PATH").unwrap_or(default.tesseract_path),
            ocr_languages: std::env::var("OCR_LANGUAGES").unwrap_or(default.ocr_languages),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            export_format: std::env::var("EXPORT_FORMAT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.export_format),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            ..default
        }
    }

    /// 从 TOML 文件读取配置，文件中未出现的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn attempt_delay(&self) -> Duration {
        Duration::from_millis(self.attempt_delay_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_timeout_ms)
    }

    pub fn browser_executable_path(&self) -> Option<PathBuf> {
        self.browser_executable.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Locator;

    #[test]
    fn defaults_match_the_portal() {
        let config = Config::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.alert_timeout(), Duration::from_secs(1));
        assert_eq!(config.locators.identifier_field, Locator::Name("lns".into()));
        assert_eq!(config.glyph_band, GlyphBand { min: 102, max: 130 });
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            max_retries = 5
            export_format = "json"
            not_found_alerts = ["not available", "invalid usn"]

            [locators]
            submit_button = { by = "css", value = "button[type=submit]" }

            [layout]
            total_header = "Total Marks"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.export_format, ExportFormat::Json);
        assert_eq!(config.not_found_alerts.len(), 2);
        assert_eq!(config.locators.submit_button, Locator::Css("button[type=submit]".into()));
        assert_eq!(config.locators.captcha_field, Locator::Name("captchacode".into()));
        assert_eq!(config.layout.total_header, "Total Marks");
        assert_eq!(config.layout.subject_code_header, "Subject Code");
        assert!(config.headless);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::from_toml_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }
}
