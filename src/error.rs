use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入参数错误
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 验证码识别错误
    #[error("验证码错误: {0}")]
    Captcha(#[from] CaptchaError),
    /// 页面解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 输入参数错误
///
/// 核心流程里的范围展开是宽松的（跳过坏段），只有请求边界上的严格校验才会返回这些错误。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// USN 前缀格式错误
    #[error("USN 前缀无效: '{prefix}' (格式应类似 1AB21CS)")]
    InvalidPrefix { prefix: String },
    /// 范围段格式错误
    #[error("范围段无效: '{segment}' ({reason})")]
    InvalidRange { segment: String, reason: String },
    /// 学期超出范围
    #[error("学期 {semester} 超出范围 [1, 8]")]
    InvalidSemester { semester: u8 },
    /// URL 格式错误
    #[error("URL 无效: '{url}'")]
    InvalidUrl { url: String },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 找不到页面元素
    #[error("找不到元素: {locator}")]
    ElementNotFound { locator: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器历史中没有可返回的页面
    #[error("没有可返回的历史页面")]
    NoHistory,
}

/// 验证码识别错误
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// 图片解码失败
    #[error("验证码图片解码失败: {0}")]
    Decode(#[from] image::ImageError),
    /// OCR 引擎启动失败
    #[error("OCR 引擎启动失败: {0}")]
    OcrInit(String),
    /// OCR 识别失败
    #[error("OCR 识别失败: {0}")]
    OcrProcessing(String),
}

/// 页面解析错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 页面中找不到学生身份信息
    #[error("页面中找不到学生身份信息")]
    MissingIdentity,
    /// 选择器语法错误
    #[error("选择器无效: '{selector}'")]
    InvalidSelector { selector: String },
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 结果表为空
    #[error("结果表为空，没有可导出的数据")]
    EmptyTable,
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建范围段错误
    pub fn invalid_range(segment: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Input(InputError::InvalidRange {
            segment: segment.into(),
            reason: reason.into(),
        })
    }

    /// 是否为致命错误（无法启动会话或无法打开目标页面）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Browser(BrowserError::LaunchFailed { .. })
                | AppError::Browser(BrowserError::ConnectionFailed { .. })
                | AppError::Browser(BrowserError::NavigationFailed { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
