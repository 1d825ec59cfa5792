//! 验证码识别服务 - 业务能力层
//!
//! 只负责"把验证码图片变成 6 个字符"，识别失败也一定给出一个猜测，
//! 让上层可以照常提交、被拒后重试。

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CaptchaError;

/// 表单要求的验证码长度
pub const CAPTCHA_LENGTH: usize = 6;
/// 识别结果不足 6 位时的填充字符
pub const FILLER: char = 'A';
/// 识别彻底失败时提交的猜测
pub const FALLBACK_GUESS: &str = "AAAAAA";

/// 字形墨迹的灰度区间（闭区间，三个通道必须相等）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphBand {
    pub min: u8,
    pub max: u8,
}

impl Default for GlyphBand {
    fn default() -> Self {
        Self { min: 102, max: 130 }
    }
}

impl GlyphBand {
    pub fn contains(&self, pixel: &Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        r == g && g == b && (self.min..=self.max).contains(&r)
    }
}

/// OCR 参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// 页面切分模式，7 = 单行文本
    pub page_seg_mode: u8,
    /// 引擎模式，1 = LSTM
    pub engine_mode: u8,
    pub languages: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            page_seg_mode: 7,
            engine_mode: 1,
            languages: "eng".to_string(),
        }
    }
}

/// OCR 引擎
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// 识别 PNG 图片中的文本，返回原始输出
    async fn recognize(&self, png: &[u8], config: &OcrConfig) -> Result<String, CaptchaError>;
}

/// 调用外部 tesseract 可执行文件
///
/// 图片经 stdin 传入，结果从 stdout 读回，不落临时文件。
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, png: &[u8], config: &OcrConfig) -> Result<String, CaptchaError> {
        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(config.page_seg_mode.to_string())
            .arg("--oem")
            .arg(config.engine_mode.to_string())
            .arg("-l")
            .arg(&config.languages)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CaptchaError::OcrInit(format!("{}: {}", self.binary.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(png)
                .await
                .map_err(|e| CaptchaError::OcrProcessing(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CaptchaError::OcrProcessing(e.to_string()))?;

        if !output.status.success() {
            return Err(CaptchaError::OcrProcessing(format!(
                "tesseract 退出码 {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// 进程内链接的 libtesseract
#[cfg(feature = "ocr")]
#[derive(Debug, Clone, Default)]
pub struct BundledTesseract {
    tessdata_dir: Option<PathBuf>,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    pub fn new(tessdata_dir: Option<PathBuf>) -> Self {
        Self { tessdata_dir }
    }
}

#[cfg(feature = "ocr")]
#[async_trait]
impl OcrEngine for BundledTesseract {
    async fn recognize(&self, png: &[u8], config: &OcrConfig) -> Result<String, CaptchaError> {
        let tessdata = self
            .tessdata_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let png = png.to_vec();
        let config = config.clone();

        tokio::task::spawn_blocking(move || {
            let tess = tesseract::Tesseract::new_with_oem(
                tessdata.as_deref(),
                Some(&config.languages),
                engine_mode(config.engine_mode),
            )
            .map_err(|e| CaptchaError::OcrInit(format!("{e:?}")))?;
            let mut tess = tess
                .set_variable("tessedit_pageseg_mode", &config.page_seg_mode.to_string())
                .map_err(|e| CaptchaError::OcrInit(format!("{e:?}")))?
                .set_image_from_mem(&png)
                .map_err(|e| CaptchaError::OcrProcessing(format!("{e:?}")))?;
            tess.get_text()
                .map_err(|e| CaptchaError::OcrProcessing(format!("{e:?}")))
        })
        .await
        .map_err(|e| CaptchaError::OcrProcessing(e.to_string()))?
    }
}

/// `--oem` 编号对应的引擎模式，未知编号交给 tesseract 自行选择
#[cfg(feature = "ocr")]
fn engine_mode(oem: u8) -> tesseract::OcrEngineMode {
    match oem {
        0 => tesseract::OcrEngineMode::TesseractOnly,
        1 => tesseract::OcrEngineMode::LstmOnly,
        2 => tesseract::OcrEngineMode::TesseractLstmCombined,
        _ => tesseract::OcrEngineMode::Default,
    }
}

/// 验证码识别器
#[derive(Clone)]
pub struct CaptchaSolver {
    engine: Arc<dyn OcrEngine>,
    config: OcrConfig,
    band: GlyphBand,
}

impl CaptchaSolver {
    /// 创建识别器，OCR 引擎由调用方注入
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            config: OcrConfig::default(),
            band: GlyphBand::default(),
        }
    }

    pub fn with_config(mut self, config: OcrConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_band(mut self, band: GlyphBand) -> Self {
        self.band = band;
        self
    }

    /// 识别验证码，总是返回 6 个字符
    pub async fn solve(&self, image_bytes: &[u8]) -> String {
        match self.try_solve(image_bytes).await {
            Ok(guess) => {
                debug!("验证码识别结果: {}", guess);
                guess
            }
            Err(e) => {
                warn!("⚠️ 验证码识别失败，使用默认猜测: {}", e);
                FALLBACK_GUESS.to_string()
            }
        }
    }

    /// 识别验证码；解码或 OCR 出错时返回错误
    pub async fn try_solve(&self, image_bytes: &[u8]) -> Result<String, CaptchaError> {
        let canvas = self.isolate_glyphs(image_bytes)?;

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let raw = self.engine.recognize(&png, &self.config).await?;
        Ok(normalize_guess(&raw))
    }

    /// 只保留灰度区间内的像素，其余全部涂白
    pub fn isolate_glyphs(&self, image_bytes: &[u8]) -> Result<RgbImage, CaptchaError> {
        let source = image::load_from_memory(image_bytes)?.to_rgb8();
        let (width, height) = source.dimensions();

        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for (x, y, pixel) in source.enumerate_pixels() {
            if self.band.contains(pixel) {
                canvas.put_pixel(x, y, *pixel);
            }
        }

        Ok(canvas)
    }
}

/// 去掉空白后截断或填充到 6 个字符
pub fn normalize_guess(raw: &str) -> String {
    let mut guess: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(CAPTCHA_LENGTH)
        .collect();
    let missing = CAPTCHA_LENGTH - guess.chars().count();
    guess.extend(std::iter::repeat(FILLER).take(missing));
    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 记录收到的图片并返回固定文本
    struct FixedOcr {
        text: Result<String, String>,
        seen: Mutex<Vec<Vec<u8>>>,
    }

    impl FixedOcr {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                text: Err("engine crashed".to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, png: &[u8], _config: &OcrConfig) -> Result<String, CaptchaError> {
            self.seen.lock().unwrap().push(png.to_vec());
            self.text.clone().map_err(CaptchaError::OcrProcessing)
        }
    }

    fn png_of(image: RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn normalize_pads_and_truncates() {
        assert_eq!(normalize_guess(" ab1\n"), "ab1AAA");
        assert_eq!(normalize_guess("abcdefgh"), "abcdef");
        assert_eq!(normalize_guess("a b c d e f"), "abcdef");
        assert_eq!(normalize_guess(""), "AAAAAA");
    }

    #[test]
    fn only_gray_band_pixels_survive() {
        let mut img = RgbImage::from_pixel(4, 1, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([102, 102, 102]));
        img.put_pixel(1, 0, Rgb([130, 130, 130]));
        img.put_pixel(2, 0, Rgb([131, 131, 131]));
        img.put_pixel(3, 0, Rgb([110, 111, 110]));

        let solver = CaptchaSolver::new(FixedOcr::ok(""));
        let canvas = solver.isolate_glyphs(&png_of(img)).unwrap();

        assert_eq!(canvas.get_pixel(0, 0), &Rgb([102, 102, 102]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgb([130, 130, 130]));
        assert_eq!(canvas.get_pixel(2, 0), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(3, 0), &Rgb([255, 255, 255]));
    }

    #[tokio::test]
    async fn degenerate_image_still_yields_six_characters() {
        let ocr = FixedOcr::ok("");
        let solver = CaptchaSolver::new(ocr.clone());
        let guess = solver.solve(&png_of(RgbImage::new(1, 1))).await;
        assert_eq!(guess.chars().count(), CAPTCHA_LENGTH);
        assert_eq!(ocr.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn undecodable_bytes_fall_back() {
        let ocr = FixedOcr::ok("XYZ123");
        let solver = CaptchaSolver::new(ocr.clone());
        assert_eq!(solver.solve(b"not an image").await, FALLBACK_GUESS);
        assert!(ocr.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ocr_failure_falls_back() {
        let solver = CaptchaSolver::new(FixedOcr::failing());
        assert_eq!(solver.solve(&png_of(RgbImage::new(8, 8))).await, FALLBACK_GUESS);
    }

    #[tokio::test]
    async fn recognized_text_is_normalized() {
        let solver = CaptchaSolver::new(FixedOcr::ok("k7Pq2\n"));
        assert_eq!(solver.solve(&png_of(RgbImage::new(8, 8))).await, "k7Pq2A");
    }

    #[cfg(feature = "ocr")]
    #[test]
    fn bundled_engine_honours_oem() {
        assert!(matches!(
            engine_mode(OcrConfig::default().engine_mode),
            tesseract::OcrEngineMode::LstmOnly
        ));
        assert!(matches!(engine_mode(0), tesseract::OcrEngineMode::TesseractOnly));
        assert!(matches!(engine_mode(9), tesseract::OcrEngineMode::Default));
    }

    #[tokio::test]
    #[ignore] // 需要本机安装 tesseract：cargo test -- --ignored
    async fn tesseract_cli_reads_png_from_stdin() {
        let engine = TesseractCli::new("tesseract");
        let result = engine
            .recognize(&png_of(RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]))), &OcrConfig::default())
            .await;
        assert!(result.is_ok(), "tesseract 应该能处理空白图片: {:?}", result);
    }
}
