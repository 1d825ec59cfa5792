pub mod aggregator;
pub mod captcha;
pub mod exporter;
pub mod mark_store;
pub mod result_parser;

pub use aggregator::{aggregate, discover_columns};
pub use captcha::{CaptchaSolver, GlyphBand, OcrConfig, OcrEngine, TesseractCli};
pub use exporter::{ExportFormat, ExportedFile, Exporter};
pub use mark_store::{persist_records, InMemoryMarkStore, MarkStore};
pub use result_parser::{PageLayout, ResultParser};

#[cfg(feature = "ocr")]
pub use captcha::BundledTesseract;
