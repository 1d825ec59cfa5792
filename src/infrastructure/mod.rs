pub mod chromium_session;
pub mod js_executor;
pub mod session;

pub use chromium_session::{ChromiumProvider, ChromiumSession};
pub use js_executor::JsExecutor;
pub use session::{BrowserSession, SessionProvider};
