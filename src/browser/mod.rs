pub mod connection;
pub mod headless;
pub mod locator;

pub use connection::connect_to_browser;
pub use headless::{launch_headless_browser, LaunchOptions};
pub use locator::{Locator, LocatorSet};
