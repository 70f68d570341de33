//! Live pages from Chrome (feature `chrome`)
//!
//! Launches or connects to a browser with `headless_chrome` and captures the
//! rendered page, computed styles included, into a [`Document`](crate::dom::Document).

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
