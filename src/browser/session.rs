use crate::{browser::config::{ConnectionOptions, LaunchOptions},
            dom::{self, ColorScheme, Document},
            error::{AuditError, Result}};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};
use url::Url;

/// Browser session used to capture pages for auditing
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));

        // Long audits should not hit the 30 second idle default
        launch_opts.idle_browser_timeout = Duration::from_secs(10 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.sandbox = options.sandbox;

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        let browser = Browser::new(launch_opts).map_err(|e| AuditError::Browser(format!("Launch failed: {}", e)))?;

        browser
            .new_tab()
            .map_err(|e| AuditError::Browser(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url, Duration::from_millis(options.timeout))
            .map_err(|e| AuditError::Browser(format!("Connection failed: {}", e)))?;

        Ok(Self { browser })
    }

    /// Launch a browser with default options
    pub fn new() -> Result<Self> {
        Self::launch(LaunchOptions::default())
    }

    /// The tab pages are loaded into
    pub fn tab(&self) -> Result<Arc<Tab>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| AuditError::Browser(format!("Failed to get tabs: {}", e)))?
            .clone();

        tabs.last()
            .cloned()
            .ok_or_else(|| AuditError::Browser("No open tab".to_string()))
    }

    /// Navigate to a URL and wait for the load to finish
    pub fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| AuditError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| AuditError::Browser(format!("Navigation timeout: {}", e)))?;

        log::debug!("Navigated to {}", url);
        Ok(())
    }

    /// Whether the page currently matches `prefers-color-scheme: dark`
    pub fn prefers_dark(&self) -> Result<bool> {
        let result = self
            .tab()?
            .evaluate("window.matchMedia('(prefers-color-scheme: dark)').matches", false)
            .map_err(|e| AuditError::Browser(format!("Failed to query color scheme: {}", e)))?;

        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// Capture the rendered page into a live document
    ///
    /// The page URL becomes the base URL for link resolution, and the color
    /// scheme follows the page's media query.
    pub fn capture_document(&self) -> Result<Document> {
        let tab = self.tab()?;
        let root = dom::capture_tab(&tab)?;
        let mut document = Document::new(root);

        match Url::parse(&tab.get_url()) {
            Ok(url) => document = document.with_base_url(url),
            Err(e) => log::debug!("Page URL is not absolute, links stay unresolved: {}", e),
        }

        if self.prefers_dark()? {
            document.set_color_scheme(ColorScheme::Dark);
        }
        Ok(document)
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close every tab; the browser exits when the session is dropped
    pub fn close(&self) -> Result<()> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| AuditError::Browser(format!("Failed to get tabs: {}", e)))?
            .clone();
        for tab in tabs {
            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close tab: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_builder() {
        let opts = LaunchOptions::new().headless(false).window_size(800, 600).sandbox(false);

        assert!(!opts.headless);
        assert!(!opts.sandbox);
        assert_eq!(opts.window_width, 800);
        assert_eq!(opts.window_height, 600);
    }

    #[test]
    fn test_connection_options() {
        let opts = ConnectionOptions::new("ws://localhost:9222").timeout(5000);

        assert_eq!(opts.ws_url, "ws://localhost:9222");
        assert_eq!(opts.timeout, 5000);
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Ignore by default, run with: cargo test --features chrome -- --ignored
    fn test_capture_blank_page() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
        session.navigate("about:blank").expect("Failed to navigate");

        let document = session.capture_document().expect("Failed to capture");
        assert_eq!(document.tag_name(document.document_element()), Some("html"));
    }
}
