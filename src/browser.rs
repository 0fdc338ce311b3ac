use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use colored::*;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

use crate::config::{CrawlConfig, PageLayout, RenderOptions};
use crate::error::{Error, Result};

/// Loads a page in a real browser and hands back the rendered DOM.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn fetch_rendered_markup(&self, url: &Url, timeout: Duration) -> Result<String>;
}

/// Prints an HTML document to a PDF file.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        markup: &str,
        options: &RenderOptions,
        output: &Path,
        timeout: Duration,
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Upper bound for a single CDP request.
    pub request_timeout: Duration,
    /// Pause after navigation so client-side rendering can finish.
    pub settle_delay: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            request_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl BrowserSettings {
    pub fn for_crawl(config: &CrawlConfig) -> Self {
        Self {
            headless: config.headless,
            request_timeout: config.timeout.max(Duration::from_secs(30)),
            settle_delay: config.settle_delay,
            ..Self::default()
        }
    }

    pub fn for_render(render_timeout: Duration) -> Self {
        Self {
            request_timeout: render_timeout,
            settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

// Opens collapsed sidebar sections so their links exist in the DOM.
const EXPAND_NAVIGATION_JS: &str = r#"
    (async () => {
        const toggles = document.querySelectorAll([
            'nav button[aria-expanded="false"]',
            'aside button[aria-expanded="false"]',
            '[role="navigation"] [aria-expanded="false"]',
            'button[data-state="closed"]',
            '.menu__list-item--collapsed > .menu__link',
            '.menu__link--sublist[aria-expanded="false"]',
            '.theme-doc-sidebar-item-category button[aria-expanded="false"]',
            'a[data-rnwrdesktop-fnigne="true"] > div[tabindex="0"]'
        ].join(', '));

        for (const toggle of toggles) {
            toggle.click();
        }

        await new Promise(r => setTimeout(r, 300));
        return toggles.length;
    })()
"#;

/// A launched Chrome instance plus the task driving its CDP connection.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    settle_delay: Duration,
}

impl ChromeSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_size.0, settings.window_size.1)
            .request_timeout(settings.request_timeout)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !settings.headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| Error::CapabilityInit(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::CapabilityInit(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(err) = h {
                    // Chrome emits protocol messages chromiumoxide does not model.
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        debug!("Browser launched");
        Ok(Self {
            browser,
            handler: handle,
            settle_delay: settings.settle_delay,
        })
    }

    /// Shut the browser down. Errors are logged, never returned.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        self.handler.abort();
        debug!("Browser closed");
    }

    async fn load_markup(&self, page: &Page, url: &Url) -> Result<String> {
        page.goto(url.as_str())
            .await
            .map_err(|e| Error::navigation(url, e))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| Error::navigation(url, format!("failed to wait for navigation: {}", e)))?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        match page.evaluate(EXPAND_NAVIGATION_JS).await {
            Ok(result) => {
                if let Ok(count) = result.into_value::<u64>() {
                    if count > 0 {
                        debug!("Expanded {} navigation toggles on {}", count, url);
                    }
                }
            }
            Err(e) => debug!("Could not expand navigation on {}: {}", url, e),
        }

        page.content()
            .await
            .map_err(|e| Error::navigation(url, format!("failed to get page content: {}", e)))
    }

    async fn print(&self, page: &Page, markup: &str, options: &RenderOptions, output: &Path) -> Result<()> {
        let layout = options.layout()?;

        page.set_content(markup)
            .await
            .map_err(|e| Error::render(output, format!("failed to load document: {}", e)))?;

        let pdf_data = page
            .pdf(print_params(options, &layout))
            .await
            .map_err(|e| Error::render(output, format!("failed to generate PDF: {}", e)))?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(output, pdf_data)
            .await
            .map_err(|e| Error::render(output, format!("failed to write PDF: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Navigator for ChromeSession {
    async fn fetch_rendered_markup(&self, url: &Url, timeout: Duration) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::navigation(url, format!("failed to create new page: {}", e)))?;

        let result = tokio::time::timeout(timeout, self.load_markup(&page, url)).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close tab for {}: {}", url, e);
        }

        match result {
            Ok(markup) => markup,
            Err(_) => Err(Error::navigation(
                url,
                format!("timed out after {}ms", timeout.as_millis()),
            )),
        }
    }
}

#[async_trait]
impl Renderer for ChromeSession {
    async fn render(
        &self,
        markup: &str,
        options: &RenderOptions,
        output: &Path,
        timeout: Duration,
    ) -> Result<()> {
        info!("Rendering \"{}\"", output.display().to_string().blue());

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::render(output, format!("failed to create new page: {}", e)))?;

        let result = tokio::time::timeout(timeout, self.print(&page, markup, options, output)).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close render tab: {}", e);
        }

        match result {
            Ok(printed) => printed,
            Err(_) => Err(Error::render(
                output,
                format!("timed out after {}s", timeout.as_secs()),
            )),
        }
    }
}

fn print_params(options: &RenderOptions, layout: &PageLayout) -> PrintToPdfParams {
    // Orientation is already applied to the paper size.
    PrintToPdfParams {
        print_background: Some(options.print_background),
        scale: Some(options.scale),
        paper_width: Some(layout.paper_width),
        paper_height: Some(layout.paper_height),
        margin_top: Some(layout.margin_top),
        margin_right: Some(layout.margin_right),
        margin_bottom: Some(layout.margin_bottom),
        margin_left: Some(layout.margin_left),
        ..Default::default()
    }
}
