#![allow(dead_code)]

use async_trait::async_trait;
use doc2pdf::{Error, Navigator, RenderOptions, Renderer, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Serves canned markup per URL and tracks how many loads overlap.
#[derive(Default)]
pub struct FakeNavigator {
    pages: HashMap<String, String>,
    delay: Duration,
    fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn page(mut self, url: &str, markup: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), markup.into());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Navigator for FakeNavigator {
    async fn fetch_rendered_markup(&self, url: &Url, _timeout: Duration) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::navigation(url, "404 Not Found"))
    }
}

/// Records every render call and writes a placeholder file.
#[derive(Default)]
pub struct FakeRenderer {
    calls: Mutex<Vec<(PathBuf, String)>>,
    fail_on_call: Option<usize>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th render call (1-based).
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(
        &self,
        markup: &str,
        _options: &RenderOptions,
        output: &Path,
        _timeout: Duration,
    ) -> Result<()> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((output.to_path_buf(), markup.to_string()));
            calls.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(Error::render(output, "renderer crashed"));
        }
        std::fs::write(output, b"%PDF-1.4 fake")?;
        Ok(())
    }
}

/// A page whose sidebar links to `links` and whose main content says `body`.
pub fn doc_page(title: &str, links: &[&str], body: &str) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
        .collect();
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <div class="sidebar">{anchors}</div>
        <main><h1>{title}</h1><p>{body}</p></main>
        </body></html>"#
    )
}

pub fn count_pages(markup: &str) -> usize {
    markup.matches(r#"<div class="page-container">"#).count()
}
