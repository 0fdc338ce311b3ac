use colored::*;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::browser::{Navigator, Renderer};
use crate::config::CrawlConfig;
use crate::crawler::{Crawler, Page};
use crate::error::{Error, Result};
use crate::pdf_generator::{PdfGenerator, RenderMode, RenderReport};

/// Outcome of a successful run, for the caller to report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub pages: Vec<Page>,
    pub render: RenderReport,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_chunked(&self) -> bool {
        matches!(self.render.mode, RenderMode::Chunked { .. })
    }
}

/// Crawl a site and render it, launching the browser as needed.
pub struct Doc2Pdf {
    config: CrawlConfig,
}

impl Doc2Pdf {
    pub fn new(config: CrawlConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, start_url: &str, output: &Path) -> Result<RunReport> {
        let started = Instant::now();

        let pages = Crawler::new(self.config.clone()).crawl(start_url).await?;
        ensure_pages(&pages)?;

        info!("Generating PDF...");
        let render = PdfGenerator::new(&self.config).generate(&pages, output).await?;
        Ok(finish(pages, render, started))
    }

    /// Same as [`Doc2Pdf::run`] with caller-provided browser capabilities.
    pub async fn run_with<N, R>(
        &self,
        navigator: &N,
        renderer: &R,
        start_url: &str,
        output: &Path,
    ) -> Result<RunReport>
    where
        N: Navigator + ?Sized,
        R: Renderer + ?Sized,
    {
        let started = Instant::now();

        let pages = Crawler::new(self.config.clone())
            .crawl_with(navigator, start_url)
            .await?;
        ensure_pages(&pages)?;

        let render = PdfGenerator::new(&self.config)
            .generate_with(renderer, &pages, output)
            .await?;
        Ok(finish(pages, render, started))
    }
}

fn ensure_pages(pages: &[Page]) -> Result<()> {
    if pages.is_empty() {
        warn!("No pages found");
        return Err(Error::EmptyResult);
    }
    info!("Crawled {} pages", pages.len().to_string().green());
    Ok(())
}

fn finish(pages: Vec<Page>, render: RenderReport, started: Instant) -> RunReport {
    RunReport {
        pages,
        render,
        elapsed: started.elapsed(),
    }
}
