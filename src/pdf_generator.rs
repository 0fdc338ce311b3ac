use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::assembler::assemble_document;
use crate::browser::{BrowserSettings, ChromeSession, Renderer};
use crate::config::{ChunkPolicy, CrawlConfig, RenderOptions};
use crate::crawler::Page;
use crate::error::{Error, Result};

/// Time allowed to load and print one document.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(300);

const LARGE_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Direct,
    Chunked { chunk_size: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub mode: RenderMode,
    /// Produced files, in page order.
    pub artifacts: Vec<PathBuf>,
}

pub struct PdfGenerator {
    options: RenderOptions,
    chunking: ChunkPolicy,
    keep_html: bool,
}

impl PdfGenerator {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            options: config.pdf_options.clone(),
            chunking: config.chunking.clone(),
            keep_html: config.keep_html,
        }
    }

    /// Size in MB the assembled document is expected to reach.
    pub fn estimate_size_mb(&self, page_count: usize) -> f64 {
        page_count as f64 * self.chunking.estimated_page_kb / 1024.0
    }

    pub fn plan(&self, page_count: usize) -> RenderMode {
        if self.estimate_size_mb(page_count) > self.chunking.threshold_mb {
            RenderMode::Chunked {
                chunk_size: self.chunking.chunk_size.max(1),
            }
        } else {
            RenderMode::Direct
        }
    }

    /// Render `pages` with a dedicated browser, closed whether or not rendering succeeds.
    pub async fn generate(&self, pages: &[Page], output: &Path) -> Result<RenderReport> {
        if pages.is_empty() {
            return Err(Error::EmptyResult);
        }

        let session = ChromeSession::launch(&BrowserSettings::for_render(RENDER_TIMEOUT)).await?;
        let result = self.generate_with(&session, pages, output).await;
        session.close().await;
        result
    }

    pub async fn generate_with<R>(&self, renderer: &R, pages: &[Page], output: &Path) -> Result<RenderReport>
    where
        R: Renderer + ?Sized,
    {
        if pages.is_empty() {
            return Err(Error::EmptyResult);
        }

        let mode = self.plan(pages.len());
        let artifacts = match mode {
            RenderMode::Direct => {
                self.render_direct(renderer, pages, output).await?;
                vec![output.to_path_buf()]
            }
            RenderMode::Chunked { chunk_size } => {
                warn!(
                    "Large document (about {:.0} MB), rendering in parts of {} pages",
                    self.estimate_size_mb(pages.len()),
                    chunk_size
                );
                self.render_chunks(renderer, pages, output, chunk_size).await?
            }
        };

        Ok(RenderReport { mode, artifacts })
    }

    async fn render_direct<R>(&self, renderer: &R, pages: &[Page], output: &Path) -> Result<()>
    where
        R: Renderer + ?Sized,
    {
        info!("Assembling {} pages into one document...", pages.len());
        let html = assemble_document(pages);

        let size_mb = html.len() as f64 / 1024.0 / 1024.0;
        if html.len() > LARGE_DOCUMENT_BYTES {
            warn!("Document is {:.2} MB, rendering may take a while...", size_mb);
        } else {
            debug!("Document is {:.2} MB", size_mb);
        }

        self.render_one(renderer, &html, output).await?;
        info!("PDF written to {}", output.display().to_string().blue());
        Ok(())
    }

    async fn render_chunks<R>(
        &self,
        renderer: &R,
        pages: &[Page],
        output: &Path,
        chunk_size: usize,
    ) -> Result<Vec<PathBuf>>
    where
        R: Renderer + ?Sized,
    {
        let total = pages.len().div_ceil(chunk_size);
        info!("Rendering {} parts of up to {} pages", total, chunk_size);

        let mut artifacts = Vec::with_capacity(total);
        for (index, chunk) in pages.chunks(chunk_size).enumerate() {
            let part = part_path(output, index + 1);
            info!("Rendering part {}/{} ({} pages)...", index + 1, total, chunk.len());

            let html = assemble_document(chunk);
            if let Err(e) = self.render_one(renderer, &html, &part).await {
                if !artifacts.is_empty() {
                    warn!("{} parts were written before the failure", artifacts.len());
                }
                return Err(e);
            }
            artifacts.push(part);
        }

        Ok(artifacts)
    }

    async fn render_one<R>(&self, renderer: &R, html: &str, output: &Path) -> Result<()>
    where
        R: Renderer + ?Sized,
    {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }

        if self.keep_html {
            let html_path = output.with_extension("html");
            fs::write(&html_path, html).await?;
            info!("Assembled HTML kept at {}", html_path.display().to_string().blue());
        }

        renderer.render(html, &self.options, output, RENDER_TIMEOUT).await
    }
}

/// `docs.pdf` -> `docs_part2.pdf`, in the same directory.
pub fn part_path(output: &Path, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}_part{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_part{}", stem, index),
    };
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(chunking: ChunkPolicy) -> PdfGenerator {
        let config = CrawlConfig {
            chunking,
            ..CrawlConfig::default()
        };
        PdfGenerator::new(&config)
    }

    #[test]
    fn test_default_threshold_switches_to_chunks_above_341_pages() {
        let generator = generator(ChunkPolicy::default());

        assert_eq!(generator.plan(1), RenderMode::Direct);
        assert_eq!(generator.plan(341), RenderMode::Direct);
        assert_eq!(generator.plan(342), RenderMode::Chunked { chunk_size: 50 });
    }

    #[test]
    fn test_estimate_uses_per_page_heuristic() {
        let generator = generator(ChunkPolicy::default());
        assert_eq!(generator.estimate_size_mb(1024), 300.0);
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("out/docs.pdf"), 3),
            PathBuf::from("out/docs_part3.pdf")
        );
        assert_eq!(part_path(Path::new("book"), 1), PathBuf::from("book_part1"));
    }
}
