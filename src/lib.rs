//! # doc2pdf
//!
//! A CLI utility to turn a documentation website into a PDF for offline reading.
//!
//! ## Features
//!
//! - Breadth-first crawl of the site's navigation with a bounded number of
//!   pages loading at once
//! - Main content extraction and cleanup, stored as Markdown
//! - One PDF for small sites, numbered parts for large ones
//!
//! ## Usage
//!
//! ```bash
//! doc2pdf https://docs.example.com -o docs.pdf --concurrency 4
//! ```

pub mod assembler;
pub mod browser;
pub mod config;
pub mod content;
pub mod crawler;
pub mod error;
pub mod links;
pub mod markdown;
pub mod pdf_generator;
pub mod pipeline;
pub mod sanitizer;
pub mod url_helper;

pub use browser::{BrowserSettings, ChromeSession, Navigator, Renderer};
pub use config::{ChunkPolicy, CliOverrides, CrawlConfig, RenderOptions};
pub use crawler::{ContentFormat, Crawler, Page};
pub use error::{Error, Result};
pub use pdf_generator::{PdfGenerator, RenderMode, RenderReport};
pub use pipeline::{Doc2Pdf, RunReport};
