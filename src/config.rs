use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "doc2pdf.config.json";

const DEFAULT_NAV_SELECTORS: &[&str] = &[
    ".sidebar nav a",
    ".sidebar a",
    "[class*=\"sidebar\"] a",
    ".docs-sidebar a",
    "aside nav a",
    "aside a",
    "[role=\"navigation\"] a",
    ".toc a",
    ".menu a",
    "nav a",
    ".nav-links a",
    "[class*=\"menu\"] a",
    "[class*=\"nav\"] a",
];

const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".content",
    ".docs-content",
    ".markdown-body",
    "#content",
];

/// Everything one crawl-and-render run needs. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlConfig {
    pub nav_selectors: Vec<String>,
    pub content_selectors: Vec<String>,
    #[serde(with = "millis")]
    pub timeout: Duration,
    pub concurrency: usize,
    pub exclude_patterns: Vec<String>,
    #[serde(with = "millis")]
    pub settle_delay: Duration,
    pub headless: bool,
    pub pdf_options: RenderOptions,
    pub chunking: ChunkPolicy,
    pub keep_html: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            nav_selectors: DEFAULT_NAV_SELECTORS.iter().map(|s| s.to_string()).collect(),
            content_selectors: DEFAULT_CONTENT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_millis(30_000),
            concurrency: 3,
            exclude_patterns: Vec::new(),
            settle_delay: Duration::from_millis(500),
            headless: true,
            pdf_options: RenderOptions::default(),
            chunking: ChunkPolicy::default(),
            keep_html: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub format: String,
    pub margin: Margin,
    pub print_background: bool,
    pub scale: f64,
    pub landscape: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: "A4".to_string(),
            margin: Margin::default(),
            print_background: true,
            scale: 1.0,
            landscape: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: "20mm".to_string(),
            right: "15mm".to_string(),
            bottom: "20mm".to_string(),
            left: "15mm".to_string(),
        }
    }
}

/// Paper geometry in inches, the unit Chrome's print API expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl RenderOptions {
    pub fn layout(&self) -> Result<PageLayout> {
        let (width, height) = paper_size(&self.format)
            .ok_or_else(|| Error::Config(format!("unknown paper format \"{}\"", self.format)))?;
        let (paper_width, paper_height) = if self.landscape {
            (height, width)
        } else {
            (width, height)
        };

        Ok(PageLayout {
            paper_width,
            paper_height,
            margin_top: margin_inches(&self.margin.top)?,
            margin_right: margin_inches(&self.margin.right)?,
            margin_bottom: margin_inches(&self.margin.bottom)?,
            margin_left: margin_inches(&self.margin.left)?,
        })
    }
}

fn paper_size(format: &str) -> Option<(f64, f64)> {
    let size = match format.to_ascii_lowercase().as_str() {
        "letter" => (8.5, 11.0),
        "legal" => (8.5, 14.0),
        "tabloid" => (11.0, 17.0),
        "ledger" => (17.0, 11.0),
        "a0" => (33.1, 46.8),
        "a1" => (23.4, 33.1),
        "a2" => (16.54, 23.4),
        "a3" => (11.7, 16.54),
        "a4" => (8.27, 11.7),
        "a5" => (5.83, 8.27),
        "a6" => (4.13, 5.83),
        _ => return None,
    };
    Some(size)
}

fn margin_inches(value: &str) -> Result<f64> {
    parse_length(value).ok_or_else(|| Error::Config(format!("invalid margin \"{}\"", value)))
}

/// Parse a CSS-style length into inches. A bare number is taken as pixels.
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.trim().parse().ok()?;
    if number < 0.0 || !number.is_finite() {
        return None;
    }

    let inches = match unit {
        "" | "px" => number / 96.0,
        "in" => number,
        "cm" => number / 2.54,
        "mm" => number / 25.4,
        _ => return None,
    };
    Some(inches)
}

/// When and how to split rendering into several artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkPolicy {
    pub chunk_size: usize,
    pub threshold_mb: f64,
    pub estimated_page_kb: f64,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            threshold_mb: 100.0,
            estimated_page_kb: 300.0,
        }
    }
}

/// Values given on the command line. `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub nav_selector: Option<String>,
    pub content_selector: Option<String>,
    pub timeout_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub exclude_patterns: Vec<String>,
    pub chunk_size: Option<usize>,
    pub keep_html: bool,
    pub headful: bool,
}

impl CrawlConfig {
    /// Merge defaults, the optional config file and CLI overrides, in that order.
    pub fn load(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    match Self::from_file(&path) {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Ignoring {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(data: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn apply(&mut self, overrides: &CliOverrides) {
        if let Some(selector) = &overrides.nav_selector {
            self.nav_selectors = vec![selector.clone()];
        }
        if let Some(selector) = &overrides.content_selector {
            self.content_selectors = vec![selector.clone()];
        }
        if let Some(ms) = overrides.timeout_ms {
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if !overrides.exclude_patterns.is_empty() {
            self.exclude_patterns = overrides.exclude_patterns.clone();
        }
        if let Some(chunk_size) = overrides.chunk_size {
            self.chunking.chunk_size = chunk_size;
        }
        if overrides.keep_html {
            self.keep_html = true;
        }
        if overrides.headful {
            self.headless = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk size must be at least 1".into()));
        }
        if self.nav_selectors.is_empty() {
            return Err(Error::Config("at least one navigation selector is required".into()));
        }
        if self.content_selectors.is_empty() {
            return Err(Error::Config("at least one content selector is required".into()));
        }
        if self.pdf_options.scale.is_nan() || self.pdf_options.scale <= 0.0 {
            return Err(Error::Config(format!("invalid scale {}", self.pdf_options.scale)));
        }
        self.pdf_options.layout()?;
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrawlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.nav_selectors.first().map(String::as_str), Some(".sidebar nav a"));
        assert_eq!(config.content_selectors.len(), 7);
    }

    #[test]
    fn test_file_fields_override_defaults_and_keep_the_rest() {
        let config = CrawlConfig::from_json(
            r#"{
                "navSelectors": [".toc a"],
                "timeout": 10000,
                "excludePatterns": ["/api/", "/blog/"],
                "pdfOptions": { "format": "Letter", "margin": { "top": "1in" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.nav_selectors, vec![".toc a".to_string()]);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.exclude_patterns.len(), 2);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.pdf_options.format, "Letter");
        assert_eq!(config.pdf_options.margin.top, "1in");
        assert_eq!(config.pdf_options.margin.left, "15mm");
        assert!(config.pdf_options.print_background);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = CrawlConfig::from_json(r#"{ "concurrency": 8, "timeout": 1000 }"#).unwrap();
        config.apply(&CliOverrides {
            nav_selector: Some("#menu a".into()),
            concurrency: Some(2),
            chunk_size: Some(10),
            headful: true,
            ..CliOverrides::default()
        });

        assert_eq!(config.nav_selectors, vec!["#menu a".to_string()]);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.chunking.chunk_size, 10);
        assert!(!config.headless);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CrawlConfig::default();
        config.concurrency = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = CrawlConfig::default();
        config.pdf_options.format = "B7".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = CrawlConfig::default();
        config.pdf_options.margin.left = "wide".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("1in"), Some(1.0));
        assert_eq!(parse_length("96px"), Some(1.0));
        assert_eq!(parse_length("96"), Some(1.0));
        assert_eq!(parse_length("2.54cm"), Some(1.0));
        assert_eq!(parse_length("25.4 mm"), Some(1.0));
        assert_eq!(parse_length("-1in"), None);
        assert_eq!(parse_length("3em"), None);
    }

    #[test]
    fn test_landscape_swaps_paper() {
        let options = RenderOptions {
            landscape: true,
            ..RenderOptions::default()
        };
        let layout = options.layout().unwrap();
        assert_eq!(layout.paper_width, 11.7);
        assert_eq!(layout.paper_height, 8.27);
    }
}
