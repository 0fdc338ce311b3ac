use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The start URL is not an absolute http(s) URL.
    #[error("invalid start URL \"{0}\"")]
    InvalidInput(String),

    /// The browser could not be launched.
    #[error("failed to start browser: {0}")]
    CapabilityInit(String),

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to extract content from {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("no pages were crawled")]
    EmptyResult,

    #[error("failed to render {}: {reason}", path.display())]
    Render { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn navigation(url: impl ToString, reason: impl ToString) -> Self {
        Error::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn render(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Render {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Per-page failures are skipped by the crawler; everything else ends the run.
    pub fn is_page_local(&self) -> bool {
        matches!(self, Error::Navigation { .. } | Error::Extraction { .. })
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) | Error::Config(_) => 2,
            Error::EmptyResult => 3,
            Error::Render { .. } => 4,
            Error::CapabilityInit(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_run_level_failures() {
        let codes = [
            Error::InvalidInput("nope".into()).exit_code(),
            Error::EmptyResult.exit_code(),
            Error::render("out.pdf", "boom").exit_code(),
            Error::CapabilityInit("no chrome".into()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_page_local_errors() {
        assert!(Error::navigation("https://a.dev/x", "timeout").is_page_local());
        assert!(!Error::EmptyResult.is_page_local());
        assert!(Error::Extraction { url: "https://a.dev/x".into(), reason: "empty".into() }.is_page_local());
    }

    #[test]
    fn test_render_message_names_path() {
        let err = Error::render("out/docs.pdf", "browser crashed");
        assert_eq!(err.to_string(), "failed to render out/docs.pdf: browser crashed");
    }
}
