use anyhow::Result;
use clap::Parser;
use colored::*;
use doc2pdf::{CliOverrides, CrawlConfig, Doc2Pdf, RunReport};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

#[derive(Parser)]
#[command(name = "doc2pdf")]
#[command(about = "CLI utility to turn a documentation website into a PDF for offline reading")]
#[command(version = "0.1.0")]
struct Args {
    /// URL of the documentation site to crawl
    url: String,

    /// Output PDF path (default: output/<host>.pdf)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// CSS selector for navigation links (replaces the built-in list)
    #[arg(short = 's', long = "selector")]
    selector: Option<String>,

    /// CSS selector for the main content (replaces the built-in list)
    #[arg(short = 'c', long = "content")]
    content: Option<String>,

    /// Page load timeout in milliseconds
    #[arg(short = 't', long = "timeout")]
    timeout: Option<u64>,

    /// Number of pages loaded at the same time
    #[arg(long = "concurrency")]
    concurrency: Option<usize>,

    /// Skip URLs containing this text (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Pages per PDF part when the site is large
    #[arg(long = "chunk-size")]
    chunk_size: Option<usize>,

    /// Keep the assembled HTML next to each PDF
    #[arg(long = "keep-html")]
    keep_html: bool,

    /// Show the browser window
    #[arg(long = "headful")]
    headful: bool,

    /// JSON configuration file (default: ./doc2pdf.config.json if present)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            nav_selector: self.selector.clone(),
            content_selector: self.content.clone(),
            timeout_ms: self.timeout,
            concurrency: self.concurrency,
            exclude_patterns: self.exclude.clone(),
            chunk_size: self.chunk_size,
            keep_html: self.keep_html,
            headful: self.headful,
        }
    }
}

/// `https://docs.example.com/guide` -> `output/docs-example-com.pdf`
fn default_output_path(url: &str) -> PathBuf {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(slug::slugify))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "documentation".to_string());
    PathBuf::from("output").join(format!("{}.pdf", host))
}

async fn run(args: Args) -> Result<()> {
    let config = CrawlConfig::load(args.config.as_deref(), &args.overrides())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.url));

    info!("Target: {}", args.url.green());
    info!("Output: {}", output.display().to_string().blue());

    let report = Doc2Pdf::new(config).run(&args.url, &output).await?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    info!(
        "{} {} pages in {:.1}s",
        "Done:".green().bold(),
        report.pages.len(),
        report.elapsed.as_secs_f64()
    );

    if report.is_chunked() {
        info!("Created {} PDF parts:", report.render.artifacts.len());
        for (i, path) in report.render.artifacts.iter().enumerate() {
            info!("  {}: {}", i + 1, path.display().to_string().blue());
        }
        warn!("Parts are not merged, open them in order");
    } else if let Some(path) = report.render.artifacts.first() {
        info!("PDF: {}", path.display().to_string().blue());
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.verbose { "doc2pdf=debug" } else { "doc2pdf=info" };
    let mut filter = EnvFilter::from_default_env();
    for directive in ["chromiumoxide::conn=off", "chromiumoxide::handler=off", level] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Err(e) = run(args).await {
        let code = e
            .downcast_ref::<doc2pdf::Error>()
            .map(doc2pdf::Error::exit_code)
            .unwrap_or(1);
        error!("{}", format!("Error: {}", e).red());
        process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path_uses_host_slug() {
        assert_eq!(
            default_output_path("https://docs.example.com/guide/intro"),
            PathBuf::from("output/docs-example-com.pdf")
        );
        assert_eq!(
            default_output_path("not a url"),
            PathBuf::from("output/documentation.pdf")
        );
    }

    #[test]
    fn test_cli_flags_become_overrides() {
        let args = Args::parse_from([
            "doc2pdf",
            "https://docs.example.com",
            "-s",
            ".toc a",
            "--exclude",
            "/api/",
            "--exclude",
            "/blog/",
            "-t",
            "5000",
            "--headful",
        ]);
        let overrides = args.overrides();

        assert_eq!(overrides.nav_selector.as_deref(), Some(".toc a"));
        assert_eq!(overrides.exclude_patterns, vec!["/api/", "/blog/"]);
        assert_eq!(overrides.timeout_ms, Some(5000));
        assert!(overrides.headful);
        assert!(!overrides.keep_html);
    }
}
