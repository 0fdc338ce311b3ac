use colored::*;
use futures_util::stream::{FuturesUnordered, StreamExt};
use scraper::Html;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{BrowserSettings, ChromeSession, Navigator};
use crate::config::CrawlConfig;
use crate::content::{content_from_document, extract_title};
use crate::error::{Error, Result};
use crate::links::links_from_document;
use crate::markdown::MarkdownConverter;
use crate::url_helper::parse_start_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Markdown,
}

/// One crawled page, ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub content: String,
    pub format: ContentFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlState {
    Idle,
    Initializing,
    Running,
    Draining,
    Closed,
}

impl CrawlState {
    /// The only state a run may move to from `self`.
    fn successor(self) -> Option<CrawlState> {
        match self {
            CrawlState::Idle => Some(CrawlState::Initializing),
            CrawlState::Initializing => Some(CrawlState::Running),
            CrawlState::Running => Some(CrawlState::Draining),
            CrawlState::Draining => Some(CrawlState::Closed),
            CrawlState::Closed => None,
        }
    }
}

/// Breadth-first crawl of a documentation site with a bounded number of
/// page loads in flight.
///
/// All bookkeeping (visited set, frontier, collected pages) lives in the
/// admission loop, which only touches it between fetch completions.
pub struct Crawler {
    config: CrawlConfig,
    converter: MarkdownConverter,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            converter: MarkdownConverter::new(),
        }
    }

    /// Crawl `start_url` with a freshly launched browser, closed on every exit path.
    pub async fn crawl(&self, start_url: &str) -> Result<Vec<Page>> {
        let mut state = CrawlState::Idle;
        let start = parse_start_url(start_url).ok_or_else(|| Error::InvalidInput(start_url.to_string()))?;

        transition(&mut state, CrawlState::Initializing);
        info!("Launching browser...");
        let session = ChromeSession::launch(&BrowserSettings::for_crawl(&self.config)).await?;

        let pages = self.run(&session, start, &mut state).await;

        session.close().await;
        transition(&mut state, CrawlState::Closed);
        Ok(pages)
    }

    /// Crawl with a caller-provided navigator.
    pub async fn crawl_with<N>(&self, navigator: &N, start_url: &str) -> Result<Vec<Page>>
    where
        N: Navigator + ?Sized,
    {
        let mut state = CrawlState::Idle;
        let start = parse_start_url(start_url).ok_or_else(|| Error::InvalidInput(start_url.to_string()))?;
        transition(&mut state, CrawlState::Initializing);

        let pages = self.run(navigator, start, &mut state).await;

        transition(&mut state, CrawlState::Closed);
        Ok(pages)
    }

    async fn run<N>(&self, navigator: &N, start: Url, state: &mut CrawlState) -> Vec<Page>
    where
        N: Navigator + ?Sized,
    {
        transition(state, CrawlState::Running);
        info!("Crawling from \"{}\"", start.as_str().green());

        let concurrency = self.config.concurrency.max(1);
        let mut visited: HashSet<Url> = HashSet::new();
        let mut frontier: VecDeque<Url> = VecDeque::from([start]);
        let mut pages: Vec<Page> = Vec::new();
        let mut failures = 0usize;
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < concurrency {
                let Some(url) = frontier.pop_front() else {
                    break;
                };
                // Marked before the fetch starts so a URL discovered twice is loaded once.
                if !visited.insert(url.clone()) {
                    continue;
                }
                in_flight.push(self.fetch_page(navigator, url));
            }

            let Some((url, outcome)) = in_flight.next().await else {
                break;
            };

            match outcome {
                Ok((page, links)) => {
                    info!("Done: {} ({})", page.title.green(), url);
                    let before = frontier.len();
                    for link in links {
                        if !visited.contains(&link) && !self.is_excluded(&link) {
                            frontier.push_back(link);
                        }
                    }
                    debug!("{} new links queued from {}", frontier.len() - before, url);
                    pages.push(page);
                }
                Err(e) if e.is_page_local() => {
                    failures += 1;
                    warn!("Skipping {}: {}", url.as_str().red(), e);
                }
                Err(e) => {
                    failures += 1;
                    error!("Unexpected failure on {}: {}", url.as_str().red(), e);
                }
            }
        }

        transition(state, CrawlState::Draining);
        info!(
            "Crawled {} pages ({} failed, {} visited)",
            pages.len(),
            failures,
            visited.len()
        );
        pages
    }

    async fn fetch_page<N>(&self, navigator: &N, url: Url) -> (Url, Result<(Page, Vec<Url>)>)
    where
        N: Navigator + ?Sized,
    {
        debug!("Fetching {}", url);
        let outcome = match navigator.fetch_rendered_markup(&url, self.config.timeout).await {
            Ok(markup) if markup.trim().is_empty() => Err(Error::Extraction {
                url: url.to_string(),
                reason: "browser returned an empty document".into(),
            }),
            Ok(markup) => Ok(self.materialize(&url, &markup)),
            Err(e) => Err(e),
        };
        (url, outcome)
    }

    /// Turn rendered markup into a page and the navigation links it exposes.
    fn materialize(&self, url: &Url, markup: &str) -> (Page, Vec<Url>) {
        let document = Html::parse_document(markup);

        let title = extract_title(&document);
        let links = links_from_document(&document, url, &self.config.nav_selectors);
        let fragment = content_from_document(&document, &self.config.content_selectors);
        let content = self.converter.convert(&fragment);

        let page = Page {
            url: url.to_string(),
            title,
            content,
            format: ContentFormat::Markdown,
        };
        (page, links)
    }

    fn is_excluded(&self, url: &Url) -> bool {
        self.config
            .exclude_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && url.as_str().contains(pattern.as_str()))
    }
}

fn transition(state: &mut CrawlState, next: CrawlState) {
    debug_assert_eq!(
        state.successor(),
        Some(next),
        "illegal crawl state change {:?} -> {:?}",
        state,
        next
    );
    debug!("Crawl state {:?} -> {:?}", state, next);
    *state = next;
}
