use crate::driver::PageDriver;
use crate::error::{DriverError, Result, ScanError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Called with `(depth, url)` right before a page is loaded.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// How hard to try a single page load before giving up on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    pub attempts: usize,
    pub backoff: Duration,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Load `url`, retrying transient failures with a fixed backoff.
pub async fn load_with_retry<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    policy: &LoadPolicy,
) -> std::result::Result<(), DriverError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match driver.get(url).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(
                    "Load of {} failed (attempt {}/{}): {}",
                    url, attempt, attempts, e
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Normalize a URL for dedup: drop query and fragment, strip trailing
/// slashes from the path. The root path stays `/`.
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if parsed.cannot_be_a_base() {
        return None;
    }
    parsed.set_query(None);
    parsed.set_fragment(None);

    let trimmed = parsed.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        parsed.set_path("/");
    } else {
        parsed.set_path(&trimmed);
    }

    Some(parsed.to_string())
}

/// Resolve an anchor target against the page it was found on. Returns
/// `None` for targets a crawler should never follow.
pub fn resolve_link(current_url: &str, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let base = Url::parse(current_url).ok()?;
    let resolved = base.join(href).ok()?;

    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Host and any explicit port must match. Scheme is ignored, so an
/// `http://` base still accepts `https://` links to the same host.
pub fn is_same_host(url: &Url, base: &Url) -> bool {
    url.host_str().is_some() && url.host_str() == base.host_str() && url.port() == base.port()
}

/// Normalized URLs already loaded in this session. Only ever grows.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.urls.iter().cloned().collect();
        urls.sort();
        urls
    }
}

/// FIFO of `(url, depth)` pairs. Refuses entries past `max_depth` and any
/// URL it has already accepted once.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<(String, usize)>,
    accepted: HashSet<String>,
    max_depth: usize,
}

impl Frontier {
    pub fn new(max_depth: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            accepted: HashSet::new(),
            max_depth,
        }
    }

    pub fn push(&mut self, url: String, depth: usize) -> bool {
        if depth > self.max_depth || self.accepted.contains(&url) {
            return false;
        }
        self.accepted.insert(url.clone());
        self.queue.push_back((url, depth));
        true
    }

    pub fn pop(&mut self) -> Option<(String, usize)> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// State of one crawl. Owned by whoever runs the crawl; nothing global.
#[derive(Debug)]
pub struct CrawlSession {
    base: Url,
    visited: VisitedSet,
    frontier: Frontier,
}

impl CrawlSession {
    pub fn new(base_url: &str, max_depth: usize) -> Result<Self> {
        let normalized = normalize_url(base_url)
            .ok_or_else(|| ScanError::InvalidUrl(format!("Invalid URL: {}", base_url)))?;
        let base = Url::parse(&normalized)
            .map_err(|e| ScanError::InvalidUrl(format!("Invalid URL: {}", e)))?;

        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(ScanError::InvalidUrl(format!(
                "Not an http(s) URL with a host: {}",
                base_url
            )));
        }

        let mut frontier = Frontier::new(max_depth);
        frontier.push(normalized, 0);

        Ok(Self {
            base,
            visited: VisitedSet::default(),
            frontier,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Next entry worth loading, or `None` when the crawl is over.
    pub fn next(&mut self) -> Option<(String, usize)> {
        while let Some((url, depth)) = self.frontier.pop() {
            if self.visited.contains(&url) || depth > self.frontier.max_depth() {
                continue;
            }
            return Some((url, depth));
        }
        None
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url);
    }

    /// Queue the same-host targets of `hrefs` found on a page at `depth`.
    /// Returns how many were newly queued.
    pub fn enqueue_links(&mut self, current_url: &str, hrefs: &[String], depth: usize) -> usize {
        let mut added = 0;

        for href in hrefs {
            let Some(resolved) = resolve_link(current_url, href) else {
                continue;
            };
            if !is_same_host(&resolved, &self.base) {
                debug!("  -> Cross-domain, skipping {}", resolved);
                continue;
            }
            let Some(normalized) = normalize_url(resolved.as_str()) else {
                continue;
            };
            if self.visited.contains(&normalized) {
                continue;
            }
            if self.frontier.push(normalized, depth + 1) {
                added += 1;
            }
        }

        added
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn into_sorted_urls(self) -> Vec<String> {
        self.visited.sorted()
    }
}

/// Breadth-first, same-host URL discovery.
pub struct Crawler {
    max_depth: usize,
    pacing: Duration,
    load_policy: LoadPolicy,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            max_depth: 2,
            pacing: Duration::from_secs(1),
            load_policy: LoadPolicy::default(),
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Delay before every page load.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Crawl from `base_url` and return every visited URL, sorted.
    ///
    /// Pages that fail to load contribute nothing; only an unusable base URL
    /// is an error.
    pub async fn extract_urls<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        base_url: &str,
    ) -> Result<Vec<String>> {
        info!("Starting recursive URL extraction from: {}", base_url);

        let mut session = CrawlSession::new(base_url, self.max_depth)?;
        self.run(driver, &mut session).await;

        let urls = session.into_sorted_urls();
        info!("Total unique URLs found: {}", urls.len());
        for url in &urls {
            debug!("Found URL: {}", url);
        }
        Ok(urls)
    }

    /// Drive an existing session until its frontier is exhausted.
    pub async fn run<D: PageDriver + ?Sized>(&self, driver: &mut D, session: &mut CrawlSession) {
        while let Some((url, depth)) = session.next() {
            if !self.pacing.is_zero() {
                debug!("Waiting {:?} before processing {}", self.pacing, url);
                tokio::time::sleep(self.pacing).await;
            }

            if let Some(ref callback) = self.progress_callback {
                callback(depth, url.clone());
            }

            if let Err(e) = load_with_retry(driver, &url, &self.load_policy).await {
                warn!("Failed to process {}: {}", url, e);
                continue;
            }

            session.mark_visited(&url);
            info!("Processing depth {}: {}", depth, url);

            let hrefs: Vec<String> = match driver.find_elements("a[href]") {
                Ok(links) => links
                    .into_iter()
                    .filter_map(|link| link.attr("href").map(|h| h.to_string()))
                    .collect(),
                Err(e) => {
                    warn!("Could not collect links on {}: {}", url, e);
                    Vec::new()
                }
            };

            let current = driver.current_url();
            let resolve_against = if current.is_empty() { &url } else { &current };
            let added = session.enqueue_links(resolve_against, &hrefs, depth);
            debug!("Found {} new URLs at depth {}", added, depth);
        }
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}
