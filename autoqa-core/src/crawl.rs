use autoqa_scanner::{Crawler, LoadPolicy, PageDriver, ProgressCallback, ScanError};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub max_depth: usize,
    pub pacing: Duration,
    pub load_policy: LoadPolicy,
    pub show_progress_bars: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            pacing: Duration::from_secs(1),
            load_policy: LoadPolicy::default(),
            show_progress_bars: false,
        }
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Discover every same-host URL reachable from `base_url`.
/// Returns the sorted, de-duplicated list of visited pages.
pub async fn execute_crawl<D: PageDriver + ?Sized>(
    driver: &mut D,
    base_url: &str,
    options: &CrawlOptions,
) -> Result<Vec<String>, ScanError> {
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    let callback: ProgressCallback = match &progress_bar {
        Some(pb) => {
            let pb = pb.clone();
            let count = processed_count.clone();
            Arc::new(move |depth: usize, url: String| {
                let n = count.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_message(format!(
                    "Crawling... {} pages (depth {}) {}",
                    n,
                    depth,
                    extract_url_path(&url)
                ));
                pb.tick();
            })
        }
        None => {
            let count = processed_count.clone();
            Arc::new(move |_depth: usize, _url: String| {
                count.fetch_add(1, Ordering::Relaxed);
            })
        }
    };

    let crawler = Crawler::new()
        .with_max_depth(options.max_depth)
        .with_pacing(options.pacing)
        .with_load_policy(options.load_policy)
        .with_progress_callback(callback);

    let result = crawler.extract_urls(driver, base_url).await;

    if let Some(pb) = progress_bar {
        match &result {
            Ok(urls) => pb.finish_with_message(format!(
                "Crawl complete: {} URLs found ({} loads attempted)",
                urls.len(),
                processed_count.load(Ordering::Relaxed)
            )),
            Err(e) => pb.finish_with_message(format!("Crawl failed: {}", e)),
        }
    }

    result
}
