// Tests for breadth-first URL discovery and normalization

use autoqa_scanner::crawler::{Crawler, LoadPolicy, normalize_url};
use autoqa_scanner::driver::StaticDriver;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

fn crawler(depth: usize) -> Crawler {
    Crawler::new()
        .with_max_depth(depth)
        .with_pacing(Duration::ZERO)
        .with_load_policy(LoadPolicy {
            attempts: 1,
            backoff: Duration::ZERO,
        })
}

// ============================================================================
// Normalization Tests
// ============================================================================

#[test]
fn test_normalize_strips_trailing_slash() {
    assert_eq!(
        normalize_url("https://x.com/a/").as_deref(),
        Some("https://x.com/a")
    );
}

#[test]
fn test_normalize_root_keeps_slash() {
    assert_eq!(
        normalize_url("https://x.com/").as_deref(),
        Some("https://x.com/")
    );
    assert_eq!(
        normalize_url("https://x.com").as_deref(),
        Some("https://x.com/")
    );
}

#[test]
fn test_normalize_drops_query_and_fragment() {
    assert_eq!(
        normalize_url("https://x.com/search/?q=1#results").as_deref(),
        Some("https://x.com/search")
    );
}

#[test]
fn test_normalize_is_idempotent() {
    let samples = [
        "https://x.com/a/",
        "https://x.com/",
        "https://x.com//a//b//",
        "http://x.com:8080/path/?k=v",
        "https://x.com/a%20b/",
    ];

    for sample in samples {
        let once = normalize_url(sample).unwrap();
        let twice = normalize_url(&once).unwrap();
        assert_eq!(once, twice, "normalization not idempotent for {}", sample);
    }
}

#[test]
fn test_normalize_rejects_unparseable() {
    assert_eq!(normalize_url("not a url"), None);
    assert_eq!(normalize_url("mailto:me@x.com"), None);
}

// ============================================================================
// Crawl Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_crawl_home_with_two_internal_and_one_external_link() {
    let mut driver = StaticDriver::new()
        .with_page(
            "https://example.test/",
            r#"<html><body>
                <a href="/about">About</a>
                <a href="https://example.test/contact/">Contact</a>
                <a href="https://other.test/">Partner</a>
            </body></html>"#,
        )
        .with_page(
            "https://example.test/about",
            r#"<a href="/team">Team</a><a href="/">Home</a>"#,
        )
        .with_page("https://example.test/contact", "<form></form>")
        .with_page("https://example.test/team", "<p>too deep</p>");

    let urls = crawler(1)
        .extract_urls(&mut driver, "https://example.test/")
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![
            "https://example.test/",
            "https://example.test/about",
            "https://example.test/contact",
        ]
    );
    assert!(
        driver.requests().iter().all(|u| !u.contains("other.test")),
        "external link must never be loaded"
    );
    assert!(
        driver.requests().iter().all(|u| !u.ends_with("/team")),
        "depth-2 page must never be loaded with max_depth=1"
    );
}

#[tokio::test]
async fn test_http_base_follows_https_links_to_same_host() {
    let mut driver = StaticDriver::new()
        .with_page(
            "http://example.test/",
            r#"<a href="https://example.test/about">About</a><a href="/contact">Contact</a>"#,
        )
        .with_page("https://example.test/about", "<p>about</p>")
        .with_page("http://example.test/contact", "<form></form>");

    let urls = crawler(1)
        .extract_urls(&mut driver, "http://example.test/")
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![
            "http://example.test/",
            "http://example.test/contact",
            "https://example.test/about",
        ]
    );
}

#[tokio::test]
async fn test_base_redirected_to_https_keeps_its_links() {
    let mut driver = StaticDriver::new()
        .with_redirect("http://example.test/", "https://example.test/")
        .with_page(
            "https://example.test/",
            r#"<a href="/contact">Contact</a><a href="https://example.test/about">About</a>"#,
        )
        .with_page("https://example.test/about", "<p>about</p>")
        .with_page("https://example.test/contact", "<form></form>");

    let urls = crawler(1)
        .extract_urls(&mut driver, "http://example.test/")
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![
            "http://example.test/",
            "https://example.test/about",
            "https://example.test/contact",
        ]
    );
}

#[tokio::test]
async fn test_crawl_results_are_unique_and_same_host() {
    let mut driver = StaticDriver::new()
        .with_page(
            "https://example.test/",
            r#"<a href="/a">a</a><a href="/a/">a again</a><a href="/b?x=1">b</a>
               <a href="http://example.test:8080/c">other port</a>"#,
        )
        .with_page(
            "https://example.test/a",
            r#"<a href="/b">b</a><a href="/">home</a><a href="//cdn.test/x">cdn</a>"#,
        )
        .with_page("https://example.test/b", r#"<a href="/a">a</a>"#);

    let urls = crawler(3)
        .extract_urls(&mut driver, "https://example.test/")
        .await
        .unwrap();

    let unique: HashSet<&String> = urls.iter().collect();
    assert_eq!(unique.len(), urls.len());

    for url in &urls {
        let parsed = Url::parse(url).unwrap();
        assert_eq!(parsed.host_str(), Some("example.test"));
        assert_eq!(parsed.port_or_known_default(), Some(443));
    }
    assert_eq!(urls.len(), 3);

    // Each page is loaded once even though it is linked from several places
    assert_eq!(driver.requests().len(), 3);
}

#[tokio::test]
async fn test_crawl_depth_zero_visits_only_base() {
    let mut driver = StaticDriver::new()
        .with_page("https://example.test/", r#"<a href="/a">a</a>"#)
        .with_page("https://example.test/a", "");

    let urls = crawler(0)
        .extract_urls(&mut driver, "https://example.test")
        .await
        .unwrap();

    assert_eq!(urls, vec!["https://example.test/"]);
}

#[tokio::test]
async fn test_crawl_never_reaches_past_max_depth() {
    // Chain: / -> /1 -> /2 -> /3 -> /4
    let mut driver = StaticDriver::new()
        .with_page("https://example.test/", r#"<a href="/1">1</a>"#)
        .with_page("https://example.test/1", r#"<a href="/2">2</a>"#)
        .with_page("https://example.test/2", r#"<a href="/3">3</a>"#)
        .with_page("https://example.test/3", r#"<a href="/4">4</a>"#)
        .with_page("https://example.test/4", "");

    let urls = crawler(2)
        .extract_urls(&mut driver, "https://example.test/")
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![
            "https://example.test/",
            "https://example.test/1",
            "https://example.test/2",
        ]
    );
}

#[tokio::test]
async fn test_unreachable_base_yields_empty_list() {
    let mut driver = StaticDriver::new();

    let urls = crawler(2)
        .extract_urls(&mut driver, "https://example.test/")
        .await
        .unwrap();

    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_invalid_base_is_an_error() {
    let mut driver = StaticDriver::new();
    let result = crawler(1).extract_urls(&mut driver, "::::").await;

    assert!(result.is_err());
}
