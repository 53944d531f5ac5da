//! The narrow browser surface the rest of autoqa depends on.
//!
//! Anything that can navigate to a URL and hand back the rendered markup can
//! drive the pipeline. [`HttpDriver`] fetches pages with reqwest and answers
//! element queries with scraper; [`StaticDriver`] serves pages from memory.

use crate::error::DriverError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to `url` and wait until the document is available.
    async fn get(&mut self, url: &str) -> Result<(), DriverError>;

    fn page_source(&self) -> String;

    fn current_url(&self) -> String;

    fn title(&self) -> String;

    fn find_elements(&self, selector: &str) -> Result<Vec<Element>, DriverError>;

    /// End the session. The driver must not be used afterwards.
    async fn quit(&mut self);
}

/// An element handle detached from the document it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub(crate) fn from_ref(element: ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_string(),
            text: visible_text(element),
            attributes: value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Whitespace-collapsed text content, the way a browser reports `.text`.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector).map_err(|_| DriverError::InvalidSelector(selector.to_string()))
}

/// Run a CSS selector against raw markup.
pub fn select_elements(html: &str, selector: &str) -> Result<Vec<Element>, DriverError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).map(Element::from_ref).collect())
}

/// Text of the document's `<title>`, or an empty string.
pub fn document_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(visible_text)
        .unwrap_or_default()
}

struct LoadedPage {
    url: String,
    source: String,
}

/// Fetches pages over HTTP. No script execution: what the server sends is
/// what the pipeline sees.
pub struct HttpDriver {
    client: Client,
    page: Option<LoadedPage>,
}

impl HttpDriver {
    pub fn new(navigation_timeout: Duration) -> Result<Self, DriverError> {
        let client = Client::builder()
            .user_agent(concat!("autoqa/", env!("CARGO_PKG_VERSION")))
            .timeout(navigation_timeout)
            .connect_timeout(navigation_timeout / 2)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, page: None })
    }
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn get(&mut self, url: &str) -> Result<(), DriverError> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout(url.to_string())
            } else {
                DriverError::HttpError(e)
            }
        })?;

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // A missing content-type is treated as markup
        if let Some(ref ct) = content_type
            && !ct.contains("html")
        {
            return Err(DriverError::NotHtml {
                url: final_url,
                content_type: ct.clone(),
            });
        }

        let source = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout(url.to_string())
            } else {
                DriverError::HttpError(e)
            }
        })?;

        self.page = Some(LoadedPage {
            url: final_url,
            source,
        });
        Ok(())
    }

    fn page_source(&self) -> String {
        self.page
            .as_ref()
            .map(|p| p.source.clone())
            .unwrap_or_default()
    }

    fn current_url(&self) -> String {
        self.page.as_ref().map(|p| p.url.clone()).unwrap_or_default()
    }

    fn title(&self) -> String {
        self.page
            .as_ref()
            .map(|p| document_title(&p.source))
            .unwrap_or_default()
    }

    fn find_elements(&self, selector: &str) -> Result<Vec<Element>, DriverError> {
        let page = self.page.as_ref().ok_or(DriverError::NoPage)?;
        select_elements(&page.source, selector)
    }

    async fn quit(&mut self) {
        self.page = None;
    }
}

/// Serves pages from an in-memory map keyed by URL. Unknown URLs fail the
/// way an unreachable host would.
#[derive(Default)]
pub struct StaticDriver {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    current: Option<String>,
    requests: Vec<String>,
}

impl StaticDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(canonical_key(url), html.to_string());
        self
    }

    /// Loading `from` lands on `to`, the way an HTTP redirect would.
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(canonical_key(from), canonical_key(to));
        self
    }

    /// Every URL passed to `get`, in call order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

fn canonical_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl PageDriver for StaticDriver {
    async fn get(&mut self, url: &str) -> Result<(), DriverError> {
        self.requests.push(url.to_string());
        let mut key = canonical_key(url);
        if let Some(target) = self.redirects.get(&key) {
            key = target.clone();
        }
        if self.pages.contains_key(&key) {
            self.current = Some(key);
            Ok(())
        } else {
            Err(DriverError::Other(format!("no page registered for {}", url)))
        }
    }

    fn page_source(&self) -> String {
        self.current
            .as_ref()
            .and_then(|key| self.pages.get(key))
            .cloned()
            .unwrap_or_default()
    }

    fn current_url(&self) -> String {
        self.current.clone().unwrap_or_default()
    }

    fn title(&self) -> String {
        document_title(&self.page_source())
    }

    fn find_elements(&self, selector: &str) -> Result<Vec<Element>, DriverError> {
        if self.current.is_none() {
            return Err(DriverError::NoPage);
        }
        select_elements(&self.page_source(), selector)
    }

    async fn quit(&mut self) {
        self.current = None;
    }
}
