//! HTTP fetch collaborator for the vector builder.

use reqwest::{header, Client};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;
use websim_core::{FetchError, Fetcher, Tokenization};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = "websim-bot/0.1 (+https://example.com/bot)";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub tokenization: Tokenization,
    pub max_body_bytes: usize,
    /// Honour HTTP_PROXY and friends from the environment.
    pub env_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tokenization: Tokenization::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            env_proxy: true,
        }
    }
}

/// Fetches an html page and returns the words of its `<body>`.
pub struct HttpFetcher {
    client: Client,
    body: Selector,
    tokenization: Tokenization,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> reqwest::Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout);
        if !config.env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            body: Selector::parse("body").expect("static selector"),
            tokenization: config.tokenization,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Same fetcher with a different splitting rule.
    pub fn with_tokenization(mut self, tokenization: Tokenization) -> Self {
        self.tokenization = tokenization;
        self
    }

    pub fn tokenization(&self) -> Tokenization { self.tokenization }

    async fn fetch_html(&self, id: &str) -> Result<String, FetchError> {
        let url = parse_url(id).ok_or_else(|| FetchError::Request { id: id.to_string(), reason: "not a valid url".into() })?;
        let request_err = |e: reqwest::Error| FetchError::Request { id: id.to_string(), reason: e.to_string() };

        let mut resp = self.client.get(url).send().await.map_err(request_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { id: id.to_string(), status: status.as_u16() });
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !ct.starts_with("text/html") {
                return Err(FetchError::NotHtml { id: id.to_string(), content_type: ct.to_string() });
            }
        }
        let too_large = || FetchError::TooLarge { id: id.to_string(), limit: self.max_body_bytes };
        if resp.content_length().is_some_and(|n| n as usize > self.max_body_bytes) {
            return Err(too_large());
        }
        // content-length may be absent, so the cap is enforced while streaming
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(request_err)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: &str) -> Result<Vec<String>, FetchError> {
        let html = self.fetch_html(id).await?;
        let words = self.tokenization.tokenize(&body_text(&html, &self.body));
        tracing::debug!(%id, words = words.len(), "fetched page");
        if words.is_empty() {
            return Err(FetchError::Empty { id: id.to_string() });
        }
        Ok(words)
    }
}

/// Text content of the first `<body>`, space separated between nodes.
pub fn body_text(html: &str, body: &Selector) -> String {
    let doc = Html::parse_document(html);
    doc.select(body)
        .next()
        .map(|n| n.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Parse a seed line as a url, assuming https when no scheme is given.
/// The fragment is dropped.
pub fn parse_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw).or_else(|_| Url::parse(&format!("https://{raw}"))).ok()?;
    if !url.scheme().starts_with("http") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Canonical string form of a seed, or `None` when it is not a usable url.
pub fn normalize_id(raw: &str) -> Option<String> {
    parse_url(raw.trim()).map(|u| u.to_string())
}
