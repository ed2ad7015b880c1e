//! Query string discovery from the portal's redirect page.
//!
//! The portal rewrites unauthenticated HTTP traffic into a landing page
//! whose inline script carries the login page URL in single quotes:
//!
//! ```text
//! <script>top.self.location.href='http://portal/eportal/index.jsp?wlanuserip=...'</script>
//! ```
//!
//! Everything after the `?` is the token the login endpoint expects echoed
//! back. The split/substring steps below are the de facto protocol
//! contract with this portal; do not "clean them up" into a real HTML
//! parser.

use anyhow::Result;
use reqwest::StatusCode;

use crate::cache::QueryStringCache;
use crate::probe::ConnectivityProbe;

/// Last-resort token used when neither the live portal nor the cache can
/// supply one. Captured from a known-good redirect; the portal accepts
/// stale parameters because they rarely change.
pub const DEFAULT_QUERY_STRING: &str = "wlanuserip%3D0.0.0.0%26wlanacname%3Ddefault%26ssid%3D%26nasip%3D%26snmpagentip%3D%26mac%3D000000000000%26t%3Dwireless-v2%26url%3Dhttp://www.shmtu.edu.cn/";

/// Outcome of parsing a landing page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectParse {
    /// Redirect found; carries the escaped query string.
    Found(String),
    /// Page came back without the redirect script. A known portal bug:
    /// its own stale session state can suppress the redirect entirely.
    NotFound,
    /// Page had a quoted URL, but not the login page shape we expect.
    Malformed,
}

/// Escape a raw query string for re-submission inside a form body:
/// `&` becomes `%26` and `=` becomes `%3D`.
pub fn escape_query_string(raw: &str) -> String {
    raw.replace('&', "%26").replace('=', "%3D")
}

/// Extract the login token from a landing page body.
///
/// Contract with the portal: segment 1 of a single-quote split is the
/// login page URL; its pre-`?` part must mention `index.jsp`; everything
/// after `?` is the token.
pub fn parse_redirect(body: &str) -> RedirectParse {
    let mut segments = body.split('\'');
    segments.next();
    let Some(login_page_url) = segments.next() else {
        return RedirectParse::NotFound;
    };
    match login_page_url.split_once('?') {
        Some((page, query)) if page.contains("index.jsp") => {
            RedirectParse::Found(escape_query_string(query))
        }
        _ => RedirectParse::Malformed,
    }
}

/// Resolves the current query string with a three-tier fallback:
/// live scrape, then on-disk cache, then the hardcoded default.
#[derive(Debug, Clone)]
pub struct QueryStringResolver {
    probe: ConnectivityProbe,
    client: reqwest::Client,
    landing_url: String,
    cache: QueryStringCache,
}

impl QueryStringResolver {
    pub fn new(
        probe: ConnectivityProbe,
        client: reqwest::Client,
        landing_url: &str,
        cache: QueryStringCache,
    ) -> Self {
        Self {
            probe,
            client,
            landing_url: landing_url.to_string(),
            cache,
        }
    }

    /// Resolve a token for the next login attempt.
    ///
    /// Returns the empty string when we are already authenticated (no
    /// token needed, and the portal would not serve a redirect anyway).
    pub async fn resolve(&self) -> String {
        if self.probe.is_connected().await {
            return String::new();
        }

        match self.scrape().await {
            RedirectParse::Found(token) if !token.is_empty() => return token,
            RedirectParse::Found(_) | RedirectParse::NotFound => {
                tracing::info!("Portal landing page had no redirect, trying cached token");
            }
            RedirectParse::Malformed => {
                tracing::warn!("Portal landing page had an unexpected shape, trying cached token");
            }
        }

        let cached = self.cache.load();
        if !cached.is_empty() {
            return cached;
        }

        tracing::info!("No cached query string, falling back to built-in default");
        DEFAULT_QUERY_STRING.to_string()
    }

    async fn scrape(&self) -> RedirectParse {
        let resp = match self.client.get(&self.landing_url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Failed to fetch portal landing page: {}", e);
                return RedirectParse::NotFound;
            }
        };
        if resp.status() != StatusCode::OK {
            tracing::debug!("Portal landing page returned {}", resp.status());
            return RedirectParse::NotFound;
        }
        match resp.text().await {
            Ok(body) => parse_redirect(body.trim()),
            Err(e) => {
                tracing::warn!("Failed to read portal landing page body: {}", e);
                RedirectParse::NotFound
            }
        }
    }
}

/// Build a resolver-ready HTTP client with a bounded per-request timeout.
pub(crate) fn scrape_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    use anyhow::Context;
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        user_agent.parse().context("Invalid user agent")?,
    );
    headers.insert(
        reqwest::header::ACCEPT_ENCODING,
        reqwest::header::HeaderValue::from_static("identity"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build portal HTTP client")
}
