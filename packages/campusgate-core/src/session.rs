//! The login/logout/whoami protocol against the portal's eportal API.
//!
//! An `AuthSession` owns the HTTP client and the resolver/cache pair, and
//! tracks one piece of state: the last connectivity verdict. Every
//! protocol failure is folded into an outcome value; nothing here is
//! allowed to take the monitor down.

use anyhow::Result;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::cache::QueryStringCache;
use crate::config::PortalConfig;
use crate::probe::ConnectivityProbe;
use crate::query_string::{QueryStringResolver, scrape_client};

/// Fixed `service` identifier for the campus education network.
const SERVICE_EDU: &str = "edu";

/// Raw reply shape shared by the login and logout endpoints.
#[derive(Debug, Deserialize)]
struct PortalReply {
    result: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "userIndex")]
    user_index: Option<String>,
}

/// Result of one login attempt.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub success: bool,
    pub message: String,
    /// Server-side session index, when the portal reports one.
    pub user_index: Option<String>,
}

impl LoginOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            user_index: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user_index: None,
        }
    }
}

pub struct AuthSession {
    client: reqwest::Client,
    eportal_base: String,
    probe: ConnectivityProbe,
    resolver: QueryStringResolver,
    cache: QueryStringCache,
    retry_times: u32,
    retry_wait_secs: u64,
    is_login: bool,
}

impl AuthSession {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let client = scrape_client(&config.user_agent, config.request_timeout_secs)?;
        let probe = ConnectivityProbe::new(&config.probe_url, config.probe_timeout_secs)?;
        let cache = QueryStringCache::new(&config.cache_path);
        let resolver = QueryStringResolver::new(
            probe.clone(),
            client.clone(),
            &config.landing_url,
            cache.clone(),
        );
        Ok(Self {
            client,
            eportal_base: config.eportal_base.clone(),
            probe,
            resolver,
            cache,
            retry_times: config.retry_times,
            retry_wait_secs: config.retry_wait_secs,
            is_login: false,
        })
    }

    /// Last connectivity verdict this session observed.
    pub fn is_login(&self) -> bool {
        self.is_login
    }

    /// Bounded-retry probe; the verdict is cached as session state.
    pub async fn test_connectivity(&mut self, cancel: &CancellationToken) -> bool {
        self.is_login = self
            .probe
            .is_connected_retry(self.retry_times, self.retry_wait_secs, cancel)
            .await;
        if !self.is_login {
            tracing::info!("Network auth status: offline");
        }
        self.is_login
    }

    /// Attempt a login. Idempotent: when the probe already reports online
    /// this is a no-op success and no login request is sent.
    pub async fn login(
        &mut self,
        user_id: &str,
        password: &str,
        password_encrypted: bool,
        cancel: &CancellationToken,
    ) -> LoginOutcome {
        if self.test_connectivity(cancel).await {
            return LoginOutcome::ok("already online");
        }
        // "offline" and "the stop signal fired mid-probe" look the same
        // above; only the former may start new requests.
        if cancel.is_cancelled() {
            return LoginOutcome::fail("cancelled");
        }
        if user_id.is_empty() || password.is_empty() {
            return LoginOutcome::fail("empty credentials");
        }

        let query_string = self.resolver.resolve().await;
        if query_string.is_empty() {
            tracing::error!("Query string unavailable, cannot build login request");
            return LoginOutcome::fail("query string unavailable");
        }

        let form = [
            ("userId", user_id),
            ("password", password),
            ("service", SERVICE_EDU),
            ("operatorPwd", ""),
            ("operatorUserId", ""),
            ("validcode", ""),
            ("passwordEncrypt", if password_encrypted { "true" } else { "false" }),
            ("queryString", query_string.as_str()),
        ];

        let url = format!("{}login", self.eportal_base);
        let resp = match self.client.post(&url).form(&form).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Login request failed: {}", e);
                return LoginOutcome::fail("network error");
            }
        };

        let reply: PortalReply = match resp.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Login response was not portal JSON: {}", e);
                return LoginOutcome::fail("parse error");
            }
        };

        tracing::info!(
            "Login reply: result={} message={:?}",
            reply.result,
            reply.message
        );

        if reply.result == "success" {
            self.is_login = true;
            // The token just proved itself; keep it for the next cold start.
            if let Err(e) = self.cache.save(&query_string) {
                tracing::warn!("Failed to persist query string: {:#}", e);
            }
            LoginOutcome {
                success: true,
                message: "authenticated".into(),
                user_index: reply.user_index,
            }
        } else {
            LoginOutcome {
                success: false,
                message: reply.message.unwrap_or_else(|| "login rejected".into()),
                user_index: reply.user_index,
            }
        }
    }

    /// Fetch the portal's view of the currently authenticated user. The
    /// shape is portal-defined and treated as opaque; on any failure this
    /// returns an empty map.
    pub async fn online_user_info(&self) -> serde_json::Map<String, serde_json::Value> {
        let url = format!("{}getOnlineUserInfo", self.eportal_base);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Online user info request failed: {}", e);
                return serde_json::Map::new();
            }
        };
        match resp.json::<serde_json::Value>().await {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!("Online user info was not a JSON object");
                serde_json::Map::new()
            }
            Err(e) => {
                tracing::warn!("Failed to parse online user info: {}", e);
                serde_json::Map::new()
            }
        }
    }

    /// Log out of the portal. Success iff the reply carries
    /// `result == "success"`.
    pub async fn logout(&mut self) -> (bool, String) {
        let url = format!("{}logout", self.eportal_base);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Logout request failed: {}", e);
                return (false, "network error".into());
            }
        };
        let reply: PortalReply = match resp.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Logout response was not portal JSON: {}", e);
                return (false, "parse error".into());
            }
        };
        tracing::info!(
            "Logout reply: result={} message={:?}",
            reply.result,
            reply.message
        );
        if reply.result == "success" {
            self.is_login = false;
            (true, "logged out".into())
        } else {
            (false, reply.message.unwrap_or_else(|| "logout rejected".into()))
        }
    }
}
