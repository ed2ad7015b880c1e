//! Cancellable background keep-alive loop.
//!
//! One monitor owns one worker task, and every network call in the system
//! happens on that task. The portal API is not known to tolerate
//! concurrent logins from the same session context, so "one request in
//! flight at a time" is an invariant here, not an optimization.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::PortalConfig;
use crate::credentials::{Credential, valid_credentials};
use crate::events::EventSink;
use crate::failover::login_by_list;
use crate::session::AuthSession;

pub struct AuthMonitor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AuthMonitor {
    /// Snapshot the valid credentials and spawn the worker. Later changes
    /// to the caller's list do not reach a running monitor.
    pub fn start(
        config: PortalConfig,
        users: &[Credential],
        events: Arc<dyn EventSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let users = valid_credentials(users);
        let worker_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_monitor(config, users, events, worker_cancel).await;
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the worker to exit at its next suspension point. An HTTP
    /// request already in flight is allowed to finish first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the worker to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Monitor worker ended abnormally: {}", e);
            }
        }
    }
}

async fn run_monitor(
    config: PortalConfig,
    users: Vec<Credential>,
    events: Arc<dyn EventSink>,
    cancel: CancellationToken,
) {
    if users.is_empty() {
        tracing::error!("No valid credentials configured, monitor not starting");
        return;
    }
    for (i, user) in users.iter().enumerate() {
        tracing::info!(
            "[{}] user: {}, password: {}",
            i + 1,
            user.masked_id(),
            user.masked_password()
        );
    }

    let mut session = match AuthSession::new(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to initialize portal session: {:#}", e);
            return;
        }
    };

    tracing::info!(
        "Auth status monitor started (interval {}s, {} probe attempts per check)",
        config.check_interval_secs,
        config.retry_times
    );

    // A fresh session starts offline; a first offline cycle is therefore
    // not a transition and stays silent.
    let mut last_online = false;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let online = session.test_connectivity(&cancel).await;
        // The retry above can block for a while; re-check before acting.
        if cancel.is_cancelled() {
            break;
        }

        if last_online != online {
            if online {
                tracing::info!("Network connected");
                events.notify("connectivity", "connected");
            } else {
                tracing::info!("Network disconnected");
                events.notify("connectivity", "disconnected");
            }
        }
        last_online = online;

        if !online {
            if login_by_list(&mut session, &users, &cancel).await {
                tracing::info!("Login success");
                events.notify("auth", "success");
            } else if !cancel.is_cancelled() {
                tracing::error!("Login failed for every configured user");
                events.notify("auth", "failure");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(config.check_interval_secs)) => {}
        }
    }

    tracing::info!("Auth status monitor stopped");
}
