//! Foreground monitor mode.
//!
//! Runs the keep-alive monitor until SIGTERM/SIGINT, then shuts the
//! worker down gracefully. Daemonization proper is left to systemd; run
//! this as a simple service.

use anyhow::Result;
use campusgate_core::{config, events::EventSink, monitor::AuthMonitor};
use std::sync::Arc;

/// Forwards monitor events to the log. Headless deployments have no other
/// notification channel.
struct LogSink;

impl EventSink for LogSink {
    fn notify(&self, event: &str, status: &str) {
        tracing::info!("[{}] {}", event, status);
    }
}

/// Run the keep-alive monitor in the foreground
pub async fn run_monitor(interval_override: Option<u64>) -> Result<()> {
    let mut cfg = config::load_config();
    if let Some(secs) = interval_override.filter(|s| *s > 0) {
        cfg.check_interval_secs = secs;
    }

    let users = config::load_credentials();
    if users.is_empty() {
        eprintln!("Error: no credentials configured.");
        eprintln!(
            "Add [[users]] entries to {} (see 'campusgate config').",
            config::config_file_path_string()
        );
        std::process::exit(1);
    }

    tracing::info!(
        "Starting monitor: checking every {}s with {} configured user(s), config from {}",
        cfg.check_interval_secs,
        users.len(),
        cfg.source
    );

    let monitor = AuthMonitor::start(cfg, &users, Arc::new(LogSink));

    wait_for_shutdown().await;

    tracing::info!("Shutting down monitor");
    monitor.shutdown().await;
    tracing::info!("Monitor stopped");
    Ok(())
}

/// Block until SIGTERM or SIGINT.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl+C"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to wait for Ctrl+C: {}", e);
        }
    }
}
