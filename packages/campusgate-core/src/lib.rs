//! CampusGate Core Library
//!
//! This crate keeps a client authenticated against the campus captive
//! portal:
//! - Connectivity probing against a generate-204 endpoint
//! - Query string discovery from the portal redirect (with file-backed
//!   cache and hardcoded fallback)
//! - Credential submission and ordered multi-user failover
//! - A cancellable background keep-alive monitor
//!
//! # Example
//!
//! ```no_run
//! use campusgate_core::{config, monitor::AuthMonitor, events::NullSink};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = config::load_config();
//!     let users = config::load_credentials();
//!
//!     let monitor = AuthMonitor::start(cfg, &users, Arc::new(NullSink));
//!
//!     // ... later, on shutdown:
//!     monitor.shutdown().await;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod credentials;
pub mod events;
pub mod failover;
pub mod monitor;
pub mod probe;
pub mod query_string;
pub mod session;

// Re-export commonly used types
pub use cache::QueryStringCache;
pub use config::{ConfigSource, PortalConfig};
pub use credentials::Credential;
pub use events::{EventSink, NullSink};
pub use monitor::AuthMonitor;
pub use probe::{ConnectivityProbe, ConnectivityState};
pub use query_string::{QueryStringResolver, RedirectParse};
pub use session::{AuthSession, LoginOutcome};
