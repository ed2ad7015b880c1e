//! CampusGate CLI - keeps a machine authenticated on the campus network
//!
//! The campus captive portal silently drops sessions; this binary can:
//! - Run a background monitor that probes connectivity and re-authenticates
//! - Perform one-shot login/logout against the portal
//! - Report current connectivity and the portal's online-user record

mod daemon;

use anyhow::Result;
use campusgate_core::{config, failover, session::AuthSession};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "campusgate")]
#[command(version)]
#[command(about = "Campus network captive portal keep-alive agent")]
#[command(long_about = "
CampusGate keeps a machine authenticated against the campus captive
portal. The portal drops sessions without warning, so the usual mode of
operation is the monitor:

  1. Configure credentials:  campusgate config
  2. Try them once:          campusgate login
  3. Start the monitor:      campusgate run

For systemd integration, run 'campusgate run' as a simple service.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the keep-alive monitor in the foreground
    #[command(alias = "monitor")]
    Run {
        /// Seconds between connectivity checks (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Attempt a single login now
    Login {
        /// Portal user id (12 digits); defaults to the configured list
        #[arg(short, long)]
        user: Option<String>,

        /// Password for --user
        #[arg(short, long)]
        password: Option<String>,

        /// The password is already portal-encrypted
        #[arg(long)]
        encrypted: bool,
    },

    /// Log out of the portal
    Logout,

    /// Show connectivity and the portal's online-user record
    Status,

    /// Show configuration paths and an example config
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("campusgate={log_level},campusgate_core={log_level}").into()
            }),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Run { interval } => daemon::run_monitor(*interval).await,
        Commands::Login {
            user,
            password,
            encrypted,
        } => cmd_login(&cli, user.clone(), password.clone(), *encrypted).await,
        Commands::Logout => cmd_logout(&cli).await,
        Commands::Status => cmd_status(&cli).await,
        Commands::Config => cmd_config(&cli),
    }
}

async fn cmd_login(
    cli: &Cli,
    user: Option<String>,
    password: Option<String>,
    encrypted: bool,
) -> Result<()> {
    let cfg = config::load_config();
    let mut session = AuthSession::new(&cfg)?;
    let cancel = CancellationToken::new();

    let (success, message) = match (user, password) {
        (Some(user), Some(password)) => {
            let outcome = session.login(&user, &password, encrypted, &cancel).await;
            (outcome.success, outcome.message)
        }
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("--user and --password must be given together");
        }
        (None, None) => {
            let users = config::load_credentials();
            if users.is_empty() {
                anyhow::bail!(
                    "No credentials configured. Add [[users]] entries to {} or pass --user/--password.",
                    config::config_file_path_string()
                );
            }
            let ok = failover::login_by_list(&mut session, &users, &cancel).await;
            (
                ok,
                if ok {
                    "authenticated".to_string()
                } else {
                    "every configured user failed".to_string()
                },
            )
        }
    };

    match cli.format {
        OutputFormat::Text => {
            if success {
                println!("Login OK: {message}");
            } else {
                println!("Login failed: {message}");
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "success": success, "message": message })
            );
        }
    }

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_logout(cli: &Cli) -> Result<()> {
    let cfg = config::load_config();
    let mut session = AuthSession::new(&cfg)?;
    let (success, message) = session.logout().await;

    match cli.format {
        OutputFormat::Text => {
            if success {
                println!("Logged out.");
            } else {
                println!("Logout failed: {message}");
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "success": success, "message": message })
            );
        }
    }

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let cfg = config::load_config();
    let session = AuthSession::new(&cfg)?;
    let probe = campusgate_core::ConnectivityProbe::new(&cfg.probe_url, cfg.probe_timeout_secs)?;

    let state = probe.check().await;
    let info = if state.online {
        session.online_user_info().await
    } else {
        serde_json::Map::new()
    };

    match cli.format {
        OutputFormat::Text => {
            println!(
                "Connectivity: {}",
                if state.online { "online" } else { "offline" }
            );
            println!("Checked at:   {}", state.observed_at);
            if !info.is_empty() {
                println!("Portal online-user record:");
                for (key, value) in &info {
                    println!("  {key}: {value}");
                }
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "online": state.online,
                    "observed_at": state.observed_at,
                    "online_user_info": info,
                })
            );
        }
    }
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let cfg = config::load_config();
    let users = config::load_credentials();

    match cli.format {
        OutputFormat::Text => {
            println!("Config file:       {}", config::config_file_path_string());
            println!("Config source:     {}", cfg.source);
            println!("Portal API base:   {}", cfg.eportal_base);
            println!("Landing page:      {}", cfg.landing_url);
            println!("Probe endpoint:    {}", cfg.probe_url);
            println!("Check interval:    {}s", cfg.check_interval_secs);
            println!(
                "Probe retries:     {} x {}s wait",
                cfg.retry_times, cfg.retry_wait_secs
            );
            println!("Token cache:       {}", cfg.cache_path.display());
            println!("Configured users:  {}", users.len());
            for user in &users {
                println!(
                    "  {} ({})",
                    user.masked_id(),
                    if user.is_valid() { "valid" } else { "invalid" }
                );
            }
            println!();
            println!("Example config:");
            println!("{}", config::example_config());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config::config_file_path_string(),
                    "source": cfg.source.to_string(),
                    "eportal_base": cfg.eportal_base,
                    "landing_url": cfg.landing_url,
                    "probe_url": cfg.probe_url,
                    "check_interval": cfg.check_interval_secs,
                    "retry_times": cfg.retry_times,
                    "retry_wait": cfg.retry_wait_secs,
                    "cache_path": cfg.cache_path.display().to_string(),
                    "users": users.iter().map(|u| u.masked_id()).collect::<Vec<_>>(),
                })
            );
        }
    }
    Ok(())
}
