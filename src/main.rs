//! Emergency Relay - Binary Entry Point
//!
//! Recovers the store from the durable log, starts the flush and
//! rate-limiter maintenance tasks, and serves the HTTP API until Ctrl+C or
//! SIGTERM. The final pending batch is flushed on the way out.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

use emergency_relay::api::{create_router, AppState};
use emergency_relay::{MessageStore, RelayConfig};

type BoxResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser)]
#[command(
    name = "relay-server",
    version,
    about = "Channel-partitioned emergency message relay"
)]
struct Cli {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,
    /// Directory holding the durable log
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Number of recent messages kept in memory
    #[arg(long)]
    max_recent: Option<usize>,
    /// Maximum message length in characters
    #[arg(long)]
    max_text: Option<usize>,
    /// Seconds a client must wait between messages (0 disables)
    #[arg(long, value_name = "SECS")]
    rate_window: Option<u64>,
    /// Milliseconds between durable log flushes
    #[arg(long, value_name = "MS")]
    flush_interval: Option<u64>,
    /// Take the client address from X-Forwarded-For
    #[arg(long)]
    trust_forwarded_for: bool,
    /// Initial announcement (also RELAY_ANNOUNCEMENT)
    #[arg(long)]
    announcement: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut RelayConfig) {
        if let Some(addr) = self.bind {
            config.bind_addr = addr;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(n) = self.max_recent {
            config.max_recent = n;
        }
        if let Some(n) = self.max_text {
            config.max_text_chars = n;
        }
        if let Some(secs) = self.rate_window {
            config.rate_window = Duration::from_secs(secs);
        }
        if let Some(ms) = self.flush_interval {
            config.flush_interval = Duration::from_millis(ms);
        }
        if self.trust_forwarded_for {
            config.trust_forwarded_for = true;
        }
        if let Some(text) = self.announcement {
            config.announcement = text;
        }
    }
}

#[tokio::main]
async fn main() -> BoxResult<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = RelayConfig::from_env()?;
    Cli::parse().apply(&mut config);
    config.validate()?;

    if config.admin_secret.is_none() {
        warn!("RELAY_ADMIN_SECRET is not set, admin routes are disabled");
    }

    let store = Arc::new(MessageStore::open(&config)?);

    let (stop_flusher, flusher_stopped) = oneshot::channel();
    let flusher = tokio::spawn(store.log_writer().run(config.flush_interval, flusher_stopped));
    let pruner = spawn_rate_limit_pruner(Arc::clone(&store), config.rate_window);

    let app = create_router(Arc::new(AppState::new(Arc::clone(&store), &config)));
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "Emergency relay listening on http://{} (log: {})",
        config.bind_addr,
        config.log_path().display()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down, flushing pending messages");
    if let Some(pruner) = pruner {
        pruner.abort();
    }
    let _ = stop_flusher.send(());
    flusher.await?;

    Ok(())
}

/// Periodically forget clients that have been idle for several windows
fn spawn_rate_limit_pruner(
    store: Arc<MessageStore>,
    window: Duration,
) -> Option<tokio::task::JoinHandle<()>> {
    if window.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut timer = interval(window.max(Duration::from_secs(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            store.prune_idle_clients();
        }
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
