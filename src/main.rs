//! Talk sharing server.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     TALK SERVER                      │
//!                     │                                                      │
//!  Client Request     │  ┌─────────┐    ┌──────────┐    ┌───────────────┐    │
//!  ───────────────────┼─▶│  http   │───▶│ routing  │───▶│   handlers    │    │
//!                     │  │ server  │    │ patterns │    │ (talk routes) │    │
//!                     │  └────┬────┘    └──────────┘    └───────┬───────┘    │
//!                     │       │ unhandled                       │            │
//!                     │       ▼                                 ▼            │
//!                     │  ┌─────────┐                    ┌───────────────┐    │
//!                     │  │ static  │                    │     store     │    │
//!                     │  │ files   │                    │ version + map │    │
//!                     │  │ → 404   │                    └───┬───────┬───┘    │
//!                     │  └─────────┘                        │       │        │
//!                     │                                     ▼       ▼        │
//!                     │                             ┌──────────┐ ┌─────────┐ │
//!                     │                             │ notifier │ │persister│ │
//!                     │                             │long polls│ │  disk   │ │
//!                     │                             └──────────┘ └─────────┘ │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use talk_server::config::{load_config, ServerConfig};
use talk_server::lifecycle::{spawn_signal_listener, Shutdown};
use talk_server::observability::{logging, metrics};
use talk_server::store::{persistence, JsonFile, Persister, TalkPersistence, TalkStore};
use talk_server::TalkServer;

#[derive(Parser)]
#[command(name = "talk-server")]
#[command(about = "Serve talks over HTTP with long polling", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address (e.g. 127.0.0.1:8000).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("talk-server v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage = %config.storage.path.display(),
        static_root = %config.static_files.root.display(),
        max_wait_secs = config.long_poll.max_wait_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Load talks and start the background writer.
    let (store, persister) = if config.storage.enabled {
        let backend: Arc<dyn TalkPersistence> = Arc::new(JsonFile::new(&config.storage.path));
        let store = Arc::new(TalkStore::new(persistence::load_or_empty(backend.as_ref())));
        let persister = Persister::new(backend, store.subscribe()).spawn();
        (store, Some(persister))
    } else {
        tracing::warn!("Storage disabled, talks will not survive a restart");
        (Arc::new(TalkStore::default()), None)
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = TalkServer::new(config, store.clone())?;
    server.run(listener, shutdown.subscribe()).await?;

    // Dropping the last store handle closes the channel; the persister
    // flushes what it has and exits.
    drop(store);
    if let Some(persister) = persister {
        if tokio::time::timeout(Duration::from_secs(5), persister).await.is_err() {
            tracing::warn!("Timed out waiting for the final save");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
