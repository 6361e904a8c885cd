use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};

use slotbook::config::{ServerConfig, StoreBackend};
use slotbook::feed::create_slot_feed;
use slotbook::managers::{
    create_shared_bracket_manager, create_shared_coordinator, SlotReservationEngine,
};
use slotbook::store::{
    create_shared_slot_store, JsonFileDocumentStore, MemoryDocumentStore, SharedDocumentStore,
};
use slotbook::web::{self, AppState};

/// Match slot reservation service for creator brackets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides HTTP_PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Directory for persisted brackets (overrides STATE_PATH)
    #[arg(long)]
    state_path: Option<String>,

    /// Keep brackets in memory only; nothing survives a restart
    #[arg(long)]
    memory: bool,

    /// Retries after a concurrent write before giving up (overrides MAX_CONFLICT_RETRIES)
    #[arg(long)]
    max_conflict_retries: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(state_path) = args.state_path {
        config.state_path = state_path;
    }
    if args.memory {
        config.store_backend = StoreBackend::Memory;
    }
    if let Some(retries) = args.max_conflict_retries {
        config.max_conflict_retries = retries;
    }
    config.validate()?;

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(config.log_level)
        .init();

    let documents: SharedDocumentStore = match config.store_backend {
        StoreBackend::Json => {
            tokio::fs::create_dir_all(&config.state_path).await?;
            let path = config.bracket_file();
            info!("Loading brackets from {}...", path);
            Arc::new(JsonFileDocumentStore::open(&path).await?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; brackets are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let feed = create_slot_feed(config.feed_capacity);
    let engine = SlotReservationEngine::new(create_shared_slot_store(documents.clone()));
    let state = AppState {
        brackets: create_shared_bracket_manager(documents, feed.clone()),
        coordinator: create_shared_coordinator(engine, feed.clone(), config.max_conflict_retries),
        feed,
    };

    info!(
        "Starting slot service (backend {:?}, {} conflict retries)",
        config.store_backend, config.max_conflict_retries
    );
    web::start_web_server(config.http_port, state).await?;
    warn!("Slot service ended.");

    Ok(())
}
