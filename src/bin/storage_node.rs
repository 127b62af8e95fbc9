//! `storage_node`: one storage node of the ring.
//!
//! ```text
//! storage_node -p 8000                  # persist to /tmp/distributed_storage_8000.json
//! storage_node -p 8001 -d ./node1.json  # explicit data file
//! storage_node -p 8002 --memory         # nothing written to disk
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use dht_ring::{
	StorageConfig, TCPAdaptor,
	storage::{KeyValueStore, StorageServer, StorageService},
};


#[derive(Parser)]
#[command(
	name = "storage_node",
	version,
	about = "Serves key/value storage for one member of the ring"
)]
struct Cli {
	/// Path to a JSON config file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Port number to run the server on.
	#[arg(short, long)]
	port: Option<u16>,

	/// Address to listen on.
	#[arg(long)]
	host: Option<String>,

	/// Where the stored keys are persisted.
	#[arg(short, long)]
	data_file: Option<PathBuf>,

	/// Keep everything in memory.
	#[arg(short, long)]
	memory: bool,
}


#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let mut config = StorageConfig::load(cli.config.as_deref()).await.context("failed to load config")?;

	// CLI args override config file values.
	if let Some(port) = cli.port {
		config.port = port;
	}
	if let Some(host) = cli.host {
		config.host = host;
	}
	if let Some(path) = cli.data_file {
		config.data_file = Some(path);
	}

	setup_tracing(&config.log_level);

	let store = if cli.memory {
		KeyValueStore::in_memory()
	} else {
		let path = config.data_file();
		KeyValueStore::open(&path).await
			.with_context(|| format!("failed to open {}", path.display()))?
	};

	let adaptor = Arc::new(TCPAdaptor::new(config.rpc_timeout()));
	let service = Arc::new(StorageService::new(store, adaptor));
	let server = StorageServer::bind(config.listen_addr(), service).await
		.with_context(|| format!("failed to listen on {}", config.listen_addr()))?;

	info!(addr = %config.listen_addr(), memory = cli.memory, "storage node starting");
	server.serve().await;
	Ok(())
}

/// Respects `RUST_LOG` if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}
