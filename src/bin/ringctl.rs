//! `ringctl`: administers a ring of storage nodes and reads/writes keys on it.
//!
//! Membership is kept in a state file between invocations.
//!
//! ```text
//! ringctl join 127.0.0.1:8000 127.0.0.1:8001
//! ringctl set greeting "hello"
//! ringctl get greeting
//! ringctl leave 127.0.0.1:8001
//! ringctl members
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use dht_ring::{Identifier, NodeAddress, RingConfig, TCPClient};


const DEFAULT_STATE_FILE: &str = "ring_state.json";


#[derive(Parser)]
#[command(
	name = "ringctl",
	version,
	about = "Manage ring membership and access keys stored on the ring"
)]
struct Cli {
	/// Path to a JSON config file.
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Ring state file, overrides the config value.
	#[arg(short, long, global = true)]
	state: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Add storage nodes ("ip:port") to the ring, in order.
	Join {
		#[arg(required = true)]
		addrs: Vec<String>,
	},

	/// Remove a storage node from the ring, moving its keys to a neighbour.
	Leave {
		addr: String,
	},

	/// Store a string value under a key.
	Set {
		key: String,
		value: String,
	},

	/// Print the value stored under a key.
	Get {
		key: String,
	},

	/// Print the member responsible for a key.
	Locate {
		key: String,
	},

	/// List the members ascending by identifier.
	Members,
}


#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let mut config = RingConfig::load(cli.config.as_deref()).await.context("failed to load config")?;
	if let Some(state) = cli.state {
		config.state_file = Some(state);
	}
	let state_file = config.state_file.get_or_insert_with(|| PathBuf::from(DEFAULT_STATE_FILE)).clone();

	setup_tracing(&config.log_level);

	let ring = dht_ring::start_tcp_ring(&config).await.context("failed to start the ring")?;
	let client = TCPClient::new(ring.clone());

	let result = run(cli.command, &client).await;

	// membership may have changed even if the command failed afterwards
	if let Err(e) = ring.save_state(&state_file).await {
		warn!("failed to save ring state to {}: {}", state_file.display(), e);
	}
	result
}

async fn run(command: Commands, client: &TCPClient) -> Result<()> {
	let ring = client.ring();
	match command {
		Commands::Join { addrs } => {
			for addr in addrs {
				let addr = NodeAddress::parse(&addr).with_context(|| format!("invalid address {:?}", addr))?;
				ring.join_address(addr.clone()).await.with_context(|| format!("failed to join {}", addr))?;
				println!("joined {}", addr);
			}
		},
		Commands::Leave { addr } => {
			let addr = NodeAddress::parse(&addr).with_context(|| format!("invalid address {:?}", addr))?;
			ring.leave_address(addr.clone()).await.with_context(|| format!("failed to remove {}", addr))?;
			println!("removed {}", addr);
		},
		Commands::Set { key, value } => {
			client.set(&key, &value).await.with_context(|| format!("failed to set {:?}", key))?;
		},
		Commands::Get { key } => {
			let value: serde_json::Value = client.get(&key).await.with_context(|| format!("failed to get {:?}", key))?;
			match value {
				serde_json::Value::String(s) => println!("{}", s),
				other => println!("{}", other),
			}
		},
		Commands::Locate { key } => {
			let member = ring.locate(&Identifier::hash_of(&key)).await?;
			println!("{} {}", member.address(), member.identifier());
		},
		Commands::Members => {
			for member in ring.members().await? {
				println!("{} {}", member.address(), member.identifier());
			}
		},
	}
	Ok(())
}

/// Respects `RUST_LOG` if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();
}
