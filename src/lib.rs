//! A consistent-hashing key/value ring.
//!
//! Storage nodes are placed on a 160 bit identifier space by the hash of their
//! address. A [`Ring`] keeps them ordered, routes each key to the member that
//! owns it, and moves key ranges between members when they join or leave.
//! [`RoutingClient`] is the `set`/`get` surface on top.

use std::sync::Arc;


pub mod error;
pub use error::{Error, Result};

pub mod ring_id;
pub use ring_id::Identifier;

pub mod member;
pub use member::{NodeAddress, RingMember};

pub mod adaptor;
pub use adaptor::{StorageAdaptor, local_adaptor::LocalAdaptor, tcp_adaptor::TCPAdaptor};

pub mod ring;
pub use ring::{Ring, RingHandle, RingState};

pub mod client;
pub use client::RoutingClient;

pub mod storage;

pub mod config;
pub use config::{RingConfig, StorageConfig};



pub type TCPRing = Ring<TCPAdaptor>;
pub type TCPClient = RoutingClient<TCPAdaptor>;


/// Starts a ring over TCP from a configuration: restores the saved state if a
/// state file is configured, then joins the configured members that are not
/// part of the ring yet.
pub async fn start_tcp_ring(config: &RingConfig) -> Result<RingHandle<TCPAdaptor>>{
	let adaptor = Arc::new(TCPAdaptor::new(config.rpc_timeout()));
	let handle = Ring::with_config(adaptor, config).start();

	if let Some(path) = &config.state_file {
		handle.restore_from_file(path).await?;
	}

	let known: Vec<NodeAddress> = handle.members().await?.iter().map(|m| m.address().clone()).collect();
	for addr in &config.members {
		if !known.contains(addr) {
			handle.join_address(addr.clone()).await?;
		}
	}
	Ok(handle)
}
