
use std::sync::Arc;

use dht_ring::{
	NodeAddress, Ring, RingHandle, TCPAdaptor,
	storage::{StorageServer, StorageService},
};
use tokio::{net::TcpListener, time::Duration};


pub type Node = (NodeAddress, Arc<StorageService<TCPAdaptor>>);

pub fn adaptor() -> Arc<TCPAdaptor> {
	Arc::new(TCPAdaptor::new(Some(Duration::from_secs(5))))
}

/// Starts `qty` in-memory storage nodes on ephemeral local ports.
pub async fn make_nodes(qty: u32) -> Vec<Node> {
	let mut v = Vec::new();
	for _ in 0..qty {
		let service = Arc::new(StorageService::in_memory(adaptor()));
		let server = StorageServer::bind("127.0.0.1:0", service.clone()).await
			.expect("Storage nodes should be able to bind");
		let local = server.local_addr().expect("Bound server should have an address");
		server.spawn();
		v.push((NodeAddress::new(local.ip().to_string(), local.port().to_string()), service));
	}
	v
}

pub fn start_ring() -> RingHandle<TCPAdaptor> {
	Ring::new(adaptor()).start()
}

pub async fn ring_of(nodes: &[Node]) -> RingHandle<TCPAdaptor> {
	let ring = start_ring();
	for (addr, _) in nodes {
		ring.join_address(addr.clone()).await.expect("Nodes should be able to join");
	}
	ring
}

/// An address nothing is listening on.
pub async fn dead_address() -> NodeAddress {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Should be able to bind");
	let local = listener.local_addr().expect("Bound listener should have an address");
	drop(listener);
	NodeAddress::new(local.ip().to_string(), local.port().to_string())
}

/// Total number of keys held across `nodes`.
pub async fn stored_keys(nodes: &[Node]) -> usize {
	let mut total = 0;
	for (_, service) in nodes {
		total += service.len().await;
	}
	total
}
