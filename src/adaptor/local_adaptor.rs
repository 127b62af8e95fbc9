use std::{collections::HashMap, io, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StorageAdaptor, StorageRequest};
use crate::{member::NodeAddress, storage::StorageService};

/// An in-process StorageAdaptor: requests are handed straight to registered
/// StorageServices instead of going over a socket.
///
/// Sending to an address with no registered service fails like a refused
/// connection. Clones share the same registry.
#[derive(Clone, Default)]
pub struct LocalAdaptor{
	nodes: Arc<RwLock<HashMap<NodeAddress, Arc<StorageService<LocalAdaptor>>>>>,
}

impl LocalAdaptor{
	pub fn new() -> Self{
		Self::default()
	}

	/// Starts an in-memory storage service at `addr` and returns it.
	pub async fn spawn_node(&self, addr: NodeAddress) -> Arc<StorageService<LocalAdaptor>>{
		let service = Arc::new(StorageService::in_memory(Arc::new(self.clone())));
		self.register(addr, service.clone()).await;
		service
	}

	pub async fn register(&self, addr: NodeAddress, service: Arc<StorageService<LocalAdaptor>>){
		self.nodes.write().await.insert(addr, service);
	}

	/// Takes the node at `addr` off the network. Later requests to it fail.
	pub async fn unregister(&self, addr: &NodeAddress) -> Option<Arc<StorageService<LocalAdaptor>>>{
		self.nodes.write().await.remove(addr)
	}
}

#[async_trait]
impl StorageAdaptor for LocalAdaptor{
	async fn send(&self, to: &NodeAddress, request: StorageRequest) -> io::Result<Vec<u8>>{
		let service = self.nodes.read().await.get(to).cloned();
		match service {
			Some(service) => Ok(service.handle(request).await),
			None => Err(io::Error::new(io::ErrorKind::ConnectionRefused, format!("no node at {}", to))),
		}
	}
}
