//! The storage node every ring member fronts.
//!
//! A node keeps an ordered key/value map and answers the commands of
//! [`StorageRequest`]. While it is pushing keys to another node it marks
//! itself unavailable and answers every command with an empty body.

use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::{
	adaptor::{StorageAdaptor, StorageRequest, response},
	member::NodeAddress,
	ring_id::Identifier,
};

mod store;
pub use store::KeyValueStore;

mod server;
pub use server::StorageServer;


pub struct StorageService<ADAPTOR: StorageAdaptor>{
	store: Mutex<KeyValueStore>,
	available: AtomicBool,
	// used to push keys to other nodes during transfers
	adaptor: Arc<ADAPTOR>,
}

impl<ADAPTOR: StorageAdaptor> StorageService<ADAPTOR>{

	pub fn new(store: KeyValueStore, adaptor: Arc<ADAPTOR>) -> Self{
		StorageService{
			store: Mutex::new(store),
			available: AtomicBool::new(true),
			adaptor,
		}
	}

	pub fn in_memory(adaptor: Arc<ADAPTOR>) -> Self{
		Self::new(KeyValueStore::in_memory(), adaptor)
	}

	pub fn is_available(&self) -> bool{
		self.available.load(Ordering::SeqCst)
	}

	pub fn set_available(&self, available: bool){
		self.available.store(available, Ordering::SeqCst);
	}

	/// Keys currently held by this node, in ascending order.
	pub async fn keys(&self) -> Vec<Identifier>{
		self.store.lock().await.keys()
	}

	pub async fn len(&self) -> usize{
		self.store.lock().await.len()
	}

	/// Executes one command and returns the response body.
	#[instrument(skip_all)]
	pub async fn handle(&self, request: StorageRequest) -> Vec<u8>{
		if !self.is_available() {
			debug!("unavailable, ignoring {:?}", request);
			return Vec::new();
		}

		match request{
			StorageRequest::Check => response::OK.to_vec(),
			StorageRequest::Set { key, value } => {
				if value.is_empty() {
					return response::UNKNOWN_COMMAND.to_vec();
				}
				debug!("setting key {}", key);
				match self.store.lock().await.put(key, value).await {
					Ok(()) => response::OK.to_vec(),
					Err(e) => {
						error!("failed to store value: {}", e);
						response::FAILURE.to_vec()
					},
				}
			},
			StorageRequest::Get { key } => {
				match self.store.lock().await.get(&key) {
					Some(value) => value.clone().into_bytes(),
					None => response::NO_DATA.to_vec(),
				}
			},
			StorageRequest::TransferPart { other_node_ip, other_node_port, from_key_id, to_key_id } => {
				let target = NodeAddress::new(other_node_ip, other_node_port);
				self.transfer_part(&target, &from_key_id, &to_key_id).await
			},
			StorageRequest::Transfer { other_node_ip, other_node_port } => {
				let target = NodeAddress::new(other_node_ip, other_node_port);
				self.transfer(&target).await
			},
		}
	}

	async fn push(&self, target: &NodeAddress, key: Identifier, value: String) -> bool{
		match self.adaptor.send(target, StorageRequest::Set{ key, value }).await {
			Ok(body) => body == response::OK,
			Err(e) => {
				error!("failed to push key to {}: {}", target, e);
				false
			},
		}
	}

	async fn transfer_part(&self, target: &NodeAddress, from: &Identifier, to: &Identifier) -> Vec<u8>{
		self.set_available(false);
		let entries = self.store.lock().await.range(from, to);
		info!("performing partial transfer of {} keys to {}", entries.len(), target);

		let mut result = response::OK;
		for (key, value) in entries {
			debug!("transferring key {} to {}", key, target);
			if !self.push(target, key.clone(), value).await {
				result = response::FAILURE;
				break;
			}
			if let Err(e) = self.store.lock().await.delete(&key).await {
				error!("failed to delete transferred key {}: {}", key, e);
				result = response::FAILURE;
				break;
			}
		}

		self.set_available(true);
		result.to_vec()
	}

	/// Pushes everything to `target`. On success the node stays unavailable for good.
	async fn transfer(&self, target: &NodeAddress) -> Vec<u8>{
		self.set_available(false);
		let entries = self.store.lock().await.entries();
		info!("performing transfer of {} keys to {}, this node will become unavailable", entries.len(), target);

		for (key, value) in entries {
			debug!("transferring key {} to {}", key, target);
			if !self.push(target, key, value).await {
				self.set_available(true);
				return response::FAILURE.to_vec();
			}
		}
		response::OK.to_vec()
	}
}
