use std::io;

use async_trait::async_trait;
use serde::{Serialize, Deserialize};

use crate::{member::NodeAddress, ring_id::Identifier};


pub mod tcp_adaptor;
pub mod local_adaptor;

/// Commands understood by a storage node. On the wire each request is a single
/// JSON object tagged with `cmd`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum StorageRequest{
	Check,
	Get{key: Identifier},
	Set{key: Identifier, value: String},
	/// Push every key strictly between the two ids to the other node, then delete it locally.
	TransferPart{
		other_node_ip: String,
		other_node_port: String,
		from_key_id: Identifier,
		to_key_id: Identifier,
	},
	/// Push every key to the other node. The node retires afterwards.
	Transfer{
		other_node_ip: String,
		other_node_port: String,
	},
}

/// Plain text status bodies returned by storage nodes.
pub mod response {
	pub const OK: &[u8] = b"OK";
	pub const NO_DATA: &[u8] = b"NO DATA";
	pub const FAILURE: &[u8] = b"FAILURE";
	pub const UNKNOWN_COMMAND: &[u8] = b"UNKNOWN COMMAND";
}


/// Delivers a request to the storage node at an address and returns the raw
/// response body.
///
/// An empty body is a valid return value, callers decide what it means.
/// Transport failures, including timeouts, are returned as io errors.
#[async_trait]
pub trait StorageAdaptor: Send + Sync + 'static{
	async fn send(&self, to: &NodeAddress, request: StorageRequest) -> io::Result<Vec<u8>>;
}
