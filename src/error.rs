//! Errors surfaced by ring members, the ring and the routing client.

use crate::{member::NodeAddress, ring_id::Identifier};

/// A wrap `Result` with the crate error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The node did not answer, or answered with an empty body.
	#[error("node {0} is not responding")]
	UnreachableNode(NodeAddress),

	/// The node answered that it holds no data for the key.
	#[error("no data stored for key {0}")]
	NotFound(Identifier),

	/// The node answered, but not with a success status.
	#[error("node {addr} rejected the write: {response:?}")]
	StorageRejected{
		addr: NodeAddress,
		response: String,
	},

	/// The node answered a read with bytes that are not valid UTF-8.
	#[error("node {0} returned a value that is not valid UTF-8")]
	InvalidResponse(NodeAddress),

	/// Routing was attempted on a ring without members.
	#[error("the ring has no members")]
	EmptyRing,

	/// A range or full transfer between two members did not complete.
	#[error("migration from {from} to {to} failed")]
	MigrationFailed{
		from: NodeAddress,
		to: NodeAddress,
	},

	#[error("member {0} is not part of the ring")]
	UnknownMember(Identifier),

	#[error("a member with identifier {0} already joined")]
	DuplicateMember(Identifier),

	/// The ring processor task is no longer running.
	#[error("ring processor stopped")]
	ProcessorStopped,

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}
