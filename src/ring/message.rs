use std::fmt;

use tokio::sync::oneshot::Sender;

use crate::{
	adaptor::StorageAdaptor,
	error::Result,
	member::{NodeAddress, RingMember},
	ring_id::Identifier,
};


/// Requests handled by the ring processor. Each one carries the channel its
/// result is sent back on.
pub(crate) enum RingRequest<ADAPTOR: StorageAdaptor>{
	// Membership
	Join{member: RingMember<ADAPTOR>, reply: Sender<Result<()>>},
	Leave{identifier: Identifier, reply: Sender<Result<()>>},
	Restore{members: Vec<NodeAddress>, reply: Sender<Result<()>>},

	// Routing
	Locate{start: Option<Identifier>, key: Identifier, reply: Sender<Result<RingMember<ADAPTOR>>>},

	// Other
	Members{reply: Sender<Vec<RingMember<ADAPTOR>>>},
}

impl<ADAPTOR: StorageAdaptor> fmt::Debug for RingRequest<ADAPTOR>{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RingRequest::Join { member, .. } => write!(f, "Join({})", member.address()),
			RingRequest::Leave { identifier, .. } => write!(f, "Leave({})", identifier),
			RingRequest::Restore { members, .. } => write!(f, "Restore({} members)", members.len()),
			RingRequest::Locate { start, key, .. } => write!(f, "Locate({} from {:?})", key, start),
			RingRequest::Members { .. } => write!(f, "Members"),
		}
	}
}
