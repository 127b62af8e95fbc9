use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
	adaptor::StorageAdaptor,
	error::Result,
	ring::RingHandle,
	ring_id::Identifier,
};


/// The public `set`/`get` surface of the ring.
///
/// Application keys are hashed into the identifier space and values are
/// stored as JSON on whichever member owns the key at the time of the call.
/// Nothing is retried.
pub struct RoutingClient<ADAPTOR: StorageAdaptor>{
	ring: RingHandle<ADAPTOR>,
}

impl<ADAPTOR: StorageAdaptor> Clone for RoutingClient<ADAPTOR>{
	fn clone(&self) -> Self{
		RoutingClient{
			ring: self.ring.clone(),
		}
	}
}

impl<ADAPTOR: StorageAdaptor> RoutingClient<ADAPTOR>{
	pub fn new(ring: RingHandle<ADAPTOR>) -> Self{
		RoutingClient{
			ring,
		}
	}

	pub fn ring(&self) -> &RingHandle<ADAPTOR>{
		&self.ring
	}

	#[instrument(skip(self, value))]
	pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<()>{
		let identifier = Identifier::hash_of(key);
		let serialized = serde_json::to_string(value)?;
		let member = self.ring.locate(&identifier).await?;
		debug!("{} is stored on {}", key, member.address());
		member.set(&identifier, serialized).await
	}

	#[instrument(skip(self))]
	pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Result<V>{
		let identifier = Identifier::hash_of(key);
		let member = self.ring.locate(&identifier).await?;
		debug!("{} is read from {}", key, member.address());
		let serialized = member.get(&identifier).await?;
		Ok(serde_json::from_str(&serialized)?)
	}
}
