use std::{fmt, sync::Arc};

use serde::{Serialize, Deserialize};
use tracing::{debug, instrument, warn};

use crate::{
	adaptor::{StorageAdaptor, StorageRequest, response},
	error::{Error, Result},
	ring_id::Identifier,
};


/// Network address of a storage node. Both parts are kept as text, the
/// identifier of a node is the hash of "{ip}:{port}".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddress{
	pub ip: String,
	pub port: String,
}

impl NodeAddress{
	pub fn new<I: Into<String>, P: Into<String>>(ip: I, port: P) -> Self{
		NodeAddress{
			ip: ip.into(),
			port: port.into(),
		}
	}

	/// Parse "ip:port". The port is everything after the last colon.
	pub fn parse(addr: &str) -> Option<Self>{
		let (ip, port) = addr.rsplit_once(':')?;
		if ip.is_empty() || port.is_empty() {
			return None;
		}
		Some(NodeAddress::new(ip, port))
	}

	pub fn identifier(&self) -> Identifier{
		Identifier::hash_of(self.to_string())
	}
}

impl fmt::Display for NodeAddress{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.ip, self.port)
	}
}


/// One participating node of the ring.
///
/// A member only knows where it lives and what its identifier is; the ring
/// keeps track of which member comes next. Every remote operation goes
/// through the adaptor to the storage service running at `address`.
pub struct RingMember<ADAPTOR: StorageAdaptor>{
	address: NodeAddress,
	identifier: Identifier,
	adaptor: Arc<ADAPTOR>,
}

impl<ADAPTOR: StorageAdaptor> RingMember<ADAPTOR>{

	/// Creates a member whose identifier is derived from its address.
	pub fn new(address: NodeAddress, adaptor: Arc<ADAPTOR>) -> Self{
		let identifier = address.identifier();
		Self::with_identifier(address, identifier, adaptor)
	}

	/// Creates a member with an explicit identifier instead of the hashed one.
	/// Useful for simulations that need a known ring layout.
	pub fn with_identifier(address: NodeAddress, identifier: Identifier, adaptor: Arc<ADAPTOR>) -> Self{
		RingMember{
			address,
			identifier,
			adaptor,
		}
	}

	pub fn address(&self) -> &NodeAddress{
		&self.address
	}

	pub fn identifier(&self) -> &Identifier{
		&self.identifier
	}

	async fn request(&self, request: StorageRequest) -> Result<Vec<u8>>{
		match self.adaptor.send(&self.address, request).await {
			// a node busy with a transfer answers with nothing, treat it like a dead one
			Ok(body) if body.is_empty() => Err(Error::UnreachableNode(self.address.clone())),
			Ok(body) => Ok(body),
			Err(e) => {
				debug!("request to {} failed: {}", self.address, e);
				Err(Error::UnreachableNode(self.address.clone()))
			},
		}
	}

	/// Liveness probe. True only if the node explicitly answered OK.
	pub async fn check(&self) -> bool{
		match self.request(StorageRequest::Check).await {
			Ok(body) => body == response::OK,
			Err(_) => false,
		}
	}

	#[instrument(skip(self), fields(node = %self.address))]
	pub async fn get(&self, key: &Identifier) -> Result<String>{
		let body = self.request(StorageRequest::Get{ key: key.clone() }).await?;
		if body == response::NO_DATA {
			return Err(Error::NotFound(key.clone()));
		}
		String::from_utf8(body).map_err(|_| Error::InvalidResponse(self.address.clone()))
	}

	#[instrument(skip(self, value), fields(node = %self.address))]
	pub async fn set(&self, key: &Identifier, value: String) -> Result<()>{
		let body = self.request(StorageRequest::Set{ key: key.clone(), value }).await?;
		if body != response::OK {
			return Err(Error::StorageRejected{
				addr: self.address.clone(),
				response: String::from_utf8_lossy(&body).into_owned(),
			});
		}
		Ok(())
	}

	/// Asks this member to push every key it holds to `target`.
	/// The caller is responsible for taking this member out of the ring.
	#[instrument(skip(self), fields(node = %self.address))]
	pub async fn transfer_all(&self, target: &NodeAddress) -> Result<bool>{
		let body = self.request(StorageRequest::Transfer{
			other_node_ip: target.ip.clone(),
			other_node_port: target.port.clone(),
		}).await?;
		if body != response::OK {
			warn!("transfer to {} answered {:?}", target, String::from_utf8_lossy(&body));
		}
		Ok(body == response::OK)
	}

	/// Asks this member to push the keys strictly between `from` and `to` to
	/// `target`, deleting each one locally once it has been pushed.
	#[instrument(skip(self), fields(node = %self.address))]
	pub async fn transfer_range(&self, target: &NodeAddress, from: &Identifier, to: &Identifier) -> Result<bool>{
		let body = self.request(StorageRequest::TransferPart{
			other_node_ip: target.ip.clone(),
			other_node_port: target.port.clone(),
			from_key_id: from.clone(),
			to_key_id: to.clone(),
		}).await?;
		if body != response::OK {
			warn!("partial transfer to {} answered {:?}", target, String::from_utf8_lossy(&body));
		}
		Ok(body == response::OK)
	}
}

impl<ADAPTOR: StorageAdaptor> Clone for RingMember<ADAPTOR>{
	fn clone(&self) -> Self{
		RingMember{
			address: self.address.clone(),
			identifier: self.identifier.clone(),
			adaptor: self.adaptor.clone(),
		}
	}
}

impl<ADAPTOR: StorageAdaptor> fmt::Debug for RingMember<ADAPTOR>{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RingMember")
			.field("address", &self.address)
			.field("identifier", &self.identifier)
			.finish()
	}
}

impl<ADAPTOR: StorageAdaptor> PartialEq for RingMember<ADAPTOR>{
	fn eq(&self, other: &Self) -> bool{
		self.identifier == other.identifier && self.address == other.address
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use std::io;
	use async_trait::async_trait;

	/// Answers every request with the same body.
	struct Canned(&'static [u8]);

	#[async_trait]
	impl StorageAdaptor for Canned{
		async fn send(&self, _to: &NodeAddress, _request: StorageRequest) -> io::Result<Vec<u8>>{
			Ok(self.0.to_vec())
		}
	}

	fn member(body: &'static [u8]) -> RingMember<Canned> {
		RingMember::with_identifier(NodeAddress::new("local", "1"), 1u32.into(), Arc::new(Canned(body)))
	}

	#[test]
	fn parses_addresses() {
		let addr = NodeAddress::parse("127.0.0.1:8000").unwrap();
		assert_eq!(addr, NodeAddress::new("127.0.0.1", "8000"));
		assert_eq!(addr.to_string(), "127.0.0.1:8000");
		assert_eq!(addr.identifier(), Identifier::hash_of("127.0.0.1:8000"));

		assert!(NodeAddress::parse("localhost").is_none());
		assert!(NodeAddress::parse(":8000").is_none());
		assert_eq!(NodeAddress::parse("[::1]:9000").unwrap().ip, "[::1]");
	}

	#[tokio::test]
	async fn write_not_acknowledged_is_rejected() {
		let result = member(b"NOPE").set(&5u32.into(), "\"v\"".to_string()).await;
		match result {
			Err(Error::StorageRejected{ addr, response }) => {
				assert_eq!(addr, NodeAddress::new("local", "1"));
				assert_eq!(response, "NOPE");
			},
			other => panic!("unexpected result: {:?}", other),
		}
		assert!(member(b"FAILURE").set(&5u32.into(), "1".to_string()).await.is_err());
		assert!(member(b"OK").set(&5u32.into(), "1".to_string()).await.is_ok());
	}

	#[tokio::test]
	async fn read_returns_the_exact_value() {
		assert_eq!(member(b"\"caf\xc3\xa9\"").get(&5u32.into()).await.unwrap(), "\"café\"");
		assert!(matches!(member(b"NO DATA").get(&5u32.into()).await, Err(Error::NotFound(_))));
		assert!(matches!(member(b"").get(&5u32.into()).await, Err(Error::UnreachableNode(_))));
		assert!(matches!(member(b"\xff\xfe").get(&5u32.into()).await, Err(Error::InvalidResponse(_))));
	}
}
