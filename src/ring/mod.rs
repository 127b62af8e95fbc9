use crate::{
	adaptor::StorageAdaptor,
	config::{RingConfig, DEFAULT_CHANNEL_CAPACITY},
	error::{Error, Result},
	member::{NodeAddress, RingMember},
	ring_id::{self, Identifier},
};

use std::{
	collections::{BTreeMap, HashMap},
	path::Path,
	sync::Arc,
};

use num_bigint::BigUint;
use tokio::sync::{mpsc::{channel, Sender}, oneshot};
use tracing::{debug, info, instrument};


pub(crate) mod message;
use message::RingRequest;

mod membership;

mod state;
pub use state::RingState;



/// The ordered collection of all members plus the `next` relation between them.
///
/// Members are kept ascending by identifier. `next` maps every member to the
/// member after it, the highest one wrapping around to the lowest. A ring of
/// a single member has no `next` at all.
///
/// The ring is not shared: `start` moves it onto its own task and hands out a
/// RingHandle, so joins and leaves are applied one at a time and lookups never
/// observe a half-applied change.
pub struct Ring<ADAPTOR: StorageAdaptor>{
	members: BTreeMap<Identifier, RingMember<ADAPTOR>>,
	next: HashMap<Identifier, Identifier>,
	adaptor: Arc<ADAPTOR>,
	channel_capacity: usize,
}

impl<ADAPTOR: StorageAdaptor> Ring<ADAPTOR>{

	pub fn new(adaptor: Arc<ADAPTOR>) -> Self{
		Ring{
			members: BTreeMap::new(),
			next: HashMap::new(),
			adaptor,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
		}
	}

	pub fn with_config(adaptor: Arc<ADAPTOR>, config: &RingConfig) -> Self{
		let mut ring = Self::new(adaptor);
		ring.channel_capacity = config.channel_capacity.max(1);
		ring
	}

	pub fn len(&self) -> usize{
		self.members.len()
	}

	pub fn is_empty(&self) -> bool{
		self.members.is_empty()
	}

	pub fn contains(&self, id: &Identifier) -> bool{
		self.members.contains_key(id)
	}

	/// All members, ascending by identifier.
	pub fn members(&self) -> Vec<RingMember<ADAPTOR>>{
		self.members.values().cloned().collect()
	}

	pub fn member(&self, id: &Identifier) -> Option<&RingMember<ADAPTOR>>{
		self.members.get(id)
	}

	/// The member with the lowest identifier.
	pub fn first(&self) -> Option<&RingMember<ADAPTOR>>{
		self.members.values().next()
	}

	/// The member with the highest identifier.
	pub fn last(&self) -> Option<&RingMember<ADAPTOR>>{
		self.members.values().next_back()
	}

	/// The member `id` links to, if any.
	pub fn successor_of(&self, id: &Identifier) -> Option<&RingMember<ADAPTOR>>{
		self.next.get(id).and_then(|next| self.members.get(next))
	}

	/// Addresses of all members, ascending by identifier.
	pub fn state(&self) -> RingState{
		RingState{
			members: self.members.values().map(|m| m.address().clone()).collect(),
		}
	}

	/// Clockwise distance measured against the current highest member.
	pub fn distance(&self, a: &Identifier, b: &Identifier) -> BigUint{
		match self.members.keys().next_back() {
			Some(highest) => ring_id::distance(a, b, highest),
			None => ring_id::distance(a, b, &Identifier::zero()),
		}
	}

	/// Walks the ring from `start` until moving on would not get any closer to `key`.
	///
	/// A member owns every key from its own identifier up to the next member;
	/// the highest member also owns the keys below the lowest one. The walk is
	/// linear in the number of members.
	pub fn locate_from(&self, start: &Identifier, key: &Identifier) -> Result<RingMember<ADAPTOR>>{
		if self.members.is_empty() {
			return Err(Error::EmptyRing);
		}
		let mut current = self.members.get(start).ok_or_else(|| Error::UnknownMember(start.clone()))?;
		while self.members.len() > 1 {
			let next = match self.successor_of(current.identifier()) {
				Some(next) => next,
				None => break,
			};
			if self.distance(current.identifier(), key) > self.distance(next.identifier(), key) {
				current = next;
			} else {
				break;
			}
		}
		Ok(current.clone())
	}

	/// Locates the member responsible for `key`, starting at the lowest member.
	pub fn locate(&self, key: &Identifier) -> Result<RingMember<ADAPTOR>>{
		let start = self.members.keys().next().ok_or(Error::EmptyRing)?;
		self.locate_from(start, key)
	}

	fn link(&mut self, from: &Identifier, to: &Identifier){
		self.next.insert(from.clone(), to.clone());
	}

	/// Rebuild `next` from the ascending order.
	fn relink(&mut self){
		self.next.clear();
		if self.members.len() < 2 {
			return;
		}
		let ids: Vec<Identifier> = self.members.keys().cloned().collect();
		for pair in ids.windows(2) {
			self.link(&pair[0], &pair[1]);
		}
		if let (Some(last), Some(first)) = (ids.last(), ids.first()) {
			self.link(last, first);
		}
	}

	/// Moves the ring onto its own task. Requests are processed one at a time
	/// until every handle has been dropped.
	pub fn start(mut self) -> RingHandle<ADAPTOR>{
		let (channel_tx, mut channel_rx) = channel(self.channel_capacity);
		let handle = RingHandle{
			to: channel_tx,
			adaptor: self.adaptor.clone(),
		};

		tokio::spawn(async move{
			while let Some(request) = channel_rx.recv().await{
				debug!("Processing request: {:?}", request);
				self.process(request).await;
			}
			info!("ring processor terminating");
		});

		handle
	}

	async fn process(&mut self, request: RingRequest<ADAPTOR>){
		// the caller may have given up waiting, a failed reply is not an error
		match request{
			RingRequest::Join { member, reply } => {
				let _ = reply.send(self.join(member).await);
			},
			RingRequest::Leave { identifier, reply } => {
				let _ = reply.send(self.leave(&identifier).await);
			},
			RingRequest::Locate { start, key, reply } => {
				let result = match start {
					Some(start) => self.locate_from(&start, &key),
					None => self.locate(&key),
				};
				let _ = reply.send(result);
			},
			RingRequest::Members { reply } => {
				let _ = reply.send(self.members());
			},
			RingRequest::Restore { members, reply } => {
				let _ = reply.send(self.restore(members).await);
			},
		}
	}
}


/// A RingHandle represents a connection to a started Ring.
pub struct RingHandle<ADAPTOR: StorageAdaptor>{
	to: Sender<RingRequest<ADAPTOR>>,
	adaptor: Arc<ADAPTOR>,
}

impl<ADAPTOR: StorageAdaptor> Clone for RingHandle<ADAPTOR>{
	fn clone(&self) -> Self{
		RingHandle{
			to: self.to.clone(),
			adaptor: self.adaptor.clone(),
		}
	}
}

impl<ADAPTOR: StorageAdaptor> RingHandle<ADAPTOR>{

	async fn call<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> RingRequest<ADAPTOR>) -> Result<T>{
		let (reply, response) = oneshot::channel();
		self.to.send(request(reply)).await.map_err(|_| Error::ProcessorStopped)?;
		response.await.map_err(|_| Error::ProcessorStopped)
	}

	/// A member for the node at `address`, talking through this ring's adaptor.
	pub fn member(&self, address: NodeAddress) -> RingMember<ADAPTOR>{
		RingMember::new(address, self.adaptor.clone())
	}

	#[instrument(skip(self))]
	pub async fn join(&self, member: RingMember<ADAPTOR>) -> Result<()>{
		self.call(|reply| RingRequest::Join{ member, reply }).await?
	}

	pub async fn join_address(&self, address: NodeAddress) -> Result<()>{
		self.join(self.member(address)).await
	}

	#[instrument(skip(self))]
	pub async fn leave(&self, member: &RingMember<ADAPTOR>) -> Result<()>{
		let identifier = member.identifier().clone();
		self.call(|reply| RingRequest::Leave{ identifier, reply }).await?
	}

	pub async fn leave_address(&self, address: NodeAddress) -> Result<()>{
		self.leave(&self.member(address)).await
	}

	/// The member currently responsible for `key`.
	pub async fn locate(&self, key: &Identifier) -> Result<RingMember<ADAPTOR>>{
		let key = key.clone();
		self.call(|reply| RingRequest::Locate{ start: None, key, reply }).await?
	}

	pub async fn locate_from(&self, start: &RingMember<ADAPTOR>, key: &Identifier) -> Result<RingMember<ADAPTOR>>{
		let start = Some(start.identifier().clone());
		let key = key.clone();
		self.call(|reply| RingRequest::Locate{ start, key, reply }).await?
	}

	/// Members ascending by identifier.
	pub async fn members(&self) -> Result<Vec<RingMember<ADAPTOR>>>{
		self.call(|reply| RingRequest::Members{ reply }).await
	}

	/// Re-admits saved members without moving any data.
	pub async fn restore(&self, state: RingState) -> Result<()>{
		let members = state.members;
		self.call(|reply| RingRequest::Restore{ members, reply }).await?
	}

	pub async fn restore_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()>{
		let state = RingState::load_or_default(path).await?;
		self.restore(state).await
	}

	pub async fn save_state<P: AsRef<Path>>(&self, path: P) -> Result<()>{
		let state = RingState{
			members: self.members().await?.iter().map(|m| m.address().clone()).collect(),
		};
		state.save(path).await
	}
}
