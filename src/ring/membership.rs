use std::ops::Bound::{Excluded, Unbounded};

use tracing::{error, info, instrument, warn};

use crate::{
	adaptor::StorageAdaptor,
	error::{Error, Result},
	member::{NodeAddress, RingMember},
	ring_id::Identifier,
};

use super::Ring;


impl<ADAPTOR: StorageAdaptor> Ring<ADAPTOR>{

	/// Adds a member to the ring and moves the keys it now owns over to it.
	///
	/// The member must answer a check before it is admitted. Once admitted it
	/// stays in the ring even if moving the keys fails; that failure is
	/// reported as `MigrationFailed`.
	///
	/// Example of how keys get stolen, each member owning the keys from its
	/// own identifier up to the next member:
	///
	/// ```text
	/// member 1 > 2 3 4 5 6 7
	/// member 8 > 8 9 10
	///
	/// member 4 joins and takes (4, max) from member 1
	///
	/// member 1 > 2 3
	/// member 4 > 4 5 6 7
	/// member 8 > 8 9 10
	/// ```
	#[instrument(skip(self), fields(member = %member.address()))]
	pub async fn join(&mut self, member: RingMember<ADAPTOR>) -> Result<()>{
		if !member.check().await {
			warn!("member {} isn't responding", member.address());
			return Err(Error::UnreachableNode(member.address().clone()));
		}
		let id = member.identifier().clone();
		if self.members.contains_key(&id) {
			return Err(Error::DuplicateMember(id));
		}

		match self.members.len() {
			0 => {
				info!("{} starts the ring", member.address());
				self.members.insert(id, member);
				Ok(())
			},
			1 => {
				let first = match self.first() {
					Some(first) => first.clone(),
					None => return Err(Error::EmptyRing),
				};
				self.link(first.identifier(), &id);
				self.link(&id, first.identifier());
				self.members.insert(id.clone(), member.clone());

				if id < *first.identifier() {
					// insert first
					self.steal(&first, &member, &id, first.identifier()).await
				} else {
					// insert last, the new member also takes over the wraparound below `first`
					self.steal(&first, &member, &id, &Identifier::space_maximum()).await?;
					self.steal(&first, &member, &Identifier::zero(), first.identifier()).await
				}
			},
			_ => {
				let (first, last) = match (self.first(), self.last()) {
					(Some(first), Some(last)) => (first.clone(), last.clone()),
					_ => return Err(Error::EmptyRing),
				};
				let predecessor = self.members.range((Unbounded, Excluded(id.clone()))).next_back().map(|(_, m)| m.clone());
				let successor = self.members.range((Excluded(id.clone()), Unbounded)).next().map(|(_, m)| m.clone());

				match (predecessor, successor) {
					(None, _) => {
						// new lowest member, the keys just below the old lowest sit on the highest one
						self.link(last.identifier(), &id);
						self.link(&id, first.identifier());
						self.members.insert(id.clone(), member.clone());
						self.steal(&last, &member, &id, first.identifier()).await
					},
					(Some(predecessor), Some(successor)) => {
						self.link(predecessor.identifier(), &id);
						self.link(&id, successor.identifier());
						self.members.insert(id.clone(), member.clone());
						self.steal(&predecessor, &member, &id, &Identifier::space_maximum()).await
					},
					(Some(predecessor), None) => {
						// new highest member
						self.link(predecessor.identifier(), &id);
						self.link(&id, first.identifier());
						self.members.insert(id.clone(), member.clone());
						self.steal(&predecessor, &member, &id, &Identifier::space_maximum()).await?;
						self.steal(&predecessor, &member, &Identifier::zero(), first.identifier()).await
					},
				}
			},
		}
	}

	/// Removes a member from the ring and hands its keys to the member that
	/// takes over its range.
	///
	/// The ring is updated before any data moves, so a failed transfer leaves
	/// the member removed and is reported as `MigrationFailed`. When the last
	/// member leaves there is nowhere to send its data and it is dropped.
	#[instrument(skip(self))]
	pub async fn leave(&mut self, identifier: &Identifier) -> Result<()>{
		let member = match self.members.get(identifier) {
			Some(member) => member.clone(),
			None => return Err(Error::UnknownMember(identifier.clone())),
		};

		match self.members.len() {
			1 => {
				self.members.remove(identifier);
				self.next.clear();
				warn!("last member {} left the ring, its data is not transferred", member.address());
				Ok(())
			},
			2 => {
				self.members.remove(identifier);
				self.next.clear();
				let remaining = match self.first() {
					Some(remaining) => remaining.clone(),
					None => return Err(Error::EmptyRing),
				};
				self.hand_over(&member, &remaining).await
			},
			_ => {
				// the ring predecessor: next one down, or the highest member when leaving the lowest
				let predecessor = self.members.range((Unbounded, Excluded(identifier.clone()))).next_back()
					.or_else(|| self.members.iter().next_back())
					.map(|(_, m)| m.clone());
				let successor = self.successor_of(identifier).cloned();

				let (predecessor, successor) = match (predecessor, successor) {
					(Some(predecessor), Some(successor)) => (predecessor, successor),
					_ => return Err(Error::UnknownMember(identifier.clone())),
				};

				self.link(predecessor.identifier(), successor.identifier());
				self.next.remove(identifier);
				self.members.remove(identifier);
				self.hand_over(&member, &predecessor).await
			},
		}
	}

	/// Admits saved members again without moving any data.
	/// Every member has to answer a check, otherwise nothing is admitted.
	#[instrument(skip_all)]
	pub async fn restore(&mut self, addresses: Vec<NodeAddress>) -> Result<()>{
		let mut admitted = Vec::with_capacity(addresses.len());
		for address in addresses {
			let member = RingMember::new(address, self.adaptor.clone());
			if !member.check().await {
				warn!("saved member {} isn't responding", member.address());
				return Err(Error::UnreachableNode(member.address().clone()));
			}
			admitted.push(member);
		}

		for member in admitted {
			self.members.entry(member.identifier().clone()).or_insert(member);
		}
		self.relink();
		info!("restored ring with {} members", self.members.len());
		Ok(())
	}

	async fn steal(&self, donor: &RingMember<ADAPTOR>, recipient: &RingMember<ADAPTOR>, from: &Identifier, to: &Identifier) -> Result<()>{
		info!("{} steals ({}, {}) from {}", recipient.address(), from, to, donor.address());
		let failed = || Error::MigrationFailed{
			from: donor.address().clone(),
			to: recipient.address().clone(),
		};
		match donor.transfer_range(recipient.address(), from, to).await {
			Ok(true) => Ok(()),
			Ok(false) => {
				error!("{} refused to hand ({}, {}) to {}", donor.address(), from, to, recipient.address());
				Err(failed())
			},
			Err(e) => {
				error!("range transfer from {} failed: {}", donor.address(), e);
				Err(failed())
			},
		}
	}

	async fn hand_over(&self, member: &RingMember<ADAPTOR>, target: &RingMember<ADAPTOR>) -> Result<()>{
		info!("{} hands its data to {}", member.address(), target.address());
		let failed = || Error::MigrationFailed{
			from: member.address().clone(),
			to: target.address().clone(),
		};
		match member.transfer_all(target.address()).await {
			Ok(true) => Ok(()),
			Ok(false) => {
				error!("{} refused to hand its data to {}", member.address(), target.address());
				Err(failed())
			},
			Err(e) => {
				error!("transfer from {} failed: {}", member.address(), e);
				Err(failed())
			},
		}
	}
}
