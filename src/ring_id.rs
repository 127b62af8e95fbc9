use std::fmt;

use num_bigint::{BigUint, RandBigInt};
use sha1::{Digest, Sha1};

use serde::{
	ser::{Serialize, Serializer},
	de::{Deserialize, Deserializer, Visitor},
};


/// Width of the identifier space in bits. Identifiers live in [0, 2^BITS).
pub const BITS: u32 = 160;

/// An Identifier is a point around the ring. Nodes get theirs from the hash
/// of "{ip}:{port}", keys from the hash of the key itself.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Identifier{
	id: BigUint,
}

impl Identifier{
	/// Hash arbitrary bytes into the identifier space.
	pub fn hash_of<D: AsRef<[u8]>>(data: D) -> Identifier{
		let digest = Sha1::digest(data.as_ref());
		Identifier{
			id: BigUint::from_bytes_be(digest.as_slice())
		}
	}

	/// Parse a decimal identifier. Returns None if the text is not a number.
	pub fn parse(data: &str) -> Option<Identifier>{
		let id = BigUint::parse_bytes(data.as_bytes(), 10)?;
		Some(Identifier{id})
	}

	pub fn zero() -> Identifier{
		Identifier{id: BigUint::from(0u32)}
	}

	/// 2^BITS. Not a valid identifier itself, only used as an exclusive upper bound.
	pub fn space_maximum() -> Identifier{
		Identifier{id: BigUint::from(2u32).pow(BITS)}
	}

	pub fn rand() -> Identifier{
		let mut rng = rand::thread_rng();
		let id = rng.gen_biguint_below(&Identifier::space_maximum().id);
		Identifier{id}
	}

	/// Tests if self is in the open range (lower, upper). No wraparound.
	pub fn is_strictly_between(&self, lower: &Identifier, upper: &Identifier) -> bool {
		self > lower && self < upper
	}
}

/// Clockwise distance walking from `a` to `b`.
///
/// Walking past the end of the ring adds `highest`, the identifier of the
/// current highest member, instead of 2^BITS. Ownership near the wraparound
/// point therefore shifts whenever the highest member changes.
pub fn distance(a: &Identifier, b: &Identifier, highest: &Identifier) -> BigUint {
	if a == b {
		BigUint::from(0u32)
	} else if a < b {
		&b.id - &a.id
	} else {
		let above = &highest.id + &b.id;
		if above >= a.id {
			above - &a.id
		} else {
			// a lies above the highest member, which a ring walk never produces
			BigUint::from(0u32)
		}
	}
}

impl From<u32> for Identifier{
	fn from(arg: u32) -> Identifier{
		Identifier{id: BigUint::from(arg)}
	}
}

impl From<BigUint> for Identifier{
	fn from(id: BigUint) -> Identifier{
		Identifier{id}
	}
}

impl fmt::Display for Identifier{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.id)
	}
}

impl fmt::Debug for Identifier{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Identifier({})", self.id)
	}
}

impl Serialize for Identifier {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.id.to_str_radix(10))
	}
}


struct IdentifierVisitor;

impl<'de> Visitor<'de> for IdentifierVisitor {
	type Value = Identifier;

	fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
		formatter.write_str("an identifier as a decimal string")
	}

	fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
		where
			E: serde::de::Error
		{
			Identifier::parse(value).ok_or_else(|| E::custom(format!("invalid identifier: {:?}", value)))
		}
}

impl<'de> Deserialize<'de> for Identifier {
	fn deserialize<D>(deserializer: D) -> Result<Identifier, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_str(IdentifierVisitor)
	}
}
