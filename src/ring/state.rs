use std::path::Path;

use serde::{Serialize, Deserialize};
use tokio::fs;

use crate::{error::Result, member::NodeAddress};


/// Ring membership as saved between runs: the member addresses, ascending by identifier.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingState{
	pub members: Vec<NodeAddress>,
}


impl RingState {
	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self>{
		let state = fs::read_to_string(&path).await?;
		let ring_state = serde_json::from_str(&state)?;
		Ok(ring_state)
	}

	/// Like from_file, but a missing file is an empty ring.
	pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self>{
		if fs::try_exists(&path).await? {
			Self::from_file(path).await
		} else {
			Ok(Self::default())
		}
	}

	pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>{
		let s = serde_json::to_string_pretty(self)?;
		fs::write(path, s).await?;
		Ok(())
	}
}
