use std::{
	collections::BTreeMap,
	ops::Bound::Excluded,
	path::{Path, PathBuf},
};

use serde::{Serialize, Deserialize};
use tokio::fs;
use tracing::debug;

use crate::{error::Result, ring_id::Identifier};


#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot{
	entries: Vec<(Identifier, String)>,
}

/// Ordered key/value map of one storage node.
///
/// When opened from a file every mutation rewrites the file with a snapshot of
/// the whole map.
#[derive(Debug, Default)]
pub struct KeyValueStore{
	entries: BTreeMap<Identifier, String>,
	path: Option<PathBuf>,
}

impl KeyValueStore{
	pub fn in_memory() -> Self{
		Self::default()
	}

	/// Opens the store persisted at `path`, starting empty if the file does not exist yet.
	pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self>{
		let path = path.as_ref().to_path_buf();
		let entries = if fs::try_exists(&path).await? {
			let data = fs::read_to_string(&path).await?;
			let snapshot: Snapshot = serde_json::from_str(&data)?;
			snapshot.entries.into_iter().collect()
		} else {
			BTreeMap::new()
		};
		debug!("opened {} with {} keys", path.display(), entries.len());
		Ok(KeyValueStore{
			entries,
			path: Some(path),
		})
	}

	pub fn get(&self, key: &Identifier) -> Option<&String>{
		self.entries.get(key)
	}

	pub async fn put(&mut self, key: Identifier, value: String) -> Result<()>{
		self.entries.insert(key, value);
		self.save().await
	}

	pub async fn delete(&mut self, key: &Identifier) -> Result<()>{
		if self.entries.remove(key).is_some() {
			self.save().await?;
		}
		Ok(())
	}

	/// Entries with keys strictly between `from` and `to`.
	pub fn range(&self, from: &Identifier, to: &Identifier) -> Vec<(Identifier, String)>{
		if from >= to {
			return Vec::new();
		}
		self.entries.range((Excluded(from), Excluded(to)))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	pub fn entries(&self) -> Vec<(Identifier, String)>{
		self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	pub fn keys(&self) -> Vec<Identifier>{
		self.entries.keys().cloned().collect()
	}

	pub fn len(&self) -> usize{
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool{
		self.entries.is_empty()
	}

	async fn save(&self) -> Result<()>{
		if let Some(path) = &self.path {
			let snapshot = Snapshot{ entries: self.entries() };
			let s = serde_json::to_string(&snapshot)?;
			fs::write(path, s).await?;
		}
		Ok(())
	}
}
