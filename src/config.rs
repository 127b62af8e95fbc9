//! JSON configuration for the ring coordinator and for storage nodes.
//!
//! Every field has a default, so an empty object (or no file at all) is a
//! valid configuration.

use std::{path::{Path, PathBuf}, time::Duration};

use serde::{Serialize, Deserialize};
use tokio::fs;

use crate::{error::Result, member::NodeAddress};


pub const DEFAULT_CHANNEL_CAPACITY: usize = 50;
pub const DEFAULT_STORAGE_PORT: u16 = 8000;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig{
	/// Upper bound on every remote call. None waits forever.
	pub rpc_timeout_ms: Option<u64>,
	/// Capacity of the ring processor's request channel.
	pub channel_capacity: usize,
	/// Nodes joined, in order, when the ring starts.
	pub members: Vec<NodeAddress>,
	/// Where ring membership is saved between runs.
	pub state_file: Option<PathBuf>,
	pub log_level: String,
}

impl Default for RingConfig{
	fn default() -> Self{
		RingConfig{
			rpc_timeout_ms: None,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
			members: Vec::new(),
			state_file: None,
			log_level: "info".to_string(),
		}
	}
}

impl RingConfig{
	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self>{
		let data = fs::read_to_string(&path).await?;
		let config = serde_json::from_str(&data)?;
		Ok(config)
	}

	/// Reads the file if one is given, otherwise returns the defaults.
	pub async fn load(path: Option<&Path>) -> Result<Self>{
		match path {
			Some(path) => Self::from_file(path).await,
			None => Ok(Self::default()),
		}
	}

	pub fn rpc_timeout(&self) -> Option<Duration>{
		self.rpc_timeout_ms.map(Duration::from_millis)
	}
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig{
	pub host: String,
	pub port: u16,
	/// Defaults to /tmp/distributed_storage_{port}.json
	pub data_file: Option<PathBuf>,
	/// Only used when this node pushes keys to another during a transfer.
	pub rpc_timeout_ms: Option<u64>,
	pub log_level: String,
}

impl Default for StorageConfig{
	fn default() -> Self{
		StorageConfig{
			host: "127.0.0.1".to_string(),
			port: DEFAULT_STORAGE_PORT,
			data_file: None,
			rpc_timeout_ms: None,
			log_level: "info".to_string(),
		}
	}
}

impl StorageConfig{
	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self>{
		let data = fs::read_to_string(&path).await?;
		let config = serde_json::from_str(&data)?;
		Ok(config)
	}

	pub async fn load(path: Option<&Path>) -> Result<Self>{
		match path {
			Some(path) => Self::from_file(path).await,
			None => Ok(Self::default()),
		}
	}

	pub fn data_file(&self) -> PathBuf{
		match &self.data_file {
			Some(path) => path.clone(),
			None => PathBuf::from(format!("/tmp/distributed_storage_{}.json", self.port)),
		}
	}

	pub fn listen_addr(&self) -> String{
		format!("{}:{}", self.host, self.port)
	}

	pub fn rpc_timeout(&self) -> Option<Duration>{
		self.rpc_timeout_ms.map(Duration::from_millis)
	}
}
