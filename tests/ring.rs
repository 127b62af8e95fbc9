mod common;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
	time::{Duration, Instant},
};

use dht_ring::{Error, Identifier, NodeAddress, RingConfig, RingMember, RingState, TCPAdaptor, TCPClient};


#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Profile {
	name: String,
	visits: u32,
	tags: Vec<String>,
}


#[tokio::test]
async fn members_are_listed_ascending() {
	let nodes = common::make_nodes(5).await;
	let ring = common::ring_of(&nodes).await;

	let members = ring.members().await.unwrap();
	assert_eq!(members.len(), 5);
	for pair in members.windows(2) {
		assert!(pair[0].identifier() < pair[1].identifier());
	}
	for (addr, _) in &nodes {
		let member = members.iter().find(|m| m.address() == addr).expect("every node should have joined");
		assert_eq!(member.identifier(), &Identifier::hash_of(addr.to_string()));
	}
}

#[tokio::test]
async fn set_then_get_round_trips() {
	let nodes = common::make_nodes(4).await;
	let client = TCPClient::new(common::ring_of(&nodes).await);

	client.set("greeting", "hello").await.unwrap();
	client.set("answer", &42u64).await.unwrap();
	client.set("list", &vec![1, 2, 3]).await.unwrap();
	client.set("doc", &json!({"a": [1, 2], "b": null})).await.unwrap();
	let profile = Profile{ name: "ada".into(), visits: 3, tags: vec!["x".into()] };
	client.set("profile", &profile).await.unwrap();

	assert_eq!(client.get::<String>("greeting").await.unwrap(), "hello");
	assert_eq!(client.get::<u64>("answer").await.unwrap(), 42);
	assert_eq!(client.get::<Vec<i32>>("list").await.unwrap(), vec![1, 2, 3]);
	assert_eq!(client.get::<serde_json::Value>("doc").await.unwrap(), json!({"a": [1, 2], "b": null}));
	assert_eq!(client.get::<Profile>("profile").await.unwrap(), profile);

	// overwrite
	client.set("greeting", "bye").await.unwrap();
	assert_eq!(client.get::<String>("greeting").await.unwrap(), "bye");
	assert_eq!(common::stored_keys(&nodes).await, 5);
}

#[tokio::test]
async fn missing_key_is_not_found() {
	let nodes = common::make_nodes(2).await;
	let client = TCPClient::new(common::ring_of(&nodes).await);

	let result = client.get::<String>("nothing here").await;
	assert!(matches!(result, Err(Error::NotFound(id)) if id == Identifier::hash_of("nothing here")));
}

#[tokio::test]
async fn keys_are_stored_on_their_owner() {
	let nodes = common::make_nodes(3).await;
	let client = TCPClient::new(common::ring_of(&nodes).await);

	for i in 0..30 {
		client.set(&format!("key {}", i), &i).await.unwrap();
	}
	for i in 0..30 {
		let id = Identifier::hash_of(format!("key {}", i));
		let owner = client.ring().locate(&id).await.unwrap();
		let (_, service) = nodes.iter().find(|(addr, _)| addr == owner.address()).unwrap();
		assert!(service.keys().await.contains(&id), "key {} missing from its owner", i);
	}
}

#[tokio::test]
async fn keys_survive_joins_and_leaves() {
	let nodes = common::make_nodes(6).await;
	let client = TCPClient::new(common::ring_of(&nodes[..2]).await);
	let ring = client.ring();

	for i in 0..40 {
		client.set(&format!("key {}", i), &format!("value {}", i)).await.unwrap();
	}

	for (addr, _) in &nodes[2..] {
		ring.join_address(addr.clone()).await.unwrap();
		for i in 0..40 {
			assert_eq!(client.get::<String>(&format!("key {}", i)).await.unwrap(), format!("value {}", i));
		}
	}
	// partial transfers move keys instead of copying them
	assert_eq!(common::stored_keys(&nodes).await, 40);

	for (addr, _) in &nodes[..4] {
		ring.leave_address(addr.clone()).await.unwrap();
		for i in 0..40 {
			assert_eq!(client.get::<String>(&format!("key {}", i)).await.unwrap(), format!("value {}", i));
		}
	}
	assert_eq!(ring.members().await.unwrap().len(), 2);
	assert_eq!(common::stored_keys(&nodes[4..]).await, 40);
}

#[tokio::test]
async fn leaving_pair_hands_everything_over() {
	let nodes = common::make_nodes(2).await;
	let client = TCPClient::new(common::ring_of(&nodes).await);
	for i in 0..10 {
		client.set(&format!("key {}", i), &i).await.unwrap();
	}

	client.ring().leave_address(nodes[0].0.clone()).await.unwrap();

	let members = client.ring().members().await.unwrap();
	assert_eq!(members.len(), 1);
	assert_eq!(members[0].address(), &nodes[1].0);
	assert_eq!(nodes[1].1.len().await, 10);
	// the retired node stops answering
	assert!(!nodes[0].1.is_available());
	for i in 0..10 {
		assert_eq!(client.get::<i32>(&format!("key {}", i)).await.unwrap(), i);
	}
}

#[tokio::test]
async fn last_member_leaving_empties_the_ring() {
	let nodes = common::make_nodes(1).await;
	let client = TCPClient::new(common::ring_of(&nodes).await);
	client.set("k", "v").await.unwrap();

	client.ring().leave_address(nodes[0].0.clone()).await.unwrap();

	assert!(client.ring().members().await.unwrap().is_empty());
	assert!(matches!(client.set("k", "v").await, Err(Error::EmptyRing)));
	assert!(matches!(client.get::<String>("k").await, Err(Error::EmptyRing)));
}

#[tokio::test]
async fn unreachable_node_cannot_join() {
	let ring = common::start_ring();
	let dead = common::dead_address().await;

	let result = ring.join_address(dead.clone()).await;
	assert!(matches!(result, Err(Error::UnreachableNode(addr)) if addr == dead));
	assert!(ring.members().await.unwrap().is_empty());
}

#[tokio::test]
async fn unavailable_owner_is_unreachable() {
	let nodes = common::make_nodes(1).await;
	let client = TCPClient::new(common::ring_of(&nodes).await);
	nodes[0].1.set_available(false);

	assert!(matches!(client.get::<String>("k").await, Err(Error::UnreachableNode(_))));
	assert!(matches!(client.set("k", "v").await, Err(Error::UnreachableNode(_))));
}

#[tokio::test]
async fn membership_is_restored_from_a_state_file() {
	let nodes = common::make_nodes(3).await;
	let ring = common::ring_of(&nodes).await;
	let client = TCPClient::new(ring.clone());
	client.set("kept", "across restarts").await.unwrap();

	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("ring.json");
	ring.save_state(&path).await.unwrap();

	let saved = RingState::from_file(&path).await.unwrap();
	assert_eq!(saved.members.len(), 3);

	let restored = common::start_ring();
	restored.restore_from_file(&path).await.unwrap();
	let before: Vec<_> = ring.members().await.unwrap().iter().map(|m| m.address().clone()).collect();
	let after: Vec<_> = restored.members().await.unwrap().iter().map(|m| m.address().clone()).collect();
	assert_eq!(before, after);

	let client = TCPClient::new(restored);
	assert_eq!(client.get::<String>("kept").await.unwrap(), "across restarts");
}

#[tokio::test]
async fn configured_ring_joins_its_members() {
	let nodes = common::make_nodes(3).await;
	let dir = tempfile::tempdir().unwrap();
	let config = RingConfig{
		rpc_timeout_ms: Some(5000),
		members: nodes.iter().map(|(addr, _)| addr.clone()).collect(),
		state_file: Some(dir.path().join("ring.json")),
		..RingConfig::default()
	};

	let ring = dht_ring::start_tcp_ring(&config).await.unwrap();
	assert_eq!(ring.members().await.unwrap().len(), 3);
	ring.save_state(dir.path().join("ring.json")).await.unwrap();

	// a second start finds them in the state file and joins nobody twice
	let ring = dht_ring::start_tcp_ring(&config).await.unwrap();
	assert_eq!(ring.members().await.unwrap().len(), 3);
}

#[tokio::test]
async fn silent_node_times_out_as_unreachable() {
	// accepts connections and never answers
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let local = listener.local_addr().unwrap();
	tokio::spawn(async move{
		let mut held = Vec::new();
		while let Ok((stream, _)) = listener.accept().await {
			held.push(stream);
		}
	});

	let addr = NodeAddress::new(local.ip().to_string(), local.port().to_string());
	let adaptor = Arc::new(TCPAdaptor::new(Some(Duration::from_millis(200))));
	let member = RingMember::new(addr.clone(), adaptor);

	let started = Instant::now();
	let result = member.get(&Identifier::hash_of("k")).await;
	assert!(matches!(result, Err(Error::UnreachableNode(a)) if a == addr));
	assert!(started.elapsed() < Duration::from_secs(5));
	assert!(!member.check().await);
}

async fn raw_exchange(addr: &NodeAddress, request: &[u8]) -> Vec<u8> {
	let mut stream = TcpStream::connect(addr.to_string()).await.unwrap();
	stream.write_all(request).await.unwrap();
	stream.shutdown().await.unwrap();
	let mut body = Vec::new();
	// a reset after the body still leaves the body in the buffer
	let _ = stream.read_to_end(&mut body).await;
	body
}

#[tokio::test]
async fn undecodable_requests_get_unknown_command() {
	let nodes = common::make_nodes(1).await;
	let addr = &nodes[0].0;

	assert_eq!(raw_exchange(addr, br#"{"cmd":"bogus"}"#).await, b"UNKNOWN COMMAND");
	assert_eq!(raw_exchange(addr, b"this is not json\n").await, b"UNKNOWN COMMAND");
	assert_eq!(raw_exchange(addr, br#"{"cmd":"get","key":""}"#).await, b"UNKNOWN COMMAND");
	assert_eq!(raw_exchange(addr, br#"{"cmd":"set","key":"7","value":""}"#).await, b"UNKNOWN COMMAND");

	// the node keeps serving afterwards
	assert_eq!(raw_exchange(addr, br#"{"cmd":"check"}"#).await, b"OK");
	assert_eq!(nodes[0].1.len().await, 0);
}
