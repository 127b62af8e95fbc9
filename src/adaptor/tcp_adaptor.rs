use std::{io::{self, ErrorKind}, time::Duration};

use super::{StorageAdaptor, StorageRequest};
use crate::member::NodeAddress;

use async_trait::async_trait;
use serde_json::{Deserializer, error::Category};
use tokio::{net::TcpStream, io::{AsyncWriteExt, AsyncReadExt}, time::timeout};
use tracing::{debug, trace};

/// An implementation of StorageAdaptor that opens one TCP connection per request.
///
/// The request is written as JSON, the node answers with the raw body and
/// closes the connection. With a timeout set, a request that does not finish
/// in time fails with `ErrorKind::TimedOut`.
#[derive(Debug, Clone, Default)]
pub struct TCPAdaptor{
	timeout: Option<Duration>,
}

impl TCPAdaptor{
	pub fn new(timeout: Option<Duration>) -> Self{
		Self{
			timeout,
		}
	}

	async fn exchange(addr: String, request: StorageRequest) -> io::Result<Vec<u8>>{
		let conn = TcpStream::connect(&addr).await?;
		let mut stream = RequestStream::new(conn);
		stream.write_request(&request).await?;
		let body = stream.read_response().await?;
		trace!("{} answered {} bytes", addr, body.len());
		Ok(body)
	}
}

#[async_trait]
impl StorageAdaptor for TCPAdaptor{
	async fn send(&self, to: &NodeAddress, request: StorageRequest) -> io::Result<Vec<u8>>{
		let exchange = Self::exchange(to.to_string(), request);
		match self.timeout {
			Some(limit) => {
				match timeout(limit, exchange).await {
					Ok(result) => result,
					Err(_) => {
						debug!("request to {} timed out after {:?}", to, limit);
						Err(io::Error::from(ErrorKind::TimedOut))
					},
				}
			},
			None => exchange.await,
		}
	}
}


/// Framing for one request/response exchange over a TCP stream.
pub(crate) struct RequestStream{
	stream: TcpStream,
	buffer: Vec<u8>,
}

impl RequestStream{
	pub fn new(stream: TcpStream) -> Self{
		Self{
			stream,
			buffer: Vec::new(),
		}
	}

	/// Reads bytes until one complete request can be decoded.
	/// A request that is not valid JSON or names no known command is `InvalidData`.
	pub async fn read_request(&mut self) -> io::Result<StorageRequest>{
		loop{
			// attempt to deserialize buffer
			let parsed = {
				let mut deserializer = Deserializer::from_slice(self.buffer.as_slice()).into_iter::<StorageRequest>();
				match deserializer.next() {
					Some(Ok(request)) => Some(Ok((request, deserializer.byte_offset()))),
					// if we have encountered an EOF, more information may arrive later
					Some(Err(ref e)) if e.classify() == Category::Eof => None,
					Some(Err(e)) => Some(Err(e)),
					None => None,
				}
			};

			match parsed {
				Some(Ok((request, offset))) => {
					self.buffer.drain(..offset);
					return Ok(request);
				},
				Some(Err(e)) => return Err(io::Error::new(ErrorKind::InvalidData, e)),
				None => {},
			}

			// else, read bytes into buffer
			let mut tmp_buf = vec![0; 1024];
			match self.stream.read(&mut tmp_buf).await {
				Ok(0) => {
					return Err(io::Error::from(ErrorKind::UnexpectedEof)); // No more data
				},
				Ok(len) => { // Append data to buffer
					self.buffer.extend_from_slice(&tmp_buf[..len]);
				},
				Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
					continue; // try to read again
				},
				Err(e) => return Err(e),
			}
		}
	}

	pub async fn write_request(&mut self, request: &StorageRequest) -> io::Result<()>{
		let raw_data = serde_json::to_vec(request)?;
		self.stream.write_all(&raw_data).await?;
		self.stream.flush().await
	}

	/// Reads the whole response body; the node closes the connection after writing it.
	pub async fn read_response(&mut self) -> io::Result<Vec<u8>>{
		let mut body = Vec::new();
		self.stream.read_to_end(&mut body).await?;
		Ok(body)
	}

	pub async fn write_response(&mut self, body: &[u8]) -> io::Result<()>{
		self.stream.write_all(body).await?;
		self.stream.shutdown().await
	}

	pub fn peer_address(&self) -> Option<String>{
		match self.stream.peer_addr() {
			Ok(addr) => Some(addr.to_string()),
			Err(_) => None,
		}
	}
}
