use std::{io::{self, ErrorKind}, net::SocketAddr, sync::Arc};

use tokio::{net::{TcpListener, TcpStream, ToSocketAddrs}, task::JoinHandle};
use tracing::{debug, error, info};

use super::StorageService;
use crate::adaptor::{StorageAdaptor, response, tcp_adaptor::RequestStream};

/// Serves a StorageService over TCP, one request per connection.
pub struct StorageServer<ADAPTOR: StorageAdaptor>{
	listener: TcpListener,
	service: Arc<StorageService<ADAPTOR>>,
}

impl<ADAPTOR: StorageAdaptor> StorageServer<ADAPTOR>{
	pub async fn bind<A: ToSocketAddrs>(addr: A, service: Arc<StorageService<ADAPTOR>>) -> io::Result<Self>{
		let listener = TcpListener::bind(addr).await?;
		Ok(StorageServer{
			listener,
			service,
		})
	}

	pub fn local_addr(&self) -> io::Result<SocketAddr>{
		self.listener.local_addr()
	}

	pub fn service(&self) -> Arc<StorageService<ADAPTOR>>{
		self.service.clone()
	}

	/// Runs the accept loop on its own task.
	pub fn spawn(self) -> JoinHandle<()>{
		tokio::spawn(self.serve())
	}

	pub async fn serve(self){
		if let Ok(addr) = self.listener.local_addr() {
			info!("Serving storage on {}", addr);
		}
		loop{
			match self.listener.accept().await {
				Err(e) => {
					error!("Encountered an error in accept: {}", e);
				},
				Ok((stream, _)) => {
					let service = self.service.clone();
					tokio::spawn(async move{
						Self::handle_connection(stream, service).await;
					});
				}
			}
		}
	}

	async fn handle_connection(stream: TcpStream, service: Arc<StorageService<ADAPTOR>>){
		let mut stream = RequestStream::new(stream);
		let body = match stream.read_request().await {
			Ok(request) => service.handle(request).await,
			Err(ref e) if e.kind() == ErrorKind::InvalidData => {
				debug!("undecodable request from {:?}: {}", stream.peer_address(), e);
				response::UNKNOWN_COMMAND.to_vec()
			},
			Err(e) => {
				debug!("connection from {:?} closed before a request arrived: {}", stream.peer_address(), e);
				return;
			},
		};
		if let Err(e) = stream.write_response(&body).await {
			debug!("failed to write response: {}", e);
		}
	}
}
