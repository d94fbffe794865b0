//! Session dialing (`spec.md` §4.G), grounded on
//! `examples/original_source/cmd/client/dialer.go`'s `dialSession`: connect,
//! wrap the stream in a [`SessionIO`], and tag it with the local address as
//! its `client_id` (the client has no notion of "remote client" the way the
//! server does; the original's `networking.NewSession` call uses the same
//! local-address stand-in).
//!
//! `io_timeout` (`spec.md` §6.4 `client.ioTimeout`) is enforced per
//! read/write call via `tokio::time::timeout`, the async analogue of the
//! Go original's `net.Conn.SetDeadline`, which has no direct Tokio
//! equivalent.

use std::time::Duration;

use tokio::net::TcpStream;

use wow_core::session::{ReadLineError, SessionIO, StreamSession};

/// A [`SessionIO`] that bounds every individual read/write by `io_timeout`,
/// wrapping a [`StreamSession`] over a live `TcpStream`.
pub struct TimeoutSession {
	inner: StreamSession<TcpStream>,
	io_timeout: Duration,
}

impl TimeoutSession {
	/// Connect to `address` and wrap the resulting stream.
	///
	/// # Errors
	/// Returns an error if the TCP connection cannot be established.
	pub async fn dial(address: &str, io_timeout: Duration) -> anyhow::Result<Self> {
		let stream = TcpStream::connect(address).await?;
		let client_id = stream.local_addr().map(|a| a.to_string()).unwrap_or_else(|_| "unknown".to_string());
		Ok(Self { inner: StreamSession::new(client_id, stream), io_timeout })
	}
}

#[async_trait::async_trait]
impl SessionIO for TimeoutSession {
	async fn read_line(&mut self) -> Result<String, ReadLineError> {
		match tokio::time::timeout(self.io_timeout, self.inner.read_line()).await {
			Ok(result) => result,
			Err(_) => Err(ReadLineError::Session(wow_core::error::SessionError { message: "io timeout while reading a line".to_string() })),
		}
	}

	async fn write_line(&mut self, s: &str) -> Result<(), wow_core::error::SessionError> {
		match tokio::time::timeout(self.io_timeout, self.inner.write_line(s)).await {
			Ok(result) => result,
			Err(_) => Err(wow_core::error::SessionError { message: "io timeout while writing a line".to_string() }),
		}
	}

	fn client_id(&self) -> &str {
		self.inner.client_id()
	}
}
