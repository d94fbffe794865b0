//! Line-delimited read/write over a byte stream (`spec.md` §4.A).
//!
//! `SessionIO` is a trait so tests can drive a [`CommandHandler`] or the
//! client logic over an in-memory duplex pipe (`tokio::io::duplex`) instead
//! of a real socket, the async analogue of the original Go
//! `internal/services/session_io.go`'s `io.ReadWriter` abstraction.
//!
//! [`CommandHandler`]: crate::handler::CommandHandler

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{ProtocolError, SessionError};
use crate::protocol::MAX_LINE_LEN;

/// One accepted connection's line-oriented read/write surface plus its
/// stable client identity.
#[async_trait::async_trait]
pub trait SessionIO: Send {
	/// Read the next line, without its terminator. An optional trailing
	/// `\r` before the `\n` is stripped. An empty string is a valid line.
	///
	/// # Errors
	/// [`SessionError`] if the stream ends or errors; [`ProtocolError`] if
	/// the line exceeds [`MAX_LINE_LEN`].
	async fn read_line(&mut self) -> Result<String, ReadLineError>;

	/// Write `s` followed by `\n` as a single payload.
	///
	/// # Errors
	/// [`SessionError`] on write failure.
	async fn write_line(&mut self, s: &str) -> Result<(), SessionError>;

	/// The remote host (IP without port) for the session's lifetime.
	fn client_id(&self) -> &str;
}

/// Failure mode for [`SessionIO::read_line`]: either a transport failure or
/// a protocol violation (line too long).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadLineError {
	#[error(transparent)]
	Session(#[from] SessionError),
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
}

/// Production [`SessionIO`] implementation over any owned
/// `AsyncRead + AsyncWrite` stream (a `TcpStream` on both the server and the
/// client side; an in-memory duplex half in tests).
pub struct StreamSession<S> {
	client_id: String,
	reader: BufReader<tokio::io::ReadHalf<S>>,
	writer: tokio::io::WriteHalf<S>,
}

impl<S> StreamSession<S>
where
	S: AsyncRead + AsyncWrite + Send,
{
	/// Wrap `stream`, tagging it with `client_id` (the caller extracts this
	/// from the peer address; see `wow-tcp-server`'s `listener` module for
	/// the server side and [`crate::client`] for the client side).
	pub fn new(client_id: String, stream: S) -> Self {
		let (read_half, write_half) = tokio::io::split(stream);
		Self { client_id, reader: BufReader::new(read_half), writer: write_half }
	}
}

#[async_trait::async_trait]
impl<S> SessionIO for StreamSession<S>
where
	S: AsyncRead + AsyncWrite + Send,
{
	async fn read_line(&mut self) -> Result<String, ReadLineError> {
		let mut buf = Vec::new();
		let n = self.reader.read_until(b'\n', &mut buf).await.map_err(SessionError::from)?;
		if n == 0 {
			return Err(ReadLineError::Session(SessionError { message: "connection closed".to_string() }));
		}
		if buf.len() > MAX_LINE_LEN {
			return Err(ReadLineError::Protocol(ProtocolError::LineTooLong { limit: MAX_LINE_LEN }));
		}
		if buf.last() == Some(&b'\n') {
			buf.pop();
			if buf.last() == Some(&b'\r') {
				buf.pop();
			}
		}
		Ok(String::from_utf8_lossy(&buf).into_owned())
	}

	async fn write_line(&mut self, s: &str) -> Result<(), SessionError> {
		self.writer.write_all(s.as_bytes()).await?;
		self.writer.write_all(b"\n").await?;
		self.writer.flush().await?;
		Ok(())
	}

	fn client_id(&self) -> &str {
		&self.client_id
	}
}

/// Extracts the host part (no port) from a `SocketAddr`-formatted string,
/// per `spec.md` §3 ("`clientID` is the remote host ... extracted from the
/// TCP peer address"). Ported from
/// `internal/api/tcp/server/server.go`'s `extractHost`.
#[must_use]
pub fn extract_host(addr: &std::net::SocketAddr) -> String {
	addr.ip().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::duplex;

	#[tokio::test]
	async fn reads_line_without_terminator() {
		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("test".to_string(), server);
		client.write_all(b"GET_WOW\n").await.unwrap();
		let line = session.read_line().await.unwrap();
		assert_eq!(line, "GET_WOW");
	}

	#[tokio::test]
	async fn strips_trailing_cr() {
		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("test".to_string(), server);
		client.write_all(b"GET_WOW\r\n").await.unwrap();
		let line = session.read_line().await.unwrap();
		assert_eq!(line, "GET_WOW");
	}

	#[tokio::test]
	async fn empty_line_is_valid() {
		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("test".to_string(), server);
		client.write_all(b"\n").await.unwrap();
		let line = session.read_line().await.unwrap();
		assert_eq!(line, "");
	}

	#[tokio::test]
	async fn write_line_appends_newline() {
		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("test".to_string(), server);
		session.write_line("WOW: hi").await.unwrap();
		let mut buf = [0u8; 32];
		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"WOW: hi\n");
	}

	#[tokio::test]
	async fn eof_before_newline_is_an_error() {
		let (client, server) = duplex(1024);
		drop(client);
		let mut session = StreamSession::new("test".to_string(), server);
		assert!(session.read_line().await.is_err());
	}

	#[tokio::test]
	async fn line_too_long_is_a_protocol_error() {
		let (mut client, server) = duplex(MAX_LINE_LEN * 2 + 16);
		let mut session = StreamSession::new("test".to_string(), server);
		let huge = vec![b'a'; MAX_LINE_LEN + 1];
		client.write_all(&huge).await.unwrap();
		client.write_all(b"\n").await.unwrap();
		drop(client);
		let err = session.read_line().await.unwrap_err();
		assert!(matches!(err, ReadLineError::Protocol(ProtocolError::LineTooLong { .. })));
	}

	#[test]
	fn extracts_host_without_port() {
		let addr: std::net::SocketAddr = "1.2.3.4:5678".parse().unwrap();
		assert_eq!(extract_host(&addr), "1.2.3.4");
	}
}
