//! Error taxonomy shared by the server and client sides of the protocol.
//!
//! Each variant corresponds to one of the kinds in `spec.md` §7
//! (`ProtocolError`, `IOError`, `CapabilityError`, `DeadlineError`,
//! `ConfigError`) rather than to a single concrete failure, matching the
//! one-`thiserror`-enum-per-module convention used throughout the teacher
//! workspace (e.g. `crates/ws-connection/src/errors.rs`).

use thiserror::Error;

/// Malformed or unexpected input from the peer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
	#[error("line exceeded maximum length of {limit} bytes")]
	LineTooLong { limit: usize },

	#[error("connection closed before a complete line was read")]
	UnexpectedEof,

	#[error("expected prefix {expected:?}, got line {actual:?}")]
	UnexpectedPrefix { expected: &'static str, actual: String },

	#[error("malformed challenge header {0:?}")]
	MalformedChallengeHeader(String),
}

/// Transport read/write failure or timeout, wrapping the underlying I/O
/// error kind (not the error itself, to keep this type `Clone`+`PartialEq`
/// friendly for tests).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("session io error: {message}")]
pub struct SessionError {
	pub message: String,
}

impl From<std::io::Error> for SessionError {
	fn from(err: std::io::Error) -> Self {
		Self { message: err.to_string() }
	}
}

/// The injected `RandomSource`/`TimeSource` failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
	#[error("random source failed: {0}")]
	Random(String),

	#[error("time source failed: {0}")]
	Time(String),
}

/// The challenge solver exhausted its time budget (`spec.md` §4.B `solve`).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("deadline reached before a solution was found")]
pub struct DeadlineError;

/// Invalid configuration detected at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("{field} must be positive, got {value}")]
	MustBePositive { field: &'static str, value: i64 },

	#[error("phrase table must not be empty")]
	EmptyPhraseTable,
}

/// Top-level error returned by [`crate::handler::CommandHandler::handle`] and
/// [`crate::client`] operations: an unrecovered failure that propagates to
/// the caller (the `Listener` on the server side, the CLI on the client
/// side), as opposed to an honoured `ERR: ...` protocol response which is
/// *not* an error (see `spec.md` §7 propagation policy).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
	#[error(transparent)]
	Session(#[from] SessionError),

	#[error(transparent)]
	Protocol(#[from] ProtocolError),

	#[error(transparent)]
	Capability(#[from] CapabilityError),

	#[error(transparent)]
	Deadline(#[from] DeadlineError),
}
