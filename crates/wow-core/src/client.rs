//! Client-side protocol driver (`spec.md` §4.G): dial, send `GET_WOW`, and
//! if challenged, solve and submit before returning the phrase.

use crate::challenge::ChallengeEngine;
use crate::capabilities::{RandomSource, TimeSource};
use crate::error::HandlerError;
use crate::protocol::{self, parse_challenge_body};
use crate::session::SessionIO;

/// Runs the client side of exactly one `GET_WOW` exchange over an
/// already-connected [`SessionIO`].
pub struct ClientDriver<'a, R, T> {
	challenges: &'a ChallengeEngine<R, T>,
}

impl<'a, R, T> ClientDriver<'a, R, T>
where
	R: RandomSource,
	T: TimeSource,
{
	pub fn new(challenges: &'a ChallengeEngine<R, T>) -> Self {
		Self { challenges }
	}

	/// Write `GET_WOW`, read the response, solve a challenge if one is
	/// required, and return the trimmed phrase.
	///
	/// `is_past_deadline` bounds [`ChallengeEngine::solve`]'s search; it is
	/// consulted by the solver only, not by the surrounding session reads
	/// and writes, which the caller is expected to bound separately (e.g.
	/// with `tokio::time::timeout` around the whole call, per `spec.md`
	/// §4.G's `maxSessionDuration`).
	///
	/// # Errors
	/// [`HandlerError`] on session failure, a malformed challenge header, an
	/// unexpected response prefix, or an exhausted solve deadline.
	pub async fn run(&self, session: &mut dyn SessionIO, mut is_past_deadline: impl FnMut() -> bool) -> Result<String, HandlerError> {
		session.write_line(protocol::CMD_GET_WOW).await?;
		let line = session.read_line().await.map_err(to_handler_error)?;

		if let Some(phrase) = line.strip_prefix(protocol::PREFIX_WOW) {
			return Ok(phrase.to_string());
		}

		let Some(body) = line.strip_prefix(protocol::PREFIX_CHALLENGE_REQUIRED) else {
			return Err(HandlerError::Protocol(crate::error::ProtocolError::UnexpectedPrefix { expected: protocol::PREFIX_WOW, actual: line }));
		};
		let (challenge, complexity) = parse_challenge_body(body)?;

		let solution = ChallengeEngine::<R, T>::solve(challenge, complexity, &mut is_past_deadline).map_err(HandlerError::Deadline)?;

		session.write_line(&format!("{}{solution}", protocol::PREFIX_CHALLENGE_RESULT)).await?;
		let line = session.read_line().await.map_err(to_handler_error)?;

		line.strip_prefix(protocol::PREFIX_WOW).map(str::to_string).ok_or(HandlerError::Protocol(crate::error::ProtocolError::UnexpectedPrefix { expected: protocol::PREFIX_WOW, actual: line }))
	}
}

fn to_handler_error(err: crate::session::ReadLineError) -> HandlerError {
	match err {
		crate::session::ReadLineError::Session(e) => HandlerError::Session(e),
		crate::session::ReadLineError::Protocol(e) => HandlerError::Protocol(e),
	}
}
