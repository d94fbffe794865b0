//! Per-connection request orchestration (`spec.md` §4.E).
//!
//! `CommandHandler` drives one `GET_WOW` round trip: consult the
//! [`RateMonitor`], optionally run a challenge round trip through the
//! [`ChallengeEngine`], and respond with a phrase or an `ERR:` line. Modeled
//! as an explicit state machine (`Ready` → `AwaitingSolution` → `Done`)
//! rather than a flat function, the same style as the teacher's
//! `crates/ws-connection` actor states, so each step's preconditions are a
//! type rather than an implicit invariant.

use crate::capabilities::{RandomSource, TimeSource};
use crate::challenge::ChallengeEngine;
use crate::error::HandlerError;
use crate::monitor::RateMonitor;
use crate::phrase::PhraseSource;
use crate::protocol::{self, parse_challenge_body};
use crate::session::SessionIO;

/// Where a single `GET_WOW` exchange currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	/// Waiting for the client's initial command.
	Ready,
	/// A challenge was issued; waiting for `CHALLENGE_RESULT: ...`.
	AwaitingSolution { complexity: u32 },
	/// A terminal line (`WOW:` or `ERR:`) has been written.
	Done,
}

/// Orchestrates exactly one `GET_WOW` exchange over an already-accepted
/// [`SessionIO`].
pub struct CommandHandler<'a, R, T, P> {
	monitor: &'a RateMonitor<T>,
	challenges: &'a ChallengeEngine<R, T>,
	phrases: &'a P,
	state: State,
}

impl<'a, R, T, P> CommandHandler<'a, R, T, P>
where
	R: RandomSource,
	T: TimeSource,
	P: PhraseSource,
{
	pub fn new(monitor: &'a RateMonitor<T>, challenges: &'a ChallengeEngine<R, T>, phrases: &'a P) -> Self {
		Self { monitor, challenges, phrases, state: State::Ready }
	}

	/// Run one full exchange: read the command line, and drive the state
	/// machine through to [`State::Done`], writing exactly one terminal
	/// `WOW:`/`ERR:` line before returning.
	///
	/// # Errors
	/// [`HandlerError`] on any session I/O failure or protocol violation
	/// that the handler cannot itself turn into an `ERR:` response (session
	/// failures are unrecoverable; malformed command/challenge lines are
	/// turned into `ERR:` responses instead of propagated, per `spec.md`
	/// §4.E).
	pub async fn handle(&mut self, session: &mut dyn SessionIO) -> Result<(), HandlerError> {
		let line = session.read_line().await.map_err(to_handler_error)?;

		if line != protocol::CMD_GET_WOW {
			session.write_line(protocol::ERR_BAD_CMD).await?;
			self.state = State::Done;
			return Ok(());
		}

		let decision = match self.monitor.record_request(session.client_id()) {
			Ok(decision) => decision,
			Err(err) => {
				tracing::warn!(error = %err, "rate monitor capability failed");
				session.write_line(protocol::ERR_INTERNAL_ERROR).await?;
				self.state = State::Done;
				return Ok(());
			}
		};

		if !decision.challenge_required {
			self.respond_with_phrase(session).await
		} else {
			self.run_challenge(session, decision.challenge_complexity).await
		}
	}

	async fn run_challenge(&mut self, session: &mut dyn SessionIO, complexity: u32) -> Result<(), HandlerError> {
		let client_id = session.client_id().to_string();
		let challenge = self.challenges.generate(&client_id)?;
		session.write_line(&format!("{}{}", protocol::PREFIX_CHALLENGE_REQUIRED, protocol::format_challenge_body(&challenge, complexity))).await?;
		self.state = State::AwaitingSolution { complexity };

		let line = session.read_line().await.map_err(to_handler_error)?;
		let Some(solution) = line.strip_prefix(protocol::PREFIX_CHALLENGE_RESULT) else {
			session.write_line(protocol::ERR_UNEXPECTED_CHALLENGE_RESULT).await?;
			self.state = State::Done;
			return Ok(());
		};
		let solution = solution.trim();

		if !ChallengeEngine::<R, T>::verify(&challenge, complexity, solution) {
			session.write_line(protocol::ERR_CHALLENGE_VERIFICATION_FAILED).await?;
			self.state = State::Done;
			return Ok(());
		}

		self.respond_with_phrase(session).await
	}

	async fn respond_with_phrase(&mut self, session: &mut dyn SessionIO) -> Result<(), HandlerError> {
		let phrase = self.phrases.next().to_string();
		session.write_line(&format!("{}{}", protocol::PREFIX_WOW, phrase)).await?;
		self.state = State::Done;
		Ok(())
	}

	/// Whether the exchange has produced its terminal line.
	#[must_use]
	pub fn is_done(&self) -> bool {
		self.state == State::Done
	}
}

fn to_handler_error(err: crate::session::ReadLineError) -> HandlerError {
	match err {
		crate::session::ReadLineError::Session(e) => HandlerError::Session(e),
		crate::session::ReadLineError::Protocol(e) => HandlerError::Protocol(e),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::capabilities::testing::{CountingRandom, FakeClock};
	use crate::monitor::MonitorLimits;
	use crate::phrase::StaticPhraseSource;
	use crate::session::StreamSession;
	use std::time::Duration;
	use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

	fn fixtures(max_per_client: i64, max_global: i64) -> (RateMonitor<FakeClock>, ChallengeEngine<CountingRandom, FakeClock>, StaticPhraseSource) {
		let clock = FakeClock::default();
		let monitor = RateMonitor::new(clock.clone(), MonitorLimits { window: Duration::from_secs(60), max_unverified_per_client: max_per_client, max_unverified_global: max_global }).unwrap();
		let challenges = ChallengeEngine::new(CountingRandom::default(), clock);
		let phrases = StaticPhraseSource::new(vec!["fixed phrase".to_string()]).unwrap();
		(monitor, challenges, phrases)
	}

	#[tokio::test]
	async fn no_challenge_path_returns_a_phrase() {
		let (monitor, challenges, phrases) = fixtures(10, 100);
		let mut handler = CommandHandler::new(&monitor, &challenges, &phrases);

		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("1.2.3.4".to_string(), server);
		client.write_all(b"GET_WOW\n").await.unwrap();

		handler.handle(&mut session).await.unwrap();
		assert!(handler.is_done());

		let mut buf = [0u8; 64];
		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"WOW: fixed phrase\n");
	}

	#[tokio::test]
	async fn unknown_command_yields_bad_cmd() {
		let (monitor, challenges, phrases) = fixtures(10, 100);
		let mut handler = CommandHandler::new(&monitor, &challenges, &phrases);

		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("1.2.3.4".to_string(), server);
		client.write_all(b"HELLO\n").await.unwrap();

		handler.handle(&mut session).await.unwrap();

		let mut buf = [0u8; 64];
		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"ERR: BAD_CMD\n");
	}

	#[tokio::test]
	async fn challenge_round_trip_succeeds_with_a_valid_solution() {
		let (monitor, challenges, phrases) = fixtures(1, 1000);
		monitor.record_request("1.2.3.4").unwrap();

		let (mut client, server) = duplex(4096);
		let mut session = StreamSession::new("1.2.3.4".to_string(), server);
		client.write_all(b"GET_WOW\n").await.unwrap();

		let handle_task = tokio::spawn(async move {
			let mut handler = CommandHandler::new(&monitor, &challenges, &phrases);
			handler.handle(&mut session).await.unwrap();
			assert!(handler.is_done());
		});

		let mut buf = [0u8; 256];
		let n = client.read(&mut buf).await.unwrap();
		let line = String::from_utf8_lossy(&buf[..n]);
		let body = line.strip_prefix(protocol::PREFIX_CHALLENGE_REQUIRED).unwrap().trim_end();
		let (chal, complexity) = parse_challenge_body(body).unwrap();
		assert_eq!(complexity, 2);

		let solution = ChallengeEngine::<CountingRandom, FakeClock>::solve(chal, complexity, || false).unwrap();
		client.write_all(format!("{}{solution}\n", protocol::PREFIX_CHALLENGE_RESULT).as_bytes()).await.unwrap();

		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"WOW: fixed phrase\n");

		handle_task.await.unwrap();
	}

	#[tokio::test]
	async fn wrong_solution_yields_verification_failed() {
		let (monitor, challenges, phrases) = fixtures(1, 1000);
		monitor.record_request("1.2.3.4").unwrap();

		let (mut client, server) = duplex(4096);
		let mut session = StreamSession::new("1.2.3.4".to_string(), server);
		client.write_all(b"GET_WOW\n").await.unwrap();

		let handle_task = tokio::spawn(async move {
			let mut handler = CommandHandler::new(&monitor, &challenges, &phrases);
			handler.handle(&mut session).await.unwrap();
		});

		let mut buf = [0u8; 256];
		let _ = client.read(&mut buf).await.unwrap();
		client.write_all(format!("{}0\n", protocol::PREFIX_CHALLENGE_RESULT).as_bytes()).await.unwrap();

		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"ERR: CHALLENGE_VERIFICATION_FAILED\n");

		handle_task.await.unwrap();
	}

	#[tokio::test]
	async fn unexpected_post_challenge_message_is_rejected() {
		let (monitor, challenges, phrases) = fixtures(1, 1000);
		monitor.record_request("1.2.3.4").unwrap();

		let (mut client, server) = duplex(4096);
		let mut session = StreamSession::new("1.2.3.4".to_string(), server);
		client.write_all(b"GET_WOW\n").await.unwrap();

		let handle_task = tokio::spawn(async move {
			let mut handler = CommandHandler::new(&monitor, &challenges, &phrases);
			handler.handle(&mut session).await.unwrap();
		});

		let mut buf = [0u8; 256];
		let _ = client.read(&mut buf).await.unwrap();
		client.write_all(b"SOMETHING ELSE\n").await.unwrap();

		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"ERR: UNEXPECTED_CHALLENGE_RESULT\n");

		handle_task.await.unwrap();
	}

	/// `spec.md` §4.E/§7: a `RateMonitor` whose injected `TimeSource` fails
	/// must be honored as `ERR: INTERNAL_ERROR`, not propagated as an
	/// unrecovered `HandlerError`.
	#[tokio::test]
	async fn rate_monitor_capability_failure_yields_internal_error() {
		use crate::capabilities::testing::FailingClock;

		let monitor = RateMonitor::new(FailingClock, MonitorLimits { window: Duration::from_secs(60), max_unverified_per_client: 10, max_unverified_global: 100 }).unwrap();
		let challenges = ChallengeEngine::new(CountingRandom::default(), FailingClock);
		let phrases = StaticPhraseSource::new(vec!["fixed phrase".to_string()]).unwrap();
		let mut handler = CommandHandler::new(&monitor, &challenges, &phrases);

		let (mut client, server) = duplex(1024);
		let mut session = StreamSession::new("1.2.3.4".to_string(), server);
		client.write_all(b"GET_WOW\n").await.unwrap();

		handler.handle(&mut session).await.unwrap();
		assert!(handler.is_done());

		let mut buf = [0u8; 64];
		let n = client.read(&mut buf).await.unwrap();
		assert_eq!(&buf[..n], b"ERR: INTERNAL_ERROR\n");
	}
}
