//! Accept loop (`spec.md` §4.F), grounded on
//! `examples/original_source/internal/api/tcp/server/server.go`'s `Listener`:
//! accept, spawn one task per connection, tag it with a correlation id,
//! bound it by a per-connection deadline, isolate panics so one bad request
//! cannot take the process down, and stop accepting new connections on
//! cancellation while letting in-flight ones finish or hit their own
//! deadline.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use wow_core::capabilities::{IdGenerator, OsRandom, SystemClock, UuidGenerator};
use wow_core::{ChallengeEngine, CommandHandler, RateMonitor, StaticPhraseSource, StreamSession};

/// Long-lived, shared dependencies for every accepted connection.
pub struct Listener {
	monitor: Arc<RateMonitor<SystemClock>>,
	challenges: Arc<ChallengeEngine<OsRandom, SystemClock>>,
	phrases: Arc<StaticPhraseSource>,
	ids: Arc<UuidGenerator>,
	max_session_duration: Duration,
	tracker: TaskTracker,
}

impl Listener {
	#[must_use]
	pub fn new(monitor: RateMonitor<SystemClock>, challenges: ChallengeEngine<OsRandom, SystemClock>, phrases: StaticPhraseSource, max_session_duration: Duration) -> Self {
		install_panic_backtrace_hook();
		Self { monitor: Arc::new(monitor), challenges: Arc::new(challenges), phrases: Arc::new(phrases), ids: Arc::new(UuidGenerator), max_session_duration, tracker: TaskTracker::new() }
	}

	/// Bind `addr` and accept connections until `shutdown` is cancelled, then
	/// wait for every already-accepted connection to finish (or hit its own
	/// `max_session_duration`) before returning, per `spec.md` §4.F/§5:
	/// shutdown only stops new accepts, it never forcibly aborts an
	/// in-flight session — matching the Go original, which only calls
	/// `Listener.Close()` on shutdown and never cancels a running
	/// goroutine.
	///
	/// # Errors
	/// Returns an error if the socket cannot be bound.
	pub async fn run(&self, addr: SocketAddr, shutdown: CancellationToken) -> anyhow::Result<()> {
		let listener = TcpListener::bind(addr).await?;
		tracing::info!(%addr, "listening");

		loop {
			tokio::select! {
				() = shutdown.cancelled() => {
					tracing::info!("shutdown requested, accept loop exiting");
					break;
				}
				accepted = listener.accept() => {
					match accepted {
						Ok((stream, peer)) => self.spawn_connection(stream, peer),
						Err(err) => tracing::warn!(error = %err, "accept failed"),
					}
				}
			}
		}

		self.tracker.close();
		if !self.tracker.is_empty() {
			tracing::info!(in_flight = self.tracker.len(), "waiting for in-flight connections to finish");
		}
		self.tracker.wait().await;
		Ok(())
	}

	fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
		let correlation_id = self.ids.next_id();
		let client_id = wow_core::session::extract_host(&peer);
		let span = tracing::info_span!("connection", correlation_id = %correlation_id, client_id = %client_id);
		let monitor = Arc::clone(&self.monitor);
		let challenges = Arc::clone(&self.challenges);
		let phrases = Arc::clone(&self.phrases);
		let deadline = self.max_session_duration;

		// `span.enter()`'s guard is `!Send` and must not be held across an
		// `.await`; attach the span to the whole future with `.instrument`
		// instead, the async-safe equivalent. No shutdown race here: once
		// accepted, a connection runs to completion or its own deadline,
		// never an abort triggered by the listener's cancellation token.
		let connection = async move {
			match tokio::time::timeout(deadline, handle_one_connection(stream, client_id, &monitor, &challenges, &phrases)).await {
				Ok(Ok(())) => {}
				Ok(Err(err)) => tracing::warn!(error = %err, "connection ended with an error"),
				Err(_) => tracing::warn!("connection exceeded its session deadline"),
			}
		};

		self.tracker.spawn(connection.instrument(span));
	}
}

async fn handle_one_connection(stream: TcpStream, client_id: String, monitor: &RateMonitor<SystemClock>, challenges: &ChallengeEngine<OsRandom, SystemClock>, phrases: &StaticPhraseSource) -> anyhow::Result<()> {
	let mut session = StreamSession::new(client_id, stream);
	let mut handler = CommandHandler::new(monitor, challenges, phrases);

	// A panic inside a single connection's handling must not bring down the
	// accept loop; isolate it with catch_unwind, the async equivalent of
	// the Go original's deferred recover() in its per-connection goroutine.
	let result = std::panic::AssertUnwindSafe(handler.handle(&mut session)).catch_unwind().await;

	match result {
		Ok(Ok(())) => Ok(()),
		Ok(Err(err)) => Err(anyhow::anyhow!(err)),
		Err(payload) => {
			let message = panic_message(&payload);
			let backtrace = take_last_panic_backtrace().unwrap_or_else(|| "<no backtrace captured>".to_string());
			tracing::error!(panic = %message, %backtrace, "connection handler panicked");
			Err(anyhow::anyhow!("connection handler panicked: {message}"))
		}
	}
}

/// Extracts a human-readable message from a `catch_unwind` payload, mirroring
/// the two payload shapes `std::panic!`/`.unwrap()`/`.expect()` actually
/// produce (`&'static str` for literals, `String` for formatted panics).
fn panic_message(payload: &Box<dyn Any + Send>) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}

thread_local! {
	/// Stashed by the panic hook installed in [`install_panic_backtrace_hook`]
	/// at the moment a panic occurs, before unwinding reaches `catch_unwind`
	/// in `handle_one_connection` — `catch_unwind` itself only hands back the
	/// payload, never stack context, so capturing the backtrace has to happen
	/// inside the hook.
	static LAST_PANIC_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_PANIC_HOOK: Once = Once::new();

/// Installs a panic hook (once per process) that captures a backtrace at the
/// panic site and stashes it for `handle_one_connection`'s `catch_unwind`
/// branch to log, the Rust analogue of the Go original's
/// `debug.Stack()`-in-deferred-recover pattern.
fn install_panic_backtrace_hook() {
	INSTALL_PANIC_HOOK.call_once(|| {
		let previous = std::panic::take_hook();
		std::panic::set_hook(Box::new(move |info| {
			LAST_PANIC_BACKTRACE.with(|cell| {
				*cell.borrow_mut() = Some(Backtrace::force_capture().to_string());
			});
			previous(info);
		}));
	});
}

fn take_last_panic_backtrace() -> Option<String> {
	LAST_PANIC_BACKTRACE.with(|cell| cell.borrow_mut().take())
}

use futures::FutureExt;
