//! Injected capabilities: time, randomness and correlation-id generation.
//!
//! Keeping these behind small traits (rather than calling `SystemTime::now()`
//! or `rand::thread_rng()` directly from the core logic) is what makes
//! [`crate::monitor::RateMonitor`] and [`crate::challenge::ChallengeEngine`]
//! deterministically testable: tests substitute the `testing` module's fake
//! implementations instead of sleeping or depending on OS entropy.

use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond/nanosecond clock, injected so tests can control window
/// rollover and challenge deadlines without real sleeps.
pub trait TimeSource: Send + Sync {
	/// Current time, in nanoseconds since the Unix epoch.
	///
	/// # Errors
	/// Returns [`crate::error::CapabilityError`] if the underlying clock
	/// fails (e.g. the system clock reports a time before the Unix epoch).
	/// This is the path `spec.md` §7's `CapabilityError` → `ERR:
	/// INTERNAL_ERROR` propagation exercises for [`crate::monitor::RateMonitor`].
	fn now_nanos(&self) -> Result<i64, crate::error::CapabilityError>;

	/// Current time, in milliseconds since the Unix epoch.
	///
	/// # Errors
	/// See [`TimeSource::now_nanos`].
	fn now_millis(&self) -> Result<i64, crate::error::CapabilityError> {
		self.now_nanos().map(|nanos| nanos / 1_000_000)
	}
}

/// Source of cryptographically secure random bytes, used only for the
/// challenge nonce (see [`crate::challenge::ChallengeEngine::generate`]).
pub trait RandomSource: Send + Sync {
	/// Fill `buf` with random bytes.
	///
	/// # Errors
	/// Returns [`crate::error::CapabilityError`] if the underlying entropy
	/// source fails.
	fn fill(&self, buf: &mut [u8]) -> Result<(), crate::error::CapabilityError>;
}

/// Generates correlation IDs attached to every accepted connection's log
/// records.
pub trait IdGenerator: Send + Sync {
	/// Produce a fresh, unique identifier.
	fn next_id(&self) -> String;
}

/// [`TimeSource`] backed by the OS wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
	fn now_nanos(&self) -> Result<i64, crate::error::CapabilityError> {
		let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| crate::error::CapabilityError::Time(e.to_string()))?;
		i64::try_from(elapsed.as_nanos()).map_err(|e| crate::error::CapabilityError::Time(e.to_string()))
	}
}

/// [`RandomSource`] backed by the OS cryptographic RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
	fn fill(&self, buf: &mut [u8]) -> Result<(), crate::error::CapabilityError> {
		use rand::RngCore;
		rand::rngs::OsRng.try_fill_bytes(buf).map_err(|e| crate::error::CapabilityError::Random(e.to_string()))
	}
}

/// [`IdGenerator`] backed by UUID v4, the same `uuid` crate the teacher
/// depends on for identifier generation in `crates/ws-connection`
/// (`uuid = { version = "1.18.1", features = ["v4", "fast-rng"] }`).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
	fn next_id(&self) -> String {
		uuid::Uuid::new_v4().to_string()
	}
}

/// Deterministic test doubles for [`TimeSource`], [`RandomSource`] and
/// [`IdGenerator`], mirroring the fakes used in
/// `examples/original_source/pkg/app/challenges/monitor_test.go`.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
	use super::{CapabilityError, IdGenerator, RandomSource, TimeSource};
	use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
	use std::sync::Arc;

	/// A clock whose value only moves when [`FakeClock::advance`] is called.
	///
	/// Cloning shares the underlying counter (it wraps an `Arc`), so a test
	/// can hand one clone to a [`crate::monitor::RateMonitor`] or
	/// [`crate::challenge::ChallengeEngine`] under test while keeping
	/// another to drive time forward from outside.
	#[derive(Debug, Clone)]
	pub struct FakeClock {
		nanos: Arc<AtomicI64>,
	}

	impl FakeClock {
		#[must_use]
		pub fn new(start_millis: i64) -> Self {
			Self { nanos: Arc::new(AtomicI64::new(start_millis * 1_000_000)) }
		}

		pub fn advance(&self, duration: std::time::Duration) {
			self.nanos.fetch_add(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX), Ordering::SeqCst);
		}

		pub fn set_millis(&self, millis: i64) {
			self.nanos.store(millis * 1_000_000, Ordering::SeqCst);
		}
	}

	impl Default for FakeClock {
		fn default() -> Self {
			Self::new(0)
		}
	}

	impl TimeSource for FakeClock {
		fn now_nanos(&self) -> Result<i64, CapabilityError> {
			Ok(self.nanos.load(Ordering::SeqCst))
		}
	}

	/// A [`TimeSource`] that always fails, for exercising the
	/// `CapabilityError` → `ERR: INTERNAL_ERROR` propagation path through
	/// [`crate::monitor::RateMonitor::record_request`] and
	/// [`crate::handler::CommandHandler`] (`spec.md` §7).
	#[derive(Debug, Default, Clone, Copy)]
	pub struct FailingClock;

	impl TimeSource for FailingClock {
		fn now_nanos(&self) -> Result<i64, CapabilityError> {
			Err(CapabilityError::Time("fake clock failure".to_string()))
		}
	}

	/// Deterministic "random" source: increasing counter values, so
	/// generated challenges differ without depending on real entropy.
	#[derive(Debug, Default)]
	pub struct CountingRandom {
		counter: AtomicU64,
	}

	impl RandomSource for CountingRandom {
		fn fill(&self, buf: &mut [u8]) -> Result<(), CapabilityError> {
			let seed = self.counter.fetch_add(1, Ordering::SeqCst);
			for (i, b) in buf.iter_mut().enumerate() {
				*b = seed.to_le_bytes()[i % 8].wrapping_add(i as u8);
			}
			Ok(())
		}
	}

	/// Sequential id generator (`"id-0"`, `"id-1"`, ...).
	#[derive(Debug, Default)]
	pub struct SequentialIds {
		counter: AtomicU64,
	}

	impl IdGenerator for SequentialIds {
		fn next_id(&self) -> String {
			format!("id-{}", self.counter.fetch_add(1, Ordering::SeqCst))
		}
	}
}

#[cfg(any(test, feature = "testing"))]
use crate::error::CapabilityError;

#[cfg(test)]
mod tests {
	use super::testing::FakeClock;
	use super::*;

	#[test]
	fn fake_clock_advances_only_when_told() {
		let clock = FakeClock::new(1_000);
		assert_eq!(clock.now_millis().unwrap(), 1_000);
		clock.advance(std::time::Duration::from_millis(500));
		assert_eq!(clock.now_millis().unwrap(), 1_500);
	}

	#[test]
	fn system_clock_moves_forward() {
		let clock = SystemClock;
		let first = clock.now_nanos().unwrap();
		std::thread::sleep(std::time::Duration::from_millis(5));
		let second = clock.now_nanos().unwrap();
		assert!(second > first);
	}

	#[test]
	fn failing_clock_always_errors() {
		let clock = testing::FailingClock;
		assert!(clock.now_nanos().is_err());
		assert!(clock.now_millis().is_err());
	}
}
