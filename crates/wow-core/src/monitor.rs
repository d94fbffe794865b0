//! Adaptive rate monitor (`spec.md` §4.C): decides per request whether a
//! challenge is required and at what complexity, from per-client and global
//! unverified-request counts over a fixed rolling window.
//!
//! Grounded on the teacher's lock-free token bucket at
//! `crates/some-services/src/rate_limiter/token_bucket.rs`: atomics for the
//! hot-path counters, a single compare-and-swap to decide who performs a
//! window reset, and a concurrent map (here `DashMap` in place of the
//! teacher's `RwLock<HashMap<_>>`, since per-client counters are independent
//! and don't need a single reader/writer lock) for per-key state.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use crate::capabilities::TimeSource;
use crate::error::{CapabilityError, ConfigError};

/// Outcome of one [`RateMonitor::record_request`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRequestResult {
	pub challenge_required: bool,
	pub challenge_complexity: u32,
}

impl RecordRequestResult {
	const NONE: Self = Self { challenge_required: false, challenge_complexity: 0 };
}

/// Tunables for [`RateMonitor`]. Both limits must be positive.
#[derive(Debug, Clone, Copy)]
pub struct MonitorLimits {
	pub window: Duration,
	pub max_unverified_per_client: i64,
	pub max_unverified_global: i64,
}

impl MonitorLimits {
	/// # Errors
	/// [`ConfigError::MustBePositive`] if either limit is not positive.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_unverified_per_client <= 0 {
			return Err(ConfigError::MustBePositive { field: "maxUnverifiedPerClient", value: self.max_unverified_per_client });
		}
		if self.max_unverified_global <= 0 {
			return Err(ConfigError::MustBePositive { field: "maxUnverifiedGlobal", value: self.max_unverified_global });
		}
		Ok(())
	}
}

/// Lock-free (save for `DashMap`'s internal per-shard locking) tracker of
/// per-client and global unverified-request counts within the current
/// window.
pub struct RateMonitor<T> {
	clock: T,
	limits: MonitorLimits,
	window_started_at: AtomicI64,
	global_count: AtomicI64,
	per_client: DashMap<String, AtomicI64>,
}

impl<T> RateMonitor<T>
where
	T: TimeSource,
{
	/// # Errors
	/// [`ConfigError`] if `limits` are invalid.
	pub fn new(clock: T, limits: MonitorLimits) -> Result<Self, ConfigError> {
		limits.validate()?;
		Ok(Self { clock, limits, window_started_at: AtomicI64::new(0), global_count: AtomicI64::new(0), per_client: DashMap::new() })
	}

	/// Record one request from `client_id` and decide whether a challenge is
	/// required, and at what complexity, per the rule in `spec.md` §4.C.
	///
	/// # Errors
	/// Returns [`CapabilityError`] if the injected [`TimeSource`] fails; the
	/// caller (`spec.md` §4.E/§7) turns this into `ERR: INTERNAL_ERROR` rather
	/// than honoring the request.
	pub fn record_request(&self, client_id: &str) -> Result<RecordRequestResult, CapabilityError> {
		let now = self.clock.now_millis()?;
		self.maybe_roll_window(now);

		let next_client = self.increment_client(client_id);
		let next_global = self.global_count.fetch_add(1, Ordering::SeqCst).saturating_add(1);

		Ok(Self::decide(next_client, next_global, self.limits.max_unverified_per_client, self.limits.max_unverified_global))
	}

	fn maybe_roll_window(&self, now: i64) {
		let started_at = self.window_started_at.load(Ordering::SeqCst);
		if now.saturating_sub(started_at) <= self.window_duration_millis() {
			return;
		}
		// The CAS winner is solely responsible for clearing state; losers
		// skip the reset, per `spec.md` §4.C step 2. Requests that race
		// with the winner's clear may be lost or counted against the new
		// window — accepted, the monitor is a heuristic, not a ledger.
		if self.window_started_at.compare_exchange(started_at, now, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
			self.global_count.store(0, Ordering::SeqCst);
			self.per_client.clear();
		}
	}

	fn window_duration_millis(&self) -> i64 {
		i64::try_from(self.limits.window.as_millis()).unwrap_or(i64::MAX)
	}

	fn increment_client(&self, client_id: &str) -> i64 {
		let counter = self.per_client.entry(client_id.to_string()).or_insert_with(|| AtomicI64::new(0));
		counter.fetch_add(1, Ordering::SeqCst).saturating_add(1)
	}

	fn decide(next_client: i64, next_global: i64, max_per_client: i64, max_global: i64) -> RecordRequestResult {
		if next_client > max_per_client {
			#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			let complexity = (next_client / max_per_client) as u32;
			return RecordRequestResult { challenge_required: true, challenge_complexity: complexity };
		}
		if next_global > max_global {
			let complexity = if next_global / max_global >= 2 { 2 } else { 1 };
			return RecordRequestResult { challenge_required: true, challenge_complexity: complexity };
		}
		RecordRequestResult::NONE
	}
}
