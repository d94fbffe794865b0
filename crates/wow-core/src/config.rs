//! Shared configuration structs (`spec.md` §6.4), bound to CLI flags and
//! environment variables via `clap`'s derive macros, the same pattern as
//! the teacher's `crates/file_host/src/config.rs`. Durations accept
//! `humantime` strings (`"30s"`, `"5m"`) via `#[arg(value_parser =
//! humantime::parse_duration)]` rather than bare integer seconds, since the
//! spec's config keys are explicitly typed `duration`, not `int`.

use std::time::Duration;

use clap::Args;

use crate::error::ConfigError;
use crate::monitor::MonitorLimits;

/// `tcpServer.*` configuration.
#[derive(Args, Clone, Debug)]
pub struct TcpServerConfig {
	/// Listening port.
	#[arg(long, env = "WOW_TCP_PORT", default_value = "9000")]
	pub port: u16,

	/// Hard per-connection deadline.
	#[arg(long, env = "WOW_TCP_MAX_SESSION_DURATION", value_parser = humantime::parse_duration, default_value = "30s")]
	pub max_session_duration: Duration,
}

/// `client.*` configuration.
#[derive(Args, Clone, Debug)]
pub struct ClientConfig {
	/// Client socket deadline.
	#[arg(long, env = "WOW_CLIENT_IO_TIMEOUT", value_parser = humantime::parse_duration, default_value = "5s")]
	pub io_timeout: Duration,

	/// Client overall deadline.
	#[arg(long, env = "WOW_CLIENT_MAX_SESSION_DURATION", value_parser = humantime::parse_duration, default_value = "60s")]
	pub max_session_duration: Duration,
}

/// `monitoring.*` configuration.
#[derive(Args, Clone, Debug)]
pub struct MonitoringConfig {
	/// Rate window.
	#[arg(long, env = "WOW_MONITORING_WINDOW_DURATION", value_parser = humantime::parse_duration, default_value = "1m")]
	pub window_duration: Duration,

	/// Per-client unverified allowance.
	#[arg(long, env = "WOW_MONITORING_MAX_UNVERIFIED_CLIENT_REQUESTS", default_value = "10")]
	pub max_unverified_client_requests: i64,

	/// Global unverified allowance.
	#[arg(long, env = "WOW_MONITORING_MAX_UNVERIFIED_REQUESTS", default_value = "100")]
	pub max_unverified_requests: i64,
}

impl MonitoringConfig {
	/// # Errors
	/// [`ConfigError`] if either allowance is not positive.
	pub fn to_limits(&self) -> Result<MonitorLimits, ConfigError> {
		let limits = MonitorLimits { window: self.window_duration, max_unverified_per_client: self.max_unverified_client_requests, max_unverified_global: self.max_unverified_requests };
		limits.validate()?;
		Ok(limits)
	}
}

/// `challenges.*` configuration.
#[derive(Args, Clone, Debug)]
pub struct ChallengeConfig {
	/// Default client solve deadline, used when a caller doesn't override
	/// it (see `spec.md` §4.B: "An unset deadline defaults to `now +
	/// maxSolveDuration`").
	#[arg(long, env = "WOW_CHALLENGES_MAX_SOLVE_DURATION", value_parser = humantime::parse_duration, default_value = "10s")]
	pub max_solve_duration: Duration,
}
