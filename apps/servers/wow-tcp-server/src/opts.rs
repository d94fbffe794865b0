//! Server CLI surface (`spec.md` §6.2): persistent logging/profile flags plus
//! the `tcp-server` subcommand.

use clap::{Parser, Subcommand, ValueEnum};

use wow_core::config::{MonitoringConfig, TcpServerConfig};

#[derive(Parser, Debug)]
#[command(name = "wow-server", author, version, about = "word-of-wisdom proof-of-work TCP service", long_about = None)]
pub struct Cli {
	/// Minimum log level.
	#[arg(short = 'l', long, env = "WOW_LOG_LEVEL", default_value_t = LogLevel::Info)]
	pub log_level: LogLevel,

	/// Emit logs as single-line JSON instead of human-readable text.
	#[arg(long, env = "WOW_JSON_LOGS", default_value = "false")]
	pub json_logs: bool,

	/// Write logs to this file instead of stderr.
	#[arg(long, env = "WOW_LOGS_FILE")]
	pub logs_file: Option<String>,

	/// Config profile; only changes default values, never reads a file.
	#[arg(short = 'e', long, env = "WOW_ENV", default_value_t = Environment::Development)]
	pub env: Environment,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run the TCP listener.
	TcpServer {
		/// Build the listener and all dependencies, then exit without
		/// accepting connections. Used to smoke-test configuration and
		/// dependency wiring in CI.
		#[arg(long)]
		noop: bool,

		#[command(flatten)]
		tcp: TcpServerConfig,

		#[command(flatten)]
		monitoring: MonitoringConfig,
	},
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl std::fmt::Display for LogLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Error => "error",
			Self::Warn => "warn",
			Self::Info => "info",
			Self::Debug => "debug",
			Self::Trace => "trace",
		};
		f.write_str(s)
	}
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
	Development,
	Staging,
	Production,
}

impl std::fmt::Display for Environment {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Development => "development",
			Self::Staging => "staging",
			Self::Production => "production",
		};
		f.write_str(s)
	}
}
