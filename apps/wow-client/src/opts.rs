//! Client CLI surface (`spec.md` §6.3), grounded on
//! `examples/original_source/cmd/client/root.go`'s persistent flags and
//! `client.go`/`solve_challenge.go`'s per-command flags.

use clap::{Parser, Subcommand, ValueEnum};

use wow_core::config::{ChallengeConfig, ClientConfig};

#[derive(Parser, Debug)]
#[command(name = "wow-client", author, version, about = "word-of-wisdom proof-of-work TCP client", long_about = None)]
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
	/// Connect to the server and print today's word of wisdom.
	GetWow {
		/// Server address to connect to, in `host:port` form.
		#[arg(short = 'a', long, default_value = "localhost:9000")]
		address: String,

		/// Establish dependencies and exit without dialing. Used to
		/// smoke-test configuration wiring.
		#[arg(long)]
		noop: bool,

		#[command(flatten)]
		client: ClientConfig,

		#[command(flatten)]
		challenges: ChallengeConfig,
	},

	/// Developer tool: solve a challenge given on the command line and print
	/// the solution and elapsed duration, without talking to a server.
	SolveChallenge {
		/// Challenge text to solve.
		#[arg(long)]
		challenge: String,

		/// Required number of leading zero bytes.
		#[arg(short = 'c', long)]
		complexity: u32,

		/// Suppress all output; just solve.
		#[arg(long)]
		silent: bool,

		#[command(flatten)]
		challenges: ChallengeConfig,
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
