//! `wow-client` binary entry point (`spec.md` §4.G, §6.3): dials the
//! `wow-tcp-server`, runs one `GET_WOW` exchange (solving a challenge if
//! asked to), and prints the resulting phrase. Also exposes a
//! `solve-challenge` developer subcommand that solves a challenge given on
//! the command line without any networking, grounded on
//! `examples/original_source/cmd/client/solve_challenge.go`.

mod dialer;
mod logging;
mod opts;

use std::time::{Duration, Instant};

use clap::Parser;

use wow_core::capabilities::{OsRandom, SystemClock};
use wow_core::{ChallengeEngine, ClientDriver};

use crate::dialer::TimeoutSession;
use crate::opts::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let cli = Cli::parse();
	logging::init(cli.log_level, cli.json_logs, cli.logs_file.as_deref())?;
	tracing::debug!(env = %cli.env, "starting wow-client");

	match cli.command {
		Command::GetWow { address, noop, client, challenges } => run_get_wow(&address, noop, client.io_timeout, client.max_session_duration, challenges.max_solve_duration).await,
		Command::SolveChallenge { challenge, complexity, silent, challenges } => run_solve_challenge(&challenge, complexity, silent, challenges.max_solve_duration),
	}
}

/// Dial `address`, run one `GET_WOW` exchange bounded by `max_session_duration`,
/// and print the returned phrase, per
/// `examples/original_source/cmd/client/client.go`'s `runWOWCommand`.
async fn run_get_wow(address: &str, noop: bool, io_timeout: Duration, max_session_duration: Duration, max_solve_duration: Duration) -> anyhow::Result<()> {
	if noop {
		tracing::info!(%address, "establishing connection");
		return Ok(());
	}

	tracing::debug!(%address, "establishing connection");
	let challenge_engine = ChallengeEngine::new(OsRandom, SystemClock);
	let driver = ClientDriver::new(&challenge_engine);

	let phrase = tokio::time::timeout(max_session_duration, async {
		let mut session = TimeoutSession::dial(address, io_timeout).await?;
		let deadline = Instant::now() + max_solve_duration;
		let phrase = driver.run(&mut session, || Instant::now() >= deadline).await?;
		Ok::<_, anyhow::Error>(phrase)
	})
	.await
	.map_err(|_| anyhow::anyhow!("session exceeded its maximum duration"))??;

	println!("Your Word of Wisdom for today:");
	println!("{phrase}");
	Ok(())
}

/// Solve a challenge given directly on the command line, without dialing a
/// server, per
/// `examples/original_source/cmd/client/solve_challenge.go`'s
/// `runSolveChallengeCommand`.
fn run_solve_challenge(challenge: &str, complexity: u32, silent: bool, max_solve_duration: Duration) -> anyhow::Result<()> {
	let started_at = Instant::now();
	let deadline = started_at + max_solve_duration;
	let solution = ChallengeEngine::<OsRandom, SystemClock>::solve(challenge, complexity, || Instant::now() >= deadline).map_err(|e| anyhow::anyhow!(e))?;
	let elapsed = started_at.elapsed();

	if !silent {
		println!("Challenge solve result");
		println!("Complexity: {complexity}");
		println!("Solution: {solution}");
		println!("Duration: {elapsed:?}");
	}
	Ok(())
}
