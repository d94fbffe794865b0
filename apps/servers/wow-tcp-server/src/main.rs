//! `wow-tcp-server` binary entry point (`spec.md` §6.2): parse CLI flags,
//! wire dependencies, and run the accept loop until `SIGINT`/`SIGTERM`
//! requests a graceful shutdown.

mod listener;
mod logging;
mod opts;

use std::net::SocketAddr;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use wow_core::capabilities::{OsRandom, SystemClock};
use wow_core::{ChallengeEngine, MonitorLimits, RateMonitor, StaticPhraseSource};

use crate::listener::Listener;
use crate::opts::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let cli = Cli::parse();
	logging::init(cli.log_level, cli.json_logs, cli.logs_file.as_deref())?;
	tracing::info!(env = %cli.env, "starting wow-tcp-server");

	let Command::TcpServer { noop, tcp, monitoring } = cli.command;

	let limits: MonitorLimits = monitoring.to_limits()?;
	let monitor = RateMonitor::new(SystemClock, limits)?;
	let challenges = ChallengeEngine::new(OsRandom, SystemClock);
	let phrases = StaticPhraseSource::with_defaults();

	if noop {
		tracing::info!("noop: dependencies wired successfully, exiting without accepting connections");
		return Ok(());
	}

	let server = Listener::new(monitor, challenges, phrases, tcp.max_session_duration);
	let addr = SocketAddr::from(([0, 0, 0, 0], tcp.port));
	let shutdown = CancellationToken::new();

	let signal_shutdown = shutdown.clone();
	tokio::spawn(async move {
		wait_for_shutdown_signal().await;
		tracing::info!("shutdown signal received, winding down");
		signal_shutdown.cancel();
	});

	server.run(addr, shutdown).await?;
	tracing::info!("wow-tcp-server stopped");
	Ok(())
}

/// Resolves on `SIGINT` or, on Unix, `SIGTERM`.
async fn wait_for_shutdown_signal() {
	let ctrl_c = tokio::signal::ctrl_c();

	#[cfg(unix)]
	{
		let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler");
		tokio::select! {
			_ = ctrl_c => {}
			_ = terminate.recv() => {}
		}
	}

	#[cfg(not(unix))]
	{
		ctrl_c.await.ok();
	}
}
