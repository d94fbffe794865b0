//! Tracing subscriber setup, grounded on `apps/audio-transcriber/src/observability.rs`
//! and `apps/some-obs/src/main.rs`'s registry-plus-`EnvFilter` wiring, with an
//! optional JSON layer and an optional file sink added for `spec.md` §6.2's
//! `--json-logs`/`--logs-file` flags.

use std::fs::File;

use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::opts::LogLevel;

/// Initialize the global tracing subscriber. Call once, at process start.
///
/// # Errors
/// Returns an error if `logs_file` cannot be opened for writing.
pub fn init(level: LogLevel, json: bool, logs_file: Option<&str>) -> anyhow::Result<()> {
	let filter = EnvFilter::try_new(level.to_string()).unwrap_or_else(|_| EnvFilter::new("info"));

	// Boxed rather than `Arc`-wrapped: `Box<dyn Fn() -> W>` gets a compiler-provided
	// `Fn() -> W` impl (unlike `Rc`/`Arc`), which is what satisfies
	// `tracing_subscriber`'s blanket `MakeWriter` impl for `F: Fn() -> W`.
	let make_writer: Box<dyn Fn() -> Box<dyn std::io::Write + Send> + Send + Sync> = match logs_file {
		Some(path) => {
			let path = path.to_string();
			Box::new(move || Box::new(File::options().create(true).append(true).open(&path).expect("logs file must be writable")) as Box<dyn std::io::Write + Send>)
		}
		None => Box::new(|| Box::new(std::io::stderr()) as Box<dyn std::io::Write + Send>),
	};

	let layer = if json {
		Box::new(
			tracing_subscriber::fmt::layer()
				.with_writer(make_writer)
				.fmt_fields(JsonFields::default())
				.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
				.with_filter(filter),
		) as Box<dyn Layer<_> + Send + Sync>
	} else {
		Box::new(tracing_subscriber::fmt::layer().with_writer(make_writer).with_filter(filter))
	};

	tracing_subscriber::registry().with(layer).try_init().map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
	Ok(())
}
