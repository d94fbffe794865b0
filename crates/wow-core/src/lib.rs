//! Core protocol, challenge and rate-limiting logic shared by the
//! `wow-tcp-server` and `wow-client` binaries.
//!
//! Everything here is transport-agnostic: [`session::SessionIO`] is a trait
//! over any `AsyncRead + AsyncWrite` stream, and [`capabilities`] injects
//! time, randomness and id generation so the rest of the crate is
//! deterministically testable without real sleeps or OS entropy.

pub mod capabilities;
pub mod challenge;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod monitor;
pub mod phrase;
pub mod protocol;
pub mod session;

pub use capabilities::{IdGenerator, RandomSource, TimeSource};
pub use challenge::ChallengeEngine;
pub use client::ClientDriver;
pub use config::{ChallengeConfig, ClientConfig, MonitoringConfig, TcpServerConfig};
pub use handler::CommandHandler;
pub use monitor::{MonitorLimits, RateMonitor, RecordRequestResult};
pub use phrase::{PhraseSource, StaticPhraseSource};
pub use session::{SessionIO, StreamSession};
