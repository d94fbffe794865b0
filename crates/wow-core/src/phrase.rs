//! Wisdom phrase table (`spec.md` §4.D): a read-only table plus a
//! thread-safe random pick, the reward handed back once a `GET_WOW` clears
//! the rate monitor and, if required, its challenge.

use rand::seq::SliceRandom;

/// Source of wisdom phrases returned to a client.
pub trait PhraseSource: Send + Sync {
	/// Pick one phrase from the table. The table is never empty (enforced
	/// at construction), so this never fails.
	fn next(&self) -> &str;
}

/// Default [`PhraseSource`]: a fixed, non-empty table of phrases, the same
/// role as the Go original's hardcoded `wisdomQuotes` slice, with a random
/// index drawn from the OS-backed thread-local RNG on every call.
pub struct StaticPhraseSource {
	phrases: Vec<String>,
}

impl StaticPhraseSource {
	/// # Errors
	/// [`crate::error::ConfigError::EmptyPhraseTable`] if `phrases` is
	/// empty.
	pub fn new(phrases: Vec<String>) -> Result<Self, crate::error::ConfigError> {
		if phrases.is_empty() {
			return Err(crate::error::ConfigError::EmptyPhraseTable);
		}
		Ok(Self { phrases })
	}

	/// The built-in default table, used when no phrase file is configured.
	#[must_use]
	pub fn with_defaults() -> Self {
		Self::new(DEFAULT_PHRASES.iter().map(|&s| s.to_string()).collect()).expect("DEFAULT_PHRASES is never empty")
	}
}

impl PhraseSource for StaticPhraseSource {
	fn next(&self) -> &str {
		self.phrases.choose(&mut rand::thread_rng()).map_or("", String::as_str)
	}
}

const DEFAULT_PHRASES: &[&str] = &[
	"A word of wisdom: the obstacle is the way.",
	"A word of wisdom: measure twice, cut once.",
	"A word of wisdom: slow is smooth, smooth is fast.",
	"A word of wisdom: the map is not the territory.",
	"A word of wisdom: simplicity is the ultimate sophistication.",
	"A word of wisdom: still water runs deep.",
	"A word of wisdom: a stitch in time saves nine.",
	"A word of wisdom: fortune favors the prepared mind.",
];
