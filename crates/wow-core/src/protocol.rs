//! Wire protocol constants (`spec.md` §6.1). Line-delimited, UTF-8,
//! terminated by `\n` (an optional `\r` is tolerated by [`crate::session`]).
//! All tokens are ASCII and case-sensitive; prefix matches are `starts_with`,
//! never substring.

pub const CMD_GET_WOW: &str = "GET_WOW";

pub const PREFIX_WOW: &str = "WOW: ";
pub const PREFIX_CHALLENGE_REQUIRED: &str = "CHALLENGE_REQUIRED: ";
pub const PREFIX_CHALLENGE_RESULT: &str = "CHALLENGE_RESULT: ";

pub const ERR_BAD_CMD: &str = "ERR: BAD_CMD";
pub const ERR_INTERNAL_ERROR: &str = "ERR: INTERNAL_ERROR";
pub const ERR_UNEXPECTED_CHALLENGE_RESULT: &str = "ERR: UNEXPECTED_CHALLENGE_RESULT";
pub const ERR_CHALLENGE_VERIFICATION_FAILED: &str = "ERR: CHALLENGE_VERIFICATION_FAILED";

/// Maximum accepted line length. `spec.md` §4.A requires at least 8 KiB; we
/// double it to leave headroom for the hex-encoded challenge plus the
/// complexity suffix on `CHALLENGE_REQUIRED:` lines.
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// Split a `CHALLENGE_REQUIRED: <challenge>;<complexity>` body on the first
/// `;`, per `spec.md` §6.1 ("the `;` between challenge and complexity is the
/// first `;` only").
///
/// # Errors
/// Returns [`crate::error::ProtocolError::MalformedChallengeHeader`] if there
/// is no `;` separator, or the suffix is not a valid non-negative integer.
pub fn parse_challenge_body(body: &str) -> Result<(&str, u32), crate::error::ProtocolError> {
	let sep = body.find(';').ok_or_else(|| crate::error::ProtocolError::MalformedChallengeHeader(body.to_string()))?;
	let (challenge, rest) = body.split_at(sep);
	let complexity_str = &rest[1..];
	let complexity: u32 = complexity_str.parse().map_err(|_| crate::error::ProtocolError::MalformedChallengeHeader(body.to_string()))?;
	Ok((challenge, complexity))
}

/// Format a `CHALLENGE_REQUIRED: ...` line body (without the leading
/// prefix or trailing newline).
#[must_use]
pub fn format_challenge_body(challenge: &str, complexity: u32) -> String {
	format!("{challenge};{complexity}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_challenge_body() {
		let (challenge, complexity) = parse_challenge_body("deadbeef;3").unwrap();
		assert_eq!(challenge, "deadbeef");
		assert_eq!(complexity, 3);
	}

	#[test]
	fn rejects_missing_separator() {
		assert!(parse_challenge_body("deadbeef").is_err());
	}

	#[test]
	fn rejects_non_numeric_complexity() {
		assert!(parse_challenge_body("deadbeef;x").is_err());
	}

	#[test]
	fn splits_on_first_semicolon_only() {
		// "b;3" is not a valid u32 on its own, proving the split happened
		// at the first `;` rather than the last one.
		assert!(parse_challenge_body("a;b;3").is_err());
	}

	#[test]
	fn first_semicolon_wins_when_challenge_itself_has_none() {
		let (challenge, complexity) = parse_challenge_body("abc123;7").unwrap();
		assert_eq!(challenge, "abc123");
		assert_eq!(complexity, 7);
	}
}
