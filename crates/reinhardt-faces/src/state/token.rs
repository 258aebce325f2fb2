//! Wire format of the view state form parameter.
//!
//! ```text
//! stateless            view is not stored anywhere
//! <i64>:<i64>          logical view sequence, state sequence (server mode)
//! <base64url>          sealed snapshot (client mode)
//! ```
//!
//! The client blob alphabet never contains the separator, which keeps the
//! classification unambiguous.

use std::fmt;
use std::str::FromStr;

use crate::error::TokenError;

/// Value of a token for a view that keeps no state.
pub const STATELESS_MARKER: &str = "stateless";

/// Separator between the two sequence numbers of a server token.
pub const SEPARATOR: char = ':';

/// A parsed view state token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewStateToken {
	/// The view is stateless.
	Stateless,
	/// Reference to a snapshot held by the server.
	Sequence {
		/// Slot of the logical view (one per browser window or tab).
		logical: i64,
		/// Snapshot within the logical view.
		actual: i64,
	},
	/// A sealed snapshot carried by the client.
	Blob(String),
}

impl ViewStateToken {
	/// Creates a server token.
	pub fn sequence(logical: i64, actual: i64) -> Self {
		Self::Sequence { logical, actual }
	}

	/// Classifies `raw`.
	///
	/// Negative and zero sequence numbers are accepted. Anything that is
	/// neither the stateless marker nor contains the separator is taken to be a
	/// client blob; whether it actually is one is only known once it is opened.
	pub fn parse(raw: &str) -> Result<Self, TokenError> {
		if raw.is_empty() {
			return Err(TokenError::Empty);
		}
		if raw == STATELESS_MARKER {
			return Ok(Self::Stateless);
		}
		let Some((logical, actual)) = raw.split_once(SEPARATOR) else {
			return Ok(Self::Blob(raw.to_string()));
		};
		if actual.contains(SEPARATOR) {
			return Err(malformed(raw, "expected exactly two segments"));
		}
		let logical = parse_segment(raw, logical, "logical")?;
		let actual = parse_segment(raw, actual, "actual")?;
		Ok(Self::Sequence { logical, actual })
	}

	/// Whether this is the stateless marker.
	pub fn is_stateless(&self) -> bool {
		matches!(self, Self::Stateless)
	}
}

fn parse_segment(raw: &str, segment: &str, name: &str) -> Result<i64, TokenError> {
	if segment.is_empty() {
		return Err(malformed(raw, &format!("{name} sequence is empty")));
	}
	segment
		.parse()
		.map_err(|e| malformed(raw, &format!("{name} sequence: {e}")))
}

fn malformed(token: &str, reason: &str) -> TokenError {
	TokenError::MalformedSequence {
		token: token.to_string(),
		reason: reason.to_string(),
	}
}

impl FromStr for ViewStateToken {
	type Err = TokenError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for ViewStateToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Stateless => f.write_str(STATELESS_MARKER),
			Self::Sequence { logical, actual } => write!(f, "{logical}{SEPARATOR}{actual}"),
			Self::Blob(blob) => f.write_str(blob),
		}
	}
}
