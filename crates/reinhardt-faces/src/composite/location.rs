use std::fmt;

use serde::{Deserialize, Serialize};

/// Position in a view definition file, attached to expressions so they can
/// be traced back to the composite component that declared them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
	/// Path of the source file, e.g. `"/resources/ezcomp/login.xhtml"`.
	pub path: String,
	/// 1-based line, or -1 when unknown.
	pub line: i32,
	/// 1-based column, or -1 when unknown.
	pub column: i32,
}

impl Location {
	/// Creates a location.
	pub fn new(path: impl Into<String>, line: i32, column: i32) -> Self {
		Self {
			path: path.into(),
			line,
			column,
		}
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} @{},{}", self.path, self.line, self.column)
	}
}
