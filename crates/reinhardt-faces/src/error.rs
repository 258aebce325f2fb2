//! Error types for view state handling, search expressions and settings.
//!
//! Most "not found" conditions in this crate are not errors at all and are
//! reported through `Option`. The types here cover malformed input coming from
//! the client, failures of the serialization pipeline, and programming errors
//! detected while resolving search expressions.

use thiserror::Error;

/// Result type for view state operations.
pub type ViewStateResult<T> = Result<T, ViewStateError>;

/// Result type for search expression operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised while parsing a view state token.
///
/// A token that fails to parse is treated by the lifecycle as "no prior
/// state"; the error only exists so the caller can log or reject tampering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TokenError {
	/// The view state parameter was present but empty.
	#[error("view state token is empty")]
	Empty,

	/// A sequence-reference token did not consist of exactly two integers.
	#[error("malformed view state sequence '{token}': {reason}")]
	MalformedSequence {
		/// The offending token.
		token: String,
		/// Why the token was rejected.
		reason: String,
	},
}

/// Errors raised while encoding or decoding view state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViewStateError {
	/// The token could not be parsed.
	#[error(transparent)]
	Token(#[from] TokenError),

	/// A client-embedded blob failed decoding, authentication or decompression.
	#[error("corrupt client view state: {0}")]
	CorruptBlob(String),

	/// The snapshot could not be serialized or deserialized.
	#[error("view state serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Two components in the same view share a client id.
	#[error("duplicate client id '{0}' in view")]
	DuplicateClientId(String),

	/// A component was added twice, or removed twice, without the opposite
	/// action in between.
	#[error("cannot {action} the same component twice: {client_id}")]
	ConflictingDynamicAction {
		/// `"add"` or `"remove"`.
		action: &'static str,
		/// Client id of the component.
		client_id: String,
	},

	/// The client-state cipher could not be initialized or failed to encrypt.
	#[error("client view state encryption failed: {0}")]
	Encryption(String),

	/// Compressing or decompressing the state failed.
	#[error("view state compression failed: {0}")]
	Compression(String),
}

/// Errors raised when a component rejects a saved state blob.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StateError {
	/// The saved state had an unexpected shape.
	#[error("unexpected component state shape: expected {expected}, found {found}")]
	UnexpectedShape {
		/// Description of the expected shape.
		expected: &'static str,
		/// JSON type of the value that was supplied.
		found: &'static str,
	},
}

/// Errors raised while resolving search expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SearchError {
	/// No component matched and the `IgnoreNoResult` hint was not set.
	#[error("cannot find component for expression \"{expression}\" referenced from \"{source_id}\"")]
	ComponentNotFound {
		/// The expression as given.
		expression: String,
		/// Client id of the component the expression was resolved from.
		source_id: String,
	},

	/// A keyword or id followed a keyword that does not allow chaining.
	#[error("it's not valid to place a keyword or id after a leaf keyword: @{keyword}. Expression: {expression}")]
	LeafKeyword {
		/// The leaf keyword, without prefix.
		keyword: String,
		/// The full expression.
		expression: String,
	},

	/// No resolver in the chain handles the keyword.
	#[error("unknown search keyword: @{0}")]
	UnknownKeyword(String),
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
	/// The TOML document could not be parsed.
	#[error("failed to parse faces settings: {0}")]
	Toml(#[from] toml::de::Error),

	/// An environment variable held a value of the wrong type.
	#[error("invalid value for environment variable {key} (length: {value_len}): {error}")]
	InvalidEnv {
		/// Full variable name including prefix.
		key: String,
		/// Length of the rejected value. The value itself is not echoed.
		value_len: usize,
		/// Parser message.
		error: String,
	},

	/// A setting was outside its allowed range.
	#[error("invalid setting {key}: {reason}")]
	Invalid {
		/// Setting name.
		key: &'static str,
		/// Why the value is rejected.
		reason: String,
	},
}
