//! View state configuration.
//!
//! Settings can be read from a TOML document, from environment variables
//! prefixed with [`ENV_PREFIX`], or both (environment wins):
//!
//! ```toml
//! state_saving_method = "client"
//! compress_view_state = true
//! client_state_secret = "base64 encoded 32 byte key"
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::state::StoreLimits;

/// Prefix of environment variables read by [`FacesSettings::with_env`].
pub const ENV_PREFIX: &str = "REINHARDT_FACES_";

/// Where view state is kept between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSavingMethod {
	/// On the server; the page only carries a `<logical>:<actual>` reference.
	#[default]
	Server,
	/// In the page, sealed with [`StateGuard`](crate::state::StateGuard).
	Client,
}

impl FromStr for StateSavingMethod {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"server" => Ok(Self::Server),
			"client" => Ok(Self::Client),
			other => Err(format!("expected 'server' or 'client', got '{other}'")),
		}
	}
}

impl fmt::Display for StateSavingMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Server => "server",
			Self::Client => "client",
		})
	}
}

/// View state settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacesSettings {
	/// Where view state is kept.
	pub state_saving_method: StateSavingMethod,
	/// Logical views retained by the server store.
	pub number_of_logical_views: usize,
	/// Snapshots retained per logical view.
	pub number_of_views: usize,
	/// Gzip client blobs and serialized server state.
	pub compress_view_state: bool,
	/// Use random instead of incremental sequence numbers.
	pub generate_unique_server_state_ids: bool,
	/// Base64 encoded AES-256 key for client state. Random when unset.
	pub client_state_secret: Option<String>,
	/// Keep server state serialized instead of as live snapshots.
	pub serialize_server_state: bool,
}

impl Default for FacesSettings {
	fn default() -> Self {
		Self {
			state_saving_method: StateSavingMethod::Server,
			number_of_logical_views: 15,
			number_of_views: 15,
			compress_view_state: true,
			generate_unique_server_state_ids: false,
			client_state_secret: None,
			serialize_server_state: false,
		}
	}
}

impl FacesSettings {
	/// Parses settings from TOML. Missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Defaults overridden by the process environment.
	pub fn from_env() -> Result<Self, SettingsError> {
		Self::default().with_env()
	}

	/// Overrides settings with `REINHARDT_FACES_*` variables from the process
	/// environment.
	pub fn with_env(self) -> Result<Self, SettingsError> {
		self.with_env_from(|key| std::env::var(key).ok())
	}

	/// Overrides settings with variables looked up through `lookup`, which
	/// receives the full variable name.
	pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, SettingsError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| {
			let key = format!("{ENV_PREFIX}{name}");
			lookup(&key).map(|value| (key, value))
		};

		if let Some((key, value)) = var("STATE_SAVING_METHOD") {
			self.state_saving_method = parse_env(&key, &value, |v| v.parse::<StateSavingMethod>())?;
		}
		if let Some((key, value)) = var("NUMBER_OF_LOGICAL_VIEWS") {
			self.number_of_logical_views = parse_env(&key, &value, parse_usize)?;
		}
		if let Some((key, value)) = var("NUMBER_OF_VIEWS") {
			self.number_of_views = parse_env(&key, &value, parse_usize)?;
		}
		if let Some((key, value)) = var("COMPRESS_VIEW_STATE") {
			self.compress_view_state = parse_env(&key, &value, parse_bool)?;
		}
		if let Some((key, value)) = var("GENERATE_UNIQUE_SERVER_STATE_IDS") {
			self.generate_unique_server_state_ids = parse_env(&key, &value, parse_bool)?;
		}
		if let Some((_, value)) = var("CLIENT_STATE_SECRET") {
			self.client_state_secret = Some(value);
		}
		if let Some((key, value)) = var("SERIALIZE_SERVER_STATE") {
			self.serialize_server_state = parse_env(&key, &value, parse_bool)?;
		}

		self.validate()?;
		Ok(self)
	}

	/// Rejects zero capacities.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.number_of_logical_views == 0 {
			return Err(SettingsError::Invalid {
				key: "number_of_logical_views",
				reason: "must be at least 1".to_string(),
			});
		}
		if self.number_of_views == 0 {
			return Err(SettingsError::Invalid {
				key: "number_of_views",
				reason: "must be at least 1".to_string(),
			});
		}
		Ok(())
	}

	/// Capacity limits for the server store.
	pub fn store_limits(&self) -> StoreLimits {
		StoreLimits::new(self.number_of_logical_views, self.number_of_views)
	}
}

fn parse_env<T>(
	key: &str,
	value: &str,
	parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, SettingsError> {
	parse(value).map_err(|error| SettingsError::InvalidEnv {
		key: key.to_string(),
		value_len: value.len(),
		error,
	})
}

fn parse_usize(value: &str) -> Result<usize, String> {
	value.trim().parse().map_err(|e: std::num::ParseIntError| e.to_string())
}

fn parse_bool(value: &str) -> Result<bool, String> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "yes" | "on" | "1" => Ok(true),
		"false" | "no" | "off" | "0" | "" => Ok(false),
		other => Err(format!("'{other}' is not a boolean")),
	}
}
