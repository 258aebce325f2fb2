//! Per-component attribute storage with partial state saving.
//!
//! Every [`ComponentNode`](super::ComponentNode) owns a [`ComponentStateHelper`].
//! Before [`mark_initial_state`](ComponentStateHelper::mark_initial_state) is
//! called the helper saves its full contents. Afterwards it only saves the keys
//! that changed since marking, which is what makes rebuilding the tree from
//! the declarative source on postback cheap: the rebuilt tree already holds the
//! initial values and only the delta has to travel with the view state.

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StateError;

const FULL_KEY: &str = "full";
const VALUES_KEY: &str = "values";
const REMOVED_KEY: &str = "removed";

/// Capture/restore contract every component exposes to the state subsystem.
///
/// `restore_state(&save_state()?)` must leave an unmodified component
/// observably unchanged.
pub trait StateHolder {
	/// Returns the state to persist, or `None` if there is nothing to save.
	fn save_state(&self) -> Option<Value>;

	/// Applies a previously saved state.
	fn restore_state(&mut self, state: &Value) -> Result<(), StateError>;

	/// Transient holders are never saved or restored.
	fn is_transient(&self) -> bool {
		false
	}
}

/// Attribute map with initial-state tracking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentStateHelper {
	values: IndexMap<String, Value>,
	initial: Option<IndexMap<String, Value>>,
}

impl ComponentStateHelper {
	/// Creates an empty helper.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a value under `key`. Values that fail to serialize are ignored.
	pub fn put(&mut self, key: impl Into<String>, value: impl Serialize) {
		if let Ok(json) = serde_json::to_value(value) {
			self.values.insert(key.into(), json);
		}
	}

	/// Returns the raw JSON value stored under `key`.
	pub fn get_value(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}

	/// Returns the value stored under `key` deserialized as `T`.
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.values
			.get(key)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	/// Removes `key` and returns its previous value.
	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.values.shift_remove(key)
	}

	/// Number of stored attributes.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Whether no attributes are stored.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Iterates over stored attributes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.values.iter()
	}

	/// Records the current contents as the initial state.
	///
	/// Subsequent calls to [`StateHolder::save_state`] only report changes
	/// relative to this point.
	pub fn mark_initial_state(&mut self) {
		self.initial = Some(self.values.clone());
	}

	/// Forgets the initial state so the next save captures everything.
	pub fn clear_initial_state(&mut self) {
		self.initial = None;
	}

	/// Whether [`mark_initial_state`](Self::mark_initial_state) was called.
	pub fn initial_state_marked(&self) -> bool {
		self.initial.is_some()
	}

	/// Saves the full contents regardless of initial-state marking.
	pub fn save_full_state(&self) -> Value {
		let mut out = Map::new();
		out.insert(FULL_KEY.to_string(), Value::Bool(true));
		out.insert(VALUES_KEY.to_string(), Value::Object(to_map(&self.values)));
		Value::Object(out)
	}

	fn save_delta(&self, initial: &IndexMap<String, Value>) -> Option<Value> {
		let changed: Map<String, Value> = self
			.values
			.iter()
			.filter(|(k, v)| initial.get(*k) != Some(*v))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		let removed: Vec<Value> = initial
			.keys()
			.filter(|k| !self.values.contains_key(*k))
			.map(|k| Value::String(k.clone()))
			.collect();

		if changed.is_empty() && removed.is_empty() {
			return None;
		}

		let mut out = Map::new();
		if !changed.is_empty() {
			out.insert(VALUES_KEY.to_string(), Value::Object(changed));
		}
		if !removed.is_empty() {
			out.insert(REMOVED_KEY.to_string(), Value::Array(removed));
		}
		Some(Value::Object(out))
	}
}

impl StateHolder for ComponentStateHelper {
	fn save_state(&self) -> Option<Value> {
		match &self.initial {
			Some(initial) => self.save_delta(initial),
			None => Some(self.save_full_state()),
		}
	}

	fn restore_state(&mut self, state: &Value) -> Result<(), StateError> {
		let obj = state.as_object().ok_or(StateError::UnexpectedShape {
			expected: "object",
			found: json_type(state),
		})?;

		let values = match obj.get(VALUES_KEY) {
			Some(Value::Object(values)) => Some(values),
			Some(other) => {
				return Err(StateError::UnexpectedShape {
					expected: "object of values",
					found: json_type(other),
				});
			}
			None => None,
		};

		if obj.get(FULL_KEY).and_then(Value::as_bool).unwrap_or(false) {
			self.values.clear();
		}
		if let Some(values) = values {
			for (k, v) in values {
				self.values.insert(k.clone(), v.clone());
			}
		}
		if let Some(removed) = obj.get(REMOVED_KEY).and_then(Value::as_array) {
			for key in removed.iter().filter_map(Value::as_str) {
				self.values.shift_remove(key);
			}
		}
		Ok(())
	}
}

fn to_map(values: &IndexMap<String, Value>) -> Map<String, Value> {
	values.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
