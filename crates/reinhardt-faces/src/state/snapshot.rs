//! Captured view state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dynamic::{DynamicAction, DynamicActions};
use crate::component::{ComponentTree, StateHolder};
use crate::error::ViewStateResult;

/// Saved state of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStateEntry {
	/// Client id of the component.
	pub client_id: String,
	/// Whatever the component returned from [`StateHolder::save_state`].
	pub state: Value,
}

/// Everything needed to restore a view on postback.
///
/// Entries are in pre-order (node, facets, children) and their client ids are
/// unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
	/// View the snapshot was taken from.
	pub view_id: String,
	/// Per-component state.
	pub entries: Vec<SavedStateEntry>,
	/// Programmatic adds and removes to replay after restoring.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub dynamic_actions: Vec<DynamicAction>,
}

impl ViewSnapshot {
	/// Walks `tree` and collects the state of every non-transient component.
	///
	/// Transient subtrees are skipped entirely, as are subtrees that were added
	/// dynamically: those travel whole inside their add action. Components with
	/// nothing to save produce no entry.
	pub fn capture(tree: &ComponentTree, dynamic: &DynamicActions) -> ViewStateResult<Self> {
		tree.check_id_uniqueness()?;

		let added: HashSet<_> = dynamic
			.added_components(tree)
			.into_iter()
			.flat_map(|id| tree.pre_order(id))
			.collect();

		let entries: Vec<SavedStateEntry> = tree
			.walk_with_client_ids(tree.root(), true)
			.into_iter()
			.filter(|(id, _)| !added.contains(id))
			.filter_map(|(id, client_id)| {
				let state = tree.node(id)?.save_state()?;
				Some(SavedStateEntry { client_id, state })
			})
			.collect();

		tracing::trace!(
			view_id = %tree.view_id(),
			entries = entries.len(),
			dynamic_actions = dynamic.len(),
			"Captured view state"
		);

		Ok(Self {
			view_id: tree.view_id().to_string(),
			entries,
			dynamic_actions: dynamic.capture(tree),
		})
	}

	/// Entry for `client_id`.
	pub fn entry(&self, client_id: &str) -> Option<&SavedStateEntry> {
		self.entries.iter().find(|e| e.client_id == client_id)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether there are no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{ComponentId, ComponentNode};
	use crate::error::ViewStateError;
	use rstest::rstest;

	fn build() -> (ComponentTree, ComponentId, ComponentId) {
		let mut tree = ComponentTree::new("/snap.xhtml");
		let form = tree
			.append_child(
				tree.root(),
				ComponentNode::new("faces.Form")
					.with_id("form")
					.form()
					.with_attribute("method", "post"),
			)
			.unwrap();
		let input = tree
			.append_child(
				form,
				ComponentNode::new("faces.Input")
					.with_id("name")
					.with_attribute("value", "abc"),
			)
			.unwrap();
		(tree, form, input)
	}

	#[rstest]
	fn test_entries_follow_pre_order() {
		let (tree, _, _) = build();

		let snapshot = ViewSnapshot::capture(&tree, &DynamicActions::new()).unwrap();

		let ids: Vec<_> = snapshot.entries.iter().map(|e| e.client_id.as_str()).collect();
		assert_eq!(ids, vec!["j_id1", "form", "form:name"]);
		assert_eq!(snapshot.view_id, "/snap.xhtml");
	}

	#[rstest]
	fn test_unchanged_marked_components_produce_no_entry() {
		let (mut tree, _, input) = build();
		tree.mark_initial_state();
		tree.node_mut(input).unwrap().set_attribute("value", "typed");

		let snapshot = ViewSnapshot::capture(&tree, &DynamicActions::new()).unwrap();

		assert_eq!(snapshot.len(), 1);
		assert!(snapshot.entry("form:name").is_some());
	}

	#[rstest]
	fn test_transient_subtree_is_not_captured() {
		let (mut tree, form, _) = build();
		tree.node_mut(form).unwrap().set_transient(true);

		let snapshot = ViewSnapshot::capture(&tree, &DynamicActions::new()).unwrap();

		assert_eq!(snapshot.len(), 1);
		assert!(snapshot.entry("form:name").is_none());
	}

	#[rstest]
	fn test_dynamic_subtree_travels_in_its_action() {
		let (mut tree, form, _) = build();
		tree.mark_initial_state();
		let extra = tree
			.append_child(form, ComponentNode::new("faces.Output").with_id("extra"))
			.unwrap();
		let mut dynamic = DynamicActions::new();
		dynamic.record_add(&tree, extra).unwrap();

		let snapshot = ViewSnapshot::capture(&tree, &dynamic).unwrap();

		assert!(snapshot.entry("form:extra").is_none());
		assert_eq!(snapshot.dynamic_actions.len(), 1);
		assert!(snapshot.dynamic_actions[0].component.is_some());
	}

	#[rstest]
	fn test_duplicate_ids_fail_capture() {
		let (mut tree, form, _) = build();
		tree.append_child(form, ComponentNode::new("faces.Input").with_id("name"))
			.unwrap();

		let err = ViewSnapshot::capture(&tree, &DynamicActions::new()).unwrap_err();

		assert!(matches!(err, ViewStateError::DuplicateClientId(_)));
	}
}
