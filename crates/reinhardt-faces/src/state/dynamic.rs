//! Components added or removed by application code after the view was built.
//!
//! Rebuilding a view from its declarative source only re-creates what the
//! source declares. Programmatic changes are therefore recorded as a list of
//! actions, saved with the view state and replayed after restore.

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ComponentTree, SavedComponent};
use crate::error::{ViewStateError, ViewStateResult};

/// Whether a component was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicActionKind {
	/// Component added to the tree.
	Add,
	/// Component removed from the tree.
	Remove,
}

impl DynamicActionKind {
	fn as_str(self) -> &'static str {
		match self {
			Self::Add => "add",
			Self::Remove => "remove",
		}
	}
}

/// One recorded add or remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicAction {
	/// What happened.
	pub kind: DynamicActionKind,
	/// Client id of the component.
	pub client_id: String,
	/// Client id of the parent at the time of the action.
	pub parent_client_id: Option<String>,
	/// Facet name, when the component is a facet.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub facet_name: Option<String>,
	/// Child index, when the component is a child.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index: Option<usize>,
	/// Full subtree of an added component, filled in when the view is saved.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub component: Option<SavedComponent>,
}

impl DynamicAction {
	fn describe(kind: DynamicActionKind, tree: &ComponentTree, id: ComponentId) -> Option<Self> {
		let client_id = tree.client_id(id)?;
		let parent = tree.parent(id);
		let facet_name = tree.facet_name(id).map(str::to_string);
		Some(Self {
			kind,
			client_id,
			parent_client_id: parent.and_then(|p| tree.client_id(p)),
			index: if facet_name.is_none() {
				tree.index_in_parent(id)
			} else {
				None
			},
			facet_name,
			component: None,
		})
	}
}

/// Ordered, self-pruning list of dynamic actions for one view.
#[derive(Debug, Clone, Default)]
pub struct DynamicActions {
	actions: Vec<DynamicAction>,
}

impl DynamicActions {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Recorded actions in order.
	pub fn actions(&self) -> &[DynamicAction] {
		&self.actions
	}

	/// Number of recorded actions.
	pub fn len(&self) -> usize {
		self.actions.len()
	}

	/// Whether nothing has been recorded.
	pub fn is_empty(&self) -> bool {
		self.actions.is_empty()
	}

	/// Drops all recorded actions.
	pub fn clear(&mut self) {
		self.actions.clear();
	}

	/// Records that `id` has just been added to `tree`.
	pub fn record_add(&mut self, tree: &ComponentTree, id: ComponentId) -> ViewStateResult<()> {
		match DynamicAction::describe(DynamicActionKind::Add, tree, id) {
			Some(action) => self.record(action),
			None => Ok(()),
		}
	}

	/// Records that `id` is about to be removed from `tree`.
	///
	/// Must be called while the component is still attached.
	pub fn record_remove(&mut self, tree: &ComponentTree, id: ComponentId) -> ViewStateResult<()> {
		match DynamicAction::describe(DynamicActionKind::Remove, tree, id) {
			Some(action) => self.record(action),
			None => Ok(()),
		}
	}

	/// Appends an action, collapsing it against earlier actions for the same
	/// client id.
	///
	/// - first action for the component: appended
	/// - add after remove: appended
	/// - remove after add: both dropped
	/// - remove after remove+add: the add is dropped
	/// - anything else is a conflict
	fn record(&mut self, action: DynamicAction) -> ViewStateResult<()> {
		let conflict = |action: &DynamicAction| ViewStateError::ConflictingDynamicAction {
			action: action.kind.as_str(),
			client_id: action.client_id.clone(),
		};

		let Some(first) = self.position(&action.client_id) else {
			self.actions.push(action);
			return Ok(());
		};
		let last = self.rposition(&action.client_id).unwrap_or(first);

		if first == last {
			match (self.actions[first].kind, action.kind) {
				(DynamicActionKind::Add, DynamicActionKind::Remove) => {
					self.actions.remove(first);
				}
				(DynamicActionKind::Remove, DynamicActionKind::Add) => self.actions.push(action),
				_ => return Err(conflict(&action)),
			}
		} else {
			match action.kind {
				DynamicActionKind::Remove => {
					self.actions.remove(last);
				}
				DynamicActionKind::Add => return Err(conflict(&action)),
			}
		}
		Ok(())
	}

	/// Re-records an action replayed from saved state, so the next save
	/// carries it forward.
	pub(crate) fn record_replayed(&mut self, action: DynamicAction) {
		let Some(first) = self.position(&action.client_id) else {
			self.actions.push(action);
			return;
		};
		let last = self.rposition(&action.client_id).unwrap_or(first);
		if first == last {
			self.actions.push(action);
			return;
		}
		match action.kind {
			DynamicActionKind::Add => {
				self.actions.remove(last);
				self.actions.remove(first);
				self.actions.push(action);
			}
			DynamicActionKind::Remove => {
				self.actions.remove(last);
			}
		}
	}

	fn position(&self, client_id: &str) -> Option<usize> {
		self.actions.iter().position(|a| a.client_id == client_id)
	}

	fn rposition(&self, client_id: &str) -> Option<usize> {
		self.actions.iter().rposition(|a| a.client_id == client_id)
	}

	/// Components of `tree` whose subtrees were added dynamically.
	pub fn added_components(&self, tree: &ComponentTree) -> Vec<ComponentId> {
		self.actions
			.iter()
			.filter(|a| a.kind == DynamicActionKind::Add)
			.filter_map(|a| tree.find_by_client_id(&a.client_id))
			.collect()
	}

	/// Prepares the actions for saving: every add gets the current subtree
	/// of its component attached.
	///
	/// Adds whose component is no longer in the tree are dropped.
	pub fn capture(&self, tree: &ComponentTree) -> Vec<DynamicAction> {
		let mut saved = Vec::with_capacity(self.actions.len());
		for action in &self.actions {
			let mut action = action.clone();
			if action.kind == DynamicActionKind::Add {
				let Some(subtree) = tree
					.find_by_client_id(&action.client_id)
					.and_then(|id| tree.save_subtree(id))
				else {
					tracing::warn!(
						client_id = %action.client_id,
						"Unable to save dynamic action because the component cannot be found"
					);
					continue;
				};
				action.component = Some(subtree);
			}
			saved.push(action);
		}
		saved
	}
}
