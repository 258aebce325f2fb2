//! Applying a snapshot to a freshly rebuilt tree.

use std::collections::HashMap;

use super::dynamic::{DynamicAction, DynamicActionKind, DynamicActions};
use super::snapshot::ViewSnapshot;
use crate::component::{ComponentTree, Placement, StateHolder};

/// What a restore did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
	/// Entries applied to a component.
	pub applied: usize,
	/// Entries without a matching component.
	pub discarded_entries: usize,
	/// Components left at their rebuilt defaults.
	pub unmatched_components: usize,
	/// Entries a component refused to restore.
	pub failed: usize,
	/// Dynamic actions replayed.
	pub replayed_actions: usize,
	/// Dynamic actions that could not be replayed.
	pub skipped_actions: usize,
}

/// Restores saved state onto a tree rebuilt from its declarative source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewRestorer;

impl ViewRestorer {
	/// Walks `tree` in pre-order, applying each snapshot entry to the
	/// component with the same client id, then replays the snapshot's dynamic
	/// actions.
	///
	/// Matching is by client id alone, so reordered siblings still receive
	/// their own state. An entry is discarded only when no component carries
	/// its client id. Nothing in here fails the whole restore: mismatches are
	/// counted in the report and logged.
	pub fn restore(
		&self,
		tree: &mut ComponentTree,
		snapshot: &ViewSnapshot,
		dynamic: &mut DynamicActions,
	) -> RestoreReport {
		let mut report = RestoreReport::default();
		let positions: HashMap<&str, usize> = snapshot
			.entries
			.iter()
			.enumerate()
			.map(|(i, e)| (e.client_id.as_str(), i))
			.collect();
		let mut consumed = vec![false; snapshot.entries.len()];

		for (id, client_id) in tree.walk_with_client_ids(tree.root(), true) {
			let Some(&position) = positions.get(client_id.as_str()) else {
				report.unmatched_components += 1;
				continue;
			};
			consumed[position] = true;

			let Some(node) = tree.node_mut(id) else {
				continue;
			};
			match node.restore_state(&snapshot.entries[position].state) {
				Ok(()) => report.applied += 1,
				Err(err) => {
					tracing::warn!(client_id = %client_id, error = %err, "Failed to restore component state");
					report.failed += 1;
				}
			}
		}
		for (entry, _) in snapshot
			.entries
			.iter()
			.zip(&consumed)
			.filter(|(_, consumed)| !**consumed)
		{
			tracing::debug!(client_id = %entry.client_id, "Discarding saved state without component");
			report.discarded_entries += 1;
		}

		for action in &snapshot.dynamic_actions {
			if replay(tree, action) {
				report.replayed_actions += 1;
			} else {
				report.skipped_actions += 1;
			}
			dynamic.record_replayed(DynamicAction {
				component: None,
				..action.clone()
			});
		}

		tracing::debug!(
			view_id = %tree.view_id(),
			applied = report.applied,
			discarded = report.discarded_entries,
			unmatched = report.unmatched_components,
			replayed = report.replayed_actions,
			"Restored view state"
		);
		report
	}
}

fn replay(tree: &mut ComponentTree, action: &DynamicAction) -> bool {
	match action.kind {
		DynamicActionKind::Add => {
			let Some(parent) = action
				.parent_client_id
				.as_deref()
				.and_then(|p| tree.find_by_client_id(p))
			else {
				tracing::warn!(client_id = %action.client_id, "Parent of dynamically added component not found");
				return false;
			};
			let Some(saved) = &action.component else {
				tracing::warn!(client_id = %action.client_id, "Dynamically added component has no saved state");
				return false;
			};
			// the rebuild may already have created it; re-add in the recorded place
			if let Some(existing) = tree.find_by_client_id(&action.client_id) {
				tree.remove(existing);
			}
			let placement = match &action.facet_name {
				Some(name) => Placement::Facet(name.clone()),
				None => Placement::Child(action.index),
			};
			tree.insert_saved(parent, saved, placement).is_some()
		}
		DynamicActionKind::Remove => match tree.find_by_client_id(&action.client_id) {
			Some(target) => tree.remove(target),
			None => {
				tracing::warn!(client_id = %action.client_id, "Dynamically removed component not found");
				false
			}
		},
	}
}
