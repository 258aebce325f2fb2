//! Per-request processing context.

use crate::component::{ComponentId, ComponentNode, ComponentTree};
use crate::composite::{CompositeStackManager, Location};
use crate::error::ViewStateResult;
use crate::state::DynamicActions;

/// State that lives for exactly one request.
///
/// Created when a request starts and dropped when it ends. Nothing in here is
/// shared between requests; the only cross-request state is the
/// [`ServerStateStore`](crate::state::ServerStateStore).
#[derive(Debug, Clone, Default)]
pub struct FacesContext {
	composite_stacks: CompositeStackManager,
	current_composite: Option<ComponentId>,
	dynamic_actions: DynamicActions,
	cached_view_state: Option<String>,
	restored_sequence: Option<(i64, i64)>,
	partial_request: bool,
}

impl FacesContext {
	/// Context for a full page request.
	pub fn new() -> Self {
		Self::default()
	}

	/// Context for a partial (ajax) request.
	pub fn partial() -> Self {
		Self {
			partial_request: true,
			..Self::default()
		}
	}

	/// Whether this is a partial request.
	pub fn is_partial_request(&self) -> bool {
		self.partial_request
	}

	/// Both composite component stacks.
	pub fn composite_stacks(&self) -> &CompositeStackManager {
		&self.composite_stacks
	}

	/// Both composite component stacks, mutably.
	pub fn composite_stacks_mut(&mut self) -> &mut CompositeStackManager {
		&mut self.composite_stacks
	}

	/// The composite component the lifecycle is currently processing.
	pub fn current_composite(&self) -> Option<ComponentId> {
		self.current_composite
	}

	/// Updates the current composite component.
	pub fn set_current_composite(&mut self, component: Option<ComponentId>) {
		self.current_composite = component;
	}

	/// Pushes onto the evaluation stack, falling back to the current composite
	/// component. See [`CompositeStackManager::push_evaluation`].
	pub fn push_composite_evaluation(
		&mut self,
		tree: &ComponentTree,
		candidate: Option<ComponentId>,
	) -> bool {
		let ambient = self.current_composite;
		self.composite_stacks.push_evaluation(tree, candidate, ambient)
	}

	/// Resolves the composite component defined at `location`, falling back to
	/// the current composite component.
	pub fn composite_at(&self, tree: &ComponentTree, location: &Location) -> Option<ComponentId> {
		self.composite_stacks
			.find_composite_using_location(tree, location, self.current_composite)
	}

	/// Programmatic adds and removes recorded so far.
	pub fn dynamic_actions(&self) -> &DynamicActions {
		&self.dynamic_actions
	}

	pub(crate) fn dynamic_actions_mut(&mut self) -> &mut DynamicActions {
		&mut self.dynamic_actions
	}

	/// Appends `node` under `parent` and records the addition so it survives
	/// the next rebuild.
	pub fn add_child(
		&mut self,
		tree: &mut ComponentTree,
		parent: ComponentId,
		node: ComponentNode,
	) -> ViewStateResult<Option<ComponentId>> {
		let Some(id) = tree.append_child(parent, node) else {
			return Ok(None);
		};
		self.dynamic_actions.record_add(tree, id)?;
		Ok(Some(id))
	}

	/// Inserts `node` under `parent` at `index` and records the addition.
	pub fn insert_child(
		&mut self,
		tree: &mut ComponentTree,
		parent: ComponentId,
		index: usize,
		node: ComponentNode,
	) -> ViewStateResult<Option<ComponentId>> {
		let Some(id) = tree.insert_child(parent, index, node) else {
			return Ok(None);
		};
		self.dynamic_actions.record_add(tree, id)?;
		Ok(Some(id))
	}

	/// Installs `node` as facet `name` of `parent` and records the addition.
	pub fn add_facet(
		&mut self,
		tree: &mut ComponentTree,
		parent: ComponentId,
		name: &str,
		node: ComponentNode,
	) -> ViewStateResult<Option<ComponentId>> {
		let Some(id) = tree.set_facet(parent, name, node) else {
			return Ok(None);
		};
		self.dynamic_actions.record_add(tree, id)?;
		Ok(Some(id))
	}

	/// Removes `id` and records the removal.
	pub fn remove_component(&mut self, tree: &mut ComponentTree, id: ComponentId) -> ViewStateResult<bool> {
		if id == tree.root() || !tree.contains(id) {
			return Ok(false);
		}
		self.dynamic_actions.record_remove(tree, id)?;
		Ok(tree.remove(id))
	}

	/// Token already written for this request, if any.
	pub fn cached_view_state(&self) -> Option<&str> {
		self.cached_view_state.as_deref()
	}

	pub(crate) fn set_cached_view_state(&mut self, token: String) {
		self.cached_view_state = Some(token);
	}

	/// `(logical, actual)` of the server state this request was restored from.
	pub fn restored_sequence(&self) -> Option<(i64, i64)> {
		self.restored_sequence
	}

	pub(crate) fn set_restored_sequence(&mut self, logical: i64, actual: i64) {
		self.restored_sequence = Some((logical, actual));
	}

	/// Ends the request: clears both stacks and the cached token.
	pub fn release(&mut self) {
		self.composite_stacks.reset();
		self.current_composite = None;
		self.cached_view_state = None;
	}
}
