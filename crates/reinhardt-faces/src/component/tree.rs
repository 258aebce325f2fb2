//! Arena-backed component tree.
//!
//! Nodes are addressed by [`ComponentId`]. Removing a node frees the slots of
//! its whole subtree; slots are never reused within one tree, so a stale id
//! simply resolves to `None`.

use std::collections::HashSet;

use super::node::{ComponentId, ComponentNode, SavedComponent};
use super::state_helper::StateHolder;
use crate::error::ViewStateError;

/// Prefix of generated component ids.
pub const UNIQUE_ID_PREFIX: &str = "j_id";

/// Separator between naming container segments in a client id.
pub const NAMING_CONTAINER_SEPARATOR: char = ':';

/// Component type of the view root.
pub const VIEW_ROOT_TYPE: &str = "faces.ViewRoot";

/// Where a saved subtree is re-attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
	/// As a child, at the given index or appended when `None` or out of range.
	Child(Option<usize>),
	/// As the named facet, replacing any existing one.
	Facet(String),
}

/// A component tree for one view.
#[derive(Debug, Clone)]
pub struct ComponentTree {
	view_id: String,
	slots: Vec<Option<ComponentNode>>,
	root: ComponentId,
	next_generated_id: u32,
	transient: bool,
}

impl ComponentTree {
	/// Creates a tree holding only a view root.
	pub fn new(view_id: impl Into<String>) -> Self {
		let mut tree = Self {
			view_id: view_id.into(),
			slots: Vec::new(),
			root: ComponentId(0),
			next_generated_id: 1,
			transient: false,
		};
		tree.root = tree.alloc(ComponentNode::new(VIEW_ROOT_TYPE));
		tree
	}

	/// View identifier, e.g. `"/index.xhtml"`.
	pub fn view_id(&self) -> &str {
		&self.view_id
	}

	/// The view root.
	pub fn root(&self) -> ComponentId {
		self.root
	}

	/// Whether the whole view is excluded from state saving, either through
	/// the view flag or through the root node's own transient flag.
	pub fn is_transient(&self) -> bool {
		self.transient || self.node(self.root).is_some_and(|root| root.is_transient())
	}

	/// Marks the whole view as stateless.
	pub fn set_transient(&mut self, transient: bool) {
		self.transient = transient;
	}

	/// Number of live nodes, including the root.
	pub fn len(&self) -> usize {
		self.slots.iter().filter(|slot| slot.is_some()).count()
	}

	/// Always `false`: a tree has at least its root.
	pub fn is_empty(&self) -> bool {
		false
	}

	/// Returns the node for `id`.
	pub fn node(&self, id: ComponentId) -> Option<&ComponentNode> {
		self.slots.get(id.0).and_then(Option::as_ref)
	}

	/// Returns the node for `id` mutably.
	pub fn node_mut(&mut self, id: ComponentId) -> Option<&mut ComponentNode> {
		self.slots.get_mut(id.0).and_then(Option::as_mut)
	}

	/// Whether `id` refers to a live node.
	pub fn contains(&self, id: ComponentId) -> bool {
		self.node(id).is_some()
	}

	/// Produces the next generated id.
	pub fn generate_id(&mut self) -> String {
		let id = format!("{}{}", UNIQUE_ID_PREFIX, self.next_generated_id);
		self.next_generated_id += 1;
		id
	}

	fn alloc(&mut self, mut node: ComponentNode) -> ComponentId {
		if node.id.is_none() {
			node.id = Some(self.generate_id());
		}
		node.parent = None;
		node.children.clear();
		node.facets.clear();
		self.slots.push(Some(node));
		ComponentId(self.slots.len() - 1)
	}

	/// Appends `node` as the last child of `parent`.
	pub fn append_child(&mut self, parent: ComponentId, node: ComponentNode) -> Option<ComponentId> {
		self.insert_child(parent, usize::MAX, node)
	}

	/// Inserts `node` as a child of `parent` at `index`, appending when the
	/// index is out of range.
	pub fn insert_child(
		&mut self,
		parent: ComponentId,
		index: usize,
		node: ComponentNode,
	) -> Option<ComponentId> {
		if !self.contains(parent) {
			return None;
		}
		let id = self.alloc(node);
		if let Some(child) = self.node_mut(id) {
			child.parent = Some(parent);
		}
		let parent_node = self.node_mut(parent)?;
		let index = index.min(parent_node.children.len());
		parent_node.children.insert(index, id);
		Some(id)
	}

	/// Installs `node` as facet `name` of `parent`, dropping any previous facet
	/// of that name.
	pub fn set_facet(
		&mut self,
		parent: ComponentId,
		name: impl Into<String>,
		node: ComponentNode,
	) -> Option<ComponentId> {
		let name = name.into();
		let previous = self.node(parent)?.facets.get(&name).copied();
		if let Some(previous) = previous {
			self.remove(previous);
		}
		let id = self.alloc(node);
		if let Some(facet) = self.node_mut(id) {
			facet.parent = Some(parent);
		}
		self.node_mut(parent)?.facets.insert(name, id);
		Some(id)
	}

	/// Detaches `id` from its parent and drops its subtree.
	///
	/// Returns `false` for the root or an unknown id.
	pub fn remove(&mut self, id: ComponentId) -> bool {
		if id == self.root || !self.contains(id) {
			return false;
		}
		if let Some(parent) = self.parent(id)
			&& let Some(parent_node) = self.node_mut(parent)
		{
			parent_node.children.retain(|c| *c != id);
			parent_node.facets.retain(|_, f| *f != id);
		}
		for doomed in self.pre_order(id) {
			self.slots[doomed.0] = None;
		}
		true
	}

	/// Parent of `id`.
	pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
		self.node(id).and_then(ComponentNode::parent)
	}

	/// Children of `id` in document order.
	pub fn children(&self, id: ComponentId) -> &[ComponentId] {
		self.node(id).map(ComponentNode::children).unwrap_or_default()
	}

	/// Facet name of `id` within its parent, if it is a facet.
	pub fn facet_name(&self, id: ComponentId) -> Option<&str> {
		let parent = self.node(self.parent(id)?)?;
		parent
			.facets
			.iter()
			.find(|(_, f)| **f == id)
			.map(|(name, _)| name.as_str())
	}

	/// Position of `id` among its parent's children.
	pub fn index_in_parent(&self, id: ComponentId) -> Option<usize> {
		self.children(self.parent(id)?).iter().position(|c| *c == id)
	}

	/// Sibling following `id` in document order.
	pub fn next_sibling(&self, id: ComponentId) -> Option<ComponentId> {
		let idx = self.index_in_parent(id)?;
		self.children(self.parent(id)?).get(idx + 1).copied()
	}

	/// Sibling preceding `id` in document order.
	pub fn previous_sibling(&self, id: ComponentId) -> Option<ComponentId> {
		let idx = self.index_in_parent(id)?;
		let prev = idx.checked_sub(1)?;
		self.children(self.parent(id)?).get(prev).copied()
	}

	/// Facets then children of `id`: the traversal order shared by state
	/// capture and restore.
	pub fn facets_and_children(&self, id: ComponentId) -> Vec<ComponentId> {
		match self.node(id) {
			Some(node) => node
				.facets
				.values()
				.copied()
				.chain(node.children.iter().copied())
				.collect(),
			None => Vec::new(),
		}
	}

	/// Pre-order walk starting at `from`.
	pub fn pre_order(&self, from: ComponentId) -> Vec<ComponentId> {
		let mut out = Vec::new();
		let mut stack = vec![from];
		while let Some(id) = stack.pop() {
			if !self.contains(id) {
				continue;
			}
			out.push(id);
			stack.extend(self.facets_and_children(id).into_iter().rev());
		}
		out
	}

	/// Pre-order walk with client ids, skipping transient subtrees when
	/// `skip_transient` is set.
	pub fn walk_with_client_ids(
		&self,
		from: ComponentId,
		skip_transient: bool,
	) -> Vec<(ComponentId, String)> {
		let mut out = Vec::new();
		let Some(prefix) = self.client_id_prefix(from) else {
			return out;
		};
		let mut stack = vec![(from, prefix)];
		while let Some((id, prefix)) = stack.pop() {
			let Some(node) = self.node(id) else {
				continue;
			};
			if skip_transient && node.is_transient() {
				continue;
			}
			let client_id = join_client_id(&prefix, node.id());
			let child_prefix = if node.kind().prepends_id() {
				client_id.clone()
			} else {
				prefix
			};
			for child in self.facets_and_children(id).into_iter().rev() {
				stack.push((child, child_prefix.clone()));
			}
			out.push((id, client_id));
		}
		out
	}

	fn client_id_prefix(&self, id: ComponentId) -> Option<String> {
		self.node(id)?;
		let mut segments = Vec::new();
		let mut cursor = self.parent(id);
		while let Some(ancestor) = cursor {
			let node = self.node(ancestor)?;
			if node.kind().prepends_id() {
				segments.push(node.id().to_string());
			}
			cursor = node.parent();
		}
		segments.reverse();
		Some(segments.join(&NAMING_CONTAINER_SEPARATOR.to_string()))
	}

	/// Client id of `id`: enclosing naming container ids plus the local id.
	pub fn client_id(&self, id: ComponentId) -> Option<String> {
		let prefix = self.client_id_prefix(id)?;
		Some(join_client_id(&prefix, self.node(id)?.id()))
	}

	/// Finds the component with the given client id anywhere in the tree.
	pub fn find_by_client_id(&self, client_id: &str) -> Option<ComponentId> {
		self.walk_with_client_ids(self.root, false)
			.into_iter()
			.find(|(_, cid)| cid == client_id)
			.map(|(id, _)| id)
	}

	/// Closest ancestor of `id` matching `predicate`, optionally including `id`.
	pub fn closest(
		&self,
		id: ComponentId,
		include_self: bool,
		predicate: impl Fn(&ComponentNode) -> bool,
	) -> Option<ComponentId> {
		let mut cursor = if include_self {
			Some(id)
		} else {
			self.parent(id)
		};
		while let Some(current) = cursor {
			let node = self.node(current)?;
			if predicate(node) {
				return Some(current);
			}
			cursor = node.parent();
		}
		None
	}

	/// Closest enclosing naming container, `id` itself included.
	pub fn closest_naming_container(&self, id: ComponentId) -> Option<ComponentId> {
		self.closest(id, true, |n| n.kind().is_naming_container())
	}

	/// Closest enclosing form, `id` itself included.
	pub fn closest_form(&self, id: ComponentId) -> Option<ComponentId> {
		self.closest(id, true, |n| n.kind().is_form())
	}

	/// Nearest composite component strictly above `id`.
	pub fn composite_parent(&self, id: ComponentId) -> Option<ComponentId> {
		self.closest(id, false, ComponentNode::is_composite)
	}

	/// Whether `id` is a composite component.
	pub fn is_composite(&self, id: ComponentId) -> bool {
		self.node(id).is_some_and(ComponentNode::is_composite)
	}

	/// Naming-container relative lookup.
	///
	/// A leading separator makes the expression absolute. Otherwise the search
	/// starts at the closest naming container around `base` (or the root).
	/// Every segment but the last has to resolve to a naming container.
	pub fn find_component(&self, base: ComponentId, expression: &str) -> Option<ComponentId> {
		if expression.is_empty() {
			return None;
		}
		let (mut scope, expression) =
			match expression.strip_prefix(NAMING_CONTAINER_SEPARATOR) {
				Some(rest) => (self.root, rest),
				None => (
					self.closest_naming_container(base).unwrap_or(self.root),
					expression,
				),
			};

		let mut segments = expression.split(NAMING_CONTAINER_SEPARATOR).peekable();
		while let Some(segment) = segments.next() {
			let found = self.find_in_scope(scope, segment)?;
			if segments.peek().is_none() {
				return Some(found);
			}
			if !self.node(found)?.kind().is_naming_container() {
				return None;
			}
			scope = found;
		}
		None
	}

	fn find_in_scope(&self, scope: ComponentId, id: &str) -> Option<ComponentId> {
		if self.node(scope)?.id() == id {
			return Some(scope);
		}
		let mut stack: Vec<ComponentId> = self.facets_and_children(scope).into_iter().rev().collect();
		while let Some(current) = stack.pop() {
			let node = self.node(current)?;
			if node.id() == id {
				return Some(current);
			}
			if !node.kind().is_naming_container() {
				stack.extend(self.facets_and_children(current).into_iter().rev());
			}
		}
		None
	}

	/// Fails on the first client id used by two components.
	pub fn check_id_uniqueness(&self) -> Result<(), ViewStateError> {
		let mut seen = HashSet::new();
		for (_, client_id) in self.walk_with_client_ids(self.root, false) {
			if !seen.insert(client_id.clone()) {
				return Err(ViewStateError::DuplicateClientId(client_id));
			}
		}
		Ok(())
	}

	/// Marks the initial state of every node. Called once the view has been
	/// built from its declarative source.
	pub fn mark_initial_state(&mut self) {
		for id in self.pre_order(self.root) {
			if let Some(node) = self.node_mut(id) {
				node.mark_initial_state();
			}
		}
	}

	/// Serializes the subtree rooted at `id` with full attribute state.
	pub fn save_subtree(&self, id: ComponentId) -> Option<SavedComponent> {
		let node = self.node(id)?;
		let facets = node
			.facets
			.iter()
			.filter_map(|(name, f)| Some((name.clone(), self.save_subtree(*f)?)))
			.collect();
		let children = node
			.children
			.iter()
			.filter_map(|c| self.save_subtree(*c))
			.collect();
		Some(SavedComponent {
			id: node.id().to_string(),
			component_type: node.component_type().to_string(),
			kind: node.kind().clone(),
			state: node.attributes().save_full_state(),
			facets,
			children,
		})
	}

	/// Recreates a saved subtree under `parent`.
	pub fn insert_saved(
		&mut self,
		parent: ComponentId,
		saved: &SavedComponent,
		placement: Placement,
	) -> Option<ComponentId> {
		let mut node = ComponentNode::new(saved.component_type.clone())
			.with_id(saved.id.clone())
			.with_kind(saved.kind.clone());
		if let Err(err) = node.restore_state(&saved.state) {
			tracing::warn!(
				component_id = %saved.id,
				error = %err,
				"Discarding unreadable state of re-created component"
			);
		}

		let id = match placement {
			Placement::Child(Some(index)) => self.insert_child(parent, index, node)?,
			Placement::Child(None) => self.append_child(parent, node)?,
			Placement::Facet(name) => self.set_facet(parent, name, node)?,
		};
		for (name, facet) in &saved.facets {
			self.insert_saved(id, facet, Placement::Facet(name.clone()));
		}
		for child in &saved.children {
			self.insert_saved(id, child, Placement::Child(None));
		}
		Some(id)
	}
}

fn join_client_id(prefix: &str, id: &str) -> String {
	if prefix.is_empty() {
		id.to_string()
	} else {
		format!("{}{}{}", prefix, NAMING_CONTAINER_SEPARATOR, id)
	}
}
