//! Component nodes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state_helper::{ComponentStateHelper, StateHolder};
use crate::error::StateError;

/// Index of a node inside a [`ComponentTree`](super::ComponentTree).
///
/// Ids are only meaningful for the tree that issued them and are compared by
/// identity, so two structurally equal components are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
	/// Raw arena index.
	pub fn index(self) -> usize {
		self.0
	}
}

/// Resource a composite component was instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeResource {
	/// Library the resource lives in, e.g. `"ezcomp"`.
	pub library_name: String,
	/// File name of the composite definition, e.g. `"login.xhtml"`.
	pub resource_name: String,
}

impl CompositeResource {
	/// Creates a resource descriptor.
	pub fn new(library_name: impl Into<String>, resource_name: impl Into<String>) -> Self {
		Self {
			library_name: library_name.into(),
			resource_name: resource_name.into(),
		}
	}

	/// Whether a source file path plausibly refers to this resource.
	///
	/// The path must end with `/<resource_name>` and mention the library.
	pub fn matches_path(&self, path: &str) -> bool {
		path.ends_with(&format!("/{}", self.resource_name)) && path.contains(&self.library_name)
	}
}

/// Structural role of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
	/// Ordinary component.
	#[default]
	Plain,
	/// Scopes the ids of its descendants.
	NamingContainer,
	/// A form. Only prefixes descendant ids when `prepend_id` is set.
	Form {
		/// Whether the form id becomes part of descendant client ids.
		prepend_id: bool,
	},
	/// A composite component boundary. Always a naming container.
	Composite(CompositeResource),
}

impl ComponentKind {
	/// Whether the component scopes `find_component` lookups.
	pub fn is_naming_container(&self) -> bool {
		!matches!(self, Self::Plain)
	}

	/// Whether the component contributes a segment to descendant client ids.
	pub fn prepends_id(&self) -> bool {
		match self {
			Self::Plain => false,
			Self::Form { prepend_id } => *prepend_id,
			Self::NamingContainer | Self::Composite(_) => true,
		}
	}

	/// Whether the component is a form.
	pub fn is_form(&self) -> bool {
		matches!(self, Self::Form { .. })
	}

	/// Whether the component is a composite component boundary.
	pub fn is_composite(&self) -> bool {
		matches!(self, Self::Composite(_))
	}
}

/// A node of the component tree.
#[derive(Debug, Clone)]
pub struct ComponentNode {
	pub(crate) id: Option<String>,
	component_type: String,
	kind: ComponentKind,
	transient: bool,
	pub(crate) parent: Option<ComponentId>,
	pub(crate) children: Vec<ComponentId>,
	pub(crate) facets: IndexMap<String, ComponentId>,
	state: ComponentStateHelper,
}

impl ComponentNode {
	/// Creates a plain component of the given type.
	pub fn new(component_type: impl Into<String>) -> Self {
		Self {
			id: None,
			component_type: component_type.into(),
			kind: ComponentKind::Plain,
			transient: false,
			parent: None,
			children: Vec::new(),
			facets: IndexMap::new(),
			state: ComponentStateHelper::new(),
		}
	}

	/// Sets an explicit id. Components without one get a generated id when
	/// they are attached to a tree.
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Sets the structural role.
	pub fn with_kind(mut self, kind: ComponentKind) -> Self {
		self.kind = kind;
		self
	}

	/// Marks the component as a naming container.
	pub fn naming_container(self) -> Self {
		self.with_kind(ComponentKind::NamingContainer)
	}

	/// Marks the component as a form that prepends its id.
	pub fn form(self) -> Self {
		self.with_kind(ComponentKind::Form { prepend_id: true })
	}

	/// Marks the component as a composite component backed by `resource`.
	pub fn composite(self, library_name: impl Into<String>, resource_name: impl Into<String>) -> Self {
		self.with_kind(ComponentKind::Composite(CompositeResource::new(
			library_name,
			resource_name,
		)))
	}

	/// Excludes the component and its subtree from state saving.
	pub fn transient(mut self) -> Self {
		self.transient = true;
		self
	}

	/// Stores an initial attribute value.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
		self.state.put(key, value);
		self
	}

	/// Local id. Always present once the node is part of a tree.
	pub fn id(&self) -> &str {
		self.id.as_deref().unwrap_or_default()
	}

	/// Component type name.
	pub fn component_type(&self) -> &str {
		&self.component_type
	}

	/// Structural role.
	pub fn kind(&self) -> &ComponentKind {
		&self.kind
	}

	/// Composite resource, if this is a composite component.
	pub fn composite_resource(&self) -> Option<&CompositeResource> {
		match &self.kind {
			ComponentKind::Composite(resource) => Some(resource),
			_ => None,
		}
	}

	/// Whether this is a composite component boundary.
	pub fn is_composite(&self) -> bool {
		self.kind.is_composite()
	}

	/// Toggles the transient flag.
	pub fn set_transient(&mut self, transient: bool) {
		self.transient = transient;
	}

	/// Parent node, `None` for the root and for detached nodes.
	pub fn parent(&self) -> Option<ComponentId> {
		self.parent
	}

	/// Children in document order.
	pub fn children(&self) -> &[ComponentId] {
		&self.children
	}

	/// Facets in insertion order.
	pub fn facets(&self) -> &IndexMap<String, ComponentId> {
		&self.facets
	}

	/// Attribute storage.
	pub fn attributes(&self) -> &ComponentStateHelper {
		&self.state
	}

	/// Mutable attribute storage.
	pub fn attributes_mut(&mut self) -> &mut ComponentStateHelper {
		&mut self.state
	}

	/// Shorthand for `attributes_mut().put(..)`.
	pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Serialize) {
		self.state.put(key, value);
	}

	/// Shorthand for `attributes().get(..)`.
	pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.state.get(key)
	}

	/// See [`ComponentStateHelper::mark_initial_state`].
	pub fn mark_initial_state(&mut self) {
		self.state.mark_initial_state();
	}
}

impl StateHolder for ComponentNode {
	fn save_state(&self) -> Option<Value> {
		if self.transient {
			return None;
		}
		self.state.save_state()
	}

	fn restore_state(&mut self, state: &Value) -> Result<(), StateError> {
		self.state.restore_state(state)
	}

	fn is_transient(&self) -> bool {
		self.transient
	}
}

/// Self-contained serialized form of a component subtree.
///
/// Used for components added programmatically: the declarative rebuild does
/// not know about them, so their whole subtree has to be recreated from the
/// saved data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedComponent {
	/// Local id.
	pub id: String,
	/// Component type name.
	pub component_type: String,
	/// Structural role.
	pub kind: ComponentKind,
	/// Full attribute state.
	pub state: Value,
	/// Facets in insertion order.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub facets: Vec<(String, SavedComponent)>,
	/// Children in document order.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<SavedComponent>,
}
