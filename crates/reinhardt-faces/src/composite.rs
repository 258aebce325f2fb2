//! Tracking of the composite component currently in scope.
//!
//! Expressions such as `#{cc.attrs.label}` need to know which composite
//! component they belong to. While a view is being built from its declarative
//! source the answer comes from the [`TreeCreationStack`]; afterwards, while
//! expressions are evaluated during the other phases, from the
//! [`EvaluationStack`] combined with the live tree.
//!
//! The "current composite component" maintained by the surrounding lifecycle
//! is passed in explicitly as `ambient` wherever it is consulted.

mod location;
mod stack;

pub use location::Location;
pub use stack::{EvaluationStack, TreeCreationStack};

use crate::component::{ComponentId, ComponentTree};

/// Owns both composite component stacks of one request.
#[derive(Debug, Clone, Default)]
pub struct CompositeStackManager {
	tree_creation: TreeCreationStack,
	evaluation: EvaluationStack,
}

impl CompositeStackManager {
	/// Creates a manager with both stacks empty.
	pub fn new() -> Self {
		Self::default()
	}

	/// The tree creation stack.
	pub fn tree_creation(&self) -> &TreeCreationStack {
		&self.tree_creation
	}

	/// The evaluation stack.
	pub fn evaluation(&self) -> &EvaluationStack {
		&self.evaluation
	}

	/// Pushes a composite component entered during tree construction.
	///
	/// # Panics
	///
	/// See [`TreeCreationStack::push`].
	pub fn push_tree_creation(&mut self, tree: &ComponentTree, component: Option<ComponentId>) -> bool {
		let pushed = self.tree_creation.push(tree, component);
		if pushed {
			tracing::trace!(depth = self.tree_creation.len(), "Pushed tree creation frame");
		}
		pushed
	}

	/// Pops the tree creation stack.
	pub fn pop_tree_creation(&mut self) -> Option<ComponentId> {
		self.tree_creation.pop()
	}

	/// Top of the tree creation stack.
	pub fn peek_tree_creation(&self) -> Option<ComponentId> {
		self.tree_creation.peek()
	}

	/// Pushes a frame onto the evaluation stack.
	///
	/// The frame is chosen as follows:
	///
	/// 1. While the tree creation stack is active, `candidate` is pushed as is.
	///    The composite parent cannot be derived reliably from the half-built
	///    tree at that point.
	/// 2. Otherwise a given `candidate` is pushed.
	/// 3. Otherwise the composite parent of the evaluation stack's top frame.
	/// 4. Otherwise the composite parent of `ambient`.
	///
	/// Returns `false` if no frame could be determined.
	pub fn push_evaluation(
		&mut self,
		tree: &ComponentTree,
		candidate: Option<ComponentId>,
		ambient: Option<ComponentId>,
	) -> bool {
		let frame = if self.tree_creation.is_active() {
			candidate
		} else {
			candidate.or_else(|| match self.evaluation.peek() {
				Some(top) => tree.composite_parent(top),
				None => ambient.and_then(|current| tree.composite_parent(current)),
			})
		};

		match frame {
			Some(frame) => {
				self.evaluation.push(frame);
				true
			}
			None => false,
		}
	}

	/// Pops the evaluation stack.
	pub fn pop_evaluation(&mut self) -> Option<ComponentId> {
		self.evaluation.pop()
	}

	/// Top of the evaluation stack.
	pub fn peek_evaluation(&self) -> Option<ComponentId> {
		self.evaluation.peek()
	}

	/// Parent of `component` according to the tree creation stack.
	pub fn tree_creation_parent(&self, component: ComponentId) -> Option<ComponentId> {
		self.tree_creation.parent_of(component)
	}

	/// Parent of `component` during evaluation: its composite parent in the
	/// live tree. The evaluation stack's frames play no part in the answer.
	pub fn evaluation_parent(&self, tree: &ComponentTree, component: ComponentId) -> Option<ComponentId> {
		tree.composite_parent(component)
	}

	/// Finds the composite component whose definition file is `location`.
	///
	/// During tree construction the stack is searched from the top. Otherwise
	/// the composite parent chain of `ambient` is walked. If neither yields a
	/// match, `ambient` itself is returned: the location then usually belongs
	/// to an expression that refers one composite level up.
	pub fn find_composite_using_location(
		&self,
		tree: &ComponentTree,
		location: &Location,
		ambient: Option<ComponentId>,
	) -> Option<ComponentId> {
		let defined_at = |id: ComponentId| {
			tree.node(id)
				.and_then(|n| n.composite_resource())
				.is_some_and(|r| r.matches_path(&location.path))
		};

		let found = if self.tree_creation.is_active() {
			self.tree_creation
				.frames()
				.iter()
				.rev()
				.copied()
				.find(|id| defined_at(*id))
		} else {
			let mut cursor = ambient;
			let mut found = None;
			while let Some(current) = cursor {
				if defined_at(current) {
					found = Some(current);
					break;
				}
				cursor = tree.composite_parent(current);
			}
			found
		};

		found.or_else(|| {
			tracing::debug!(%location, "No composite component defined at location, using current");
			ambient
		})
	}

	/// Clears both stacks at the end of a request.
	pub fn reset(&mut self) {
		self.tree_creation.delete();
		self.evaluation.clear();
	}
}
