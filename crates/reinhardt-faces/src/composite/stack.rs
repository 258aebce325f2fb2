//! The two composite component stacks.
//!
//! They are deliberately separate types: a frame pushed on one can only be
//! popped from the same one.

use crate::component::{ComponentId, ComponentTree};

/// Composite components currently being built from their declarative source.
///
/// The backing storage only exists while at least one frame is pushed. Popping
/// the last frame drops it again, so [`is_active`](Self::is_active) tells
/// whether tree construction is in progress.
#[derive(Debug, Clone, Default)]
pub struct TreeCreationStack {
	frames: Option<Vec<ComponentId>>,
}

impl TreeCreationStack {
	/// Creates an inactive stack.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes `component` and reports whether a push happened.
	///
	/// # Panics
	///
	/// Panics if `component` is not a composite component of `tree`. Pushing
	/// anything else is a bug in the caller.
	pub fn push(&mut self, tree: &ComponentTree, component: Option<ComponentId>) -> bool {
		let Some(component) = component else {
			return false;
		};
		assert!(
			tree.is_composite(component),
			"only composite components may be pushed onto the tree creation stack, got {:?}",
			tree.client_id(component)
		);
		self.frames.get_or_insert_with(Vec::new).push(component);
		true
	}

	/// Removes the top frame. The backing storage is dropped once empty.
	pub fn pop(&mut self) -> Option<ComponentId> {
		let frames = self.frames.as_mut()?;
		let top = frames.pop();
		if frames.is_empty() {
			self.frames = None;
		}
		top
	}

	/// Top frame, if any.
	pub fn peek(&self) -> Option<ComponentId> {
		self.frames.as_ref().and_then(|f| f.last().copied())
	}

	/// Whether the backing storage currently exists.
	pub fn is_active(&self) -> bool {
		self.frames.is_some()
	}

	/// Number of frames.
	pub fn len(&self) -> usize {
		self.frames.as_ref().map_or(0, Vec::len)
	}

	/// Whether no frames are pushed.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Frames from bottom to top.
	pub fn frames(&self) -> &[ComponentId] {
		self.frames.as_deref().unwrap_or_default()
	}

	/// The frame directly below `component`.
	///
	/// `None` when `component` is the bottom frame, was never pushed, or the
	/// stack is inactive.
	pub fn parent_of(&self, component: ComponentId) -> Option<ComponentId> {
		let frames = self.frames.as_ref()?;
		let idx = frames.iter().position(|f| *f == component)?;
		idx.checked_sub(1).and_then(|i| frames.get(i).copied())
	}

	/// Drops all frames.
	pub fn delete(&mut self) {
		self.frames = None;
	}
}

/// Composite components entered while evaluating expressions after the tree
/// has been built.
#[derive(Debug, Clone, Default)]
pub struct EvaluationStack {
	frames: Vec<ComponentId>,
}

impl EvaluationStack {
	/// Creates an empty stack.
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn push(&mut self, component: ComponentId) {
		self.frames.push(component);
	}

	/// Removes the top frame.
	pub fn pop(&mut self) -> Option<ComponentId> {
		self.frames.pop()
	}

	/// Top frame, if any.
	pub fn peek(&self) -> Option<ComponentId> {
		self.frames.last().copied()
	}

	/// Number of frames.
	pub fn len(&self) -> usize {
		self.frames.len()
	}

	/// Whether no frames are pushed.
	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	/// Frames from bottom to top.
	pub fn frames(&self) -> &[ComponentId] {
		&self.frames
	}

	/// Drops all frames.
	pub fn clear(&mut self) {
		self.frames.clear();
	}
}
