//! Component tree model.
//!
//! ## Structure
//!
//! - **ComponentTree**: arena owning every node of one view
//! - **ComponentNode**: id, type, structural role, children, facets, attributes
//! - **ComponentStateHelper**: attribute storage with partial state saving
//!
//! ## Usage
//!
//! ```
//! use reinhardt_faces::component::{ComponentNode, ComponentTree};
//!
//! let mut tree = ComponentTree::new("/login.xhtml");
//! let form = tree
//!     .append_child(tree.root(), ComponentNode::new("faces.Form").with_id("login").form())
//!     .unwrap();
//! let user = tree
//!     .append_child(form, ComponentNode::new("faces.Input").with_id("user"))
//!     .unwrap();
//!
//! assert_eq!(tree.client_id(user).as_deref(), Some("login:user"));
//! ```

mod node;
mod state_helper;
mod tree;

pub use node::{ComponentId, ComponentKind, ComponentNode, CompositeResource, SavedComponent};
pub use state_helper::{ComponentStateHelper, StateHolder};
pub use tree::{
	ComponentTree, NAMING_CONTAINER_SEPARATOR, Placement, UNIQUE_ID_PREFIX, VIEW_ROOT_TYPE,
};
