//! View state saving and restoring.
//!
//! At the end of a request the component tree is captured into a
//! [`ViewSnapshot`] and either stored on the server or sealed into the page.
//! The token written to the page comes back with the postback, where the tree
//! is rebuilt from its declarative source and the snapshot applied on top.
//!
//! ## Flow
//!
//! ```text
//! render:   tree ─capture→ ViewSnapshot ─encode→ token ("3:7" | "stateless" | blob)
//! postback: token ─decode→ ViewSnapshot ─restore→ rebuilt tree
//! ```
//!
//! ## Example
//!
//! ```
//! use reinhardt_faces::component::{ComponentNode, ComponentTree};
//! use reinhardt_faces::context::FacesContext;
//! use reinhardt_faces::settings::FacesSettings;
//! use reinhardt_faces::state::ViewStateCodec;
//!
//! fn build() -> ComponentTree {
//!     let mut tree = ComponentTree::new("/hello.xhtml");
//!     tree.append_child(tree.root(), ComponentNode::new("faces.Input").with_id("name"))
//!         .unwrap();
//!     tree
//! }
//!
//! let codec = ViewStateCodec::new(&FacesSettings::default()).unwrap();
//!
//! let mut tree = build();
//! let name = tree.find_by_client_id("name").unwrap();
//! tree.node_mut(name).unwrap().set_attribute("value", "Ada");
//! let token = codec.encode(&mut FacesContext::new(), &tree).unwrap();
//!
//! let mut rebuilt = build();
//! codec.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token));
//! let name = rebuilt.find_by_client_id("name").unwrap();
//! assert_eq!(rebuilt.node(name).unwrap().attribute::<String>("value").as_deref(), Some("Ada"));
//! ```

mod codec;
mod dynamic;
mod guard;
mod restore;
mod snapshot;
mod store;
mod token;

pub use codec::{DecodeOutcome, ViewStateCodec};
pub use dynamic::{DynamicAction, DynamicActionKind, DynamicActions};
pub use guard::{KEY_LEN, StateGuard};
pub use restore::{RestoreReport, ViewRestorer};
pub use snapshot::{SavedStateEntry, ViewSnapshot};
pub use store::{ServerStateStore, StoreLimits, StoredPayload};
pub use token::{SEPARATOR, STATELESS_MARKER, ViewStateToken};
