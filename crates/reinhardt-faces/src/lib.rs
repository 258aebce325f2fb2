//! Reinhardt Faces - server-side component trees that survive the round trip
//!
//! A page is a tree of components rebuilt from its declarative source on every
//! request. Whatever users or handlers changed on the previous request lives in
//! the view state: saved when the response is rendered, handed back with the
//! postback and applied onto the freshly rebuilt tree.
//!
//! ## Features
//!
//! - **Three saving modes**: server-side store addressed by a short token,
//!   encrypted client-side blob, or stateless views
//! - **Bounded server store**: LRU caps on logical views and states per view
//! - **Drift tolerant restore**: state is matched by client id, stale entries
//!   are dropped and new components keep their defaults
//! - **Dynamic components**: programmatic adds and removes are replayed
//! - **Composite scoping**: tree creation and evaluation stacks answer "which
//!   composite component am I inside"
//! - **Search expressions**: `@form`, `@parent:@child(0)` and friends
//!
//! ## Modules
//!
//! - [`component`]: component nodes and the arena tree
//! - [`composite`]: composite component stacks
//! - [`context`]: per-request context
//! - [`state`]: encode, decode and restore of view state
//! - [`search`]: search expression resolution
//! - [`settings`]: configuration from TOML or the environment
//! - [`error`]: error types

pub mod component;
pub mod composite;
pub mod context;
pub mod error;
pub mod search;
pub mod settings;
pub mod state;

pub use component::{ComponentId, ComponentNode, ComponentTree};
pub use composite::{CompositeStackManager, Location};
pub use context::FacesContext;
pub use error::{SearchError, SettingsError, StateError, TokenError, ViewStateError};
pub use search::{SearchExpressionContext, SearchExpressionResolver, SearchHint};
pub use settings::{FacesSettings, StateSavingMethod};
pub use state::{DecodeOutcome, RestoreReport, ViewStateCodec, ViewStateToken};
