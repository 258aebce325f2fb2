//! Turning view snapshots into tokens and back.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use rand::Rng;

use super::guard::{StateGuard, gunzip, gzip};
use super::restore::{RestoreReport, ViewRestorer};
use super::snapshot::ViewSnapshot;
use super::store::{ServerStateStore, StoredPayload};
use super::token::ViewStateToken;
use crate::component::ComponentTree;
use crate::context::FacesContext;
use crate::error::{ViewStateError, ViewStateResult};
use crate::settings::{FacesSettings, StateSavingMethod};

/// Result of decoding an incoming token.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
	/// The view was rendered as stateless.
	Stateless,
	/// A snapshot was found.
	Restored(Arc<ViewSnapshot>),
	/// No token, or the referenced state is gone. Treat as a first visit.
	Missing,
}

impl DecodeOutcome {
	/// The snapshot, if one was found.
	pub fn snapshot(&self) -> Option<&Arc<ViewSnapshot>> {
		match self {
			Self::Restored(snapshot) => Some(snapshot),
			_ => None,
		}
	}
}

#[derive(Debug)]
enum SequenceGenerator {
	Incremental(AtomicI64),
	Random,
}

impl SequenceGenerator {
	fn next(&self) -> i64 {
		match self {
			Self::Incremental(counter) => counter.fetch_add(1, Ordering::Relaxed),
			Self::Random => rand::thread_rng().gen_range(0..i64::MAX),
		}
	}
}

/// Encodes and decodes view state according to [`FacesSettings`].
///
/// One codec is shared by all requests of an application.
#[derive(Debug)]
pub struct ViewStateCodec {
	method: StateSavingMethod,
	compress: bool,
	serialize_server_state: bool,
	store: Arc<ServerStateStore>,
	guard: StateGuard,
	sequences: SequenceGenerator,
}

impl ViewStateCodec {
	/// Creates a codec with its own server store.
	pub fn new(settings: &FacesSettings) -> ViewStateResult<Self> {
		let store = Arc::new(ServerStateStore::new(settings.store_limits()));
		Self::with_store(settings, store)
	}

	/// Creates a codec backed by an existing store.
	pub fn with_store(settings: &FacesSettings, store: Arc<ServerStateStore>) -> ViewStateResult<Self> {
		let guard = StateGuard::from_secret(
			settings.client_state_secret.as_deref(),
			settings.compress_view_state,
		)?;
		let sequences = if settings.generate_unique_server_state_ids {
			SequenceGenerator::Random
		} else {
			SequenceGenerator::Incremental(AtomicI64::new(1))
		};
		Ok(Self {
			method: settings.state_saving_method,
			compress: settings.compress_view_state,
			serialize_server_state: settings.serialize_server_state,
			store,
			guard,
			sequences,
		})
	}

	/// Configured saving method.
	pub fn method(&self) -> StateSavingMethod {
		self.method
	}

	/// The server store.
	pub fn store(&self) -> &Arc<ServerStateStore> {
		&self.store
	}

	/// Captures `tree` and returns the token to embed in the response.
	///
	/// Repeated calls within one request return the token of the first call.
	/// A transient view yields the stateless marker.
	///
	/// In server mode a postback keeps its logical view sequence. A partial
	/// request additionally overwrites the snapshot it was restored from, so
	/// ajax traffic does not push older full-page states out of the store.
	pub fn encode(&self, ctx: &mut FacesContext, tree: &ComponentTree) -> ViewStateResult<String> {
		if let Some(token) = ctx.cached_view_state() {
			return Ok(token.to_string());
		}

		let token = if tree.is_transient() {
			ViewStateToken::Stateless
		} else {
			let snapshot = ViewSnapshot::capture(tree, ctx.dynamic_actions())?;
			match self.method {
				StateSavingMethod::Server => self.store_on_server(ctx, snapshot)?,
				StateSavingMethod::Client => {
					let json = serde_json::to_vec(&snapshot)?;
					ViewStateToken::Blob(self.guard.seal(&json)?)
				}
			}
		};

		let token = token.to_string();
		ctx.set_cached_view_state(token.clone());
		Ok(token)
	}

	fn store_on_server(&self, ctx: &FacesContext, snapshot: ViewSnapshot) -> ViewStateResult<ViewStateToken> {
		let restored = ctx.restored_sequence();
		let logical = match restored {
			Some((logical, _)) => logical,
			None => self.sequences.next(),
		};
		let actual = match restored {
			Some((_, actual)) if ctx.is_partial_request() => actual,
			_ => self.sequences.next(),
		};

		let view_id = snapshot.view_id.clone();
		let payload = if self.serialize_server_state {
			let json = serde_json::to_vec(&snapshot)?;
			let bytes = if self.compress { gzip(&json)? } else { json };
			StoredPayload::Serialized(bytes.into())
		} else {
			StoredPayload::Snapshot(Arc::new(snapshot))
		};
		self.store.insert(logical, actual, &view_id, payload);

		tracing::trace!(logical, actual, view_id = %view_id, "Stored view state");
		Ok(ViewStateToken::sequence(logical, actual))
	}

	/// Decodes the token submitted with a request for `view_id`.
	///
	/// `None` (no parameter) and state that is no longer stored both produce
	/// [`DecodeOutcome::Missing`]. Malformed tokens and blobs that fail to
	/// open are errors.
	pub fn decode(
		&self,
		ctx: &mut FacesContext,
		view_id: &str,
		raw: Option<&str>,
	) -> ViewStateResult<DecodeOutcome> {
		let Some(raw) = raw else {
			return Ok(DecodeOutcome::Missing);
		};

		match ViewStateToken::parse(raw)? {
			ViewStateToken::Stateless => Ok(DecodeOutcome::Stateless),
			ViewStateToken::Sequence { logical, actual } => {
				let Some(payload) = self.store.get(logical, actual, view_id) else {
					tracing::debug!(logical, actual, view_id, "View state not found in store");
					return Ok(DecodeOutcome::Missing);
				};
				let snapshot = match payload {
					StoredPayload::Snapshot(snapshot) => snapshot,
					StoredPayload::Serialized(bytes) => {
						let json = if self.compress {
							gunzip(&bytes)?
						} else {
							bytes.to_vec()
						};
						Arc::new(serde_json::from_slice(&json)?)
					}
				};
				ctx.set_restored_sequence(logical, actual);
				Ok(DecodeOutcome::Restored(snapshot))
			}
			ViewStateToken::Blob(blob) => {
				let json = self.guard.open(&blob)?;
				let snapshot: ViewSnapshot = serde_json::from_slice(&json)
					.map_err(|e| ViewStateError::CorruptBlob(e.to_string()))?;
				if snapshot.view_id != view_id {
					tracing::debug!(
						stored_view = %snapshot.view_id,
						requested_view = %view_id,
						"Client view state belongs to a different view"
					);
					return Ok(DecodeOutcome::Missing);
				}
				Ok(DecodeOutcome::Restored(Arc::new(snapshot)))
			}
		}
	}

	/// Like [`decode`](Self::decode), but any failure degrades to
	/// [`DecodeOutcome::Missing`] so the view behaves as freshly created.
	pub fn decode_or_fresh(&self, ctx: &mut FacesContext, view_id: &str, raw: Option<&str>) -> DecodeOutcome {
		match self.decode(ctx, view_id, raw) {
			Ok(outcome) => outcome,
			Err(err) => {
				tracing::warn!(view_id, error = %err, "Discarding unreadable view state");
				DecodeOutcome::Missing
			}
		}
	}

	/// Decodes `raw` and applies it to the rebuilt `tree`.
	///
	/// Returns `None` when there was nothing to apply.
	pub fn restore(
		&self,
		ctx: &mut FacesContext,
		tree: &mut ComponentTree,
		raw: Option<&str>,
	) -> Option<RestoreReport> {
		let view_id = tree.view_id().to_string();
		match self.decode_or_fresh(ctx, &view_id, raw) {
			DecodeOutcome::Restored(snapshot) => {
				Some(ViewRestorer.restore(tree, &snapshot, ctx.dynamic_actions_mut()))
			}
			DecodeOutcome::Stateless => {
				tree.set_transient(true);
				None
			}
			DecodeOutcome::Missing => None,
		}
	}
}
