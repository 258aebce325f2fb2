//! Bounded server-side storage of view snapshots.
//!
//! Two levels of LRU maps: logical views (roughly one per browser window)
//! each holding a bounded number of snapshots. Both levels are touched on
//! access and evict their least recently used entry when full.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::snapshot::ViewSnapshot;

/// Capacity limits of a [`ServerStateStore`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
	/// Maximum number of logical views.
	pub logical_views: usize,
	/// Maximum number of snapshots per logical view.
	pub views_per_logical: usize,
}

impl StoreLimits {
	/// Creates limits; zero is raised to one.
	pub fn new(logical_views: usize, views_per_logical: usize) -> Self {
		Self {
			logical_views: logical_views.max(1),
			views_per_logical: views_per_logical.max(1),
		}
	}
}

impl Default for StoreLimits {
	fn default() -> Self {
		Self::new(15, 15)
	}
}

/// What is kept for one snapshot.
#[derive(Debug, Clone)]
pub enum StoredPayload {
	/// The snapshot itself.
	Snapshot(Arc<ViewSnapshot>),
	/// The snapshot serialized (and possibly compressed).
	Serialized(Arc<[u8]>),
}

#[derive(Debug)]
struct StoredState {
	view_id: String,
	payload: StoredPayload,
}

type LogicalView = IndexMap<i64, StoredState>;

/// Process-wide store shared by all requests.
#[derive(Debug)]
pub struct ServerStateStore {
	limits: StoreLimits,
	views: Mutex<IndexMap<i64, LogicalView>>,
}

impl ServerStateStore {
	/// Creates an empty store.
	pub fn new(limits: StoreLimits) -> Self {
		Self {
			limits,
			views: Mutex::new(IndexMap::new()),
		}
	}

	/// Configured limits.
	pub fn limits(&self) -> StoreLimits {
		self.limits
	}

	/// Stores `payload` under `(logical, actual)`, replacing any previous entry
	/// at that key and evicting least recently used entries as needed.
	pub fn insert(&self, logical: i64, actual: i64, view_id: &str, payload: StoredPayload) {
		let mut views = self.views.lock();

		if !touch(&mut views, &logical) && views.len() >= self.limits.logical_views {
			if let Some((evicted, states)) = views.shift_remove_index(0) {
				tracing::debug!(
					logical_view = evicted,
					states = states.len(),
					"Evicted least recently used logical view"
				);
			}
		}
		let states = views.entry(logical).or_default();

		if !touch(states, &actual) && states.len() >= self.limits.views_per_logical {
			if let Some((evicted, state)) = states.shift_remove_index(0) {
				tracing::debug!(
					logical_view = logical,
					state = evicted,
					view_id = %state.view_id,
					"Evicted least recently used view state"
				);
			}
		}
		states.insert(
			actual,
			StoredState {
				view_id: view_id.to_string(),
				payload,
			},
		);
	}

	/// Looks up `(logical, actual)` for `view_id`.
	///
	/// A snapshot stored for a different view is treated as absent.
	pub fn get(&self, logical: i64, actual: i64, view_id: &str) -> Option<StoredPayload> {
		let mut views = self.views.lock();
		if !touch(&mut views, &logical) {
			return None;
		}
		let states = views.get_mut(&logical)?;
		if !touch(states, &actual) {
			return None;
		}
		let state = states.get(&actual)?;
		if state.view_id != view_id {
			tracing::debug!(
				logical_view = logical,
				state = actual,
				stored_view = %state.view_id,
				requested_view = %view_id,
				"View state belongs to a different view"
			);
			return None;
		}
		Some(state.payload.clone())
	}

	/// Number of logical views.
	pub fn logical_view_count(&self) -> usize {
		self.views.lock().len()
	}

	/// Number of snapshots held for `logical`.
	pub fn state_count(&self, logical: i64) -> usize {
		self.views.lock().get(&logical).map_or(0, IndexMap::len)
	}

	/// Drops everything.
	pub fn clear(&self) {
		self.views.lock().clear();
	}
}

impl Default for ServerStateStore {
	fn default() -> Self {
		Self::new(StoreLimits::default())
	}
}

/// Moves `key` to the most recently used position. Returns whether it exists.
fn touch<V>(map: &mut IndexMap<i64, V>, key: &i64) -> bool {
	match map.get_index_of(key) {
		Some(idx) => {
			let last = map.len() - 1;
			map.move_index(idx, last);
			true
		}
		None => false,
	}
}
