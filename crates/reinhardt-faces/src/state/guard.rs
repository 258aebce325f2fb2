//! Sealing of client-side view state.
//!
//! ```text
//! blob = base64url_nopad( nonce[12] || AES-256-GCM( gzip?(json) ) )
//! ```
//!
//! GCM authenticates the ciphertext, so a tampered or truncated blob fails to
//! open instead of restoring attacker-chosen state.

use std::fmt;
use std::io::Read;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use flate2::Compression;
use flate2::read::{GzDecoder, GzEncoder};
use rand::RngCore;

use crate::error::{ViewStateError, ViewStateResult};

const NONCE_LEN: usize = 12;

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Upper bound for decompressed state, so a small blob cannot inflate without
/// limit.
const MAX_INFLATED_LEN: u64 = 16 * 1024 * 1024;

/// Encrypts and optionally compresses serialized view state.
#[derive(Clone)]
pub struct StateGuard {
	cipher: Aes256Gcm,
	compress: bool,
}

impl StateGuard {
	/// Creates a guard with the given key.
	pub fn new(key: &[u8; KEY_LEN], compress: bool) -> Self {
		Self {
			cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
			compress,
		}
	}

	/// Creates a guard from a base64 encoded 32 byte secret.
	///
	/// Without a secret a random key is generated. State sealed with it cannot
	/// be opened by another process or after a restart.
	pub fn from_secret(secret: Option<&str>, compress: bool) -> ViewStateResult<Self> {
		let key = match secret {
			Some(secret) => {
				let bytes = STANDARD
					.decode(secret.trim())
					.map_err(|e| ViewStateError::Encryption(format!("invalid secret encoding: {e}")))?;
				<[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
					ViewStateError::Encryption(format!(
						"secret must be {KEY_LEN} bytes, got {}",
						bytes.len()
					))
				})?
			}
			None => {
				tracing::debug!("No client state secret configured, using a random key");
				let mut key = [0u8; KEY_LEN];
				rand::thread_rng().fill_bytes(&mut key);
				key
			}
		};
		Ok(Self::new(&key, compress))
	}

	/// Whether plaintext is gzip compressed before encryption.
	pub fn compresses(&self) -> bool {
		self.compress
	}

	/// Turns serialized state into a token-safe string.
	pub fn seal(&self, plaintext: &[u8]) -> ViewStateResult<String> {
		let compressed;
		let payload = if self.compress {
			compressed = gzip(plaintext)?;
			compressed.as_slice()
		} else {
			plaintext
		};

		let mut nonce_bytes = [0u8; NONCE_LEN];
		rand::thread_rng().fill_bytes(&mut nonce_bytes);
		let ciphertext = self
			.cipher
			.encrypt(Nonce::from_slice(&nonce_bytes), payload)
			.map_err(|e| ViewStateError::Encryption(e.to_string()))?;

		let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
		sealed.extend_from_slice(&nonce_bytes);
		sealed.extend_from_slice(&ciphertext);
		Ok(URL_SAFE_NO_PAD.encode(sealed))
	}

	/// Inverse of [`seal`](Self::seal).
	pub fn open(&self, blob: &str) -> ViewStateResult<Vec<u8>> {
		let sealed = URL_SAFE_NO_PAD
			.decode(blob)
			.map_err(|e| ViewStateError::CorruptBlob(format!("invalid encoding: {e}")))?;
		if sealed.len() < NONCE_LEN {
			return Err(ViewStateError::CorruptBlob("too short".to_string()));
		}
		let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
		let payload = self
			.cipher
			.decrypt(Nonce::from_slice(nonce), ciphertext)
			.map_err(|_| ViewStateError::CorruptBlob("authentication failed".to_string()))?;

		if self.compress {
			gunzip(&payload).map_err(|e| ViewStateError::CorruptBlob(e.to_string()))
		} else {
			Ok(payload)
		}
	}
}

impl fmt::Debug for StateGuard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateGuard")
			.field("compress", &self.compress)
			.finish_non_exhaustive()
	}
}

/// Gzip compresses `data`.
pub(crate) fn gzip(data: &[u8]) -> ViewStateResult<Vec<u8>> {
	let mut encoder = GzEncoder::new(data, Compression::default());
	let mut compressed = Vec::new();
	encoder
		.read_to_end(&mut compressed)
		.map_err(|e| ViewStateError::Compression(e.to_string()))?;
	Ok(compressed)
}

/// Inverse of [`gzip`], capped at 16 MiB of output.
pub(crate) fn gunzip(data: &[u8]) -> ViewStateResult<Vec<u8>> {
	let mut decoder = GzDecoder::new(data).take(MAX_INFLATED_LEN + 1);
	let mut decompressed = Vec::new();
	decoder
		.read_to_end(&mut decompressed)
		.map_err(|e| ViewStateError::Compression(e.to_string()))?;
	if decompressed.len() as u64 > MAX_INFLATED_LEN {
		return Err(ViewStateError::Compression(
			"decompressed state exceeds limit".to_string(),
		));
	}
	Ok(decompressed)
}
