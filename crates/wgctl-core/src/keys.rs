// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Length of a base64-encoded Curve25519 key as printed by the `wg` utility.
pub const KEY_BASE64_LEN: usize = 44;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid key length: expected {KEY_BASE64_LEN} base64 characters, got {0}")]
	InvalidLength(usize),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),

	#[error("invalid key: decoded to {0} bytes, expected 32")]
	InvalidDecodedLength(usize),
}

/// Decodes a 44-character base64 key into its 32 raw bytes.
///
/// Shared by public-key parsing and preshared-key validation; both travel
/// as argv/stdin to the kernel utility, so they are validated here before
/// anything is shelled out.
pub fn decode_key(s: &str) -> std::result::Result<[u8; 32], KeyError> {
	if s.len() != KEY_BASE64_LEN {
		return Err(KeyError::InvalidLength(s.len()));
	}
	let bytes = STANDARD.decode(s)?;
	if bytes.len() != 32 {
		return Err(KeyError::InvalidDecodedLength(bytes.len()));
	}
	let mut arr = [0u8; 32];
	arr.copy_from_slice(&bytes);
	Ok(arr)
}

/// A peer's Curve25519 public key, validated on construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
	bytes: [u8; 32],
}

impl PublicKey {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> std::result::Result<Self, KeyError> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.bytes
	}
}

impl fmt::Debug for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = self.to_base64();
		let prefix = if b64.len() >= 8 { &b64[..8] } else { &b64 };
		f.debug_struct("PublicKey")
			.field("prefix", &format!("{}...", prefix))
			.finish()
	}
}

impl fmt::Display for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl std::str::FromStr for PublicKey {
	type Err = KeyError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Self::from_base64(s)
	}
}

impl Serialize for PublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for PublicKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

/// A freshly generated key pair. The private half is handed to the caller
/// exactly once and never stored; Debug keeps it out of logs.
#[derive(Clone)]
pub struct KeyPair {
	pub private_key: String,
	pub public_key: PublicKey,
}

impl fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyPair")
			.field("private_key", &"[REDACTED]")
			.field("public_key", &self.public_key)
			.finish()
	}
}
