// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::model::Peer;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WgError>;

/// The closed error set every layer speaks. The gateway produces these,
/// the service propagates (adding `RotationIncomplete` where it applies),
/// and the HTTP surface is the only layer that maps them to status codes.
#[derive(Error, Debug)]
pub enum WgError {
	/// No peer matches the given public key.
	#[error("peer not found: {0}")]
	PeerNotFound(String),

	/// The utility subprocess exceeded its deadline.
	#[error("wireguard command timed out after {timeout:?}")]
	CommandTimeout { timeout: Duration },

	/// The utility exited non-zero or could not be spawned.
	#[error("wireguard command failed: {0}")]
	CommandFailed(String),

	/// A request failed decoding or validation before reaching the utility.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// The genkey/pubkey pipeline failed.
	#[error("key generation failed: {0}")]
	KeyGeneration(String),

	/// Rotation registered the new peer but could not remove the old one:
	/// the caller holds a valid new peer and a live orphan. The embedded
	/// record carries the only copy of the new private key and must reach
	/// the caller.
	#[error("rotation incomplete: new peer {} is live, but removing the old peer failed: {reason}", .new_peer.public_key)]
	RotationIncomplete { new_peer: Box<Peer>, reason: String },
}
