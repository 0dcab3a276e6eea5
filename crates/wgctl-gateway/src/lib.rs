// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gateway to the kernel WireGuard interface via the `wg` utility.
//!
//! Everything that touches the kernel interface goes through [`WgGateway`];
//! no other component spawns a subprocess. [`WgCli`] is the production
//! implementation, [`FakeGateway`] the in-memory test double.

pub mod cli;
pub mod dump;
pub mod fake;

pub use cli::WgCli;
pub use fake::FakeGateway;

use async_trait::async_trait;
use wgctl_core::{KeyPair, Peer, PeerSpec, PublicKey, Result, WgError};

#[async_trait]
pub trait WgGateway: Send + Sync {
	/// All peers currently registered on the interface.
	async fn list_peers(&self) -> Result<Vec<Peer>>;

	/// A single peer, `PeerNotFound` when no entry matches.
	async fn get_peer(&self, public_key: &PublicKey) -> Result<Peer> {
		let peers = self.list_peers().await?;
		peers
			.into_iter()
			.find(|peer| peer.public_key == *public_key)
			.ok_or_else(|| WgError::PeerNotFound(public_key.to_base64()))
	}

	/// Registers the peer, or updates it in place when it already exists.
	async fn upsert_peer(&self, spec: &PeerSpec) -> Result<()>;

	/// Replaces the peer's allowed networks wholesale; an empty list clears
	/// them.
	async fn replace_allowed_ips(&self, public_key: &PublicKey, allowed_ips: &[String])
		-> Result<()>;

	/// Removes the peer. A missing peer is silent success: the utility
	/// treats removal of an unknown peer as a no-op.
	async fn remove_peer(&self, public_key: &PublicKey) -> Result<()>;

	/// Generates a fresh keypair under the key-generation timeout.
	async fn generate_keypair(&self) -> Result<KeyPair>;

	/// Derives the public key for a private key without registering
	/// anything.
	async fn derive_public_key(&self, private_key: &str) -> Result<PublicKey>;
}
