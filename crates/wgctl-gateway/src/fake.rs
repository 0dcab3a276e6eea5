// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory gateway for tests.
//!
//! Mirrors the utility's observable behavior: upsert registers or updates,
//! remove is a no-op on missing peers, and generated keypairs are real
//! Curve25519 pairs so the private/public fingerprint relation holds.
//! One-shot failure hooks let tests drive the rotation state machine and
//! the readiness probe through their error paths.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use wgctl_core::{decode_key, KeyPair, Peer, PeerSpec, PublicKey, Result, WgError};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::WgGateway;

#[derive(Default)]
pub struct FakeGateway {
	peers: Mutex<Vec<Peer>>,
	list_error: Mutex<Option<WgError>>,
	upsert_error: Mutex<Option<WgError>>,
	remove_error: Mutex<Option<WgError>>,
	upsert_calls: AtomicUsize,
}

impl FakeGateway {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, peer: Peer) {
		self.peers.lock().unwrap().push(peer);
	}

	pub fn peers(&self) -> Vec<Peer> {
		self.peers.lock().unwrap().clone()
	}

	pub fn upsert_calls(&self) -> usize {
		self.upsert_calls.load(Ordering::SeqCst)
	}

	/// The next `list_peers` call fails with `err`.
	pub fn fail_next_list(&self, err: WgError) {
		*self.list_error.lock().unwrap() = Some(err);
	}

	/// The next `upsert_peer` call fails with `err`.
	pub fn fail_next_upsert(&self, err: WgError) {
		*self.upsert_error.lock().unwrap() = Some(err);
	}

	/// The next `remove_peer` call fails with `err`.
	pub fn fail_next_remove(&self, err: WgError) {
		*self.remove_error.lock().unwrap() = Some(err);
	}

	/// Derives the public key for a base64 private key, the same relation
	/// the real utility computes with `wg pubkey`.
	pub fn derive(private_key: &str) -> Result<PublicKey> {
		let bytes = decode_key(private_key)
			.map_err(|e| WgError::KeyGeneration(format!("invalid private key: {e}")))?;
		let secret = StaticSecret::from(bytes);
		let public = X25519PublicKey::from(&secret);
		Ok(PublicKey::from_bytes(*public.as_bytes()))
	}
}

#[async_trait]
impl WgGateway for FakeGateway {
	async fn list_peers(&self) -> Result<Vec<Peer>> {
		if let Some(err) = self.list_error.lock().unwrap().take() {
			return Err(err);
		}
		Ok(self.peers.lock().unwrap().clone())
	}

	async fn upsert_peer(&self, spec: &PeerSpec) -> Result<()> {
		self.upsert_calls.fetch_add(1, Ordering::SeqCst);
		if let Some(err) = self.upsert_error.lock().unwrap().take() {
			return Err(err);
		}
		spec.validate()?;

		let mut peers = self.peers.lock().unwrap();
		if let Some(existing) = peers
			.iter_mut()
			.find(|peer| peer.public_key == spec.public_key)
		{
			existing.allowed_ips = spec.allowed_ips.clone();
			if !spec.preshared_key.is_empty() {
				existing.pre_shared_key = spec.preshared_key.clone();
			}
			if spec.persistent_keepalive > 0 {
				existing.persistent_keepalive = spec.persistent_keepalive;
			}
		} else {
			peers.push(Peer::from_spec(spec));
		}
		Ok(())
	}

	async fn replace_allowed_ips(
		&self,
		public_key: &PublicKey,
		allowed_ips: &[String],
	) -> Result<()> {
		wgctl_core::validate_allowed_ips(allowed_ips)?;
		let mut peers = self.peers.lock().unwrap();
		let peer = peers
			.iter_mut()
			.find(|peer| peer.public_key == *public_key)
			.ok_or_else(|| WgError::PeerNotFound(public_key.to_base64()))?;
		peer.allowed_ips = allowed_ips.to_vec();
		Ok(())
	}

	async fn remove_peer(&self, public_key: &PublicKey) -> Result<()> {
		if let Some(err) = self.remove_error.lock().unwrap().take() {
			return Err(err);
		}
		// Removing an unknown peer is silent success, as with the utility.
		self.peers
			.lock()
			.unwrap()
			.retain(|peer| peer.public_key != *public_key);
		Ok(())
	}

	async fn generate_keypair(&self) -> Result<KeyPair> {
		let secret = StaticSecret::random_from_rng(OsRng);
		let public = X25519PublicKey::from(&secret);
		Ok(KeyPair {
			private_key: STANDARD.encode(secret.to_bytes()),
			public_key: PublicKey::from_bytes(*public.as_bytes()),
		})
	}

	async fn derive_public_key(&self, private_key: &str) -> Result<PublicKey> {
		Self::derive(private_key)
	}
}
