// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Business operations over the utility gateway.
//!
//! The service holds no peer state of its own; the kernel interface is the
//! source of truth and every read goes back to the dump. Private keys are
//! produced on create and rotate, returned to the caller exactly once, and
//! never retained.

use std::sync::Arc;
use tracing::instrument;
use wgctl_core::{
	decode_key, validate_allowed_ips, CreatePeerRequest, Peer, PeerSpec, PublicKey, Result,
	WgError,
};
use wgctl_gateway::WgGateway;

/// Upper bound the utility accepts for persistent-keepalive seconds.
const MAX_KEEPALIVE_SECS: u32 = 65_535;

pub struct PeerService {
	gateway: Arc<dyn WgGateway>,
	server_public_key: PublicKey,
	server_endpoint: Option<String>,
	client_dns: String,
	client_mtu: u32,
}

impl PeerService {
	pub fn new(
		gateway: Arc<dyn WgGateway>,
		server_public_key: PublicKey,
		server_endpoint: Option<String>,
		client_dns: impl Into<String>,
		client_mtu: u32,
	) -> Self {
		Self {
			gateway,
			server_public_key,
			server_endpoint,
			client_dns: client_dns.into(),
			client_mtu,
		}
	}

	pub async fn get_all(&self) -> Result<Vec<Peer>> {
		self.gateway.list_peers().await
	}

	#[instrument(skip_all, fields(public_key = %public_key))]
	pub async fn get(&self, public_key: &PublicKey) -> Result<Peer> {
		self.gateway.get_peer(public_key).await
	}

	/// Generates a fresh keypair, registers the public half, and returns
	/// the peer record including the private key. This and [`rotate`] are
	/// the only operations that ever emit a private key; the caller is
	/// responsible for persisting it.
	///
	/// [`rotate`]: PeerService::rotate
	#[instrument(skip_all)]
	pub async fn create_with_new_keys(&self, request: CreatePeerRequest) -> Result<Peer> {
		validate_allowed_ips(&request.allowed_ips)?;
		validate_keepalive(request.persistent_keepalive)?;
		if !request.preshared_key.is_empty() {
			decode_key(&request.preshared_key)
				.map_err(|e| WgError::InvalidInput(format!("invalid preshared key: {e}")))?;
		}

		let pair = self.gateway.generate_keypair().await?;
		let spec = PeerSpec {
			public_key: pair.public_key,
			allowed_ips: request.allowed_ips,
			preshared_key: request.preshared_key,
			persistent_keepalive: request.persistent_keepalive,
		};
		// Only the public key is registered; the private key goes nowhere
		// but the response.
		self.gateway.upsert_peer(&spec).await?;

		let mut peer = Peer::from_spec(&spec);
		peer.private_key = pair.private_key;
		tracing::info!(public_key = %peer.public_key, "created peer with generated keys");
		Ok(peer)
	}

	/// Replaces the peer's allowed networks wholesale; an empty list clears
	/// them all.
	#[instrument(skip_all, fields(public_key = %public_key))]
	pub async fn update_allowed_ips(
		&self,
		public_key: &PublicKey,
		allowed_ips: Vec<String>,
	) -> Result<()> {
		validate_allowed_ips(&allowed_ips)?;
		// `wg set` registers an unknown peer as a side effect; check
		// existence first so an update can never materialize one.
		self.gateway.get_peer(public_key).await?;
		self.gateway
			.replace_allowed_ips(public_key, &allowed_ips)
			.await?;
		tracing::info!(public_key = %public_key, count = allowed_ips.len(), "allowed networks updated");
		Ok(())
	}

	#[instrument(skip_all, fields(public_key = %public_key))]
	pub async fn delete(&self, public_key: &PublicKey) -> Result<()> {
		self.gateway.remove_peer(public_key).await?;
		tracing::info!(public_key = %public_key, "peer deleted");
		Ok(())
	}

	/// Replaces the peer's keypair while preserving its allowed networks,
	/// preshared key and keepalive.
	///
	/// Two steps: register the new peer first, then remove the old one.
	/// Create-before-delete keeps a working entry alive through the
	/// transition. If the new peer cannot be registered the old one is
	/// untouched and the call fails plainly. If the old peer cannot be
	/// removed afterwards, the call fails with `RotationIncomplete`
	/// carrying the new record: the caller must still receive the new
	/// private key, and must be told the old peer is live.
	#[instrument(skip_all, fields(public_key = %old_public_key))]
	pub async fn rotate(&self, old_public_key: &PublicKey) -> Result<Peer> {
		let current = self.gateway.get_peer(old_public_key).await?;
		let pair = self.gateway.generate_keypair().await?;

		let spec = PeerSpec {
			public_key: pair.public_key,
			allowed_ips: current.allowed_ips,
			preshared_key: current.pre_shared_key,
			persistent_keepalive: current.persistent_keepalive,
		};
		self.gateway.upsert_peer(&spec).await?;

		let mut new_peer = Peer::from_spec(&spec);
		new_peer.private_key = pair.private_key;

		if let Err(err) = self.gateway.remove_peer(old_public_key).await {
			tracing::error!(
				old_public_key = %old_public_key,
				new_public_key = %spec.public_key,
				error = %err,
				"new peer applied but old peer removal failed; manual cleanup needed"
			);
			return Err(WgError::RotationIncomplete {
				new_peer: Box::new(new_peer),
				reason: err.to_string(),
			});
		}

		tracing::info!(
			old_public_key = %old_public_key,
			new_public_key = %new_peer.public_key,
			"rotated peer key"
		);
		Ok(new_peer)
	}

	/// Renders the client-side `.conf` artifact for a peer. The supplied
	/// private key is written into the artifact and not retained.
	pub fn build_client_config(&self, peer: &Peer, client_private_key: &str) -> Result<String> {
		if client_private_key.trim().is_empty() {
			return Err(WgError::InvalidInput(
				"client private key must not be empty".to_string(),
			));
		}

		let mut artifact = String::new();
		artifact.push_str("[Interface]\n");
		artifact.push_str(&format!("PrivateKey = {client_private_key}\n"));
		// The first allowed network is the address the server authorized
		// for this client.
		if let Some(address) = peer.allowed_ips.first() {
			artifact.push_str(&format!("Address = {address}\n"));
		}
		if !self.client_dns.is_empty() {
			artifact.push_str(&format!("DNS = {}\n", self.client_dns));
		}
		if self.client_mtu > 0 {
			artifact.push_str(&format!("MTU = {}\n", self.client_mtu));
		}

		artifact.push_str("\n[Peer]\n");
		artifact.push_str(&format!("PublicKey = {}\n", self.server_public_key));
		if let Some(endpoint) = &self.server_endpoint {
			artifact.push_str(&format!("Endpoint = {endpoint}\n"));
		}
		if !peer.pre_shared_key.is_empty() {
			artifact.push_str(&format!("PresharedKey = {}\n", peer.pre_shared_key));
		}
		artifact.push_str("AllowedIPs = 0.0.0.0/0, ::/0\n");
		if peer.persistent_keepalive > 0 {
			artifact.push_str(&format!(
				"PersistentKeepalive = {}\n",
				peer.persistent_keepalive
			));
		}

		Ok(artifact)
	}
}

fn validate_keepalive(seconds: u32) -> Result<()> {
	if seconds > MAX_KEEPALIVE_SECS {
		return Err(WgError::InvalidInput(format!(
			"persistent keepalive {seconds} exceeds {MAX_KEEPALIVE_SECS} seconds"
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use wgctl_gateway::FakeGateway;

	const SERVER_PUB: &str = "mK0477z4M24qLMVu2aSNwJjgCR97FPbyxsZ3+gx/NWg=";
	const PSK: &str = "HImIlSu3hYz69NyIIUCfOgvkkAlpbIYpSJuqFBy6m1U=";

	fn service(gateway: Arc<FakeGateway>) -> PeerService {
		let gateway: Arc<dyn WgGateway> = gateway;
		PeerService::new(
			gateway,
			PublicKey::from_base64(SERVER_PUB).unwrap(),
			Some("vpn.example.com:51820".to_string()),
			"1.1.1.1",
			1420,
		)
	}

	fn create_request() -> CreatePeerRequest {
		CreatePeerRequest {
			allowed_ips: vec!["10.100.0.2/32".to_string()],
			preshared_key: String::new(),
			persistent_keepalive: 25,
		}
	}

	#[tokio::test]
	async fn create_returns_a_matching_keypair() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());

		let peer = svc.create_with_new_keys(create_request()).await.unwrap();
		assert!(!peer.private_key.is_empty());
		let derived = FakeGateway::derive(&peer.private_key).unwrap();
		assert_eq!(derived, peer.public_key);
		assert_eq!(peer.allowed_ips, vec!["10.100.0.2/32"]);
		assert_eq!(peer.persistent_keepalive, 25);

		// The registered record carries no private key.
		let stored = &gateway.peers()[0];
		assert!(stored.private_key.is_empty());
		assert_eq!(stored.public_key, peer.public_key);
	}

	#[tokio::test]
	async fn create_allows_empty_allowed_ips() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway);
		let peer = svc
			.create_with_new_keys(CreatePeerRequest::default())
			.await
			.unwrap();
		assert!(peer.allowed_ips.is_empty());
	}

	#[tokio::test]
	async fn create_rejects_invalid_input_before_generating_keys() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());

		let bad_cidr = CreatePeerRequest {
			allowed_ips: vec!["nonsense".to_string()],
			..CreatePeerRequest::default()
		};
		assert!(matches!(
			svc.create_with_new_keys(bad_cidr).await.unwrap_err(),
			WgError::InvalidInput(_)
		));

		let bad_psk = CreatePeerRequest {
			preshared_key: "short".to_string(),
			..CreatePeerRequest::default()
		};
		assert!(matches!(
			svc.create_with_new_keys(bad_psk).await.unwrap_err(),
			WgError::InvalidInput(_)
		));

		let bad_keepalive = CreatePeerRequest {
			persistent_keepalive: 70_000,
			..CreatePeerRequest::default()
		};
		assert!(matches!(
			svc.create_with_new_keys(bad_keepalive).await.unwrap_err(),
			WgError::InvalidInput(_)
		));

		assert_eq!(gateway.upsert_calls(), 0);
	}

	#[tokio::test]
	async fn rotate_preserves_settings_and_removes_old() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());

		let old = svc
			.create_with_new_keys(CreatePeerRequest {
				allowed_ips: vec!["10.100.0.2/32".to_string()],
				preshared_key: PSK.to_string(),
				persistent_keepalive: 25,
			})
			.await
			.unwrap();

		let rotated = svc.rotate(&old.public_key).await.unwrap();
		assert_ne!(rotated.public_key, old.public_key);
		assert!(!rotated.private_key.is_empty());
		assert_eq!(
			FakeGateway::derive(&rotated.private_key).unwrap(),
			rotated.public_key
		);
		assert_eq!(rotated.allowed_ips, old.allowed_ips);
		assert_eq!(rotated.pre_shared_key, PSK);
		assert_eq!(rotated.persistent_keepalive, 25);

		let remaining = gateway.peers();
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].public_key, rotated.public_key);
	}

	#[tokio::test]
	async fn rotate_of_missing_peer_is_not_found() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());
		let absent = gateway.generate_keypair().await.unwrap().public_key;
		assert!(matches!(
			svc.rotate(&absent).await.unwrap_err(),
			WgError::PeerNotFound(_)
		));
	}

	#[tokio::test]
	async fn rotate_aborts_with_old_peer_intact_when_upsert_fails() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());
		let old = svc.create_with_new_keys(create_request()).await.unwrap();

		gateway.fail_next_upsert(WgError::CommandFailed("device busy".to_string()));
		let err = svc.rotate(&old.public_key).await.unwrap_err();
		assert!(matches!(err, WgError::CommandFailed(_)));

		let remaining = gateway.peers();
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].public_key, old.public_key);
	}

	#[tokio::test]
	async fn rotate_partial_failure_returns_the_new_peer() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());
		let old = svc.create_with_new_keys(create_request()).await.unwrap();

		gateway.fail_next_remove(WgError::CommandFailed("device busy".to_string()));
		let err = svc.rotate(&old.public_key).await.unwrap_err();
		let new_peer = match err {
			WgError::RotationIncomplete { new_peer, reason } => {
				assert!(reason.contains("device busy"));
				new_peer
			}
			other => panic!("expected RotationIncomplete, got {other:?}"),
		};

		assert!(!new_peer.private_key.is_empty());
		assert_eq!(new_peer.allowed_ips, old.allowed_ips);

		// Both the orphaned old peer and the new one are live.
		let keys: Vec<_> = gateway
			.peers()
			.iter()
			.map(|peer| peer.public_key)
			.collect();
		assert_eq!(keys.len(), 2);
		assert!(keys.contains(&old.public_key));
		assert!(keys.contains(&new_peer.public_key));
	}

	#[tokio::test]
	async fn update_allowed_ips_replaces_the_list() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());
		let peer = svc.create_with_new_keys(create_request()).await.unwrap();

		svc.update_allowed_ips(&peer.public_key, vec!["10.100.0.9/32".to_string()])
			.await
			.unwrap();
		let stored = svc.get(&peer.public_key).await.unwrap();
		assert_eq!(stored.allowed_ips, vec!["10.100.0.9/32"]);

		svc.update_allowed_ips(&peer.public_key, vec![])
			.await
			.unwrap();
		let cleared = svc.get(&peer.public_key).await.unwrap();
		assert!(cleared.allowed_ips.is_empty());
	}

	#[tokio::test]
	async fn update_allowed_ips_of_missing_peer_is_not_found() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());
		let absent = gateway.generate_keypair().await.unwrap().public_key;
		let err = svc
			.update_allowed_ips(&absent, vec!["10.0.0.1/32".to_string()])
			.await
			.unwrap_err();
		assert!(matches!(err, WgError::PeerNotFound(_)));
	}

	#[tokio::test]
	async fn delete_removes_the_peer() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway.clone());
		let peer = svc.create_with_new_keys(create_request()).await.unwrap();

		svc.delete(&peer.public_key).await.unwrap();
		assert!(gateway.peers().is_empty());
		// Idempotent at the utility.
		svc.delete(&peer.public_key).await.unwrap();
	}

	#[tokio::test]
	async fn client_config_renders_all_sections() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway);

		let spec = PeerSpec {
			public_key: PublicKey::from_base64(SERVER_PUB).unwrap(),
			allowed_ips: vec!["10.100.0.2/32".to_string()],
			preshared_key: PSK.to_string(),
			persistent_keepalive: 25,
		};
		let peer = Peer::from_spec(&spec);

		let artifact = svc
			.build_client_config(&peer, "client-private-key")
			.unwrap();
		let expected = format!(
			"[Interface]\n\
			 PrivateKey = client-private-key\n\
			 Address = 10.100.0.2/32\n\
			 DNS = 1.1.1.1\n\
			 MTU = 1420\n\
			 \n\
			 [Peer]\n\
			 PublicKey = {SERVER_PUB}\n\
			 Endpoint = vpn.example.com:51820\n\
			 PresharedKey = {PSK}\n\
			 AllowedIPs = 0.0.0.0/0, ::/0\n\
			 PersistentKeepalive = 25\n"
		);
		assert_eq!(artifact, expected);
	}

	#[tokio::test]
	async fn client_config_omits_absent_fields() {
		let gateway = Arc::new(FakeGateway::new());
		let gateway_dyn: Arc<dyn WgGateway> = gateway;
		let svc = PeerService::new(
			gateway_dyn,
			PublicKey::from_base64(SERVER_PUB).unwrap(),
			None,
			"",
			0,
		);

		let spec = PeerSpec {
			public_key: PublicKey::from_base64(SERVER_PUB).unwrap(),
			allowed_ips: vec![],
			preshared_key: String::new(),
			persistent_keepalive: 0,
		};
		let peer = Peer::from_spec(&spec);

		let artifact = svc.build_client_config(&peer, "k").unwrap();
		assert!(!artifact.contains("Address"));
		assert!(!artifact.contains("DNS"));
		assert!(!artifact.contains("MTU"));
		assert!(!artifact.contains("Endpoint"));
		assert!(!artifact.contains("PresharedKey"));
		assert!(!artifact.contains("PersistentKeepalive"));
		assert!(artifact.contains("AllowedIPs = 0.0.0.0/0, ::/0\n"));
	}

	#[tokio::test]
	async fn client_config_requires_a_private_key() {
		let gateway = Arc::new(FakeGateway::new());
		let svc = service(gateway);
		let spec = PeerSpec {
			public_key: PublicKey::from_base64(SERVER_PUB).unwrap(),
			allowed_ips: vec![],
			preshared_key: String::new(),
			persistent_keepalive: 0,
		};
		let peer = Peer::from_spec(&spec);
		assert!(matches!(
			svc.build_client_config(&peer, "  ").unwrap_err(),
			WgError::InvalidInput(_)
		));
	}
}
