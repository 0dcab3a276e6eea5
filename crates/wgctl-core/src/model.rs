// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::WgError;
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A WireGuard peer as reported by `wg show <iface> dump`, plus the private
/// key slot that is only ever populated on create/rotate responses.
///
/// JSON field names mirror the dump-derived wire shape; empty/zero fields
/// are omitted rather than serialized blank.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
	/// Populated only when this record is the response to a create or
	/// rotate; the caller receives it exactly once and the service keeps
	/// no copy. Read endpoints always leave it empty.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub private_key: String,

	pub public_key: PublicKey,

	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub pre_shared_key: String,

	/// Observed remote `host:port`, empty when the kernel has none.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub endpoint: String,

	/// CIDRs the peer may source/receive; order is preserved as provided.
	#[serde(default)]
	pub allowed_ips: Vec<String>,

	/// Seconds since epoch of the last handshake, 0 = never.
	#[serde(default, skip_serializing_if = "is_zero_i64")]
	pub latest_handshake: i64,

	#[serde(default, skip_serializing_if = "is_zero_u64")]
	pub receive_bytes: u64,

	#[serde(default, skip_serializing_if = "is_zero_u64")]
	pub transmit_bytes: u64,

	/// Keepalive interval in seconds, 0 = disabled (`off` in the dump).
	#[serde(default, skip_serializing_if = "is_zero_u32")]
	pub persistent_keepalive: u32,
}

fn is_zero_i64(v: &i64) -> bool {
	*v == 0
}

fn is_zero_u64(v: &u64) -> bool {
	*v == 0
}

fn is_zero_u32(v: &u32) -> bool {
	*v == 0
}

impl Peer {
	/// A peer record as it exists right after registration: the write-side
	/// settings, no observed state, no private key.
	pub fn from_spec(spec: &PeerSpec) -> Self {
		Self {
			private_key: String::new(),
			public_key: spec.public_key,
			pre_shared_key: spec.preshared_key.clone(),
			endpoint: String::new(),
			allowed_ips: spec.allowed_ips.clone(),
			latest_handshake: 0,
			receive_bytes: 0,
			transmit_bytes: 0,
			persistent_keepalive: spec.persistent_keepalive,
		}
	}
}

impl fmt::Debug for Peer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Peer")
			.field(
				"private_key",
				if self.private_key.is_empty() {
					&""
				} else {
					&"[REDACTED]"
				},
			)
			.field("public_key", &self.public_key)
			.field(
				"pre_shared_key",
				if self.pre_shared_key.is_empty() {
					&""
				} else {
					&"[REDACTED]"
				},
			)
			.field("endpoint", &self.endpoint)
			.field("allowed_ips", &self.allowed_ips)
			.field("latest_handshake", &self.latest_handshake)
			.field("receive_bytes", &self.receive_bytes)
			.field("transmit_bytes", &self.transmit_bytes)
			.field("persistent_keepalive", &self.persistent_keepalive)
			.finish()
	}
}

/// The write-side projection handed to the utility gateway. Deliberately
/// carries no state fields and no private key, so the utility never sees
/// one.
#[derive(Debug, Clone)]
pub struct PeerSpec {
	pub public_key: PublicKey,
	pub allowed_ips: Vec<String>,
	pub preshared_key: String,
	pub persistent_keepalive: u32,
}

impl PeerSpec {
	pub fn validate(&self) -> Result<(), WgError> {
		validate_allowed_ips(&self.allowed_ips)
	}
}

/// Every entry must parse as a CIDR; these strings end up on the utility's
/// command line.
pub fn validate_allowed_ips(allowed_ips: &[String]) -> Result<(), WgError> {
	for cidr in allowed_ips {
		cidr.parse::<ipnet::IpNet>()
			.map_err(|e| WgError::InvalidInput(format!("invalid CIDR {cidr:?}: {e}")))?;
	}
	Ok(())
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CreatePeerRequest {
	#[serde(default)]
	pub allowed_ips: Vec<String>,
	#[serde(default)]
	pub preshared_key: String,
	#[serde(default)]
	pub persistent_keepalive: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAllowedIpsRequest {
	pub allowed_ips: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ClientFileRequest {
	pub client_public_key: String,
	pub client_private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Body returned when rotation created the new peer but could not remove
/// the old one: the error, plus the new record that carries the only copy
/// of the new private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationFailureResponse {
	pub error: String,
	pub peer: Peer,
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY_A: &str = "mK0477z4M24qLMVu2aSNwJjgCR97FPbyxsZ3+gx/NWg=";

	fn sample_spec() -> PeerSpec {
		PeerSpec {
			public_key: PublicKey::from_base64(KEY_A).unwrap(),
			allowed_ips: vec!["10.100.0.2/32".to_string()],
			preshared_key: String::new(),
			persistent_keepalive: 25,
		}
	}

	#[test]
	fn peer_serializes_camel_case_and_omits_empty() {
		let peer = Peer::from_spec(&sample_spec());
		let json = serde_json::to_value(&peer).unwrap();
		assert_eq!(json["publicKey"], KEY_A);
		assert_eq!(json["allowedIps"][0], "10.100.0.2/32");
		assert_eq!(json["persistentKeepalive"], 25);
		assert!(json.get("privateKey").is_none());
		assert!(json.get("preSharedKey").is_none());
		assert!(json.get("endpoint").is_none());
		assert!(json.get("latestHandshake").is_none());
	}

	#[test]
	fn peer_serializes_private_key_when_present() {
		let mut peer = Peer::from_spec(&sample_spec());
		peer.private_key = "BDFTfugHHNOHfPC3B4NSGfRmNE4zs+ZXM2ikT8//RUU=".to_string();
		let json = serde_json::to_value(&peer).unwrap();
		assert_eq!(json["privateKey"], peer.private_key);
	}

	#[test]
	fn peer_deserializes_with_missing_optional_fields() {
		let json = format!("{{\"publicKey\":\"{}\"}}", KEY_A);
		let peer: Peer = serde_json::from_str(&json).unwrap();
		assert!(peer.private_key.is_empty());
		assert!(peer.allowed_ips.is_empty());
		assert_eq!(peer.persistent_keepalive, 0);
	}

	#[test]
	fn peer_debug_redacts_secrets() {
		let mut peer = Peer::from_spec(&sample_spec());
		peer.private_key = "BDFTfugHHNOHfPC3B4NSGfRmNE4zs+ZXM2ikT8//RUU=".to_string();
		peer.pre_shared_key = "s1t2u3v4AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY9=".to_string();
		let debug = format!("{:?}", peer);
		assert!(!debug.contains(&peer.private_key));
		assert!(!debug.contains(&peer.pre_shared_key));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn allowed_ips_validation_accepts_cidrs() {
		let ips = vec!["10.0.0.2/32".to_string(), "fd00::/64".to_string()];
		assert!(validate_allowed_ips(&ips).is_ok());
	}

	#[test]
	fn allowed_ips_validation_rejects_garbage() {
		for bad in ["10.0.0.2", "not-a-network", "10.0.0.0/33", "; reboot"] {
			let err = validate_allowed_ips(&[bad.to_string()]).unwrap_err();
			assert!(matches!(err, WgError::InvalidInput(_)), "{bad}");
		}
	}

	#[test]
	fn allowed_ips_validation_accepts_empty_list() {
		assert!(validate_allowed_ips(&[]).is_ok());
	}

	#[test]
	fn update_request_uses_camel_case() {
		let req: UpdateAllowedIpsRequest =
			serde_json::from_str("{\"allowedIps\":[\"10.0.0.3/32\"]}").unwrap();
		assert_eq!(req.allowed_ips, vec!["10.0.0.3/32".to_string()]);
	}

	#[test]
	fn create_request_uses_snake_case() {
		let req: CreatePeerRequest = serde_json::from_str(
			"{\"allowed_ips\":[\"10.100.0.2/32\"],\"persistent_keepalive\":25}",
		)
		.unwrap();
		assert_eq!(req.allowed_ips, vec!["10.100.0.2/32".to_string()]);
		assert_eq!(req.persistent_keepalive, 25);
		assert!(req.preshared_key.is_empty());
	}
}
