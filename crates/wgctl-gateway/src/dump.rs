// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parser for `wg show <iface> dump` output.
//!
//! The dump is line-oriented with whitespace-separated fields. The first
//! line describes the interface itself (private key, public key, listen
//! port, fwmark) and never yields a peer. Every following line is exactly
//! eight fields: public key, preshared key, endpoint, allowed-ips CSV,
//! latest-handshake seconds, rx bytes, tx bytes, persistent-keepalive
//! (`off` or seconds). The literal `(none)` marks an absent value.

use wgctl_core::{Peer, PublicKey};

const NONE_MARKER: &str = "(none)";
const PEER_FIELD_COUNT: usize = 8;

pub fn parse(raw: &str) -> Vec<Peer> {
	let mut lines = raw.lines().filter(|line| !line.trim().is_empty());

	// Interface header line; its fields are not peer fields.
	if lines.next().is_none() {
		return Vec::new();
	}

	let mut peers = Vec::new();
	for line in lines {
		match parse_peer_line(line) {
			Some(peer) => peers.push(peer),
			None => {
				// The line may carry a preshared key; log only its shape.
				tracing::warn!(
					fields = line.split_whitespace().count(),
					"skipping malformed dump line"
				);
			}
		}
	}
	peers
}

fn parse_peer_line(line: &str) -> Option<Peer> {
	let fields: Vec<&str> = line.split_whitespace().collect();
	if fields.len() != PEER_FIELD_COUNT {
		return None;
	}

	let public_key = PublicKey::from_base64(fields[0]).ok()?;
	let allowed_ips = if fields[3] == NONE_MARKER {
		Vec::new()
	} else {
		fields[3].split(',').map(str::to_string).collect()
	};
	let persistent_keepalive = if fields[7] == "off" {
		0
	} else {
		fields[7].parse().unwrap_or(0)
	};

	Some(Peer {
		private_key: String::new(),
		public_key,
		pre_shared_key: none_to_empty(fields[1]),
		endpoint: none_to_empty(fields[2]),
		allowed_ips,
		latest_handshake: fields[4].parse().unwrap_or(0),
		receive_bytes: fields[5].parse().unwrap_or(0),
		transmit_bytes: fields[6].parse().unwrap_or(0),
		persistent_keepalive,
	})
}

fn none_to_empty(field: &str) -> String {
	if field == NONE_MARKER {
		String::new()
	} else {
		field.to_string()
	}
}
