// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `wg`-backed gateway implementation.
//!
//! Every invocation runs under a deadline; on expiry the child is killed
//! and the call reports `CommandTimeout`. Preshared keys travel on stdin
//! with a `/dev/stdin` argv token, never on the command line.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use wgctl_core::{KeyPair, Peer, PeerSpec, PublicKey, Result, WgError};

use crate::dump;
use crate::WgGateway;

const WG_PROGRAM: &str = "wg";

pub struct WgCli {
	program: String,
	interface: String,
	command_timeout: Duration,
	keygen_timeout: Duration,
}

impl WgCli {
	/// The interface name comes from configuration only; it is never taken
	/// from request input.
	pub fn new(
		interface: impl Into<String>,
		command_timeout: Duration,
		keygen_timeout: Duration,
	) -> Self {
		Self {
			program: WG_PROGRAM.to_string(),
			interface: interface.into(),
			command_timeout,
			keygen_timeout,
		}
	}

	/// Overrides the utility binary. Tests point this at stub scripts.
	pub fn with_program(mut self, program: impl Into<String>) -> Self {
		self.program = program.into();
		self
	}

	async fn run(&self, args: &[&str], stdin: Option<&[u8]>, deadline: Duration) -> Result<String> {
		tracing::debug!(program = %self.program, subcommand = %args.first().unwrap_or(&""), "running wireguard command");

		let mut command = Command::new(&self.program);
		command
			.args(args)
			.stdin(if stdin.is_some() {
				Stdio::piped()
			} else {
				Stdio::null()
			})
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let mut child = command
			.spawn()
			.map_err(|e| WgError::CommandFailed(format!("failed to run {}: {e}", self.program)))?;

		if let Some(bytes) = stdin {
			if let Some(mut pipe) = child.stdin.take() {
				pipe.write_all(bytes)
					.await
					.map_err(|e| WgError::CommandFailed(format!("failed to write stdin: {e}")))?;
				// The pipe closes here so the child sees EOF.
			}
		}

		// On expiry the output future is dropped and kill_on_drop reaps the
		// child, releasing its pipes.
		let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
			Ok(result) => result.map_err(|e| {
				WgError::CommandFailed(format!("failed to collect {} output: {e}", self.program))
			})?,
			Err(_) => return Err(WgError::CommandTimeout { timeout: deadline }),
		};

		if !output.status.success() {
			let mut detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
			let stderr = String::from_utf8_lossy(&output.stderr);
			let stderr = stderr.trim();
			if !stderr.is_empty() {
				if !detail.is_empty() {
					detail.push(' ');
				}
				detail.push_str(stderr);
			}
			return Err(WgError::CommandFailed(format!(
				"{} exited with {}: {detail}",
				self.program, output.status
			)));
		}

		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

/// Key-generation subprocess failures surface as `KeyGeneration`; deadline
/// expiry stays a timeout.
fn keygen_error(err: WgError) -> WgError {
	match err {
		WgError::CommandFailed(detail) => WgError::KeyGeneration(detail),
		other => other,
	}
}

#[async_trait]
impl WgGateway for WgCli {
	async fn list_peers(&self) -> Result<Vec<Peer>> {
		let raw = self
			.run(&["show", &self.interface, "dump"], None, self.command_timeout)
			.await?;
		Ok(dump::parse(&raw))
	}

	async fn upsert_peer(&self, spec: &PeerSpec) -> Result<()> {
		spec.validate()?;

		let public_key = spec.public_key.to_base64();
		let allowed_ips = spec.allowed_ips.join(",");
		let keepalive = spec.persistent_keepalive.to_string();

		let mut args = vec!["set", &self.interface, "peer", &public_key];
		if !spec.preshared_key.is_empty() {
			args.push("preshared-key");
			args.push("/dev/stdin");
		}
		// Always present: an empty string explicitly clears the list.
		args.push("allowed-ips");
		args.push(&allowed_ips);
		if spec.persistent_keepalive > 0 {
			args.push("persistent-keepalive");
			args.push(&keepalive);
		}

		let stdin = (!spec.preshared_key.is_empty()).then(|| spec.preshared_key.as_bytes());
		self.run(&args, stdin, self.command_timeout).await?;
		tracing::info!(public_key = %spec.public_key, "peer applied");
		Ok(())
	}

	async fn replace_allowed_ips(
		&self,
		public_key: &PublicKey,
		allowed_ips: &[String],
	) -> Result<()> {
		wgctl_core::validate_allowed_ips(allowed_ips)?;

		let key = public_key.to_base64();
		let csv = allowed_ips.join(",");
		self.run(
			&["set", &self.interface, "peer", &key, "allowed-ips", &csv],
			None,
			self.command_timeout,
		)
		.await?;
		tracing::info!(public_key = %public_key, "allowed networks replaced");
		Ok(())
	}

	async fn remove_peer(&self, public_key: &PublicKey) -> Result<()> {
		let key = public_key.to_base64();
		self.run(
			&["set", &self.interface, "peer", &key, "remove"],
			None,
			self.command_timeout,
		)
		.await?;
		tracing::info!(public_key = %public_key, "peer removed");
		Ok(())
	}

	async fn generate_keypair(&self) -> Result<KeyPair> {
		let raw = self
			.run(&["genkey"], None, self.keygen_timeout)
			.await
			.map_err(keygen_error)?;
		let private_key = raw.trim().to_string();
		if private_key.is_empty() {
			return Err(WgError::KeyGeneration(
				"genkey produced an empty private key".to_string(),
			));
		}

		let public_key = self.derive_public_key(&private_key).await?;
		Ok(KeyPair {
			private_key,
			public_key,
		})
	}

	async fn derive_public_key(&self, private_key: &str) -> Result<PublicKey> {
		let raw = self
			.run(&["pubkey"], Some(private_key.as_bytes()), self.keygen_timeout)
			.await
			.map_err(keygen_error)?;
		let encoded = raw.trim();
		if encoded.is_empty() {
			return Err(WgError::KeyGeneration(
				"pubkey produced an empty public key".to_string(),
			));
		}
		PublicKey::from_base64(encoded)
			.map_err(|e| WgError::KeyGeneration(format!("pubkey produced an invalid key: {e}")))
	}
}
