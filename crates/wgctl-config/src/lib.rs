// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed configuration for the peer-management service.
//!
//! All values come from `WGCTL_*` environment variables; nothing else in
//! the workspace reads the environment. Invalid numeric values fall back
//! to their defaults with a warning rather than aborting startup.
//!
//! ```ignore
//! let config = wgctl_config::Config::from_env()?;
//! println!("managing {} on port {}", config.interface, config.http_port);
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_INTERFACE: &str = "wg0";
pub const DEFAULT_ENDPOINT_PORT: &str = "51820";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_KEYGEN_TIMEOUT_SECS: u64 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("WGCTL_SERVER_PRIVATE_KEY is not set; it is mandatory")]
	MissingServerPrivateKey,
}

/// Deployment environment tag; only affects log formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
	#[default]
	Development,
	Production,
	Test,
}

impl Environment {
	pub fn parse(value: &str) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"production" => Environment::Production,
			"test" => Environment::Test,
			_ => Environment::Development,
		}
	}
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Environment::Development => "development",
			Environment::Production => "production",
			Environment::Test => "test",
		};
		f.write_str(name)
	}
}

/// Fully resolved service configuration.
#[derive(Clone)]
pub struct Config {
	pub environment: Environment,
	pub http_port: u16,
	/// Name of the WireGuard interface this process manages.
	pub interface: String,
	/// Read once at boot to derive the server public key, then cleared by
	/// the caller.
	pub server_private_key: String,
	pub endpoint_host: String,
	pub endpoint_port: String,
	/// DNS servers written into client artifacts; empty omits the line.
	pub client_dns: String,
	/// MTU written into client artifacts; 0 omits the line.
	pub client_mtu: u32,
	pub command_timeout: Duration,
	pub keygen_timeout: Duration,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		let server_private_key = match std::env::var("WGCTL_SERVER_PRIVATE_KEY") {
			Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
			_ => return Err(ConfigError::MissingServerPrivateKey),
		};

		let endpoint_host = env_string("WGCTL_ENDPOINT_HOST", "");
		if endpoint_host.is_empty() {
			warn!("WGCTL_ENDPOINT_HOST is not set; client artifacts will omit the Endpoint line");
		}

		Ok(Self {
			environment: Environment::parse(&env_string("WGCTL_ENV", "development")),
			http_port: parse_u64(
				std::env::var("WGCTL_HTTP_PORT").ok(),
				"WGCTL_HTTP_PORT",
				u64::from(DEFAULT_HTTP_PORT),
			) as u16,
			interface: env_string("WGCTL_INTERFACE", DEFAULT_INTERFACE),
			server_private_key,
			endpoint_host,
			endpoint_port: env_string("WGCTL_ENDPOINT_PORT", DEFAULT_ENDPOINT_PORT),
			client_dns: env_string("WGCTL_CLIENT_DNS", ""),
			client_mtu: parse_u64(
				std::env::var("WGCTL_CLIENT_MTU").ok(),
				"WGCTL_CLIENT_MTU",
				0,
			) as u32,
			command_timeout: parse_timeout(
				std::env::var("WGCTL_WG_TIMEOUT_SECS").ok(),
				"WGCTL_WG_TIMEOUT_SECS",
				DEFAULT_COMMAND_TIMEOUT_SECS,
			),
			keygen_timeout: parse_timeout(
				std::env::var("WGCTL_KEYGEN_TIMEOUT_SECS").ok(),
				"WGCTL_KEYGEN_TIMEOUT_SECS",
				DEFAULT_KEYGEN_TIMEOUT_SECS,
			),
		})
	}

	/// External `host:port` clients should dial, `None` when no host is
	/// configured.
	pub fn server_endpoint(&self) -> Option<String> {
		if self.endpoint_host.is_empty() {
			return None;
		}
		if self.endpoint_port.is_empty() {
			return Some(self.endpoint_host.clone());
		}
		Some(format!("{}:{}", self.endpoint_host, self.endpoint_port))
	}

	pub fn socket_addr(&self) -> String {
		format!("0.0.0.0:{}", self.http_port)
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("environment", &self.environment)
			.field("http_port", &self.http_port)
			.field("interface", &self.interface)
			.field("server_private_key", &"[REDACTED]")
			.field("endpoint_host", &self.endpoint_host)
			.field("endpoint_port", &self.endpoint_port)
			.field("client_dns", &self.client_dns)
			.field("client_mtu", &self.client_mtu)
			.field("command_timeout", &self.command_timeout)
			.field("keygen_timeout", &self.keygen_timeout)
			.finish()
	}
}

fn env_string(key: &str, default: &str) -> String {
	match std::env::var(key) {
		Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
		_ => default.to_string(),
	}
}

fn parse_u64(value: Option<String>, key: &str, default: u64) -> u64 {
	match value {
		Some(raw) => match raw.trim().parse() {
			Ok(parsed) => parsed,
			Err(_) => {
				warn!(%key, value = %raw, default, "invalid integer value, using default");
				default
			}
		},
		None => default,
	}
}

/// Timeouts must be positive after defaulting; 0 or garbage falls back.
fn parse_timeout(value: Option<String>, key: &str, default_secs: u64) -> Duration {
	let secs = parse_u64(value, key, default_secs);
	if secs == 0 {
		warn!(%key, default = default_secs, "timeout must be positive, using default");
		return Duration::from_secs(default_secs);
	}
	Duration::from_secs(secs)
}
