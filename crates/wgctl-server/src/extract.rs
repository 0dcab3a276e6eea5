// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use wgctl_core::{PublicKey, WgError};

use crate::error::ApiError;

/// JSON extractor whose rejection is a 400 `{error}` body. A request that
/// fails to decode never reaches the service, let alone the utility.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		match Json::<T>::from_request(req, state).await {
			Ok(Json(value)) => Ok(ApiJson(value)),
			Err(rejection) => Err(ApiError::from(WgError::InvalidInput(rejection.body_text()))),
		}
	}
}

/// Validates a public key taken from a path or body parameter. Empty and
/// malformed keys are rejected before anything is shelled out.
pub fn parse_public_key(raw: &str) -> Result<PublicKey, ApiError> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err(ApiError::from(WgError::InvalidInput(
			"public key must not be empty".to_string(),
		)));
	}
	PublicKey::from_base64(trimmed)
		.map_err(|e| ApiError::from(WgError::InvalidInput(format!("invalid public key: {e}"))))
}

/// Keeps `[A-Za-z0-9_-]` and maps everything else to `-`, so base64
/// `/ + =` never reach a Content-Disposition header.
pub fn sanitize_filename(raw: &str) -> String {
	raw.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
				c
			} else {
				'-'
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_strips_base64_specials() {
		assert_eq!(
			sanitize_filename("mK04/7z4+M24qLMVu2aSNwJjgCR97FPbyxsZ3gxNWg=="),
			"mK04-7z4-M24qLMVu2aSNwJjgCR97FPbyxsZ3gxNWg--"
		);
	}

	#[test]
	fn sanitize_keeps_safe_characters() {
		assert_eq!(sanitize_filename("peer_01-abc"), "peer_01-abc");
	}

	#[test]
	fn empty_public_key_is_rejected() {
		assert!(parse_public_key("").is_err());
		assert!(parse_public_key("   ").is_err());
	}

	#[test]
	fn malformed_public_key_is_rejected() {
		assert!(parse_public_key("not-a-key").is_err());
	}

	#[test]
	fn valid_public_key_parses() {
		let key = parse_public_key("mK0477z4M24qLMVu2aSNwJjgCR97FPbyxsZ3+gx/NWg=").unwrap();
		assert_eq!(
			key.to_base64(),
			"mK0477z4M24qLMVu2aSNwJjgCR97FPbyxsZ3+gx/NWg="
		);
	}
}
