// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error-to-status mapping. The sole place the taxonomy becomes HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use wgctl_core::{ErrorResponse, RotationFailureResponse, WgError};

use crate::logging;

#[derive(Debug)]
pub struct ApiError(WgError);

impl From<WgError> for ApiError {
	fn from(err: WgError) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let ApiError(err) = self;
		let message = err.to_string();
		match err {
			WgError::PeerNotFound(key) => {
				tracing::info!(public_key = %key, "peer not found");
				error_body(StatusCode::NOT_FOUND, message)
			}
			WgError::InvalidInput(_) => error_body(StatusCode::BAD_REQUEST, message),
			WgError::CommandTimeout { .. } => {
				tracing::warn!(error = %message, "wireguard utility timed out");
				error_body(StatusCode::SERVICE_UNAVAILABLE, message)
			}
			WgError::CommandFailed(_) | WgError::KeyGeneration(_) => {
				tracing::error!(error = %message, "wireguard utility failure");
				// Subprocess output could in principle carry key material;
				// it passes the same mask as log lines.
				error_body(StatusCode::INTERNAL_SERVER_ERROR, logging::redact(&message))
			}
			WgError::RotationIncomplete { new_peer, reason } => {
				tracing::error!(
					new_public_key = %new_peer.public_key,
					error = %reason,
					"rotation left an orphaned peer"
				);
				// The embedded record carries the only copy of the new
				// private key; the caller must receive it alongside the
				// error.
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(RotationFailureResponse {
						error: message,
						peer: *new_peer,
					}),
				)
					.into_response()
			}
		}
	}
}

fn error_body(status: StatusCode, message: String) -> Response {
	(status, Json(ErrorResponse { error: message })).into_response()
}
