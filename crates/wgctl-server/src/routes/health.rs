// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use wgctl_core::{HealthResponse, ReadinessResponse, WgError};

use crate::state::AppState;

/// GET /healthz - constant-time liveness check.
pub async fn liveness() -> impl IntoResponse {
	Json(HealthResponse {
		status: "ok".to_string(),
	})
}

/// GET /readyz - readiness check that exercises the utility end to end.
///
/// Runs a full peer listing under the utility-call timeout; any failure
/// means the service cannot do useful work, with timeouts called out
/// separately in the message.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
	match state.gateway.list_peers().await {
		Ok(_) => (
			StatusCode::OK,
			Json(ReadinessResponse {
				status: "ready".to_string(),
				error: None,
			}),
		),
		Err(err) => {
			tracing::warn!(error = %err, "readiness probe failed");
			let message = match err {
				WgError::CommandTimeout { .. } => {
					"wireguard command timed out during readiness check".to_string()
				}
				other => format!("wireguard check failed: {other}"),
			};
			(
				StatusCode::SERVICE_UNAVAILABLE,
				Json(ReadinessResponse {
					status: "not ready".to_string(),
					error: Some(message),
				}),
			)
		}
	}
}
