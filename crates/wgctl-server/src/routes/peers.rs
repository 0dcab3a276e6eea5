// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer CRUD, rotation, and client-artifact handlers.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use wgctl_core::{ClientFileRequest, CreatePeerRequest, Peer, UpdateAllowedIpsRequest, WgError};

use crate::error::ApiError;
use crate::extract::{parse_public_key, sanitize_filename, ApiJson};
use crate::state::AppState;

/// GET /configs - all peers, never with private keys.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Peer>>, ApiError> {
	Ok(Json(state.service.get_all().await?))
}

/// POST /configs - create a peer with server-generated keys. The response
/// is the one and only time the private key leaves the process.
pub async fn create(
	State(state): State<AppState>,
	ApiJson(request): ApiJson<CreatePeerRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let peer = state.service.create_with_new_keys(request).await?;
	Ok((StatusCode::CREATED, Json(peer)))
}

/// GET /configs/{publicKey}
pub async fn get_by_public_key(
	State(state): State<AppState>,
	Path(public_key): Path<String>,
) -> Result<Json<Peer>, ApiError> {
	let key = parse_public_key(&public_key)?;
	Ok(Json(state.service.get(&key).await?))
}

/// PUT /configs/{publicKey}/allowed-ips - full replacement; an empty list
/// clears every allowed network.
pub async fn update_allowed_ips(
	State(state): State<AppState>,
	Path(public_key): Path<String>,
	ApiJson(request): ApiJson<UpdateAllowedIpsRequest>,
) -> Result<StatusCode, ApiError> {
	let key = parse_public_key(&public_key)?;
	state
		.service
		.update_allowed_ips(&key, request.allowed_ips)
		.await?;
	Ok(StatusCode::OK)
}

/// DELETE /configs/{publicKey} - idempotent at the utility level.
pub async fn remove(
	State(state): State<AppState>,
	Path(public_key): Path<String>,
) -> Result<StatusCode, ApiError> {
	let key = parse_public_key(&public_key)?;
	state.service.delete(&key).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// POST /configs/{publicKey}/rotate
pub async fn rotate(
	State(state): State<AppState>,
	Path(public_key): Path<String>,
) -> Result<Json<Peer>, ApiError> {
	let key = parse_public_key(&public_key)?;
	Ok(Json(state.service.rotate(&key).await?))
}

/// POST /configs/client-file - render the client `.conf` for a peer from
/// server-side settings plus the caller-supplied private key.
pub async fn client_file(
	State(state): State<AppState>,
	ApiJson(request): ApiJson<ClientFileRequest>,
) -> Result<Response, ApiError> {
	let key = parse_public_key(&request.client_public_key)?;
	if request.client_private_key.trim().is_empty() {
		return Err(ApiError::from(WgError::InvalidInput(
			"client private key must not be empty".to_string(),
		)));
	}

	let peer = state.service.get(&key).await?;
	let artifact = state
		.service
		.build_client_config(&peer, &request.client_private_key)?;

	let filename = sanitize_filename(&request.client_public_key);
	Ok((
		[
			(
				header::CONTENT_TYPE,
				"text/plain; charset=utf-8".to_string(),
			),
			(
				header::CONTENT_DISPOSITION,
				format!("attachment; filename=\"{filename}.conf\""),
			),
		],
		artifact,
	)
		.into_response())
}
