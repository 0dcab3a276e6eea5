// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod health;
pub mod peers;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware::log_requests;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/healthz", get(health::liveness))
		.route("/readyz", get(health::readiness))
		.route("/configs", get(peers::list).post(peers::create))
		.route("/configs/client-file", post(peers::client_file))
		.route(
			"/configs/{public_key}",
			get(peers::get_by_public_key).delete(peers::remove),
		)
		.route(
			"/configs/{public_key}/allowed-ips",
			put(peers::update_allowed_ips),
		)
		.route("/configs/{public_key}/rotate", post(peers::rotate))
		.layer(middleware::from_fn(log_requests))
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		)
		.with_state(state)
}
