// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use tokio::time::Instant;

/// Request-scoped logging: method, path, client IP, status, duration.
/// Bodies are never logged; key-bearing responses flow to the client
/// unobserved.
pub async fn log_requests(request: Request, next: Next) -> Response {
	let method = request.method().clone();
	let path = request.uri().path().to_string();
	let client_ip = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|info| info.0.ip().to_string())
		.unwrap_or_else(|| "-".to_string());

	let start = Instant::now();
	let response = next.run(request).await;

	tracing::info!(
		method = %method,
		path = %path,
		client_ip = %client_ip,
		status = response.status().as_u16(),
		duration_ms = start.elapsed().as_millis() as u64,
		"request handled"
	);
	response
}
