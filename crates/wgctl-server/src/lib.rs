// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface for the peer-management service.
//!
//! Decodes and validates requests, dispatches to the peer service, maps
//! the error taxonomy to status codes, and exposes liveness/readiness
//! probes. This is the only layer that knows about HTTP.

pub mod error;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
