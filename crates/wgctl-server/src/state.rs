// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use wgctl_gateway::WgGateway;
use wgctl_service::PeerService;

/// Application state shared across handlers. The gateway handle exists
/// only for the readiness probe; everything else goes through the service.
#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PeerService>,
	pub gateway: Arc<dyn WgGateway>,
}
