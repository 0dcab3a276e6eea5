// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard peer-management API server binary.

use clap::{Parser, Subcommand};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wgctl_config::{Config, Environment};
use wgctl_gateway::{WgCli, WgGateway};
use wgctl_server::logging::RedactingMakeWriter;
use wgctl_server::{router, AppState};
use wgctl_service::PeerService;

/// wgctl-server - HTTP control plane for one WireGuard interface.
#[derive(Parser, Debug)]
#[command(name = "wgctl-server", about = "WireGuard peer management API", version)]
struct Args {
	/// Override the configured HTTP port
	#[arg(long)]
	port: Option<u16>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("wgctl-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let mut config = Config::from_env()?;
	if let Some(port) = args.port {
		config.http_port = port;
	}

	init_tracing(config.environment);

	tracing::info!(
		interface = %config.interface,
		port = config.http_port,
		environment = %config.environment,
		endpoint_configured = config.server_endpoint().is_some(),
		"starting wgctl-server"
	);

	let gateway: Arc<dyn WgGateway> = Arc::new(WgCli::new(
		&config.interface,
		config.command_timeout,
		config.keygen_timeout,
	));

	// The server private key is needed once, to derive the public key that
	// goes into client artifacts; nothing downstream ever sees it.
	let server_public_key = gateway
		.derive_public_key(&config.server_private_key)
		.await
		.map_err(|e| anyhow::anyhow!("failed to derive the server public key: {e}"))?;
	config.server_private_key.clear();
	tracing::info!(server_public_key = %server_public_key, "derived server public key");

	let service = Arc::new(PeerService::new(
		Arc::clone(&gateway),
		server_public_key,
		config.server_endpoint(),
		config.client_dns.clone(),
		config.client_mtu,
	));

	let app = router(AppState { service, gateway });

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(
			listener,
			app.into_make_service_with_connect_info::<SocketAddr>(),
		)
		.into_future() => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}

fn init_tracing(environment: Environment) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	let writer = RedactingMakeWriter::new(std::io::stdout);

	if environment == Environment::Production {
		tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer().json().with_writer(writer))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer().with_writer(writer))
			.init();
	}
}
