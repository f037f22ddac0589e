//! Skylark Flight SQL server binary.
//!
//! Serves the Flight SQL producer over gRPC, backed by the in-memory
//! reference engine.

use std::net::SocketAddr;
use std::sync::Arc;

use arrow_flight::flight_service_server::FlightServiceServer;
use clap::Parser;
use skylark_gateway::mem::MemEngine;
use skylark_gateway::{metrics, telemetry, SkylarkFlightSqlService};
use tonic::transport::Server;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "skylark-gateway")]
#[command(about = "Skylark Flight SQL server")]
struct Args {
    /// Listen address for the Flight SQL service
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:50051")]
    listen_addr: SocketAddr,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Seed the engine with the demo catalog
    #[arg(long, env = "DEMO_DATA", default_value = "true")]
    demo_data: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    telemetry::init(&args.log_level)?;
    metrics::init_metrics();

    info!("Starting Skylark Flight SQL server");
    info!("  Listen address: {}", args.listen_addr);
    info!("  Demo data: {}", args.demo_data);

    let engine = if args.demo_data {
        MemEngine::with_demo_data()
    } else {
        MemEngine::new()
    };
    let service = SkylarkFlightSqlService::new(Arc::new(engine));

    Server::builder()
        .add_service(FlightServiceServer::new(service))
        .serve_with_shutdown(args.listen_addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
