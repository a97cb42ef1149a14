use std::net::SocketAddr;

use fnlog_core::error::{FnlogError, Result};
use tonic::transport::Server;

use crate::otlp::grpc::GrpcIngest;
use crate::otlp::http;
use crate::pipeline::Pipeline;

/// Serves OTLP/gRPC and OTLP/HTTP ingest until either listener fails.
pub async fn run_ingest_servers(
    pipeline: Pipeline,
    grpc_addr: SocketAddr,
    http_addr: SocketAddr,
) -> Result<()> {
    let grpc = GrpcIngest::new(pipeline.clone());
    let http_router = http::router(pipeline);

    let grpc_task = tokio::spawn(async move {
        Server::builder()
            .add_service(grpc.logs_service())
            .serve(grpc_addr)
            .await
    });

    let http_listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .map_err(|e| FnlogError::Io(format!("bind OTLP/HTTP {http_addr}: {e}")))?;
    tracing::info!(%grpc_addr, %http_addr, "otlp ingest listening");
    let http_task = tokio::spawn(async move { axum::serve(http_listener, http_router).await });

    tokio::select! {
        res = grpc_task => {
            let inner = res.map_err(|e| FnlogError::Internal(format!("gRPC task join failed: {e}")))?;
            inner.map_err(|e| FnlogError::Io(format!("gRPC server failed: {e}")))
        }
        res = http_task => {
            let inner = res.map_err(|e| FnlogError::Internal(format!("HTTP task join failed: {e}")))?;
            inner.map_err(|e| FnlogError::Io(format!("HTTP server failed: {e}")))
        }
    }
}
