use opentelemetry_proto::tonic::collector::logs::v1::logs_service_server::{
    LogsService, LogsServiceServer,
};
use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use tonic::codec::CompressionEncoding;
use tonic::{Request, Response, Status};

use crate::otlp::decode::records_from_request;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct GrpcIngest {
    pipeline: Pipeline,
}

impl GrpcIngest {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// The decoding limit applies to the message after gzip decompression.
    pub fn logs_service(&self) -> LogsServiceServer<Self> {
        LogsServiceServer::new(self.clone())
            .accept_compressed(CompressionEncoding::Gzip)
            .max_decoding_message_size(self.pipeline.max_request_bytes())
    }
}

#[tonic::async_trait]
impl LogsService for GrpcIngest {
    async fn export(
        &self,
        request: Request<ExportLogsServiceRequest>,
    ) -> std::result::Result<Response<ExportLogsServiceResponse>, Status> {
        let records = records_from_request(request.get_ref());
        let resp = self.pipeline.ingest_records(records);
        tracing::debug!(count = resp.logs_added, "otlp grpc logs accepted");
        Ok(Response::new(ExportLogsServiceResponse::default()))
    }
}
