pub mod decode;
pub mod envelope;
pub mod grpc;
pub mod http;
pub mod json;
