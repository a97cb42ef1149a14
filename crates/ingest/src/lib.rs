pub mod normalize;
pub mod otlp;
pub mod pipeline;
pub mod server;
