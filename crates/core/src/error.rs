use thiserror::Error;

#[derive(Debug, Error)]
pub enum FnlogError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("field parse error: {0}")]
    FieldParse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FnlogError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::Decode(_)
                | Self::PayloadTooLarge(_)
                | Self::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FnlogError>;
