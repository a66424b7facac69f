use thiserror::Error;

#[derive(Error, Debug)]
pub enum PinpointError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Endpoint cannot carry query parameters: {0}")]
    EndpointNotQueryable(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),
}

pub type Result<T> = std::result::Result<T, PinpointError>;
