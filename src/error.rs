use thiserror::Error;

/// Failure of the delegated parsing path. Every variant is recoverable: the
/// orchestrator falls back to manual parsing and hands the error back as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("nothing to parse")]
    EmptyInput,
    #[error("API key was rejected")]
    AuthenticationFailed,
    #[error("API quota exceeded, try again later")]
    QuotaExceeded,
    #[error("parsing service returned HTTP {0}")]
    ServiceError(u16),
    #[error("could not read the service response: {0}")]
    MalformedResponse(String),
    #[error("could not reach the parsing service: {0}")]
    Network(String),
}
