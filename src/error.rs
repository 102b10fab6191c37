use thiserror::Error;

#[derive(Debug, Error)]
pub enum FerryError {
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("telemetry fetch failed: {0}")]
    TelemetryFetch(#[from] TelemetryError),

    #[error("server failed: {0}")]
    Server(String),
}

/// Failures of a single telemetry poll. All of them are recoverable.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("transport error: {0}")]
    Transport(#[from] curl::Error),

    #[error("telemetry source answered with HTTP {0}")]
    Status(u32),

    #[error("malformed telemetry payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("telemetry fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("telemetry worker failed: {0}")]
    Worker(String),
}
