/// Error types for the web-tester crate.
use thiserror::Error;

/// Errors raised while writing or reading a scenario file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to serialize scenario: {0}")]
    Serialize(#[source] sonic_rs::Error),

    #[error("Malformed scenario document: {0}")]
    Parse(#[source] sonic_rs::Error),

    #[error("Scenario document is null")]
    NullScenario,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that prevent an execution from starting at all.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("No transport configured")]
    MissingTransport,

    #[error("In-flight limit must be at least 1")]
    ZeroInFlightLimit,

    #[error("Unable to load scenario: {0}")]
    Scenario(#[from] StoreError),
}

/// A payload could not be turned into a request.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct BuildError(pub String);

/// Sending a single request failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The response handler rejected a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// Per-sample failure, recorded in the outcome and never fatal to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}

/// Fatal errors returned from a scenario execution.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Failed to build request for sample {index}: {source}")]
    Build {
        index: usize,
        #[source]
        source: BuildError,
    },

    #[error("Expected {expected} outcomes but the result channel closed after {received}")]
    Incomplete { expected: usize, received: usize },
}

impl From<StoreError> for ExecuteError {
    fn from(err: StoreError) -> Self {
        ExecuteError::Setup(SetupError::Scenario(err))
    }
}
