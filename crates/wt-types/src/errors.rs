use thiserror::Error;

/// Main error type for the WeightTune system
#[derive(Error, Debug)]
pub enum WtError {
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Sweep error: {0}")]
    Sweep(#[from] SweepError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Grid construction errors
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid size overflows usize")]
    TooLarge,

    #[error("Dimension count mismatch: grid has {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failure of a single collaborator run.
///
/// These never abort a sweep; the evaluator records the failure sentinel
/// in place of the outcome.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} terminated without an exit code")]
    Terminated { program: String },

    #[error("{program} timed out after {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u128 },
}

/// Unrecoverable sweep errors
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not spawn any worker threads")]
    NoWorkers,

    #[error("{role} thread panicked")]
    Panicked { role: &'static str },

    #[error("Collected {received} results but generated {expected} candidates")]
    IncompleteResults { expected: usize, received: usize },
}

/// Result type alias for WeightTune operations
pub type WtResult<T> = Result<T, WtError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::WtError::Config(format!($($arg)*))
    };
}
