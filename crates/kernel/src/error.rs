use pps_common::ParamError;

/// Errors raised by a compute backend while moving or processing agent buffers.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("population size mismatch: buffers hold {expected} agents, got {actual}")]
    PopulationMismatch { expected: usize, actual: usize },
    #[error("slot {slot} out of range for {count} generation buffers")]
    SlotOutOfRange { slot: usize, count: usize },
    #[error("read and write slot alias (slot {0})")]
    AliasedSlots(usize),
    #[error("at least two generation buffers are required, got {0}")]
    TooFewSlots(usize),
    #[error("device error: {0}")]
    Device(String),
    #[error("readback failed: {0}")]
    Readback(String),
}

/// Errors from configuring or driving a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
