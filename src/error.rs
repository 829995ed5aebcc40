use thiserror::Error;

/// Main error type for the hatchery deployer
#[derive(Debug, Error)]
pub enum HatcheryError {
    // Deployment conflicts and lookups
    #[error("Tenant already deployed: {0}")]
    TenantExists(String),

    #[error("No deployment found for tenant: {0}")]
    TenantNotFound(String),

    #[error("Worker already running for tenant: {0}")]
    WorkerAlreadyRunning(String),

    #[error("Capacity exceeded: {current} of {limit} instances deployed")]
    CapacityExceeded { limit: usize, current: usize },

    // Worker lifecycle errors
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Failed to stop worker {0}: {1}")]
    StopFailed(String, String),

    // Instance store errors
    #[error("Failed to load instance store: {0}")]
    StateLoadError(String),

    #[error("Failed to save instance store: {0}")]
    StateSaveError(String),

    #[error("Instance document corruption detected: {0}")]
    StateCorruption(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Workspace packaging errors
    #[error("Workspace error: {0}")]
    WorkspaceError(String),

    // Config watch errors
    #[error("Watch error: {0}")]
    WatchError(String),

    // IPC-related errors
    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Failed to connect to daemon: {0}")]
    ConnectionError(String),

    #[error("IPC protocol error: {0}")]
    ProtocolError(String),

    #[error("Daemon not running")]
    DaemonNotRunning,

    // Invalid input
    #[error("Invalid tenant id: {0}")]
    InvalidTenantId(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for hatchery operations
pub type Result<T> = std::result::Result<T, HatcheryError>;
