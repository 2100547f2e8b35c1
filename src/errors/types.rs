use thiserror::Error;

#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Compiled schema error: {0}")]
    Schema(String),

    #[error("Hard dependency not met: {0}")]
    HardDependencyNotMet(String),

    #[error("Materialization error: {0}")]
    Materialization(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
