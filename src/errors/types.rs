use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestbenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Sandbox launch error: {0}")]
    Launch(String),

    #[error("Suite error: {0}")]
    Suite(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Grade threshold not met: {0}")]
    GradeThreshold(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
