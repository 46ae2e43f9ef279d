use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrayCfgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not resolve placeholder '{key}' in value \"{expression}\"")]
    UnresolvablePlaceholder { key: String, expression: String },

    #[error("Circular or too deeply nested placeholder reference in \"{0}\"")]
    PlaceholderDepth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, GrayCfgError>;
