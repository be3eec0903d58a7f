use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config: invalid unhandled-rejection mode '{0}' (expected warn, strict or none)")]
    InvalidRejectionMode(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
