use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeepNewsError>;

#[derive(Error, Debug)]
pub enum DeepNewsError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("BigKinds error: {0}")]
    BigKinds(#[from] bigkinds::BigKindsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod analysis;
pub mod bigkinds;
pub mod commands;
pub mod config;
pub mod mcp;
pub mod responses;
pub mod trends;
pub mod widgets;
