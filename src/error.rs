//! Error types for voicegate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceGateError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, VoiceGateError>;
