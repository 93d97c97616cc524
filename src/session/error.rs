use thiserror::Error;

use crate::backend::{BackendError, CallInitError};
use crate::media::{DeviceError, TransportError};
use crate::persona::UnknownPersona;
use crate::session::lifecycle::ConnectionState;

/// 构造期或 `start()` 之前即可发现的配置问题。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("video element id is required")]
    MissingVideoTarget,
    #[error("api key is required outside local development")]
    MissingApiKey,
    #[error("render target `{id}` not found")]
    RenderTargetNotFound { id: String },
    #[error(transparent)]
    UnknownPersona(#[from] UnknownPersona),
    #[error("invalid sdk options: {message}")]
    InvalidOptions { message: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("credential request failed: {0}")]
    Credential(BackendError),
    #[error(transparent)]
    CallInit(#[from] CallInitError),
    #[error("transport connection failed: {0}")]
    Transport(#[from] TransportError),
    #[error("microphone unavailable: {0}")]
    Device(#[from] DeviceError),
    #[error("session is {}; operation rejected", .state.as_str())]
    Busy { state: ConnectionState },
}

impl SdkError {
    pub fn kind(&self) -> &'static str {
        match self {
            SdkError::Configuration(_) => "configuration",
            SdkError::Credential(_) => "credential",
            SdkError::CallInit(_) => "call_init",
            SdkError::Transport(_) => "transport",
            SdkError::Device(_) => "device",
            SdkError::Busy { .. } => "busy",
        }
    }
}
