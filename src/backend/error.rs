use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
    #[error("backend request task aborted: {message}")]
    Aborted { message: String },
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallInitError {
    /// 后端返回 `success: false`，消息原样透出。
    #[error("{message}")]
    Rejected { message: String },
    #[error("call initialization failed: {0}")]
    Backend(BackendError),
}

impl CallInitError {
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
