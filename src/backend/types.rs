use serde::{Deserialize, Serialize};

use crate::backend::error::CallInitError;
use crate::persona::AvatarProfile;

const DEFAULT_REJECTION_MESSAGE: &str = "call initialization rejected";

/// `POST /token` 的响应体。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub session_id: String,
    pub token: String,
}

/// `POST /initialize_call` 的请求体：形象字段平铺，再附上 session id。
#[derive(Debug, Clone, Serialize)]
pub struct InitializeCallRequest {
    #[serde(flatten)]
    pub profile: AvatarProfile,
    pub session_id: String,
}

impl InitializeCallRequest {
    pub fn new<S: Into<String>>(profile: AvatarProfile, session_id: S) -> Self {
        Self {
            profile,
            session_id: session_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeCallResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl InitializeCallResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<(), CallInitError> {
        if self.success {
            return Ok(());
        }

        let message = self
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());
        Err(CallInitError::rejected(message))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCallRequest {
    pub session_id: String,
}

impl StopCallRequest {
    pub fn new<S: Into<String>>(session_id: S) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}
