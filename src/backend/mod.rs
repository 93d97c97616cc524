//! 会话凭证与通话控制后端。

pub mod error;
pub mod http;
pub mod types;

pub use error::{BackendError, CallInitError};
pub use http::HttpBackend;
pub use types::{InitializeCallRequest, InitializeCallResponse, SessionCredentials, StopCallRequest};

use async_trait::async_trait;

/// 签发 session id 与媒体房间访问令牌。
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn issue_credentials(&self) -> Result<SessionCredentials, BackendError>;
}

/// 启动与结束 AI 对话。
#[async_trait]
pub trait CallControlService: Send + Sync {
    async fn initialize_call(
        &self,
        request: &InitializeCallRequest,
    ) -> Result<InitializeCallResponse, BackendError>;

    async fn stop_call(&self, request: &StopCallRequest) -> Result<(), BackendError>;
}
