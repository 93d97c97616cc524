use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::error::BackendError;
use crate::backend::types::{
    InitializeCallRequest, InitializeCallResponse, SessionCredentials, StopCallRequest,
};
use crate::backend::{CallControlService, CredentialService};

const TARGET: &str = "backend";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const TOKEN_PATH: &str = "token";
const INITIALIZE_CALL_PATH: &str = "initialize_call";
const STOP_CALL_PATH: &str = "stop_call";

/// 基于 ureq 的后端客户端，阻塞请求放在 `spawn_blocking` 中执行。
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new<S: Into<String>>(base_url: S, api_key: Option<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout<S: Into<String>>(
        base_url: S,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into();
        if api_key.is_none() {
            warn!(target: TARGET, %base_url, "backend client has no api key");
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url,
            api_key,
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, R, F>(&self, path: &str, body: &B, decode: F) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: Send + 'static,
        F: FnOnce(ureq::Response, &str) -> Result<R, BackendError> + Send + 'static,
    {
        let endpoint = self.endpoint(path);
        let payload = serde_json::to_value(body).map_err(|err| BackendError::Decode {
            endpoint: endpoint.clone(),
            message: format!("failed to encode request: {err}"),
        })?;
        let agent = self.agent.clone();
        let authorization = self.api_key.as_ref().map(|key| format!("Bearer {key}"));

        debug!(target: TARGET, %endpoint, "sending backend request");

        tokio::task::spawn_blocking(move || {
            let mut request = agent.post(&endpoint);
            if let Some(value) = authorization.as_deref() {
                request = request.set("Authorization", value);
            }

            match request.send_json(payload) {
                Ok(response) => decode(response, &endpoint),
                Err(ureq::Error::Status(status, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    warn!(target: TARGET, %endpoint, status, "backend returned error status");
                    Err(BackendError::Status {
                        endpoint,
                        status,
                        body,
                    })
                }
                Err(ureq::Error::Transport(transport)) => Err(BackendError::Network {
                    endpoint,
                    message: transport.to_string(),
                }),
            }
        })
        .await
        .map_err(|err| BackendError::Aborted {
            message: err.to_string(),
        })?
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        self.post(path, body, |response, endpoint| {
            response
                .into_json::<R>()
                .map_err(|err| BackendError::Decode {
                    endpoint: endpoint.to_string(),
                    message: err.to_string(),
                })
        })
        .await
    }
}

#[async_trait]
impl CredentialService for HttpBackend {
    async fn issue_credentials(&self) -> Result<SessionCredentials, BackendError> {
        self.post_json(TOKEN_PATH, &serde_json::json!({})).await
    }
}

#[async_trait]
impl CallControlService for HttpBackend {
    async fn initialize_call(
        &self,
        request: &InitializeCallRequest,
    ) -> Result<InitializeCallResponse, BackendError> {
        self.post_json(INITIALIZE_CALL_PATH, request).await
    }

    async fn stop_call(&self, request: &StopCallRequest) -> Result<(), BackendError> {
        // 响应体内容不关心，只看状态码。
        self.post(STOP_CALL_PATH, request, |_, _| Ok(())).await
    }
}
