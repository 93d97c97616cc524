use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persona::{self, DEFAULT_PERSONA};
use crate::session::error::{ConfigError, SdkError};

pub const LOCAL_SERVER_URL: &str = "ws://localhost:7880";
pub const LOCAL_BACKEND_URL: &str = "http://localhost:8000";
pub const PRODUCTION_SERVER_URL: &str = "wss://media.avatar-session.app";
pub const PRODUCTION_BACKEND_URL: &str = "https://api.avatar-session.app";
pub const DEFAULT_EVENT_BUFFER: usize = 32;

/// 调用方提供的原始选项，字段名与页面侧配置一致。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkOptions {
    #[serde(default)]
    pub video_element_id: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub event_buffer: Option<usize>,
}

impl SdkOptions {
    pub fn new<S: Into<String>>(video_element_id: S) -> Self {
        Self {
            video_element_id: video_element_id.into(),
            ..Self::default()
        }
    }

    pub fn with_avatar<S: Into<String>>(mut self, avatar: S) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::InvalidOptions {
            message: err.to_string(),
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::InvalidOptions {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }
}

pub type ConnectedHook = Arc<dyn Fn() + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&SdkError) + Send + Sync>;

/// 连接成功与出错时的回调。
#[derive(Clone)]
pub struct SessionHooks {
    pub on_connected: ConnectedHook,
    pub on_error: ErrorHook,
}

impl Default for SessionHooks {
    fn default() -> Self {
        Self {
            on_connected: Arc::new(|| {}),
            on_error: Arc::new(|error: &SdkError| {
                warn!(target: "session_controller", %error, "avatar session error");
            }),
        }
    }
}

impl SessionHooks {
    pub fn on_connected<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_connected = Arc::new(hook);
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SdkError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(hook);
        self
    }
}

impl std::fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHooks").finish_non_exhaustive()
    }
}

/// 宿主环境描述，构造时显式传入。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    pub hostname: String,
}

impl EnvironmentDescriptor {
    pub fn new<S: Into<String>>(hostname: S) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn local() -> Self {
        Self::new("localhost")
    }

    pub fn is_local(&self) -> bool {
        let host = self.hostname.trim().to_ascii_lowercase();
        matches!(
            host.as_str(),
            "localhost" | "127.0.0.1" | "::1" | "[::1]" | "0.0.0.0"
        ) || host.ends_with(".local")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub server_url: String,
    pub backend_url: String,
}

pub fn resolve_endpoints(environment: &EnvironmentDescriptor) -> Endpoints {
    if environment.is_local() {
        Endpoints {
            server_url: LOCAL_SERVER_URL.to_string(),
            backend_url: LOCAL_BACKEND_URL.to_string(),
        }
    } else {
        Endpoints {
            server_url: PRODUCTION_SERVER_URL.to_string(),
            backend_url: PRODUCTION_BACKEND_URL.to_string(),
        }
    }
}

/// 解析后的不可变配置。
#[derive(Debug, Clone)]
pub struct SdkConfig {
    pub video_element_id: String,
    pub persona: String,
    pub server_url: String,
    pub backend_url: String,
    pub api_key: Option<String>,
    pub event_buffer: usize,
    pub hooks: SessionHooks,
}

impl SdkConfig {
    pub fn resolve(
        options: SdkOptions,
        hooks: SessionHooks,
        environment: &EnvironmentDescriptor,
    ) -> Result<Self, ConfigError> {
        let video_element_id = options.video_element_id.trim().to_string();
        if video_element_id.is_empty() {
            return Err(ConfigError::MissingVideoTarget);
        }

        let persona = options
            .avatar
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());
        persona::lookup(&persona)?;

        let api_key = non_empty(options.api_key);
        if api_key.is_none() {
            if !environment.is_local() {
                return Err(ConfigError::MissingApiKey);
            }
            warn!(
                target: "session_controller",
                hostname = %environment.hostname,
                "no api key configured; backend requests are unauthenticated"
            );
        }

        let endpoints = resolve_endpoints(environment);

        Ok(Self {
            video_element_id,
            persona,
            server_url: non_empty(options.server_url).unwrap_or(endpoints.server_url),
            backend_url: non_empty(options.backend_url).unwrap_or(endpoints.backend_url),
            api_key,
            event_buffer: options
                .event_buffer
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_EVENT_BUFFER),
            hooks,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
