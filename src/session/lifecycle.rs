//! 会话生命周期状态与广播负载定义。

use std::time::SystemTime;

/// 控制器的连接状态。只有 Idle 与 Active 是稳定态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Active,
    Stopping,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Stopping => "stopping",
        }
    }
}

/// 广播给订阅方的生命周期阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecyclePhase {
    Connecting,
    Active,
    Stopping,
    Idle,
    Failed,
}

impl From<ConnectionState> for SessionLifecyclePhase {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Idle => SessionLifecyclePhase::Idle,
            ConnectionState::Connecting => SessionLifecyclePhase::Connecting,
            ConnectionState::Active => SessionLifecyclePhase::Active,
            ConnectionState::Stopping => SessionLifecyclePhase::Stopping,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionLifecyclePayload {
    #[default]
    None,
    Failed(FailurePayload),
    Notice(NoticePayload),
}

/// 启动失败的上下文信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePayload {
    pub step: &'static str,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticePayload {
    pub message: String,
}

/// 生命周期事件。
#[derive(Debug, Clone)]
pub struct SessionLifecycleUpdate {
    pub session_id: Option<String>,
    pub phase: SessionLifecyclePhase,
    pub issued_at: SystemTime,
    pub payload: SessionLifecyclePayload,
}

impl SessionLifecycleUpdate {
    /// 构造一个空载荷的事件。
    pub fn new(session_id: Option<String>, phase: SessionLifecyclePhase) -> Self {
        Self {
            session_id,
            phase,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::None,
        }
    }

    /// 声明启动失败。
    pub fn failed(
        session_id: Option<String>,
        step: &'static str,
        kind: &'static str,
        error: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            phase: SessionLifecyclePhase::Failed,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::Failed(FailurePayload {
                step,
                kind,
                error: error.into(),
            }),
        }
    }

    /// 不改变阶段的提示，例如传输层报告断开。
    pub fn notice(
        session_id: Option<String>,
        phase: SessionLifecyclePhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            phase,
            issued_at: SystemTime::now(),
            payload: SessionLifecyclePayload::Notice(NoticePayload {
                message: message.into(),
            }),
        }
    }
}
