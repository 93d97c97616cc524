use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::media::constants::AudioCaptureConstraints;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

/// 远端订阅到的媒体轨道。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundTrack {
    pub sid: String,
    pub participant_identity: String,
    pub kind: TrackKind,
}

impl InboundTrack {
    pub fn new<S: Into<String>, P: Into<String>>(
        sid: S,
        participant_identity: P,
        kind: TrackKind,
    ) -> Self {
        Self {
            sid: sid.into(),
            participant_identity: participant_identity.into(),
            kind,
        }
    }
}

/// 传输层推送给控制器的房间事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    TrackSubscribed(InboundTrack),
    TrackUnsubscribed {
        participant_identity: String,
        sid: String,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },
    #[error("transport failure: {message}")]
    Other { message: String },
}

impl TransportError {
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("no microphone available")]
    NotFound,
    #[error("failed to publish microphone track: {message}")]
    Publish { message: String },
    #[error("microphone failure: {message}")]
    Other { message: String },
}

impl DeviceError {
    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// 本地麦克风轨道句柄。
pub trait LocalAudioTrack: Send + Sync {
    fn stop(&self) -> Result<(), DeviceError>;
}

/// 已建立的媒体房间连接。
#[async_trait]
pub trait RoomConnection: Send + Sync {
    async fn publish_audio(&self, track: &dyn LocalAudioTrack) -> Result<(), DeviceError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// 第三方实时媒体传输客户端。
#[async_trait]
pub trait MediaTransportClient: Send + Sync {
    /// 建立房间连接。`events` 在握手前交给传输层，之后订阅到的轨道都经由它送达。
    async fn connect(
        &self,
        url: &str,
        token: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn RoomConnection>, TransportError>;

    async fn create_microphone_track(
        &self,
        constraints: &AudioCaptureConstraints,
    ) -> Result<Arc<dyn LocalAudioTrack>, DeviceError>;
}
