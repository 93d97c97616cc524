use std::sync::Arc;

use thiserror::Error;

use crate::media::transport::InboundTrack;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("render sink failure: {message}")]
    Render { message: String },
}

impl SinkError {
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// 视频渲染目标。`attach` 会替换掉之前绑定的源。
pub trait VideoSink: Send + Sync {
    fn attach(&self, track: &InboundTrack) -> Result<(), SinkError>;

    /// 停止播放并清空源。
    fn release(&self) -> Result<(), SinkError>;
}

/// 隐藏、自动播放的音频渲染目标，每条远端音频轨道一个。
pub trait AudioSink: Send + Sync {
    fn attach(&self, track: &InboundTrack) -> Result<(), SinkError>;

    /// 停止播放、清空源并移除该目标。
    fn release(&self) -> Result<(), SinkError>;
}

/// 宿主页面：按标识查找视频目标，并按需创建音频目标。
pub trait RenderSurface: Send + Sync {
    fn video_sink(&self, id: &str) -> Option<Arc<dyn VideoSink>>;

    fn create_audio_sink(&self) -> Arc<dyn AudioSink>;
}
