use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::media::{AudioSink, LocalAudioTrack, RoomConnection, VideoSink};
use crate::session::lifecycle::ConnectionState;

/// 控制器独占的会话资源。
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) phase: ConnectionState,
    pub(crate) session_id: Option<String>,
    pub(crate) access_token: Option<String>,
    pub(crate) transport: Option<Arc<dyn RoomConnection>>,
    pub(crate) local_audio: Option<Arc<dyn LocalAudioTrack>>,
    pub(crate) router: Option<JoinHandle<()>>,
}

impl SessionState {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.phase,
            session_id: self.session_id.clone(),
            has_access_token: self.access_token.is_some(),
            has_transport: self.transport.is_some(),
            has_local_audio: self.local_audio.is_some(),
        }
    }
}

/// 会话状态的只读快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub has_access_token: bool,
    pub has_transport: bool,
    pub has_local_audio: bool,
}

impl SessionSnapshot {
    pub fn all_handles_present(&self) -> bool {
        self.session_id.is_some()
            && self.has_access_token
            && self.has_transport
            && self.has_local_audio
    }

    pub fn all_handles_released(&self) -> bool {
        self.session_id.is_none()
            && !self.has_access_token
            && !self.has_transport
            && !self.has_local_audio
    }

    /// Active 时四个句柄齐全，Idle 时全部为空。
    pub fn is_consistent(&self) -> bool {
        match self.state {
            ConnectionState::Active => self.all_handles_present(),
            ConnectionState::Idle => self.all_handles_released(),
            ConnectionState::Connecting | ConnectionState::Stopping => true,
        }
    }
}

/// 远端媒体绑定到的渲染目标，路由任务与清理流程共享。
pub(crate) struct SinkRegistry {
    pub(crate) video: Arc<dyn VideoSink>,
    pub(crate) video_track: Option<String>,
    pub(crate) audio: Vec<(String, Arc<dyn AudioSink>)>,
}

impl SinkRegistry {
    pub(crate) fn new(video: Arc<dyn VideoSink>) -> Self {
        Self {
            video,
            video_track: None,
            audio: Vec::new(),
        }
    }

    /// 取出所有待释放的目标，视频目标仅在绑定过轨道时返回。
    pub(crate) fn drain(&mut self) -> DrainedSinks {
        let video = self.video_track.take().map(|_| Arc::clone(&self.video));
        let audio = std::mem::take(&mut self.audio)
            .into_iter()
            .map(|(_, sink)| sink)
            .collect();
        DrainedSinks { video, audio }
    }

    #[cfg(test)]
    pub(crate) fn audio_sink_count(&self) -> usize {
        self.audio.len()
    }
}

pub(crate) struct DrainedSinks {
    pub(crate) video: Option<Arc<dyn VideoSink>>,
    pub(crate) audio: Vec<Arc<dyn AudioSink>>,
}

/// 锁内不跨 await，中毒时沿用内部数据。
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
