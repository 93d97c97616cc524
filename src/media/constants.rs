use serde::Serialize;

/// 数字人一侧媒体发布者的身份前缀。
pub const MEDIA_PEER_PREFIX: &str = "media-";

/// 麦克风采集参数，面向语音识别固定，不对外开放配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioCaptureConstraints {
    pub channel_count: u16,
    pub sample_rate_hz: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

pub const SPEECH_CAPTURE: AudioCaptureConstraints = AudioCaptureConstraints {
    channel_count: 1,
    sample_rate_hz: 16_000,
    echo_cancellation: true,
    noise_suppression: true,
    auto_gain_control: true,
};

pub fn is_media_peer(identity: &str) -> bool {
    identity.starts_with(MEDIA_PEER_PREFIX)
}
