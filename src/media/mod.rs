//! 媒体传输与渲染目标的协作接口。

pub mod constants;
pub mod sinks;
pub mod transport;

pub use constants::{is_media_peer, AudioCaptureConstraints, MEDIA_PEER_PREFIX, SPEECH_CAPTURE};
pub use sinks::{AudioSink, RenderSurface, SinkError, VideoSink};
pub use transport::{
    DeviceError, InboundTrack, LocalAudioTrack, MediaTransportClient, RoomConnection, TrackKind,
    TransportError, TransportEvent,
};
