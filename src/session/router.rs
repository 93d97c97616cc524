use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::media::{is_media_peer, InboundTrack, RenderSurface, TrackKind, TransportEvent};
use crate::session::lifecycle::{SessionLifecyclePhase, SessionLifecycleUpdate};
use crate::session::state::{lock, SessionState, SinkRegistry};

const TARGET: &str = "track_router";

/// 把传输层事件路由到渲染目标。
pub(crate) struct TrackRouter {
    session_id: String,
    state: Arc<Mutex<SessionState>>,
    sinks: Arc<Mutex<SinkRegistry>>,
    surface: Arc<dyn RenderSurface>,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
}

impl TrackRouter {
    pub(crate) fn new(
        session_id: String,
        state: Arc<Mutex<SessionState>>,
        sinks: Arc<Mutex<SinkRegistry>>,
        surface: Arc<dyn RenderSurface>,
        lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
    ) -> Self {
        Self {
            session_id,
            state,
            sinks,
            surface,
            lifecycle_tx,
        }
    }

    pub(crate) fn spawn(self, mut events: mpsc::Receiver<TransportEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.route(event);
            }
            debug!(target: TARGET, session_id = %self.session_id, "transport event channel closed");
        })
    }

    pub(crate) fn route(&self, event: TransportEvent) {
        match event {
            TransportEvent::TrackSubscribed(track) => self.bind(track),
            TransportEvent::TrackUnsubscribed {
                participant_identity,
                sid,
            } => self.unbind(&participant_identity, &sid),
            TransportEvent::Disconnected { reason } => {
                warn!(
                    target: TARGET,
                    session_id = %self.session_id,
                    %reason,
                    "transport reported disconnect"
                );
                // 握手期间也可能断开，提示沿用控制器当前阶段。
                let phase = SessionLifecyclePhase::from(lock(&self.state).phase);
                let update = SessionLifecycleUpdate::notice(
                    Some(self.session_id.clone()),
                    phase,
                    format!("media room disconnected: {reason}"),
                );
                let _ = self.lifecycle_tx.send(update);
            }
        }
    }

    fn bind(&self, track: InboundTrack) {
        if !is_media_peer(&track.participant_identity) {
            debug!(
                target: TARGET,
                participant = %track.participant_identity,
                sid = %track.sid,
                "ignoring track from non-media participant"
            );
            return;
        }

        debug!(
            target: TARGET,
            sid = %track.sid,
            kind = track.kind.as_str(),
            "binding inbound track"
        );
        let mut sinks = lock(&self.sinks);
        match track.kind {
            TrackKind::Video => match sinks.video.attach(&track) {
                Ok(()) => {
                    info!(target: TARGET, sid = %track.sid, "video track bound to render sink");
                    sinks.video_track = Some(track.sid);
                }
                Err(err) => {
                    warn!(target: TARGET, sid = %track.sid, %err, "failed to bind video track");
                }
            },
            TrackKind::Audio => {
                let sink = self.surface.create_audio_sink();
                match sink.attach(&track) {
                    Ok(()) => {
                        info!(target: TARGET, sid = %track.sid, "audio track bound to new audio sink");
                        sinks.audio.push((track.sid, sink));
                    }
                    Err(err) => {
                        warn!(target: TARGET, sid = %track.sid, %err, "failed to bind audio track");
                        if let Err(err) = sink.release() {
                            warn!(target: TARGET, %err, "failed to discard unused audio sink");
                        }
                    }
                }
            }
        }
    }

    fn unbind(&self, participant_identity: &str, sid: &str) {
        let mut sinks = lock(&self.sinks);

        if sinks.video_track.as_deref() == Some(sid) {
            sinks.video_track = None;
            if let Err(err) = sinks.video.release() {
                warn!(target: TARGET, sid, %err, "failed to release video sink");
            }
            return;
        }

        if let Some(index) = sinks.audio.iter().position(|(bound, _)| bound == sid) {
            let (_, sink) = sinks.audio.remove(index);
            if let Err(err) = sink.release() {
                warn!(target: TARGET, sid, %err, "failed to release audio sink");
            }
            return;
        }

        debug!(
            target: TARGET,
            participant = participant_identity,
            sid,
            "unsubscribed track was not bound"
        );
    }
}
