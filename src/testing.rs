//! 单元测试共用的协作方替身。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::backend::{
    BackendError, CallControlService, CredentialService, InitializeCallRequest,
    InitializeCallResponse, SessionCredentials, StopCallRequest,
};
use crate::media::{
    AudioCaptureConstraints, AudioSink, DeviceError, InboundTrack, LocalAudioTrack,
    MediaTransportClient, RenderSurface, RoomConnection, SinkError, TransportError,
    TransportEvent, VideoSink,
};

#[derive(Default)]
pub(crate) struct RecordingVideoSink {
    attached: Mutex<Vec<String>>,
    releases: AtomicUsize,
}

impl RecordingVideoSink {
    pub(crate) fn attached(&self) -> Vec<String> {
        self.attached.lock().expect("video sink lock poisoned").clone()
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl VideoSink for RecordingVideoSink {
    fn attach(&self, track: &InboundTrack) -> Result<(), SinkError> {
        self.attached
            .lock()
            .expect("video sink lock poisoned")
            .push(track.sid.clone());
        Ok(())
    }

    fn release(&self) -> Result<(), SinkError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct RecordingAudioSink {
    attached: Mutex<Vec<String>>,
    releases: AtomicUsize,
    fail_attach: bool,
    fail_release: bool,
}

impl RecordingAudioSink {
    fn new(fail_attach: bool, fail_release: bool) -> Self {
        Self {
            attached: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
            fail_attach,
            fail_release,
        }
    }

    pub(crate) fn attached(&self) -> Vec<String> {
        self.attached.lock().expect("audio sink lock poisoned").clone()
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingAudioSink {
    fn attach(&self, track: &InboundTrack) -> Result<(), SinkError> {
        if self.fail_attach {
            return Err(SinkError::render("autoplay blocked"));
        }
        self.attached
            .lock()
            .expect("audio sink lock poisoned")
            .push(track.sid.clone());
        Ok(())
    }

    fn release(&self) -> Result<(), SinkError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(SinkError::render("element already detached"));
        }
        Ok(())
    }
}

pub(crate) struct MockSurface {
    video_id: String,
    pub(crate) video: Arc<RecordingVideoSink>,
    audio: Mutex<Vec<Arc<RecordingAudioSink>>>,
    fail_audio_attach: AtomicBool,
    fail_audio_release: AtomicBool,
}

impl MockSurface {
    pub(crate) fn with_video<S: Into<String>>(video_id: S) -> Self {
        Self {
            video_id: video_id.into(),
            video: Arc::new(RecordingVideoSink::default()),
            audio: Mutex::new(Vec::new()),
            fail_audio_attach: AtomicBool::new(false),
            fail_audio_release: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_audio_attach(&self) {
        self.fail_audio_attach.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_audio_release(&self) {
        self.fail_audio_release.store(true, Ordering::SeqCst);
    }

    pub(crate) fn audio_sinks(&self) -> Vec<Arc<RecordingAudioSink>> {
        self.audio.lock().expect("surface lock poisoned").clone()
    }
}

impl RenderSurface for MockSurface {
    fn video_sink(&self, id: &str) -> Option<Arc<dyn VideoSink>> {
        if id == self.video_id {
            let sink: Arc<dyn VideoSink> = self.video.clone();
            Some(sink)
        } else {
            None
        }
    }

    fn create_audio_sink(&self) -> Arc<dyn AudioSink> {
        let sink = Arc::new(RecordingAudioSink::new(
            self.fail_audio_attach.load(Ordering::SeqCst),
            self.fail_audio_release.load(Ordering::SeqCst),
        ));
        self.audio
            .lock()
            .expect("surface lock poisoned")
            .push(Arc::clone(&sink));
        sink
    }
}

pub(crate) struct MockCredentials {
    result: Mutex<Result<SessionCredentials, BackendError>>,
    calls: AtomicUsize,
}

impl MockCredentials {
    pub(crate) fn issuing(session_id: &str, token: &str) -> Self {
        Self {
            result: Mutex::new(Ok(SessionCredentials {
                session_id: session_id.to_string(),
                token: token.to_string(),
            })),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(status: u16) -> Self {
        Self {
            result: Mutex::new(Err(BackendError::Status {
                endpoint: "http://backend.test/token".into(),
                status,
                body: "denied".into(),
            })),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialService for MockCredentials {
    async fn issue_credentials(&self) -> Result<SessionCredentials, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().expect("credentials lock poisoned").clone()
    }
}

pub(crate) struct MockCallControl {
    init_result: Mutex<Result<InitializeCallResponse, BackendError>>,
    stop_result: Mutex<Result<(), BackendError>>,
    init_requests: Mutex<Vec<serde_json::Value>>,
    stop_requests: Mutex<Vec<StopCallRequest>>,
    hang_initialize: AtomicBool,
    hang_stop: AtomicBool,
}

impl MockCallControl {
    pub(crate) fn accepting() -> Self {
        Self::responding(Ok(InitializeCallResponse::accepted()))
    }

    pub(crate) fn responding(init_result: Result<InitializeCallResponse, BackendError>) -> Self {
        Self {
            init_result: Mutex::new(init_result),
            stop_result: Mutex::new(Ok(())),
            init_requests: Mutex::new(Vec::new()),
            stop_requests: Mutex::new(Vec::new()),
            hang_initialize: AtomicBool::new(false),
            hang_stop: AtomicBool::new(false),
        }
    }

    /// 记录请求后永不返回。
    pub(crate) fn hang_initialize(&self) {
        self.hang_initialize.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hang_stop(&self) {
        self.hang_stop.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_stop(&self, error: BackendError) {
        *self.stop_result.lock().expect("call control lock poisoned") = Err(error);
    }

    pub(crate) fn init_requests(&self) -> Vec<serde_json::Value> {
        self.init_requests
            .lock()
            .expect("call control lock poisoned")
            .clone()
    }

    pub(crate) fn stop_requests(&self) -> Vec<StopCallRequest> {
        self.stop_requests
            .lock()
            .expect("call control lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CallControlService for MockCallControl {
    async fn initialize_call(
        &self,
        request: &InitializeCallRequest,
    ) -> Result<InitializeCallResponse, BackendError> {
        self.init_requests
            .lock()
            .expect("call control lock poisoned")
            .push(serde_json::to_value(request).expect("request serializes"));
        if self.hang_initialize.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.init_result
            .lock()
            .expect("call control lock poisoned")
            .clone()
    }

    async fn stop_call(&self, request: &StopCallRequest) -> Result<(), BackendError> {
        self.stop_requests
            .lock()
            .expect("call control lock poisoned")
            .push(request.clone());
        if self.hang_stop.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.stop_result
            .lock()
            .expect("call control lock poisoned")
            .clone()
    }
}

#[derive(Default)]
pub(crate) struct MockConnection {
    published: AtomicUsize,
    disconnects: AtomicUsize,
    publish_error: Mutex<Option<DeviceError>>,
    disconnect_error: Mutex<Option<TransportError>>,
}

impl MockConnection {
    pub(crate) fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomConnection for MockConnection {
    async fn publish_audio(&self, _track: &dyn LocalAudioTrack) -> Result<(), DeviceError> {
        if let Some(err) = self.publish_error.lock().expect("connection lock poisoned").clone() {
            return Err(err);
        }
        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        match self
            .disconnect_error
            .lock()
            .expect("connection lock poisoned")
            .clone()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub(crate) struct MockMicrophone {
    stops: AtomicUsize,
}

impl MockMicrophone {
    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl LocalAudioTrack for MockMicrophone {
    fn stop(&self) -> Result<(), DeviceError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct MockTransport {
    pub(crate) connection: Arc<MockConnection>,
    pub(crate) microphone: Arc<MockMicrophone>,
    connect_error: Mutex<Option<TransportError>>,
    microphone_error: Mutex<Option<DeviceError>>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    /// 握手期间立即推送的事件。
    handshake_events: Mutex<Vec<TransportEvent>>,
    connects: Mutex<Vec<(String, String)>>,
    constraints: Mutex<Option<AudioCaptureConstraints>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            connection: Arc::new(MockConnection::default()),
            microphone: Arc::new(MockMicrophone::default()),
            connect_error: Mutex::new(None),
            microphone_error: Mutex::new(None),
            events: Mutex::new(None),
            handshake_events: Mutex::new(Vec::new()),
            connects: Mutex::new(Vec::new()),
            constraints: Mutex::new(None),
        }
    }
}

impl MockTransport {
    pub(crate) fn fail_connect(&self, error: TransportError) {
        *self.connect_error.lock().expect("transport lock poisoned") = Some(error);
    }

    pub(crate) fn fail_microphone(&self, error: DeviceError) {
        *self.microphone_error.lock().expect("transport lock poisoned") = Some(error);
    }

    pub(crate) fn fail_publish(&self, error: DeviceError) {
        *self
            .connection
            .publish_error
            .lock()
            .expect("connection lock poisoned") = Some(error);
    }

    pub(crate) fn fail_disconnect(&self, error: TransportError) {
        *self
            .connection
            .disconnect_error
            .lock()
            .expect("connection lock poisoned") = Some(error);
    }

    pub(crate) fn push_during_handshake(&self, event: TransportEvent) {
        self.handshake_events
            .lock()
            .expect("transport lock poisoned")
            .push(event);
    }

    pub(crate) fn connects(&self) -> Vec<(String, String)> {
        self.connects.lock().expect("transport lock poisoned").clone()
    }

    pub(crate) fn constraints(&self) -> Option<AudioCaptureConstraints> {
        *self.constraints.lock().expect("transport lock poisoned")
    }

    /// 模拟传输层推送一条事件，返回通道是否仍然有订阅者。
    pub(crate) async fn emit(&self, event: TransportEvent) -> bool {
        let sender = self.events.lock().expect("transport lock poisoned").clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MediaTransportClient for MockTransport {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn RoomConnection>, TransportError> {
        self.connects
            .lock()
            .expect("transport lock poisoned")
            .push((url.to_string(), token.to_string()));

        let early: Vec<TransportEvent> = self
            .handshake_events
            .lock()
            .expect("transport lock poisoned")
            .drain(..)
            .collect();
        for event in early {
            let _ = events.send(event).await;
        }
        *self.events.lock().expect("transport lock poisoned") = Some(events);

        if let Some(err) = self.connect_error.lock().expect("transport lock poisoned").clone() {
            return Err(err);
        }

        let connection: Arc<dyn RoomConnection> = self.connection.clone();
        Ok(connection)
    }

    async fn create_microphone_track(
        &self,
        constraints: &AudioCaptureConstraints,
    ) -> Result<Arc<dyn LocalAudioTrack>, DeviceError> {
        *self.constraints.lock().expect("transport lock poisoned") = Some(*constraints);

        if let Some(err) = self
            .microphone_error
            .lock()
            .expect("transport lock poisoned")
            .clone()
        {
            return Err(err);
        }

        let track: Arc<dyn LocalAudioTrack> = self.microphone.clone();
        Ok(track)
    }
}
