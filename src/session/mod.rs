//! 会话生命周期状态机。
//!
//! `SessionController` 按固定顺序完成凭证申请、房间连接、麦克风发布与对话初始化，
//! 任一步失败都会先回调、再完整清理、最后把错误返回给调用方。

pub mod config;
pub mod error;
pub mod lifecycle;

mod router;
mod state;

pub use config::{
    resolve_endpoints, Endpoints, EnvironmentDescriptor, SdkConfig, SdkOptions, SessionHooks,
};
pub use error::{ConfigError, SdkError};
pub use lifecycle::{
    ConnectionState, SessionLifecyclePayload, SessionLifecyclePhase, SessionLifecycleUpdate,
};
pub use state::SessionSnapshot;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{
    CallControlService, CallInitError, CredentialService, HttpBackend, InitializeCallRequest,
    StopCallRequest,
};
use crate::media::{
    LocalAudioTrack, MediaTransportClient, RenderSurface, RoomConnection, SPEECH_CAPTURE,
};
use crate::persona;
use crate::telemetry::events::{
    record_cleanup_fault, record_session_cancelled, record_session_start_failed,
    record_session_started, record_session_stopped,
};

use self::router::TrackRouter;
use self::state::{lock, SessionState, SinkRegistry};

const TARGET: &str = "session_controller";
const LIFECYCLE_CAPACITY: usize = 32;

/// 控制器依赖的外部协作方。
#[derive(Clone)]
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialService>,
    pub call_control: Arc<dyn CallControlService>,
    pub transport: Arc<dyn MediaTransportClient>,
    pub surface: Arc<dyn RenderSurface>,
}

impl Collaborators {
    /// 凭证与通话控制共用同一个 HTTP 后端。
    pub fn with_http_backend(
        backend: HttpBackend,
        transport: Arc<dyn MediaTransportClient>,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        let backend = Arc::new(backend);
        Self {
            credentials: backend.clone(),
            call_control: backend,
            transport,
            surface,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartStep {
    Credentials,
    Transport,
    Microphone,
    CallInit,
}

impl StartStep {
    fn as_str(&self) -> &'static str {
        match self {
            StartStep::Credentials => "credentials",
            StartStep::Transport => "transport",
            StartStep::Microphone => "microphone",
            StartStep::CallInit => "call_init",
        }
    }
}

struct StartFailure {
    step: StartStep,
    error: SdkError,
}

impl StartFailure {
    fn new(step: StartStep, error: impl Into<SdkError>) -> Self {
        Self {
            step,
            error: error.into(),
        }
    }
}

pub struct SessionController {
    config: SdkConfig,
    collaborators: Collaborators,
    state: Arc<Mutex<SessionState>>,
    sinks: Arc<Mutex<SinkRegistry>>,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// 渲染目标在构造时解析，找不到直接失败。
    pub fn new(config: SdkConfig, collaborators: Collaborators) -> Result<Self, SdkError> {
        let video = collaborators
            .surface
            .video_sink(&config.video_element_id)
            .ok_or_else(|| ConfigError::RenderTargetNotFound {
                id: config.video_element_id.clone(),
            })?;
        let (lifecycle_tx, _) = broadcast::channel(LIFECYCLE_CAPACITY);

        Ok(Self {
            config,
            collaborators,
            state: Arc::new(Mutex::new(SessionState::default())),
            sinks: Arc::new(Mutex::new(SinkRegistry::new(video))),
            lifecycle_tx,
        })
    }

    /// 使用配置里的后端地址与 API key 构造 HTTP 协作方。
    pub fn with_http_backend(
        config: SdkConfig,
        transport: Arc<dyn MediaTransportClient>,
        surface: Arc<dyn RenderSurface>,
    ) -> Result<Self, SdkError> {
        let backend = HttpBackend::new(config.backend_url.clone(), config.api_key.clone());
        let collaborators = Collaborators::with_http_backend(backend, transport, surface);
        Self::new(config, collaborators)
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<SessionLifecycleUpdate> {
        self.lifecycle_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock_state().phase
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock_state().session_id.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_state().snapshot()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    fn emit_lifecycle(&self, update: SessionLifecycleUpdate) {
        if let Err(err) = self.lifecycle_tx.send(update) {
            debug!(target: TARGET, %err, "no lifecycle subscribers");
        }
    }

    /// 建立会话。已处于 Active 时直接返回，不会重复执行。
    pub async fn start(&self) -> Result<(), SdkError> {
        {
            let mut state = self.lock_state();
            match state.phase {
                ConnectionState::Idle => state.phase = ConnectionState::Connecting,
                ConnectionState::Active => {
                    info!(
                        target: TARGET,
                        session_id = ?state.session_id,
                        "already connected"
                    );
                    return Ok(());
                }
                busy => return Err(SdkError::Busy { state: busy }),
            }
        }

        let in_flight = InFlight::new(self);
        self.emit_lifecycle(SessionLifecycleUpdate::new(
            None,
            SessionLifecyclePhase::Connecting,
        ));
        let started_at = Instant::now();

        match self.run_start_sequence().await {
            Ok(session_id) => {
                self.lock_state().phase = ConnectionState::Active;
                in_flight.complete();
                info!(target: TARGET, %session_id, persona = %self.config.persona, "session active");
                record_session_started(&session_id, &self.config.persona, started_at.elapsed());
                self.emit_lifecycle(SessionLifecycleUpdate::new(
                    Some(session_id),
                    SessionLifecyclePhase::Active,
                ));
                (self.config.hooks.on_connected)();
                Ok(())
            }
            Err(StartFailure { step, error }) => {
                let session_id = self.session_id();
                warn!(
                    target: TARGET,
                    step = step.as_str(),
                    session_id = ?session_id,
                    %error,
                    "session start failed"
                );
                record_session_start_failed(
                    session_id.as_deref(),
                    step.as_str(),
                    error.kind(),
                    error.to_string(),
                );
                self.emit_lifecycle(SessionLifecycleUpdate::failed(
                    session_id,
                    step.as_str(),
                    error.kind(),
                    error.to_string(),
                ));

                (self.config.hooks.on_error)(&error);
                self.cleanup().await;
                in_flight.complete();
                Err(error)
            }
        }
    }

    async fn run_start_sequence(&self) -> Result<String, StartFailure> {
        let credentials = self
            .collaborators
            .credentials
            .issue_credentials()
            .await
            .map_err(|err| StartFailure::new(StartStep::Credentials, SdkError::Credential(err)))?;
        let session_id = credentials.session_id.clone();
        {
            let mut state = self.lock_state();
            state.session_id = Some(credentials.session_id);
            state.access_token = Some(credentials.token.clone());
        }
        debug!(target: TARGET, %session_id, "credentials issued");

        // 订阅先于连接，握手期间送达的轨道也会被路由。
        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer);
        let router = TrackRouter::new(
            session_id.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.sinks),
            Arc::clone(&self.collaborators.surface),
            self.lifecycle_tx.clone(),
        )
        .spawn(event_rx);
        self.lock_state().router = Some(router);

        let connection = self
            .collaborators
            .transport
            .connect(&self.config.server_url, &credentials.token, event_tx)
            .await
            .map_err(|err| StartFailure::new(StartStep::Transport, err))?;
        self.lock_state().transport = Some(Arc::clone(&connection));
        debug!(target: TARGET, server_url = %self.config.server_url, "transport connected");

        let microphone = self
            .collaborators
            .transport
            .create_microphone_track(&SPEECH_CAPTURE)
            .await
            .map_err(|err| StartFailure::new(StartStep::Microphone, err))?;
        self.lock_state().local_audio = Some(Arc::clone(&microphone));
        connection
            .publish_audio(microphone.as_ref())
            .await
            .map_err(|err| StartFailure::new(StartStep::Microphone, err))?;
        debug!(target: TARGET, "microphone published");

        let profile = persona::lookup(&self.config.persona)
            .map_err(|err| StartFailure::new(StartStep::CallInit, ConfigError::from(err)))?;
        let response = self
            .collaborators
            .call_control
            .initialize_call(&InitializeCallRequest::new(*profile, session_id.clone()))
            .await
            .map_err(|err| StartFailure::new(StartStep::CallInit, CallInitError::Backend(err)))?;
        response
            .into_result()
            .map_err(|err| StartFailure::new(StartStep::CallInit, err))?;

        Ok(session_id)
    }

    /// 结束会话。远端通知尽力而为，本地资源总会被释放。
    pub async fn stop(&self) -> Result<(), SdkError> {
        let session_id = {
            let mut state = self.lock_state();
            match state.phase {
                ConnectionState::Idle => return Ok(()),
                ConnectionState::Active => {
                    state.phase = ConnectionState::Stopping;
                    state.session_id.clone()
                }
                busy => return Err(SdkError::Busy { state: busy }),
            }
        };

        let in_flight = InFlight::new(self);
        self.emit_lifecycle(SessionLifecycleUpdate::new(
            session_id.clone(),
            SessionLifecyclePhase::Stopping,
        ));

        let mut remote_notified = false;
        if let Some(id) = session_id.as_deref() {
            match self
                .collaborators
                .call_control
                .stop_call(&StopCallRequest::new(id))
                .await
            {
                Ok(()) => remote_notified = true,
                Err(err) => {
                    warn!(
                        target: TARGET,
                        session_id = id,
                        status = ?err.status(),
                        %err,
                        "failed to notify call stop"
                    );
                }
            }
        }

        self.cleanup().await;
        in_flight.complete();
        record_session_stopped(session_id.as_deref(), remote_notified);
        Ok(())
    }

    /// 逐项释放资源，单项失败不影响其余，可重复调用。
    async fn cleanup(&self) {
        self.teardown().run().await;
    }

    /// 取走控制器持有的句柄，交给 `Teardown` 释放。
    fn teardown(&self) -> Teardown {
        let mut state = self.lock_state();
        Teardown {
            state: Arc::clone(&self.state),
            sinks: Arc::clone(&self.sinks),
            lifecycle_tx: self.lifecycle_tx.clone(),
            router: state.router.take(),
            local_audio: state.local_audio.take(),
            transport: state.transport.take(),
            session_id: state.session_id.clone(),
        }
    }

    /// `start()`/`stop()` 的 future 在完成前被丢弃：转入 Stopping，剩余资源在后台释放。
    fn abandon(&self) {
        let (phase, session_id) = {
            let state = self.lock_state();
            (state.phase, state.session_id.clone())
        };
        warn!(
            target: TARGET,
            phase = phase.as_str(),
            session_id = ?session_id,
            "session operation cancelled before completion"
        );
        record_session_cancelled(session_id.as_deref(), phase.as_str());

        let teardown = self.teardown();
        self.lock_state().phase = ConnectionState::Stopping;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(teardown.run());
            }
            Err(_) => teardown.run_detached(),
        }
    }
}

/// 进行中的 `start()`/`stop()`。未调用 `complete` 就被丢弃时触发后台清理。
struct InFlight<'a> {
    controller: &'a SessionController,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(controller: &'a SessionController) -> Self {
        Self {
            controller,
            armed: true,
        }
    }

    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.abandon();
        }
    }
}

/// 从控制器取出的待释放资源，可以脱离控制器在后台任务里执行。
struct Teardown {
    state: Arc<Mutex<SessionState>>,
    sinks: Arc<Mutex<SinkRegistry>>,
    lifecycle_tx: broadcast::Sender<SessionLifecycleUpdate>,
    router: Option<JoinHandle<()>>,
    local_audio: Option<Arc<dyn LocalAudioTrack>>,
    transport: Option<Arc<dyn RoomConnection>>,
    session_id: Option<String>,
}

impl Teardown {
    async fn run(mut self) {
        // 路由任务先退出，之后不会再有新的 sink 被绑定。
        if let Some(router) = self.router.take() {
            router.abort();
            let _ = router.await;
        }

        self.stop_microphone();

        if let Some(connection) = self.transport.take() {
            if let Err(err) = connection.disconnect().await {
                warn!(target: TARGET, %err, "failed to disconnect transport");
                record_cleanup_fault(self.session_id.as_deref(), "transport", err.to_string());
            }
        }

        self.finish();
    }

    /// 没有可用运行时时的同步释放，连接只能直接丢弃。
    fn run_detached(mut self) {
        if let Some(router) = self.router.take() {
            router.abort();
        }

        self.stop_microphone();

        if self.transport.take().is_some() {
            warn!(target: TARGET, "no async runtime; dropping transport without disconnect");
            record_cleanup_fault(
                self.session_id.as_deref(),
                "transport",
                "no async runtime available to disconnect",
            );
        }

        self.finish();
    }

    fn stop_microphone(&mut self) {
        if let Some(track) = self.local_audio.take() {
            if let Err(err) = track.stop() {
                warn!(target: TARGET, %err, "failed to stop microphone track");
                record_cleanup_fault(self.session_id.as_deref(), "microphone", err.to_string());
            }
        }
    }

    fn finish(self) {
        let session_id = self.session_id.as_deref();

        let drained = lock(&self.sinks).drain();
        if let Some(video) = drained.video {
            if let Err(err) = video.release() {
                warn!(target: TARGET, %err, "failed to release video sink");
                record_cleanup_fault(session_id, "video_sink", err.to_string());
            }
        }
        for sink in drained.audio {
            if let Err(err) = sink.release() {
                warn!(target: TARGET, %err, "failed to release audio sink");
                record_cleanup_fault(session_id, "audio_sink", err.to_string());
            }
        }

        let (released, previous) = {
            let mut state = lock(&self.state);
            let previous = state.phase;
            let released = state.session_id.take();
            state.access_token = None;
            state.phase = ConnectionState::Idle;
            (released, previous)
        };

        if previous != ConnectionState::Idle {
            let update = SessionLifecycleUpdate::new(released, SessionLifecyclePhase::Idle);
            if let Err(err) = self.lifecycle_tx.send(update) {
                debug!(target: TARGET, %err, "no lifecycle subscribers");
            }
        }
    }
}
