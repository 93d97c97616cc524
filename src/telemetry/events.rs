use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) const TARGET: &str = "telemetry::session";
pub(crate) const EVENT_STARTED: &str = "session_started";
pub(crate) const EVENT_START_FAILED: &str = "session_start_failed";
pub(crate) const EVENT_STOPPED: &str = "session_stopped";
pub(crate) const EVENT_CLEANUP_FAULT: &str = "session_cleanup_fault";
pub(crate) const EVENT_CANCELLED: &str = "session_cancelled";

#[derive(Debug, Serialize)]
pub struct SessionStartedEvent<'a> {
    pub session_id: &'a str,
    pub persona: &'a str,
    pub setup_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionStartFailedEvent<'a> {
    pub session_id: Option<&'a str>,
    pub step: &'static str,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStoppedEvent<'a> {
    pub session_id: Option<&'a str>,
    pub remote_notified: bool,
}

#[derive(Debug, Serialize)]
pub struct CleanupFaultEvent<'a> {
    pub session_id: Option<&'a str>,
    pub resource: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCancelledEvent<'a> {
    pub session_id: Option<&'a str>,
    pub phase: &'static str,
}

pub fn record_session_started(session_id: &str, persona: &str, setup: Duration) {
    let event = SessionStartedEvent {
        session_id,
        persona,
        setup_ms: duration_to_ms(setup),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_STARTED,
            session_id = event.session_id,
            persona = event.persona,
            setup_ms = event.setup_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_STARTED,
            %err,
            "failed to encode session started event"
        ),
    }
}

pub fn record_session_start_failed(
    session_id: Option<&str>,
    step: &'static str,
    kind: &'static str,
    error: impl Into<String>,
) {
    let event = SessionStartFailedEvent {
        session_id,
        step,
        kind,
        error: error.into(),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_START_FAILED,
            session_id = ?event.session_id,
            step = event.step,
            kind = event.kind,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_START_FAILED,
            %err,
            "failed to encode session start failure event"
        ),
    }
}

pub fn record_session_stopped(session_id: Option<&str>, remote_notified: bool) {
    let event = SessionStoppedEvent {
        session_id,
        remote_notified,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_STOPPED,
            session_id = ?event.session_id,
            remote_notified = event.remote_notified,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_STOPPED,
            %err,
            "failed to encode session stopped event"
        ),
    }
}

pub fn record_cleanup_fault(
    session_id: Option<&str>,
    resource: &'static str,
    error: impl Into<String>,
) {
    let event = CleanupFaultEvent {
        session_id,
        resource,
        error: error.into(),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_CLEANUP_FAULT,
            session_id = ?event.session_id,
            resource = event.resource,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_CLEANUP_FAULT,
            %err,
            "failed to encode cleanup fault event"
        ),
    }
}

/// 调用方在 `start()`/`stop()` 完成前丢弃了 future。
pub fn record_session_cancelled(session_id: Option<&str>, phase: &'static str) {
    let event = SessionCancelledEvent { session_id, phase };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_CANCELLED,
            session_id = ?event.session_id,
            phase = event.phase,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_CANCELLED,
            %err,
            "failed to encode session cancelled event"
        ),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
