//! 观测性初始化。

pub mod events;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub default_filter: String,
    pub json: bool,
    /// 设置后额外按天滚动写入该目录。
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
            log_dir: None,
            file_prefix: "avatar-session.log".to_string(),
        }
    }
}

pub fn init_tracing() {
    if let Err(err) = try_init_tracing(&TelemetryConfig::default()) {
        eprintln!("tracing already initialised: {err}");
    }
}

/// 安装全局 subscriber。写文件时返回的 guard 需要持有到进程退出。
pub fn try_init_tracing(config: &TelemetryConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let stdout_layer = if config.json {
        fmt::layer().with_target(true).json().boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .json()
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow!("failed to set global subscriber: {err}"))?;
    Ok(guard)
}
