//! Avatar Session SDK
//!
//! 负责与远端数字人服务建立实时音视频会话：申请凭证、加入媒体房间、发布麦克风、
//! 把数字人的音视频路由到渲染目标，并在结束或失败时完整释放资源。

pub mod backend;
pub mod media;
pub mod persona;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use persona::{AvatarProfile, UnknownPersona};
pub use session::{
    Collaborators, ConfigError, ConnectionState, EnvironmentDescriptor, SdkConfig, SdkError,
    SdkOptions, SessionController, SessionHooks, SessionLifecycleUpdate, SessionSnapshot,
};
