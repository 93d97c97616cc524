//! 数字人形象配置表。

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PERSONA: &str = "sarah";

/// 静态的数字人形象描述，随会话初始化请求一起下发。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvatarProfile {
    #[serde(rename = "name")]
    pub display_name: &'static str,
    #[serde(rename = "voice")]
    pub voice_id: &'static str,
    #[serde(rename = "avatar_name")]
    pub persona_id: &'static str,
    pub system_prompt: &'static str,
}

const PERSONAS: &[(&str, AvatarProfile)] = &[
    (
        "sarah",
        AvatarProfile {
            display_name: "Dr. Sarah",
            voice_id: "Sarah",
            persona_id: "caucasian_woman_doctor_2",
            system_prompt: "You are Dr. Sarah, a calm and attentive physician. Listen carefully, \
                ask one clarifying question at a time and keep answers short enough to be spoken aloud.",
        },
    ),
    (
        "michael",
        AvatarProfile {
            display_name: "Dr. Michael",
            voice_id: "Michael",
            persona_id: "caucasian_man_doctor_1",
            system_prompt: "You are Dr. Michael, a friendly general practitioner. Explain things \
                plainly, avoid jargon and keep every reply to a few spoken sentences.",
        },
    ),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown persona `{key}`; valid personas: {}", .valid.join(", "))]
pub struct UnknownPersona {
    pub key: String,
    pub valid: Vec<String>,
}

/// 所有可用的形象键，按表内顺序返回。
pub fn persona_keys() -> Vec<&'static str> {
    PERSONAS.iter().map(|(key, _)| *key).collect()
}

pub fn lookup(key: &str) -> Result<&'static AvatarProfile, UnknownPersona> {
    PERSONAS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, profile)| profile)
        .ok_or_else(|| UnknownPersona {
            key: key.to_string(),
            valid: persona_keys().into_iter().map(str::to_string).collect(),
        })
}
