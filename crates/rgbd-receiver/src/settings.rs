//! Runtime-tunable receiver settings, loaded from an optional JSON file.
//! The audio amplifier is configuration, not a protocol invariant, so it
//! lives here alongside the jitter buffer's target delay.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverSettings {
    /// Number of 20ms audio frames the jitter buffer accumulates before
    /// playback starts.
    #[serde(default = "default_jitter_target_delay")]
    pub jitter_target_delay_frames: usize,

    /// Linear gain applied to decoded audio before playback.
    #[serde(default = "default_amplifier_gain")]
    pub audio_amplifier_gain: f32,

    /// How often the request planner re-evaluates missing packets, in ms.
    #[serde(default = "default_request_planner_interval_ms")]
    pub request_planner_interval_ms: u64,

    pub audio_enabled: Option<bool>,
}

fn default_jitter_target_delay() -> usize {
    3
}

fn default_amplifier_gain() -> f32 {
    1.0
}

fn default_request_planner_interval_ms() -> u64 {
    rgbd_protocol::constants::REQUEST_PLANNER_INTERVAL_MS
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            jitter_target_delay_frames: default_jitter_target_delay(),
            audio_amplifier_gain: default_amplifier_gain(),
            request_planner_interval_ms: default_request_planner_interval_ms(),
            audio_enabled: None,
        }
    }
}

impl ReceiverSettings {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
