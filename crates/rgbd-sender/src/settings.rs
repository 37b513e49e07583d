//! Runtime-tunable sender settings, loaded from an optional JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderSettings {
    /// Target Opus bitrate for the audio leg, in bits per second.
    #[serde(default = "default_audio_bitrate_bps")]
    pub audio_bitrate_bps: i32,

    /// Whether to capture and send audio at all.
    #[serde(default = "default_audio_enabled")]
    pub audio_enabled: bool,
}

fn default_audio_bitrate_bps() -> i32 {
    rgbd_audio::codec::DEFAULT_BITRATE_BPS
}

fn default_audio_enabled() -> bool {
    true
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            audio_bitrate_bps: default_audio_bitrate_bps(),
            audio_enabled: default_audio_enabled(),
        }
    }
}

impl SenderSettings {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_enable_audio_at_default_bitrate() {
        let settings = SenderSettings::default();
        assert!(settings.audio_enabled);
        assert_eq!(settings.audio_bitrate_bps, rgbd_audio::codec::DEFAULT_BITRATE_BPS);
    }

    #[test]
    fn json_deserialization_overrides_bitrate() {
        let json = r#"{"audio_bitrate_bps": 32000, "audio_enabled": false}"#;
        let settings: SenderSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.audio_bitrate_bps, 32000);
        assert!(!settings.audio_enabled);
    }
}
