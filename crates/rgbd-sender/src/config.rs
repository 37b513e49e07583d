//! Fixed deployment shape for a sender process, loaded from an optional TOML
//! file.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SenderConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// How often the capture tick fires, in Hz. Whether a frame is actually
    /// sent on a given tick is still gated by `plan_capture`.
    #[serde(default = "default_capture_rate_hz")]
    pub capture_rate_hz: f32,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    rgbd_protocol::constants::DEFAULT_SENDER_PORT
}

fn default_capture_rate_hz() -> f32 {
    rgbd_protocol::constants::CAPTURE_FRAME_RATE
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            capture_rate_hz: default_capture_rate_hz(),
        }
    }
}
