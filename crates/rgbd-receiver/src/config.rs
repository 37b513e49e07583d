//! Fixed deployment shape for a receiver process, loaded from an optional
//! TOML file.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReceiverConfig {
    /// Sender host to connect to.
    #[serde(default = "default_sender_host")]
    pub sender_host: String,

    #[serde(default = "default_sender_port")]
    pub sender_port: u16,

    #[serde(default = "default_video_requested")]
    pub video_requested: bool,

    #[serde(default = "default_audio_requested")]
    pub audio_requested: bool,
}

fn default_sender_host() -> String {
    "127.0.0.1".into()
}

fn default_sender_port() -> u16 {
    rgbd_protocol::constants::DEFAULT_SENDER_PORT
}

fn default_video_requested() -> bool {
    true
}

fn default_audio_requested() -> bool {
    true
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            sender_host: default_sender_host(),
            sender_port: default_sender_port(),
            video_requested: default_video_requested(),
            audio_requested: default_audio_requested(),
        }
    }
}
