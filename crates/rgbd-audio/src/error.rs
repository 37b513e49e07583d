use thiserror::Error;

/// Errors raised by the audio ring buffer, codec and jitter buffer.
///
/// Mirrors `rgbd_transport::TransportError`'s `Overflow`/`Underflow` variants
/// so the sender/receiver binaries can log both with the same shape; this
/// crate keeps its own enum rather than depending on
/// `rgbd-transport` back, since audio has no notion of a UDP endpoint.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("opus encode failed: {0}")]
    Encode(#[source] audiopus::Error),

    #[error("opus decode failed: {0}")]
    Decode(#[source] audiopus::Error),

    #[error("audio ring buffer overflow, dropped {dropped} samples")]
    Overflow { dropped: usize },

    #[error("audio ring buffer underflow, emitted {silence} samples of silence")]
    Underflow { silence: usize },

    #[error("device error: {0}")]
    Device(String),
}
