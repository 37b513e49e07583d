//! Audio capture, Opus codec, jitter buffering and playback for the stereo
//! audio leg of the streaming protocol.
//!
//! Built on a real `audiopus` + `cpal` + `ringbuf` integration rather than
//! re-deriving one: color/depth video codecs stay trait-only
//! (`rgbd_transport::collaborators::VideoCodec`) since no production codec
//! implementation is in scope here, but this audio path carries a full
//! working Opus + ring-buffer + device pipeline.

pub mod capture;
pub mod codec;
pub mod device;
pub mod error;
pub mod jitter;
pub mod playback;
pub mod ring;

pub use capture::{start_capture, AudioSenderPipeline, CaptureStream};
pub use codec::{AudioDecoder, AudioEncoder};
pub use error::AudioError;
pub use jitter::AudioJitterBuffer;
pub use playback::{start_playback, AudioReceiverPipeline, PlaybackStream};
