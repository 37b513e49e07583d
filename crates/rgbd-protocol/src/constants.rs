//! Wire and session size/timing constants shared across the workspace.

/// Maximum size of any single UDP datagram on the wire.
pub const PACKET_SIZE: usize = 508;

/// Common prefix shared by every packet: `owner_id: i32 LE` + `kind: u8`.
pub const COMMON_HEADER_SIZE: usize = 5;

/// Header size of a `Video` packet, including the common prefix.
pub const VIDEO_PACKET_HEADER_SIZE: usize = 20;

/// Header size of an `Audio` packet, including the common prefix.
pub const AUDIO_PACKET_HEADER_SIZE: usize = 16;

/// Maximum payload bytes a single `Video`/`Parity` packet can carry.
pub const MAX_VIDEO_PACKET_CONTENT_SIZE: usize = PACKET_SIZE - VIDEO_PACKET_HEADER_SIZE;

/// Maximum opus payload bytes a single `Audio` packet can carry.
pub const MAX_AUDIO_PACKET_CONTENT_SIZE: usize = PACKET_SIZE - AUDIO_PACKET_HEADER_SIZE;

/// Number of consecutive video packets covered by one parity packet.
pub const PARITY_GROUP_SIZE: usize = 2;

/// Audio sample rate, in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Stereo audio.
pub const CHANNELS: usize = 2;

/// Samples per audio frame, per channel (20ms at 48kHz).
pub const SAMPLES_PER_FRAME: usize = 960;

/// Target end-to-end audio ring buffer latency, in seconds.
pub const LATENCY_SEC: f32 = 0.2;

/// Capture/output frame rate driving the adaptive bitrate controller.
pub const CAPTURE_FRAME_RATE: f32 = 30.0;

/// Default well-known sender UDP port.
pub const DEFAULT_SENDER_PORT: u16 = 3773;

/// Default heartbeat cadence, in both directions.
pub const HEARTBEAT_INTERVAL_SEC: f32 = 1.0;

/// Sender-side timeout before a silent receiver is evicted.
pub const SENDER_HEARTBEAT_TIMEOUT_SEC: f32 = 10.0;

/// Receiver-side timeout before giving up on a silent sender.
pub const RECEIVER_HEARTBEAT_TIMEOUT_SEC: f32 = 5.0;

/// Default cadence for the receiver's request planner.
pub const REQUEST_PLANNER_INTERVAL_MS: u64 = 100;
