//! Traits for the systems this crate treats as out of scope: capture,
//! video codec, presentation. Real production code would plug a depth
//! camera, a VP8/TRVL codec and a renderer in behind these; this workspace
//! ships only what the transport core needs to exercise them end to end.

use rgbd_protocol::video::{CameraIntrinsics, FloorPlane};

/// One captured, not-yet-encoded RGB-D frame plus its calibration data.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: i32,
    pub height: i32,
    pub intrinsics: CameraIntrinsics,
    pub color: Vec<u8>,
    pub depth: Vec<u8>,
    pub floor: Option<FloorPlane>,
}

/// The depth+color camera collaborator. `capture` returns `None` on a
/// capture-deadline miss (`TransportError::CaptureTimeout`), which the
/// caller must treat as "skip this tick" rather than an error.
pub trait Capture {
    fn capture(&mut self) -> Option<CapturedFrame>;
}

/// Compresses/decompresses the color and depth planes of a frame. Real
/// deployments use VP8 for color and TRVL for depth; this trait exists so
/// the sender/receiver loops don't need to know which codec is behind it.
pub trait VideoCodec {
    fn encode(&mut self, color: &[u8], depth: &[u8], keyframe: bool) -> (Vec<u8>, Vec<u8>);
    fn decode(&mut self, color: &[u8], depth: &[u8]) -> (Vec<u8>, Vec<u8>);
}

/// Displays a decoded, reassembled frame. A no-op on any headless deployment.
pub trait Presentation {
    fn present(&mut self, frame_id: i32, color: &[u8], depth: &[u8]);
}
