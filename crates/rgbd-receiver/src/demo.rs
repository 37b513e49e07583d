//! Stand-ins for the renderer and video codec collaborators. Real
//! deployments decode VP8 color and TRVL depth planes and hand them to a
//! renderer; here we only need to exercise the transport end to end.

use rgbd_transport::collaborators::{Presentation, VideoCodec};
use tracing::info;

/// Identity codec: color/depth bytes pass through unchanged in both
/// directions, matching the sender's `PassthroughCodec`.
pub struct PassthroughCodec;

impl VideoCodec for PassthroughCodec {
    fn encode(&mut self, color: &[u8], depth: &[u8], _keyframe: bool) -> (Vec<u8>, Vec<u8>) {
        (color.to_vec(), depth.to_vec())
    }

    fn decode(&mut self, color: &[u8], depth: &[u8]) -> (Vec<u8>, Vec<u8>) {
        (color.to_vec(), depth.to_vec())
    }
}

/// Logs each presented frame instead of drawing it.
#[derive(Default)]
pub struct DemoPresentation {
    frames_presented: u64,
}

impl DemoPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl Presentation for DemoPresentation {
    fn present(&mut self, frame_id: i32, color: &[u8], depth: &[u8]) {
        self.frames_presented += 1;
        info!(frame_id, color_len = color.len(), depth_len = depth.len(), "presented frame");
    }
}
