//! Deterministic stand-ins for the real capture device and video codec,
//! which are out of scope here: a synthetic gradient frame generator and a
//! passthrough "codec" that tags bytes rather than compressing them. These
//! exist purely so `rgbd-sender` builds and streams end to end over a real
//! socket.

use rgbd_protocol::video::CameraIntrinsics;
use rgbd_transport::collaborators::{Capture, CapturedFrame, VideoCodec};

const DEMO_WIDTH: i32 = 32;
const DEMO_HEIGHT: i32 = 32;

fn identity_intrinsics() -> CameraIntrinsics {
    CameraIntrinsics {
        cx: DEMO_WIDTH as f32 / 2.0,
        cy: DEMO_HEIGHT as f32 / 2.0,
        fx: 500.0,
        fy: 500.0,
        k1: 0.0, k2: 0.0, k3: 0.0, k4: 0.0, k5: 0.0, k6: 0.0,
        codx: 0.0, cody: 0.0, p1: 0.0, p2: 0.0,
        max_radius: 1.0,
    }
}

/// Emits a deterministic synthetic RGB-D frame every call: a gradient over
/// color bytes and depth bytes keyed by a monotonically increasing tick, so
/// the bytes differ frame to frame without needing a real camera.
pub struct DemoCapture {
    tick: u8,
}

impl DemoCapture {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl Default for DemoCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Capture for DemoCapture {
    fn capture(&mut self) -> Option<CapturedFrame> {
        let pixel_count = (DEMO_WIDTH * DEMO_HEIGHT) as usize;
        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1);
        let color: Vec<u8> = (0..pixel_count * 3).map(|i| (i as u8).wrapping_add(tick)).collect();
        let depth: Vec<u8> = (0..pixel_count * 2).map(|i| (i as u8).wrapping_add(tick.wrapping_mul(3))).collect();
        Some(CapturedFrame {
            width: DEMO_WIDTH,
            height: DEMO_HEIGHT,
            intrinsics: identity_intrinsics(),
            color,
            depth,
            floor: None,
        })
    }
}

/// Tags color/depth bytes with a one-byte marker instead of running a real
/// VP8/TRVL codec; `decode` strips the marker back off. Exists only so the
/// `VideoCodec` seam in the transport core has something concrete behind
/// it end to end.
pub struct PassthroughCodec;

impl VideoCodec for PassthroughCodec {
    fn encode(&mut self, color: &[u8], depth: &[u8], _keyframe: bool) -> (Vec<u8>, Vec<u8>) {
        (color.to_vec(), depth.to_vec())
    }

    fn decode(&mut self, color: &[u8], depth: &[u8]) -> (Vec<u8>, Vec<u8>) {
        (color.to_vec(), depth.to_vec())
    }
}
