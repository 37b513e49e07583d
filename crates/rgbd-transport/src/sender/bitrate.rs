//! Adaptive bitrate and keyframe gating, driven by receiver `Report`
//! feedback rather than a fixed send rate. See DESIGN.md for the choice
//! of threshold formula over the alternative found in the source tree.

use std::time::{Duration, Instant};

use rgbd_protocol::constants::CAPTURE_FRAME_RATE;

use super::registry::ReceiverRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDecision {
    pub is_ready: bool,
    pub keyframe: bool,
}

/// Decides whether to capture a frame this tick and whether it must be a
/// keyframe, given the registry of video-requesting receivers and when/what
/// was last sent.
pub fn plan_capture(
    registry: &ReceiverRegistry,
    last_frame_id: i32,
    last_frame_time: Instant,
    now: Instant,
) -> CaptureDecision {
    if !registry.has_video_receivers() {
        return CaptureDecision { is_ready: false, keyframe: false };
    }

    if registry.has_unreported_video_receiver() {
        return CaptureDecision { is_ready: true, keyframe: true };
    }

    let min_reported = registry
        .min_reported_frame_id()
        .expect("has_unreported_video_receiver is false, so every video receiver has reported");

    let delta_t = now.saturating_duration_since(last_frame_time);
    let delta_id = last_frame_id - min_reported;

    let keyframe = delta_id > 5;
    let is_ready = delta_t.as_secs_f32() * CAPTURE_FRAME_RATE > 2f32.powi(delta_id - 1);

    CaptureDecision { is_ready, keyframe }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_one_reporting_receiver(last_reported: i32) -> ReceiverRegistry {
        let mut reg = ReceiverRegistry::new();
        let now = Instant::now();
        reg.connect(1, "127.0.0.1:9000".parse().unwrap(), true, false, now);
        reg.report(1, last_reported, now);
        reg
    }

    #[test]
    fn new_joiner_forces_ready_keyframe() {
        let mut reg = ReceiverRegistry::new();
        let now = Instant::now();
        reg.connect(1, "127.0.0.1:9000".parse().unwrap(), true, false, now);
        let decision = plan_capture(&reg, 10, now, now);
        assert_eq!(decision, CaptureDecision { is_ready: true, keyframe: true });
    }

    #[test]
    fn fully_caught_up_receiver_is_ready_no_keyframe() {
        let reg = registry_with_one_reporting_receiver(10);
        let last_frame_time = Instant::now();
        let now = last_frame_time + Duration::from_secs_f32(1.0 / 30.0);
        let decision = plan_capture(&reg, 10, last_frame_time, now); // delta_id = 0
        assert!(decision.is_ready);
        assert!(!decision.keyframe);
    }

    #[test]
    fn steady_state_one_frame_behind_is_ready_no_keyframe() {
        let reg = registry_with_one_reporting_receiver(9);
        let last_frame_time = Instant::now();
        let now = last_frame_time + Duration::from_secs_f32(1.0 / 30.0);
        let decision = plan_capture(&reg, 10, last_frame_time, now);
        assert!(decision.is_ready);
        assert!(!decision.keyframe);
    }

    #[test]
    fn far_behind_receiver_forces_keyframe() {
        let reg = registry_with_one_reporting_receiver(4);
        let last_frame_time = Instant::now();
        let now = last_frame_time + Duration::from_secs_f32(1.0 / 30.0);
        let decision = plan_capture(&reg, 10, last_frame_time, now); // delta_id = 6
        assert!(decision.keyframe);
    }

    #[test]
    fn moderately_behind_receiver_is_not_ready_yet() {
        let reg = registry_with_one_reporting_receiver(6);
        let last_frame_time = Instant::now();
        let now = last_frame_time + Duration::from_secs_f32(1.0 / 30.0);
        let decision = plan_capture(&reg, 10, last_frame_time, now); // delta_id = 4
        assert!(!decision.is_ready);
        assert!(!decision.keyframe);
    }

    #[test]
    fn no_video_receivers_never_ready() {
        let reg = ReceiverRegistry::new();
        let now = Instant::now();
        assert!(!plan_capture(&reg, 0, now, now).is_ready);
    }
}
