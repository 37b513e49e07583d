//! Chooses which assembled frame to decode and present next.
//!
//! A freshly assembled keyframe always wins over finishing a contiguous run
//! of older non-keyframes, since catching up to "now" matters more than
//! never skipping a frame. Once a starting frame is chosen, every
//! contiguously assembled successor is decoded and presented in the same
//! tick, so the receiver never falls further behind than one tick's worth
//! of network jitter.

use std::collections::BTreeMap;

use rgbd_protocol::video::VideoSenderMessage;

use crate::collaborators::{Presentation, VideoCodec};

use super::storage::ReceiverStorage;

/// Picks the first frame id a render pass should start at, given the set of
/// frames currently assembled (`frame_id -> keyframe?`) and the last frame
/// id already presented.
///
/// A keyframe strictly newer than `last_rendered` always takes priority,
/// skipping any older, non-keyframe frames still sitting in storage. With no
/// such keyframe, rendering resumes at `last_rendered + 1` if (and only if)
/// that exact frame has been assembled.
fn choose_render_start(last_rendered: Option<i32>, frames: &BTreeMap<i32, bool>) -> Option<i32> {
    let floor = last_rendered.unwrap_or(-1);
    let latest_keyframe = frames
        .range((floor + 1)..)
        .filter(|&(_, &is_keyframe)| is_keyframe)
        .next_back()
        .map(|(&id, _)| id);
    if latest_keyframe.is_some() {
        return latest_keyframe;
    }
    let next = floor + 1;
    frames.contains_key(&next).then_some(next)
}

/// Tracks render progress and drives one decode+present pass per tick.
#[derive(Debug, Default)]
pub struct RenderDispatcher {
    last_rendered_frame_id: Option<i32>,
}

impl RenderDispatcher {
    pub fn new() -> Self {
        Self { last_rendered_frame_id: None }
    }

    pub fn last_rendered_frame_id(&self) -> Option<i32> {
        self.last_rendered_frame_id
    }

    /// Polls `storage` for newly-correctable frames, decodes and presents
    /// every contiguous run starting at the chosen target, then evicts
    /// everything at or before the new render point. Returns the number of
    /// frames presented this tick.
    pub fn tick(
        &mut self,
        storage: &mut ReceiverStorage,
        codec: &mut dyn VideoCodec,
        presentation: &mut dyn Presentation,
    ) -> usize {
        let assembled = storage.poll_assemble();
        let mut by_id: BTreeMap<i32, VideoSenderMessage> = BTreeMap::new();
        let mut keyframes: BTreeMap<i32, bool> = BTreeMap::new();
        for (frame_id, message) in assembled {
            keyframes.insert(frame_id, message.keyframe);
            by_id.insert(frame_id, message);
        }

        let Some(mut frame_id) = choose_render_start(self.last_rendered_frame_id, &keyframes)
        else {
            return 0;
        };

        let mut rendered = 0;
        while let Some(message) = by_id.remove(&frame_id) {
            let (color, depth) = codec.decode(&message.color_bytes, &message.depth_bytes);
            presentation.present(frame_id, &color, &depth);
            self.last_rendered_frame_id = Some(frame_id);
            rendered += 1;
            frame_id += 1;
        }

        if let Some(last) = self.last_rendered_frame_id {
            storage.remove_obsolete(last);
        }

        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframe_skip_ahead_matches_documented_scenario() {
        // Frames {10 non-key, 11 non-key, 12 key, 13 non-key}, nothing
        // rendered yet below them: the keyframe at 12 wins, 13 follows
        // contiguously, 10/11 are never chosen.
        let mut frames = BTreeMap::new();
        frames.insert(10, false);
        frames.insert(11, false);
        frames.insert(12, true);
        frames.insert(13, false);

        let start = choose_render_start(Some(9), &frames);
        assert_eq!(start, Some(12));
    }

    #[test]
    fn falls_back_to_next_contiguous_frame_with_no_keyframe() {
        let mut frames = BTreeMap::new();
        frames.insert(10, false);
        let start = choose_render_start(Some(9), &frames);
        assert_eq!(start, Some(10));
    }

    #[test]
    fn no_target_when_next_frame_has_not_arrived() {
        let mut frames = BTreeMap::new();
        frames.insert(11, false); // 10 is missing, not contiguous
        let start = choose_render_start(Some(9), &frames);
        assert_eq!(start, None);
    }

    #[test]
    fn first_render_with_no_history_starts_at_zero() {
        let mut frames = BTreeMap::new();
        frames.insert(0, false);
        let start = choose_render_start(None, &frames);
        assert_eq!(start, Some(0));
    }

    struct TaggingCodec;
    impl VideoCodec for TaggingCodec {
        fn encode(&mut self, color: &[u8], depth: &[u8], _keyframe: bool) -> (Vec<u8>, Vec<u8>) {
            (color.to_vec(), depth.to_vec())
        }
        fn decode(&mut self, color: &[u8], depth: &[u8]) -> (Vec<u8>, Vec<u8>) {
            (color.to_vec(), depth.to_vec())
        }
    }

    struct RecordingPresentation {
        presented: Vec<i32>,
    }
    impl Presentation for RecordingPresentation {
        fn present(&mut self, frame_id: i32, _color: &[u8], _depth: &[u8]) {
            self.presented.push(frame_id);
        }
    }

    fn sample_message(keyframe: bool) -> VideoSenderMessage {
        VideoSenderMessage {
            frame_time_stamp: 0.0,
            keyframe,
            width: 1,
            height: 1,
            intrinsics: rgbd_protocol::video::CameraIntrinsics {
                cx: 0.0, cy: 0.0, fx: 0.0, fy: 0.0, k1: 0.0, k2: 0.0, k3: 0.0, k4: 0.0, k5: 0.0,
                k6: 0.0, codx: 0.0, cody: 0.0, p1: 0.0, p2: 0.0, max_radius: 0.0,
            },
            color_bytes: vec![1],
            depth_bytes: vec![2],
            floor: None,
        }
    }

    #[test]
    fn tick_renders_contiguous_run_and_evicts_storage() {
        let mut storage = ReceiverStorage::new();
        for frame_id in [0i32, 1, 2] {
            let keyframe = frame_id == 2;
            let encoded = sample_message(keyframe).encode();
            let video_packets = rgbd_protocol::video::split(frame_id, &encoded).unwrap();
            for p in video_packets {
                storage.add_video_packet(p);
            }
        }

        let mut dispatcher = RenderDispatcher::new();
        let mut codec = TaggingCodec;
        let mut presentation = RecordingPresentation { presented: Vec::new() };

        let rendered = dispatcher.tick(&mut storage, &mut codec, &mut presentation);

        assert_eq!(rendered, 3);
        assert_eq!(presentation.presented, vec![0, 1, 2]);
        assert_eq!(dispatcher.last_rendered_frame_id(), Some(2));
        assert!(!storage.contains(0));
        assert!(!storage.contains(1));
        assert!(!storage.contains(2));
    }
}
