//! Keeps every video/parity packet the sender has produced, keyed by
//! `frame_id`, so a `Request` can be answered by resending bytes rather
//! than recomputing them.
//!
//! Entries are dropped once every receiver has reported past them, not
//! after a fixed wall-clock timeout (see DESIGN.md for the rationale).

use std::collections::BTreeMap;

use rgbd_protocol::video::{ParitySenderPacket, VideoSenderPacket};

#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub video_packets: Vec<VideoSenderPacket>,
    pub parity_packets: Vec<ParitySenderPacket>,
}

#[derive(Debug, Default)]
pub struct SenderStorage {
    frames: BTreeMap<i32, FrameEntry>,
}

impl SenderStorage {
    pub fn new() -> Self {
        Self { frames: BTreeMap::new() }
    }

    pub fn insert(
        &mut self,
        frame_id: i32,
        video_packets: Vec<VideoSenderPacket>,
        parity_packets: Vec<ParitySenderPacket>,
    ) {
        self.frames.insert(frame_id, FrameEntry { video_packets, parity_packets });
    }

    pub fn get(&self, frame_id: i32) -> Option<&FrameEntry> {
        self.frames.get(&frame_id)
    }

    pub fn max_frame_id(&self) -> Option<i32> {
        self.frames.keys().next_back().copied()
    }

    /// Drops every frame at or before `min_reported_frame_id`: no connected
    /// video receiver can still be missing it, so retransmission is moot.
    pub fn cleanup(&mut self, min_reported_frame_id: i32) {
        self.frames.retain(|&frame_id, _| frame_id > min_reported_frame_id);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(frame_id: i32, index: i32) -> VideoSenderPacket {
        VideoSenderPacket { frame_id, packet_index: index, packet_count: 1, payload: vec![index as u8] }
    }

    #[test]
    fn cleanup_drops_frames_at_or_before_min_reported() {
        let mut storage = SenderStorage::new();
        for frame_id in 1..=5 {
            storage.insert(frame_id, vec![packet(frame_id, 0)], vec![]);
        }
        storage.cleanup(3);
        assert!(storage.get(1).is_none());
        assert!(storage.get(3).is_none());
        assert!(storage.get(4).is_some());
        assert!(storage.get(5).is_some());
    }

    #[test]
    fn max_frame_id_tracks_latest_insert() {
        let mut storage = SenderStorage::new();
        storage.insert(2, vec![], vec![]);
        storage.insert(7, vec![], vec![]);
        storage.insert(4, vec![], vec![]);
        assert_eq!(storage.max_frame_id(), Some(7));
    }
}
