//! Per-frame FEC reassembly on the receiver side.
//!
//! Models packet groups by parity coverage rather than per-packet XOR: a
//! [`PacketParityGroup`] owns up to `PARITY_GROUP_SIZE` video packet slots
//! plus an optional parity packet; a [`FrameParitySet`] owns one group per
//! parity packet of a frame; [`ReceiverStorage`] owns one set per in-flight
//! `frame_id`.

use std::collections::BTreeMap;

use rgbd_protocol::constants::PARITY_GROUP_SIZE;
use rgbd_protocol::video::{self, ParitySenderPacket, VideoSenderMessage, VideoSenderPacket};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Incorrect,
    Correctable,
    Correct,
}

/// Owns the (up to) `PARITY_GROUP_SIZE` video packet slots covered by one
/// parity packet, plus that parity packet itself once it arrives.
#[derive(Debug, Clone)]
pub struct PacketParityGroup {
    min_video_index: i32,
    video_packets: Vec<Option<VideoSenderPacket>>,
    parity_packet: Option<ParitySenderPacket>,
}

impl PacketParityGroup {
    fn new(min_video_index: i32, group_size: usize) -> Self {
        Self {
            min_video_index,
            video_packets: vec![None; group_size],
            parity_packet: None,
        }
    }

    fn add_video_packet(&mut self, packet: VideoSenderPacket) {
        let slot = (packet.packet_index - self.min_video_index) as usize;
        if slot < self.video_packets.len() {
            self.video_packets[slot] = Some(packet);
        }
    }

    fn set_parity_packet(&mut self, packet: ParitySenderPacket) {
        self.parity_packet = Some(packet);
    }

    pub fn state(&self) -> GroupState {
        let present = self.video_packets.iter().filter(|p| p.is_some()).count();
        if present == self.video_packets.len() {
            return GroupState::Correct;
        }
        let effective = present + self.parity_packet.is_some() as usize;
        if effective == self.video_packets.len() {
            GroupState::Correctable
        } else {
            GroupState::Incorrect
        }
    }

    /// Reconstructs this group's single missing video packet in place.
    /// Caller must check `state() == Correctable` first.
    fn correct(&mut self) {
        let Some(missing_slot) = self.video_packets.iter().position(|p| p.is_none()) else {
            return;
        };
        let Some(parity) = &self.parity_packet else { return };
        let present: Vec<&VideoSenderPacket> =
            self.video_packets.iter().filter_map(|p| p.as_ref()).collect();
        let missing_index = self.min_video_index + missing_slot as i32;
        let recovered = video::recover_video_packet(parity, &present, missing_index);
        self.video_packets[missing_slot] = Some(recovered);
    }

    fn missing_video_indices(&self) -> Vec<i32> {
        self.video_packets
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| self.min_video_index + i as i32)
            .collect()
    }

    fn parity_index(&self) -> i32 {
        self.min_video_index / PARITY_GROUP_SIZE as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Incorrect,
    Correctable,
    Correct,
}

/// Every parity group of one in-flight video frame, indexed by parity index.
#[derive(Debug, Clone)]
pub struct FrameParitySet {
    groups: Vec<Option<PacketParityGroup>>,
}

impl FrameParitySet {
    fn new(parity_group_count: usize) -> Self {
        Self { groups: vec![None; parity_group_count] }
    }

    fn group_size_for(min_video_index: i32, video_packet_count: i32) -> usize {
        (PARITY_GROUP_SIZE as i32).min(video_packet_count - min_video_index) as usize
    }

    fn add_video_packet(&mut self, packet: VideoSenderPacket) {
        let parity_index = (packet.packet_index / PARITY_GROUP_SIZE as i32) as usize;
        if parity_index >= self.groups.len() {
            return;
        }
        let min_video_index = parity_index as i32 * PARITY_GROUP_SIZE as i32;
        let group_size = Self::group_size_for(min_video_index, packet.packet_count);
        self.groups[parity_index]
            .get_or_insert_with(|| PacketParityGroup::new(min_video_index, group_size))
            .add_video_packet(packet);
    }

    fn add_parity_packet(&mut self, packet: ParitySenderPacket) {
        let parity_index = packet.packet_index as usize;
        if parity_index >= self.groups.len() {
            return;
        }
        let min_video_index = parity_index as i32 * PARITY_GROUP_SIZE as i32;
        let group_size = Self::group_size_for(min_video_index, packet.video_packet_count);
        self.groups[parity_index]
            .get_or_insert_with(|| PacketParityGroup::new(min_video_index, group_size))
            .set_parity_packet(packet);
    }

    pub fn state(&self) -> FrameState {
        let mut correct_count = 0;
        for group in self.groups.iter() {
            match group.as_ref().map(|g| g.state()) {
                Some(GroupState::Correct) => correct_count += 1,
                Some(GroupState::Incorrect) | None => return FrameState::Incorrect,
                Some(GroupState::Correctable) => {}
            }
        }
        if correct_count == self.groups.len() {
            FrameState::Correct
        } else {
            FrameState::Correctable
        }
    }

    /// Reconstructs every `Correctable` group in place.
    fn correct(&mut self) {
        for group in self.groups.iter_mut().flatten() {
            if group.state() == GroupState::Correctable {
                group.correct();
            }
        }
    }

    /// Concatenates every group's video packet payloads in index order and
    /// parses the result as a [`VideoSenderMessage`]. Caller must check
    /// `state() == Correct` first.
    fn assemble(&self, frame_id: i32) -> Option<VideoSenderMessage> {
        let mut packets: Vec<VideoSenderPacket> = Vec::new();
        for group in self.groups.iter() {
            // state() == Correct guarantees every group slot is populated;
            // reaching None here would mean state() and assemble() disagree.
            let Some(group) = group.as_ref() else {
                warn!(frame_id, "frame reported Correct but a parity group is missing");
                return None;
            };
            for packet in &group.video_packets {
                match packet.clone() {
                    Some(packet) => packets.push(packet),
                    None => {
                        warn!(frame_id, "frame reported Correct but a video packet slot is empty");
                        return None;
                    }
                }
            }
        }
        let bytes = match video::reassemble(&packets) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(frame_id, error = %err, "dropping frame: packet reassembly failed");
                return None;
            }
        };
        match VideoSenderMessage::decode(&bytes) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(frame_id, error = %err, "dropping frame: message decode failed after reassembly");
                None
            }
        }
    }

    /// Missing video/parity indices across every `Incorrect` group. A
    /// group's parity packet is only requested if it, too, is missing.
    fn missing_packets(&self) -> (Vec<i32>, Vec<i32>) {
        let mut video_indices = Vec::new();
        let mut parity_indices = Vec::new();
        for group in self.groups.iter().flatten() {
            if group.state() == GroupState::Incorrect {
                video_indices.extend(group.missing_video_indices());
                if group.parity_packet.is_none() {
                    parity_indices.push(group.parity_index());
                }
            }
        }
        (video_indices, parity_indices)
    }
}

/// Holds every in-flight frame's [`FrameParitySet`], keyed by `frame_id`.
#[derive(Debug, Default)]
pub struct ReceiverStorage {
    frames: BTreeMap<i32, FrameParitySet>,
}

impl ReceiverStorage {
    pub fn new() -> Self {
        Self { frames: BTreeMap::new() }
    }

    pub fn add_video_packet(&mut self, packet: VideoSenderPacket) {
        let parity_group_count = (packet.packet_count as usize).div_ceil(PARITY_GROUP_SIZE);
        self.frames
            .entry(packet.frame_id)
            .or_insert_with(|| FrameParitySet::new(parity_group_count))
            .add_video_packet(packet);
    }

    pub fn add_parity_packet(&mut self, packet: ParitySenderPacket) {
        let parity_group_count = (packet.video_packet_count as usize).div_ceil(PARITY_GROUP_SIZE);
        self.frames
            .entry(packet.frame_id)
            .or_insert_with(|| FrameParitySet::new(parity_group_count))
            .add_parity_packet(packet);
    }

    pub fn max_frame_id(&self) -> Option<i32> {
        self.frames.keys().next_back().copied()
    }

    pub fn contains(&self, frame_id: i32) -> bool {
        self.frames.contains_key(&frame_id)
    }

    pub fn state_of(&self, frame_id: i32) -> Option<FrameState> {
        self.frames.get(&frame_id).map(|f| f.state())
    }

    /// Corrects every `Correctable` frame in place and returns every frame
    /// that has now reached `Correct`, assembled into a message, in
    /// ascending `frame_id` order. Assembled frames are left in storage
    /// (the caller evicts via [`remove_obsolete`](Self::remove_obsolete)
    /// once rendered) so a repeated poll before rendering is idempotent.
    pub fn poll_assemble(&mut self) -> Vec<(i32, VideoSenderMessage)> {
        let mut assembled = Vec::new();
        for (&frame_id, set) in self.frames.iter_mut() {
            if set.state() == FrameState::Correctable {
                set.correct();
            }
            if set.state() == FrameState::Correct {
                match set.assemble(frame_id) {
                    Some(message) => assembled.push((frame_id, message)),
                    None => warn!(frame_id, "frame stuck in storage: reassembly failed after reaching Correct"),
                }
            }
        }
        assembled
    }

    /// Missing video/parity indices for every `Incorrect` frame strictly
    /// older than `max_frame_id`: never request the frame whose own packet
    /// just triggered this call, since siblings are still arriving.
    pub fn missing_packets_below(&self, max_frame_id: i32) -> Vec<(i32, Vec<i32>, Vec<i32>)> {
        self.frames
            .iter()
            .filter(|&(&frame_id, _)| frame_id < max_frame_id)
            .filter(|&(_, set)| set.state() == FrameState::Incorrect)
            .map(|(&frame_id, set)| {
                let (video, parity) = set.missing_packets();
                (frame_id, video, parity)
            })
            .collect()
    }

    pub fn remove_obsolete(&mut self, last_rendered_frame_id: i32) {
        self.frames.retain(|&frame_id, _| frame_id > last_rendered_frame_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> VideoSenderMessage {
        VideoSenderMessage {
            frame_time_stamp: 1.0,
            keyframe: false,
            width: 4,
            height: 4,
            intrinsics: rgbd_protocol::video::CameraIntrinsics {
                cx: 0.0, cy: 0.0, fx: 0.0, fy: 0.0, k1: 0.0, k2: 0.0, k3: 0.0, k4: 0.0, k5: 0.0,
                k6: 0.0, codx: 0.0, cody: 0.0, p1: 0.0, p2: 0.0, max_radius: 0.0,
            },
            color_bytes: (0..900u32).map(|i| (i % 251) as u8).collect(),
            depth_bytes: (0..900u32).map(|i| (i % 239) as u8).collect(),
            floor: None,
        }
    }

    #[test]
    fn single_packet_loss_is_recovered_and_frame_becomes_correct() {
        let encoded = message().encode();
        let video_packets = video::split(5, &encoded).unwrap();
        let parity_packets = video::build_parity(5, &video_packets);

        let mut storage = ReceiverStorage::new();
        for (i, p) in video_packets.into_iter().enumerate() {
            if i == 0 {
                continue; // drop packet 0
            }
            storage.add_video_packet(p);
        }
        for p in parity_packets {
            storage.add_parity_packet(p);
        }

        assert_eq!(storage.state_of(5), Some(FrameState::Correctable));
        let assembled = storage.poll_assemble();
        assert_eq!(assembled.len(), 1);
        assert_eq!(assembled[0].0, 5);
        assert_eq!(assembled[0].1, message());
    }

    /// Drops the frame's globally-last video packet rather than packet 0 —
    /// the only index whose recovery depends on `final_packet_length`
    /// instead of a full-length XOR. `message()` has `floor: None`, so the
    /// packet's true last byte is a zero `has_floor` flag.
    #[test]
    fn last_packet_loss_is_recovered_byte_for_byte() {
        let encoded = message().encode();
        let video_packets = video::split(6, &encoded).unwrap();
        assert!(video_packets.len() > PARITY_GROUP_SIZE, "need more than one parity group");
        let last_index = video_packets.len() - 1;
        let lost = video_packets[last_index].clone();
        let parity_packets = video::build_parity(6, &video_packets);

        let mut storage = ReceiverStorage::new();
        for (i, p) in video_packets.into_iter().enumerate() {
            if i == last_index {
                continue;
            }
            storage.add_video_packet(p);
        }
        for p in parity_packets {
            storage.add_parity_packet(p);
        }

        assert_eq!(storage.state_of(6), Some(FrameState::Correctable));
        let assembled = storage.poll_assemble();
        assert_eq!(assembled.len(), 1);
        assert_eq!(assembled[0].0, 6);
        assert_eq!(assembled[0].1, message());
        assert_eq!(*lost.payload.last().unwrap(), 0, "test assumes a genuinely zero final byte");
    }

    #[test]
    fn two_losses_in_one_group_stay_incorrect_and_report_missing_indices() {
        let encoded = message().encode();
        let video_packets = video::split(9, &encoded).unwrap();
        assert!(video_packets.len() >= 2);
        let parity_packets = video::build_parity(9, &video_packets);

        let mut storage = ReceiverStorage::new();
        // Drop both video packets of group 0 (indices 0 and 1), keep parity.
        for (i, p) in video_packets.into_iter().enumerate() {
            if i == 0 || i == 1 {
                continue;
            }
            storage.add_video_packet(p);
        }
        for p in parity_packets {
            storage.add_parity_packet(p);
        }

        assert_eq!(storage.state_of(9), Some(FrameState::Incorrect));
        let missing = storage.missing_packets_below(10);
        assert_eq!(missing.len(), 1);
        let (frame_id, video_missing, parity_missing) = &missing[0];
        assert_eq!(*frame_id, 9);
        assert_eq!(video_missing, &vec![0, 1]);
        assert!(parity_missing.is_empty(), "parity itself was received, so it's not requested");
    }

    #[test]
    fn missing_parity_is_requested_when_a_video_packet_is_also_missing() {
        let encoded = message().encode();
        let video_packets = video::split(1, &encoded).unwrap();

        let mut storage = ReceiverStorage::new();
        for (i, p) in video_packets.into_iter().enumerate() {
            if i == 0 {
                continue;
            }
            storage.add_video_packet(p);
        }
        // No parity packet added at all.

        assert_eq!(storage.state_of(1), Some(FrameState::Incorrect));
        let (_, video_missing, parity_missing) = &storage.missing_packets_below(2)[0];
        assert_eq!(video_missing, &vec![0]);
        assert_eq!(parity_missing, &vec![0]);
    }

    #[test]
    fn remove_obsolete_drops_rendered_frames() {
        let mut storage = ReceiverStorage::new();
        storage.add_video_packet(VideoSenderPacket { frame_id: 1, packet_index: 0, packet_count: 1, payload: vec![] });
        storage.add_video_packet(VideoSenderPacket { frame_id: 2, packet_index: 0, packet_count: 1, payload: vec![] });
        storage.remove_obsolete(1);
        assert!(!storage.contains(1));
        assert!(storage.contains(2));
    }
}
