//! Answers a receiver's `Request` by resending stored packets.

use rgbd_protocol::control::RequestPacket;
use rgbd_protocol::SenderPacket;

use super::storage::SenderStorage;

/// Builds the set of sender packets to resend in response to `request`,
/// drawing from whatever this frame's entry in `storage` still holds. A
/// frame that has already been cleaned up (because every receiver reported
/// past it) yields nothing — the request is stale.
pub fn plan_retransmit(owner_id: i32, storage: &SenderStorage, request: &RequestPacket) -> Vec<SenderPacket> {
    let Some(entry) = storage.get(request.frame_id) else {
        return Vec::new();
    };

    if request.all_packets {
        let mut out: Vec<SenderPacket> = entry
            .video_packets
            .iter()
            .cloned()
            .map(|body| SenderPacket::Video { owner_id, body })
            .collect();
        out.extend(entry.parity_packets.iter().cloned().map(|body| SenderPacket::Parity { owner_id, body }));
        return out;
    }

    let mut out = Vec::with_capacity(request.video_indices.len() + request.parity_indices.len());
    for &index in &request.video_indices {
        if let Some(body) = entry.video_packets.iter().find(|p| p.packet_index == index) {
            out.push(SenderPacket::Video { owner_id, body: body.clone() });
        }
    }
    for &index in &request.parity_indices {
        if let Some(body) = entry.parity_packets.iter().find(|p| p.packet_index == index) {
            out.push(SenderPacket::Parity { owner_id, body: body.clone() });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgbd_protocol::video::VideoSenderPacket;

    fn video(index: i32) -> VideoSenderPacket {
        VideoSenderPacket { frame_id: 1, packet_index: index, packet_count: 3, payload: vec![index as u8; 4] }
    }

    #[test]
    fn retransmits_specific_indices() {
        let mut storage = SenderStorage::new();
        storage.insert(1, vec![video(0), video(1), video(2)], vec![]);
        let request = RequestPacket { frame_id: 1, all_packets: false, video_indices: vec![1], parity_indices: vec![] };
        let out = plan_retransmit(42, &storage, &request);
        assert_eq!(out.len(), 1);
        match &out[0] {
            SenderPacket::Video { body, .. } => assert_eq!(body.packet_index, 1),
            _ => panic!("expected a video packet"),
        }
    }

    #[test]
    fn all_packets_request_resends_whole_frame() {
        let mut storage = SenderStorage::new();
        storage.insert(1, vec![video(0), video(1)], vec![]);
        let request = RequestPacket { frame_id: 1, all_packets: true, video_indices: vec![], parity_indices: vec![] };
        assert_eq!(plan_retransmit(1, &storage, &request).len(), 2);
    }

    #[test]
    fn stale_request_for_cleaned_up_frame_yields_nothing() {
        let storage = SenderStorage::new();
        let request = RequestPacket { frame_id: 99, all_packets: true, video_indices: vec![], parity_indices: vec![] };
        assert!(plan_retransmit(1, &storage, &request).is_empty());
    }
}
