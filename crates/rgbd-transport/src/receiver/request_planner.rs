//! Builds the receiver's outbound `Request` (NACK) packets.

use rgbd_protocol::control::RequestPacket;

use super::storage::ReceiverStorage;

/// Builds every `Request` the receiver owes the sender this tick:
///
/// - one specific-indices request per `Incorrect` frame strictly older
///   than the highest `frame_id` currently in storage (its parity group
///   siblings may still be in flight, so it is never itself re-requested);
/// - one whole-frame request for every `frame_id` strictly between
///   `last_rendered_frame_id + 1` and the storage maximum that has no
///   storage entry at all (nothing of it has arrived yet).
pub fn plan_requests(
    storage: &ReceiverStorage,
    last_rendered_frame_id: Option<i32>,
) -> Vec<RequestPacket> {
    let Some(max_frame_id) = storage.max_frame_id() else {
        return Vec::new();
    };

    let mut requests = std::collections::BTreeMap::new();

    for (frame_id, video_indices, parity_indices) in storage.missing_packets_below(max_frame_id) {
        requests.insert(
            frame_id,
            RequestPacket { frame_id, all_packets: false, video_indices, parity_indices },
        );
    }

    let start = last_rendered_frame_id.map(|f| f + 1).unwrap_or(0);
    for frame_id in start..max_frame_id {
        if !storage.contains(frame_id) {
            requests.entry(frame_id).or_insert(RequestPacket {
                frame_id,
                all_packets: true,
                video_indices: Vec::new(),
                parity_indices: Vec::new(),
            });
        }
    }

    requests.into_values().collect()
}
