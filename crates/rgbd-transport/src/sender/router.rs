//! Dispatches an inbound `ReceiverPacket` to the right piece of sender
//! state and returns whatever reply packets it produces, switching on the
//! receiver packet kind to one of four handlers.

use std::net::SocketAddr;
use std::time::Instant;

use rgbd_protocol::control::ConfirmPacket;
use rgbd_protocol::{ReceiverPacket, SenderPacket};

use super::registry::ReceiverRegistry;
use super::retransmit::plan_retransmit;
use super::storage::SenderStorage;

/// Handles one inbound `ReceiverPacket`, mutating `registry` as needed and
/// returning every `SenderPacket` that should be sent back to `from`.
///
/// `Connect` and `Heartbeat` always refresh the sender's view of the peer
/// before anything else: every inbound datagram touches the session's
/// last-seen time, not just the packet kinds that carry new information.
pub fn handle(
    owner_id: i32,
    packet: &ReceiverPacket,
    from: SocketAddr,
    registry: &mut ReceiverRegistry,
    storage: &SenderStorage,
    now: Instant,
) -> Vec<SenderPacket> {
    match packet {
        ReceiverPacket::Connect { owner_id: receiver_id, body } => {
            registry.connect(*receiver_id, from, body.video_requested, body.audio_requested, now);
            vec![SenderPacket::Confirm {
                owner_id,
                body: ConfirmPacket { receiver_id: *receiver_id },
            }]
        }
        ReceiverPacket::Heartbeat { owner_id: receiver_id } => {
            registry.touch(*receiver_id, now);
            Vec::new()
        }
        ReceiverPacket::Report { owner_id: receiver_id, body } => {
            registry.report(*receiver_id, body.frame_id, now);
            Vec::new()
        }
        ReceiverPacket::Request { owner_id: receiver_id, body } => {
            registry.touch(*receiver_id, now);
            plan_retransmit(owner_id, storage, body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgbd_protocol::control::{ConnectPacket, ReportPacket, RequestPacket};
    use rgbd_protocol::video::VideoSenderPacket;

    fn addr() -> SocketAddr {
        "127.0.0.1:9100".parse().unwrap()
    }

    #[test]
    fn connect_registers_receiver_and_replies_with_confirm() {
        let mut registry = ReceiverRegistry::new();
        let storage = SenderStorage::new();
        let packet = ReceiverPacket::Connect {
            owner_id: 5,
            body: ConnectPacket { video_requested: true, audio_requested: false },
        };
        let replies = handle(1, &packet, addr(), &mut registry, &storage, Instant::now());
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            SenderPacket::Confirm { owner_id, body } => {
                assert_eq!(*owner_id, 1);
                assert_eq!(body.receiver_id, 5);
            }
            _ => panic!("expected a confirm"),
        }
        assert!(registry.get(5).is_some());
    }

    #[test]
    fn report_updates_registry_and_has_no_reply() {
        let mut registry = ReceiverRegistry::new();
        registry.connect(5, addr(), true, false, Instant::now());
        let storage = SenderStorage::new();
        let packet = ReceiverPacket::Report { owner_id: 5, body: ReportPacket { frame_id: 9 } };
        let replies = handle(1, &packet, addr(), &mut registry, &storage, Instant::now());
        assert!(replies.is_empty());
        assert_eq!(registry.get(5).unwrap().last_reported_frame_id, Some(9));
    }

    #[test]
    fn request_resends_stored_packets() {
        let mut registry = ReceiverRegistry::new();
        registry.connect(5, addr(), true, false, Instant::now());
        let mut storage = SenderStorage::new();
        storage.insert(
            3,
            vec![VideoSenderPacket { frame_id: 3, packet_index: 0, packet_count: 1, payload: vec![9] }],
            vec![],
        );
        let packet = ReceiverPacket::Request {
            owner_id: 5,
            body: RequestPacket { frame_id: 3, all_packets: true, video_indices: vec![], parity_indices: vec![] },
        };
        let replies = handle(1, &packet, addr(), &mut registry, &storage, Instant::now());
        assert_eq!(replies.len(), 1);
    }
}
