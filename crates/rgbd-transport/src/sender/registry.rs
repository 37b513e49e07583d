//! Tracks connected receivers on the sender side: one entry per peer,
//! created on `Connect`, evicted on timeout or a terminal send error.
//!
//! A table-of-sessions idiom: one entry per connected peer, looked up by
//! owner id, refreshed on every inbound datagram and evicted on timeout.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rgbd_protocol::constants::SENDER_HEARTBEAT_TIMEOUT_SEC;

/// One connected receiver, as seen from the sender.
#[derive(Debug, Clone)]
pub struct ReceiverEntry {
    pub endpoint: SocketAddr,
    pub receiver_id: i32,
    pub video_requested: bool,
    pub audio_requested: bool,
    /// `None` until the first `Report` arrives from this receiver.
    pub last_reported_frame_id: Option<i32>,
    pub last_packet_time: Instant,
}

/// The sender's table of connected receivers, keyed by `receiver_id`.
#[derive(Debug, Default)]
pub struct ReceiverRegistry {
    entries: HashMap<i32, ReceiverEntry>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Handles an inbound `Connect`. Returns `true` if a Confirm should be
    /// sent back — which is always, whether this is a first-time join or a
    /// repeat (idempotent; never creates a duplicate entry).
    pub fn connect(
        &mut self,
        receiver_id: i32,
        endpoint: SocketAddr,
        video_requested: bool,
        audio_requested: bool,
        now: Instant,
    ) -> bool {
        self.entries
            .entry(receiver_id)
            .and_modify(|e| {
                e.endpoint = endpoint;
                e.video_requested = video_requested;
                e.audio_requested = audio_requested;
                e.last_packet_time = now;
            })
            .or_insert_with(|| ReceiverEntry {
                endpoint,
                receiver_id,
                video_requested,
                audio_requested,
                last_reported_frame_id: None,
                last_packet_time: now,
            });
        true
    }

    /// Records activity from a receiver (any inbound packet), refreshing its
    /// timeout window.
    pub fn touch(&mut self, receiver_id: i32, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&receiver_id) {
            entry.last_packet_time = now;
        }
    }

    /// Applies a `Report`, advancing `last_reported_frame_id` monotonically.
    /// A report for a frame at or behind the current value is ignored
    /// (`TransportError::StaleReport` at the caller).
    pub fn report(&mut self, receiver_id: i32, frame_id: i32, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&receiver_id) {
            entry.last_packet_time = now;
            entry.last_reported_frame_id = Some(match entry.last_reported_frame_id {
                Some(current) => current.max(frame_id),
                None => frame_id,
            });
        }
    }

    pub fn get(&self, receiver_id: i32) -> Option<&ReceiverEntry> {
        self.entries.get(&receiver_id)
    }

    pub fn remove(&mut self, receiver_id: i32) {
        self.entries.remove(&receiver_id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReceiverEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts every receiver silent for longer than the sender-side
    /// heartbeat timeout, returning the evicted ids.
    pub fn evict_timed_out(&mut self, now: Instant) -> Vec<i32> {
        let timeout = Duration::from_secs_f32(SENDER_HEARTBEAT_TIMEOUT_SEC);
        let stale: Vec<i32> = self
            .entries
            .values()
            .filter(|e| now.duration_since(e.last_packet_time) > timeout)
            .map(|e| e.receiver_id)
            .collect();
        for id in &stale {
            self.entries.remove(id);
        }
        stale
    }

    /// The minimum `last_reported_frame_id` across video-requesting
    /// receivers that have reported at least once, or `None` if no
    /// video-requesting receiver has reported yet.
    pub fn min_reported_frame_id(&self) -> Option<i32> {
        self.entries
            .values()
            .filter(|e| e.video_requested)
            .filter_map(|e| e.last_reported_frame_id)
            .min()
    }

    /// `true` if any video-requesting receiver has never reported a frame —
    /// used by the bitrate controller to force an immediate keyframe.
    pub fn has_unreported_video_receiver(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.video_requested && e.last_reported_frame_id.is_none())
    }

    pub fn has_video_receivers(&self) -> bool {
        self.entries.values().any(|e| e.video_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn connect_from_new_receiver_creates_one_entry() {
        let mut reg = ReceiverRegistry::new();
        let now = Instant::now();
        assert!(reg.connect(1, addr(), true, false, now));
        assert_eq!(reg.len(), 1);
        assert!(reg.connect(1, addr(), true, false, now));
        assert_eq!(reg.len(), 1, "repeated connect must not duplicate the entry");
    }

    #[test]
    fn report_is_monotonic() {
        let mut reg = ReceiverRegistry::new();
        let now = Instant::now();
        reg.connect(1, addr(), true, false, now);
        reg.report(1, 5, now);
        reg.report(1, 3, now);
        reg.report(1, 9, now);
        assert_eq!(reg.get(1).unwrap().last_reported_frame_id, Some(9));
    }

    #[test]
    fn timeout_eviction() {
        let mut reg = ReceiverRegistry::new();
        let now = Instant::now();
        reg.connect(1, addr(), true, false, now);
        let later = now + Duration::from_secs_f32(SENDER_HEARTBEAT_TIMEOUT_SEC + 0.1);
        let evicted = reg.evict_timed_out(later);
        assert_eq!(evicted, vec![1]);
        assert!(reg.is_empty());
    }

    #[test]
    fn min_reported_ignores_audio_only_receivers() {
        let mut reg = ReceiverRegistry::new();
        let now = Instant::now();
        reg.connect(1, addr(), true, false, now);
        reg.connect(2, addr(), false, true, now);
        reg.report(1, 4, now);
        reg.report(2, 100, now);
        assert_eq!(reg.min_reported_frame_id(), Some(4));
    }
}
