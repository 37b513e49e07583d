//! Frame-id-ordered audio jitter buffer.
//!
//! Buffers inbound `AudioSenderPacket`s by `frame_id` and drains them in
//! order, decoding on drain: instead of handing the caller raw Opus bytes
//! or a loss marker, `drain` itself calls the decoder (including the
//! `decode(None, ..)` PLC path on a gap) and yields PCM.

use std::collections::BTreeMap;

use rgbd_protocol::audio::AudioSenderPacket;

use crate::codec::AudioDecoder;
use crate::error::AudioError;

/// Buffers incoming `AudioSenderPacket`s keyed by `frame_id` and releases
/// them to a decoder in order once enough have accumulated to absorb
/// jitter.
pub struct AudioJitterBuffer {
    pending: BTreeMap<i32, Vec<u8>>,
    next_frame_id: Option<i32>,
    target_delay: usize,
    buffering: bool,
    max_buffer: usize,
}

impl AudioJitterBuffer {
    /// `target_delay` is the number of 20ms frames to accumulate before
    /// playback starts; a higher value absorbs more jitter at the cost of
    /// latency.
    pub fn new(target_delay: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            next_frame_id: None,
            target_delay: target_delay.max(1),
            buffering: true,
            max_buffer: target_delay.max(1) * 4,
        }
    }

    pub fn push(&mut self, packet: AudioSenderPacket) {
        if !self.buffering {
            if let Some(next) = self.next_frame_id {
                if packet.frame_id < next {
                    return; // already played past this frame_id
                }
            }
        }
        self.pending.insert(packet.frame_id, packet.opus_payload);
        while self.pending.len() > self.max_buffer {
            self.pending.pop_first();
        }
    }

    /// Decodes and returns the next frame's PCM, if one is ready to play.
    /// Internally uses PLC (`decoder.decode(None, ..)`) for a frame_id
    /// that's missing but whose successor has already arrived.
    pub fn drain(&mut self, decoder: &mut AudioDecoder) -> Result<Option<Vec<f32>>, AudioError> {
        if self.buffering {
            if self.pending.len() >= self.target_delay {
                self.buffering = false;
                self.next_frame_id = self.pending.keys().next().copied();
            } else {
                return Ok(None);
            }
        }

        let Some(next) = self.next_frame_id else { return Ok(None) };

        if let Some(opus_payload) = self.pending.remove(&next) {
            self.next_frame_id = Some(next + 1);
            decoder.decode(Some(&opus_payload)).map(Some)
        } else if !self.pending.is_empty() {
            self.next_frame_id = Some(next + 1);
            decoder.decode(None).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.next_frame_id = None;
        self.buffering = true;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(frame_id: i32, payload: Vec<u8>) -> AudioSenderPacket {
        AudioSenderPacket { frame_id, opus_payload: payload }
    }

    #[test]
    fn out_of_order_packets_decode_in_frame_id_order() {
        let mut jb = AudioJitterBuffer::new(1);
        let mut decoder = AudioDecoder::new().unwrap();

        // Build real opus payloads so decode() succeeds.
        let mut enc = crate::codec::AudioEncoder::new().unwrap();
        let silence = vec![0.0f32; crate::codec::FRAME_LEN];
        let opus = enc.encode(&silence).unwrap();

        jb.push(packet(3, opus.clone()));
        jb.push(packet(1, opus.clone()));
        jb.push(packet(2, opus.clone()));

        let mut decoded_order = Vec::new();
        while let Ok(Some(frame)) = jb.drain(&mut decoder) {
            assert_eq!(frame.len(), crate::codec::FRAME_LEN);
            decoded_order.push(());
            if decoded_order.len() == 3 {
                break;
            }
        }
        assert_eq!(decoded_order.len(), 3);
    }

    #[test]
    fn missing_frame_triggers_concealment_without_stalling() {
        let mut jb = AudioJitterBuffer::new(1);
        let mut decoder = AudioDecoder::new().unwrap();
        let mut enc = crate::codec::AudioEncoder::new().unwrap();
        let silence = vec![0.0f32; crate::codec::FRAME_LEN];
        let opus = enc.encode(&silence).unwrap();

        jb.push(packet(0, opus.clone()));
        jb.push(packet(2, opus)); // frame_id 1 never arrives

        let first = jb.drain(&mut decoder).unwrap();
        assert!(first.is_some());
        let second = jb.drain(&mut decoder).unwrap(); // concealment for frame 1
        assert!(second.is_some());
        let third = jb.drain(&mut decoder).unwrap();
        assert!(third.is_some());
    }
}
