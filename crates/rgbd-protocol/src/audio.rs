//! The `Audio` packet body: one Opus-encoded stereo frame, tagged by
//! `frame_id` so the receiver's jitter buffer can reorder and detect loss.

use crate::error::ProtocolError;
use crate::wire::{ByteReader, ByteWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSenderPacket {
    pub frame_id: i32,
    pub opus_payload: Vec<u8>,
}

impl AudioSenderPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(16 + self.opus_payload.len());
        w.write_i32(owner_id);
        w.write_u8(crate::packet::SenderPacketKind::Audio as u8);
        w.write_i32(self.frame_id);
        w.write_bytes(&[0u8; 7]); // alignment padding, see AUDIO_PACKET_HEADER_SIZE
        w.write_bytes(&self.opus_payload);
        w.into_vec()
    }

    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        let frame_id = r.read_i32()?;
        let _reserved = r.read_bytes(7)?;
        let opus_payload = r.read_to_end().to_vec();
        Ok(Self { frame_id, opus_payload })
    }
}
