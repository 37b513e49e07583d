//! Session-control packet bodies: Confirm, Heartbeat, Connect, Report, Request.
//!
//! Each type implements `to_bytes(owner_id)` / `from_body(reader)`, where
//! `from_body` is called after the caller (see `packet.rs`) has already
//! consumed the common 5-byte prefix.

use crate::error::ProtocolError;
use crate::wire::{ByteReader, ByteWriter};

/// Marker type for the bodiless `Heartbeat` packet, sent in either direction.
pub struct HeartbeatPacket;

impl HeartbeatPacket {
    pub fn to_bytes(&self, owner_id: i32, kind: u8) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(5);
        w.write_i32(owner_id);
        w.write_u8(kind);
        w.into_vec()
    }
}

/// Sender's acknowledgment of a `Connect`, naming the receiver it confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPacket {
    pub receiver_id: i32,
}

impl ConfirmPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(9);
        w.write_i32(owner_id);
        w.write_u8(crate::packet::SenderPacketKind::Confirm as u8);
        w.write_i32(self.receiver_id);
        w.into_vec()
    }

    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        Ok(Self { receiver_id: r.read_i32()? })
    }
}

/// Receiver's request to join a session, declaring which streams it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPacket {
    pub video_requested: bool,
    pub audio_requested: bool,
}

impl ConnectPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(7);
        w.write_i32(owner_id);
        w.write_u8(crate::packet::ReceiverPacketKind::Connect as u8);
        w.write_bool(self.video_requested);
        w.write_bool(self.audio_requested);
        w.into_vec()
    }

    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            video_requested: r.read_bool()?,
            audio_requested: r.read_bool()?,
        })
    }
}

/// Receiver's acknowledgment of the latest frame it has rendered.
///
/// Senders may receive optional reserved trailing bytes (timing telemetry
/// some receivers attach) and must accept and ignore them: `from_body` never
/// calls `read_to_end`, so it simply stops after `frame_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPacket {
    pub frame_id: i32,
}

impl ReportPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(9);
        w.write_i32(owner_id);
        w.write_u8(crate::packet::ReceiverPacketKind::Report as u8);
        w.write_i32(self.frame_id);
        w.into_vec()
    }

    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        Ok(Self { frame_id: r.read_i32()? })
    }
}

/// Receiver's NACK: either "resend everything for this frame" or a specific
/// set of missing video/parity packet indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPacket {
    pub frame_id: i32,
    pub all_packets: bool,
    pub video_indices: Vec<i32>,
    pub parity_indices: Vec<i32>,
}

impl RequestPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(
            17 + 4 * (self.video_indices.len() + self.parity_indices.len()),
        );
        w.write_i32(owner_id);
        w.write_u8(crate::packet::ReceiverPacketKind::Request as u8);
        w.write_i32(self.frame_id);
        w.write_bool(self.all_packets);
        w.write_i32(self.video_indices.len() as i32);
        w.write_i32(self.parity_indices.len() as i32);
        for i in &self.video_indices {
            w.write_i32(*i);
        }
        for i in &self.parity_indices {
            w.write_i32(*i);
        }
        w.into_vec()
    }

    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        let frame_id = r.read_i32()?;
        let all_packets = r.read_bool()?;
        let video_index_count = non_negative(r.read_i32()?)?;
        let parity_index_count = non_negative(r.read_i32()?)?;
        let video_indices = (0..video_index_count).map(|_| r.read_i32()).collect::<Result<_, _>>()?;
        let parity_indices = (0..parity_index_count).map(|_| r.read_i32()).collect::<Result<_, _>>()?;
        Ok(Self { frame_id, all_packets, video_indices, parity_indices })
    }
}

fn non_negative(v: i32) -> Result<usize, ProtocolError> {
    usize::try_from(v).map_err(|_| ProtocolError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_roundtrip() {
        let p = ConfirmPacket { receiver_id: 1234 };
        let bytes = p.to_bytes(1);
        let mut r = ByteReader::new(&bytes[5..]);
        assert_eq!(ConfirmPacket::from_body(&mut r).unwrap(), p);
    }

    #[test]
    fn request_roundtrip_empty_and_populated() {
        for p in [
            RequestPacket { frame_id: 5, all_packets: true, video_indices: vec![], parity_indices: vec![] },
            RequestPacket { frame_id: 5, all_packets: false, video_indices: vec![0, 2, 4], parity_indices: vec![1] },
        ] {
            let bytes = p.to_bytes(9);
            let mut r = ByteReader::new(&bytes[5..]);
            assert_eq!(RequestPacket::from_body(&mut r).unwrap(), p);
        }
    }

    #[test]
    fn report_ignores_trailing_telemetry_bytes() {
        let mut bytes = ReportPacket { frame_id: 8 }.to_bytes(3);
        bytes.extend_from_slice(&[0xAA; 8]); // pretend timing telemetry floats
        let mut r = ByteReader::new(&bytes[5..]);
        assert_eq!(ReportPacket::from_body(&mut r).unwrap(), ReportPacket { frame_id: 8 });
    }
}
