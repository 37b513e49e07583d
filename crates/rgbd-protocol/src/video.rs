//! Video message framing, fragmentation and XOR-parity FEC.
//!
//! A [`VideoSenderMessage`] is the logical unit of one compressed RGB-D
//! frame. It is encoded to a flat byte stream (§6 "Message-in-payload
//! layout") and [`split`] into a *video packet group* of `N`
//! [`VideoSenderPacket`]s, each carrying at most
//! [`MAX_VIDEO_PACKET_CONTENT_SIZE`] bytes of payload. Unlike the parity
//! packets below, video packets are never padded: the last packet of a
//! group is simply shorter, the way a UDP datagram naturally is.
//!
//! [`build_parity`] groups `PARITY_GROUP_SIZE` consecutive video packets
//! and XORs their payloads (zero-extended to the full content size, since
//! XOR is only well-defined over equal-length operands) into one parity
//! packet per group.

use crate::constants::{MAX_VIDEO_PACKET_CONTENT_SIZE, PARITY_GROUP_SIZE};
use crate::error::ProtocolError;
use crate::wire::{ByteReader, ByteWriter};

/// The depth camera's intrinsic calibration parameters.
///
/// `cx, cy, fx, fy, k1..k6, codx, cody, p1, p2, max_radius` — 15 named
/// floats, matching the Azure Kinect calibration struct these are drawn
/// from field-for-field. See DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub cx: f32,
    pub cy: f32,
    pub fx: f32,
    pub fy: f32,
    pub k1: f32,
    pub k2: f32,
    pub k3: f32,
    pub k4: f32,
    pub k5: f32,
    pub k6: f32,
    pub codx: f32,
    pub cody: f32,
    pub p1: f32,
    pub p2: f32,
    pub max_radius: f32,
}

impl CameraIntrinsics {
    fn write(&self, w: &mut ByteWriter) {
        w.write_f32(self.cx);
        w.write_f32(self.cy);
        w.write_f32(self.fx);
        w.write_f32(self.fy);
        w.write_f32(self.k1);
        w.write_f32(self.k2);
        w.write_f32(self.k3);
        w.write_f32(self.k4);
        w.write_f32(self.k5);
        w.write_f32(self.k6);
        w.write_f32(self.codx);
        w.write_f32(self.cody);
        w.write_f32(self.p1);
        w.write_f32(self.p2);
        w.write_f32(self.max_radius);
    }

    fn read(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            cx: r.read_f32()?,
            cy: r.read_f32()?,
            fx: r.read_f32()?,
            fy: r.read_f32()?,
            k1: r.read_f32()?,
            k2: r.read_f32()?,
            k3: r.read_f32()?,
            k4: r.read_f32()?,
            k5: r.read_f32()?,
            k6: r.read_f32()?,
            codx: r.read_f32()?,
            cody: r.read_f32()?,
            p1: r.read_f32()?,
            p2: r.read_f32()?,
            max_radius: r.read_f32()?,
        })
    }
}

/// Floor-plane equation `nx*x + ny*y + nz*z = d`, supplied by the Capture
/// collaborator when floor detection succeeded for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorPlane {
    pub nx: f32,
    pub ny: f32,
    pub nz: f32,
    pub d: f32,
}

/// The logical contents of one compressed RGB-D frame, before fragmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSenderMessage {
    pub frame_time_stamp: f32,
    pub keyframe: bool,
    pub width: i32,
    pub height: i32,
    pub intrinsics: CameraIntrinsics,
    pub color_bytes: Vec<u8>,
    pub depth_bytes: Vec<u8>,
    pub floor: Option<FloorPlane>,
}

impl VideoSenderMessage {
    /// Encodes this message to its flat little-endian byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(64 + self.color_bytes.len() + self.depth_bytes.len());
        w.write_f32(self.frame_time_stamp);
        w.write_bool(self.keyframe);
        w.write_i32(self.width);
        w.write_i32(self.height);
        self.intrinsics.write(&mut w);
        w.write_i32(self.color_bytes.len() as i32);
        w.write_bytes(&self.color_bytes);
        w.write_i32(self.depth_bytes.len() as i32);
        w.write_bytes(&self.depth_bytes);
        match self.floor {
            Some(plane) => {
                w.write_bool(true);
                w.write_f32(plane.nx);
                w.write_f32(plane.ny);
                w.write_f32(plane.nz);
                w.write_f32(plane.d);
            }
            None => w.write_bool(false),
        }
        w.into_vec()
    }

    /// Decodes a message previously produced by [`encode`](Self::encode).
    ///
    /// Reads exactly as many bytes as the layout calls for and stops; any
    /// trailing bytes (e.g. zero padding left over from FEC reconstruction
    /// of the last, shorter packet in a group) are never touched.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = ByteReader::new(bytes);
        let frame_time_stamp = r.read_f32()?;
        let keyframe = r.read_bool()?;
        let width = r.read_i32()?;
        let height = r.read_i32()?;
        let intrinsics = CameraIntrinsics::read(&mut r)?;

        let color_len = r.read_i32()?;
        let color_bytes = r.read_bytes(non_negative(color_len)?)?.to_vec();
        let depth_len = r.read_i32()?;
        let depth_bytes = r.read_bytes(non_negative(depth_len)?)?.to_vec();

        let floor = if r.read_bool()? {
            Some(FloorPlane {
                nx: r.read_f32()?,
                ny: r.read_f32()?,
                nz: r.read_f32()?,
                d: r.read_f32()?,
            })
        } else {
            None
        };

        Ok(Self {
            frame_time_stamp,
            keyframe,
            width,
            height,
            intrinsics,
            color_bytes,
            depth_bytes,
            floor,
        })
    }
}

fn non_negative(len: i32) -> Result<usize, ProtocolError> {
    usize::try_from(len).map_err(|_| ProtocolError::Malformed)
}

/// One fragment of a [`VideoSenderMessage`], as carried by a `Video` packet.
///
/// `payload` holds only real content bytes: the last packet in a group is
/// shorter than [`MAX_VIDEO_PACKET_CONTENT_SIZE`] rather than padded, so
/// that `reassemble(split(msg)) == msg` holds byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSenderPacket {
    pub frame_id: i32,
    pub packet_index: i32,
    pub packet_count: i32,
    pub payload: Vec<u8>,
}

impl VideoSenderPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(20 + self.payload.len());
        w.write_i32(owner_id);
        w.write_u8(crate::packet::SenderPacketKind::Video as u8);
        w.write_i32(self.frame_id);
        w.write_i32(self.packet_index);
        w.write_i32(self.packet_count);
        w.write_bytes(&[0u8; 3]); // alignment padding, see VIDEO_PACKET_HEADER_SIZE
        w.write_bytes(&self.payload);
        w.into_vec()
    }

    /// Parses the fields following the common 5-byte prefix and `kind` byte,
    /// which the caller (see `packet.rs`) has already consumed.
    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        let frame_id = r.read_i32()?;
        let packet_index = r.read_i32()?;
        let packet_count = r.read_i32()?;
        let _reserved = r.read_bytes(3)?;
        let payload = r.read_to_end().to_vec();
        Ok(Self {
            frame_id,
            packet_index,
            packet_count,
            payload,
        })
    }
}

/// Splits an encoded [`VideoSenderMessage`] byte stream into a video packet
/// group. Every packet but the last carries exactly
/// [`MAX_VIDEO_PACKET_CONTENT_SIZE`] bytes.
pub fn split(frame_id: i32, message: &[u8]) -> Result<Vec<VideoSenderPacket>, ProtocolError> {
    if message.is_empty() {
        return Ok(vec![VideoSenderPacket {
            frame_id,
            packet_index: 0,
            packet_count: 1,
            payload: Vec::new(),
        }]);
    }

    let packet_count = message.len().div_ceil(MAX_VIDEO_PACKET_CONTENT_SIZE);
    let packet_count_i32 =
        i32::try_from(packet_count).map_err(|_| ProtocolError::MessageTooLarge(message.len()))?;

    let packets = message
        .chunks(MAX_VIDEO_PACKET_CONTENT_SIZE)
        .enumerate()
        .map(|(i, chunk)| VideoSenderPacket {
            frame_id,
            packet_index: i as i32,
            packet_count: packet_count_i32,
            payload: chunk.to_vec(),
        })
        .collect();
    Ok(packets)
}

/// Reassembles a complete, in-order video packet group back into the
/// original encoded message bytes. `packets` need not already be sorted by
/// index, but every index in `0..packet_count` must be present exactly once.
pub fn reassemble(packets: &[VideoSenderPacket]) -> Result<Vec<u8>, ProtocolError> {
    let Some(first) = packets.first() else {
        return Ok(Vec::new());
    };
    let packet_count = first.packet_count;

    let mut ordered: Vec<Option<&VideoSenderPacket>> = vec![None; packet_count.max(0) as usize];
    for p in packets {
        if p.packet_count != packet_count {
            return Err(ProtocolError::Malformed);
        }
        let idx = usize::try_from(p.packet_index)
            .map_err(|_| ProtocolError::IndexOutOfRange { index: p.packet_index, count: packet_count })?;
        if idx >= ordered.len() {
            return Err(ProtocolError::IndexOutOfRange { index: p.packet_index, count: packet_count });
        }
        ordered[idx] = Some(p);
    }

    let mut out = Vec::new();
    for slot in ordered {
        let p = slot.ok_or(ProtocolError::Malformed)?;
        out.extend_from_slice(&p.payload);
    }
    Ok(out)
}

/// A parity packet covering `PARITY_GROUP_SIZE` consecutive video packets.
///
/// Unlike video packets, the payload is always the full
/// `MAX_VIDEO_PACKET_CONTENT_SIZE` bytes — XOR requires equal-length
/// operands, so shorter members of the group are zero-extended before
/// combining: every member is padded to the full packet size before XOR.
///
/// `final_packet_length` carries the true, pre-padding length of this
/// group's highest-indexed member when that member is also the frame's last
/// video packet (the only member that can legitimately be shorter than
/// `MAX_VIDEO_PACKET_CONTENT_SIZE`). It is `None` for every group that
/// doesn't reach the end of the frame, since every other member is always
/// exactly `MAX_VIDEO_PACKET_CONTENT_SIZE` long.
#[derive(Debug, Clone, PartialEq)]
pub struct ParitySenderPacket {
    pub frame_id: i32,
    pub packet_index: i32,
    pub video_packet_count: i32,
    pub final_packet_length: Option<u16>,
    pub payload: Vec<u8>,
}

impl ParitySenderPacket {
    pub fn to_bytes(&self, owner_id: i32) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(20 + self.payload.len());
        w.write_i32(owner_id);
        w.write_u8(crate::packet::SenderPacketKind::Parity as u8);
        w.write_i32(self.frame_id);
        w.write_i32(self.packet_index);
        w.write_i32(self.video_packet_count);
        match self.final_packet_length {
            Some(len) => {
                w.write_u8(1);
                w.write_u16(len);
            }
            None => {
                w.write_u8(0);
                w.write_u16(0);
            }
        }
        w.write_bytes(&self.payload);
        w.into_vec()
    }

    pub fn from_body(r: &mut ByteReader) -> Result<Self, ProtocolError> {
        let frame_id = r.read_i32()?;
        let packet_index = r.read_i32()?;
        let video_packet_count = r.read_i32()?;
        let has_final_length = r.read_u8()? != 0;
        let final_length = r.read_u16()?;
        let final_packet_length = has_final_length.then_some(final_length);
        let payload = r.read_bytes(MAX_VIDEO_PACKET_CONTENT_SIZE)?.to_vec();
        Ok(Self {
            frame_id,
            packet_index,
            video_packet_count,
            final_packet_length,
            payload,
        })
    }
}

fn zero_extended(payload: &[u8]) -> [u8; MAX_VIDEO_PACKET_CONTENT_SIZE] {
    let mut buf = [0u8; MAX_VIDEO_PACKET_CONTENT_SIZE];
    buf[..payload.len()].copy_from_slice(payload);
    buf
}

/// Builds one parity packet per group of `PARITY_GROUP_SIZE` consecutive
/// video packets in `video_packets` (which must be in index order and cover
/// the whole group, i.e. a freshly produced [`split`] result).
pub fn build_parity(frame_id: i32, video_packets: &[VideoSenderPacket]) -> Vec<ParitySenderPacket> {
    let video_packet_count = video_packets.len() as i32;
    video_packets
        .chunks(PARITY_GROUP_SIZE)
        .enumerate()
        .map(|(group_index, group)| {
            let mut xor = [0u8; MAX_VIDEO_PACKET_CONTENT_SIZE];
            for packet in group {
                let extended = zero_extended(&packet.payload);
                for (out, b) in xor.iter_mut().zip(extended.iter()) {
                    *out ^= b;
                }
            }
            let last_in_group = group.last().expect("chunks() never yields an empty group");
            let final_packet_length = (last_in_group.packet_index == video_packet_count - 1)
                .then(|| last_in_group.payload.len() as u16);

            ParitySenderPacket {
                frame_id,
                packet_index: group_index as i32,
                video_packet_count,
                final_packet_length,
                payload: xor.to_vec(),
            }
        })
        .collect()
}

/// Recovers a single missing video packet from its parity packet and the
/// other present members of its group.
///
/// `present` must contain every other video packet in the group (i.e.
/// `PARITY_GROUP_SIZE - 1` packets). If `missing_index` is the frame's last
/// packet, its payload is trimmed to `parity.final_packet_length` — the true
/// length the sender recorded when building this parity packet, rather than
/// guessed from the XOR result's trailing bytes. A trailing-zero-byte scan
/// can't tell a legitimately zero-valued tail byte (e.g. the `has_floor`
/// flag `VideoSenderMessage::encode` writes last) from zero padding, so the
/// true length has to travel on the wire instead of being inferred.
pub fn recover_video_packet(
    parity: &ParitySenderPacket,
    present: &[&VideoSenderPacket],
    missing_index: i32,
) -> VideoSenderPacket {
    let mut xor = parity.payload.clone();
    if xor.len() < MAX_VIDEO_PACKET_CONTENT_SIZE {
        xor.resize(MAX_VIDEO_PACKET_CONTENT_SIZE, 0);
    }
    for packet in present {
        let extended = zero_extended(&packet.payload);
        for (out, b) in xor.iter_mut().zip(extended.iter()) {
            *out ^= b;
        }
    }

    if missing_index == parity.video_packet_count - 1 {
        if let Some(len) = parity.final_packet_length {
            xor.truncate(len as usize);
        }
    }

    VideoSenderPacket {
        frame_id: parity.frame_id,
        packet_index: missing_index,
        packet_count: parity.video_packet_count,
        payload: xor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(color_len: usize, depth_len: usize) -> VideoSenderMessage {
        VideoSenderMessage {
            frame_time_stamp: 123.5,
            keyframe: true,
            width: 640,
            height: 576,
            intrinsics: CameraIntrinsics {
                cx: 1.0,
                cy: 2.0,
                fx: 3.0,
                fy: 4.0,
                k1: 5.0,
                k2: 6.0,
                k3: 7.0,
                k4: 8.0,
                k5: 9.0,
                k6: 10.0,
                codx: 11.0,
                cody: 12.0,
                p1: 13.0,
                p2: 14.0,
                max_radius: 15.0,
            },
            color_bytes: (0..color_len).map(|i| (i % 251) as u8).collect(),
            depth_bytes: (0..depth_len).map(|i| (i % 233) as u8).collect(),
            floor: Some(FloorPlane { nx: 0.0, ny: 1.0, nz: 0.0, d: -1.2 }),
        }
    }

    #[test]
    fn message_roundtrip() {
        let msg = sample_message(1000, 2000);
        let bytes = msg.encode();
        let decoded = VideoSenderMessage::decode(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn message_roundtrip_no_floor() {
        let mut msg = sample_message(10, 5);
        msg.floor = None;
        let bytes = msg.encode();
        let decoded = VideoSenderMessage::decode(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn split_reassemble_is_exact_for_arbitrary_bytes() {
        for len in [0usize, 1, 487, 488, 489, 488 * 3, 488 * 3 + 17, 10_000] {
            let bytes: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
            let packets = split(7, &bytes).unwrap();
            let expected_count = if len == 0 { 1 } else { len.div_ceil(MAX_VIDEO_PACKET_CONTENT_SIZE) };
            assert_eq!(packets.len(), expected_count);
            for p in &packets {
                assert_eq!(p.packet_count as usize, expected_count);
            }
            let back = reassemble(&packets).unwrap();
            assert_eq!(back, bytes, "round trip mismatch at len={len}");
        }
    }

    #[test]
    fn video_packet_wire_roundtrip() {
        let p = VideoSenderPacket {
            frame_id: 42,
            packet_index: 1,
            packet_count: 3,
            payload: vec![9, 8, 7, 6, 5],
        };
        let bytes = p.to_bytes(99);
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), 99);
        assert_eq!(r.read_u8().unwrap(), crate::packet::SenderPacketKind::Video as u8);
        let parsed = VideoSenderPacket::from_body(&mut r).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn parity_recovers_single_lost_packet_in_group() {
        let message = sample_message(900, 900).encode();
        let video_packets = split(3, &message).unwrap();
        let parity_packets = build_parity(3, &video_packets);

        // Group 0 covers video packets 0 and 1.
        let group: Vec<&VideoSenderPacket> = video_packets.iter().take(PARITY_GROUP_SIZE).collect();
        let lost = group[0];
        let present = vec![group[1]];
        let recovered = recover_video_packet(&parity_packets[0], &present, lost.packet_index);

        assert_eq!(recovered.frame_id, lost.frame_id);
        assert_eq!(recovered.packet_index, lost.packet_index);
        assert_eq!(&recovered.payload[..recovered.payload.len().min(lost.payload.len())],
            &lost.payload[..recovered.payload.len().min(lost.payload.len())]);
    }

    /// The frame's globally-last packet is usually shorter than
    /// `MAX_VIDEO_PACKET_CONTENT_SIZE`, and with `floor: None` its true final
    /// byte is the zero `has_floor` flag — exactly the case a trailing-zero
    /// scan would get wrong. The recovered packet must match byte-for-byte,
    /// not just on the overlapping prefix.
    #[test]
    fn parity_recovers_lost_final_packet_with_zero_tail_byte() {
        let mut message = sample_message(900, 900);
        message.floor = None;
        let encoded = message.encode();
        let video_packets = split(9, &encoded).unwrap();
        assert!(video_packets.len() > PARITY_GROUP_SIZE, "need more than one parity group");
        let parity_packets = build_parity(9, &video_packets);

        let last = video_packets.last().unwrap();
        assert_eq!(*last.payload.last().unwrap(), 0, "test assumes a genuinely zero final byte");

        let last_group_parity = parity_packets.last().unwrap();
        assert_eq!(last_group_parity.final_packet_length, Some(last.payload.len() as u16));

        let group_start = (last.packet_index as usize / PARITY_GROUP_SIZE) * PARITY_GROUP_SIZE;
        let present: Vec<&VideoSenderPacket> = video_packets[group_start..last.packet_index as usize]
            .iter()
            .collect();
        let recovered = recover_video_packet(last_group_parity, &present, last.packet_index);

        assert_eq!(recovered.payload, last.payload);
        assert_eq!(recovered.packet_index, last.packet_index);
        assert_eq!(recovered.frame_id, last.frame_id);
    }

    #[test]
    fn build_parity_group_count_matches_ceil_division() {
        let video_packets: Vec<VideoSenderPacket> = (0..5)
            .map(|i| VideoSenderPacket { frame_id: 1, packet_index: i, packet_count: 5, payload: vec![i as u8; 10] })
            .collect();
        let parity = build_parity(1, &video_packets);
        assert_eq!(parity.len(), 3); // ceil(5/2)
        assert_eq!(parity[2].video_packet_count, 5);
    }
}
