//! Packet kind tags and the envelope types that dispatch on them.
//!
//! Every datagram starts with the same 5-byte prefix: `owner_id: i32` (LE)
//! followed by a one-byte `kind`. `owner_id` identifies the sender of the
//! packet — the sender's own id on packets it emits, the receiver's id on
//! packets a receiver emits — so a socket shared by multiple peers can route
//! without a separate address table lookup.

use crate::audio::AudioSenderPacket;
use crate::control::{ConfirmPacket, ConnectPacket, HeartbeatPacket, ReportPacket, RequestPacket};
use crate::error::ProtocolError;
use crate::video::{ParitySenderPacket, VideoSenderPacket};
use crate::wire::ByteReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SenderPacketKind {
    Confirm = 0,
    Heartbeat = 1,
    Video = 2,
    Parity = 3,
    Audio = 4,
}

impl SenderPacketKind {
    fn from_u8(v: u8) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(Self::Confirm),
            1 => Ok(Self::Heartbeat),
            2 => Ok(Self::Video),
            3 => Ok(Self::Parity),
            4 => Ok(Self::Audio),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReceiverPacketKind {
    Connect = 0,
    Heartbeat = 1,
    Report = 2,
    Request = 3,
}

impl ReceiverPacketKind {
    fn from_u8(v: u8) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(Self::Connect),
            1 => Ok(Self::Heartbeat),
            2 => Ok(Self::Report),
            3 => Ok(Self::Request),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

/// A packet emitted by the sender, with its `owner_id` (the sender's id)
/// and kind-specific body already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum SenderPacket {
    Confirm { owner_id: i32, body: ConfirmPacket },
    Heartbeat { owner_id: i32 },
    Video { owner_id: i32, body: VideoSenderPacket },
    Parity { owner_id: i32, body: ParitySenderPacket },
    Audio { owner_id: i32, body: AudioSenderPacket },
}

impl SenderPacket {
    pub fn owner_id(&self) -> i32 {
        match self {
            Self::Confirm { owner_id, .. }
            | Self::Heartbeat { owner_id }
            | Self::Video { owner_id, .. }
            | Self::Parity { owner_id, .. }
            | Self::Audio { owner_id, .. } => *owner_id,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Confirm { owner_id, body } => body.to_bytes(*owner_id),
            Self::Heartbeat { owner_id } => HeartbeatPacket.to_bytes(*owner_id, SenderPacketKind::Heartbeat as u8),
            Self::Video { owner_id, body } => body.to_bytes(*owner_id),
            Self::Parity { owner_id, body } => body.to_bytes(*owner_id),
            Self::Audio { owner_id, body } => body.to_bytes(*owner_id),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = ByteReader::new(bytes);
        let owner_id = r.read_i32()?;
        let kind = SenderPacketKind::from_u8(r.read_u8()?)?;
        Ok(match kind {
            SenderPacketKind::Confirm => Self::Confirm { owner_id, body: ConfirmPacket::from_body(&mut r)? },
            SenderPacketKind::Heartbeat => Self::Heartbeat { owner_id },
            SenderPacketKind::Video => Self::Video { owner_id, body: VideoSenderPacket::from_body(&mut r)? },
            SenderPacketKind::Parity => Self::Parity { owner_id, body: ParitySenderPacket::from_body(&mut r)? },
            SenderPacketKind::Audio => Self::Audio { owner_id, body: AudioSenderPacket::from_body(&mut r)? },
        })
    }
}

/// A packet emitted by a receiver, with its `owner_id` (the receiver's id)
/// and kind-specific body already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverPacket {
    Connect { owner_id: i32, body: ConnectPacket },
    Heartbeat { owner_id: i32 },
    Report { owner_id: i32, body: ReportPacket },
    Request { owner_id: i32, body: RequestPacket },
}

impl ReceiverPacket {
    pub fn owner_id(&self) -> i32 {
        match self {
            Self::Connect { owner_id, .. }
            | Self::Heartbeat { owner_id }
            | Self::Report { owner_id, .. }
            | Self::Request { owner_id, .. } => *owner_id,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Connect { owner_id, body } => body.to_bytes(*owner_id),
            Self::Heartbeat { owner_id } => HeartbeatPacket.to_bytes(*owner_id, ReceiverPacketKind::Heartbeat as u8),
            Self::Report { owner_id, body } => body.to_bytes(*owner_id),
            Self::Request { owner_id, body } => body.to_bytes(*owner_id),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = ByteReader::new(bytes);
        let owner_id = r.read_i32()?;
        let kind = ReceiverPacketKind::from_u8(r.read_u8()?)?;
        Ok(match kind {
            ReceiverPacketKind::Connect => Self::Connect { owner_id, body: ConnectPacket::from_body(&mut r)? },
            ReceiverPacketKind::Heartbeat => Self::Heartbeat { owner_id },
            ReceiverPacketKind::Report => Self::Report { owner_id, body: ReportPacket::from_body(&mut r)? },
            ReceiverPacketKind::Request => Self::Request { owner_id, body: RequestPacket::from_body(&mut r)? },
        })
    }
}
