//! Wire format for the RGB-D + stereo audio streaming transport.
//!
//! This crate owns packet framing only: byte-exact (de)serialization of
//! every packet kind, video message fragmentation/reassembly, and XOR-parity
//! FEC group construction/recovery. It has no knowledge of sockets, session
//! state, or timing — see `rgbd-transport` for that.

pub mod audio;
pub mod constants;
pub mod control;
pub mod error;
pub mod packet;
pub mod video;
pub mod wire;

pub use error::ProtocolError;
pub use packet::{ReceiverPacket, ReceiverPacketKind, SenderPacket, SenderPacketKind};
