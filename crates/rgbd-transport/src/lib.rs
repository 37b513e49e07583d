//! Session and transport-core state machinery for the RGB-D + stereo audio
//! streaming protocol: socket setup, the sender's receiver registry and
//! packet storage/retransmission, the sender's adaptive bitrate/keyframe
//! controller, and the receiver's FEC reassembly, request planner and
//! render dispatcher.
//!
//! Wire (de)serialization lives one layer down, in `rgbd-protocol`. This
//! crate owns the stateful pieces built on top of it.

pub mod collaborators;
pub mod error;
pub mod receiver;
pub mod sender;
pub mod socket;

pub use error::TransportError;
