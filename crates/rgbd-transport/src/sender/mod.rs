//! Sender-side session state: receiver registry, packet storage for
//! retransmission, and adaptive bitrate/keyframe control.

pub mod bitrate;
pub mod registry;
pub mod retransmit;
pub mod router;
pub mod storage;
