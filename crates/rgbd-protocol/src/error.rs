use thiserror::Error;

/// Errors raised while parsing or building wire packets.
///
/// Every variant here is non-fatal to the caller: a malformed packet is
/// dropped and logged, never propagated as a fatal condition (spec: "any
/// malformed inbound packet ... is dropped with a log; never fatal").
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("packet too short: expected at least {expected} bytes, got {got}")]
    PacketTooShort { expected: usize, got: usize },

    #[error("unknown packet kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("packet_index {index} out of range for packet_count {count}")]
    IndexOutOfRange { index: i32, count: i32 },

    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("malformed packet contents")]
    Malformed,
}
