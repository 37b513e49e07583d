use std::net::SocketAddr;
use thiserror::Error;

/// Error kinds raised by the transport core.
///
/// Nothing here is fatal to the process: transient errors are absorbed and
/// logged by the caller, endpoint-scoped errors evict that one endpoint, and
/// only a failure to open a socket at startup should ever bubble up as a
/// process-ending error (and that's represented as a plain `std::io::Error`
/// at the binary boundary, not as a `TransportError` variant).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed packet from {from:?}: {source}")]
    Malformed {
        from: Option<SocketAddr>,
        #[source]
        source: rgbd_protocol::ProtocolError,
    },

    #[error("stale report for frame {frame_id} (already past {last_reported})")]
    StaleReport { frame_id: i32, last_reported: i32 },

    #[error("audio ring buffer overflow, dropped {dropped} bytes")]
    Overflow { dropped: usize },

    #[error("audio ring buffer underflow, emitted {silence} bytes of silence")]
    Underflow { silence: usize },

    #[error("endpoint {endpoint} unreachable: {source}")]
    EndpointUnreachable {
        endpoint: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("capture did not return a frame within the deadline")]
    CaptureTimeout,

    #[error("peer {endpoint:?} timed out")]
    PeerTimedOut { endpoint: SocketAddr },
}
