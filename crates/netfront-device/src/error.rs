use thiserror::Error;

use crate::BufferId;

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Faults raised by a netfront device.
///
/// The link endpoint does not recover from any of these; they end the current transmit call or
/// the RX worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("transmit buffer pool exhausted")]
    TxPoolExhausted,

    #[error("unknown buffer id {0}")]
    UnknownBuffer(BufferId),

    #[error("buffer {0} is not held by the device")]
    BufferInFlight(BufferId),

    #[error("buffer {0} was returned twice")]
    DuplicateReturn(BufferId),

    #[error("length {len} out of range for a {page_size} byte page")]
    LengthOutOfRange { len: usize, page_size: usize },

    #[error("{0} ring is full")]
    RingFull(&'static str),

    #[error("invalid device configuration: {0}")]
    InvalidConfig(&'static str),
}
