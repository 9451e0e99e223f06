use netfront_device::DeviceError;
use netfront_ethernet::MacAddrParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid link address {input:?}")]
    InvalidLinkAddress {
        input: String,
        #[source]
        source: MacAddrParseError,
    },

    #[error("header region has {available} bytes free, need {needed}")]
    HeaderSpace { needed: usize, available: usize },

    #[error("packet of {len} bytes exceeds the link mtu of {mtu}")]
    PacketTooLarge { len: usize, mtu: usize },

    #[error("a dispatcher is already attached")]
    AlreadyAttached,

    #[error("failed to spawn rx worker")]
    SpawnRxWorker(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
