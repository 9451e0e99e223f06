use netfront_device::PAGE_SIZE;
use netfront_ethernet::ETHERNET_HEADER_LEN;

use crate::error::{LinkError, Result};

pub const DEFAULT_MTU: u32 = 1500;
pub const DEFAULT_RX_THREAD_NAME: &str = "netfront-rx";

/// Smallest MTU an IPv4 host must support.
pub const MIN_MTU: u32 = 68;
/// A full frame must fit one device page.
pub const MAX_MTU: u32 = (PAGE_SIZE - ETHERNET_HEADER_LEN) as u32;

pub const ENV_MTU: &str = "NETFRONT_MTU";
pub const ENV_RX_THREAD_NAME: &str = "NETFRONT_RX_THREAD_NAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub mtu: u32,
    /// Name given to the RX worker thread.
    pub rx_thread_name: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            rx_thread_name: DEFAULT_RX_THREAD_NAME.to_owned(),
        }
    }
}

impl LinkConfig {
    /// Defaults overridden by `NETFRONT_MTU` / `NETFRONT_RX_THREAD_NAME`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MTU) {
            config.mtu = raw.trim().parse().map_err(|err| {
                LinkError::InvalidConfig(format!("{ENV_MTU}={raw:?}: {err}"))
            })?;
        }
        if let Some(name) = lookup(ENV_RX_THREAD_NAME) {
            config.rx_thread_name = name;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_MTU..=MAX_MTU).contains(&self.mtu) {
            return Err(LinkError::InvalidConfig(format!(
                "mtu {} outside {MIN_MTU}..={MAX_MTU}",
                self.mtu
            )));
        }
        if self.rx_thread_name.is_empty() || self.rx_thread_name.contains('\0') {
            return Err(LinkError::InvalidConfig(
                "rx thread name must be non-empty and free of NUL bytes".to_owned(),
            ));
        }
        Ok(())
    }
}
