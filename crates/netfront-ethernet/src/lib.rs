//! Ethernet II header helpers used by the netfront link endpoint.
//!
//! Everything here works in place over caller-provided bytes: the link endpoint prepends a header
//! into a reserved region on transmit and overlays one on a copied receive view, so nothing in this
//! crate allocates.
#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

/// Size of an untagged Ethernet II header (destination, source, ethertype).
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Length of a hardware (MAC) address in bytes.
pub const MAC_ADDR_LEN: usize = 6;

const DST_RANGE: core::ops::Range<usize> = 0..6;
const SRC_RANGE: core::ops::Range<usize> = 6..12;
const TYPE_OFFSET: usize = 12;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; MAC_ADDR_LEN]);

impl MacAddr {
    pub const BROADCAST: Self = Self([0xff; MAC_ADDR_LEN]);

    /// Build an address from a slice of exactly [`MAC_ADDR_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; MAC_ADDR_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; MAC_ADDR_LEN] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit (I/G) of the first octet.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<[u8; MAC_ADDR_LEN]> for MacAddr {
    fn from(bytes: [u8; MAC_ADDR_LEN]) -> Self {
        Self(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacAddrParseError {
    #[error("expected {expected} colon-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {index} ({field:?}) is not a one or two digit hex octet")]
    InvalidField { index: usize, field: String },
}

impl FromStr for MacAddr {
    type Err = MacAddrParseError;

    /// Parse `xx:xx:xx:xx:xx:xx`. Each field is one or two hex digits; case is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let found = s.split(':').count();
        if found != MAC_ADDR_LEN {
            return Err(MacAddrParseError::FieldCount {
                expected: MAC_ADDR_LEN,
                found,
            });
        }

        let mut out = [0u8; MAC_ADDR_LEN];
        for (index, field) in s.split(':').enumerate() {
            let valid = (1..=2).contains(&field.len())
                && field.bytes().all(|b| b.is_ascii_hexdigit());
            // `from_str_radix` alone would accept a leading `+`.
            let octet = valid
                .then(|| u8::from_str_radix(field, 16).ok())
                .flatten()
                .ok_or_else(|| MacAddrParseError::InvalidField {
                    index,
                    field: field.to_owned(),
                })?;
            out[index] = octet;
        }
        Ok(Self(out))
    }
}

pub struct EtherType;

impl EtherType {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const IPV6: u16 = 0x86dd;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer of {len} bytes is too short for a 14 byte ethernet header")]
pub struct HeaderTooShort {
    pub len: usize,
}

/// Field accessors over the first [`ETHERNET_HEADER_LEN`] bytes of `T`.
///
/// The view does not own or copy the bytes. Accessors index directly into the buffer; building a
/// view with [`EthernetHeader::new_unchecked`] over fewer than 14 bytes makes them panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader<T> {
    buf: T,
}

impl<T: AsRef<[u8]>> EthernetHeader<T> {
    /// Overlay a header without checking the length. The caller guarantees sizing.
    pub fn new_unchecked(buf: T) -> Self {
        Self { buf }
    }

    pub fn new_checked(buf: T) -> Result<Self, HeaderTooShort> {
        let len = buf.as_ref().len();
        if len < ETHERNET_HEADER_LEN {
            return Err(HeaderTooShort { len });
        }
        Ok(Self { buf })
    }

    pub fn destination(&self) -> &[u8] {
        &self.buf.as_ref()[DST_RANGE]
    }

    pub fn source(&self) -> &[u8] {
        &self.buf.as_ref()[SRC_RANGE]
    }

    pub fn ethertype(&self) -> u16 {
        let b = self.buf.as_ref();
        u16::from_be_bytes([b[TYPE_OFFSET], b[TYPE_OFFSET + 1]])
    }

    pub fn dst_addr(&self) -> MacAddr {
        let mut out = [0u8; MAC_ADDR_LEN];
        out.copy_from_slice(self.destination());
        MacAddr(out)
    }

    pub fn src_addr(&self) -> MacAddr {
        let mut out = [0u8; MAC_ADDR_LEN];
        out.copy_from_slice(self.source());
        MacAddr(out)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> EthernetHeader<T> {
    pub fn destination_mut(&mut self) -> &mut [u8] {
        &mut self.buf.as_mut()[DST_RANGE]
    }

    pub fn source_mut(&mut self) -> &mut [u8] {
        &mut self.buf.as_mut()[SRC_RANGE]
    }

    pub fn set_destination(&mut self, addr: MacAddr) {
        self.destination_mut().copy_from_slice(&addr.0);
    }

    pub fn set_source(&mut self, addr: MacAddr) {
        self.source_mut().copy_from_slice(&addr.0);
    }

    pub fn set_ethertype(&mut self, ethertype: u16) {
        self.buf.as_mut()[TYPE_OFFSET..TYPE_OFFSET + 2].copy_from_slice(&ethertype.to_be_bytes());
    }
}
