//! Device-side contract for a paravirtualized network front end.
//!
//! A netfront device shares pages with a back end (host/hypervisor) through two rings: the TX ring
//! carries frames the front end wants sent, the RX ring carries empty pages posted for the back end
//! to fill. Both sides prod each other through an event channel.
//!
//! The link endpoint in `netfront-link` only talks to the [`NetDevice`] and [`EventChannel`]
//! traits. [`mem::MemDevice`] is an in-process implementation with a simulated back end.
#![forbid(unsafe_code)]

use std::sync::Arc;

pub mod error;
pub mod event;
pub mod mem;
pub mod ring;

pub use error::{DeviceError, Result};
pub use event::CondvarEventChannel;
pub use mem::{MemDevice, MemDeviceConfig};

/// Size of a shared device page.
pub const PAGE_SIZE: usize = 4096;

/// RX status values at or below this carry no payload.
pub const NETIF_RSP_NULL: i16 = 1;

/// TX response status for a successfully transmitted request.
pub const NETIF_RSP_OKAY: i16 = 0;

/// TX response status reported by a back end that failed to transmit.
pub const NETIF_RSP_ERROR: i16 = -1;

pub type BufferId = u16;

/// A shared page owned by whichever side currently holds it.
///
/// `Buffer` is deliberately not `Clone`: acquiring, handing off and returning a page are moves.
#[derive(Debug, PartialEq, Eq)]
pub struct Buffer {
    id: BufferId,
    page: Box<[u8]>,
}

impl Buffer {
    pub fn new(id: BufferId) -> Self {
        Self {
            id,
            page: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn page(&self) -> &[u8] {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut [u8] {
        &mut self.page
    }
}

bitflags::bitflags! {
    /// Per-response flags set by the back end on RX completions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RxFlags: u16 {
        const DATA_VALIDATED = 1 << 0;
        const CSUM_BLANK = 1 << 1;
        const MORE_DATA = 1 << 2;
        const EXTRA_INFO = 1 << 3;
    }
}

/// Completion for a posted RX page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxResponse {
    pub id: BufferId,
    /// Offset of the frame within the page.
    pub offset: u16,
    pub flags: RxFlags,
    /// Frame length in bytes when greater than [`NETIF_RSP_NULL`].
    pub status: i16,
}

/// RX page posted to the back end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxRequest {
    pub id: BufferId,
}

/// TX request describing a filled page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRequest {
    pub id: BufferId,
    pub offset: u16,
    pub size: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxResponse {
    pub id: BufferId,
    pub status: i16,
}

/// Bidirectional doorbell between front end and back end.
pub trait EventChannel: Send + Sync {
    /// Block until the channel has been signalled since the last wakeup.
    fn wait(&self);

    /// Signal the other side.
    fn notify(&self);
}

/// Operations the link endpoint needs from a netfront device.
///
/// Implementations are shared between the caller's thread (transmit) and the RX worker, so all
/// methods take `&self`; internal synchronization is the implementation's business.
pub trait NetDevice: Send + Sync {
    /// Locally configured hardware address, as `xx:xx:xx:xx:xx:xx`.
    fn mac_addr(&self) -> &str;

    fn event_channel(&self) -> &dyn EventChannel;

    /// Take a free page from the TX pool.
    fn get_tx_buffer(&self) -> Result<Buffer>;

    /// Queue a filled TX page holding `len` bytes from offset 0.
    fn send_tx_buffer(&self, buf: Buffer, len: usize) -> Result<()>;

    /// Publish queued TX requests. Returns `true` if the back end must be notified.
    fn push_tx_requests(&self) -> bool;

    /// Whether unconsumed RX responses are pending.
    fn check_for_rx_responses(&self) -> bool;

    fn next_rx_response(&self) -> Option<RxResponse>;

    /// Take the RX page named by a response.
    fn lookup_rx_buffer(&self, id: BufferId) -> Result<Buffer>;

    /// Give an RX page back and queue a fresh request for its slot.
    fn send_rx_buffer(&self, buf: Buffer) -> Result<()>;

    /// Publish queued RX requests. Returns `true` if the back end must be notified.
    fn push_rx_requests(&self) -> bool;
}

impl<T: NetDevice + ?Sized> NetDevice for Arc<T> {
    fn mac_addr(&self) -> &str {
        <T as NetDevice>::mac_addr(&**self)
    }

    fn event_channel(&self) -> &dyn EventChannel {
        <T as NetDevice>::event_channel(&**self)
    }

    fn get_tx_buffer(&self) -> Result<Buffer> {
        <T as NetDevice>::get_tx_buffer(&**self)
    }

    fn send_tx_buffer(&self, buf: Buffer, len: usize) -> Result<()> {
        <T as NetDevice>::send_tx_buffer(&**self, buf, len)
    }

    fn push_tx_requests(&self) -> bool {
        <T as NetDevice>::push_tx_requests(&**self)
    }

    fn check_for_rx_responses(&self) -> bool {
        <T as NetDevice>::check_for_rx_responses(&**self)
    }

    fn next_rx_response(&self) -> Option<RxResponse> {
        <T as NetDevice>::next_rx_response(&**self)
    }

    fn lookup_rx_buffer(&self, id: BufferId) -> Result<Buffer> {
        <T as NetDevice>::lookup_rx_buffer(&**self, id)
    }

    fn send_rx_buffer(&self, buf: Buffer) -> Result<()> {
        <T as NetDevice>::send_rx_buffer(&**self, buf)
    }

    fn push_rx_requests(&self) -> bool {
        <T as NetDevice>::push_rx_requests(&**self)
    }
}

impl<T: NetDevice + ?Sized> NetDevice for Box<T> {
    fn mac_addr(&self) -> &str {
        <T as NetDevice>::mac_addr(&**self)
    }

    fn event_channel(&self) -> &dyn EventChannel {
        <T as NetDevice>::event_channel(&**self)
    }

    fn get_tx_buffer(&self) -> Result<Buffer> {
        <T as NetDevice>::get_tx_buffer(&**self)
    }

    fn send_tx_buffer(&self, buf: Buffer, len: usize) -> Result<()> {
        <T as NetDevice>::send_tx_buffer(&**self, buf, len)
    }

    fn push_tx_requests(&self) -> bool {
        <T as NetDevice>::push_tx_requests(&**self)
    }

    fn check_for_rx_responses(&self) -> bool {
        <T as NetDevice>::check_for_rx_responses(&**self)
    }

    fn next_rx_response(&self) -> Option<RxResponse> {
        <T as NetDevice>::next_rx_response(&**self)
    }

    fn lookup_rx_buffer(&self, id: BufferId) -> Result<Buffer> {
        <T as NetDevice>::lookup_rx_buffer(&**self, id)
    }

    fn send_rx_buffer(&self, buf: Buffer) -> Result<()> {
        <T as NetDevice>::send_rx_buffer(&**self, buf)
    }

    fn push_rx_requests(&self) -> bool {
        <T as NetDevice>::push_rx_requests(&**self)
    }
}
