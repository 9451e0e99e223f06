//! In-process netfront device with a simulated back end.
//!
//! Front-end methods come from [`NetDevice`]. The `backend_*` methods play the host side: they
//! consume published TX requests, fill posted RX pages and raise the event channel, following the
//! same ring protocol a hypervisor back end would.

use std::sync::{Mutex, MutexGuard};

use crate::error::{DeviceError, Result};
use crate::event::CondvarEventChannel;
use crate::ring::SharedRing;
use crate::{
    Buffer, BufferId, EventChannel, NetDevice, RxFlags, RxRequest, RxResponse, TxRequest,
    TxResponse, NETIF_RSP_OKAY, PAGE_SIZE,
};

pub const DEFAULT_TX_BUFFERS: usize = 32;
pub const DEFAULT_RX_BUFFERS: usize = 32;
pub const DEFAULT_RING_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemDeviceConfig {
    pub tx_buffers: usize,
    pub rx_buffers: usize,
    /// Size of each ring; must be a power of two and cover the buffer counts.
    pub ring_size: u32,
    /// Page offset at which the simulated back end writes received frames.
    pub rx_offset: u16,
}

impl Default for MemDeviceConfig {
    fn default() -> Self {
        Self {
            tx_buffers: DEFAULT_TX_BUFFERS,
            rx_buffers: DEFAULT_RX_BUFFERS,
            ring_size: DEFAULT_RING_SIZE,
            rx_offset: 0,
        }
    }
}

impl MemDeviceConfig {
    fn validate(&self) -> Result<()> {
        if self.tx_buffers == 0 || self.rx_buffers == 0 {
            return Err(DeviceError::InvalidConfig("buffer pools must not be empty"));
        }
        if self.tx_buffers > self.ring_size as usize || self.rx_buffers > self.ring_size as usize
        {
            return Err(DeviceError::InvalidConfig(
                "ring size must cover the buffer pool",
            ));
        }
        if self.rx_offset as usize >= PAGE_SIZE {
            return Err(DeviceError::InvalidConfig("rx offset must lie inside the page"));
        }
        Ok(())
    }
}

struct TxState {
    ring: SharedRing<TxRequest, TxResponse>,
    free: Vec<Buffer>,
    /// Pages handed to the back end, indexed by buffer id.
    in_flight: Vec<Option<Buffer>>,
    /// Back-end failures reported through TX responses.
    errors: u64,
}

impl TxState {
    /// Recycle pages whose TX responses have come back.
    fn reap(&mut self) {
        while let Some(rsp) = self.ring.take_response() {
            if rsp.status != NETIF_RSP_OKAY {
                self.errors += 1;
                tracing::debug!(id = rsp.id, status = rsp.status, "tx request failed");
            }
            if let Some(buf) = self
                .in_flight
                .get_mut(rsp.id as usize)
                .and_then(Option::take)
            {
                self.free.push(buf);
            }
        }
    }
}

struct RxState {
    ring: SharedRing<RxRequest, RxResponse>,
    /// Arena of RX pages. `None` while the front end holds the page.
    pages: Vec<Option<Buffer>>,
}

/// In-memory device. Share it as `Arc<MemDevice>` between the link endpoint and test/back-end code.
pub struct MemDevice {
    mac: String,
    config: MemDeviceConfig,
    events: CondvarEventChannel,
    tx: Mutex<TxState>,
    rx: Mutex<RxState>,
}

impl MemDevice {
    pub fn new(mac: impl Into<String>) -> Result<Self> {
        Self::with_config(mac, MemDeviceConfig::default())
    }

    /// Build the device and post every RX page to the back end, as a front end does on connect.
    pub fn with_config(mac: impl Into<String>, config: MemDeviceConfig) -> Result<Self> {
        config.validate()?;
        let tx_count = u16::try_from(config.tx_buffers)
            .map_err(|_| DeviceError::InvalidConfig("too many tx buffers"))?;
        let rx_count = u16::try_from(config.rx_buffers)
            .map_err(|_| DeviceError::InvalidConfig("too many rx buffers"))?;

        let tx = TxState {
            ring: SharedRing::new("tx", config.ring_size)?,
            // Popped from the back, so reverse to hand out id 0 first.
            free: (0..tx_count).rev().map(Buffer::new).collect(),
            in_flight: (0..tx_count).map(|_| None).collect(),
            errors: 0,
        };

        let mut rx = RxState {
            ring: SharedRing::new("rx", config.ring_size)?,
            pages: (0..rx_count).map(|id| Some(Buffer::new(id))).collect(),
        };
        for id in 0..rx_count {
            rx.ring.push_request(RxRequest { id })?;
        }
        rx.ring.push_requests_and_check_notify();

        Ok(Self {
            mac: mac.into(),
            config,
            events: CondvarEventChannel::new(),
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
        })
    }

    pub fn config(&self) -> &MemDeviceConfig {
        &self.config
    }

    pub fn events(&self) -> &CondvarEventChannel {
        &self.events
    }

    fn tx(&self) -> MutexGuard<'_, TxState> {
        self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rx(&self) -> MutexGuard<'_, RxState> {
        self.rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Free TX pages, not counting completions the front end has yet to reap.
    pub fn tx_free(&self) -> usize {
        self.tx().free.len()
    }

    pub fn tx_errors(&self) -> u64 {
        self.tx().errors
    }

    /// RX pages currently held by the device (posted or awaiting front-end pickup).
    pub fn rx_held(&self) -> usize {
        self.rx().pages.iter().filter(|p| p.is_some()).count()
    }

    /// Back end: transmit every published TX request and complete it.
    ///
    /// Returns the frames in request order. Raises the event channel if the front end asked for a
    /// TX completion signal.
    pub fn backend_transmit(&self) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let notify = {
            let mut tx = self.tx();
            while let Some(req) = tx.ring.take_request() {
                let status = match tx.in_flight.get(req.id as usize).and_then(Option::as_ref) {
                    Some(buf) => {
                        let start = req.offset as usize;
                        let end = start + req.size as usize;
                        frames.push(buf.page()[start..end].to_vec());
                        NETIF_RSP_OKAY
                    }
                    None => crate::NETIF_RSP_ERROR,
                };
                // Every consumed request has a response slot.
                let _ = tx.ring.push_response(TxResponse { id: req.id, status });
            }
            tx.ring.final_check_for_requests();
            tx.ring.push_responses_and_check_notify()
        };
        if notify {
            self.events.raise();
        }
        frames
    }

    /// Back end: deliver `frame` into the next posted RX page at the configured offset.
    ///
    /// Returns `Ok(None)` when no page is posted (the frame is dropped, as a real back end would).
    pub fn backend_receive(&self, frame: &[u8]) -> Result<Option<BufferId>> {
        let status = i16::try_from(frame.len()).map_err(|_| DeviceError::LengthOutOfRange {
            len: frame.len(),
            page_size: PAGE_SIZE,
        })?;
        self.backend_complete_rx(self.config.rx_offset, status, RxFlags::empty(), frame)
    }

    /// Back end: complete the next posted RX request with explicit response fields.
    ///
    /// `data` is written at `offset` in the page regardless of `status`, which lets callers build
    /// null or inconsistent completions.
    pub fn backend_complete_rx(
        &self,
        offset: u16,
        status: i16,
        flags: RxFlags,
        data: &[u8],
    ) -> Result<Option<BufferId>> {
        let start = offset as usize;
        let end = start + data.len();
        if end > PAGE_SIZE {
            return Err(DeviceError::LengthOutOfRange {
                len: end,
                page_size: PAGE_SIZE,
            });
        }

        let (id, notify) = {
            let mut rx = self.rx();
            let Some(req) = rx.ring.take_request() else {
                rx.ring.final_check_for_requests();
                tracing::trace!("no rx page posted; dropping frame");
                return Ok(None);
            };
            let page = rx
                .pages
                .get_mut(req.id as usize)
                .and_then(Option::as_mut)
                .ok_or(DeviceError::BufferInFlight(req.id))?;
            page.page_mut()[start..end].copy_from_slice(data);
            rx.ring.push_response(RxResponse {
                id: req.id,
                offset,
                flags,
                status,
            })?;
            (req.id, rx.ring.push_responses_and_check_notify())
        };
        if notify {
            self.events.raise();
        }
        Ok(Some(id))
    }
}

impl NetDevice for MemDevice {
    fn mac_addr(&self) -> &str {
        &self.mac
    }

    fn event_channel(&self) -> &dyn EventChannel {
        &self.events
    }

    fn get_tx_buffer(&self) -> Result<Buffer> {
        let mut tx = self.tx();
        tx.reap();
        tx.free.pop().ok_or(DeviceError::TxPoolExhausted)
    }

    fn send_tx_buffer(&self, buf: Buffer, len: usize) -> Result<()> {
        let id = buf.id();
        let mut guard = self.tx();
        let tx = &mut *guard;
        // Buffers this pool never issued, or copies of an id it still tracks, are dropped here.
        let slot = tx
            .in_flight
            .get_mut(id as usize)
            .ok_or(DeviceError::UnknownBuffer(id))?;
        if slot.is_some() || tx.free.iter().any(|b| b.id() == id) {
            return Err(DeviceError::DuplicateReturn(id));
        }
        let Some(size) = u16::try_from(len).ok().filter(|_| len <= PAGE_SIZE) else {
            tx.free.push(buf);
            return Err(DeviceError::LengthOutOfRange {
                len,
                page_size: PAGE_SIZE,
            });
        };
        if let Err(err) = tx.ring.push_request(TxRequest {
            id,
            offset: 0,
            size,
        }) {
            tx.free.push(buf);
            return Err(err);
        }
        *slot = Some(buf);
        Ok(())
    }

    fn push_tx_requests(&self) -> bool {
        self.tx().ring.push_requests_and_check_notify()
    }

    fn check_for_rx_responses(&self) -> bool {
        self.rx().ring.final_check_for_responses()
    }

    fn next_rx_response(&self) -> Option<RxResponse> {
        self.rx().ring.take_response()
    }

    fn lookup_rx_buffer(&self, id: BufferId) -> Result<Buffer> {
        let mut rx = self.rx();
        let slot = rx
            .pages
            .get_mut(id as usize)
            .ok_or(DeviceError::UnknownBuffer(id))?;
        slot.take().ok_or(DeviceError::BufferInFlight(id))
    }

    fn send_rx_buffer(&self, buf: Buffer) -> Result<()> {
        let id = buf.id();
        let mut rx = self.rx();
        let slot = rx
            .pages
            .get_mut(id as usize)
            .ok_or(DeviceError::UnknownBuffer(id))?;
        if slot.is_some() {
            return Err(DeviceError::DuplicateReturn(id));
        }
        *slot = Some(buf);
        rx.ring.push_request(RxRequest { id })
    }

    fn push_rx_requests(&self) -> bool {
        self.rx().ring.push_requests_and_check_notify()
    }
}
