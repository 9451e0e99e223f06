use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatsSnapshot {
    pub tx_frames: u64,
    pub tx_bytes: u64,
    /// Packets dropped because the route had no remote link address.
    pub tx_dropped_unresolved: u64,
    pub rx_delivered: u64,
    pub rx_bytes: u64,
    /// Completions at or below the null status.
    pub rx_null: u64,
    /// Completions that overran the page or were shorter than an ethernet header.
    pub rx_malformed: u64,
    pub tx_notifications: u64,
    pub rx_notifications: u64,
}

#[derive(Debug, Default)]
pub struct LinkStats {
    tx_frames: AtomicU64,
    tx_bytes: AtomicU64,
    tx_dropped_unresolved: AtomicU64,
    rx_delivered: AtomicU64,
    rx_bytes: AtomicU64,
    rx_null: AtomicU64,
    rx_malformed: AtomicU64,
    tx_notifications: AtomicU64,
    rx_notifications: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl LinkStats {
    pub(crate) fn tx_frame(&self, len: usize) {
        bump(&self.tx_frames, 1);
        bump(&self.tx_bytes, len as u64);
    }

    pub(crate) fn tx_dropped_unresolved(&self) {
        bump(&self.tx_dropped_unresolved, 1);
    }

    pub(crate) fn rx_delivered(&self, len: usize) {
        bump(&self.rx_delivered, 1);
        bump(&self.rx_bytes, len as u64);
    }

    pub(crate) fn rx_null(&self) {
        bump(&self.rx_null, 1);
    }

    pub(crate) fn rx_malformed(&self) {
        bump(&self.rx_malformed, 1);
    }

    pub(crate) fn tx_notification(&self) {
        bump(&self.tx_notifications, 1);
    }

    pub(crate) fn rx_notification(&self) {
        bump(&self.rx_notifications, 1);
    }

    pub fn snapshot(&self) -> LinkStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LinkStatsSnapshot {
            tx_frames: load(&self.tx_frames),
            tx_bytes: load(&self.tx_bytes),
            tx_dropped_unresolved: load(&self.tx_dropped_unresolved),
            rx_delivered: load(&self.rx_delivered),
            rx_bytes: load(&self.rx_bytes),
            rx_null: load(&self.rx_null),
            rx_malformed: load(&self.rx_malformed),
            tx_notifications: load(&self.tx_notifications),
            rx_notifications: load(&self.rx_notifications),
        }
    }
}
