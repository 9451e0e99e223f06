//! Fixed-capacity request/response ring shared between a front end and a back end.
//!
//! Indices are free-running `u32` counters; slot positions are `index & (size - 1)`. Each side keeps
//! a private producer index and publishes it explicitly, and each side advertises an event
//! threshold (`req_event` / `rsp_event`) naming the index at which it wants to be woken. Publishing
//! reports whether the threshold was crossed, which is the "must notify" doorbell bit.
//!
//! The ring itself is not synchronized; [`crate::mem::MemDevice`] keeps each ring behind a mutex.

use crate::error::{DeviceError, Result};

/// Largest supported ring size.
pub const MAX_RING_SIZE: u32 = 1 << 15;

#[derive(Debug)]
pub struct SharedRing<Req, Rsp> {
    name: &'static str,
    size: u32,
    requests: Box<[Option<Req>]>,
    responses: Box<[Option<Rsp>]>,

    // Shared indices.
    req_prod: u32,
    req_event: u32,
    rsp_prod: u32,
    rsp_event: u32,

    // Front-end private.
    req_prod_pvt: u32,
    rsp_cons: u32,

    // Back-end private.
    rsp_prod_pvt: u32,
    req_cons: u32,
}

impl<Req, Rsp> SharedRing<Req, Rsp> {
    pub fn new(name: &'static str, size: u32) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() || size > MAX_RING_SIZE {
            return Err(DeviceError::InvalidConfig(
                "ring size must be a power of two in 1..=32768",
            ));
        }
        Ok(Self {
            name,
            size,
            requests: (0..size).map(|_| None).collect(),
            responses: (0..size).map(|_| None).collect(),
            req_prod: 0,
            req_event: 1,
            rsp_prod: 0,
            rsp_event: 1,
            req_prod_pvt: 0,
            rsp_cons: 0,
            rsp_prod_pvt: 0,
            req_cons: 0,
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn slot(&self, idx: u32) -> usize {
        (idx & (self.size - 1)) as usize
    }

    // Front end.

    /// Requests the front end may still queue before the ring is full.
    pub fn free_requests(&self) -> u32 {
        self.size - self.req_prod_pvt.wrapping_sub(self.rsp_cons)
    }

    pub fn push_request(&mut self, req: Req) -> Result<()> {
        if self.free_requests() == 0 {
            return Err(DeviceError::RingFull(self.name));
        }
        let slot = self.slot(self.req_prod_pvt);
        self.requests[slot] = Some(req);
        self.req_prod_pvt = self.req_prod_pvt.wrapping_add(1);
        Ok(())
    }

    /// Publish privately queued requests; `true` if the back end asked to be woken in the
    /// published range.
    pub fn push_requests_and_check_notify(&mut self) -> bool {
        let old = self.req_prod;
        let new = self.req_prod_pvt;
        self.req_prod = new;
        new.wrapping_sub(self.req_event) < new.wrapping_sub(old)
    }

    pub fn has_unconsumed_responses(&self) -> bool {
        self.rsp_prod != self.rsp_cons
    }

    /// Check for responses, re-arming `rsp_event` when there are none so the back end signals the
    /// next one.
    pub fn final_check_for_responses(&mut self) -> bool {
        if self.has_unconsumed_responses() {
            return true;
        }
        self.rsp_event = self.rsp_cons.wrapping_add(1);
        self.has_unconsumed_responses()
    }

    pub fn take_response(&mut self) -> Option<Rsp> {
        if !self.has_unconsumed_responses() {
            return None;
        }
        let slot = self.slot(self.rsp_cons);
        self.rsp_cons = self.rsp_cons.wrapping_add(1);
        self.responses[slot].take()
    }

    // Back end.

    pub fn has_unconsumed_requests(&self) -> bool {
        self.req_prod != self.req_cons
    }

    pub fn take_request(&mut self) -> Option<Req> {
        if !self.has_unconsumed_requests() {
            return None;
        }
        let slot = self.slot(self.req_cons);
        self.req_cons = self.req_cons.wrapping_add(1);
        self.requests[slot].take()
    }

    pub fn final_check_for_requests(&mut self) -> bool {
        if self.has_unconsumed_requests() {
            return true;
        }
        self.req_event = self.req_cons.wrapping_add(1);
        self.has_unconsumed_requests()
    }

    /// Queue a response. Only consumed requests can be answered.
    pub fn push_response(&mut self, rsp: Rsp) -> Result<()> {
        if self.rsp_prod_pvt == self.req_cons {
            return Err(DeviceError::RingFull(self.name));
        }
        let slot = self.slot(self.rsp_prod_pvt);
        self.responses[slot] = Some(rsp);
        self.rsp_prod_pvt = self.rsp_prod_pvt.wrapping_add(1);
        Ok(())
    }

    pub fn push_responses_and_check_notify(&mut self) -> bool {
        let old = self.rsp_prod;
        let new = self.rsp_prod_pvt;
        self.rsp_prod = new;
        new.wrapping_sub(self.rsp_event) < new.wrapping_sub(old)
    }
}
