//! Packet buffers exchanged with the protocol stack.

use core::ops::Deref;

/// Header space that grows towards the front.
///
/// Upper layers prepend their headers first; the link layer prepends last, so
/// [`Prependable::used_bytes`] always reads outermost header first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prependable {
    buf: Vec<u8>,
    used_start: usize,
}

impl Prependable {
    /// Reserve `size` bytes of header space.
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0u8; size],
            used_start: size,
        }
    }

    /// Claim `len` more bytes at the front. `None` if the reserve is too small.
    pub fn prepend(&mut self, len: usize) -> Option<&mut [u8]> {
        let start = self.used_start.checked_sub(len)?;
        self.used_start = start;
        Some(&mut self.buf[start..start + len])
    }

    /// Give back `len` bytes claimed by [`Prependable::prepend`], clamped to what is in use.
    pub fn release(&mut self, len: usize) {
        self.used_start = self.used_start.saturating_add(len).min(self.buf.len());
    }

    pub fn used_bytes(&self) -> &[u8] {
        &self.buf[self.used_start..]
    }

    pub fn used_len(&self) -> usize {
        self.buf.len() - self.used_start
    }

    pub fn available(&self) -> usize {
        self.used_start
    }
}

/// Owned byte view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View(Vec<u8>);

impl View {
    pub fn new(size: usize) -> Self {
        Self(vec![0u8; size])
    }

    /// Drop `count` bytes from the front, clamped to the view length.
    pub fn trim_front(&mut self, count: usize) {
        let count = count.min(self.0.len());
        self.0.drain(..count);
    }

    /// Truncate the view to at most `len` bytes.
    pub fn cap_length(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for View {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for View {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for View {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// A packet made of one or more views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorisedView {
    views: Vec<View>,
    size: usize,
}

impl VectorisedView {
    pub fn new(views: Vec<View>) -> Self {
        let size = views.iter().map(|v| v.len()).sum();
        Self { views, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Flatten into a contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for view in &self.views {
            out.extend_from_slice(view);
        }
        out
    }
}

impl From<View> for VectorisedView {
    fn from(view: View) -> Self {
        Self::new(vec![view])
    }
}
