//! Fixed-capacity connection buffer.
//!
//! Bytes `[0, len)` are valid and unconsumed; `[len, capacity)` is free space
//! the next read lands in. `len <= capacity` always holds.

/// Per-connection byte buffer, exclusively owned by one resolver and handed to
/// the application once the header is stripped.
#[derive(Debug, Clone)]
pub struct ConnectionBuffer {
    data: Box<[u8]>,
    filled: usize,
}

impl ConnectionBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Count of valid bytes at the front (`bytes_buffered`).
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    /// Remaining free space.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.filled
    }

    pub fn filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    /// The free tail where the next read should land.
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.filled..]
    }

    /// Whole backing storage, for application reads after resolution.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mark `n` more bytes as valid after a read into [`Self::unfilled_mut`].
    ///
    /// # Panics
    /// If `n` exceeds the free space. A transport reporting more bytes than
    /// the region it was given is a bug, not a runtime condition.
    pub fn advance(&mut self, n: usize) {
        assert!(
            n <= self.remaining(),
            "advance({n}) past capacity ({} of {} used)",
            self.filled,
            self.data.len()
        );
        self.filled += n;
    }

    /// Drop the first `header_len` bytes and move the rest to the front.
    ///
    /// Source and destination may overlap in either direction; `copy_within`
    /// has memmove semantics. Returns the leftover count.
    pub fn compact(&mut self, header_len: usize) -> usize {
        assert!(header_len <= self.filled, "header longer than buffered data");
        let leftover = self.filled - header_len;
        if header_len > 0 && leftover > 0 {
            self.data.copy_within(header_len..self.filled, 0);
        }
        self.filled = leftover;
        leftover
    }
}
