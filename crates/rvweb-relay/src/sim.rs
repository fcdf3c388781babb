//! In-process reference guest.
//!
//! Models the receive side of the emulator's serial console: a small input buffer at a fixed
//! heap address, a pending-byte count set by the host, and a read cursor the guest advances one
//! byte at a time while the line is "ready".

use crate::guest::{GuestEntry, GuestInput, GuestMemoryError};
use crate::launch::LaunchArgs;

/// Input buffer capacity of the serial console receive path.
pub const DEFAULT_INPUT_CAPACITY: u32 = 16;

pub const DEFAULT_INPUT_ADDRESS: u32 = 0x1000;

pub const DEFAULT_HEAP_BYTES: u32 = 64 * 1024;

#[derive(Debug, Clone)]
pub struct SimGuest {
    heap: Vec<u8>,
    input_addr: u32,
    input_cap: u32,
    pending: u32,
    cursor: u32,
    launches: Vec<LaunchArgs>,
}

impl Default for SimGuest {
    fn default() -> Self {
        Self::new()
    }
}

impl SimGuest {
    pub fn new() -> Self {
        Self {
            heap: vec![0; DEFAULT_HEAP_BYTES as usize],
            input_addr: DEFAULT_INPUT_ADDRESS,
            input_cap: DEFAULT_INPUT_CAPACITY,
            pending: 0,
            cursor: 0,
            launches: Vec::new(),
        }
    }

    /// Create a guest with a `heap_bytes` heap and the input buffer at `[addr, addr + cap)`.
    pub fn with_input_buffer(heap_bytes: u32, addr: u32, cap: u32) -> Result<Self, GuestMemoryError> {
        let mut guest = Self {
            heap: vec![0; heap_bytes as usize],
            ..Self::new()
        };
        guest.resize_input_buffer(addr, cap)?;
        Ok(guest)
    }

    /// Move or resize the input buffer. Any pending input is dropped.
    pub fn resize_input_buffer(&mut self, addr: u32, cap: u32) -> Result<(), GuestMemoryError> {
        self.check_range(addr, cap as usize)?;
        self.input_addr = addr;
        self.input_cap = cap;
        self.pending = 0;
        self.cursor = 0;
        Ok(())
    }

    pub fn heap(&self) -> &[u8] {
        &self.heap
    }

    /// The current input buffer contents (all `capacity` bytes).
    pub fn input_buffer(&self) -> &[u8] {
        let start = self.input_addr as usize;
        &self.heap[start..start + self.input_cap as usize]
    }

    /// Pending byte count as last set by the host, minus bytes already read.
    pub fn pending_input_len(&self) -> u32 {
        self.pending
    }

    pub fn input_ready(&self) -> bool {
        self.pending != 0
    }

    /// Read the next input byte, or `None` when nothing is pending.
    ///
    /// A pending count larger than the buffer (the host reports untruncated key lengths) is
    /// drained only up to the capacity; the remainder is discarded.
    pub fn read_input_byte(&mut self) -> Option<u8> {
        if self.pending == 0 {
            return None;
        }
        if self.cursor >= self.input_cap {
            tracing::debug!(
                discarded = self.pending,
                capacity = self.input_cap,
                "pending input exceeds buffer capacity; discarding remainder"
            );
            self.pending = 0;
            self.cursor = 0;
            return None;
        }

        let value = self.heap[(self.input_addr + self.cursor) as usize];
        self.cursor += 1;
        self.pending -= 1;
        if self.pending == 0 {
            self.cursor = 0;
        }
        Some(value)
    }

    pub fn drain_input(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = self.read_input_byte() {
            out.push(b);
        }
        out
    }

    /// Argument lists the entry point was invoked with.
    pub fn launches(&self) -> &[LaunchArgs] {
        &self.launches
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<(), GuestMemoryError> {
        let end = (addr as usize).checked_add(len);
        match end {
            Some(end) if end <= self.heap.len() => Ok(()),
            _ => Err(GuestMemoryError::OutOfBounds {
                addr,
                len,
                heap_len: self.heap.len(),
            }),
        }
    }
}

impl GuestInput for SimGuest {
    fn input_buffer_address(&self) -> u32 {
        self.input_addr
    }

    fn input_buffer_capacity(&self) -> u32 {
        self.input_cap
    }

    fn write_input(&mut self, addr: u32, bytes: &[u8]) -> Result<(), GuestMemoryError> {
        self.check_range(addr, bytes.len())?;
        let start = addr as usize;
        self.heap[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn set_input_length(&mut self, len: u32) {
        // A new event replaces whatever was left of the previous one.
        self.pending = len;
        self.cursor = 0;
    }
}

impl GuestEntry for SimGuest {
    fn run(&mut self, args: &LaunchArgs) {
        self.launches.push(args.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pending_bytes_in_order_then_goes_idle() {
        let mut g = SimGuest::new();
        g.write_input(DEFAULT_INPUT_ADDRESS, b"ok").unwrap();
        g.set_input_length(2);

        assert!(g.input_ready());
        assert_eq!(g.read_input_byte(), Some(b'o'));
        assert_eq!(g.read_input_byte(), Some(b'k'));
        assert!(!g.input_ready());
        assert_eq!(g.read_input_byte(), None);
    }

    #[test]
    fn new_length_rewinds_partially_read_event() {
        let mut g = SimGuest::new();
        g.write_input(DEFAULT_INPUT_ADDRESS, b"abc").unwrap();
        g.set_input_length(3);
        assert_eq!(g.read_input_byte(), Some(b'a'));

        g.write_input(DEFAULT_INPUT_ADDRESS, b"xy").unwrap();
        g.set_input_length(2);
        assert_eq!(g.drain_input(), b"xy".to_vec());
    }

    #[test]
    fn oversized_pending_length_is_clamped_to_capacity() {
        let mut g = SimGuest::with_input_buffer(64, 8, 4).unwrap();
        g.write_input(8, b"abcd").unwrap();
        g.set_input_length(10);

        assert_eq!(g.drain_input(), b"abcd".to_vec());
        assert_eq!(g.pending_input_len(), 0);
        assert_eq!(g.read_input_byte(), None);
    }

    #[test]
    fn buffer_must_fit_in_heap() {
        assert!(SimGuest::with_input_buffer(16, 8, 8).is_ok());
        assert_eq!(
            SimGuest::with_input_buffer(16, 8, 9).unwrap_err(),
            GuestMemoryError::OutOfBounds {
                addr: 8,
                len: 9,
                heap_len: 16
            }
        );
        let mut g = SimGuest::new();
        assert!(g.write_input(u32::MAX, b"a").is_err());
    }

    #[test]
    fn run_records_arguments() {
        let mut g = SimGuest::new();
        g.run(&LaunchArgs::single("hello.elf"));
        assert_eq!(g.launches(), &[LaunchArgs::single("hello.elf")]);
    }
}
