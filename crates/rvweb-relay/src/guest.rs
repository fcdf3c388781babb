use thiserror::Error;

use crate::launch::LaunchArgs;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestMemoryError {
    #[error("guest memory out of bounds: addr={addr:#x} len={len} heap_len={heap_len}")]
    OutOfBounds {
        addr: u32,
        len: usize,
        heap_len: usize,
    },

    #[error("guest memory unavailable: {0}")]
    Unavailable(String),
}

/// Input side of the guest: the buffer the host writes key bytes into and the length field it
/// notifies.
///
/// Address and capacity are owned by the guest and may change between events, so callers must
/// query them for every write instead of caching them.
pub trait GuestInput {
    fn input_buffer_address(&self) -> u32;

    fn input_buffer_capacity(&self) -> u32;

    /// Store `bytes` into guest memory at `addr` (the host's view of the guest heap).
    fn write_input(&mut self, addr: u32, bytes: &[u8]) -> Result<(), GuestMemoryError>;

    /// Tell the guest that `len` bytes at the start of the buffer belong to the latest event.
    fn set_input_length(&mut self, len: u32);
}

/// Program entry point of the guest.
pub trait GuestEntry {
    fn run(&mut self, args: &LaunchArgs);
}

/// A guest exposing both the input primitives and the entry point.
pub trait Guest: GuestInput + GuestEntry {}

impl<T: GuestInput + GuestEntry + ?Sized> Guest for T {}

/// Host terminal widget, as far as the relay is concerned.
pub trait Terminal {
    /// Scroll the view so the newest line is visible.
    fn scroll_to_bottom(&mut self);
}

/// Terminal that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTerminal;

impl Terminal for NullTerminal {
    fn scroll_to_bottom(&mut self) {}
}
