use thiserror::Error;

use crate::guest::{GuestInput, GuestMemoryError, Terminal};
use crate::key::KeyEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Waiting for the next key event.
    Idle,
    /// Copying an event into the guest buffer.
    Writing,
}

/// What a single relay did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    /// Buffer address queried from the guest for this event.
    pub address: u32,
    /// Buffer capacity queried from the guest for this event.
    pub capacity: u32,
    /// Length reported to the guest (the untruncated event length).
    pub key_len: u32,
    /// Key bytes that actually landed in the buffer (`min(key_len, capacity)`).
    pub copied: u32,
    /// `true` when the event did not fit and its tail was dropped.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The guest reported an input region that lies outside its own memory.
    #[error("guest input buffer rejected the write: {0}")]
    GuestMemory(#[from] GuestMemoryError),
}

/// Copies key events into the guest input buffer.
///
/// Per event:
/// 1. query the buffer address and capacity from the guest (never cached; the guest may move
///    or resize the region between events),
/// 2. write exactly `capacity` bytes at the address: the first `min(len, capacity)` key bytes,
///    then zeros, so nothing from an earlier, longer event survives,
/// 3. set the guest's pending length to the *untruncated* key length,
/// 4. scroll the terminal to the bottom.
///
/// Input longer than the buffer is truncated silently. The pending length still reports the
/// full key length; guests must clamp their reads to the capacity.
#[derive(Debug)]
pub struct InputRelay {
    state: RelayState,
    scratch: Vec<u8>,
    events_relayed: u64,
}

impl Default for InputRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRelay {
    pub fn new() -> Self {
        Self {
            state: RelayState::Idle,
            scratch: Vec::new(),
            events_relayed: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn events_relayed(&self) -> u64 {
        self.events_relayed
    }

    pub fn relay<G, T>(
        &mut self,
        guest: &mut G,
        terminal: &mut T,
        key: &KeyEvent,
    ) -> Result<RelayReport, RelayError>
    where
        G: GuestInput + ?Sized,
        T: Terminal + ?Sized,
    {
        self.state = RelayState::Writing;
        let result = self.write_event(guest, key);
        self.state = RelayState::Idle;

        let report = result?;
        self.events_relayed += 1;
        terminal.scroll_to_bottom();
        Ok(report)
    }

    fn write_event<G: GuestInput + ?Sized>(
        &mut self,
        guest: &mut G,
        key: &KeyEvent,
    ) -> Result<RelayReport, RelayError> {
        let address = guest.input_buffer_address();
        let capacity = guest.input_buffer_capacity();
        let key_len = u32::try_from(key.len()).unwrap_or(u32::MAX);
        let copied = key_len.min(capacity);

        if capacity > 0 {
            self.scratch.clear();
            self.scratch.resize(capacity as usize, 0);
            let n = copied as usize;
            self.scratch[..n].copy_from_slice(&key.bytes()[..n]);
            guest.write_input(address, &self.scratch)?;
        }

        guest.set_input_length(key_len);

        let truncated = key_len > capacity;
        if truncated {
            tracing::debug!(key_len, capacity, "key event truncated to input buffer capacity");
        } else {
            tracing::trace!(key_len, address, "relayed key event");
        }

        Ok(RelayReport {
            address,
            capacity,
            key_len,
            copied,
            truncated,
        })
    }
}
