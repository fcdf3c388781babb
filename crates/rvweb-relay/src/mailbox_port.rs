use std::sync::Arc;

use rvweb_shared::InputMailbox;

use crate::guest::{GuestInput, GuestMemoryError};

/// Input port that hands relayed events to a guest on another thread through an
/// [`InputMailbox`].
///
/// The relay's buffer write is staged locally and published together with the length, so the
/// consumer sees each event as one unit.
#[derive(Debug)]
pub struct MailboxPort {
    mailbox: Arc<InputMailbox>,
    staged: Vec<u8>,
}

impl MailboxPort {
    /// Base address the port reports. The mailbox has no address space of its own.
    pub const ADDRESS: u32 = 0;

    pub fn new(mailbox: Arc<InputMailbox>) -> Self {
        Self {
            mailbox,
            staged: Vec::new(),
        }
    }

    pub fn mailbox(&self) -> &Arc<InputMailbox> {
        &self.mailbox
    }
}

impl GuestInput for MailboxPort {
    fn input_buffer_address(&self) -> u32 {
        Self::ADDRESS
    }

    fn input_buffer_capacity(&self) -> u32 {
        self.mailbox.capacity() as u32
    }

    fn write_input(&mut self, addr: u32, bytes: &[u8]) -> Result<(), GuestMemoryError> {
        if addr != Self::ADDRESS || bytes.len() > self.mailbox.capacity() {
            return Err(GuestMemoryError::OutOfBounds {
                addr,
                len: bytes.len(),
                heap_len: self.mailbox.capacity(),
            });
        }
        self.staged.clear();
        self.staged.extend_from_slice(bytes);
        Ok(())
    }

    fn set_input_length(&mut self, len: u32) {
        self.mailbox.publish(&self.staged, len);
        self.staged.clear();
    }
}
