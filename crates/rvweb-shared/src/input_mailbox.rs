//! Single-slot input mailbox for a multi-threaded host/guest boundary.
//!
//! The cooperative browser build hands input to the guest through a plain length field: the
//! host writes the buffer, then the length, and the guest polls the length. That only works
//! because both sides never run in parallel. When the guest runs on its own thread, the host
//! publishes into this mailbox instead and the guest `take`s whole messages.
//!
//! Protocol (one producer, one consumer):
//! - The producer marks the slot busy ([`MAILBOX_STATE_BUSY_BIT`]), stores every payload byte,
//!   then stores the final state word (full bit, bumped generation, reported length).
//! - The consumer reads a full, non-busy state word, copies the payload, then empties the slot
//!   with a compare-exchange against the state word it started from. If the producer touched
//!   the slot in the meantime the exchange fails and the consumer starts over.
//!
//! An unconsumed message is overwritten by the next publish (last write wins), but a consumer
//! never observes bytes from two different messages.

#[cfg(all(feature = "loom", test))]
use loom::sync::atomic::{AtomicU32, AtomicU8};
#[cfg(not(all(feature = "loom", test)))]
use std::sync::atomic::{AtomicU32, AtomicU8};

use std::sync::atomic::Ordering;

/// Set while the producer is storing payload bytes.
pub const MAILBOX_STATE_BUSY_BIT: u32 = 1 << 31;

/// Set while the slot holds an unconsumed message.
pub const MAILBOX_STATE_FULL_BIT: u32 = 1 << 30;

const LEN_MASK: u32 = 0xffff;
const GENERATION_SHIFT: u32 = 16;
const GENERATION_MASK: u32 = 0x3fff << GENERATION_SHIFT;

/// A message taken out of the mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailboxMessage {
    /// The full slot contents (always `capacity` bytes).
    pub bytes: Vec<u8>,
    /// The length reported by the producer. This is not clamped to `bytes.len()`.
    pub reported_len: u16,
    /// Generation of the publish that produced this message.
    pub generation: u16,
}

impl MailboxMessage {
    /// The bytes that are both reported valid and actually present in the slot.
    pub fn valid_bytes(&self) -> &[u8] {
        let len = usize::from(self.reported_len).min(self.bytes.len());
        &self.bytes[..len]
    }
}

pub struct InputMailbox {
    state: AtomicU32,
    data: Box<[AtomicU8]>,
}

impl InputMailbox {
    pub fn new(capacity: u16) -> Self {
        let data = (0..capacity).map(|_| AtomicU8::new(0)).collect();
        Self {
            state: AtomicU32::new(0),
            data,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Publish one message, replacing any message the consumer has not taken yet.
    ///
    /// Bytes beyond the capacity are dropped and the tail of the slot is zeroed. The reported
    /// length is stored as given (saturated to `u16::MAX`) and returned with the message.
    ///
    /// Returns the generation of the published message.
    pub fn publish(&self, bytes: &[u8], reported_len: u32) -> u16 {
        let mut start = self.state.load(Ordering::SeqCst);
        loop {
            if start & MAILBOX_STATE_BUSY_BIT != 0 {
                spin();
                start = self.state.load(Ordering::SeqCst);
                continue;
            }

            match self.state.compare_exchange_weak(
                start,
                start | MAILBOX_STATE_BUSY_BIT,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => start = actual,
            }
        }

        for (i, slot) in self.data.iter().enumerate() {
            slot.store(bytes.get(i).copied().unwrap_or(0), Ordering::SeqCst);
            test_yield();
        }

        let generation = ((start & GENERATION_MASK) >> GENERATION_SHIFT).wrapping_add(1) & 0x3fff;
        let len = reported_len.min(LEN_MASK);
        self.state.store(
            MAILBOX_STATE_FULL_BIT | (generation << GENERATION_SHIFT) | len,
            Ordering::SeqCst,
        );
        generation as u16
    }

    /// Length of the pending message, if any. Does not consume it.
    pub fn pending_len(&self) -> Option<u16> {
        let state = self.state.load(Ordering::SeqCst);
        if state & MAILBOX_STATE_BUSY_BIT != 0 || state & MAILBOX_STATE_FULL_BIT == 0 {
            return None;
        }
        Some((state & LEN_MASK) as u16)
    }

    /// Take the pending message, leaving the slot empty.
    pub fn take(&self) -> Option<MailboxMessage> {
        let mut bytes = vec![0u8; self.data.len()];
        loop {
            let state = self.state.load(Ordering::SeqCst);
            if state & MAILBOX_STATE_BUSY_BIT != 0 {
                spin();
                continue;
            }
            if state & MAILBOX_STATE_FULL_BIT == 0 {
                return None;
            }

            for (dst, slot) in bytes.iter_mut().zip(self.data.iter()) {
                *dst = slot.load(Ordering::SeqCst);
                test_yield();
            }

            // Emptying keeps the generation so the next publish still bumps it.
            if self
                .state
                .compare_exchange(
                    state,
                    state & GENERATION_MASK,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                return Some(MailboxMessage {
                    bytes,
                    reported_len: (state & LEN_MASK) as u16,
                    generation: ((state & GENERATION_MASK) >> GENERATION_SHIFT) as u16,
                });
            }
        }
    }
}

impl core::fmt::Debug for InputMailbox {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputMailbox")
            .field("capacity", &self.data.len())
            .field("pending_len", &self.pending_len())
            .finish()
    }
}

#[cfg(all(test, feature = "loom"))]
#[inline]
fn spin() {
    loom::thread::yield_now();
}

#[cfg(not(all(test, feature = "loom")))]
#[inline]
fn spin() {
    std::hint::spin_loop();
}

#[cfg(all(test, feature = "loom"))]
#[inline]
fn test_yield() {
    loom::thread::yield_now();
}

#[cfg(all(test, not(feature = "loom")))]
#[inline]
fn test_yield() {
    std::thread::yield_now();
}

#[cfg(not(test))]
#[inline]
fn test_yield() {}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn take_on_empty_mailbox_returns_none() {
        let mailbox = InputMailbox::new(4);
        assert_eq!(mailbox.pending_len(), None);
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn publish_then_take_empties_the_slot() {
        let mailbox = InputMailbox::new(4);
        mailbox.publish(b"ab", 2);
        assert_eq!(mailbox.pending_len(), Some(2));

        let msg = mailbox.take().unwrap();
        assert_eq!(msg.bytes, vec![b'a', b'b', 0, 0]);
        assert_eq!(msg.valid_bytes(), b"ab");
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn later_publish_overwrites_unconsumed_message() {
        let mailbox = InputMailbox::new(4);
        mailbox.publish(b"long", 4);
        mailbox.publish(b"x", 1);

        let msg = mailbox.take().unwrap();
        assert_eq!(msg.bytes, vec![b'x', 0, 0, 0]);
        assert_eq!(msg.reported_len, 1);
    }

    #[test]
    fn oversized_publish_keeps_reported_length() {
        let mailbox = InputMailbox::new(2);
        mailbox.publish(b"abcd", 4);

        let msg = mailbox.take().unwrap();
        assert_eq!(msg.bytes, b"ab".to_vec());
        assert_eq!(msg.reported_len, 4);
        assert_eq!(msg.valid_bytes(), b"ab");
    }

    #[test]
    fn generation_increments_across_take() {
        let mailbox = InputMailbox::new(1);
        let g1 = mailbox.publish(b"a", 1);
        assert_eq!(mailbox.take().unwrap().generation, g1);
        let g2 = mailbox.publish(b"b", 1);
        assert_eq!(g2, g1.wrapping_add(1) & 0x3fff);
    }

    #[test]
    fn zero_capacity_mailbox_still_carries_length() {
        let mailbox = InputMailbox::new(0);
        mailbox.publish(b"abc", 3);
        let msg = mailbox.take().unwrap();
        assert!(msg.bytes.is_empty());
        assert_eq!(msg.reported_len, 3);
    }

    #[test]
    fn taken_messages_are_never_torn() {
        let mailbox = Arc::new(InputMailbox::new(8));
        let start = Arc::new(std::sync::Barrier::new(2));
        let done = Arc::new(AtomicBool::new(false));

        let writer_mailbox = mailbox.clone();
        let writer_start = start.clone();
        let writer_done = done.clone();
        let writer = thread::spawn(move || {
            writer_start.wait();
            for token in 1u32..2_000 {
                let fill = (token % 251) as u8;
                let len = token % 9;
                let payload = vec![fill; len as usize];
                writer_mailbox.publish(&payload, len);
            }
            writer_done.store(true, Ordering::SeqCst);
        });

        let reader_mailbox = mailbox.clone();
        let reader_start = start.clone();
        let reader_done = done.clone();
        let reader = thread::spawn(move || {
            reader_start.wait();
            let check = |msg: MailboxMessage| {
                let len = usize::from(msg.reported_len);
                let fill = msg.bytes.first().copied().unwrap_or(0);
                assert!(msg.bytes[..len].iter().all(|&b| b == fill));
                assert!(msg.bytes[len..].iter().all(|&b| b == 0));
            };
            while !reader_done.load(Ordering::SeqCst) {
                if let Some(msg) = reader_mailbox.take() {
                    check(msg);
                }
            }
            if let Some(msg) = reader_mailbox.take() {
                check(msg);
            }
        });

        writer.join().unwrap();
        reader.join().unwrap();
    }
}

#[cfg(all(test, feature = "loom"))]
mod loom_tests {
    use super::*;

    use loom::sync::Arc;
    use loom::thread;

    #[test]
    fn take_never_mixes_two_publishes() {
        loom::model(|| {
            let mailbox = Arc::new(InputMailbox::new(2));

            let writer_mailbox = mailbox.clone();
            let writer = thread::spawn(move || {
                writer_mailbox.publish(&[1, 1], 2);
                writer_mailbox.publish(&[2, 2], 2);
            });

            if let Some(msg) = mailbox.take() {
                assert_eq!(msg.bytes[0], msg.bytes[1]);
                assert_eq!(msg.reported_len, 2);
            }

            writer.join().unwrap();
        });
    }
}
