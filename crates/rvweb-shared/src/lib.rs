//! State shared between the host event loop and a guest running on another thread.

pub mod input_mailbox;

pub use input_mailbox::{InputMailbox, MailboxMessage};
