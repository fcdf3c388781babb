#![forbid(unsafe_code)]

//! Host-side glue for a guest VM module: selects how the guest program is launched and relays
//! terminal key events into the guest's fixed-capacity input buffer.
//!
//! The guest is opaque; it is reached only through the [`GuestInput`] / [`GuestEntry`]
//! primitives. Everything the host owns (dispatcher, relay, terminal handle) lives in a
//! [`HostSession`] that is passed around explicitly.

mod dispatch;
mod guest;
mod key;
mod launch;
mod mailbox_port;
mod relay;
mod session;
mod sim;

pub use dispatch::{DispatchError, DispatchOutcome, EntryDispatcher};
pub use guest::{Guest, GuestEntry, GuestInput, GuestMemoryError, NullTerminal, Terminal};
pub use key::KeyEvent;
pub use launch::{ConfigError, LaunchArgs, LaunchConfig, LaunchMode, ENV_CMDLINE, ENV_ELF};
pub use mailbox_port::MailboxPort;
pub use relay::{InputRelay, RelayError, RelayReport, RelayState};
pub use session::{HostSession, SessionError};
pub use sim::{SimGuest, DEFAULT_HEAP_BYTES, DEFAULT_INPUT_ADDRESS, DEFAULT_INPUT_CAPACITY};
