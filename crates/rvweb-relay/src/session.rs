use thiserror::Error;

use crate::dispatch::{DispatchError, DispatchOutcome, EntryDispatcher};
use crate::guest::{Guest, Terminal};
use crate::key::KeyEvent;
use crate::launch::LaunchMode;
use crate::relay::{InputRelay, RelayError, RelayReport};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("guest runtime is not initialized yet")]
    NotReady,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Everything the host keeps for one guest instance: the guest and terminal handles, the entry
/// dispatcher and the input relay.
///
/// The session is created by whoever bootstraps the page/runner and passed to each callback;
/// there is no global terminal.
#[derive(Debug)]
pub struct HostSession<G, T> {
    guest: G,
    terminal: T,
    dispatcher: EntryDispatcher,
    relay: InputRelay,
    ready: bool,
}

impl<G: Guest, T: Terminal> HostSession<G, T> {
    pub fn new(guest: G, terminal: T, mode: LaunchMode) -> Self {
        Self {
            guest,
            terminal,
            dispatcher: EntryDispatcher::new(mode),
            relay: InputRelay::new(),
            ready: false,
        }
    }

    /// Readiness signal from the guest runtime.
    pub fn on_runtime_initialized(&mut self) -> DispatchOutcome {
        self.ready = true;
        self.dispatcher.on_ready(&mut self.guest)
    }

    /// Launch in command-line mode.
    pub fn run_system(&mut self, cli: &str) -> Result<DispatchOutcome, SessionError> {
        Ok(self.dispatcher.run_command_line(&mut self.guest, cli)?)
    }

    /// Relay one terminal key event.
    pub fn on_key(&mut self, key: &str) -> Result<RelayReport, SessionError> {
        self.relay_key(&KeyEvent::from_text(key))
    }

    pub fn relay_key(&mut self, key: &KeyEvent) -> Result<RelayReport, SessionError> {
        if !self.ready {
            return Err(SessionError::NotReady);
        }
        Ok(self.relay.relay(&mut self.guest, &mut self.terminal, key)?)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn dispatcher(&self) -> &EntryDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EntryDispatcher {
        &mut self.dispatcher
    }

    pub fn relay(&self) -> &InputRelay {
        &self.relay
    }

    pub fn guest(&self) -> &G {
        &self.guest
    }

    pub fn guest_mut(&mut self) -> &mut G {
        &mut self.guest
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn into_parts(self) -> (G, T) {
        (self.guest, self.terminal)
    }
}
