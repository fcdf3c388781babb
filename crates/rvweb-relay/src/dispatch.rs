use thiserror::Error;

use crate::guest::GuestEntry;
use crate::launch::{LaunchArgs, LaunchMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The guest entry point ran with these arguments.
    Launched(LaunchArgs),
    /// Single-target mode without a target; nothing ran and the dispatcher stays armed.
    MissingTarget,
    /// Command-line mode is ready and waiting for the host to supply a command line.
    AwaitingCommandLine,
    /// The entry point already ran; this request was dropped.
    AlreadyLaunched,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("guest runtime has not signalled readiness")]
    NotReady,

    #[error("dispatcher is configured for a single target, not a command line")]
    NotCommandLineMode,

    #[error("dispatcher is configured for a command line, not a single target")]
    NotTargetMode,

    #[error("guest entry point already ran")]
    AlreadyLaunched,
}

/// Decides how and when the guest entry point runs. The entry point runs at most once.
#[derive(Debug)]
pub struct EntryDispatcher {
    mode: LaunchMode,
    ready: bool,
    launched: bool,
}

impl EntryDispatcher {
    pub fn new(mode: LaunchMode) -> Self {
        Self {
            mode,
            ready: false,
            launched: false,
        }
    }

    pub fn mode(&self) -> &LaunchMode {
        &self.mode
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn has_launched(&self) -> bool {
        self.launched
    }

    /// Supply (or replace) the single target after construction, e.g. to retry after a
    /// [`DispatchOutcome::MissingTarget`].
    pub fn set_target(&mut self, target: impl Into<String>) -> Result<(), DispatchError> {
        if self.launched {
            return Err(DispatchError::AlreadyLaunched);
        }
        match &mut self.mode {
            LaunchMode::Target(slot) => {
                *slot = Some(target.into());
                Ok(())
            }
            LaunchMode::CommandLine => Err(DispatchError::NotTargetMode),
        }
    }

    /// Handle the guest runtime's readiness signal.
    ///
    /// In single-target mode this runs the guest synchronously. May be called again (for
    /// example after [`EntryDispatcher::set_target`]); once the guest has run, repeated signals
    /// are no-ops.
    pub fn on_ready<G: GuestEntry + ?Sized>(&mut self, guest: &mut G) -> DispatchOutcome {
        self.ready = true;
        if self.launched {
            tracing::debug!("readiness signalled again after launch; ignoring");
            return DispatchOutcome::AlreadyLaunched;
        }

        match &self.mode {
            LaunchMode::Target(Some(target)) => {
                let args = LaunchArgs::single(target.as_str());
                self.launch(guest, args)
            }
            LaunchMode::Target(None) => {
                tracing::warn!("target elf executable is undefined; skipping launch");
                DispatchOutcome::MissingTarget
            }
            LaunchMode::CommandLine => DispatchOutcome::AwaitingCommandLine,
        }
    }

    /// Launch the guest with a host-supplied command line (command-line mode only).
    pub fn run_command_line<G: GuestEntry + ?Sized>(
        &mut self,
        guest: &mut G,
        cli: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !matches!(self.mode, LaunchMode::CommandLine) {
            return Err(DispatchError::NotCommandLineMode);
        }
        if !self.ready {
            return Err(DispatchError::NotReady);
        }
        if self.launched {
            tracing::debug!(cli, "command line supplied after launch; ignoring");
            return Ok(DispatchOutcome::AlreadyLaunched);
        }

        Ok(self.launch(guest, LaunchArgs::from_command_line(cli)))
    }

    fn launch<G: GuestEntry + ?Sized>(&mut self, guest: &mut G, args: LaunchArgs) -> DispatchOutcome {
        // Mark first so a re-entrant readiness signal from inside `run` cannot launch twice.
        self.launched = true;
        tracing::info!(args = ?args.as_slice(), "launching guest");
        guest.run(&args);
        DispatchOutcome::Launched(args)
    }
}
