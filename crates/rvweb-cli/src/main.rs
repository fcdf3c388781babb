#![forbid(unsafe_code)]

// Native-only runner. Keep a wasm32 stub `main` so `--target wasm32-unknown-unknown --workspace`
// builds keep working.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::{self, BufRead, Write};

    use anyhow::{Context, Result};
    use clap::{ArgGroup, Parser};
    use rvweb_relay::{
        DispatchOutcome, HostSession, LaunchConfig, LaunchMode, SimGuest, Terminal,
        DEFAULT_HEAP_BYTES, DEFAULT_INPUT_ADDRESS, DEFAULT_INPUT_CAPACITY,
    };

    #[derive(Debug, Parser)]
    #[command(
        about = "Drive the launch/input relay against the in-process reference guest",
        group(ArgGroup::new("launch").args(["elf", "cmdline"]))
    )]
    pub struct Args {
        /// Target executable to launch as soon as the guest is ready.
        ///
        /// Falls back to `RVWEB_ELF` when neither `--elf` nor `--cmdline` is given.
        #[arg(long)]
        elf: Option<String>,

        /// Whitespace-delimited command line to launch the guest with.
        ///
        /// Falls back to `RVWEB_CMDLINE` when neither `--elf` nor `--cmdline` is given.
        #[arg(long)]
        cmdline: Option<String>,

        /// Guest input buffer capacity in bytes.
        #[arg(long, default_value_t = DEFAULT_INPUT_CAPACITY)]
        input_cap: u32,

        /// Guest input buffer address (decimal or `0x` hex).
        #[arg(long, default_value_t = DEFAULT_INPUT_ADDRESS, value_parser = parse_u32)]
        input_addr: u32,

        /// Guest heap size in bytes.
        #[arg(long, default_value_t = DEFAULT_HEAP_BYTES, value_parser = parse_u32)]
        heap: u32,
    }

    pub(crate) fn parse_u32(s: &str) -> Result<u32, String> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse::<u32>(),
        };
        parsed.map_err(|e| format!("invalid u32 {s:?}: {e}"))
    }

    /// Terminal stand-in: "scrolling to the bottom" flushes stdout.
    struct StdoutTerminal;

    impl Terminal for StdoutTerminal {
        fn scroll_to_bottom(&mut self) {
            let _ = io::stdout().flush();
        }
    }

    pub fn main() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();

        let args = Args::parse();

        let config = match (args.elf, args.cmdline) {
            (Some(target), _) => Some(LaunchConfig::Target(target)),
            (None, Some(cli)) => Some(LaunchConfig::CommandLine(cli)),
            (None, None) => LaunchConfig::from_env().context("invalid launch configuration")?,
        };
        let mode = config
            .as_ref()
            .map(LaunchConfig::mode)
            .unwrap_or(LaunchMode::Target(None));

        let guest = SimGuest::with_input_buffer(args.heap, args.input_addr, args.input_cap)
            .context("input buffer does not fit in the guest heap")?;
        let mut session = HostSession::new(guest, StdoutTerminal, mode);

        let mut outcome = session.on_runtime_initialized();
        if let Some(cli) = config.as_ref().and_then(LaunchConfig::command_line) {
            outcome = session
                .run_system(cli)
                .context("failed to launch from command line")?;
        }
        if let DispatchOutcome::Launched(argv) = &outcome {
            tracing::info!(argv = ?argv.as_slice(), "guest launched");
        } else {
            // Not fatal: input still reaches the guest buffer.
            tracing::warn!(?outcome, "guest not launched; relaying input anyway");
        }

        let stdin = io::stdin();
        let stdout = io::stdout();
        relay_lines(&mut session, stdin.lock(), &mut stdout.lock())
    }

    /// Relay each input line as one key event (ending in `\r`, as a terminal sends Enter) and
    /// echo what the guest drains.
    pub(crate) fn relay_lines<T: Terminal>(
        session: &mut HostSession<SimGuest, T>,
        input: impl BufRead,
        out: &mut impl Write,
    ) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read stdin")?;
            let report = session.on_key(&format!("{line}\r"))?;
            if report.truncated {
                tracing::debug!(
                    key_len = report.key_len,
                    capacity = report.capacity,
                    "input line longer than guest buffer"
                );
            }
            let drained = session.guest_mut().drain_input();
            writeln!(out, "{}", drained.escape_ascii()).context("failed to write output")?;
        }
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}
