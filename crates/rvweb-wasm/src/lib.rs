//! Browser bindings for launching an Emscripten-built emulator and feeding it terminal input.
//!
//! The emulator module is opaque: it is reached only through the `Module` object Emscripten
//! creates (`_get_input_buf`, `_get_input_buf_cap`, `_set_input_buf_size`, `HEAPU8`,
//! `callMain`). The page builds the module with `noInitialRun`, constructs a [`RelaySession`]
//! and forwards three callbacks into it:
//! - `Module.onRuntimeInitialized` -> [`RelaySession::on_runtime_initialized`],
//! - the "run" button (system mode) -> [`RelaySession::run_system`],
//! - xterm.js `onKey` -> [`RelaySession::on_key`].

use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;

use rvweb_relay::{
    DispatchOutcome, GuestEntry, GuestInput, GuestMemoryError, HostSession, LaunchArgs,
    LaunchMode, Terminal,
};

fn js_error(message: impl core::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

#[wasm_bindgen]
extern "C" {
    /// Emscripten `Module` object of the emulator build.
    pub type EmscriptenModule;

    #[wasm_bindgen(method, js_name = _get_input_buf)]
    fn get_input_buf(this: &EmscriptenModule) -> u32;

    #[wasm_bindgen(method, js_name = _get_input_buf_cap)]
    fn get_input_buf_cap(this: &EmscriptenModule) -> u32;

    #[wasm_bindgen(method, js_name = _set_input_buf_size)]
    fn set_input_buf_size(this: &EmscriptenModule, size: u32);

    #[wasm_bindgen(method, getter = HEAPU8)]
    fn heap_u8(this: &EmscriptenModule) -> Uint8Array;

    #[wasm_bindgen(method, catch, js_name = callMain)]
    fn call_main(this: &EmscriptenModule, args: &Array) -> Result<(), JsValue>;

    /// xterm.js `Terminal` (only `scrollToBottom` is used).
    pub type XtermTerminal;

    #[wasm_bindgen(method, js_name = scrollToBottom)]
    fn js_scroll_to_bottom(this: &XtermTerminal);

    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    fn console_warn(message: &str);
}

/// [`rvweb_relay::Guest`] implementation over the Emscripten module object.
struct ModuleGuest {
    module: EmscriptenModule,
}

impl GuestInput for ModuleGuest {
    fn input_buffer_address(&self) -> u32 {
        self.module.get_input_buf()
    }

    fn input_buffer_capacity(&self) -> u32 {
        self.module.get_input_buf_cap()
    }

    fn write_input(&mut self, addr: u32, bytes: &[u8]) -> Result<(), GuestMemoryError> {
        // Re-read `HEAPU8` every time: growing the wasm memory detaches the previous view.
        let heap = self.module.heap_u8();
        let heap_len = heap.length() as usize;
        let end = (addr as usize)
            .checked_add(bytes.len())
            .filter(|&end| end <= heap_len)
            .ok_or(GuestMemoryError::OutOfBounds {
                addr,
                len: bytes.len(),
                heap_len,
            })?;
        heap.subarray(addr, end as u32).copy_from(bytes);
        Ok(())
    }

    fn set_input_length(&mut self, len: u32) {
        self.module.set_input_buf_size(len);
    }
}

impl GuestEntry for ModuleGuest {
    fn run(&mut self, args: &LaunchArgs) {
        let argv: Array = args.iter().map(JsValue::from_str).collect();
        if let Err(err) = self.module.call_main(&argv) {
            // Emscripten reports `exit()` by throwing; the launch itself already happened.
            tracing::debug!(?err, "callMain threw");
            console_warn(&format!("callMain threw: {err:?}"));
        }
    }
}

impl Terminal for XtermTerminal {
    fn scroll_to_bottom(&mut self) {
        self.js_scroll_to_bottom();
    }
}

/// WASM export: one emulator module plus the terminal feeding it.
#[wasm_bindgen]
pub struct RelaySession {
    inner: HostSession<ModuleGuest, XtermTerminal>,
}

impl RelaySession {
    fn with_mode(module: EmscriptenModule, terminal: XtermTerminal, mode: LaunchMode) -> Self {
        Self {
            inner: HostSession::new(ModuleGuest { module }, terminal, mode),
        }
    }
}

#[wasm_bindgen]
impl RelaySession {
    /// Single-target session: `target_elf` is launched on `on_runtime_initialized`.
    ///
    /// An `undefined` target is reported with a console warning and nothing is launched.
    #[wasm_bindgen(constructor)]
    pub fn new(module: EmscriptenModule, terminal: XtermTerminal, target_elf: Option<String>) -> Self {
        Self::with_mode(module, terminal, LaunchMode::Target(target_elf))
    }

    /// System session: the guest is launched later from a command line via `run_system`.
    pub fn system(module: EmscriptenModule, terminal: XtermTerminal) -> Self {
        Self::with_mode(module, terminal, LaunchMode::CommandLine)
    }

    /// Forward `Module.onRuntimeInitialized`. Returns `true` if the guest was launched.
    pub fn on_runtime_initialized(&mut self) -> bool {
        match self.inner.on_runtime_initialized() {
            DispatchOutcome::Launched(_) => true,
            DispatchOutcome::MissingTarget => {
                console_warn("target elf executable is undefined");
                false
            }
            DispatchOutcome::AwaitingCommandLine | DispatchOutcome::AlreadyLaunched => false,
        }
    }

    /// Launch a system session with a whitespace-delimited command line.
    ///
    /// Returns `true` if the guest was launched, `false` if it had already been launched.
    pub fn run_system(&mut self, cli_param: &str) -> Result<bool, JsValue> {
        let outcome = self.inner.run_system(cli_param).map_err(js_error)?;
        Ok(matches!(outcome, DispatchOutcome::Launched(_)))
    }

    /// Forward one xterm.js `onKey` event (`key` is the event's key string).
    pub fn on_key(&mut self, key: &str) -> Result<(), JsValue> {
        self.inner.on_key(key).map(|_| ()).map_err(js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn launched(&self) -> bool {
        self.inner.dispatcher().has_launched()
    }

    #[wasm_bindgen(getter)]
    pub fn events_relayed(&self) -> u32 {
        u32::try_from(self.inner.relay().events_relayed()).unwrap_or(u32::MAX)
    }
}
