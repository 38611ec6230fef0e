//! Hook registry and the output handle passed to hooks.
//!
//! A hookset maps an opcode's hook code to a caller-supplied closure. The
//! decoder never invokes a hook while holding the global cache mutex (hooks
//! run after a page's bytes have already been pulled out of the cache).

use std::collections::HashMap;

use crate::error::Result;
use super::escape::HookCode;

/// The `&mut` handle passed to a hook, implementing the overflow-to-
/// `unprocessed` buffer policy: writes past the caller's buffer are parked
/// in `unprocessed` rather than dropped, so the next `read_text` call can
/// flush them before resuming escape processing.
pub struct Output<'a> {
    buf: &'a mut [u8],
    written: usize,
    unprocessed: &'a mut Vec<u8>,
}

impl<'a> Output<'a> {
    pub(super) fn new(buf: &'a mut [u8], unprocessed: &'a mut Vec<u8>) -> Self {
        Self { buf, written: 0, unprocessed }
    }

    pub(super) fn written(&self) -> usize {
        self.written
    }

    pub(super) fn is_full(&self) -> bool {
        self.written >= self.buf.len()
    }

    fn push(&mut self, b: u8) {
        if self.written < self.buf.len() {
            self.buf[self.written] = b;
            self.written += 1;
        } else {
            self.unprocessed.push(b);
        }
    }

    pub fn write_byte1(&mut self, b: u8) {
        self.push(b);
    }

    pub fn write_byte2(&mut self, b1: u8, b2: u8) {
        self.push(b1);
        self.push(b2);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

/// A hook: receives the output handle and the escape's decoded arguments
/// (`argv[0]` is the combined `0x1f`-plus-opcode value, matching the STOP_CODE
/// probe's convention; remaining entries are the opcode's own arguments).
pub type HookFn = dyn FnMut(&mut Output, &[u32]) -> Result<()> + Send;

#[derive(Default)]
pub struct Hookset {
    hooks: HashMap<HookCode, Box<HookFn>>,
}

impl Hookset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hook(&mut self, code: HookCode, f: impl FnMut(&mut Output, &[u32]) -> Result<()> + Send + 'static) {
        self.hooks.insert(code, Box::new(f));
    }

    pub fn has_hook(&self, code: HookCode) -> bool {
        self.hooks.contains_key(&code)
    }

    /// Dispatch to a registered hook, if any. Returns `Ok(false)` when no
    /// hook was registered for `code` (the caller then falls back to raw
    /// passthrough).
    pub(super) fn dispatch(&mut self, code: HookCode, out: &mut Output, argv: &[u32]) -> Result<bool> {
        match self.hooks.get_mut(&code) {
            Some(f) => {
                f(out, argv)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
