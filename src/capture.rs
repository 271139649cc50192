//! Panic information capture.
//!
//! A caught panic only hands us its payload. The message is in there, but the
//! location the panic was raised at is only visible to the panic hook. While a
//! run is active on a thread, the hook installed here stores that location in a
//! thread local and keeps the default hook from printing to stderr.
//!
//! The hook is installed once per process and only intercepts panics of threads
//! that currently hold a [`CapturePanicGuard`]. Every other thread still reaches
//! the previously installed hook, so parallel `cargo test` threads keep their
//! usual output.

use std::{
    cell::{Cell, RefCell},
    panic::{self, PanicHookInfo},
    sync::Once,
};

use crate::example::SourceLocation;

static INSTALL_HOOK: Once = Once::new();

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<SourceLocation>> = const { RefCell::new(None) };
}

/// Keeps panic capture enabled for the current thread while alive.
#[derive(Debug)]
pub struct CapturePanicGuard {
    previous: bool,
}

impl CapturePanicGuard {
    pub fn install() -> Self {
        INSTALL_HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                let capturing = CAPTURING.try_with(Cell::get).unwrap_or(false);
                match capturing {
                    true => record(info),
                    false => previous(info),
                }
            }));
        });
        let previous = CAPTURING.with(|capturing| capturing.replace(true));
        Self { previous }
    }
}

impl Drop for CapturePanicGuard {
    fn drop(&mut self) {
        CAPTURING.with(|capturing| capturing.set(self.previous));
    }
}

fn record(info: &PanicHookInfo<'_>) {
    let location = info.location().map(SourceLocation::from);
    let _ = LAST_PANIC.try_with(|last| *last.borrow_mut() = location);
}

/// Take the location of the last panic captured on this thread.
pub fn take_panic_location() -> Option<SourceLocation> {
    LAST_PANIC.with_borrow_mut(Option::take)
}
