//! Native fault reporting
//!
//! Faults are raised with [`native_error`]. With exception support compiled in
//! and [`ErrorAction::Throw`] selected, the fault unwinds with a
//! [`NativeException`] payload; otherwise the process aborts.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Payload of every exception raised by the native library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeException {
    message: String,
}

impl NativeException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The exception message, as raised.
    pub fn what(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for NativeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NativeException {}

/// What the native library does when a fault is raised.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Print the message and abort the process.
    Abort = 0,
    /// Raise a [`NativeException`].
    Throw = 1,
}

static ERROR_ACTION: AtomicU8 = AtomicU8::new(ErrorAction::Abort as u8);

pub extern "C-unwind" fn set_error_action(action: ErrorAction) {
    ERROR_ACTION.store(action as u8, Ordering::SeqCst);
}

pub extern "C-unwind" fn get_error_action() -> ErrorAction {
    match ERROR_ACTION.load(Ordering::SeqCst) {
        1 => ErrorAction::Throw,
        _ => ErrorAction::Abort,
    }
}

/// Raise a native fault.
pub(crate) fn native_error(message: String) -> ! {
    if crate::NATIVE_USE_EXCEPTIONS && get_error_action() == ErrorAction::Throw {
        // resume_unwind skips the panic hook, like a C++ throw.
        std::panic::resume_unwind(Box::new(NativeException::new(message)));
    }
    eprintln!("\n\nfemlink native error: {message}\n ... aborting");
    std::process::abort()
}
