//! Exception-to-Result translation
//!
//! Boundary calls that may raise a native fault run inside [`guarded`]. A
//! [`NativeException`] unwinding out of the call becomes
//! [`Error::NativeException`]; any other unwind (a host panic, possibly from
//! inside a callback) is resumed untouched.

use crate::error::{Error, Result};
use femlink_sys::NativeException;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;

/// Run the boundary call `f`, translating native exceptions raised by `op`.
pub fn guarded<R>(op: &'static str, f: impl FnOnce() -> R) -> Result<R> {
    crate::config::active();
    // A faulting native call leaves its outputs untouched.
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<NativeException>() {
            Ok(exception) => {
                log::debug!("{op} raised a native exception: {}", exception.what());
                Err(Error::NativeException {
                    op,
                    message: exception.what().to_owned(),
                })
            }
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// Check a pointer returned by a native query before it is dereferenced.
pub fn non_null<T>(what: &'static str, ptr: *const T) -> Result<NonNull<T>> {
    NonNull::new(ptr.cast_mut()).ok_or_else(|| {
        log::debug!("{what} is null");
        Error::NullNativePointer { what }
    })
}
