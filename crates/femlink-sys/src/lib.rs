//! femlink-sys - native object model behind the femlink bindings
//!
//! This crate is the "native" side of the boundary: an opaque, pointer-based
//! finite element object model exposed through plain `<Type>_<Operation>`
//! functions with the `C-unwind` ABI. It behaves the way the external
//! numerical library does at the boundary:
//! - objects are heap allocated and released through `*_delete` functions
//! - derived types embed their base as the first field (`#[repr(C)]`) and are
//!   reached through explicit `<Derived>_as_<Base>` casts
//! - polymorphic objects dispatch through function-pointer tables
//! - faults are raised as [`NativeException`] unwinds (or abort the process,
//!   depending on [`ErrorAction`])
//! - contiguous buffers come from the native allocator in [`memory`]
//!
//! The numerics are intentionally minimal (structured Cartesian meshes,
//! lattice-based degrees of freedom, lumped forms). Nothing in `femlink`
//! depends on them beyond the observable results of the boundary calls.
//!
//! # Safety
//!
//! Every function taking a pointer requires a live object of the stated type
//! that was produced by this crate. Nothing here is thread safe.

#![allow(non_snake_case)]
#![allow(non_camel_case_types)]
#![allow(improper_ctypes_definitions)]
#![allow(clippy::missing_safety_doc)]

/// Raise a native fault when `cond` does not hold.
macro_rules! native_verify {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::error::native_error(format!($($arg)+))
        }
    };
}

pub mod coefficient;
pub mod error;
pub mod fe;
pub mod forms;
pub mod gridfunc;
pub mod linalg;
pub mod memory;
pub mod mesh;
pub mod vector;

pub use coefficient::*;
pub use error::{get_error_action, set_error_action, ErrorAction, NativeException};
pub use fe::*;
pub use forms::*;
pub use gridfunc::*;
pub use linalg::*;
pub use memory::*;
pub use mesh::*;
pub use vector::*;

/// Floating point type of the native library.
pub type real_t = f64;

/// Whether the native library was built with exception support.
///
/// Without it every fault aborts the process regardless of the configured
/// [`ErrorAction`].
pub const NATIVE_USE_EXCEPTIONS: bool = cfg!(feature = "exceptions");

/// Number of basis types known to the native library.
pub const NUM_BASIS_TYPES: i32 = 9;

/// Read a byte path handed over the boundary.
///
/// # Safety
///
/// `path` must point to `len` readable bytes obtained from
/// `OsStr::as_encoded_bytes` in this process.
pub(crate) unsafe fn path_from_raw(path: *const u8, len: usize) -> std::path::PathBuf {
    native_verify!(!path.is_null() || len == 0, "invalid path argument");
    if len == 0 {
        return std::path::PathBuf::new();
    }
    let bytes = std::slice::from_raw_parts(path, len);
    std::path::PathBuf::from(std::ffi::OsStr::from_encoded_bytes_unchecked(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_flag_follows_feature() {
        assert_eq!(NATIVE_USE_EXCEPTIONS, cfg!(feature = "exceptions"));
    }

    #[test]
    fn test_num_basis_types() {
        assert_eq!(NUM_BASIS_TYPES, 9);
    }
}
