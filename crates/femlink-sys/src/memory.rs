//! Native allocator
//!
//! Every contiguous buffer owned by a native object comes from here, and must
//! go back here with the same length. The per-thread counters make leaks and
//! double releases observable from tests.

use std::cell::Cell;
use std::os::raw::c_int;
use std::ptr;

thread_local! {
    static LIVE_OBJECTS: Cell<usize> = const { Cell::new(0) };
    static LIVE_ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>, up: bool) {
    counter.with(|n| {
        let value = if up {
            n.get() + 1
        } else {
            n.get().checked_sub(1).unwrap_or_else(|| {
                crate::error::native_error("native release without a matching allocation".into())
            })
        };
        n.set(value);
    });
}

/// Heap-allocate a native object.
pub(crate) fn new_object<T>(value: T) -> *mut T {
    bump(&LIVE_OBJECTS, true);
    Box::into_raw(Box::new(value))
}

/// Release a native object created with [`new_object`]. Null is a no-op.
pub(crate) unsafe fn delete_object<T>(ptr: *mut T) {
    if ptr.is_null() {
        return;
    }
    bump(&LIVE_OBJECTS, false);
    drop(Box::from_raw(ptr));
}

pub(crate) fn alloc_slice<T: Copy + Default>(len: usize) -> *mut T {
    bump(&LIVE_ALLOCATIONS, true);
    let buffer: Box<[T]> = vec![T::default(); len].into_boxed_slice();
    Box::into_raw(buffer) as *mut T
}

pub(crate) unsafe fn free_slice<T>(data: *mut T, len: usize) {
    if data.is_null() {
        return;
    }
    bump(&LIVE_ALLOCATIONS, false);
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
}

/// Copy `values` into a fresh native buffer.
pub(crate) fn alloc_copy<T: Copy + Default>(values: &[T]) -> *mut T {
    let data = alloc_slice::<T>(values.len());
    unsafe { ptr::copy_nonoverlapping(values.as_ptr(), data, values.len()) };
    data
}

pub unsafe extern "C-unwind" fn native_alloc_int(len: c_int) -> *mut c_int {
    native_verify!(len >= 0, "native_alloc_int: negative length {len}");
    alloc_slice(len as usize)
}

pub unsafe extern "C-unwind" fn native_free_int(data: *mut c_int, len: c_int) {
    free_slice(data, len.max(0) as usize)
}

pub unsafe extern "C-unwind" fn native_alloc_real(len: c_int) -> *mut f64 {
    native_verify!(len >= 0, "native_alloc_real: negative length {len}");
    alloc_slice(len as usize)
}

pub unsafe extern "C-unwind" fn native_free_real(data: *mut f64, len: c_int) {
    free_slice(data, len.max(0) as usize)
}

/// Native objects alive on the calling thread.
pub extern "C-unwind" fn native_live_objects() -> usize {
    LIVE_OBJECTS.with(Cell::get)
}

/// Native buffers alive on the calling thread.
pub extern "C-unwind" fn native_live_allocations() -> usize {
    LIVE_ALLOCATIONS.with(Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_free_balances() {
        let before = native_live_allocations();
        unsafe {
            let data = native_alloc_real(16);
            assert!(!data.is_null());
            assert_eq!(*data.add(15), 0.0);
            assert_eq!(native_live_allocations(), before + 1);
            native_free_real(data, 16);
        }
        assert_eq!(native_live_allocations(), before);
    }

    #[test]
    fn test_zero_length_allocation() {
        unsafe {
            let data = native_alloc_int(0);
            assert!(!data.is_null());
            native_free_int(data, 0);
        }
    }

    #[test]
    fn test_object_counter() {
        let before = native_live_objects();
        let obj = new_object(42_i32);
        assert_eq!(native_live_objects(), before + 1);
        unsafe { delete_object(obj) };
        assert_eq!(native_live_objects(), before);
        unsafe { delete_object::<i32>(std::ptr::null_mut()) };
        assert_eq!(native_live_objects(), before);
    }
}
