//! Ownership bridge
//!
//! Native objects are reached through three handle types:
//! - [`Owned<T>`]: owns the object and releases it exactly once, when dropped
//!   or through [`Owned::release`]. Consuming calls ([`Owned::into_raw`],
//!   `into_base`, attaching an integrator to a form) move the obligation
//!   elsewhere.
//! - [`Borrowed<'a, T>`]: shared access, never releases.
//! - [`BorrowedMut<'a, T>`]: exclusive access, never releases.
//!
//! All three only deref to `&T`. Exclusive access is a right to pass the
//! pointer to mutating native calls, never a `&mut T`.
//!
//! The lifetime `'a` of a borrowed handle stands for the object that keeps
//! the pointee alive. Handles built from raw pointers carry that as a caller
//! obligation.

use crate::error::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

/// A native type with a release function.
///
/// # Safety
///
/// `delete` must release an object allocated by the native library, and must
/// accept every pointer that the native constructors of `Self` return.
pub unsafe trait NativeObject {
    /// Native type name, used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Release the object.
    ///
    /// # Safety
    ///
    /// `ptr` must be live and must not be used afterwards.
    unsafe fn delete(ptr: *mut Self);
}

/// Owning handle to a native object.
pub struct Owned<T: NativeObject> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

impl<T: NativeObject> Owned<T> {
    /// Take ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live object that nobody else releases.
    pub unsafe fn from_raw(ptr: *mut T) -> Result<Self> {
        NonNull::new(ptr)
            .map(|ptr| Self::from_non_null(ptr))
            .ok_or(Error::NullNativePointer { what: T::TYPE_NAME })
    }

    /// # Safety
    ///
    /// As [`Owned::from_raw`].
    pub(crate) unsafe fn from_non_null(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Wrap the result of a native constructor, which never returns null.
    ///
    /// # Safety
    ///
    /// As [`Owned::from_raw`].
    pub(crate) unsafe fn from_fresh(ptr: *mut T) -> Self {
        debug_assert!(!ptr.is_null(), "native constructor returned null");
        Self::from_non_null(NonNull::new_unchecked(ptr))
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_non_null(&mut self) -> NonNull<T> {
        self.ptr
    }

    pub fn borrow(&self) -> Borrowed<'_, T> {
        Borrowed::from_ref(self)
    }

    pub fn borrow_mut(&mut self) -> BorrowedMut<'_, T> {
        unsafe { BorrowedMut::from_non_null(self.ptr) }
    }

    /// Give up ownership without releasing.
    pub fn into_raw(self) -> NonNull<T> {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }

    /// Release the object now.
    pub fn release(self) {
        drop(self)
    }
}

impl<T: NativeObject> Drop for Owned<T> {
    fn drop(&mut self) {
        log::trace!("releasing native {} at {:p}", T::TYPE_NAME, self.ptr);
        unsafe { T::delete(self.ptr.as_ptr()) }
    }
}

impl<T: NativeObject> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: NativeObject> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned<{}>({:p})", T::TYPE_NAME, self.ptr)
    }
}

/// Shared, non-owning handle.
pub struct Borrowed<'a, T> {
    ptr: NonNull<T>,
    _borrow: PhantomData<&'a T>,
}

impl<'a, T> Borrowed<'a, T> {
    /// Borrow a pointer handed out by a native accessor.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or stay live and unmutated for `'a`.
    pub unsafe fn from_raw(ptr: *const T) -> Result<Self> {
        Ok(Self::from_non_null(crate::guard::non_null(
            std::any::type_name::<T>(),
            ptr,
        )?))
    }

    pub(crate) unsafe fn from_non_null(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _borrow: PhantomData,
        }
    }

    pub fn from_ref(value: &'a T) -> Self {
        Self {
            ptr: NonNull::from(value),
            _borrow: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Turn shared access into exclusive access.
    ///
    /// Some native operations mutate objects that are only reachable
    /// through shared accessors. This is the single place where that
    /// relaxation happens.
    ///
    /// # Safety
    ///
    /// No other handle or reference to the object may be used while the
    /// returned handle is alive.
    pub unsafe fn assume_exclusive(self) -> BorrowedMut<'a, T> {
        log::debug!("assuming exclusive access to {}", std::any::type_name::<T>());
        BorrowedMut {
            ptr: self.ptr,
            _borrow: PhantomData,
        }
    }
}

impl<T> Clone for Borrowed<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Borrowed<'_, T> {}

impl<T> Deref for Borrowed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Borrowed<{}>({:p})", std::any::type_name::<T>(), self.ptr)
    }
}

/// Exclusive, non-owning handle.
pub struct BorrowedMut<'a, T> {
    ptr: NonNull<T>,
    _borrow: PhantomData<&'a mut T>,
}

impl<'a, T> BorrowedMut<'a, T> {
    /// # Safety
    ///
    /// `ptr` must be null or stay live for `'a`, with no other access to it
    /// during `'a`.
    pub unsafe fn from_raw(ptr: *mut T) -> Result<Self> {
        let ptr = crate::guard::non_null(std::any::type_name::<T>(), ptr)?;
        Ok(Self {
            ptr,
            _borrow: PhantomData,
        })
    }

    pub(crate) unsafe fn from_non_null(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _borrow: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_non_null(&mut self) -> NonNull<T> {
        self.ptr
    }

    /// Shorter-lived exclusive handle to the same object.
    pub fn reborrow(&mut self) -> BorrowedMut<'_, T> {
        BorrowedMut {
            ptr: self.ptr,
            _borrow: PhantomData,
        }
    }

    /// Downgrade to shared access for the rest of `'a`.
    pub fn into_shared(self) -> Borrowed<'a, T> {
        Borrowed {
            ptr: self.ptr,
            _borrow: PhantomData,
        }
    }
}

impl<T> Deref for BorrowedMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> fmt::Debug for BorrowedMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BorrowedMut<{}>({:p})", std::any::type_name::<T>(), self.ptr)
    }
}
