//! Buffer views
//!
//! Native contiguous storage (`Vector`, `Array<int>`, grid function values)
//! is exposed as slices without copying. A view either aliases storage owned
//! by someone else (`owns == false`, bounded by the source's lifetime) or
//! owns a buffer from the native allocator and releases it exactly once.

use crate::cast::{AsBase, AsBaseMut};
use crate::error::{Error, Result};
use crate::guard::guarded;
use crate::handle::Owned;
use femlink_sys as sys;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::os::raw::c_int;

/// Element type of a native buffer.
///
/// # Safety
///
/// `native_alloc` and `native_free` must be the native allocator pair for
/// `Self`.
pub unsafe trait Element: Copy + PartialEq + fmt::Debug + 'static {
    /// # Safety
    ///
    /// `len` must be non-negative.
    unsafe fn native_alloc(len: c_int) -> *mut Self;

    /// # Safety
    ///
    /// `ptr` must come from `native_alloc(len)`.
    unsafe fn native_free(ptr: *mut Self, len: c_int);
}

unsafe impl Element for i32 {
    unsafe fn native_alloc(len: c_int) -> *mut Self {
        sys::native_alloc_int(len)
    }

    unsafe fn native_free(ptr: *mut Self, len: c_int) {
        sys::native_free_int(ptr, len)
    }
}

unsafe impl Element for f64 {
    unsafe fn native_alloc(len: c_int) -> *mut Self {
        sys::native_alloc_real(len)
    }

    unsafe fn native_free(ptr: *mut Self, len: c_int) {
        sys::native_free_real(ptr, len)
    }
}

/// Length as the native side sees it. Oversized lengths become -1, which
/// every native size check rejects.
pub(crate) fn native_len(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(-1)
}

/// An object with contiguous native storage of `T`.
pub trait ContiguousSource<T: Element> {
    fn contiguous(&self) -> (*const T, usize);
}

/// Mutable counterpart of [`ContiguousSource`].
pub trait ContiguousSourceMut<T: Element>: ContiguousSource<T> {
    fn contiguous_mut(&mut self) -> (*mut T, usize);
}

impl<S: AsBase<sys::Vector> + ?Sized> ContiguousSource<f64> for S {
    fn contiguous(&self) -> (*const f64, usize) {
        let v = self.as_base();
        unsafe { (sys::Vector_GetData(v), sys::Vector_Size(v) as usize) }
    }
}

impl<S: AsBaseMut<sys::Vector> + ?Sized> ContiguousSourceMut<f64> for S {
    fn contiguous_mut(&mut self) -> (*mut f64, usize) {
        let mut v = self.as_base_mut();
        let v = v.as_mut_ptr();
        unsafe { (sys::Vector_GetDataMut(v), sys::Vector_Size(v) as usize) }
    }
}

impl<S: AsBase<sys::ArrayInt> + ?Sized> ContiguousSource<i32> for S {
    fn contiguous(&self) -> (*const i32, usize) {
        let a = self.as_base();
        unsafe { (sys::ArrayInt_GetData(a), sys::ArrayInt_Size(a) as usize) }
    }
}

impl<S: AsBaseMut<sys::ArrayInt> + ?Sized> ContiguousSourceMut<i32> for S {
    fn contiguous_mut(&mut self) -> (*mut i32, usize) {
        let mut a = self.as_base_mut();
        let a = a.as_mut_ptr();
        unsafe { (sys::ArrayInt_GetDataMut(a), sys::ArrayInt_Size(a) as usize) }
    }
}

fn allocate<T: Element>(len: usize) -> Result<*mut T> {
    guarded("native_alloc", || unsafe { T::native_alloc(native_len(len)) })
}

unsafe fn slice<'s, T>(ptr: *const T, len: usize) -> &'s [T] {
    if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

unsafe fn slice_mut<'s, T>(ptr: *mut T, len: usize) -> &'s mut [T] {
    if len == 0 {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(ptr, len)
    }
}

/// Read-only view of native storage.
pub struct ArrayView<'a, T: Element> {
    ptr: *const T,
    len: usize,
    owns: bool,
    _source: PhantomData<&'a [T]>,
}

impl<'a, T: Element> ArrayView<'a, T> {
    /// Alias the storage of `source` without copying.
    pub fn view_of<S: ContiguousSource<T> + ?Sized>(source: &'a S) -> Self {
        let (ptr, len) = source.contiguous();
        Self {
            ptr,
            len,
            owns: false,
            _source: PhantomData,
        }
    }

    /// Copy the contents into a buffer from the native allocator.
    pub fn owned_copy(&self) -> Result<ArrayView<'static, T>> {
        let ptr = allocate::<T>(self.len)?;
        let copy = unsafe { slice_mut(ptr, self.len) };
        copy.copy_from_slice(self);
        Ok(ArrayView {
            ptr,
            len: self.len,
            owns: true,
            _source: PhantomData,
        })
    }

    /// View a host buffer.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized elements that stay valid and
    /// unmutated for `'a`. With `take_ownership` the buffer must come from
    /// the native allocator for `T`, and is released when the view drops.
    pub unsafe fn from_host_buffer(
        ptr: *const T,
        len: usize,
        take_ownership: bool,
    ) -> Result<Self> {
        if ptr.is_null() && len > 0 {
            return Err(Error::NullNativePointer { what: "host buffer" });
        }
        Ok(Self {
            ptr,
            len,
            owns: take_ownership && !ptr.is_null(),
            _source: PhantomData,
        })
    }

    /// Whether dropping the view releases the buffer.
    pub fn owns(&self) -> bool {
        self.owns
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { slice(self.ptr, self.len) }
    }
}

impl<T: Element> Deref for ArrayView<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> Drop for ArrayView<'_, T> {
    fn drop(&mut self) {
        if self.owns {
            unsafe { T::native_free(self.ptr.cast_mut(), native_len(self.len)) }
        }
    }
}

impl<T: Element> fmt::Debug for ArrayView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayView")
            .field("values", &self.as_slice())
            .field("owns", &self.owns)
            .finish()
    }
}

/// Mutable view of native storage.
pub struct ArrayViewMut<'a, T: Element> {
    ptr: *mut T,
    len: usize,
    owns: bool,
    _source: PhantomData<&'a mut [T]>,
}

impl<'a, T: Element> ArrayViewMut<'a, T> {
    /// Alias the storage of `source` without copying.
    pub fn view_of_mut<S: ContiguousSourceMut<T> + ?Sized>(source: &'a mut S) -> Self {
        let (ptr, len) = source.contiguous_mut();
        Self {
            ptr,
            len,
            owns: false,
            _source: PhantomData,
        }
    }

    /// View a mutable host buffer.
    ///
    /// # Safety
    ///
    /// As [`ArrayView::from_host_buffer`], with exclusive access for `'a`.
    pub unsafe fn from_host_buffer_mut(
        ptr: *mut T,
        len: usize,
        take_ownership: bool,
    ) -> Result<Self> {
        if ptr.is_null() && len > 0 {
            return Err(Error::NullNativePointer { what: "host buffer" });
        }
        Ok(Self {
            ptr,
            len,
            owns: take_ownership && !ptr.is_null(),
            _source: PhantomData,
        })
    }

    pub fn owns(&self) -> bool {
        self.owns
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { slice(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice_mut(self.ptr, self.len) }
    }

    /// Write `value` at `index`; out of range is a host bug and panics.
    pub fn set(&mut self, index: usize, value: T) {
        self.as_mut_slice()[index] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    /// Give up the buffer as `(ptr, len, owns)` without releasing it.
    pub fn into_raw_parts(self) -> (*mut T, usize, bool) {
        let parts = (self.ptr, self.len, self.owns);
        std::mem::forget(self);
        parts
    }
}

impl<T: Element> ArrayViewMut<'static, T> {
    /// A zeroed buffer from the native allocator, owned by the view.
    pub fn allocate(len: usize) -> Result<Self> {
        let ptr = allocate::<T>(len)?;
        Ok(Self {
            ptr,
            len,
            owns: true,
            _source: PhantomData,
        })
    }
}

impl<T: Element> Deref for ArrayViewMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for ArrayViewMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> Drop for ArrayViewMut<'_, T> {
    fn drop(&mut self) {
        if self.owns {
            unsafe { T::native_free(self.ptr, native_len(self.len)) }
        }
    }
}

impl<T: Element> fmt::Debug for ArrayViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayViewMut")
            .field("values", &self.as_slice())
            .field("owns", &self.owns)
            .finish()
    }
}

/// Native `Array<int>`.
#[derive(Debug)]
pub struct ArrayInt {
    inner: Owned<sys::ArrayInt>,
}

forward_base!(impl ArrayInt => sys::ArrayInt);

impl ArrayInt {
    pub fn new() -> Self {
        Self {
            inner: unsafe { Owned::from_fresh(sys::ArrayInt_new()) },
        }
    }

    /// `len` zeros.
    pub fn with_len(len: usize) -> Result<Self> {
        let ptr = guarded("ArrayInt_with_len", || unsafe {
            sys::ArrayInt_with_len(native_len(len))
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }

    /// Copy `values` into native storage owned by the array.
    pub fn from_slice(values: &[i32]) -> Result<Self> {
        let mut buffer = ArrayViewMut::<i32>::allocate(values.len())?;
        buffer.copy_from_slice(values);
        Self::from_owned_view(buffer)
    }

    /// Adopt a buffer, owned by the array when the view owned it.
    pub fn from_owned_view(view: ArrayViewMut<'static, i32>) -> Result<Self> {
        let (ptr, len, owns) = view.into_raw_parts();
        unsafe { Self::from_host_buffer(ptr, len, owns) }
    }

    /// Wrap a host buffer.
    ///
    /// # Safety
    ///
    /// `data` must point to `len` elements that outlive the array. With
    /// `own_data` the buffer must come from the native allocator and is
    /// released by the array.
    pub unsafe fn from_host_buffer(data: *mut i32, len: usize, own_data: bool) -> Result<Self> {
        let ptr = guarded("ArrayInt_from_slice", || {
            sys::ArrayInt_from_slice(data, native_len(len), own_data)
        })?;
        Ok(Self {
            inner: Owned::from_fresh(ptr),
        })
    }

    pub fn len(&self) -> usize {
        unsafe { sys::ArrayInt_Size(self.inner.as_ptr()) as usize }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn owns_data(&self) -> bool {
        unsafe { sys::ArrayInt_OwnsData(self.inner.as_ptr()) }
    }

    pub fn set_all(&mut self, value: i32) {
        unsafe { sys::ArrayInt_SetAll(self.inner.as_mut_ptr(), value) }
    }

    pub fn push(&mut self, value: i32) {
        unsafe { sys::ArrayInt_Append(self.inner.as_mut_ptr(), value) }
    }

    pub fn view(&self) -> ArrayView<'_, i32> {
        ArrayView::view_of(self)
    }

    pub fn view_mut(&mut self) -> ArrayViewMut<'_, i32> {
        ArrayViewMut::view_of_mut(self)
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.view().to_vec()
    }
}

impl Default for ArrayInt {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ArrayInt {
    /// Deep copy into storage owned by the new array.
    fn clone(&self) -> Self {
        Self {
            inner: unsafe { Owned::from_fresh(sys::ArrayInt_copy(self.inner.as_ptr())) },
        }
    }
}
