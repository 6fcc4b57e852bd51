//! Callback trampolines
//!
//! The native library calls host code through a plain function pointer plus
//! an opaque `data` pointer. A callback boxes the closure, hands its address
//! out as `data`, and supplies a trampoline monomorphised for the closure
//! type that casts `data` back and forwards the call.
//!
//! The box is freed when the callback drops, so the native object holding
//! the pair must be released first.

use femlink_sys as sys;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

unsafe fn point<'p>(x: *const sys::Vector) -> &'p [f64] {
    let len = sys::Vector_Size(x) as usize;
    if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(sys::Vector_GetData(x), len)
    }
}

unsafe fn output<'p>(out: *mut sys::Vector) -> &'p mut [f64] {
    let len = sys::Vector_Size(out) as usize;
    if len == 0 {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(sys::Vector_GetDataMut(out), len)
    }
}

unsafe extern "C-unwind" fn scalar_trampoline<F>(x: *const sys::Vector, data: *mut c_void) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    let f = &*(data as *const F);
    f(point(x))
}

unsafe extern "C-unwind" fn vector_trampoline<F>(
    x: *const sys::Vector,
    out: *mut sys::Vector,
    data: *mut c_void,
) where
    F: Fn(&[f64], &mut [f64]),
{
    let f = &*(data as *const F);
    f(point(x), output(out))
}

unsafe fn drop_boxed<F>(data: *mut c_void) {
    drop(Box::from_raw(data as *mut F));
}

/// A scalar field `f(x) -> value` callable from native code.
pub struct NativeCallback<'f> {
    data: NonNull<c_void>,
    trampoline: sys::ScalarFieldFn,
    drop_closure: unsafe fn(*mut c_void),
    _closure: PhantomData<Box<dyn Fn(&[f64]) -> f64 + 'f>>,
}

impl<'f> NativeCallback<'f> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + 'f,
    {
        let data = NonNull::from(Box::leak(Box::new(f))).cast::<c_void>();
        Self {
            data,
            trampoline: scalar_trampoline::<F>,
            drop_closure: drop_boxed::<F>,
            _closure: PhantomData,
        }
    }

    /// Function pointer to hand to the native side.
    pub fn fn_ptr(&self) -> sys::ScalarFieldFn {
        self.trampoline
    }

    /// Opaque pointer to pass along with [`NativeCallback::fn_ptr`].
    pub fn data(&self) -> *mut c_void {
        self.data.as_ptr()
    }

    /// Call through the trampoline, the way the native side does.
    pub fn invoke(&self, x: &[f64]) -> f64 {
        let mut values = x.to_vec();
        let len = crate::array::native_len(values.len());
        unsafe {
            let v = sys::Vector_from_data(values.as_mut_ptr(), len, false);
            let result = (self.trampoline)(v, self.data());
            sys::Vector_delete(v);
            result
        }
    }
}

impl Drop for NativeCallback<'_> {
    fn drop(&mut self) {
        unsafe { (self.drop_closure)(self.data.as_ptr()) }
    }
}

impl fmt::Debug for NativeCallback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCallback")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// A vector field `f(x, out)` callable from native code. `out` is sized by
/// the native side.
pub struct NativeVectorCallback<'f> {
    data: NonNull<c_void>,
    trampoline: sys::VectorFieldFn,
    drop_closure: unsafe fn(*mut c_void),
    _closure: PhantomData<Box<dyn Fn(&[f64], &mut [f64]) + 'f>>,
}

impl<'f> NativeVectorCallback<'f> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[f64], &mut [f64]) + 'f,
    {
        let data = NonNull::from(Box::leak(Box::new(f))).cast::<c_void>();
        Self {
            data,
            trampoline: vector_trampoline::<F>,
            drop_closure: drop_boxed::<F>,
            _closure: PhantomData,
        }
    }

    pub fn fn_ptr(&self) -> sys::VectorFieldFn {
        self.trampoline
    }

    pub fn data(&self) -> *mut c_void {
        self.data.as_ptr()
    }
}

impl Drop for NativeVectorCallback<'_> {
    fn drop(&mut self) {
        unsafe { (self.drop_closure)(self.data.as_ptr()) }
    }
}

impl fmt::Debug for NativeVectorCallback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeVectorCallback")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
