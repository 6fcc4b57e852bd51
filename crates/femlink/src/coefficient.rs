//! Scalar and vector coefficients
//!
//! Function coefficients own both the native object and the boxed closure it
//! calls back into. The native object is declared first so that it is
//! released before the closure.

use crate::array::native_len;
use crate::callback::{NativeCallback, NativeVectorCallback};
use crate::cast::AsBase;
use crate::error::Result;
use crate::guard::guarded;
use crate::handle::Owned;
use crate::vector::{Vector, VectorLike};
use femlink_sys as sys;

/// Anything that is a native scalar `Coefficient`.
pub trait Coefficient: AsBase<sys::Coefficient> {
    /// Value at the point `x`.
    fn eval(&self, x: &[f64]) -> Result<f64> {
        let point = Vector::from_slice(x)?;
        let coeff: *const sys::Coefficient = self.as_base();
        let point: *const sys::Vector = point.as_base();
        guarded("Coefficient_Eval", || unsafe { sys::Coefficient_Eval(coeff, point) })
    }
}

impl<T: AsBase<sys::Coefficient> + ?Sized> Coefficient for T {}

/// Anything that is a native `VectorCoefficient`.
pub trait VectorCoefficient: AsBase<sys::VectorCoefficient> {
    fn vdim(&self) -> usize {
        unsafe { sys::VectorCoefficient_GetVDim(self.as_base()) as usize }
    }
}

impl<T: AsBase<sys::VectorCoefficient> + ?Sized> VectorCoefficient for T {}

#[derive(Debug)]
pub struct ConstantCoefficient {
    inner: Owned<sys::ConstantCoefficient>,
}

forward_base!(impl ConstantCoefficient => sys::ConstantCoefficient);
forward_base!(impl ConstantCoefficient => sys::Coefficient);

impl ConstantCoefficient {
    pub fn new(constant: f64) -> Self {
        Self {
            inner: unsafe { Owned::from_fresh(sys::ConstantCoefficient_new(constant)) },
        }
    }

    /// Hand over the native object.
    pub fn into_inner(self) -> Owned<sys::ConstantCoefficient> {
        self.inner
    }
}

/// Scalar field computed by a host closure.
#[derive(Debug)]
pub struct FunctionCoefficient<'f> {
    inner: Owned<sys::FunctionCoefficient>,
    callback: NativeCallback<'f>,
}

forward_base!(impl<'f> FunctionCoefficient<'f> => sys::FunctionCoefficient);
forward_base!(impl<'f> FunctionCoefficient<'f> => sys::Coefficient);

impl<'f> FunctionCoefficient<'f> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + 'f,
    {
        let callback = NativeCallback::new(f);
        let ptr = unsafe { sys::FunctionCoefficient_new(callback.fn_ptr(), callback.data()) };
        Self {
            inner: unsafe { Owned::from_fresh(ptr) },
            callback,
        }
    }

    pub fn callback(&self) -> &NativeCallback<'f> {
        &self.callback
    }
}

#[derive(Debug)]
pub struct VectorConstantCoefficient {
    inner: Owned<sys::VectorConstantCoefficient>,
}

forward_base!(impl VectorConstantCoefficient => sys::VectorConstantCoefficient);
forward_base!(impl VectorConstantCoefficient => sys::VectorCoefficient);

impl VectorConstantCoefficient {
    /// Copies the entries of `values`; `vdim` is their count.
    pub fn new<V: VectorLike + ?Sized>(values: &V) -> Self {
        let ptr = unsafe { sys::VectorConstantCoefficient_new(values.as_base()) };
        Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        }
    }
}

/// Vector field of dimension `vdim` computed by a host closure.
#[derive(Debug)]
pub struct VectorFunctionCoefficient<'f> {
    inner: Owned<sys::VectorFunctionCoefficient>,
    callback: NativeVectorCallback<'f>,
}

forward_base!(impl<'f> VectorFunctionCoefficient<'f> => sys::VectorFunctionCoefficient);
forward_base!(impl<'f> VectorFunctionCoefficient<'f> => sys::VectorCoefficient);

impl<'f> VectorFunctionCoefficient<'f> {
    pub fn new<F>(vdim: usize, f: F) -> Result<Self>
    where
        F: Fn(&[f64], &mut [f64]) + 'f,
    {
        let callback = NativeVectorCallback::new(f);
        let (function, data) = (callback.fn_ptr(), callback.data());
        let ptr = guarded("VectorFunctionCoefficient_new", || unsafe {
            sys::VectorFunctionCoefficient_new(native_len(vdim), function, data)
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
            callback,
        })
    }

    pub fn callback(&self) -> &NativeVectorCallback<'f> {
        &self.callback
    }
}
