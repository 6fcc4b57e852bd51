//! Scalar and vector coefficients
//!
//! `Coefficient` and `VectorCoefficient` are abstract bases dispatching
//! through `eval`/`drop_fn`. Function coefficients call back into the host
//! through a plain function pointer plus an opaque data pointer.

use crate::memory::{delete_object, new_object};
use crate::vector::Vector;
use std::os::raw::{c_int, c_void};

/// Scalar field callback: `f(x, data) -> value`.
pub type ScalarFieldFn = unsafe extern "C-unwind" fn(x: *const Vector, data: *mut c_void) -> f64;

/// Vector field callback: `f(x, out, data)`; `out` has the coefficient's vdim.
pub type VectorFieldFn =
    unsafe extern "C-unwind" fn(x: *const Vector, out: *mut Vector, data: *mut c_void);

#[repr(C)]
pub struct Coefficient {
    eval: unsafe fn(*const Coefficient, &[f64]) -> f64,
    drop_fn: unsafe fn(*mut Coefficient),
}

#[repr(C)]
pub struct VectorCoefficient {
    vdim: c_int,
    eval: unsafe fn(*const VectorCoefficient, &[f64], &mut [f64]),
    drop_fn: unsafe fn(*mut VectorCoefficient),
}

/// Evaluate `coeff` at `point`.
pub(crate) unsafe fn eval_scalar(coeff: *const Coefficient, point: &[f64]) -> f64 {
    ((*coeff).eval)(coeff, point)
}

pub(crate) unsafe fn eval_vector(coeff: *const VectorCoefficient, point: &[f64], out: &mut [f64]) {
    ((*coeff).eval)(coeff, point, out)
}

pub(crate) unsafe fn vector_dim(coeff: *const VectorCoefficient) -> usize {
    (*coeff).vdim as usize
}

/// Generate the `<Derived>_as_<Base>` casts and the typed destructor.
macro_rules! derived {
    ($derived:ident : $base:ident, $as_base:ident, $as_mut_base:ident, $delete:ident) => {
        pub unsafe extern "C-unwind" fn $as_base(obj: *const $derived) -> *const $base {
            obj as *const $base
        }

        pub unsafe extern "C-unwind" fn $as_mut_base(obj: *mut $derived) -> *mut $base {
            obj as *mut $base
        }

        pub unsafe extern "C-unwind" fn $delete(obj: *mut $derived) {
            delete_object(obj)
        }
    };
}

/////////////////////////
// ConstantCoefficient //
/////////////////////////

#[repr(C)]
pub struct ConstantCoefficient {
    base: Coefficient,
    constant: f64,
}

unsafe fn constant_eval(coeff: *const Coefficient, _point: &[f64]) -> f64 {
    (*(coeff as *const ConstantCoefficient)).constant
}

unsafe fn constant_drop(coeff: *mut Coefficient) {
    delete_object(coeff as *mut ConstantCoefficient)
}

pub unsafe extern "C-unwind" fn ConstantCoefficient_new(constant: f64) -> *mut ConstantCoefficient {
    new_object(ConstantCoefficient {
        base: Coefficient {
            eval: constant_eval,
            drop_fn: constant_drop,
        },
        constant,
    })
}

derived!(
    ConstantCoefficient: Coefficient,
    ConstantCoefficient_as_Coefficient,
    ConstantCoefficient_as_mut_Coefficient,
    ConstantCoefficient_delete
);

/////////////////////////
// FunctionCoefficient //
/////////////////////////

#[repr(C)]
pub struct FunctionCoefficient {
    base: Coefficient,
    function: ScalarFieldFn,
    data: *mut c_void,
}

unsafe fn function_eval(coeff: *const Coefficient, point: &[f64]) -> f64 {
    let coeff = &*(coeff as *const FunctionCoefficient);
    let mut coords = point.to_vec();
    let x = Vector::borrowed(&mut coords);
    (coeff.function)(&x, coeff.data)
}

unsafe fn function_drop(coeff: *mut Coefficient) {
    delete_object(coeff as *mut FunctionCoefficient)
}

/// `data` is handed back to `function` on every evaluation and never
/// released by the coefficient.
pub unsafe extern "C-unwind" fn FunctionCoefficient_new(
    function: ScalarFieldFn,
    data: *mut c_void,
) -> *mut FunctionCoefficient {
    new_object(FunctionCoefficient {
        base: Coefficient {
            eval: function_eval,
            drop_fn: function_drop,
        },
        function,
        data,
    })
}

derived!(
    FunctionCoefficient: Coefficient,
    FunctionCoefficient_as_Coefficient,
    FunctionCoefficient_as_mut_Coefficient,
    FunctionCoefficient_delete
);

/// Virtual destructor.
pub unsafe extern "C-unwind" fn Coefficient_delete(coeff: *mut Coefficient) {
    if !coeff.is_null() {
        ((*coeff).drop_fn)(coeff)
    }
}

pub unsafe extern "C-unwind" fn Coefficient_Eval(
    coeff: *const Coefficient,
    x: *const Vector,
) -> f64 {
    eval_scalar(coeff, (*x).as_slice())
}

///////////////////////////////
// VectorConstantCoefficient //
///////////////////////////////

#[repr(C)]
pub struct VectorConstantCoefficient {
    base: VectorCoefficient,
    values: Vec<f64>,
}

unsafe fn vector_constant_eval(coeff: *const VectorCoefficient, _point: &[f64], out: &mut [f64]) {
    out.copy_from_slice(&(*(coeff as *const VectorConstantCoefficient)).values);
}

unsafe fn vector_constant_drop(coeff: *mut VectorCoefficient) {
    delete_object(coeff as *mut VectorConstantCoefficient)
}

/// Copies the entries of `values`.
pub unsafe extern "C-unwind" fn VectorConstantCoefficient_new(
    values: *const Vector,
) -> *mut VectorConstantCoefficient {
    let values = (*values).as_slice().to_vec();
    new_object(VectorConstantCoefficient {
        base: VectorCoefficient {
            vdim: values.len() as c_int,
            eval: vector_constant_eval,
            drop_fn: vector_constant_drop,
        },
        values,
    })
}

derived!(
    VectorConstantCoefficient: VectorCoefficient,
    VectorConstantCoefficient_as_VectorCoefficient,
    VectorConstantCoefficient_as_mut_VectorCoefficient,
    VectorConstantCoefficient_delete
);

///////////////////////////////
// VectorFunctionCoefficient //
///////////////////////////////

#[repr(C)]
pub struct VectorFunctionCoefficient {
    base: VectorCoefficient,
    function: VectorFieldFn,
    data: *mut c_void,
}

unsafe fn vector_function_eval(coeff: *const VectorCoefficient, point: &[f64], out: &mut [f64]) {
    let coeff = &*(coeff as *const VectorFunctionCoefficient);
    let mut coords = point.to_vec();
    let x = Vector::borrowed(&mut coords);
    let mut y = Vector::borrowed(out);
    (coeff.function)(&x, &mut y, coeff.data)
}

unsafe fn vector_function_drop(coeff: *mut VectorCoefficient) {
    delete_object(coeff as *mut VectorFunctionCoefficient)
}

pub unsafe extern "C-unwind" fn VectorFunctionCoefficient_new(
    vdim: c_int,
    function: VectorFieldFn,
    data: *mut c_void,
) -> *mut VectorFunctionCoefficient {
    native_verify!(vdim >= 1, "VectorFunctionCoefficient: invalid vdim {vdim}");
    new_object(VectorFunctionCoefficient {
        base: VectorCoefficient {
            vdim,
            eval: vector_function_eval,
            drop_fn: vector_function_drop,
        },
        function,
        data,
    })
}

derived!(
    VectorFunctionCoefficient: VectorCoefficient,
    VectorFunctionCoefficient_as_VectorCoefficient,
    VectorFunctionCoefficient_as_mut_VectorCoefficient,
    VectorFunctionCoefficient_delete
);

pub unsafe extern "C-unwind" fn VectorCoefficient_GetVDim(
    coeff: *const VectorCoefficient,
) -> c_int {
    (*coeff).vdim
}

/// Virtual destructor.
pub unsafe extern "C-unwind" fn VectorCoefficient_delete(coeff: *mut VectorCoefficient) {
    if !coeff.is_null() {
        ((*coeff).drop_fn)(coeff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::native_live_objects;

    unsafe extern "C-unwind" fn radius_squared(x: *const Vector, data: *mut c_void) -> f64 {
        let scale = *(data as *const f64);
        scale * (*x).as_slice().iter().map(|v| v * v).sum::<f64>()
    }

    unsafe extern "C-unwind" fn swap(x: *const Vector, out: *mut Vector, _data: *mut c_void) {
        let x = (*x).as_slice();
        let out = (*out).as_mut_slice();
        out[0] = x[1];
        out[1] = x[0];
    }

    #[test]
    fn test_function_coefficient_passes_data() {
        let mut scale = 2.0_f64;
        unsafe {
            let data = &mut scale as *mut f64 as *mut c_void;
            let coeff = FunctionCoefficient_new(radius_squared, data);
            let value = eval_scalar(FunctionCoefficient_as_Coefficient(coeff), &[1.0, 2.0]);
            assert_eq!(value, 10.0);
            Coefficient_delete(FunctionCoefficient_as_mut_Coefficient(coeff));
        }
    }

    #[test]
    fn test_virtual_delete_releases_derived() {
        let before = native_live_objects();
        unsafe {
            let coeff = ConstantCoefficient_new(3.0);
            assert_eq!(eval_scalar(ConstantCoefficient_as_Coefficient(coeff), &[]), 3.0);
            Coefficient_delete(ConstantCoefficient_as_mut_Coefficient(coeff));
        }
        assert_eq!(native_live_objects(), before);
    }

    #[test]
    fn test_vector_function_coefficient() {
        unsafe {
            let coeff = VectorFunctionCoefficient_new(2, swap, std::ptr::null_mut());
            let base = VectorFunctionCoefficient_as_VectorCoefficient(coeff);
            assert_eq!(VectorCoefficient_GetVDim(base), 2);
            let mut out = [0.0; 2];
            eval_vector(base, &[1.0, 5.0], &mut out);
            assert_eq!(out, [5.0, 1.0]);
            VectorFunctionCoefficient_delete(coeff);
        }
    }
}
