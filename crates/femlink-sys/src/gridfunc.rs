//! Grid functions: a `Vector` of dof values tied to a finite element space

use crate::coefficient::{eval_scalar, eval_vector, vector_dim, Coefficient, VectorCoefficient};
use crate::fe::{FiniteElementCollection, FiniteElementCollection_delete, FiniteElementSpace};
use crate::memory::{delete_object, new_object};
use crate::vector::Vector;
use std::fmt::Write as _;
use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr;

#[repr(C)]
pub struct GridFunction {
    base: Vector,
    fes: *const FiniteElementSpace,
    /// Set when the grid function owns its space (e.g. mesh nodes).
    own_fes: *mut FiniteElementSpace,
    own_fec: *mut FiniteElementCollection,
}

impl GridFunction {
    pub(crate) fn build(fes: *const FiniteElementSpace) -> Self {
        let size = unsafe { (*fes).vsize() };
        Self {
            base: Vector::with_len(size),
            fes,
            own_fes: ptr::null_mut(),
            own_fec: ptr::null_mut(),
        }
    }

    /// Hand `fes` and `fec` over to this grid function.
    pub(crate) fn take_ownership(
        &mut self,
        fes: *mut FiniteElementSpace,
        fec: *mut FiniteElementCollection,
    ) {
        self.own_fes = fes;
        self.own_fec = fec;
    }

    pub(crate) fn fes(&self) -> &FiniteElementSpace {
        unsafe { &*self.fes }
    }

    pub(crate) fn values(&self) -> &[f64] {
        self.base.as_slice()
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        self.base.as_mut_slice()
    }

    fn write(&self, precision: usize) -> String {
        let fes = self.fes();
        let name = unsafe { CStr::from_ptr(crate::fe::FiniteElementCollection_Name(fes.fec())) };
        let mut out = String::new();
        let _ = writeln!(out, "FiniteElementSpace");
        let _ = writeln!(out, "FiniteElementCollection: {}", name.to_string_lossy());
        let _ = writeln!(out, "VDim: {}", fes.vdim());
        let ordering = unsafe { crate::fe::FiniteElementSpace_GetOrdering(fes) };
        let _ = writeln!(out, "Ordering: {}\n", ordering as c_int);
        for value in self.values() {
            let _ = writeln!(out, "{value:.precision$}");
        }
        out
    }
}

impl Drop for GridFunction {
    fn drop(&mut self) {
        unsafe {
            delete_object(self.own_fes);
            FiniteElementCollection_delete(self.own_fec);
        }
    }
}

pub unsafe extern "C-unwind" fn GridFunction_new(
    fes: *const FiniteElementSpace,
) -> *mut GridFunction {
    new_object(GridFunction::build(fes))
}

pub unsafe extern "C-unwind" fn GridFunction_delete(gf: *mut GridFunction) {
    delete_object(gf)
}

pub unsafe extern "C-unwind" fn GridFunction_as_Vector(gf: *const GridFunction) -> *const Vector {
    gf as *const Vector
}

pub unsafe extern "C-unwind" fn GridFunction_as_mut_Vector(gf: *mut GridFunction) -> *mut Vector {
    gf as *mut Vector
}

/// The collection owned by `gf`, or null. Mutable access through a shared
/// grid function, as the native library hands it out.
pub unsafe extern "C-unwind" fn GridFunction_OwnFEC(
    gf: *const GridFunction,
) -> *mut FiniteElementCollection {
    (*gf).own_fec
}

pub unsafe extern "C-unwind" fn GridFunction_ProjectCoefficient(
    gf: *mut GridFunction,
    coeff: *const Coefficient,
) {
    let gf = &mut *gf;
    let fes = &*gf.fes;
    native_verify!(
        fes.vdim() == 1,
        "GridFunction::ProjectCoefficient: scalar coefficient on a space with vdim {}",
        fes.vdim()
    );
    let dim = fes.mesh().dim();
    let points = fes.dof_points();
    let values = gf.values_mut();
    for (dof, point) in points.iter().enumerate() {
        values[fes.vdof(dof, 0)] = eval_scalar(coeff, &point[..dim]);
    }
}

pub unsafe extern "C-unwind" fn GridFunction_ProjectVectorCoefficient(
    gf: *mut GridFunction,
    coeff: *const VectorCoefficient,
) {
    let gf = &mut *gf;
    let fes = &*gf.fes;
    let vdim = vector_dim(coeff);
    native_verify!(
        fes.vdim() == vdim,
        "GridFunction::ProjectCoefficient: coefficient vdim {vdim} does not match space vdim {}",
        fes.vdim()
    );
    let dim = fes.mesh().dim();
    let points = fes.dof_points();
    let mut sample = vec![0.0; vdim];
    let values = gf.values_mut();
    for (dof, point) in points.iter().enumerate() {
        eval_vector(coeff, &point[..dim], &mut sample);
        for (comp, value) in sample.iter().enumerate() {
            values[fes.vdof(dof, comp)] = *value;
        }
    }
}

pub unsafe extern "C-unwind" fn GridFunction_Save(
    gf: *const GridFunction,
    path: *const u8,
    len: usize,
    precision: c_int,
) {
    native_verify!(precision >= 1, "GridFunction::Save: invalid precision {precision}");
    let path = crate::path_from_raw(path, len);
    let text = (*gf).write(precision as usize);
    if let Err(err) = std::fs::write(&path, text) {
        crate::error::native_error(format!(
            "GridFunction::Save: unable to write {} ({err})",
            path.display()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficient::{
        ConstantCoefficient_as_Coefficient, ConstantCoefficient_delete, ConstantCoefficient_new,
    };
    use crate::fe::{
        FiniteElementSpace_delete, FiniteElementSpace_new, H1_FECollection_delete,
        H1_FECollection_new, Ordering,
    };
    use crate::mesh::{Mesh_MakeCartesian1D, Mesh_delete};

    #[test]
    fn test_project_constant() {
        unsafe {
            let mesh = Mesh_MakeCartesian1D(3, 1.0);
            let fec = H1_FECollection_new(1, 1, 1);
            let fes = FiniteElementSpace_new(mesh, fec as *const _, 1, Ordering::ByNodes);
            let gf = GridFunction_new(fes);
            assert_eq!((*gf).values().len(), 4);
            assert!(GridFunction_OwnFEC(gf).is_null());

            let one = ConstantCoefficient_new(1.5);
            GridFunction_ProjectCoefficient(gf, ConstantCoefficient_as_Coefficient(one));
            assert_eq!((*gf).values(), &[1.5; 4]);

            let text = (*gf).write(3);
            assert!(text.starts_with("FiniteElementSpace\nFiniteElementCollection: H1_1D_P1\n"));
            assert!(text.ends_with("1.500\n"));

            ConstantCoefficient_delete(one);
            GridFunction_delete(gf);
            FiniteElementSpace_delete(fes);
            H1_FECollection_delete(fec);
            Mesh_delete(mesh);
        }
    }
}
