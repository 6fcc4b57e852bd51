//! Linear and bilinear forms and their integrators
//!
//! Forms take ownership of the integrators added to them and release them
//! through the integrators' virtual destructors. Integrators only borrow
//! their coefficients.

use crate::coefficient::{eval_scalar, Coefficient};
use crate::fe::{trapezoid, FiniteElementSpace};
use crate::linalg::{Operator, OperatorHandle, SparseMatrix, SparseMatrix_delete};
use crate::memory::{delete_object, new_object};
use crate::vector::{ArrayInt, Vector};
use std::os::raw::c_int;
use std::ptr;

unsafe fn coefficient_at(q: *const Coefficient, point: &[f64]) -> f64 {
    if q.is_null() {
        1.0
    } else {
        eval_scalar(q, point)
    }
}

#[repr(C)]
pub struct LinearFormIntegrator {
    assemble: unsafe fn(*const LinearFormIntegrator, &FiniteElementSpace, &mut [f64]),
    drop_fn: unsafe fn(*mut LinearFormIntegrator),
}

#[repr(C)]
pub struct BilinearFormIntegrator {
    assemble: unsafe fn(*const BilinearFormIntegrator, &FiniteElementSpace, &mut SparseMatrix),
    drop_fn: unsafe fn(*mut BilinearFormIntegrator),
}

pub unsafe extern "C-unwind" fn LinearFormIntegrator_delete(integ: *mut LinearFormIntegrator) {
    if !integ.is_null() {
        ((*integ).drop_fn)(integ)
    }
}

pub unsafe extern "C-unwind" fn BilinearFormIntegrator_delete(integ: *mut BilinearFormIntegrator) {
    if !integ.is_null() {
        ((*integ).drop_fn)(integ)
    }
}

macro_rules! integrator_casts {
    ($derived:ident : $base:ident, $as_base:ident, $as_mut_base:ident, $delete:ident) => {
        pub unsafe extern "C-unwind" fn $as_base(integ: *const $derived) -> *const $base {
            integ as *const $base
        }

        pub unsafe extern "C-unwind" fn $as_mut_base(integ: *mut $derived) -> *mut $base {
            integ as *mut $base
        }

        pub unsafe extern "C-unwind" fn $delete(integ: *mut $derived) {
            delete_object(integ)
        }
    };
}

////////////////////////
// DomainLFIntegrator //
////////////////////////

/// `b_i += ∫ q φ_i`, lumped at the dofs.
#[repr(C)]
pub struct DomainLFIntegrator {
    base: LinearFormIntegrator,
    q: *const Coefficient,
}

unsafe fn domain_lf_assemble(
    integ: *const LinearFormIntegrator,
    fes: &FiniteElementSpace,
    b: &mut [f64],
) {
    let q = (*(integ as *const DomainLFIntegrator)).q;
    let dim = fes.mesh().dim();
    let weights = fes.dof_weights();
    for (dof, point) in fes.dof_points().iter().enumerate() {
        let value = weights[dof] * coefficient_at(q, &point[..dim]);
        for comp in 0..fes.vdim() {
            b[fes.vdof(dof, comp)] += value;
        }
    }
}

unsafe fn domain_lf_drop(integ: *mut LinearFormIntegrator) {
    delete_object(integ as *mut DomainLFIntegrator)
}

pub unsafe extern "C-unwind" fn DomainLFIntegrator_new(
    q: *const Coefficient,
) -> *mut DomainLFIntegrator {
    new_object(DomainLFIntegrator {
        base: LinearFormIntegrator {
            assemble: domain_lf_assemble,
            drop_fn: domain_lf_drop,
        },
        q,
    })
}

integrator_casts!(
    DomainLFIntegrator: LinearFormIntegrator,
    DomainLFIntegrator_as_LinearFormIntegrator,
    DomainLFIntegrator_as_mut_LinearFormIntegrator,
    DomainLFIntegrator_delete
);

/////////////////////////
// DiffusionIntegrator //
/////////////////////////

/// `a(u, v) = ∫ q ∇u·∇v`, as an edge stencil on the H1 lattice. A null
/// coefficient means `q = 1`.
#[repr(C)]
pub struct DiffusionIntegrator {
    base: BilinearFormIntegrator,
    q: *const Coefficient,
}

unsafe fn diffusion_assemble(
    integ: *const BilinearFormIntegrator,
    fes: &FiniteElementSpace,
    mat: &mut SparseMatrix,
) {
    let q = (*(integ as *const DiffusionIntegrator)).q;
    let dim = fes.mesh().dim();
    let n = fes.lattice();
    let h = fes.spacing();
    let strides = [1, n[0], n[0] * n[1]];
    let points = fes.dof_points();
    for dof in 0..fes.ndofs() {
        let idx = fes.lattice_index(dof);
        for axis in 0..dim {
            if idx[axis] + 1 >= n[axis] {
                continue;
            }
            let next = dof + strides[axis];
            let area: f64 = (0..3)
                .filter(|&b| b != axis)
                .map(|b| trapezoid(idx[b], n[b], h[b]))
                .product();
            let mid: Vec<f64> = (0..dim)
                .map(|c| 0.5 * (points[dof][c] + points[next][c]))
                .collect();
            let k = coefficient_at(q, &mid) * area / h[axis];
            for comp in 0..fes.vdim() {
                let (i, j) = (fes.vdof(dof, comp), fes.vdof(next, comp));
                mat.add(i, i, k);
                mat.add(j, j, k);
                mat.add(i, j, -k);
                mat.add(j, i, -k);
            }
        }
    }
}

unsafe fn diffusion_drop(integ: *mut BilinearFormIntegrator) {
    delete_object(integ as *mut DiffusionIntegrator)
}

pub unsafe extern "C-unwind" fn DiffusionIntegrator_new(
    q: *const Coefficient,
) -> *mut DiffusionIntegrator {
    new_object(DiffusionIntegrator {
        base: BilinearFormIntegrator {
            assemble: diffusion_assemble,
            drop_fn: diffusion_drop,
        },
        q,
    })
}

integrator_casts!(
    DiffusionIntegrator: BilinearFormIntegrator,
    DiffusionIntegrator_as_BilinearFormIntegrator,
    DiffusionIntegrator_as_mut_BilinearFormIntegrator,
    DiffusionIntegrator_delete
);

////////////////
// LinearForm //
////////////////

#[repr(C)]
pub struct LinearForm {
    base: Vector,
    fes: *const FiniteElementSpace,
    integrators: Vec<*mut LinearFormIntegrator>,
}

impl Drop for LinearForm {
    fn drop(&mut self) {
        for &integ in &self.integrators {
            unsafe { LinearFormIntegrator_delete(integ) };
        }
    }
}

pub unsafe extern "C-unwind" fn LinearForm_new(fes: *const FiniteElementSpace) -> *mut LinearForm {
    new_object(LinearForm {
        base: Vector::with_len((*fes).vsize()),
        fes,
        integrators: Vec::new(),
    })
}

pub unsafe extern "C-unwind" fn LinearForm_delete(lf: *mut LinearForm) {
    delete_object(lf)
}

/// Takes ownership of `integ`.
pub unsafe extern "C-unwind" fn LinearForm_AddDomainIntegrator(
    lf: *mut LinearForm,
    integ: *mut LinearFormIntegrator,
) {
    native_verify!(!integ.is_null(), "LinearForm::AddDomainIntegrator: null integrator");
    (*lf).integrators.push(integ);
}

pub unsafe extern "C-unwind" fn LinearForm_Assemble(lf: *mut LinearForm) {
    let lf = &mut *lf;
    let fes = &*lf.fes;
    lf.base.reset(fes.vsize());
    for &integ in &lf.integrators {
        ((*integ).assemble)(integ, fes, lf.base.as_mut_slice());
    }
}

pub unsafe extern "C-unwind" fn LinearForm_as_Vector(lf: *const LinearForm) -> *const Vector {
    lf as *const Vector
}

pub unsafe extern "C-unwind" fn LinearForm_as_mut_Vector(lf: *mut LinearForm) -> *mut Vector {
    lf as *mut Vector
}

//////////////////
// BilinearForm //
//////////////////

pub struct BilinearForm {
    fes: *const FiniteElementSpace,
    integrators: Vec<*mut BilinearFormIntegrator>,
    mat: *mut SparseMatrix,
    /// Essential dofs of the last formed linear system.
    eliminated: Vec<usize>,
}

impl Drop for BilinearForm {
    fn drop(&mut self) {
        unsafe {
            for &integ in &self.integrators {
                BilinearFormIntegrator_delete(integ);
            }
            SparseMatrix_delete(self.mat);
        }
    }
}

pub unsafe extern "C-unwind" fn BilinearForm_new(
    fes: *const FiniteElementSpace,
) -> *mut BilinearForm {
    new_object(BilinearForm {
        fes,
        integrators: Vec::new(),
        mat: ptr::null_mut(),
        eliminated: Vec::new(),
    })
}

pub unsafe extern "C-unwind" fn BilinearForm_delete(bf: *mut BilinearForm) {
    delete_object(bf)
}

/// Takes ownership of `integ`.
pub unsafe extern "C-unwind" fn BilinearForm_AddDomainIntegrator(
    bf: *mut BilinearForm,
    integ: *mut BilinearFormIntegrator,
) {
    native_verify!(!integ.is_null(), "BilinearForm::AddDomainIntegrator: null integrator");
    (*bf).integrators.push(integ);
}

pub unsafe extern "C-unwind" fn BilinearForm_Size(bf: *const BilinearForm) -> c_int {
    (*(*bf).fes).vsize() as c_int
}

pub unsafe extern "C-unwind" fn BilinearForm_Assemble(bf: *mut BilinearForm, skip_zeros: c_int) {
    let form = &mut *bf;
    let fes = &*form.fes;
    let n = fes.vsize();
    let mut mat = SparseMatrix::zeros(n, n);
    for &integ in &form.integrators {
        ((*integ).assemble)(integ, fes, &mut mat);
    }
    if skip_zeros != 0 {
        mat.drop_zeros();
    }
    SparseMatrix_delete(form.mat);
    form.mat = new_object(mat);
}

pub unsafe extern "C-unwind" fn BilinearForm_SpMat(bf: *const BilinearForm) -> *const SparseMatrix {
    native_verify!(!(*bf).mat.is_null(), "BilinearForm::SpMat: the form is not assembled");
    (*bf).mat
}

/// Eliminate the essential dofs `ess_tdof_list` (with values taken from `x`)
/// and produce the reduced system `A X = B`. `A` receives a new sparse matrix
/// it owns. With `copy_interior == 0` the interior entries of `X` are zero.
/// Nothing is written unless every check passes.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C-unwind" fn BilinearForm_FormLinearSystem(
    bf: *mut BilinearForm,
    ess_tdof_list: *const ArrayInt,
    x: *const Vector,
    b: *const Vector,
    a: *mut OperatorHandle,
    x_out: *mut Vector,
    b_out: *mut Vector,
    copy_interior: c_int,
) {
    let form = &mut *bf;
    native_verify!(
        !form.mat.is_null(),
        "BilinearForm::FormLinearSystem: the form is not assembled"
    );
    let n = (*form.fes).vsize();
    let (xs, bs) = ((*x).as_slice(), (*b).as_slice());
    native_verify!(
        xs.len() == n && bs.len() == n,
        "BilinearForm::FormLinearSystem: size mismatch (form: {n}, x: {}, b: {})",
        xs.len(),
        bs.len()
    );
    let mut ess: Vec<usize> = Vec::with_capacity((*ess_tdof_list).len());
    for &dof in (*ess_tdof_list).as_slice() {
        native_verify!(
            (0..n as c_int).contains(&dof),
            "BilinearForm::FormLinearSystem: essential dof {dof} out of range"
        );
        ess.push(dof as usize);
    }
    ess.sort_unstable();
    ess.dedup();

    let mut is_ess = vec![false; n];
    for &e in &ess {
        is_ess[e] = true;
    }
    let mut mat = (*form.mat).clone();
    let mut rhs = bs.to_vec();
    for (r, value) in rhs.iter_mut().enumerate() {
        if is_ess[r] {
            continue;
        }
        for &e in &ess {
            *value -= mat.remove_entry(r, e) * xs[e];
        }
    }
    for &e in &ess {
        mat.clear_row(e);
        mat.add(e, e, 1.0);
        rhs[e] = xs[e];
    }
    let solution: Vec<f64> = if copy_interior != 0 {
        xs.to_vec()
    } else {
        (0..n).map(|i| if is_ess[i] { xs[i] } else { 0.0 }).collect()
    };

    (*a).reset(new_object(mat) as *mut Operator, true);
    (*x_out).assign(&solution);
    (*b_out).assign(&rhs);
    form.eliminated = ess;
}

/// Copy the solution `x_sol` of the reduced system back into `x`.
pub unsafe extern "C-unwind" fn BilinearForm_RecoverFEMSolution(
    bf: *mut BilinearForm,
    x_sol: *const Vector,
    b: *const Vector,
    x: *mut Vector,
) {
    let n = (*(*bf).fes).vsize();
    native_verify!(
        (*x_sol).len() == n && (*b).len() == n && (*x).len() == n,
        "BilinearForm::RecoverFEMSolution: size mismatch (form: {n}, X: {}, b: {}, x: {})",
        (*x_sol).len(),
        (*b).len(),
        (*x).len()
    );
    (*x).as_mut_slice().copy_from_slice((*x_sol).as_slice());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fe::{
        FiniteElementSpace_delete, FiniteElementSpace_new, H1_FECollection_delete,
        H1_FECollection_new, Ordering,
    };
    use crate::linalg::{
        OperatorHandle_Ptr, OperatorHandle_delete, OperatorHandle_new, SparseMatrix,
    };
    use crate::mesh::{Mesh_MakeCartesian1D, Mesh_delete};
    use crate::vector::{ArrayInt_delete, ArrayInt_new, Vector_delete, Vector_new};

    #[test]
    fn test_1d_laplacian_stencil_and_elimination() {
        unsafe {
            let mesh = Mesh_MakeCartesian1D(4, 1.0);
            let fec = H1_FECollection_new(1, 1, 1);
            let fes = FiniteElementSpace_new(mesh, fec as *const _, 1, Ordering::ByNodes);

            let bf = BilinearForm_new(fes);
            let diffusion = DiffusionIntegrator_new(ptr::null());
            BilinearForm_AddDomainIntegrator(
                bf,
                DiffusionIntegrator_as_mut_BilinearFormIntegrator(diffusion),
            );
            BilinearForm_Assemble(bf, 0);
            let mat = &*BilinearForm_SpMat(bf);
            assert_eq!(mat.get(1, 1), 8.0);
            assert_eq!(mat.get(1, 2), -4.0);
            assert_eq!(mat.get(0, 0), 4.0);

            let ess = ArrayInt_new();
            (*ess).assign(&[0, 4]);
            let x = Vector_new(5);
            (*x).as_mut_slice()[4] = 1.0;
            let b = Vector_new(5);
            let handle = OperatorHandle_new();
            let (xx, bb) = (Vector_new(0), Vector_new(0));
            BilinearForm_FormLinearSystem(bf, ess, x, b, handle, xx, bb, 0);

            let a = &*(OperatorHandle_Ptr(handle) as *const SparseMatrix);
            assert_eq!(a.get(0, 0), 1.0);
            assert_eq!(a.get(3, 4), 0.0);
            assert_eq!((*bb).as_slice(), &[0.0, 0.0, 0.0, 4.0, 1.0]);
            assert_eq!((*xx).as_slice(), &[0.0, 0.0, 0.0, 0.0, 1.0]);

            for v in [x, b, xx, bb] {
                Vector_delete(v);
            }
            ArrayInt_delete(ess);
            OperatorHandle_delete(handle);
            BilinearForm_delete(bf);
            FiniteElementSpace_delete(fes);
            H1_FECollection_delete(fec);
            Mesh_delete(mesh);
        }
    }

    #[test]
    fn test_linear_form_integrates_constant() {
        unsafe {
            let mesh = Mesh_MakeCartesian1D(4, 2.0);
            let fec = H1_FECollection_new(1, 1, 1);
            let fes = FiniteElementSpace_new(mesh, fec as *const _, 1, Ordering::ByNodes);
            let lf = LinearForm_new(fes);
            LinearForm_AddDomainIntegrator(
                lf,
                DomainLFIntegrator_as_mut_LinearFormIntegrator(DomainLFIntegrator_new(ptr::null())),
            );
            LinearForm_Assemble(lf);
            let total: f64 = (*LinearForm_as_Vector(lf)).as_slice().iter().sum();
            assert!((total - 2.0).abs() < 1e-12);
            LinearForm_delete(lf);
            FiniteElementSpace_delete(fes);
            H1_FECollection_delete(fec);
            Mesh_delete(mesh);
        }
    }
}
