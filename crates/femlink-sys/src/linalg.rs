//! Operators, matrices and the operator handle
//!
//! Every concrete operator embeds `Operator` as its first field; the base
//! carries the runtime type tag used by `OperatorHandle_Type` and a `mult`
//! entry point. `Operator_as_<Derived>` casts are unchecked.

use crate::memory::{delete_object, new_object};
use crate::vector::Vector;
use std::os::raw::c_int;
use std::ptr;

/// Runtime type tag of an operator.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorType {
    /// Generic operator with no concrete storage format.
    Any = 0,
    SparseMatrix = 1,
    DenseMatrix = 2,
}

#[repr(C)]
pub struct Operator {
    height: c_int,
    width: c_int,
    type_tag: OperatorType,
    mult: unsafe fn(*const Operator, &[f64], &mut [f64]),
    drop_fn: unsafe fn(*mut Operator),
}

impl Operator {
    pub(crate) fn height(&self) -> usize {
        self.height as usize
    }

    pub(crate) fn width(&self) -> usize {
        self.width as usize
    }
}

pub(crate) unsafe fn apply(op: *const Operator, x: &[f64], y: &mut [f64]) {
    ((*op).mult)(op, x, y)
}

pub unsafe extern "C-unwind" fn Operator_Height(op: *const Operator) -> c_int {
    (*op).height
}

pub unsafe extern "C-unwind" fn Operator_Width(op: *const Operator) -> c_int {
    (*op).width
}

/// Runtime type of the most derived object.
pub unsafe extern "C-unwind" fn Operator_Type(op: *const Operator) -> OperatorType {
    (*op).type_tag
}

/// `y = A x`.
pub unsafe extern "C-unwind" fn Operator_Mult(
    op: *const Operator,
    x: *const Vector,
    y: *mut Vector,
) {
    let (x, y) = (&*x, &mut *y);
    native_verify!(
        x.len() == (*op).width() && y.len() == (*op).height(),
        "Operator::Mult: size mismatch ({} x {} operator, x: {}, y: {})",
        (*op).height,
        (*op).width,
        x.len(),
        y.len()
    );
    apply(op, x.as_slice(), y.as_mut_slice())
}

/// Virtual destructor.
pub unsafe extern "C-unwind" fn Operator_delete(op: *mut Operator) {
    if !op.is_null() {
        ((*op).drop_fn)(op)
    }
}

//////////////////
// SparseMatrix //
//////////////////

/// Row-wise sparse matrix; every row is sorted by column.
#[repr(C)]
pub struct SparseMatrix {
    base: Operator,
    rows: Vec<Vec<(usize, f64)>>,
}

unsafe fn sparse_mult(op: *const Operator, x: &[f64], y: &mut [f64]) {
    let mat = &*(op as *const SparseMatrix);
    for (yi, row) in y.iter_mut().zip(&mat.rows) {
        *yi = row.iter().map(|&(j, a)| a * x[j]).sum();
    }
}

unsafe fn sparse_drop(op: *mut Operator) {
    delete_object(op as *mut SparseMatrix)
}

impl SparseMatrix {
    pub(crate) fn zeros(height: usize, width: usize) -> Self {
        Self {
            base: Operator {
                height: height as c_int,
                width: width as c_int,
                type_tag: OperatorType::SparseMatrix,
                mult: sparse_mult,
                drop_fn: sparse_drop,
            },
            rows: vec![Vec::new(); height],
        }
    }

    /// `A[i][j] += value`.
    pub(crate) fn add(&mut self, i: usize, j: usize, value: f64) {
        let row = &mut self.rows[i];
        match row.binary_search_by_key(&j, |&(col, _)| col) {
            Ok(pos) => row[pos].1 += value,
            Err(pos) => row.insert(pos, (j, value)),
        }
    }

    pub(crate) fn get(&self, i: usize, j: usize) -> f64 {
        let row = &self.rows[i];
        row.binary_search_by_key(&j, |&(col, _)| col)
            .map(|pos| row[pos].1)
            .unwrap_or(0.0)
    }

    pub(crate) fn clear_row(&mut self, i: usize) {
        self.rows[i].clear();
    }

    pub(crate) fn remove_entry(&mut self, i: usize, j: usize) -> f64 {
        let row = &mut self.rows[i];
        match row.binary_search_by_key(&j, |&(col, _)| col) {
            Ok(pos) => row.remove(pos).1,
            Err(_) => 0.0,
        }
    }

    pub(crate) fn drop_zeros(&mut self) {
        for row in &mut self.rows {
            row.retain(|&(_, a)| a != 0.0);
        }
    }

    fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

impl Clone for SparseMatrix {
    fn clone(&self) -> Self {
        let mut copy = Self::zeros(self.base.height(), self.base.width());
        copy.rows = self.rows.clone();
        copy
    }
}

pub unsafe extern "C-unwind" fn SparseMatrix_new(height: c_int, width: c_int) -> *mut SparseMatrix {
    native_verify!(
        height >= 0 && width >= 0,
        "SparseMatrix::SparseMatrix: invalid size {height} x {width}"
    );
    new_object(SparseMatrix::zeros(height as usize, width as usize))
}

pub unsafe extern "C-unwind" fn SparseMatrix_delete(mat: *mut SparseMatrix) {
    delete_object(mat)
}

pub unsafe extern "C-unwind" fn SparseMatrix_Add(
    mat: *mut SparseMatrix,
    i: c_int,
    j: c_int,
    value: f64,
) {
    let m = &mut *mat;
    native_verify!(
        (0..m.base.height).contains(&i) && (0..m.base.width).contains(&j),
        "SparseMatrix::Add: index ({i}, {j}) out of range"
    );
    m.add(i as usize, j as usize, value)
}

pub unsafe extern "C-unwind" fn SparseMatrix_Elem(
    mat: *const SparseMatrix,
    i: c_int,
    j: c_int,
) -> f64 {
    let m = &*mat;
    native_verify!(
        (0..m.base.height).contains(&i) && (0..m.base.width).contains(&j),
        "SparseMatrix::Elem: index ({i}, {j}) out of range"
    );
    m.get(i as usize, j as usize)
}

pub unsafe extern "C-unwind" fn SparseMatrix_NumNonZeroElems(mat: *const SparseMatrix) -> c_int {
    (*mat).nnz() as c_int
}

pub unsafe extern "C-unwind" fn SparseMatrix_as_Operator(
    mat: *const SparseMatrix,
) -> *const Operator {
    mat as *const Operator
}

pub unsafe extern "C-unwind" fn SparseMatrix_as_mut_Operator(
    mat: *mut SparseMatrix,
) -> *mut Operator {
    mat as *mut Operator
}

/// Unchecked: `op` must be a sparse matrix.
pub unsafe extern "C-unwind" fn Operator_as_SparseMatrix(
    op: *const Operator,
) -> *const SparseMatrix {
    op as *const SparseMatrix
}

/// Unchecked: `op` must be a sparse matrix.
pub unsafe extern "C-unwind" fn Operator_as_mut_SparseMatrix(
    op: *mut Operator,
) -> *mut SparseMatrix {
    op as *mut SparseMatrix
}

/////////////////
// DenseMatrix //
/////////////////

/// Column-major dense matrix.
#[repr(C)]
pub struct DenseMatrix {
    base: Operator,
    data: Vec<f64>,
}

unsafe fn dense_mult(op: *const Operator, x: &[f64], y: &mut [f64]) {
    let mat = &*(op as *const DenseMatrix);
    let height = mat.base.height();
    y.fill(0.0);
    for (j, xj) in x.iter().enumerate() {
        let column = &mat.data[j * height..(j + 1) * height];
        for (yi, a) in y.iter_mut().zip(column) {
            *yi += a * xj;
        }
    }
}

unsafe fn dense_drop(op: *mut Operator) {
    delete_object(op as *mut DenseMatrix)
}

pub unsafe extern "C-unwind" fn DenseMatrix_new(height: c_int, width: c_int) -> *mut DenseMatrix {
    native_verify!(
        height >= 0 && width >= 0,
        "DenseMatrix::DenseMatrix: invalid size {height} x {width}"
    );
    new_object(DenseMatrix {
        base: Operator {
            height,
            width,
            type_tag: OperatorType::DenseMatrix,
            mult: dense_mult,
            drop_fn: dense_drop,
        },
        data: vec![0.0; height as usize * width as usize],
    })
}

pub unsafe extern "C-unwind" fn DenseMatrix_delete(mat: *mut DenseMatrix) {
    delete_object(mat)
}

fn dense_index(mat: &DenseMatrix, i: c_int, j: c_int, op: &str) -> usize {
    native_verify!(
        (0..mat.base.height).contains(&i) && (0..mat.base.width).contains(&j),
        "DenseMatrix::{op}: index ({i}, {j}) out of range"
    );
    j as usize * mat.base.height() + i as usize
}

pub unsafe extern "C-unwind" fn DenseMatrix_Elem(
    mat: *const DenseMatrix,
    i: c_int,
    j: c_int,
) -> f64 {
    let m = &*mat;
    m.data[dense_index(m, i, j, "Elem")]
}

pub unsafe extern "C-unwind" fn DenseMatrix_Set(
    mat: *mut DenseMatrix,
    i: c_int,
    j: c_int,
    value: f64,
) {
    let m = &mut *mat;
    let idx = dense_index(m, i, j, "Set");
    m.data[idx] = value;
}

pub unsafe extern "C-unwind" fn DenseMatrix_as_Operator(
    mat: *const DenseMatrix,
) -> *const Operator {
    mat as *const Operator
}

pub unsafe extern "C-unwind" fn DenseMatrix_as_mut_Operator(
    mat: *mut DenseMatrix,
) -> *mut Operator {
    mat as *mut Operator
}

/// Unchecked: `op` must be a dense matrix.
pub unsafe extern "C-unwind" fn Operator_as_DenseMatrix(op: *const Operator) -> *const DenseMatrix {
    op as *const DenseMatrix
}

/// Unchecked: `op` must be a dense matrix.
pub unsafe extern "C-unwind" fn Operator_as_mut_DenseMatrix(op: *mut Operator) -> *mut DenseMatrix {
    op as *mut DenseMatrix
}

////////////////////
// OperatorHandle //
////////////////////

/// Holds an operator pointer and an ownership flag; acts as an operator
/// by forwarding to the held one.
#[repr(C)]
pub struct OperatorHandle {
    base: Operator,
    op: *mut Operator,
    own: bool,
}

unsafe fn handle_mult(op: *const Operator, x: &[f64], y: &mut [f64]) {
    let handle = &*(op as *const OperatorHandle);
    native_verify!(!handle.op.is_null(), "OperatorHandle::Mult: empty handle");
    apply(handle.op, x, y)
}

unsafe fn handle_drop(op: *mut Operator) {
    delete_object(op as *mut OperatorHandle)
}

impl OperatorHandle {
    unsafe fn clear(&mut self) {
        if self.own {
            Operator_delete(self.op);
        }
        self.op = ptr::null_mut();
        self.own = false;
        self.base.height = 0;
        self.base.width = 0;
    }

    /// Take `op`, releasing whatever was held before.
    pub(crate) unsafe fn reset(&mut self, op: *mut Operator, own: bool) {
        self.clear();
        if !op.is_null() {
            self.base.height = (*op).height;
            self.base.width = (*op).width;
        }
        self.op = op;
        self.own = own;
    }
}

impl Drop for OperatorHandle {
    fn drop(&mut self) {
        unsafe { self.clear() }
    }
}

pub unsafe extern "C-unwind" fn OperatorHandle_new() -> *mut OperatorHandle {
    new_object(OperatorHandle {
        base: Operator {
            height: 0,
            width: 0,
            type_tag: OperatorType::Any,
            mult: handle_mult,
            drop_fn: handle_drop,
        },
        op: ptr::null_mut(),
        own: false,
    })
}

pub unsafe extern "C-unwind" fn OperatorHandle_delete(handle: *mut OperatorHandle) {
    delete_object(handle)
}

/// Type of the held operator; `Any` when empty.
pub unsafe extern "C-unwind" fn OperatorHandle_Type(handle: *const OperatorHandle) -> OperatorType {
    let op = (*handle).op;
    if op.is_null() {
        OperatorType::Any
    } else {
        Operator_Type(op)
    }
}

/// The held operator, or null.
pub unsafe extern "C-unwind" fn OperatorHandle_Ptr(handle: *const OperatorHandle) -> *mut Operator {
    (*handle).op
}

pub unsafe extern "C-unwind" fn OperatorHandle_OwnsOperator(handle: *const OperatorHandle) -> bool {
    (*handle).own
}

pub unsafe extern "C-unwind" fn OperatorHandle_Reset(
    handle: *mut OperatorHandle,
    op: *mut Operator,
    own: bool,
) {
    (*handle).reset(op, own)
}

pub unsafe extern "C-unwind" fn OperatorHandle_as_Operator(
    handle: *const OperatorHandle,
) -> *const Operator {
    handle as *const Operator
}

pub unsafe extern "C-unwind" fn OperatorHandle_as_mut_Operator(
    handle: *mut OperatorHandle,
) -> *mut Operator {
    handle as *mut Operator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Vector_delete, Vector_new};
    use pretty_assertions::assert_eq;

    unsafe fn laplacian_1d(n: usize) -> *mut SparseMatrix {
        let mat = SparseMatrix_new(n as c_int, n as c_int);
        for i in 0..n {
            (*mat).add(i, i, 2.0);
            if i > 0 {
                (*mat).add(i, i - 1, -1.0);
            }
            if i + 1 < n {
                (*mat).add(i, i + 1, -1.0);
            }
        }
        mat
    }

    #[test]
    fn test_handle_type_tracks_held_operator() {
        unsafe {
            let handle = OperatorHandle_new();
            assert_eq!(OperatorHandle_Type(handle), OperatorType::Any);
            assert!(OperatorHandle_Ptr(handle).is_null());

            let dense = DenseMatrix_new(2, 2);
            OperatorHandle_Reset(handle, DenseMatrix_as_mut_Operator(dense), true);
            assert_eq!(OperatorHandle_Type(handle), OperatorType::DenseMatrix);
            assert_eq!(Operator_Height(OperatorHandle_as_Operator(handle)), 2);

            OperatorHandle_Reset(handle, SparseMatrix_as_mut_Operator(laplacian_1d(3)), true);
            assert_eq!(OperatorHandle_Type(handle), OperatorType::SparseMatrix);
            OperatorHandle_delete(handle);
        }
    }

    #[test]
    fn test_operator_type_reads_the_object() {
        unsafe {
            let dense = DenseMatrix_new(1, 1);
            let sparse = SparseMatrix_new(1, 1);
            let handle = OperatorHandle_new();
            assert_eq!(Operator_Type(DenseMatrix_as_Operator(dense)), OperatorType::DenseMatrix);
            assert_eq!(Operator_Type(SparseMatrix_as_Operator(sparse)), OperatorType::SparseMatrix);
            assert_eq!(Operator_Type(OperatorHandle_as_Operator(handle)), OperatorType::Any);
            OperatorHandle_delete(handle);
            SparseMatrix_delete(sparse);
            DenseMatrix_delete(dense);
        }
    }

    #[test]
    fn test_sparse_accumulates() {
        unsafe {
            let mat = SparseMatrix_new(2, 2);
            SparseMatrix_Add(mat, 0, 1, 1.0);
            SparseMatrix_Add(mat, 0, 1, 2.0);
            assert_eq!(SparseMatrix_Elem(mat, 0, 1), 3.0);
            assert_eq!(SparseMatrix_Elem(mat, 1, 1), 0.0);
            assert_eq!(SparseMatrix_NumNonZeroElems(mat), 1);
            SparseMatrix_delete(mat);
        }
    }
}
