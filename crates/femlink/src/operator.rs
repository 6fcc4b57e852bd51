//! Operators, matrices and the operator handle

use crate::array::native_len;
use crate::cast::{try_downcast, try_downcast_mut, AsBase, AsBaseMut, IntoBase, Tagged, TypeTag};
use crate::error::Result;
use crate::guard::guarded;
use crate::handle::{Borrowed, BorrowedMut, Owned};
use crate::vector::{VectorLike, VectorLikeMut};
use femlink_sys as sys;
use std::os::raw::c_int;

pub type SparseMatrixRef<'a> = Borrowed<'a, sys::SparseMatrix>;
pub type SparseMatrixMut<'a> = BorrowedMut<'a, sys::SparseMatrix>;
pub type DenseMatrixRef<'a> = Borrowed<'a, sys::DenseMatrix>;
pub type DenseMatrixMut<'a> = BorrowedMut<'a, sys::DenseMatrix>;

/// Anything that is a native `Operator`.
pub trait Operator: AsBase<sys::Operator> {
    fn height(&self) -> usize {
        unsafe { sys::Operator_Height(self.as_base()) as usize }
    }

    fn width(&self) -> usize {
        unsafe { sys::Operator_Width(self.as_base()) as usize }
    }

    /// `y = A x`.
    fn mult<X, Y>(&self, x: &X, y: &mut Y) -> Result<()>
    where
        X: VectorLike + ?Sized,
        Y: VectorLikeMut + ?Sized,
    {
        let op: *const sys::Operator = self.as_base();
        let x: *const sys::Vector = x.as_base();
        let y = y.as_base_mut().as_mut_ptr();
        guarded("Operator_Mult", || unsafe { sys::Operator_Mult(op, x, y) })
    }
}

impl<T: AsBase<sys::Operator> + ?Sized> Operator for T {}

fn index(i: usize, j: usize) -> (c_int, c_int) {
    (native_len(i), native_len(j))
}

pub trait SparseMatrixLike: AsBase<sys::SparseMatrix> {
    fn elem(&self, i: usize, j: usize) -> Result<f64> {
        let mat: *const sys::SparseMatrix = self.as_base();
        let (i, j) = index(i, j);
        guarded("SparseMatrix_Elem", || unsafe { sys::SparseMatrix_Elem(mat, i, j) })
    }

    /// Number of stored entries.
    fn num_nonzeros(&self) -> usize {
        unsafe { sys::SparseMatrix_NumNonZeroElems(self.as_base()) as usize }
    }
}

impl<T: AsBase<sys::SparseMatrix> + ?Sized> SparseMatrixLike for T {}

pub trait SparseMatrixLikeMut: AsBaseMut<sys::SparseMatrix> {
    /// `A[i][j] += value`, creating the entry when absent.
    fn add(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        let mat = self.as_base_mut().as_mut_ptr();
        let (i, j) = index(i, j);
        guarded("SparseMatrix_Add", || unsafe { sys::SparseMatrix_Add(mat, i, j, value) })
    }
}

impl<T: AsBaseMut<sys::SparseMatrix> + ?Sized> SparseMatrixLikeMut for T {}

pub trait DenseMatrixLike: AsBase<sys::DenseMatrix> {
    fn elem(&self, i: usize, j: usize) -> Result<f64> {
        let mat: *const sys::DenseMatrix = self.as_base();
        let (i, j) = index(i, j);
        guarded("DenseMatrix_Elem", || unsafe { sys::DenseMatrix_Elem(mat, i, j) })
    }
}

impl<T: AsBase<sys::DenseMatrix> + ?Sized> DenseMatrixLike for T {}

pub trait DenseMatrixLikeMut: AsBaseMut<sys::DenseMatrix> {
    fn set(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        let mat = self.as_base_mut().as_mut_ptr();
        let (i, j) = index(i, j);
        guarded("DenseMatrix_Set", || unsafe { sys::DenseMatrix_Set(mat, i, j, value) })
    }
}

impl<T: AsBaseMut<sys::DenseMatrix> + ?Sized> DenseMatrixLikeMut for T {}

#[derive(Debug)]
pub struct SparseMatrix {
    inner: Owned<sys::SparseMatrix>,
}

forward_base!(impl SparseMatrix => sys::SparseMatrix);
forward_base!(impl SparseMatrix => sys::Operator);

impl SparseMatrix {
    /// Empty `height` x `width` matrix.
    pub fn new(height: usize, width: usize) -> Result<Self> {
        let ptr = guarded("SparseMatrix_new", || unsafe {
            sys::SparseMatrix_new(native_len(height), native_len(width))
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }

    pub fn into_inner(self) -> Owned<sys::SparseMatrix> {
        self.inner
    }
}

impl IntoBase<sys::Operator> for SparseMatrix {
    fn into_base(self) -> Owned<sys::Operator> {
        self.inner.into_base()
    }
}

/// Column-major dense matrix.
#[derive(Debug)]
pub struct DenseMatrix {
    inner: Owned<sys::DenseMatrix>,
}

forward_base!(impl DenseMatrix => sys::DenseMatrix);
forward_base!(impl DenseMatrix => sys::Operator);

impl DenseMatrix {
    /// Zero `height` x `width` matrix.
    pub fn new(height: usize, width: usize) -> Result<Self> {
        let ptr = guarded("DenseMatrix_new", || unsafe {
            sys::DenseMatrix_new(native_len(height), native_len(width))
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }

    pub fn into_inner(self) -> Owned<sys::DenseMatrix> {
        self.inner
    }
}

impl IntoBase<sys::Operator> for DenseMatrix {
    fn into_base(self) -> Owned<sys::Operator> {
        self.inner.into_base()
    }
}

/// Holds at most one operator, usually produced by the native library. The
/// handle is itself an operator forwarding to the held one.
#[derive(Debug)]
pub struct OperatorHandle {
    inner: Owned<sys::OperatorHandle>,
}

forward_base!(impl OperatorHandle => sys::OperatorHandle);
forward_base!(impl OperatorHandle => sys::Operator);

impl OperatorHandle {
    /// An empty handle.
    pub fn new() -> Self {
        Self {
            inner: unsafe { Owned::from_fresh(sys::OperatorHandle_new()) },
        }
    }

    /// Runtime type of the held operator; `Any` when empty.
    pub fn type_tag(&self) -> TypeTag {
        TypeTag::from(unsafe { sys::OperatorHandle_Type(self.inner.as_ptr()) })
    }

    pub fn is_empty(&self) -> bool {
        unsafe { sys::OperatorHandle_Ptr(self.inner.as_ptr()).is_null() }
    }

    pub fn owns_operator(&self) -> bool {
        unsafe { sys::OperatorHandle_OwnsOperator(self.inner.as_ptr()) }
    }

    /// Take ownership of `op`, releasing the operator held before.
    pub fn reset(&mut self, op: impl IntoBase<sys::Operator>) {
        let op = op.into_base().into_raw();
        unsafe { sys::OperatorHandle_Reset(self.inner.as_mut_ptr(), op.as_ptr(), true) }
    }

    /// Release the held operator.
    pub fn clear(&mut self) {
        unsafe { sys::OperatorHandle_Reset(self.inner.as_mut_ptr(), std::ptr::null_mut(), false) }
    }

    /// The held operator. An empty handle yields `NullNativePointer`.
    pub fn get(&self) -> Result<Borrowed<'_, sys::Operator>> {
        unsafe { Borrowed::from_raw(sys::OperatorHandle_Ptr(self.inner.as_ptr())) }
    }

    pub fn get_mut(&mut self) -> Result<BorrowedMut<'_, sys::Operator>> {
        unsafe { BorrowedMut::from_raw(sys::OperatorHandle_Ptr(self.inner.as_ptr())) }
    }

    /// The held operator as a `T`, checked against its runtime type.
    pub fn try_as<T: Tagged>(&self) -> Result<Borrowed<'_, T>> {
        try_downcast(self.get()?)
    }

    pub fn try_as_mut<T: Tagged>(&mut self) -> Result<BorrowedMut<'_, T>> {
        try_downcast_mut(self.get_mut()?)
    }
}

impl Default for OperatorHandle {
    fn default() -> Self {
        Self::new()
    }
}
