//! Polymorphism adapter
//!
//! Native types form single-inheritance hierarchies. The binding exposes them
//! as explicit capabilities:
//! - [`AsBase`] / [`AsBaseMut`]: borrow any object as one of its bases
//! - [`IntoBase`]: turn ownership of a derived object into ownership of its
//!   base, for bases whose release is virtual
//! - [`Tagged`] + [`try_downcast`]: go back down the hierarchy, checked
//!   against the runtime [`TypeTag`] stored in the object
//!
//! Each upcast goes through the dedicated native `<Derived>_as_<Base>`
//! function. The table of native types and (derived, base) pairs lives at the
//! bottom of this file.
//!
//! Exclusive access never yields a `&mut` to a native struct: embedded bases
//! carry the dispatch table and type tag of the whole object, so moving one
//! out (for instance with `std::mem::swap`) would corrupt both objects.
//! Mutation goes through the native `<Type>_<Operation>` calls only.

use crate::error::{Error, Result};
use crate::handle::{Borrowed, BorrowedMut, NativeObject, Owned};
use femlink_sys as sys;
use std::fmt;
use std::ptr::NonNull;

/// Shared access to `self` as a `B`.
pub trait AsBase<B> {
    fn as_base(&self) -> &B;
}

/// Exclusive access to `self` as a `B`.
///
/// The returned handle cannot be turned into a `&mut B`, so bases cannot be
/// swapped or moved between objects:
///
/// ```compile_fail
/// use femlink::{sys, AsBaseMut, DenseMatrix, SparseMatrix};
///
/// let mut sparse = SparseMatrix::new(2, 2).unwrap();
/// let mut dense = DenseMatrix::new(2, 2).unwrap();
/// let mut a = AsBaseMut::<sys::Operator>::as_base_mut(&mut sparse);
/// let mut b = AsBaseMut::<sys::Operator>::as_base_mut(&mut dense);
/// std::mem::swap(&mut *a, &mut *b);
/// ```
pub trait AsBaseMut<B>: AsBase<B> {
    fn as_base_mut(&mut self) -> BorrowedMut<'_, B>;
}

/// Ownership of `self` as ownership of a `B`.
pub trait IntoBase<B: NativeObject> {
    fn into_base(self) -> Owned<B>;
}

/// Pointer-level upcast of a native type.
///
/// # Safety
///
/// `upcast_mut` must return the `B` subobject of the live `Self` it is given.
pub unsafe trait Upcast<B>: AsBase<B> {
    /// # Safety
    ///
    /// `ptr` must be a live `Self`.
    unsafe fn upcast_mut(ptr: *mut Self) -> *mut B;
}

/// A base whose native release dispatches to the most derived type.
///
/// # Safety
///
/// `NativeObject::delete` of `Self` must be the virtual destructor.
pub unsafe trait VirtualBase: NativeObject {}

fn upcast<T: Upcast<B>, B>(ptr: NonNull<T>) -> NonNull<B> {
    let base = unsafe { T::upcast_mut(ptr.as_ptr()) };
    debug_assert!(!base.is_null(), "native upcast returned null");
    unsafe { NonNull::new_unchecked(base) }
}

impl<T, B> AsBase<B> for Owned<T>
where
    T: NativeObject + AsBase<B>,
{
    fn as_base(&self) -> &B {
        AsBase::<B>::as_base(&**self)
    }
}

impl<T, B> AsBaseMut<B> for Owned<T>
where
    T: NativeObject + Upcast<B>,
{
    fn as_base_mut(&mut self) -> BorrowedMut<'_, B> {
        let base = upcast::<T, B>(self.as_non_null());
        unsafe { BorrowedMut::from_non_null(base) }
    }
}

impl<T, B> IntoBase<B> for Owned<T>
where
    T: NativeObject + Upcast<B>,
    B: VirtualBase,
{
    fn into_base(self) -> Owned<B> {
        let base = upcast::<T, B>(self.into_raw());
        unsafe { Owned::from_non_null(base) }
    }
}

impl<T, B> AsBase<B> for Borrowed<'_, T>
where
    T: AsBase<B>,
{
    fn as_base(&self) -> &B {
        AsBase::<B>::as_base(&**self)
    }
}

impl<T, B> AsBase<B> for BorrowedMut<'_, T>
where
    T: AsBase<B>,
{
    fn as_base(&self) -> &B {
        AsBase::<B>::as_base(&**self)
    }
}

impl<T, B> AsBaseMut<B> for BorrowedMut<'_, T>
where
    T: Upcast<B>,
{
    fn as_base_mut(&mut self) -> BorrowedMut<'_, B> {
        let base = upcast::<T, B>(self.as_non_null());
        unsafe { BorrowedMut::from_non_null(base) }
    }
}

/// Register a native type: its release function and the identity upcast.
macro_rules! native_object {
    ($ty:ty, $name:literal, $delete:path) => {
        unsafe impl $crate::handle::NativeObject for $ty {
            const TYPE_NAME: &'static str = $name;

            unsafe fn delete(ptr: *mut Self) {
                $delete(ptr)
            }
        }

        impl $crate::cast::AsBase<$ty> for $ty {
            fn as_base(&self) -> &$ty {
                self
            }
        }

        unsafe impl $crate::cast::Upcast<$ty> for $ty {
            unsafe fn upcast_mut(ptr: *mut $ty) -> *mut $ty {
                ptr
            }
        }
    };
}

/// Register a (derived, base) pair backed by its native cast functions.
macro_rules! subclass {
    ($derived:ty => $base:ty, $as_base:path, $as_base_mut:path) => {
        impl $crate::cast::AsBase<$base> for $derived {
            fn as_base(&self) -> &$base {
                unsafe { &*$as_base(self) }
            }
        }

        unsafe impl $crate::cast::Upcast<$base> for $derived {
            unsafe fn upcast_mut(ptr: *mut $derived) -> *mut $base {
                $as_base_mut(ptr)
            }
        }
    };
}

/// Forward the upcasts of a safe wrapper to its `inner` handle.
macro_rules! forward_base {
    (impl <$($lt:lifetime),+> $wrapper:ty => $base:ty) => {
        forward_base!(@emit [$($lt),+] $wrapper => $base);
    };
    (impl $wrapper:ty => $base:ty) => {
        forward_base!(@emit [] $wrapper => $base);
    };
    (@emit [$($lt:lifetime),*] $wrapper:ty => $base:ty) => {
        impl <$($lt),*> $crate::cast::AsBase<$base> for $wrapper {
            fn as_base(&self) -> &$base {
                $crate::cast::AsBase::<$base>::as_base(&self.inner)
            }
        }

        impl <$($lt),*> $crate::cast::AsBaseMut<$base> for $wrapper {
            fn as_base_mut(&mut self) -> $crate::handle::BorrowedMut<'_, $base> {
                $crate::cast::AsBaseMut::<$base>::as_base_mut(&mut self.inner)
            }
        }
    };
}

/// Runtime type of an operator, as reported by the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Any,
    SparseMatrix,
    DenseMatrix,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Any => "Any",
            TypeTag::SparseMatrix => "SparseMatrix",
            TypeTag::DenseMatrix => "DenseMatrix",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<sys::OperatorType> for TypeTag {
    fn from(ty: sys::OperatorType) -> Self {
        match ty {
            sys::OperatorType::Any => TypeTag::Any,
            sys::OperatorType::SparseMatrix => TypeTag::SparseMatrix,
            sys::OperatorType::DenseMatrix => TypeTag::DenseMatrix,
        }
    }
}

/// An operator subtype identified by a runtime tag.
///
/// # Safety
///
/// An operator reporting `TAG` must be a `Self`, and the `from_operator`
/// functions must be the native downcasts.
pub unsafe trait Tagged: NativeObject + AsBase<sys::Operator> {
    const TAG: TypeTag;

    /// # Safety
    ///
    /// `op` must be a `Self`.
    unsafe fn from_operator(op: *const sys::Operator) -> *const Self;

    /// # Safety
    ///
    /// `op` must be a `Self`.
    unsafe fn from_operator_mut(op: *mut sys::Operator) -> *mut Self;
}

unsafe impl Tagged for sys::SparseMatrix {
    const TAG: TypeTag = TypeTag::SparseMatrix;

    unsafe fn from_operator(op: *const sys::Operator) -> *const Self {
        sys::Operator_as_SparseMatrix(op)
    }

    unsafe fn from_operator_mut(op: *mut sys::Operator) -> *mut Self {
        sys::Operator_as_mut_SparseMatrix(op)
    }
}

unsafe impl Tagged for sys::DenseMatrix {
    const TAG: TypeTag = TypeTag::DenseMatrix;

    unsafe fn from_operator(op: *const sys::Operator) -> *const Self {
        sys::Operator_as_DenseMatrix(op)
    }

    unsafe fn from_operator_mut(op: *mut sys::Operator) -> *mut Self {
        sys::Operator_as_mut_DenseMatrix(op)
    }
}

/// Runtime type of the object behind `op`.
pub(crate) fn runtime_type(op: &sys::Operator) -> TypeTag {
    TypeTag::from(unsafe { sys::Operator_Type(op) })
}

fn check_tag<T: Tagged>(op: &sys::Operator) -> Result<()> {
    let found = runtime_type(op);
    if found == T::TAG {
        Ok(())
    } else {
        log::debug!("downcast to {} refused: operator is {found}", T::TAG);
        Err(Error::WrongDowncastType {
            expected: T::TAG,
            found,
        })
    }
}

/// Reinterpret `op` as a `T` when its runtime type is `T::TAG`.
///
/// On a tag mismatch nothing is touched and `WrongDowncastType` is returned.
pub fn try_downcast<'a, T: Tagged>(op: Borrowed<'a, sys::Operator>) -> Result<Borrowed<'a, T>> {
    check_tag::<T>(&op)?;
    let ptr = unsafe { T::from_operator(op.as_ptr()) };
    Ok(unsafe { Borrowed::from_non_null(NonNull::new_unchecked(ptr.cast_mut())) })
}

/// Exclusive counterpart of [`try_downcast`].
pub fn try_downcast_mut<'a, T: Tagged>(
    mut op: BorrowedMut<'a, sys::Operator>,
) -> Result<BorrowedMut<'a, T>> {
    check_tag::<T>(&op)?;
    let ptr = unsafe { T::from_operator_mut(op.as_mut_ptr()) };
    unsafe { BorrowedMut::from_raw(ptr) }
}

////////////////////
// Type hierarchy //
////////////////////

native_object!(sys::Vector, "Vector", sys::Vector_delete);
native_object!(sys::ArrayInt, "Array<int>", sys::ArrayInt_delete);
native_object!(sys::Mesh, "Mesh", sys::Mesh_delete);
native_object!(sys::FiniteElementSpace, "FiniteElementSpace", sys::FiniteElementSpace_delete);
native_object!(sys::GridFunction, "GridFunction", sys::GridFunction_delete);
native_object!(sys::LinearForm, "LinearForm", sys::LinearForm_delete);
native_object!(sys::BilinearForm, "BilinearForm", sys::BilinearForm_delete);

native_object!(
    sys::FiniteElementCollection,
    "FiniteElementCollection",
    sys::FiniteElementCollection_delete
);
native_object!(sys::H1_FECollection, "H1_FECollection", sys::H1_FECollection_delete);

native_object!(sys::Coefficient, "Coefficient", sys::Coefficient_delete);
native_object!(sys::ConstantCoefficient, "ConstantCoefficient", sys::ConstantCoefficient_delete);
native_object!(sys::FunctionCoefficient, "FunctionCoefficient", sys::FunctionCoefficient_delete);
native_object!(sys::VectorCoefficient, "VectorCoefficient", sys::VectorCoefficient_delete);
native_object!(
    sys::VectorConstantCoefficient,
    "VectorConstantCoefficient",
    sys::VectorConstantCoefficient_delete
);
native_object!(
    sys::VectorFunctionCoefficient,
    "VectorFunctionCoefficient",
    sys::VectorFunctionCoefficient_delete
);

native_object!(
    sys::LinearFormIntegrator,
    "LinearFormIntegrator",
    sys::LinearFormIntegrator_delete
);
native_object!(
    sys::BilinearFormIntegrator,
    "BilinearFormIntegrator",
    sys::BilinearFormIntegrator_delete
);
native_object!(sys::DomainLFIntegrator, "DomainLFIntegrator", sys::DomainLFIntegrator_delete);
native_object!(sys::DiffusionIntegrator, "DiffusionIntegrator", sys::DiffusionIntegrator_delete);

native_object!(sys::Operator, "Operator", sys::Operator_delete);
native_object!(sys::SparseMatrix, "SparseMatrix", sys::SparseMatrix_delete);
native_object!(sys::DenseMatrix, "DenseMatrix", sys::DenseMatrix_delete);
native_object!(sys::OperatorHandle, "OperatorHandle", sys::OperatorHandle_delete);

unsafe impl VirtualBase for sys::FiniteElementCollection {}
unsafe impl VirtualBase for sys::Coefficient {}
unsafe impl VirtualBase for sys::VectorCoefficient {}
unsafe impl VirtualBase for sys::LinearFormIntegrator {}
unsafe impl VirtualBase for sys::BilinearFormIntegrator {}
unsafe impl VirtualBase for sys::Operator {}

// Vector has no virtual release, so these two pairs only borrow.
subclass!(
    sys::GridFunction => sys::Vector,
    sys::GridFunction_as_Vector,
    sys::GridFunction_as_mut_Vector
);
subclass!(
    sys::LinearForm => sys::Vector,
    sys::LinearForm_as_Vector,
    sys::LinearForm_as_mut_Vector
);

subclass!(
    sys::H1_FECollection => sys::FiniteElementCollection,
    sys::H1_FECollection_as_FiniteElementCollection,
    sys::H1_FECollection_as_mut_FiniteElementCollection
);

subclass!(
    sys::ConstantCoefficient => sys::Coefficient,
    sys::ConstantCoefficient_as_Coefficient,
    sys::ConstantCoefficient_as_mut_Coefficient
);
subclass!(
    sys::FunctionCoefficient => sys::Coefficient,
    sys::FunctionCoefficient_as_Coefficient,
    sys::FunctionCoefficient_as_mut_Coefficient
);
subclass!(
    sys::VectorConstantCoefficient => sys::VectorCoefficient,
    sys::VectorConstantCoefficient_as_VectorCoefficient,
    sys::VectorConstantCoefficient_as_mut_VectorCoefficient
);
subclass!(
    sys::VectorFunctionCoefficient => sys::VectorCoefficient,
    sys::VectorFunctionCoefficient_as_VectorCoefficient,
    sys::VectorFunctionCoefficient_as_mut_VectorCoefficient
);

subclass!(
    sys::DomainLFIntegrator => sys::LinearFormIntegrator,
    sys::DomainLFIntegrator_as_LinearFormIntegrator,
    sys::DomainLFIntegrator_as_mut_LinearFormIntegrator
);
subclass!(
    sys::DiffusionIntegrator => sys::BilinearFormIntegrator,
    sys::DiffusionIntegrator_as_BilinearFormIntegrator,
    sys::DiffusionIntegrator_as_mut_BilinearFormIntegrator
);

subclass!(
    sys::SparseMatrix => sys::Operator,
    sys::SparseMatrix_as_Operator,
    sys::SparseMatrix_as_mut_Operator
);
subclass!(
    sys::DenseMatrix => sys::Operator,
    sys::DenseMatrix_as_Operator,
    sys::DenseMatrix_as_mut_Operator
);
subclass!(
    sys::OperatorHandle => sys::Operator,
    sys::OperatorHandle_as_Operator,
    sys::OperatorHandle_as_mut_Operator
);
