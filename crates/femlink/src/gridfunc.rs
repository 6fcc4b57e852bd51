//! Grid functions

use crate::cast::{AsBase, AsBaseMut};
use crate::coefficient::{Coefficient, VectorCoefficient};
use crate::error::Result;
use crate::fespace::FiniteElementSpace;
use crate::guard::guarded;
use crate::handle::{Borrowed, BorrowedMut, Owned};
use crate::mesh::path_arg;
use femlink_sys as sys;
use std::marker::PhantomData;
use std::os::raw::c_int;
use std::path::Path;

/// Dof values of a finite element space. A grid function is also a native
/// `Vector`, so [`VectorLike`](crate::VectorLike) applies.
#[derive(Debug)]
pub struct GridFunction<'fes> {
    inner: Owned<sys::GridFunction>,
    _fes: PhantomData<&'fes sys::FiniteElementSpace>,
}

forward_base!(impl<'fes> GridFunction<'fes> => sys::GridFunction);
forward_base!(impl<'fes> GridFunction<'fes> => sys::Vector);

impl<'fes> GridFunction<'fes> {
    /// Zero-valued function of `fes`.
    pub fn new(fes: &'fes FiniteElementSpace<'_>) -> Self {
        let fes: *const sys::FiniteElementSpace = fes.as_base();
        Self {
            inner: unsafe { Owned::from_fresh(sys::GridFunction_new(fes)) },
            _fes: PhantomData,
        }
    }
}

/// Read access shared by everything that is a native `GridFunction`,
/// including the borrowed nodes of a curved mesh.
pub trait GridFunctionLike: AsBase<sys::GridFunction> {
    /// The collection this grid function owns, if any. Mesh nodes own theirs;
    /// functions built with [`GridFunction::new`] do not.
    fn own_collection(&self) -> Result<Borrowed<'_, sys::FiniteElementCollection>> {
        unsafe { Borrowed::from_raw(sys::GridFunction_OwnFEC(self.as_base())) }
    }

    fn save_to_file(&self, path: impl AsRef<Path>, precision: u32) -> Result<()> {
        let (bytes, len) = path_arg(path.as_ref());
        let gf: *const sys::GridFunction = self.as_base();
        let precision = c_int::try_from(precision).unwrap_or(c_int::MAX);
        guarded("GridFunction_Save", || unsafe {
            sys::GridFunction_Save(gf, bytes.as_ptr(), len, precision)
        })
    }

    /// Save with the configured precision.
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_to_file(path, crate::config::active().save_precision)
    }
}

impl<T: AsBase<sys::GridFunction> + ?Sized> GridFunctionLike for T {}

/// Write access shared by everything that is a native `GridFunction`.
pub trait GridFunctionLikeMut: AsBaseMut<sys::GridFunction> {
    /// Interpolate a scalar coefficient at every dof.
    fn project_coefficient<C: Coefficient + ?Sized>(&mut self, coeff: &C) -> Result<()> {
        let gf = self.as_base_mut().as_mut_ptr();
        let coeff: *const sys::Coefficient = coeff.as_base();
        guarded("GridFunction_ProjectCoefficient", || unsafe {
            sys::GridFunction_ProjectCoefficient(gf, coeff)
        })
    }

    /// Interpolate a vector coefficient; its `vdim` must match the space.
    fn project_vector_coefficient<C: VectorCoefficient + ?Sized>(
        &mut self,
        coeff: &C,
    ) -> Result<()> {
        let gf = self.as_base_mut().as_mut_ptr();
        let coeff: *const sys::VectorCoefficient = coeff.as_base();
        guarded("GridFunction_ProjectVectorCoefficient", || unsafe {
            sys::GridFunction_ProjectVectorCoefficient(gf, coeff)
        })
    }

    fn own_collection_mut(&mut self) -> Result<BorrowedMut<'_, sys::FiniteElementCollection>> {
        let gf: *const sys::GridFunction = self.as_base_mut().as_ptr();
        unsafe { BorrowedMut::from_raw(sys::GridFunction_OwnFEC(gf)) }
    }
}

impl<T: AsBaseMut<sys::GridFunction> + ?Sized> GridFunctionLikeMut for T {}
