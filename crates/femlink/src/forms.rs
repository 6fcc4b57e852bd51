//! Linear and bilinear forms and their integrators
//!
//! A form takes ownership of every integrator added to it. Integrators
//! borrow their coefficients for `'c`, so a form carrying integrators is
//! itself bounded by `'c`.

use crate::array::ArrayInt;
use crate::cast::{AsBase, AsBaseMut, IntoBase};
use crate::coefficient::Coefficient;
use crate::error::Result;
use crate::fespace::FiniteElementSpace;
use crate::guard::guarded;
use crate::handle::{Borrowed, Owned};
use crate::operator::OperatorHandle;
use crate::vector::{Vector, VectorLike, VectorLikeMut};
use femlink_sys as sys;
use std::marker::PhantomData;
use std::ptr;

/// An integrator a [`LinearForm`] can take over.
pub trait LinearFormIntegrator<'c> {
    /// Give up the native integrator.
    fn into_native(self) -> Owned<sys::LinearFormIntegrator>;
}

/// An integrator a [`BilinearForm`] can take over.
pub trait BilinearFormIntegrator<'c> {
    fn into_native(self) -> Owned<sys::BilinearFormIntegrator>;
}

fn coefficient_ptr<C: Coefficient + ?Sized>(q: &C) -> *const sys::Coefficient {
    q.as_base()
}

macro_rules! integrator {
    ($(#[$doc:meta])* $name:ident($native:ty, $new:path) => $base:ty, $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name<'c> {
            inner: Owned<$native>,
            _q: PhantomData<&'c sys::Coefficient>,
        }

        forward_base!(impl<'c> $name<'c> => $native);
        forward_base!(impl<'c> $name<'c> => $base);

        impl<'c> $name<'c> {
            /// Weighted by `q`.
            pub fn new<C: Coefficient + ?Sized>(q: &'c C) -> Self {
                Self::adopt(coefficient_ptr(q))
            }

            /// Unit weight.
            pub fn unit() -> Self {
                Self::adopt(ptr::null())
            }

            fn adopt(q: *const sys::Coefficient) -> Self {
                Self {
                    inner: unsafe { Owned::from_fresh($new(q)) },
                    _q: PhantomData,
                }
            }
        }

        impl<'c> $kind<'c> for $name<'c> {
            fn into_native(self) -> Owned<$base> {
                self.inner.into_base()
            }
        }
    };
}

integrator!(
    /// `b(v) = ∫ q v`.
    DomainLfIntegrator(sys::DomainLFIntegrator, sys::DomainLFIntegrator_new)
        => sys::LinearFormIntegrator, LinearFormIntegrator
);

integrator!(
    /// `a(u, v) = ∫ q ∇u·∇v`. Requires an H1 space.
    DiffusionIntegrator(sys::DiffusionIntegrator, sys::DiffusionIntegrator_new)
        => sys::BilinearFormIntegrator, BilinearFormIntegrator
);

/// Right-hand side vector of a finite element problem.
#[derive(Debug)]
pub struct LinearForm<'fes, 'c> {
    inner: Owned<sys::LinearForm>,
    _borrows: PhantomData<(&'fes sys::FiniteElementSpace, &'c sys::Coefficient)>,
}

forward_base!(impl<'fes, 'c> LinearForm<'fes, 'c> => sys::LinearForm);
forward_base!(impl<'fes, 'c> LinearForm<'fes, 'c> => sys::Vector);

impl<'fes, 'c> LinearForm<'fes, 'c> {
    pub fn new(fes: &'fes FiniteElementSpace<'_>) -> Self {
        let fes: *const sys::FiniteElementSpace = fes.as_base();
        Self {
            inner: unsafe { Owned::from_fresh(sys::LinearForm_new(fes)) },
            _borrows: PhantomData,
        }
    }

    pub fn add_domain_integrator<I: LinearFormIntegrator<'c>>(&mut self, integ: I) -> Result<()> {
        let mut integ = integ.into_native();
        let lf = self.inner.as_mut_ptr();
        let raw = integ.as_mut_ptr();
        guarded("LinearForm_AddDomainIntegrator", || unsafe {
            sys::LinearForm_AddDomainIntegrator(lf, raw)
        })?;
        // The form releases it from now on.
        let _ = integ.into_raw();
        Ok(())
    }

    /// Recompute the vector from the integrators.
    pub fn assemble(&mut self) -> Result<()> {
        let lf = self.inner.as_mut_ptr();
        guarded("LinearForm_Assemble", || unsafe { sys::LinearForm_Assemble(lf) })
    }
}

/// The reduced system `A X = B` produced by
/// [`BilinearForm::form_linear_system`].
#[derive(Debug)]
pub struct LinearSystem {
    pub a: OperatorHandle,
    pub x: Vector,
    pub b: Vector,
}

/// System matrix of a finite element problem.
#[derive(Debug)]
pub struct BilinearForm<'fes, 'c> {
    inner: Owned<sys::BilinearForm>,
    _borrows: PhantomData<(&'fes sys::FiniteElementSpace, &'c sys::Coefficient)>,
}

forward_base!(impl<'fes, 'c> BilinearForm<'fes, 'c> => sys::BilinearForm);

impl<'fes, 'c> BilinearForm<'fes, 'c> {
    pub fn new(fes: &'fes FiniteElementSpace<'_>) -> Self {
        let fes: *const sys::FiniteElementSpace = fes.as_base();
        Self {
            inner: unsafe { Owned::from_fresh(sys::BilinearForm_new(fes)) },
            _borrows: PhantomData,
        }
    }

    pub fn add_domain_integrator<I: BilinearFormIntegrator<'c>>(&mut self, integ: I) -> Result<()> {
        let mut integ = integ.into_native();
        let bf = self.inner.as_mut_ptr();
        let raw = integ.as_mut_ptr();
        guarded("BilinearForm_AddDomainIntegrator", || unsafe {
            sys::BilinearForm_AddDomainIntegrator(bf, raw)
        })?;
        let _ = integ.into_raw();
        Ok(())
    }

    /// Number of rows of the assembled matrix.
    pub fn size(&self) -> usize {
        unsafe { sys::BilinearForm_Size(self.inner.as_ptr()) as usize }
    }

    /// Assemble the sparse matrix, dropping explicit zeros when `skip_zeros`.
    pub fn assemble(&mut self, skip_zeros: bool) -> Result<()> {
        let bf = self.inner.as_mut_ptr();
        guarded("BilinearForm_Assemble", || unsafe {
            sys::BilinearForm_Assemble(bf, skip_zeros.into())
        })
    }

    /// The assembled matrix.
    pub fn sp_mat(&self) -> Result<Borrowed<'_, sys::SparseMatrix>> {
        let bf = self.inner.as_ptr();
        let mat = guarded("BilinearForm_SpMat", || unsafe { sys::BilinearForm_SpMat(bf) })?;
        unsafe { Borrowed::from_raw(mat) }
    }

    /// Eliminate the essential dofs `ess_tdofs`, whose values are taken from
    /// `x`, and build the reduced system. With `copy_interior` the interior
    /// entries of `X` start from `x`; otherwise from zero.
    pub fn form_linear_system<X, B>(
        &mut self,
        ess_tdofs: &ArrayInt,
        x: &X,
        b: &B,
        copy_interior: bool,
    ) -> Result<LinearSystem>
    where
        X: VectorLike + ?Sized,
        B: VectorLike + ?Sized,
    {
        let mut system = LinearSystem {
            a: OperatorHandle::new(),
            x: Vector::new(0)?,
            b: Vector::new(0)?,
        };
        let bf = self.inner.as_mut_ptr();
        let ess: *const sys::ArrayInt = ess_tdofs.as_base();
        let x: *const sys::Vector = x.as_base();
        let b: *const sys::Vector = b.as_base();
        let a = AsBaseMut::<sys::OperatorHandle>::as_base_mut(&mut system.a).as_mut_ptr();
        let x_out = system.x.as_base_mut().as_mut_ptr();
        let b_out = system.b.as_base_mut().as_mut_ptr();
        guarded("BilinearForm_FormLinearSystem", || unsafe {
            sys::BilinearForm_FormLinearSystem(bf, ess, x, b, a, x_out, b_out, copy_interior.into())
        })?;
        Ok(system)
    }

    /// Like [`BilinearForm::form_linear_system`], moving the results into
    /// existing handles. On failure the outputs are left as they were.
    pub fn form_linear_system_into<X, B>(
        &mut self,
        ess_tdofs: &ArrayInt,
        x: &X,
        b: &B,
        a_out: &mut OperatorHandle,
        x_out: &mut Vector,
        b_out: &mut Vector,
    ) -> Result<()>
    where
        X: VectorLike + ?Sized,
        B: VectorLike + ?Sized,
    {
        let system = self.form_linear_system(ess_tdofs, x, b, false)?;
        *a_out = system.a;
        *x_out = system.x;
        *b_out = system.b;
        Ok(())
    }

    /// Copy the solution `x_sol` of the reduced system back into the grid
    /// function `x`.
    pub fn recover_fem_solution<S, B, X>(&mut self, x_sol: &S, b: &B, x: &mut X) -> Result<()>
    where
        S: VectorLike + ?Sized,
        B: VectorLike + ?Sized,
        X: VectorLikeMut + ?Sized,
    {
        let bf = self.inner.as_mut_ptr();
        let x_sol: *const sys::Vector = x_sol.as_base();
        let b: *const sys::Vector = b.as_base();
        let x = x.as_base_mut().as_mut_ptr();
        guarded("BilinearForm_RecoverFEMSolution", || unsafe {
            sys::BilinearForm_RecoverFEMSolution(bf, x_sol, b, x)
        })
    }
}
