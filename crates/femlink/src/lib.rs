//! femlink - safe bindings over a native finite element object model
//!
//! Native objects live behind raw pointers and signal faults by unwinding
//! with a native exception. This crate wraps them so that:
//! - every object is released exactly once ([`Owned`]), or never
//!   ([`Borrowed`], [`BorrowedMut`])
//! - base-class access is explicit and checked at compile time ([`AsBase`],
//!   [`IntoBase`]); going back down is checked at runtime ([`TypeTag`])
//! - native faults come back as [`Error`] values
//! - contiguous native storage is visible as slices ([`ArrayView`])
//! - host closures can be called from native code ([`NativeCallback`])
//!
//! # Example
//!
//! ```no_run
//! use femlink::{
//!     BasisType, DofOrdering, ElementType, FiniteElementSpace, GridFunction,
//!     GridFunctionLikeMut, H1Collection, Mesh, FunctionCoefficient,
//! };
//!
//! let mesh = Mesh::make_cartesian_2d(4, 4, ElementType::Quadrilateral, 1.0, 1.0)?;
//! let fec = H1Collection::new(1, mesh.dimension(), BasisType::GaussLobatto)?;
//! let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes)?;
//! let mut u = GridFunction::new(&fes);
//! u.project_coefficient(&FunctionCoefficient::new(|x: &[f64]| x[0] * x[1]))?;
//! # Ok::<(), femlink::Error>(())
//! ```
//!
//! Nothing here is `Send` or `Sync`: one native object graph belongs to one
//! thread.

#[macro_use]
mod cast;

pub mod array;
pub mod callback;
pub mod coefficient;
pub mod config;
pub mod error;
pub mod fespace;
pub mod forms;
pub mod gridfunc;
pub mod guard;
pub mod handle;
pub mod mesh;
pub mod operator;
pub mod vector;

pub use femlink_sys as sys;

pub use array::{
    ArrayInt, ArrayView, ArrayViewMut, ContiguousSource, ContiguousSourceMut, Element,
};
pub use callback::{NativeCallback, NativeVectorCallback};
pub use cast::{
    try_downcast, try_downcast_mut, AsBase, AsBaseMut, IntoBase, Tagged, TypeTag, Upcast,
    VirtualBase,
};
pub use coefficient::{
    Coefficient, ConstantCoefficient, FunctionCoefficient, VectorCoefficient,
    VectorConstantCoefficient, VectorFunctionCoefficient,
};
pub use config::{BindingConfig, Capabilities, ConfigError, ConfigResult, ErrorAction};
pub use error::{Error, ErrorKind, Result};
pub use fespace::{
    BasisType, DofOrdering, FiniteElementCollection, FiniteElementSpace, H1Collection,
};
pub use forms::{
    BilinearForm, BilinearFormIntegrator, DiffusionIntegrator, DomainLfIntegrator, LinearForm,
    LinearFormIntegrator, LinearSystem,
};
pub use gridfunc::{GridFunction, GridFunctionLike, GridFunctionLikeMut};
pub use guard::{guarded, non_null};
pub use handle::{Borrowed, BorrowedMut, NativeObject, Owned};
pub use mesh::{ElementType, Mesh, RefAlgo};
pub use operator::{
    DenseMatrix, DenseMatrixLike, DenseMatrixLikeMut, DenseMatrixMut, DenseMatrixRef, Operator,
    OperatorHandle, SparseMatrix, SparseMatrixLike, SparseMatrixLikeMut, SparseMatrixMut,
    SparseMatrixRef,
};
pub use vector::{Vector, VectorLike, VectorLikeMut};

/// Apply `config` to the native library before the first boundary call.
///
/// Without an explicit call the configuration is loaded from the global
/// config file and the environment on first use.
pub fn init(config: BindingConfig) -> ConfigResult<&'static BindingConfig> {
    config::init(config)
}
