//! Finite element collections and spaces

use crate::array::{native_len, ArrayInt};
use crate::cast::{AsBase, AsBaseMut};
use crate::error::Result;
use crate::guard::guarded;
use crate::handle::Owned;
use crate::mesh::Mesh;
use femlink_sys as sys;
use std::ffi::CStr;
use std::marker::PhantomData;
use std::os::raw::c_int;

pub use femlink_sys::Ordering as DofOrdering;

/// Point sets used to build polynomial bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BasisType {
    GaussLegendre = 0,
    GaussLobatto = 1,
    Positive = 2,
    OpenUniform = 3,
    ClosedUniform = 4,
    OpenHalfUniform = 5,
    Serendipity = 6,
    ClosedGL = 7,
    IntegratedGLL = 8,
}

impl BasisType {
    pub const ALL: [BasisType; sys::NUM_BASIS_TYPES as usize] = [
        BasisType::GaussLegendre,
        BasisType::GaussLobatto,
        BasisType::Positive,
        BasisType::OpenUniform,
        BasisType::ClosedUniform,
        BasisType::OpenHalfUniform,
        BasisType::Serendipity,
        BasisType::ClosedGL,
        BasisType::IntegratedGLL,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Anything that is a native `FiniteElementCollection`.
pub trait FiniteElementCollection: AsBase<sys::FiniteElementCollection> {
    fn name(&self) -> &str {
        let name = unsafe { CStr::from_ptr(sys::FiniteElementCollection_Name(self.as_base())) };
        name.to_str().unwrap_or_default()
    }

    fn order(&self) -> usize {
        unsafe { sys::FiniteElementCollection_GetOrder(self.as_base()) as usize }
    }

    fn basis_type(&self) -> Option<BasisType> {
        BasisType::from_raw(unsafe { sys::FiniteElementCollection_GetBasisType(self.as_base()) })
    }
}

impl<T: AsBase<sys::FiniteElementCollection> + ?Sized> FiniteElementCollection for T {}

/// Continuous (H1-conforming) elements.
#[derive(Debug)]
pub struct H1Collection {
    inner: Owned<sys::H1_FECollection>,
}

forward_base!(impl H1Collection => sys::H1_FECollection);
forward_base!(impl H1Collection => sys::FiniteElementCollection);

impl H1Collection {
    /// Order `order >= 1` on `dim`-dimensional meshes. `basis` must be closed.
    pub fn new(order: usize, dim: usize, basis: BasisType) -> Result<Self> {
        let ptr = guarded("H1_FECollection_new", || unsafe {
            sys::H1_FECollection_new(native_len(order), native_len(dim), basis as c_int)
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }
}

/// A finite element space over a mesh. Borrows the mesh and the
/// collection for `'a`.
#[derive(Debug)]
pub struct FiniteElementSpace<'a> {
    inner: Owned<sys::FiniteElementSpace>,
    _borrows: PhantomData<(&'a Mesh, &'a sys::FiniteElementCollection)>,
}

forward_base!(impl<'a> FiniteElementSpace<'a> => sys::FiniteElementSpace);

fn component_arg(component: Option<usize>) -> c_int {
    component.map_or(-1, native_len)
}

impl<'a> FiniteElementSpace<'a> {
    pub fn new<C>(mesh: &'a Mesh, fec: &'a C, vdim: usize, ordering: DofOrdering) -> Result<Self>
    where
        C: FiniteElementCollection + ?Sized,
    {
        let mesh: *const sys::Mesh = mesh.as_base();
        let fec: *const sys::FiniteElementCollection = fec.as_base();
        let ptr = guarded("FiniteElementSpace_new", || unsafe {
            sys::FiniteElementSpace_new(mesh, fec, native_len(vdim), ordering)
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
            _borrows: PhantomData,
        })
    }

    /// Dimension of the underlying mesh.
    pub fn dimension(&self) -> usize {
        let mesh = unsafe { sys::FiniteElementSpace_GetMesh(self.inner.as_ptr()) };
        unsafe { sys::Mesh_Dimension(mesh) as usize }
    }

    pub fn vdim(&self) -> usize {
        unsafe { sys::FiniteElementSpace_GetVDim(self.inner.as_ptr()) as usize }
    }

    pub fn num_dofs(&self) -> usize {
        unsafe { sys::FiniteElementSpace_GetNDofs(self.inner.as_ptr()) as usize }
    }

    pub fn vsize(&self) -> usize {
        unsafe { sys::FiniteElementSpace_GetVSize(self.inner.as_ptr()) as usize }
    }

    pub fn true_vsize(&self) -> usize {
        unsafe { sys::FiniteElementSpace_GetTrueVSize(self.inner.as_ptr()) as usize }
    }

    pub fn ordering(&self) -> DofOrdering {
        unsafe { sys::FiniteElementSpace_GetOrdering(self.inner.as_ptr()) }
    }

    pub fn collection_name(&self) -> &str {
        let fec = unsafe { &*sys::FiniteElementSpace_FEColl(self.inner.as_ptr()) };
        fec.name()
    }

    /// True dofs on the boundaries whose entry in `marker` is nonzero.
    /// `marker[i]` refers to boundary attribute `i + 1`; `component` selects
    /// one vector component, `None` all of them.
    pub fn essential_true_dofs(
        &self,
        marker: &ArrayInt,
        component: Option<usize>,
    ) -> Result<ArrayInt> {
        let mut out = ArrayInt::new();
        let fes = self.inner.as_ptr();
        let marker: *const sys::ArrayInt = marker.as_base();
        let dofs: *mut sys::ArrayInt = out.as_base_mut().as_mut_ptr();
        guarded("FiniteElementSpace_GetEssentialTrueDofs", || unsafe {
            let component = component_arg(component);
            sys::FiniteElementSpace_GetEssentialTrueDofs(fes, marker, dofs, component)
        })?;
        Ok(out)
    }

    /// True dofs on the whole boundary. The native space caches the list.
    pub fn boundary_true_dofs(&mut self, component: Option<usize>) -> Result<ArrayInt> {
        let mut out = ArrayInt::new();
        let fes = self.inner.as_mut_ptr();
        let dofs: *mut sys::ArrayInt = out.as_base_mut().as_mut_ptr();
        guarded("FiniteElementSpace_GetBoundaryTrueDofs", || unsafe {
            sys::FiniteElementSpace_GetBoundaryTrueDofs(fes, dofs, component_arg(component))
        })?;
        Ok(out)
    }
}
