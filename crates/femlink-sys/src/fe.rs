//! Finite element collections and spaces
//!
//! H1 spaces place their degrees of freedom on the order-`p` lattice of the
//! structured mesh (shared between neighbouring cells).

use crate::memory::{delete_object, new_object};
use crate::mesh::Mesh;
use crate::vector::ArrayInt;
use crate::NUM_BASIS_TYPES;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};

/// Single-character identifiers of the basis types, indexed by value.
const BASIS_IDENTIFIERS: [char; 9] = ['g', 'G', 'P', 'u', 'U', 'o', 'S', 'c', 'i'];

fn is_closed_basis(basis: c_int) -> bool {
    matches!(basis, 1 | 2 | 4 | 6 | 7)
}

/// Base of every collection. Deleted through `drop_fn`.
#[repr(C)]
pub struct FiniteElementCollection {
    order: c_int,
    dim: c_int,
    basis: c_int,
    name: CString,
    drop_fn: unsafe fn(*mut FiniteElementCollection),
}

impl FiniteElementCollection {
    pub(crate) fn order(&self) -> usize {
        self.order as usize
    }
}

#[repr(C)]
pub struct H1_FECollection {
    base: FiniteElementCollection,
}

unsafe fn drop_h1(fec: *mut FiniteElementCollection) {
    delete_object(fec as *mut H1_FECollection)
}

impl H1_FECollection {
    pub(crate) fn build(order: c_int, dim: c_int, basis: c_int) -> Self {
        let name = match basis {
            1 => format!("H1_{dim}D_P{order}"),
            2 => format!("H1Pos_{dim}D_P{order}"),
            6 => format!("H1Ser_{dim}D_P{order}"),
            b => format!("H1@{}_{dim}D_P{order}", BASIS_IDENTIFIERS[b as usize]),
        };
        Self {
            base: FiniteElementCollection {
                order,
                dim,
                basis,
                name: CString::new(name).unwrap_or_default(),
                drop_fn: drop_h1,
            },
        }
    }
}

pub unsafe extern "C-unwind" fn H1_FECollection_new(
    order: c_int,
    dim: c_int,
    basis: c_int,
) -> *mut H1_FECollection {
    native_verify!(order >= 1, "H1_FECollection requires order >= 1.");
    native_verify!(
        (1..=3).contains(&dim),
        "H1_FECollection: invalid dimension {dim}"
    );
    native_verify!(
        (0..NUM_BASIS_TYPES).contains(&basis),
        "BasisType::Check: unknown BasisType: {basis}"
    );
    native_verify!(
        is_closed_basis(basis),
        "H1_FECollection: basis type '{}' is not a closed basis",
        BASIS_IDENTIFIERS[basis as usize]
    );
    new_object(H1_FECollection::build(order, dim, basis))
}

pub unsafe extern "C-unwind" fn H1_FECollection_as_FiniteElementCollection(
    fec: *const H1_FECollection,
) -> *const FiniteElementCollection {
    fec as *const FiniteElementCollection
}

pub unsafe extern "C-unwind" fn H1_FECollection_as_mut_FiniteElementCollection(
    fec: *mut H1_FECollection,
) -> *mut FiniteElementCollection {
    fec as *mut FiniteElementCollection
}

pub unsafe extern "C-unwind" fn H1_FECollection_delete(fec: *mut H1_FECollection) {
    delete_object(fec)
}

/// Virtual destructor.
pub unsafe extern "C-unwind" fn FiniteElementCollection_delete(fec: *mut FiniteElementCollection) {
    if !fec.is_null() {
        ((*fec).drop_fn)(fec)
    }
}

/// Name of the collection as a NUL-terminated string owned by `fec`.
pub unsafe extern "C-unwind" fn FiniteElementCollection_Name(
    fec: *const FiniteElementCollection,
) -> *const c_char {
    (*fec).name.as_ptr()
}

pub unsafe extern "C-unwind" fn FiniteElementCollection_GetOrder(
    fec: *const FiniteElementCollection,
) -> c_int {
    (*fec).order
}

pub unsafe extern "C-unwind" fn FiniteElementCollection_GetBasisType(
    fec: *const FiniteElementCollection,
) -> c_int {
    (*fec).basis
}

////////////////////////
// FiniteElementSpace //
////////////////////////

/// Layout of vector-valued degrees of freedom.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// All dofs of component 0, then component 1, ...
    ByNodes = 0,
    /// All components of dof 0, then dof 1, ...
    ByVdim = 1,
}

pub struct FiniteElementSpace {
    mesh: *const Mesh,
    fec: *const FiniteElementCollection,
    vdim: c_int,
    ordering: Ordering,
    /// Boundary dofs, keyed by the mesh sequence they were computed for.
    boundary_cache: Option<(u64, Vec<usize>)>,
}

pub(crate) fn trapezoid(i: usize, n: usize, h: f64) -> f64 {
    if n == 1 {
        1.0
    } else if i == 0 || i == n - 1 {
        h / 2.0
    } else {
        h
    }
}

impl FiniteElementSpace {
    pub(crate) fn build(
        mesh: *const Mesh,
        fec: *const FiniteElementCollection,
        vdim: c_int,
        ordering: Ordering,
    ) -> Self {
        Self {
            mesh,
            fec,
            vdim,
            ordering,
            boundary_cache: None,
        }
    }

    pub(crate) fn mesh(&self) -> &Mesh {
        unsafe { &*self.mesh }
    }

    pub(crate) fn fec(&self) -> &FiniteElementCollection {
        unsafe { &*self.fec }
    }

    pub(crate) fn vdim(&self) -> usize {
        self.vdim as usize
    }

    /// Points per axis of the H1 dof lattice (1 on unused axes).
    pub(crate) fn lattice(&self) -> [usize; 3] {
        let mesh = self.mesh();
        let order = self.fec().order();
        let cells = mesh.cells();
        [0, 1, 2].map(|a| if a < mesh.dim() { cells[a] * order + 1 } else { 1 })
    }

    /// Distance between neighbouring lattice points on each axis.
    pub(crate) fn spacing(&self) -> [f64; 3] {
        let order = self.fec().order() as f64;
        self.mesh().cell_size().map(|h| h / order)
    }

    pub(crate) fn lattice_index(&self, dof: usize) -> [usize; 3] {
        let [nx, ny, _] = self.lattice();
        [dof % nx, (dof / nx) % ny, dof / (nx * ny)]
    }

    pub(crate) fn ndofs(&self) -> usize {
        self.lattice().iter().product()
    }

    pub(crate) fn vsize(&self) -> usize {
        self.vdim() * self.ndofs()
    }

    /// Index of component `comp` of scalar dof `dof` in a vector of this space.
    pub(crate) fn vdof(&self, dof: usize, comp: usize) -> usize {
        match self.ordering {
            Ordering::ByNodes => comp * self.ndofs() + dof,
            Ordering::ByVdim => dof * self.vdim() + comp,
        }
    }

    /// Physical location of every scalar dof.
    pub(crate) fn dof_points(&self) -> Vec<[f64; 3]> {
        let h = self.spacing();
        (0..self.ndofs())
            .map(|dof| {
                let idx = self.lattice_index(dof);
                [0, 1, 2].map(|a| idx[a] as f64 * h[a])
            })
            .collect()
    }

    /// Quadrature weight attached to every scalar dof; they sum to the
    /// measure of the domain.
    pub(crate) fn dof_weights(&self) -> Vec<f64> {
        let n = self.lattice();
        let h = self.spacing();
        (0..self.ndofs())
            .map(|dof| {
                let idx = self.lattice_index(dof);
                (0..3).map(|a| trapezoid(idx[a], n[a], h[a])).product()
            })
            .collect()
    }

    /// Boundary attributes touching a lattice point.
    fn attributes_at(&self, idx: [usize; 3]) -> Vec<c_int> {
        let [nx, ny, _] = self.lattice();
        let [i, j, _] = idx;
        let faces: Vec<(bool, c_int)> = if self.mesh().dim() == 1 {
            vec![(i == 0, 1), (i == nx - 1, 2)]
        } else {
            vec![(j == 0, 1), (i == nx - 1, 2), (j == ny - 1, 3), (i == 0, 4)]
        };
        faces
            .into_iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, attr)| attr)
            .collect()
    }

    /// Scalar dofs on a boundary whose attribute is marked in `marker`.
    pub(crate) fn boundary_dofs(&self, marker: &[c_int]) -> Vec<usize> {
        (0..self.ndofs())
            .filter(|&dof| {
                self.attributes_at(self.lattice_index(dof))
                    .iter()
                    .any(|&attr| marker.get(attr as usize - 1).is_some_and(|&m| m != 0))
            })
            .collect()
    }

    fn to_vdofs(&self, dofs: &[usize], component: c_int) -> Vec<c_int> {
        let comps: Vec<usize> = if component < 0 {
            (0..self.vdim()).collect()
        } else {
            vec![component as usize]
        };
        let mut vdofs: Vec<c_int> = dofs
            .iter()
            .flat_map(|&dof| comps.iter().map(move |&comp| (dof, comp)))
            .map(|(dof, comp)| self.vdof(dof, comp) as c_int)
            .collect();
        vdofs.sort_unstable();
        vdofs
    }
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_new(
    mesh: *const Mesh,
    fec: *const FiniteElementCollection,
    vdim: c_int,
    ordering: Ordering,
) -> *mut FiniteElementSpace {
    native_verify!(
        vdim >= 1,
        "FiniteElementSpace::FiniteElementSpace: invalid vdim {vdim}"
    );
    native_verify!(
        (*fec).dim as usize == (*mesh).dim(),
        "FiniteElementSpace::FiniteElementSpace: collection dimension {} \
         does not match mesh dimension {}",
        (*fec).dim,
        (*mesh).dim()
    );
    new_object(FiniteElementSpace::build(mesh, fec, vdim, ordering))
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_delete(fes: *mut FiniteElementSpace) {
    delete_object(fes)
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_GetMesh(
    fes: *const FiniteElementSpace,
) -> *const Mesh {
    (*fes).mesh
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_FEColl(
    fes: *const FiniteElementSpace,
) -> *const FiniteElementCollection {
    (*fes).fec
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_GetVDim(
    fes: *const FiniteElementSpace,
) -> c_int {
    (*fes).vdim
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_GetNDofs(
    fes: *const FiniteElementSpace,
) -> c_int {
    (*fes).ndofs() as c_int
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_GetVSize(
    fes: *const FiniteElementSpace,
) -> c_int {
    (*fes).vsize() as c_int
}

/// Serial spaces have no constrained dofs, so the true size is the full size.
pub unsafe extern "C-unwind" fn FiniteElementSpace_GetTrueVSize(
    fes: *const FiniteElementSpace,
) -> c_int {
    (*fes).vsize() as c_int
}

pub unsafe extern "C-unwind" fn FiniteElementSpace_GetOrdering(
    fes: *const FiniteElementSpace,
) -> Ordering {
    (*fes).ordering
}

/// Collect into `out` the true dofs on every boundary marked in `bdr_attr_is_ess`.
/// `component < 0` selects every vector component.
pub unsafe extern "C-unwind" fn FiniteElementSpace_GetEssentialTrueDofs(
    fes: *const FiniteElementSpace,
    bdr_attr_is_ess: *const ArrayInt,
    out: *mut ArrayInt,
    component: c_int,
) {
    let fes = &*fes;
    let marker = (*bdr_attr_is_ess).as_slice();
    let max_attr = fes.mesh().max_bdr_attribute();
    native_verify!(
        marker.len() >= max_attr as usize,
        "FiniteElementSpace::GetEssentialTrueDofs: boundary marker has {} entries, \
         mesh uses attribute {}",
        marker.len(),
        max_attr
    );
    native_verify!(
        component < fes.vdim,
        "FiniteElementSpace::GetEssentialTrueDofs: invalid component {component}"
    );
    let dofs = fes.boundary_dofs(marker);
    (*out).assign(&fes.to_vdofs(&dofs, component));
}

/// Collect into `out` the true dofs on the whole boundary. The result is
/// cached in the space until the mesh changes.
pub unsafe extern "C-unwind" fn FiniteElementSpace_GetBoundaryTrueDofs(
    fes: *mut FiniteElementSpace,
    out: *mut ArrayInt,
    component: c_int,
) {
    let space = &mut *fes;
    native_verify!(
        component < space.vdim,
        "FiniteElementSpace::GetBoundaryTrueDofs: invalid component {component}"
    );
    let sequence = space.mesh().sequence();
    let fresh = matches!(&space.boundary_cache, Some((seq, _)) if *seq == sequence);
    if !fresh {
        let all = vec![1; space.mesh().max_bdr_attribute() as usize];
        let dofs = space.boundary_dofs(&all);
        space.boundary_cache = Some((sequence, dofs));
    }
    let dofs = match &space.boundary_cache {
        Some((_, dofs)) => dofs.as_slice(),
        None => &[],
    };
    (*out).assign(&space.to_vdofs(dofs, component));
}
