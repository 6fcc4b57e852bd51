//! Structured meshes
//!
//! A native mesh is a Cartesian block of `cells[0] x cells[1]` cells
//! (triangular meshes split every cell in two). Uniform refinement bisects
//! every cell along each axis. Boundary attributes follow the Cartesian
//! convention: 1D `1=left 2=right`, 2D `1=bottom 2=right 3=top 4=left`.

use crate::fe::{FiniteElementCollection, FiniteElementSpace, H1_FECollection, Ordering};
use crate::gridfunc::GridFunction;
use crate::memory::{delete_object, new_object};
use crate::vector::ArrayInt;
use std::fmt::Write as _;
use std::os::raw::c_int;
use std::ptr;

const MESH_HEADER: &str = "femlink mesh v1.0";

/// Element geometry of a native mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Point = 0,
    Segment = 1,
    Triangle = 2,
    Quadrilateral = 3,
    Tetrahedron = 4,
    Hexahedron = 5,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Point => "Point",
            ElementType::Segment => "Segment",
            ElementType::Triangle => "Triangle",
            ElementType::Quadrilateral => "Quadrilateral",
            ElementType::Tetrahedron => "Tetrahedron",
            ElementType::Hexahedron => "Hexahedron",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            ElementType::Point,
            ElementType::Segment,
            ElementType::Triangle,
            ElementType::Quadrilateral,
            ElementType::Tetrahedron,
            ElementType::Hexahedron,
        ]
        .into_iter()
        .find(|ty| ty.name() == name)
    }
}

pub struct Mesh {
    dim: c_int,
    geometry: ElementType,
    cells: [usize; 3],
    extent: [f64; 3],
    bdr_attributes: ArrayInt,
    nodes: *mut GridFunction,
    nodes_order: c_int,
    sequence: u64,
}

impl Mesh {
    fn structured(dim: c_int, geometry: ElementType, cells: [usize; 3], extent: [f64; 3]) -> Self {
        let attributes: Vec<c_int> = (1..=2 * dim).collect();
        Self {
            dim,
            geometry,
            cells,
            extent,
            bdr_attributes: ArrayInt::from_values(&attributes),
            nodes: ptr::null_mut(),
            nodes_order: 0,
            sequence: 0,
        }
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim as usize
    }

    pub(crate) fn geometry(&self) -> ElementType {
        self.geometry
    }

    pub(crate) fn cells(&self) -> [usize; 3] {
        self.cells
    }

    pub(crate) fn cell_size(&self) -> [f64; 3] {
        [0, 1, 2].map(|a| self.extent[a] / self.cells[a] as f64)
    }

    /// Bumped by every topology change.
    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn max_bdr_attribute(&self) -> c_int {
        2 * self.dim
    }

    pub(crate) fn num_elements(&self) -> usize {
        let per_cell = if self.geometry == ElementType::Triangle { 2 } else { 1 };
        self.cells.iter().product::<usize>() * per_cell
    }

    fn num_vertices(&self) -> usize {
        (0..self.dim()).map(|a| self.cells[a] + 1).product()
    }

    fn num_boundary_elements(&self) -> usize {
        let [nx, ny, _] = self.cells;
        if self.dim == 1 {
            2
        } else {
            2 * (nx + ny)
        }
    }

    fn write(&self, precision: usize) -> String {
        let digits = precision.saturating_sub(1);
        let mut out = String::new();
        let _ = writeln!(out, "{MESH_HEADER}\n");
        let _ = writeln!(out, "dimension\n{}\n", self.dim);
        let _ = writeln!(out, "geometry\n{}\n", self.geometry.name());
        let [nx, ny, nz] = self.cells;
        let _ = writeln!(out, "cells\n{nx} {ny} {nz}\n");
        let extent: Vec<String> = self.extent.iter().map(|x| format!("{x:.digits$e}")).collect();
        let _ = writeln!(out, "extent\n{}\n", extent.join(" "));
        let _ = writeln!(out, "curvature\n{}", self.nodes_order);
        out
    }

    fn parse(text: &str) -> Result<Self, String> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        match lines.next() {
            Some(MESH_HEADER) => {}
            Some(other) => return Err(format!("unknown mesh format '{other}'")),
            None => return Err("empty mesh file".to_string()),
        }

        let mut dim = None;
        let mut geometry = None;
        let mut cells = None;
        let mut extent = None;
        let mut curvature = 0;
        while let Some(section) = lines.next() {
            let value = lines
                .next()
                .ok_or_else(|| format!("missing value for section '{section}'"))?;
            match section {
                "dimension" => dim = Some(parse_field::<c_int>(section, value)?),
                "geometry" => {
                    geometry = Some(
                        ElementType::from_name(value)
                            .ok_or_else(|| format!("unknown geometry '{value}'"))?,
                    )
                }
                "cells" => cells = Some(parse_triple::<usize>(section, value)?),
                "extent" => extent = Some(parse_triple::<f64>(section, value)?),
                "curvature" => curvature = parse_field::<c_int>(section, value)?,
                other => return Err(format!("unknown section '{other}'")),
            }
        }

        let dim = dim.ok_or("missing section 'dimension'")?;
        let geometry = geometry.ok_or("missing section 'geometry'")?;
        let cells = cells.ok_or("missing section 'cells'")?;
        let extent = extent.ok_or("missing section 'extent'")?;
        let expected = match dim {
            1 => &[ElementType::Segment][..],
            2 => &[ElementType::Triangle, ElementType::Quadrilateral][..],
            _ => return Err(format!("invalid dimension {dim}")),
        };
        if !expected.contains(&geometry) {
            return Err(format!("geometry {} is not valid in {dim}D", geometry.name()));
        }
        for axis in 0..3 {
            let used = axis < dim as usize;
            if cells[axis] == 0 || (!used && cells[axis] != 1) {
                return Err(format!("invalid cell count on axis {axis}"));
            }
            if used && extent[axis] <= 0.0 {
                return Err(format!("invalid extent on axis {axis}"));
            }
        }
        let mut mesh = Mesh::structured(dim, geometry, cells, extent);
        mesh.nodes_order = curvature.max(0);
        Ok(mesh)
    }
}

fn parse_field<T: std::str::FromStr>(section: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid value '{value}' in section '{section}'"))
}

fn parse_triple<T: std::str::FromStr + Copy>(section: &str, value: &str) -> Result<[T; 3], String> {
    let fields = value
        .split_whitespace()
        .map(|field| parse_field::<T>(section, field))
        .collect::<Result<Vec<_>, _>>()?;
    match fields.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(format!("expected three values in section '{section}'")),
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        unsafe { delete_object(self.nodes) };
    }
}

/// Replace the nodal field of `mesh` by an order-`order` H1 vector field
/// holding the vertex coordinates.
unsafe fn rebuild_nodes(mesh: *mut Mesh, order: c_int) {
    delete_object((*mesh).nodes);
    (*mesh).nodes = ptr::null_mut();

    let dim = (*mesh).dim;
    let fec = new_object(H1_FECollection::build(order, dim, 1)) as *mut FiniteElementCollection;
    let fes = new_object(FiniteElementSpace::build(mesh, fec, dim, Ordering::ByVdim));
    let nodes = new_object(GridFunction::build(fes));
    (*nodes).take_ownership(fes, fec);

    let space = &*fes;
    let points = space.dof_points();
    let values = (*nodes).values_mut();
    for (dof, point) in points.iter().enumerate() {
        for comp in 0..dim as usize {
            values[space.vdof(dof, comp)] = point[comp];
        }
    }
    (*mesh).nodes = nodes;
    (*mesh).nodes_order = order;
}

fn new_mesh(mesh: Mesh) -> *mut Mesh {
    let order = mesh.nodes_order;
    let mesh = new_object(mesh);
    if order > 0 {
        unsafe { rebuild_nodes(mesh, order) };
    }
    mesh
}

pub unsafe extern "C-unwind" fn Mesh_MakeCartesian1D(n: c_int, sx: f64) -> *mut Mesh {
    native_verify!(n > 0, "Mesh::MakeCartesian1D: invalid number of elements {n}");
    native_verify!(sx > 0.0, "Mesh::MakeCartesian1D: invalid length {sx}");
    new_mesh(Mesh::structured(
        1,
        ElementType::Segment,
        [n as usize, 1, 1],
        [sx, 0.0, 0.0],
    ))
}

pub unsafe extern "C-unwind" fn Mesh_MakeCartesian2D(
    nx: c_int,
    ny: c_int,
    ty: ElementType,
    sx: f64,
    sy: f64,
) -> *mut Mesh {
    native_verify!(
        nx > 0 && ny > 0,
        "Mesh::MakeCartesian2D: invalid number of elements {nx} x {ny}"
    );
    native_verify!(
        matches!(ty, ElementType::Triangle | ElementType::Quadrilateral),
        "Mesh::MakeCartesian2D: unsupported element type {}",
        ty.name()
    );
    native_verify!(
        sx > 0.0 && sy > 0.0,
        "Mesh::MakeCartesian2D: invalid extent {sx} x {sy}"
    );
    new_mesh(Mesh::structured(
        2,
        ty,
        [nx as usize, ny as usize, 1],
        [sx, sy, 0.0],
    ))
}

pub unsafe extern "C-unwind" fn Mesh_LoadFromFile(
    path: *const u8,
    len: usize,
    _generate_edges: c_int,
    _refine: c_int,
    _fix_orientation: bool,
) -> *mut Mesh {
    let path = crate::path_from_raw(path, len);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => crate::error::native_error(format!(
            "Mesh::Load: unable to open mesh file: {}",
            path.display()
        )),
    };
    match Mesh::parse(&text) {
        Ok(mesh) => new_mesh(mesh),
        Err(reason) => {
            crate::error::native_error(format!("Mesh::Load: {reason} in {}", path.display()))
        }
    }
}

pub unsafe extern "C-unwind" fn Mesh_delete(mesh: *mut Mesh) {
    delete_object(mesh)
}

pub unsafe extern "C-unwind" fn Mesh_Dimension(mesh: *const Mesh) -> c_int {
    (*mesh).dim
}

pub unsafe extern "C-unwind" fn Mesh_SpaceDimension(mesh: *const Mesh) -> c_int {
    (*mesh).dim
}

pub unsafe extern "C-unwind" fn Mesh_GetNE(mesh: *const Mesh) -> c_int {
    (*mesh).num_elements() as c_int
}

pub unsafe extern "C-unwind" fn Mesh_GetNV(mesh: *const Mesh) -> c_int {
    (*mesh).num_vertices() as c_int
}

pub unsafe extern "C-unwind" fn Mesh_GetNBE(mesh: *const Mesh) -> c_int {
    (*mesh).num_boundary_elements() as c_int
}

pub unsafe extern "C-unwind" fn Mesh_GetElementType(mesh: *const Mesh) -> ElementType {
    (*mesh).geometry()
}

pub unsafe extern "C-unwind" fn Mesh_GetSequence(mesh: *const Mesh) -> u64 {
    (*mesh).sequence
}

pub unsafe extern "C-unwind" fn Mesh_UniformRefinement(mesh: *mut Mesh, ref_algo: c_int) {
    native_verify!(
        ref_algo == 0 || ref_algo == 1,
        "Mesh::UniformRefinement: invalid refinement algorithm {ref_algo}"
    );
    let m = &mut *mesh;
    for axis in 0..m.dim() {
        m.cells[axis] *= 2;
    }
    m.sequence += 1;
    if !m.nodes.is_null() {
        let order = m.nodes_order;
        rebuild_nodes(mesh, order);
    }
}

/// Nodal field of the mesh, or null when the mesh has none.
pub unsafe extern "C-unwind" fn Mesh_GetNodes(mesh: *const Mesh) -> *const GridFunction {
    (*mesh).nodes
}

pub unsafe extern "C-unwind" fn Mesh_GetNodesMut(mesh: *mut Mesh) -> *mut GridFunction {
    (*mesh).nodes
}

pub unsafe extern "C-unwind" fn Mesh_SetCurvature(mesh: *mut Mesh, order: c_int) {
    native_verify!(order >= 1, "Mesh::SetCurvature: invalid order {order}");
    rebuild_nodes(mesh, order);
}

pub unsafe extern "C-unwind" fn Mesh_bdr_attributes(mesh: *const Mesh) -> *const ArrayInt {
    &(*mesh).bdr_attributes
}

pub unsafe extern "C-unwind" fn Mesh_Save(
    mesh: *const Mesh,
    path: *const u8,
    len: usize,
    precision: c_int,
) {
    native_verify!(precision >= 1, "Mesh::Save: invalid precision {precision}");
    let path = crate::path_from_raw(path, len);
    let text = (*mesh).write(precision as usize);
    if let Err(err) = std::fs::write(&path, text) {
        crate::error::native_error(format!(
            "Mesh::Save: unable to write {} ({err})",
            path.display()
        ));
    }
}
