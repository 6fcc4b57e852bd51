//! Meshes

use crate::array::{native_len, ArrayView};
use crate::error::Result;
use crate::guard::guarded;
use crate::handle::{Borrowed, BorrowedMut, Owned};
use femlink_sys as sys;
use std::os::raw::c_int;
use std::path::Path;

pub use femlink_sys::ElementType;

/// Uniform refinement algorithm. `A` is the native default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefAlgo {
    #[default]
    A = 0,
    B = 1,
}

/// Native mesh.
#[derive(Debug)]
pub struct Mesh {
    inner: Owned<sys::Mesh>,
}

forward_base!(impl Mesh => sys::Mesh);

/// Path bytes plus length, in the form native path arguments take.
pub(crate) fn path_arg(path: &Path) -> (&[u8], usize) {
    let bytes = path.as_os_str().as_encoded_bytes();
    (bytes, bytes.len())
}

impl Mesh {
    fn adopt(op: &'static str, make: impl FnOnce() -> *mut sys::Mesh) -> Result<Self> {
        let ptr = guarded(op, make)?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }

    /// `n` segments on `[0, sx]`.
    pub fn make_cartesian_1d(n: usize, sx: f64) -> Result<Self> {
        Self::adopt("Mesh_MakeCartesian1D", || unsafe {
            sys::Mesh_MakeCartesian1D(native_len(n), sx)
        })
    }

    /// `nx` x `ny` cells of `ty` (triangles or quadrilaterals) on `[0, sx] x [0, sy]`.
    pub fn make_cartesian_2d(
        nx: usize,
        ny: usize,
        ty: ElementType,
        sx: f64,
        sy: f64,
    ) -> Result<Self> {
        Self::adopt("Mesh_MakeCartesian2D", || unsafe {
            sys::Mesh_MakeCartesian2D(native_len(nx), native_len(ny), ty, sx, sy)
        })
    }

    /// Read a mesh file written by [`Mesh::save_to_file`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let (bytes, len) = path_arg(path.as_ref());
        Self::adopt("Mesh_LoadFromFile", || unsafe {
            sys::Mesh_LoadFromFile(bytes.as_ptr(), len, 1, 1, true)
        })
    }

    pub fn dimension(&self) -> usize {
        unsafe { sys::Mesh_Dimension(self.inner.as_ptr()) as usize }
    }

    pub fn space_dimension(&self) -> usize {
        unsafe { sys::Mesh_SpaceDimension(self.inner.as_ptr()) as usize }
    }

    pub fn num_elements(&self) -> usize {
        unsafe { sys::Mesh_GetNE(self.inner.as_ptr()) as usize }
    }

    pub fn num_vertices(&self) -> usize {
        unsafe { sys::Mesh_GetNV(self.inner.as_ptr()) as usize }
    }

    pub fn num_boundary_elements(&self) -> usize {
        unsafe { sys::Mesh_GetNBE(self.inner.as_ptr()) as usize }
    }

    pub fn element_type(&self) -> ElementType {
        unsafe { sys::Mesh_GetElementType(self.inner.as_ptr()) }
    }

    /// Bumped by every change of the mesh topology.
    pub fn sequence(&self) -> u64 {
        unsafe { sys::Mesh_GetSequence(self.inner.as_ptr()) }
    }

    pub fn uniform_refinement(&mut self, algo: RefAlgo) -> Result<()> {
        let mesh = self.inner.as_mut_ptr();
        guarded("Mesh_UniformRefinement", || unsafe {
            sys::Mesh_UniformRefinement(mesh, algo as c_int)
        })
    }

    /// The nodal grid function of a curved mesh. Straight-sided meshes have
    /// none and yield `NullNativePointer`.
    pub fn nodes(&self) -> Result<Borrowed<'_, sys::GridFunction>> {
        unsafe { Borrowed::from_raw(sys::Mesh_GetNodes(self.inner.as_ptr())) }
    }

    pub fn nodes_mut(&mut self) -> Result<BorrowedMut<'_, sys::GridFunction>> {
        unsafe { BorrowedMut::from_raw(sys::Mesh_GetNodesMut(self.inner.as_mut_ptr())) }
    }

    /// Give the mesh a nodal grid function of polynomial `order`.
    pub fn set_curvature(&mut self, order: usize) -> Result<()> {
        let mesh = self.inner.as_mut_ptr();
        guarded("Mesh_SetCurvature", || unsafe {
            sys::Mesh_SetCurvature(mesh, native_len(order))
        })
    }

    /// Boundary attributes in use.
    pub fn bdr_attributes(&self) -> ArrayView<'_, i32> {
        let attributes = unsafe { &*sys::Mesh_bdr_attributes(self.inner.as_ptr()) };
        ArrayView::view_of(attributes)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>, precision: u32) -> Result<()> {
        let (bytes, len) = path_arg(path.as_ref());
        let mesh = self.inner.as_ptr();
        let precision = c_int::try_from(precision).unwrap_or(c_int::MAX);
        guarded("Mesh_Save", || unsafe {
            sys::Mesh_Save(mesh, bytes.as_ptr(), len, precision)
        })
    }

    /// Save with the configured precision.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_to_file(path, crate::config::active().save_precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ElementType::Quadrilateral, 6)]
    #[case(ElementType::Triangle, 12)]
    fn test_cartesian_2d(#[case] ty: ElementType, #[case] elements: usize) {
        let mesh = Mesh::make_cartesian_2d(3, 2, ty, 1.0, 1.0).unwrap();
        assert_eq!(mesh.dimension(), 2);
        assert_eq!(mesh.num_elements(), elements);
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.element_type(), ty);
    }

    #[test]
    fn test_invalid_element_count() {
        let err = Mesh::make_cartesian_1d(0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NativeException);
        assert!(err.native_message().unwrap().contains("invalid number of elements"));
    }

    #[test]
    fn test_refinement_bumps_sequence() {
        let mut mesh = Mesh::make_cartesian_2d(1, 1, ElementType::Quadrilateral, 1.0, 1.0).unwrap();
        let before = mesh.sequence();
        mesh.uniform_refinement(RefAlgo::default()).unwrap();
        assert_eq!(mesh.num_elements(), 4);
        assert_eq!(mesh.sequence(), before + 1);
    }

    #[test]
    fn test_nodes_absent_until_curved() {
        let mut mesh = Mesh::make_cartesian_1d(4, 1.0).unwrap();
        assert_eq!(mesh.nodes().unwrap_err().kind(), ErrorKind::NullNativePointer);
        mesh.set_curvature(2).unwrap();
        assert!(mesh.nodes().is_ok());
        assert!(mesh.nodes_mut().is_ok());
    }

    #[test]
    fn test_bdr_attributes() {
        let mesh = Mesh::make_cartesian_2d(2, 2, ElementType::Quadrilateral, 1.0, 1.0).unwrap();
        assert_eq!(mesh.bdr_attributes().to_vec(), vec![1, 2, 3, 4]);
    }
}
