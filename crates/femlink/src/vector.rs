//! Native vectors and vector-like objects

use crate::array::{native_len, ArrayView, ArrayViewMut};
use crate::cast::{AsBase, AsBaseMut};
use crate::error::Result;
use crate::guard::guarded;
use crate::handle::Owned;
use femlink_sys as sys;

/// Native `Vector` of reals.
#[derive(Debug)]
pub struct Vector {
    inner: Owned<sys::Vector>,
}

forward_base!(impl Vector => sys::Vector);

impl Vector {
    /// `len` zeros.
    pub fn new(len: usize) -> Result<Self> {
        let ptr = guarded("Vector_new", || unsafe { sys::Vector_new(native_len(len)) })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }

    /// Copy `values` into native storage owned by the vector.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let mut buffer = ArrayViewMut::<f64>::allocate(values.len())?;
        buffer.copy_from_slice(values);
        Self::from_owned_view(buffer)
    }

    /// Adopt a buffer, owned by the vector when the view owned it.
    pub fn from_owned_view(view: ArrayViewMut<'static, f64>) -> Result<Self> {
        let (ptr, len, owns) = view.into_raw_parts();
        let ptr = guarded("Vector_from_data", || unsafe {
            sys::Vector_from_data(ptr, native_len(len), owns)
        })?;
        Ok(Self {
            inner: unsafe { Owned::from_fresh(ptr) },
        })
    }

    /// Resize to `len` zeros.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        let v = self.inner.as_mut_ptr();
        guarded("Vector_SetSize", || unsafe { sys::Vector_SetSize(v, native_len(len)) })
    }
}

/// Read access shared by everything that is a native `Vector`.
pub trait VectorLike: AsBase<sys::Vector> {
    fn len(&self) -> usize {
        unsafe { sys::Vector_Size(self.as_base()) as usize }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the vector releases its storage.
    fn owns_data(&self) -> bool {
        unsafe { sys::Vector_OwnsData(self.as_base()) }
    }

    /// Zero-copy view of the values.
    fn values(&self) -> ArrayView<'_, f64> {
        ArrayView::view_of(self.as_base())
    }

    fn to_vec(&self) -> Vec<f64> {
        self.values().to_vec()
    }

    /// Inner product with a vector of the same length.
    fn dot<V: VectorLike + ?Sized>(&self, other: &V) -> Result<f64> {
        let a: *const sys::Vector = self.as_base();
        let b: *const sys::Vector = other.as_base();
        guarded("Vector_Dot", || unsafe { sys::Vector_Dot(a, b) })
    }
}

impl<T: AsBase<sys::Vector> + ?Sized> VectorLike for T {}

/// Write access shared by everything that is a native `Vector`.
pub trait VectorLikeMut: AsBaseMut<sys::Vector> {
    /// Zero-copy mutable view of the values.
    fn values_mut(&mut self) -> ArrayViewMut<'_, f64> {
        ArrayViewMut::view_of_mut(self)
    }

    fn set_all(&mut self, value: f64) {
        let mut base = self.as_base_mut();
        unsafe { sys::Vector_SetAll(base.as_mut_ptr(), value) }
    }
}

impl<T: AsBaseMut<sys::Vector> + ?Sized> VectorLikeMut for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_is_zeroed() {
        let v = Vector::new(3).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v.to_vec(), vec![0.0; 3]);
        assert!(v.owns_data());
    }

    #[test]
    fn test_values_mut_writes_through() {
        let mut v = Vector::from_slice(&[1.0, 2.0]).unwrap();
        v.values_mut().set(0, 5.0);
        assert_eq!(v.to_vec(), vec![5.0, 2.0]);
        v.set_all(-1.0);
        assert_eq!(v.to_vec(), vec![-1.0, -1.0]);
    }

    #[test]
    fn test_dot() {
        let a = Vector::from_slice(&[1.0, 2.0, 3.0]).unwrap();
        let b = Vector::from_slice(&[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(a.dot(&b).unwrap(), 32.0);
    }

    #[test]
    fn test_dot_size_mismatch_is_native_exception() {
        let a = Vector::new(2).unwrap();
        let b = Vector::new(3).unwrap();
        let err = a.dot(&b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NativeException);
    }

    #[test]
    fn test_resize() {
        let mut v = Vector::from_slice(&[1.0]).unwrap();
        v.resize(4).unwrap();
        assert_eq!(v.len(), 4);
    }
}
