//! Contiguous native containers: `Vector` (reals) and `ArrayInt` (ints)
//!
//! Both carry an ownership flag. An owning container frees its buffer
//! through the native allocator; a non-owning one only points at memory
//! that somebody else keeps alive.

use crate::memory::{alloc_copy, alloc_slice, delete_object, free_slice, new_object};
use std::os::raw::c_int;
use std::slice;

macro_rules! contiguous {
    ($name:ident, $elem:ty) => {
        #[repr(C)]
        pub struct $name {
            data: *mut $elem,
            size: c_int,
            owns: bool,
        }

        #[allow(dead_code)]
        impl $name {
            pub(crate) fn with_len(len: usize) -> Self {
                Self {
                    data: alloc_slice(len),
                    size: len as c_int,
                    owns: true,
                }
            }

            pub(crate) fn from_values(values: &[$elem]) -> Self {
                Self {
                    data: alloc_copy(values),
                    size: values.len() as c_int,
                    owns: true,
                }
            }

            /// Non-owning container over `values`.
            pub(crate) fn borrowed(values: &mut [$elem]) -> Self {
                Self {
                    data: values.as_mut_ptr(),
                    size: values.len() as c_int,
                    owns: false,
                }
            }

            pub(crate) fn len(&self) -> usize {
                self.size as usize
            }

            pub(crate) fn as_slice(&self) -> &[$elem] {
                if self.size == 0 {
                    &[]
                } else {
                    unsafe { slice::from_raw_parts(self.data, self.size as usize) }
                }
            }

            pub(crate) fn as_mut_slice(&mut self) -> &mut [$elem] {
                if self.size == 0 {
                    &mut []
                } else {
                    unsafe { slice::from_raw_parts_mut(self.data, self.size as usize) }
                }
            }

            /// Replace the contents with a fresh owned copy of `values`.
            pub(crate) fn assign(&mut self, values: &[$elem]) {
                self.release_data();
                self.data = alloc_copy(values);
                self.size = values.len() as c_int;
                self.owns = true;
            }

            /// Resize to `len` zeroed entries.
            pub(crate) fn reset(&mut self, len: usize) {
                self.release_data();
                self.data = alloc_slice(len);
                self.size = len as c_int;
                self.owns = true;
            }

            fn release_data(&mut self) {
                if self.owns {
                    unsafe { free_slice(self.data, self.size as usize) };
                }
                self.data = std::ptr::null_mut();
                self.size = 0;
                self.owns = false;
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.release_data();
            }
        }
    };
}

contiguous!(Vector, f64);
contiguous!(ArrayInt, c_int);

////////////
// Vector //
////////////

pub unsafe extern "C-unwind" fn Vector_new(size: c_int) -> *mut Vector {
    native_verify!(size >= 0, "Vector::Vector: invalid size {size}");
    new_object(Vector::with_len(size as usize))
}

/// Wrap `data`; with `own_data` the vector frees it through the native
/// allocator.
pub unsafe extern "C-unwind" fn Vector_from_data(
    data: *mut f64,
    size: c_int,
    own_data: bool,
) -> *mut Vector {
    native_verify!(size >= 0, "Vector::Vector: invalid size {size}");
    native_verify!(
        !data.is_null() || size == 0,
        "Vector::Vector: null data with size {size}"
    );
    if data.is_null() {
        return new_object(Vector::with_len(0));
    }
    new_object(Vector {
        data,
        size,
        owns: own_data,
    })
}

pub unsafe extern "C-unwind" fn Vector_delete(v: *mut Vector) {
    delete_object(v)
}

pub unsafe extern "C-unwind" fn Vector_Size(v: *const Vector) -> c_int {
    (*v).size
}

pub unsafe extern "C-unwind" fn Vector_GetData(v: *const Vector) -> *const f64 {
    (*v).data
}

pub unsafe extern "C-unwind" fn Vector_GetDataMut(v: *mut Vector) -> *mut f64 {
    (*v).data
}

pub unsafe extern "C-unwind" fn Vector_OwnsData(v: *const Vector) -> bool {
    (*v).owns
}

pub unsafe extern "C-unwind" fn Vector_SetAll(v: *mut Vector, value: f64) {
    (*v).as_mut_slice().fill(value);
}

pub unsafe extern "C-unwind" fn Vector_SetSize(v: *mut Vector, size: c_int) {
    native_verify!(size >= 0, "Vector::SetSize: invalid size {size}");
    (*v).reset(size as usize);
}

pub unsafe extern "C-unwind" fn Vector_Dot(a: *const Vector, b: *const Vector) -> f64 {
    native_verify!(
        (*a).size == (*b).size,
        "Vector::operator*: size mismatch ({} vs {})",
        (*a).size,
        (*b).size
    );
    let (a, b) = ((*a).as_slice(), (*b).as_slice());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

//////////////
// ArrayInt //
//////////////

pub unsafe extern "C-unwind" fn ArrayInt_new() -> *mut ArrayInt {
    new_object(ArrayInt::with_len(0))
}

pub unsafe extern "C-unwind" fn ArrayInt_with_len(size: c_int) -> *mut ArrayInt {
    native_verify!(size >= 0, "Array::Array: invalid size {size}");
    new_object(ArrayInt::with_len(size as usize))
}

pub unsafe extern "C-unwind" fn ArrayInt_copy(src: *const ArrayInt) -> *mut ArrayInt {
    new_object(ArrayInt::from_values((*src).as_slice()))
}

/// Wrap `data`; with `own_data` the array frees it through the native
/// allocator.
pub unsafe extern "C-unwind" fn ArrayInt_from_slice(
    data: *mut c_int,
    len: c_int,
    own_data: bool,
) -> *mut ArrayInt {
    native_verify!(len >= 0, "Array::Array: invalid size {len}");
    native_verify!(!data.is_null() || len == 0, "Array::Array: null data with size {len}");
    if data.is_null() {
        return new_object(ArrayInt::with_len(0));
    }
    new_object(ArrayInt {
        data,
        size: len,
        owns: own_data,
    })
}

pub unsafe extern "C-unwind" fn ArrayInt_delete(a: *mut ArrayInt) {
    delete_object(a)
}

pub unsafe extern "C-unwind" fn ArrayInt_Size(a: *const ArrayInt) -> c_int {
    (*a).size
}

pub unsafe extern "C-unwind" fn ArrayInt_GetData(a: *const ArrayInt) -> *const c_int {
    (*a).data
}

pub unsafe extern "C-unwind" fn ArrayInt_GetDataMut(a: *mut ArrayInt) -> *mut c_int {
    (*a).data
}

pub unsafe extern "C-unwind" fn ArrayInt_OwnsData(a: *const ArrayInt) -> bool {
    (*a).owns
}

pub unsafe extern "C-unwind" fn ArrayInt_SetAll(a: *mut ArrayInt, value: c_int) {
    (*a).as_mut_slice().fill(value);
}

/// Append one entry, moving the contents into an owned buffer.
pub unsafe extern "C-unwind" fn ArrayInt_Append(a: *mut ArrayInt, value: c_int) {
    let mut values = (*a).as_slice().to_vec();
    values.push(value);
    (*a).assign(&values);
}
