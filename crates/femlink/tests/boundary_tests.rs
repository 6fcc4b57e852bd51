//! Ownership, casting and fault translation across the public surface

use femlink::{
    sys, try_downcast, try_downcast_mut, AsBase, AsBaseMut, BasisType, Borrowed,
    ConstantCoefficient, DenseMatrix, DenseMatrixLike, DofOrdering, Error, ErrorKind,
    FiniteElementSpace, FunctionCoefficient, GridFunction, GridFunctionLikeMut, H1Collection,
    IntoBase, Mesh, Operator, OperatorHandle, Owned, SparseMatrix, SparseMatrixLikeMut, TypeTag,
    Vector, VectorLike,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::panic::{self, AssertUnwindSafe};
use tempfile::TempDir;

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn test_objects_released_when_their_owner_drops() {
    let before = sys::native_live_objects();
    {
        let mesh = Mesh::make_cartesian_1d(3, 1.0).unwrap();
        let fec = H1Collection::new(2, 1, BasisType::GaussLobatto).unwrap();
        let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
        let _gf = GridFunction::new(&fes);
        assert_eq!(sys::native_live_objects(), before + 4);
    }
    assert_eq!(sys::native_live_objects(), before);
}

#[test]
fn test_raw_roundtrip_keeps_a_single_owner() {
    let before = sys::native_live_objects();
    let owned = unsafe { Owned::from_raw(sys::Vector_new(4)) }.unwrap();
    let raw = owned.into_raw();
    assert_eq!(sys::native_live_objects(), before + 1);

    let owned = unsafe { Owned::from_raw(raw.as_ptr()) }.unwrap();
    assert_eq!(owned.len(), 4);
    owned.release();
    assert_eq!(sys::native_live_objects(), before);
}

#[test]
fn test_borrowed_accessor_never_releases() {
    let mut mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    mesh.set_curvature(1).unwrap();
    let before = sys::native_live_objects();
    for _ in 0..3 {
        let nodes = mesh.nodes().unwrap();
        assert_eq!(nodes.len(), 3);
    }
    assert_eq!(sys::native_live_objects(), before);
}

#[test]
fn test_null_accessor_result() {
    let mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    let err = mesh.nodes().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullNativePointer);

    let err = unsafe { Borrowed::<sys::Vector>::from_raw(std::ptr::null()) }.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullNativePointer);
}

// ============================================================================
// Casting
// ============================================================================

#[test]
fn test_upcast_reaches_the_same_object() {
    let mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    let fec = H1Collection::new(1, 1, BasisType::GaussLobatto).unwrap();
    let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    let gf = GridFunction::new(&fes);

    let as_vector: &sys::Vector = gf.as_base();
    let as_grid_function: &sys::GridFunction = gf.as_base();
    let through_native = unsafe { sys::GridFunction_as_Vector(as_grid_function) };
    assert!(std::ptr::eq(as_vector, through_native));
}

#[test]
fn test_into_base_transfers_to_the_handle() {
    let before = sys::native_live_objects();
    let mut handle = OperatorHandle::new();
    let op: Owned<sys::Operator> = SparseMatrix::new(2, 2).unwrap().into_base();
    handle.reset(op);
    assert_eq!(handle.type_tag(), TypeTag::SparseMatrix);
    drop(handle);
    assert_eq!(sys::native_live_objects(), before);
}

#[rstest]
#[case::sparse_as_sparse(true, TypeTag::SparseMatrix, None)]
#[case::sparse_as_dense(true, TypeTag::DenseMatrix, Some(TypeTag::SparseMatrix))]
#[case::dense_as_dense(false, TypeTag::DenseMatrix, None)]
#[case::dense_as_sparse(false, TypeTag::SparseMatrix, Some(TypeTag::DenseMatrix))]
fn test_checked_downcast(
    #[case] sparse: bool,
    #[case] target: TypeTag,
    #[case] mismatch: Option<TypeTag>,
) {
    let mut handle = OperatorHandle::new();
    if sparse {
        let mut mat = SparseMatrix::new(2, 2).unwrap();
        mat.add(0, 0, 1.0).unwrap();
        handle.reset(mat);
    } else {
        handle.reset(DenseMatrix::new(2, 2).unwrap());
    }

    let result = match target {
        TypeTag::SparseMatrix => handle.try_as::<sys::SparseMatrix>().map(|_| ()),
        _ => handle.try_as::<sys::DenseMatrix>().map(|_| ()),
    };
    match mismatch {
        None => assert!(result.is_ok()),
        Some(found) => assert_eq!(
            result.unwrap_err(),
            Error::WrongDowncastType {
                expected: target,
                found,
            }
        ),
    }
    // A refused downcast leaves the operator in place.
    assert_eq!((handle.height(), handle.width()), (2, 2));
}

#[test]
fn test_free_downcast_reads_the_object_type() {
    let mut dense = DenseMatrix::new(2, 2).unwrap();
    let op = Borrowed::from_ref(AsBase::<sys::Operator>::as_base(&dense));
    assert_eq!(
        try_downcast::<sys::SparseMatrix>(op).unwrap_err(),
        Error::WrongDowncastType {
            expected: TypeTag::SparseMatrix,
            found: TypeTag::DenseMatrix,
        }
    );
    assert_eq!(try_downcast::<sys::DenseMatrix>(op).unwrap().elem(0, 0).unwrap(), 0.0);

    let op = AsBaseMut::<sys::Operator>::as_base_mut(&mut dense);
    let err = try_downcast_mut::<sys::SparseMatrix>(op).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongDowncastType);
}

#[test]
fn test_handle_base_is_not_the_held_operator() {
    let mut handle = OperatorHandle::new();
    handle.reset(SparseMatrix::new(2, 2).unwrap());
    let own_base = Borrowed::from_ref(AsBase::<sys::Operator>::as_base(&handle));
    assert_eq!(
        try_downcast::<sys::SparseMatrix>(own_base).unwrap_err(),
        Error::WrongDowncastType {
            expected: TypeTag::SparseMatrix,
            found: TypeTag::Any,
        }
    );
    assert!(handle.try_as::<sys::SparseMatrix>().is_ok());
}

// ============================================================================
// Fault translation
// ============================================================================

#[test]
fn test_native_message_is_verbatim() {
    let err = H1Collection::new(0, 2, BasisType::GaussLobatto).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NativeException);
    assert_eq!(
        err.native_message(),
        Some("H1_FECollection requires order >= 1.")
    );
}

#[test]
fn test_missing_mesh_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.mesh");
    let err = Mesh::from_file(&path).unwrap_err();
    let expected = format!("Mesh::Load: unable to open mesh file: {}", path.display());
    assert_eq!(err.native_message(), Some(expected.as_str()));
}

#[test]
fn test_malformed_mesh_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.mesh");
    std::fs::write(&path, "not a mesh\n").unwrap();
    let err = Mesh::from_file(&path).unwrap_err();
    let message = err.native_message().unwrap();
    assert!(message.contains("unknown mesh format 'not a mesh'"));
}

#[test]
fn test_failed_mult_leaves_output_untouched() {
    let mat = SparseMatrix::new(3, 3).unwrap();
    let x = Vector::new(2).unwrap();
    let mut y = Vector::from_slice(&[1.0, 2.0, 3.0]).unwrap();
    let err = mat.mult(&x, &mut y).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NativeException);
    assert_eq!(y.to_vec(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_host_panic_in_callback_propagates() {
    let mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    let fec = H1Collection::new(1, 1, BasisType::GaussLobatto).unwrap();
    let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    let mut gf = GridFunction::new(&fes);
    let coeff = FunctionCoefficient::new(|x: &[f64]| {
        if x[0] > 0.7 {
            panic!("host callback failed");
        }
        x[0]
    });

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| gf.project_coefficient(&coeff)));
    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"host callback failed"));

    // The objects are still usable afterwards.
    gf.project_coefficient(&ConstantCoefficient::new(1.0)).unwrap();
    assert_eq!(gf.to_vec(), vec![1.0; 3]);
}
