//! Property tests for buffer views and callbacks

use femlink::{
    sys, ArrayInt, ArrayView, BasisType, DofOrdering, FiniteElementSpace, FunctionCoefficient,
    GridFunction, GridFunctionLikeMut, H1Collection, Mesh, NativeCallback, Vector, VectorLike,
    VectorLikeMut,
};
use proptest::prelude::*;
use std::cell::RefCell;

proptest! {
    #[test]
    fn view_aliases_array_storage(
        values in prop::collection::vec(any::<i32>(), 1..64),
        index in any::<prop::sample::Index>(),
        replacement in any::<i32>(),
    ) {
        let mut array = ArrayInt::from_slice(&values).unwrap();
        let view = array.view();
        prop_assert_eq!(view.as_slice(), values.as_slice());
        drop(view);
        prop_assert!(!array.view().owns());

        let i = index.index(values.len());
        array.view_mut().set(i, replacement);
        let mut expected = values.clone();
        expected[i] = replacement;
        prop_assert_eq!(array.to_vec(), expected);
    }

    #[test]
    fn owned_copy_is_detached(values in prop::collection::vec(-1e6f64..1e6, 0..64)) {
        let allocations = sys::native_live_allocations();
        {
            let mut v = Vector::from_slice(&values).unwrap();
            let copy = ArrayView::view_of(&v).owned_copy().unwrap();
            prop_assert!(copy.owns());
            v.set_all(0.0);
            prop_assert_eq!(copy.as_slice(), values.as_slice());
        }
        prop_assert_eq!(sys::native_live_allocations(), allocations);
    }

    #[test]
    fn clone_is_deep(values in prop::collection::vec(any::<i32>(), 1..32)) {
        let original = ArrayInt::from_slice(&values).unwrap();
        let mut copy = original.clone();
        copy.set_all(0);
        prop_assert_eq!(original.to_vec(), values);
        prop_assert!(copy.to_vec().iter().all(|&v| v == 0));
    }

    #[test]
    fn callback_sees_the_point_it_was_given(x in prop::collection::vec(-1e3f64..1e3, 0..4)) {
        let seen = RefCell::new(Vec::new());
        let callback = NativeCallback::new(|p: &[f64]| {
            seen.borrow_mut().push(p.to_vec());
            p.iter().sum()
        });
        let result = callback.invoke(&x);
        prop_assert_eq!(result, x.iter().sum::<f64>());
        let seen_ref = seen.borrow();
        prop_assert_eq!(seen_ref.as_slice(), &[x.clone()]);
    }

    #[test]
    fn projection_calls_closure_once_per_dof(cells in 1usize..16, slope in -10.0f64..10.0) {
        let mesh = Mesh::make_cartesian_1d(cells, 1.0).unwrap();
        let fec = H1Collection::new(1, 1, BasisType::GaussLobatto).unwrap();
        let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
        let mut gf = GridFunction::new(&fes);

        let calls = RefCell::new(0usize);
        let coeff = FunctionCoefficient::new(|x: &[f64]| {
            *calls.borrow_mut() += 1;
            slope * x[0]
        });
        gf.project_coefficient(&coeff).unwrap();
        prop_assert_eq!(*calls.borrow(), cells + 1);

        let h = 1.0 / cells as f64;
        for (i, value) in gf.to_vec().into_iter().enumerate() {
            prop_assert!((value - slope * (i as f64 * h)).abs() < 1e-9);
        }
    }
}
