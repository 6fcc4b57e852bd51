//! End-to-end Poisson system: -Δu = 1 with u = 0 on the boundary

use femlink::{
    sys, ArrayInt, BasisType, BilinearForm, DiffusionIntegrator, DofOrdering, DomainLfIntegrator,
    ElementType, FiniteElementCollection, FiniteElementSpace, FunctionCoefficient, GridFunction,
    GridFunctionLike, GridFunctionLikeMut, H1Collection, LinearForm, Mesh, Operator, RefAlgo,
    SparseMatrixLike, TypeTag, Vector, VectorLike, VectorLikeMut,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn all_boundaries(mesh: &Mesh) -> ArrayInt {
    let mut marker = ArrayInt::with_len(mesh.bdr_attributes().len()).unwrap();
    marker.set_all(1);
    marker
}

// ============================================================================
// Full flow
// ============================================================================

#[test]
fn test_refined_square_space_follows_mesh_dimension() {
    let mut mesh = Mesh::make_cartesian_2d(1, 1, ElementType::Quadrilateral, 1.0, 1.0).unwrap();
    assert_eq!(mesh.dimension(), 2);
    assert_eq!(mesh.num_elements(), 1);

    mesh.uniform_refinement(RefAlgo::default()).unwrap();
    assert_eq!(mesh.num_elements(), 4);

    let fec = H1Collection::new(1, mesh.dimension(), BasisType::GaussLobatto).unwrap();
    let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    assert_eq!(fes.dimension(), mesh.dimension());
}

#[test]
fn test_poisson_1d_matches_exact_nodal_values() {
    let mut mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    mesh.uniform_refinement(RefAlgo::default()).unwrap();
    assert_eq!(mesh.num_elements(), 4);

    let fec = H1Collection::new(1, mesh.dimension(), BasisType::GaussLobatto).unwrap();
    let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    assert_eq!(fes.collection_name(), "H1_1D_P1");
    assert_eq!(fes.true_vsize(), 5);

    let ess_tdofs = fes.essential_true_dofs(&all_boundaries(&mesh), None).unwrap();
    assert_eq!(ess_tdofs.to_vec(), vec![0, 4]);

    let one = FunctionCoefficient::new(|_: &[f64]| 1.0);
    let mut b = LinearForm::new(&fes);
    b.add_domain_integrator(DomainLfIntegrator::new(&one)).unwrap();
    b.assemble().unwrap();

    let mut x = GridFunction::new(&fes);
    x.set_all(0.0);

    let mut a = BilinearForm::new(&fes);
    a.add_domain_integrator(DiffusionIntegrator::unit()).unwrap();
    a.assemble(true).unwrap();

    let system = a.form_linear_system(&ess_tdofs, &x, &b, false).unwrap();
    assert_eq!(system.a.type_tag(), TypeTag::SparseMatrix);
    let mat = system.a.try_as::<sys::SparseMatrix>().unwrap();
    assert_eq!(mat.elem(0, 0).unwrap(), 1.0);
    assert_eq!(mat.elem(1, 0).unwrap(), 0.0);

    // Central differences are exact for the quadratic x (1 - x) / 2.
    let expected = [0.0, 0.09375, 0.125, 0.09375, 0.0];
    let exact = Vector::from_slice(&expected).unwrap();
    let mut residual = Vector::new(5).unwrap();
    system.a.mult(&exact, &mut residual).unwrap();
    for (lhs, rhs) in residual.to_vec().iter().zip(system.b.to_vec()) {
        assert!((lhs - rhs).abs() < 1e-12, "{lhs} != {rhs}");
    }

    a.recover_fem_solution(&exact, &b, &mut x).unwrap();
    for (value, exact) in x.to_vec().iter().zip(expected) {
        assert!((value - exact).abs() < 1e-12, "{value} != {exact}");
    }
}

#[test]
fn test_poisson_2d_system_is_symmetric_with_identity_boundary_rows() {
    let mesh = Mesh::make_cartesian_2d(4, 4, ElementType::Quadrilateral, 1.0, 1.0).unwrap();
    let fec = H1Collection::new(1, 2, BasisType::GaussLobatto).unwrap();
    let mut fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    let ess_tdofs = fes.boundary_true_dofs(None).unwrap();
    assert_eq!(ess_tdofs.len(), 16);

    let one = FunctionCoefficient::new(|_: &[f64]| 1.0);
    let mut b = LinearForm::new(&fes);
    b.add_domain_integrator(DomainLfIntegrator::new(&one)).unwrap();
    b.assemble().unwrap();

    let mut a = BilinearForm::new(&fes);
    a.add_domain_integrator(DiffusionIntegrator::unit()).unwrap();
    a.assemble(true).unwrap();

    let x = GridFunction::new(&fes);
    let system = a.form_linear_system(&ess_tdofs, &x, &b, false).unwrap();
    let mat = system.a.try_as::<sys::SparseMatrix>().unwrap();
    let rhs = system.b.to_vec();
    assert_eq!(rhs.len(), 25);

    let boundary: Vec<usize> = ess_tdofs.to_vec().iter().map(|&d| d as usize).collect();
    for i in 0..25 {
        for j in 0..25 {
            let (aij, aji) = (mat.elem(i, j).unwrap(), mat.elem(j, i).unwrap());
            assert!((aij - aji).abs() < 1e-12, "A[{i}][{j}] = {aij}, A[{j}][{i}] = {aji}");
            if boundary.contains(&i) {
                assert_eq!(aij, if i == j { 1.0 } else { 0.0 });
            }
        }
        if boundary.contains(&i) {
            assert_eq!(rhs[i], 0.0);
        } else {
            assert!(rhs[i] > 0.0);
            // Uniform lattice, every interior node has the same support.
            assert!((rhs[i] - rhs[6]).abs() < 1e-12);
        }
    }
}

#[test]
fn test_essential_dofs_of_unit_square_are_boundary_nodes() {
    let mesh = Mesh::make_cartesian_2d(2, 2, ElementType::Quadrilateral, 1.0, 1.0).unwrap();
    let fec = H1Collection::new(1, 2, BasisType::GaussLobatto).unwrap();
    let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    let dofs = fes.essential_true_dofs(&all_boundaries(&mesh), None).unwrap();
    assert_eq!(dofs.to_vec(), vec![0, 1, 2, 3, 5, 6, 7, 8]);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_mesh_save_load_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("refined.mesh");

    let mut mesh = Mesh::make_cartesian_2d(3, 2, ElementType::Triangle, 3.0, 2.0).unwrap();
    mesh.uniform_refinement(RefAlgo::B).unwrap();
    mesh.save_to_file(&path, 8).unwrap();

    let loaded = Mesh::from_file(&path).unwrap();
    assert_eq!(loaded.dimension(), 2);
    assert_eq!(loaded.element_type(), ElementType::Triangle);
    assert_eq!(loaded.num_elements(), mesh.num_elements());
    assert_eq!(loaded.num_vertices(), mesh.num_vertices());
    assert_eq!(loaded.num_boundary_elements(), mesh.num_boundary_elements());
}

#[test]
fn test_curved_mesh_roundtrip_keeps_nodes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("curved.mesh");

    let mut mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    mesh.set_curvature(2).unwrap();
    mesh.save(&path).unwrap();

    let loaded = Mesh::from_file(&path).unwrap();
    let nodes = loaded.nodes().unwrap();
    assert_eq!(nodes.own_collection().unwrap().name(), "H1_1D_P2");
    assert_eq!(nodes.len(), 5);
}

#[test]
fn test_grid_function_save() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sol.gf");

    let mesh = Mesh::make_cartesian_1d(2, 1.0).unwrap();
    let fec = H1Collection::new(1, 1, BasisType::GaussLobatto).unwrap();
    let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
    let mut gf = GridFunction::new(&fes);
    gf.project_coefficient(&FunctionCoefficient::new(|x: &[f64]| 2.0 * x[0]))
        .unwrap();
    gf.save_to_file(&path, 4).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("FiniteElementSpace"));
    assert_eq!(lines.next(), Some("FiniteElementCollection: H1_1D_P1"));
    let values: Vec<&str> = text.lines().rev().take(3).collect();
    assert_eq!(values, vec!["2.0000", "1.0000", "0.0000"]);
}

#[test]
fn test_save_to_missing_directory_is_native_exception() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing").join("out.mesh");
    let mesh = Mesh::make_cartesian_1d(1, 1.0).unwrap();
    let err = mesh.save_to_file(&path, 8).unwrap_err();
    assert!(err.native_message().unwrap().starts_with("Mesh::Save: unable to write"));
}
