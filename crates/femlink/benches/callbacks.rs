//! Callback trampoline benchmarks
//!
//! Measures the cost of native code calling back into host closures:
//! - Direct trampoline invocation
//! - Coefficient evaluation through the guarded boundary
//! - Projection of a closure onto spaces of growing size

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use femlink::{
    BasisType, Coefficient, DofOrdering, ElementType, FiniteElementSpace, FunctionCoefficient,
    GridFunction, GridFunctionLikeMut, H1Collection, Mesh, NativeCallback,
};

// ============================================================================
// Trampoline Benchmarks
// ============================================================================

fn bench_trampoline_invoke(c: &mut Criterion) {
    let callback = NativeCallback::new(|x: &[f64]| x[0] * x[1] + x[2]);
    let point = [0.25, 0.5, 0.75];
    c.bench_function("trampoline_invoke_3d", |b| {
        b.iter(|| callback.invoke(black_box(&point)));
    });
}

fn bench_coefficient_eval(c: &mut Criterion) {
    let coeff = FunctionCoefficient::new(|x: &[f64]| (x[0] * std::f64::consts::PI).sin());
    c.bench_function("function_coefficient_eval", |b| {
        b.iter(|| coeff.eval(black_box(&[0.3, 0.7])));
    });
}

// ============================================================================
// Projection Benchmarks
// ============================================================================

fn bench_project_closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_closure");
    for n in [8usize, 32, 128] {
        let mesh = Mesh::make_cartesian_2d(n, n, ElementType::Quadrilateral, 1.0, 1.0).unwrap();
        let fec = H1Collection::new(1, 2, BasisType::GaussLobatto).unwrap();
        let fes = FiniteElementSpace::new(&mesh, &fec, 1, DofOrdering::ByNodes).unwrap();
        let coeff = FunctionCoefficient::new(|x: &[f64]| x[0] * x[1]);
        let mut gf = GridFunction::new(&fes);

        group.throughput(Throughput::Elements(fes.num_dofs() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| gf.project_coefficient(&coeff).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_trampoline_invoke,
    bench_coefficient_eval,
    bench_project_closure
);
criterion_main!(benches);
