use RustedCollocation::Examples::collocation_examples::heat_exchanger;
use RustedCollocation::numerical::Collocation::coefficients::Degrees;
use RustedCollocation::numerical::Collocation::collocation_solver::{
    CollocationSolver, fit_initial_coefficients,
};
use RustedCollocation::numerical::Collocation::polynomial_basis::BasisKind;
use RustedCollocation::numerical::Collocation::residuals::CollocationNodes;
use criterion::{Criterion, criterion_group, criterion_main};
use std::collections::HashMap;
use std::hint::black_box;
use strum::IntoEnumIterator;

fn bench_heat_exchanger(c: &mut Criterion) {
    let (model, params) = heat_exchanger().unwrap();
    let domain = (0.0, 5.0);
    let degrees = Degrees::uniform(&["T1", "T2"], 15);
    let mesh: Vec<f64> = (0..1000).map(|i| i as f64 * 5.0 / 999.0).collect();
    let guess: HashMap<String, Vec<f64>> = degrees
        .variables()
        .map(|v| (v.to_string(), vec![100.0; mesh.len()]))
        .collect();

    let mut group = c.benchmark_group("heat exchanger");
    for kind in BasisKind::iter() {
        let x0 = fit_initial_coefficients(kind, &degrees, domain, &mesh, &guess).unwrap();
        let nodes = CollocationNodes::from_basis(kind, &degrees, domain);
        group.bench_function(kind.to_string(), |b| {
            b.iter(|| {
                let mut solver = CollocationSolver::new(&model, params.clone()).unwrap();
                solver.loglevel = Some("off".to_string());
                let result = solver
                    .solve(black_box(&x0), &nodes, kind, domain, &degrees)
                    .unwrap();
                black_box(result.success)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_heat_exchanger);
criterion_main!(benches);
