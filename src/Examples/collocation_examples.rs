use crate::numerical::Collocation::BVP_model::TwoPointBVP;
use crate::numerical::Collocation::coefficients::Degrees;
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::collocation_solver::{
    CollocationSolver, fit_initial_coefficients,
};
use crate::numerical::Collocation::expression_compiler::{ExpressionCompiler, RhsCache};
use crate::numerical::Collocation::polynomial_basis::BasisKind;
use crate::numerical::Collocation::residuals::CollocationNodes;
use crate::numerical::Collocation::task_parser_collocation::{CollocationTask, TEMPLATE};
use crate::numerical::Collocation::validator::Domain;
use crate::numerical::Nonlinear_systems::levenberg_marquardt::LevenbergMarquardt;
use std::collections::HashMap;
use strum::IntoEnumIterator;

fn linspace(domain: Domain, n: usize) -> Vec<f64> {
    let h = (domain.1 - domain.0) / (n - 1) as f64;
    (0..n).map(|i| domain.0 + i as f64 * h).collect()
}

/// counter-current heat exchanger, A is the exchange area
pub fn heat_exchanger() -> Result<(TwoPointBVP, HashMap<String, f64>), CollocationError> {
    let model = TwoPointBVP::from_strings(
        "A",
        &["T1", "T2"],
        &[("T1", "-(T1 - T2)*U"), ("T2", "-0.5*(T1 - T2)*U")],
        Some(vec!["T1 - T10"]),
        Some(vec!["T2 - T2Ahx"]),
    )?;
    let params = HashMap::from([
        ("T10".to_string(), 130.0),
        ("T2Ahx".to_string(), 70.0),
        ("U".to_string(), 1.0),
    ]);
    Ok((model, params))
}

pub fn collocation_examples(example: usize) -> Result<(), CollocationError> {
    match example {
        0 => {
            // heat exchanger in every basis
            let (model, params) = heat_exchanger()?;
            let domain = (0.0, 5.0);
            let degrees = Degrees::uniform(&["T1", "T2"], 15);
            let mesh = linspace(domain, 1000);
            let guess: HashMap<String, Vec<f64>> = degrees
                .variables()
                .map(|v| (v.to_string(), vec![100.0; mesh.len()]))
                .collect();
            for kind in BasisKind::iter() {
                let mut solver = CollocationSolver::new(&model, params.clone())?;
                solver.loglevel = Some("info".to_string());
                let x0 = fit_initial_coefficients(kind, &degrees, domain, &mesh, &guess)?;
                let nodes = CollocationNodes::from_basis(kind, &degrees, domain);
                let result = solver.solve(&x0, &nodes, kind, domain, &degrees)?;
                println!("{}: success = {}", kind, result.success);
                let end = solver.evaluate_solution(&[5.0])?;
                println!("T1(5) = {}, T2(5) = {}", end["T1"][0], end["T2"][0]);
                println!(
                    "mean absolute residual = {:e}",
                    solver.mean_absolute_residual(&mesh)?
                );
            }
        }
        1 => {
            // the same problem from the task template
            let mut task: CollocationTask = TEMPLATE.parse()?;
            task.evaluation_points = 11;
            let report = task.run()?;
            for (i, a) in report.points.iter().enumerate() {
                println!(
                    "A = {:.1}: T1 = {:.6}, T2 = {:.6}",
                    a, report.solution["T1"][i], report.solution["T2"][i]
                );
            }
        }
        2 => {
            // Bratu problem y'' = -lambda exp(y), y(0) = y(1) = 0, lower branch
            let model = TwoPointBVP::from_strings(
                "x",
                &["y", "z"],
                &[("y", "z"), ("z", "-lambda*exp(y)")],
                Some(vec!["y"]),
                Some(vec!["y"]),
            )?;
            let params = HashMap::from([("lambda".to_string(), 1.0)]);
            let domain = (0.0, 1.0);
            let degrees = Degrees::new(vec![("y".to_string(), 12), ("z".to_string(), 11)]);
            let kind = BasisKind::Legendre;
            let lm = LevenbergMarquardt {
                max_iterations: 200,
                ..LevenbergMarquardt::default()
            };
            let mut solver =
                CollocationSolver::new(&model, params)?.with_nonlinear_solver(Box::new(lm));
            let mesh = linspace(domain, 200);
            let guess = HashMap::from([
                ("y".to_string(), vec![0.1; mesh.len()]),
                ("z".to_string(), vec![0.0; mesh.len()]),
            ]);
            let x0 = fit_initial_coefficients(kind, &degrees, domain, &mesh, &guess)?;
            let nodes = CollocationNodes::from_basis(kind, &degrees, domain);
            let result = solver.solve(&x0, &nodes, kind, domain, &degrees)?;
            println!("success = {}, {}", result.success, result.diagnostics.message);
            let middle = solver.evaluate_solution(&[0.5])?;
            println!("y(0.5) = {}", middle["y"][0]);
            println!(
                "integrated residual norm = {:e}",
                solver.integrated_residual_norm(30)?
            );
        }
        3 => {
            // two sessions sharing compiled right-hand sides
            let (model, params) = heat_exchanger()?;
            let domain = (0.0, 5.0);
            let kind = BasisKind::Chebyshev;
            let cache = RhsCache::new();
            let mesh = linspace(domain, 100);
            let guess: HashMap<String, Vec<f64>> = ["T1", "T2"]
                .iter()
                .map(|v| (v.to_string(), vec![100.0; mesh.len()]))
                .collect();
            for degree in [5, 10, 15] {
                let degrees = Degrees::uniform(&["T1", "T2"], degree);
                let mut solver = CollocationSolver::new(&model, params.clone())?
                    .with_compiler(ExpressionCompiler::with_cache(cache.clone()));
                solver.loglevel = Some("warn".to_string());
                let x0 = fit_initial_coefficients(kind, &degrees, domain, &mesh, &guess)?;
                let nodes = CollocationNodes::from_basis(kind, &degrees, domain);
                solver.solve(&x0, &nodes, kind, domain, &degrees)?;
                println!(
                    "degree {}: {} compilations, mean absolute residual {:e}",
                    degree,
                    solver.compiler().compilations(),
                    solver.mean_absolute_residual(&mesh)?
                );
            }
        }
        _ => {
            println!("example not found");
        }
    }
    Ok(())
}
