//! # Orthogonal collocation solver
//!
//! Binds a two-point BVP model and its parameters, and solves for the basis coefficients of every
//! dependent variable so that the ODE residual vanishes at the collocation nodes and the boundary
//! conditions hold. The nonlinear system is handed to a `NonlinearSolver` (Levenberg-Marquardt by
//! default).
//!
//! ```
//! use RustedCollocation::numerical::Collocation::BVP_model::TwoPointBVP;
//! use RustedCollocation::numerical::Collocation::coefficients::Degrees;
//! use RustedCollocation::numerical::Collocation::collocation_solver::{
//!     CollocationSolver, fit_initial_coefficients,
//! };
//! use RustedCollocation::numerical::Collocation::polynomial_basis::BasisKind;
//! use RustedCollocation::numerical::Collocation::residuals::CollocationNodes;
//! use std::collections::HashMap;
//! // y' = -y, y(0) = 1 on [0, 1]
//! let model = TwoPointBVP::from_strings("x", &["y"], &[("y", "-k*y")], Some(vec!["y - 1"]), None)
//!     .unwrap();
//! let mut solver = CollocationSolver::new(&model, HashMap::from([("k".to_string(), 1.0)]))
//!     .unwrap();
//! solver.loglevel = Some("off".to_string());
//! let degrees = Degrees::uniform(&["y"], 10);
//! let domain = (0.0, 1.0);
//! let mesh: Vec<f64> = (0..50).map(|i| i as f64 / 49.0).collect();
//! let guess = HashMap::from([("y".to_string(), vec![1.0; 50])]);
//! let x0 = fit_initial_coefficients(BasisKind::Chebyshev, &degrees, domain, &mesh, &guess).unwrap();
//! let nodes = CollocationNodes::from_basis(BasisKind::Chebyshev, &degrees, domain);
//! let result = solver.solve(&x0, &nodes, BasisKind::Chebyshev, domain, &degrees).unwrap();
//! assert!(result.success);
//! let y = solver.evaluate_solution(&[1.0]).unwrap();
//! assert!((y["y"][0] - (-1.0f64).exp()).abs() < 1e-9);
//! ```
use crate::Utils::logger::{init_logger, parse_loglevel, save_matrix_to_csv};
use crate::numerical::Collocation::BVP_model::TwoPointBVP;
use crate::numerical::Collocation::coefficients::{CoefficientMap, Degrees, to_mapping};
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::expression_compiler::ExpressionCompiler;
use crate::numerical::Collocation::polynomial_basis::{BasisFamily, BasisKind, PolySeries};
use crate::numerical::Collocation::residuals::{
    CollocationNodes, ResidualAssembler, ResidualFunction,
};
use crate::numerical::Collocation::validator::{
    Domain, Params, canonicalize_params, validate_degrees, validate_domain,
    validate_expression_symbols, validate_model, validate_params,
};
use crate::numerical::Nonlinear_systems::levenberg_marquardt::LevenbergMarquardt;
use crate::numerical::Nonlinear_systems::{NonlinearSolver, SolverDiagnostics};
use gauss_quad::GaussLegendre;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Uninitialized,
    Solved,
}

/// Outcome of the last solve: flat coefficients, convergence flag and solver diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CollocationResult {
    pub x: DVector<f64>,
    pub success: bool,
    pub diagnostics: SolverDiagnostics,
}

pub struct CollocationSolver<'a> {
    model: &'a TwoPointBVP,
    params: Params,
    compiler: ExpressionCompiler,
    nonlinear_solver: Box<dyn NonlinearSolver>,
    state: SolverState,
    result: Option<CollocationResult>,
    assembler: Option<ResidualAssembler<'a>>,
    /// "off"/"none" leaves logging alone; any other level installs a terminal logger
    pub loglevel: Option<String>,
    /// write the log into a timestamped file as well
    pub log_to_file: bool,
    calc_statistics: HashMap<String, String>,
}

impl<'a> CollocationSolver<'a> {
    /// Validates the model and the parameters; parameters are stored in canonical order.
    pub fn new<P>(model: &'a TwoPointBVP, params: P) -> Result<Self, CollocationError>
    where
        P: IntoIterator<Item = (String, f64)>,
    {
        let params = canonicalize_params(params.into_iter().collect());
        validate_model(model)?;
        validate_params(&params)?;
        validate_expression_symbols(model, &params)?;
        Ok(CollocationSolver {
            model,
            params,
            compiler: ExpressionCompiler::new(),
            nonlinear_solver: Box::new(LevenbergMarquardt::default()),
            state: SolverState::Uninitialized,
            result: None,
            assembler: None,
            loglevel: None,
            log_to_file: false,
            calc_statistics: HashMap::new(),
        })
    }

    pub fn with_nonlinear_solver(mut self, solver: Box<dyn NonlinearSolver>) -> Self {
        self.nonlinear_solver = solver;
        self
    }

    /// Replaces the compiler, e.g. with one sharing its cache with another session.
    pub fn with_compiler(mut self, compiler: ExpressionCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn model(&self) -> &TwoPointBVP {
        self.model
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn compiler(&self) -> &ExpressionCompiler {
        &self.compiler
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn result(&self) -> Option<&CollocationResult> {
        self.result.as_ref()
    }

    fn reset(&mut self) {
        self.compiler.clear();
        self.state = SolverState::Uninitialized;
        self.result = None;
        self.assembler = None;
    }

    /// Rebinds the model; compiled expressions and the previous result are dropped.
    pub fn set_model(&mut self, model: &'a TwoPointBVP) -> Result<(), CollocationError> {
        validate_model(model)?;
        validate_expression_symbols(model, &self.params)?;
        self.model = model;
        self.reset();
        Ok(())
    }

    /// Rebinds the parameters; compiled expressions and the previous result are dropped.
    pub fn set_params<P>(&mut self, params: P) -> Result<(), CollocationError>
    where
        P: IntoIterator<Item = (String, f64)>,
    {
        let params = canonicalize_params(params.into_iter().collect());
        validate_params(&params)?;
        validate_expression_symbols(self.model, &params)?;
        self.params = params;
        self.reset();
        Ok(())
    }

    fn check_inputs(
        &self,
        initial_coefficients: &DVector<f64>,
        nodes: &CollocationNodes,
        domain: Domain,
        degrees: &Degrees,
    ) -> Result<(), CollocationError> {
        validate_domain(domain)?;
        validate_degrees(self.model, degrees)?;
        let expected = degrees.total_coefficients();
        if initial_coefficients.len() != expected {
            return Err(CollocationError::shape(
                "initial coefficients",
                expected,
                initial_coefficients.len(),
            ));
        }
        for var in degrees.variables() {
            match nodes.get(var) {
                Some(points) if points.iter().all(|p| p.is_finite()) => {}
                Some(_) => {
                    return Err(CollocationError::configuration(format!(
                        "collocation nodes of '{}' must be finite",
                        var
                    )));
                }
                None => {
                    return Err(CollocationError::configuration(format!(
                        "no collocation nodes given for '{}'",
                        var
                    )));
                }
            }
        }
        if initial_coefficients.iter().any(|c| !c.is_finite()) {
            return Err(CollocationError::configuration(
                "initial coefficients must be finite",
            ));
        }
        Ok(())
    }

    /// Solves without touching the logger.
    pub fn solver(
        &mut self,
        initial_coefficients: &DVector<f64>,
        nodes: &CollocationNodes,
        kind: BasisKind,
        domain: Domain,
        degrees: &Degrees,
    ) -> Result<&CollocationResult, CollocationError> {
        self.check_inputs(initial_coefficients, nodes, domain, degrees)?;
        let begin = Instant::now();
        info!(
            "collocation solve: {} basis, domain ({}, {}), {} unknowns",
            kind,
            domain.0,
            domain.1,
            degrees.total_coefficients()
        );
        self.compiler.warm_up(self.model, &self.params)?;
        let assembler = ResidualAssembler::new(
            &mut self.compiler,
            self.model,
            &self.params,
            kind,
            domain,
            degrees.clone(),
        )?;
        let n_residuals = nodes.total() + assembler.boundary_count();
        if n_residuals < initial_coefficients.len() {
            warn!(
                "{} residuals for {} unknowns: the system is underdetermined",
                n_residuals,
                initial_coefficients.len()
            );
        }

        let mut residual = |x: &DVector<f64>| assembler.assemble(x, nodes);
        let outcome = self.nonlinear_solver.solve(&mut residual, initial_coefficients)?;
        if !outcome.success {
            warn!(
                "collocation solve did not converge: {}",
                outcome.diagnostics.message
            );
        }

        let elapsed = begin.elapsed();
        self.calc_statistics = outcome.diagnostics.as_table_rows();
        self.calc_statistics
            .insert("time elapsed, ms".to_string(), elapsed.as_millis().to_string());
        self.calc_statistics
            .insert("number of unknowns".to_string(), initial_coefficients.len().to_string());
        self.calc_statistics
            .insert("number of residuals".to_string(), n_residuals.to_string());
        self.calc_statistics.insert("basis".to_string(), kind.to_string());
        self.calc_statistics.insert(
            "compiled expressions".to_string(),
            self.compiler.compilations().to_string(),
        );
        self.calc_statistics();

        self.assembler = Some(assembler);
        self.state = SolverState::Solved;
        let result = self.result.insert(CollocationResult {
            x: outcome.x,
            success: outcome.success,
            diagnostics: outcome.diagnostics,
        });
        Ok(result)
    }

    /// Solves the collocation system starting from `initial_coefficients`. Non-convergence is
    /// reported through `CollocationResult::success`, never as an error.
    pub fn solve(
        &mut self,
        initial_coefficients: &DVector<f64>,
        nodes: &CollocationNodes,
        kind: BasisKind,
        domain: Domain,
        degrees: &Degrees,
    ) -> Result<&CollocationResult, CollocationError> {
        if let Some(level) = parse_loglevel(self.loglevel.as_deref())? {
            let file = if self.log_to_file {
                Some(crate::Utils::logger::log_file_name())
            } else {
                None
            };
            init_logger(level, file.as_deref().map(Path::new))?;
        }
        self.solver(initial_coefficients, nodes, kind, domain, degrees)
    }

    fn calc_statistics(&self) {
        let mut table = Builder::from(self.calc_statistics.clone()).build();
        table.with(Style::modern_rounded());
        info!("\n \n CALC STATISTICS \n \n {}", table.to_string());
    }

    pub fn statistics(&self) -> &HashMap<String, String> {
        &self.calc_statistics
    }

    fn solved(&self) -> Result<(&ResidualAssembler<'a>, &CollocationResult), CollocationError> {
        match (&self.assembler, &self.result) {
            (Some(assembler), Some(result)) => Ok((assembler, result)),
            _ => Err(CollocationError::configuration(
                "the solver has not been run yet",
            )),
        }
    }

    /// Solved coefficients keyed by variable.
    pub fn coefficients(&self) -> Result<CoefficientMap, CollocationError> {
        let (assembler, result) = self.solved()?;
        to_mapping(&result.x, assembler.degrees())
    }

    pub fn functions(&self) -> Result<HashMap<String, PolySeries>, CollocationError> {
        let (assembler, _) = self.solved()?;
        assembler.basis_functions(&self.coefficients()?)
    }

    pub fn derivatives(&self) -> Result<HashMap<String, PolySeries>, CollocationError> {
        let (assembler, _) = self.solved()?;
        assembler.basis_derivatives(&self.coefficients()?)
    }

    pub fn residual_functions(&self) -> Result<HashMap<String, ResidualFunction>, CollocationError> {
        let (assembler, _) = self.solved()?;
        assembler.residual_functions(&self.coefficients()?)
    }

    pub fn evaluate_solution(
        &self,
        points: &[f64],
    ) -> Result<HashMap<String, DVector<f64>>, CollocationError> {
        Ok(self
            .functions()?
            .into_iter()
            .map(|(var, f)| (var, f.eval_many(points)))
            .collect())
    }

    pub fn residuals_at(
        &self,
        points: &[f64],
    ) -> Result<HashMap<String, DVector<f64>>, CollocationError> {
        self.residual_functions()?
            .into_iter()
            .map(|(var, r)| Ok((var, r.eval_many(points)?)))
            .collect()
    }

    /// `|residual| / |solution|` pointwise.
    pub fn normalize_residuals(
        &self,
        points: &[f64],
    ) -> Result<HashMap<String, DVector<f64>>, CollocationError> {
        let solution = self.evaluate_solution(points)?;
        let residuals = self.residuals_at(points)?;
        residuals
            .into_iter()
            .map(|(var, res)| {
                let soln = solution.get(&var).ok_or_else(|| {
                    CollocationError::configuration(format!("no solution for '{}'", var))
                })?;
                let normalized = res.zip_map(soln, |r, s| r.abs() / s.abs());
                Ok((var, normalized))
            })
            .collect()
    }

    /// Mean of `|residual|` over all variables and points.
    pub fn mean_absolute_residual(&self, points: &[f64]) -> Result<f64, CollocationError> {
        if points.is_empty() {
            return Err(CollocationError::configuration(
                "mean residual needs at least one point",
            ));
        }
        let residuals = self.residuals_at(points)?;
        let count = residuals.values().map(|r| r.len()).sum::<usize>();
        let total: f64 = residuals.values().flat_map(|r| r.iter()).map(|r| r.abs()).sum();
        Ok(total / count as f64)
    }

    /// `sqrt(sum_v integral_a^b r_v(x)^2 dx)` by Gauss-Legendre quadrature.
    pub fn integrated_residual_norm(&self, quad_degree: usize) -> Result<f64, CollocationError> {
        let (assembler, _) = self.solved()?;
        let (a, b) = assembler.domain();
        let quad = GaussLegendre::new(quad_degree).map_err(|e| {
            CollocationError::configuration(format!(
                "cannot build Gauss-Legendre rule of degree {}: {:?}",
                quad_degree, e
            ))
        })?;
        let failure = Cell::new(None);
        let mut total = 0.0;
        for residual in self.residual_functions()?.values() {
            total += quad.integrate(a, b, |x| match residual.eval(x) {
                Ok(r) => r * r,
                Err(e) => {
                    failure.set(Some(e));
                    f64::NAN
                }
            });
        }
        if let Some(e) = failure.take() {
            return Err(e);
        }
        if !total.is_finite() {
            return Err(CollocationError::Numerical(
                "residual integral is not finite".to_string(),
            ));
        }
        Ok(total.sqrt())
    }

    /// Solution at `points`, one column per dependent variable in model order.
    pub fn save_to_csv(&self, points: &[f64], path: &Path) -> Result<(), CollocationError> {
        let solution = self.evaluate_solution(points)?;
        let vars = self.model.dependent_vars();
        let mut matrix = DMatrix::zeros(points.len(), vars.len());
        for (j, var) in vars.iter().enumerate() {
            if let Some(values) = solution.get(var) {
                matrix.set_column(j, values);
            }
        }
        save_matrix_to_csv(&matrix, vars, path, points, self.model.independent_var())?;
        info!("solution saved to {}", path.display());
        Ok(())
    }
}

/// Initial coefficients from sampled guesses: each variable's samples on `mesh` are fitted with
/// its degree, and the fits are concatenated in degree order.
pub fn fit_initial_coefficients(
    kind: BasisKind,
    degrees: &Degrees,
    domain: Domain,
    mesh: &[f64],
    samples: &HashMap<String, Vec<f64>>,
) -> Result<DVector<f64>, CollocationError> {
    let family = kind.family();
    let mut flat = Vec::with_capacity(degrees.total_coefficients());
    for (var, degree) in degrees.iter() {
        let values = samples.get(var).ok_or_else(|| {
            CollocationError::configuration(format!("no initial guess samples for '{}'", var))
        })?;
        let series = family.fit(mesh, values, degree, domain)?;
        flat.extend(series.coefficients.iter());
    }
    Ok(DVector::from_vec(flat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Nonlinear_systems::{NonlinearOutcome, ResidualFn, TerminationReason};
    use approx::assert_relative_eq;

    fn decay_model() -> TwoPointBVP {
        TwoPointBVP::from_strings("x", &["y"], &[("y", "-k*y")], Some(vec!["y - 1"]), None).unwrap()
    }

    fn setup(degree: usize) -> (Degrees, Domain, DVector<f64>, CollocationNodes) {
        let degrees = Degrees::uniform(&["y"], degree);
        let domain = (0.0, 2.0);
        let mesh: Vec<f64> = (0..100).map(|i| i as f64 * 2.0 / 99.0).collect();
        let guess = HashMap::from([("y".to_string(), vec![0.5; 100])]);
        let x0 = fit_initial_coefficients(BasisKind::Legendre, &degrees, domain, &mesh, &guess)
            .unwrap();
        let nodes = CollocationNodes::from_basis(BasisKind::Legendre, &degrees, domain);
        (degrees, domain, x0, nodes)
    }

    fn quiet(solver: &mut CollocationSolver) {
        solver.loglevel = Some("off".to_string());
    }

    #[test]
    fn test_solve_decay() {
        let model = decay_model();
        let mut solver =
            CollocationSolver::new(&model, HashMap::from([("k".to_string(), 0.5)])).unwrap();
        quiet(&mut solver);
        assert_eq!(solver.state(), SolverState::Uninitialized);
        assert!(solver.coefficients().is_err());

        let (degrees, domain, x0, nodes) = setup(12);
        let result = solver
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap();
        assert!(result.success, "{}", result.diagnostics.message);
        assert_eq!(solver.state(), SolverState::Solved);

        let y = solver.evaluate_solution(&[0.0, 1.0, 2.0]).unwrap();
        for (i, x) in [0.0f64, 1.0, 2.0].iter().enumerate() {
            assert_relative_eq!(y["y"][i], (-0.5 * x).exp(), epsilon = 1e-9);
        }
        let der = solver.derivatives().unwrap();
        assert_relative_eq!(der["y"].eval(1.0), -0.5 * (-0.5f64).exp(), epsilon = 1e-8);
        let points: Vec<f64> = (0..101).map(|i| i as f64 * 0.02).collect();
        assert!(solver.mean_absolute_residual(&points).unwrap() < 1e-8);
        assert!(solver.integrated_residual_norm(20).unwrap() < 1e-8);
        let normalized = solver.normalize_residuals(&points).unwrap();
        assert!(normalized["y"].amax() < 1e-7);
        assert!(solver.statistics().contains_key("number of unknowns"));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let model = decay_model();
        let params = HashMap::from([("k".to_string(), 0.5)]);
        let (degrees, domain, x0, nodes) = setup(8);
        let mut first = CollocationSolver::new(&model, params.clone()).unwrap();
        quiet(&mut first);
        let mut second = CollocationSolver::new(&model, params).unwrap();
        quiet(&mut second);
        let a = first
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap()
            .clone();
        let b = second
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap()
            .clone();
        assert_eq!(a, b);
        let again = first
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap();
        assert_eq!(&a, again);
    }

    #[test]
    fn test_shape_errors_before_solving() {
        let model = decay_model();
        let mut solver =
            CollocationSolver::new(&model, HashMap::from([("k".to_string(), 0.5)])).unwrap();
        quiet(&mut solver);
        let (degrees, domain, _, nodes) = setup(8);
        let err = solver
            .solve(&DVector::zeros(8), &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap_err();
        assert_eq!(err, CollocationError::shape("initial coefficients", 9, 8));
        let wrong_vars = Degrees::uniform(&["z"], 8);
        assert!(solver
            .solve(&DVector::zeros(9), &nodes, BasisKind::Legendre, domain, &wrong_vars)
            .is_err());
        assert!(solver
            .solve(&DVector::zeros(9), &CollocationNodes::default(), BasisKind::Legendre, domain, &degrees)
            .is_err());
        assert_eq!(solver.state(), SolverState::Uninitialized);
    }

    #[test]
    fn test_construction_validates() {
        let model = decay_model();
        // k is missing
        assert!(CollocationSolver::new(&model, HashMap::new()).is_err());
        assert!(CollocationSolver::new(&model, HashMap::from([("k".to_string(), f64::NAN)])).is_err());
        let mut solver =
            CollocationSolver::new(&model, HashMap::from([("k".to_string(), 1.0)])).unwrap();
        assert!(solver.set_params(HashMap::from([("q".to_string(), 1.0)])).is_err());
        solver.loglevel = Some("chatty".to_string());
        let (degrees, domain, x0, nodes) = setup(4);
        assert!(matches!(
            solver.solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees),
            Err(CollocationError::Configuration(_))
        ));
    }

    #[test]
    fn test_rebinding_clears_compiled_expressions() {
        let model = decay_model();
        let other = TwoPointBVP::from_strings("x", &["y"], &[("y", "k*y")], Some(vec!["y - 1"]), None)
            .unwrap();
        let mut solver =
            CollocationSolver::new(&model, HashMap::from([("k".to_string(), 0.5)])).unwrap();
        quiet(&mut solver);
        let (degrees, domain, x0, nodes) = setup(10);
        solver
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap();
        assert!(!solver.compiler().cache().is_empty());

        solver.set_model(&other).unwrap();
        assert!(solver.compiler().cache().is_empty());
        assert_eq!(solver.state(), SolverState::Uninitialized);
        solver
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap();
        let y = solver.evaluate_solution(&[2.0]).unwrap();
        assert_relative_eq!(y["y"][0], 1.0f64.exp(), epsilon = 1e-8);

        solver.set_params(HashMap::from([("k".to_string(), -0.5)])).unwrap();
        assert!(solver.compiler().cache().is_empty());
        assert!(solver.result().is_none());
    }

    struct GiveUp;

    impl NonlinearSolver for GiveUp {
        fn name(&self) -> &str {
            "give up"
        }

        fn solve(
            &self,
            residual: &mut ResidualFn,
            x0: &DVector<f64>,
        ) -> Result<NonlinearOutcome, CollocationError> {
            let f = residual(x0)?;
            Ok(NonlinearOutcome {
                x: x0.clone(),
                success: false,
                diagnostics: SolverDiagnostics {
                    solver: self.name().to_string(),
                    termination: TerminationReason::MaxIterations,
                    message: "gave up".to_string(),
                    iterations: 0,
                    function_evaluations: 1,
                    jacobian_evaluations: 0,
                    residual_norm: f.norm(),
                },
            })
        }
    }

    #[test]
    fn test_non_convergence_is_not_an_error() {
        let model = decay_model();
        let mut solver = CollocationSolver::new(&model, HashMap::from([("k".to_string(), 0.5)]))
            .unwrap()
            .with_nonlinear_solver(Box::new(GiveUp));
        quiet(&mut solver);
        let (degrees, domain, x0, nodes) = setup(6);
        let result = solver
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.diagnostics.message, "gave up");
        assert_eq!(result.x, x0);
        // post-solve accessors work on the unconverged coefficients too
        assert!(solver.coefficients().is_ok());
    }

    #[test]
    fn test_save_to_csv() {
        let model = decay_model();
        let mut solver =
            CollocationSolver::new(&model, HashMap::from([("k".to_string(), 0.5)])).unwrap();
        quiet(&mut solver);
        let (degrees, domain, x0, nodes) = setup(10);
        solver
            .solve(&x0, &nodes, BasisKind::Legendre, domain, &degrees)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decay.csv");
        solver.save_to_csv(&[0.0, 1.0, 2.0], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "x,y");
        let first: Vec<f64> = lines[1].split(',').map(|v| v.parse().unwrap()).collect();
        assert_relative_eq!(first[1], 1.0, epsilon = 1e-9);
    }
}
