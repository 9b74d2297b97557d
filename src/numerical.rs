/// orthogonal collocation solver for two-point boundary value problems
/// ```
/// use RustedCollocation::numerical::Collocation::task_parser_collocation::CollocationTask;
/// let task: CollocationTask = "
/// model
/// independent_var: x
/// dependent_vars: y
/// rhs
/// y: y
/// boundary_conditions
/// lower: none
/// upper: y - 1
/// basis
/// kind: Polynomial
/// degree: 12
/// domain: 0, 1
/// solver_settings
/// loglevel: off
/// postprocessing
/// evaluation_points: 2
/// "
/// .parse()
/// .unwrap();
/// let report = task.run().unwrap();
/// assert!((report.solution["y"][0] - (-1.0f64).exp()).abs() < 1e-8);
/// ```
pub mod Collocation;
/// nonlinear least-squares solvers: the `NonlinearSolver` trait and Levenberg-Marquardt
pub mod Nonlinear_systems;
