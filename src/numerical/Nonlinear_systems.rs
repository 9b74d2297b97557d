//! # Nonlinear least-squares solvers
//!
//! The collocation solver only needs one capability: given a residual function `F: R^n -> R^m`
//! and a starting point, find `x` with `F(x) ~ 0`. That capability is the `NonlinearSolver`
//! trait; `levenberg_marquardt::LevenbergMarquardt` is the backend used by default.
//!
//! A solver that fails to converge still returns `Ok`: the outcome carries `success == false`
//! and the reason in its diagnostics. `Err` is reserved for residual functions that fail.
//!
//! ```
//! use RustedCollocation::numerical::Nonlinear_systems::NonlinearSolver;
//! use RustedCollocation::numerical::Nonlinear_systems::levenberg_marquardt::LevenbergMarquardt;
//! use RustedCollocation::numerical::Collocation::collocation_errors::CollocationError;
//! use nalgebra::DVector;
//! // x^2 + y^2 = 10, x - y = 4
//! let mut residual = |x: &DVector<f64>| -> Result<DVector<f64>, CollocationError> {
//!     Ok(DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 10.0, x[0] - x[1] - 4.0]))
//! };
//! let outcome = LevenbergMarquardt::default()
//!     .solve(&mut residual, &DVector::from_vec(vec![1.0, 1.0]))
//!     .unwrap();
//! assert!(outcome.success);
//! assert!(outcome.diagnostics.residual_norm < 1e-8);
//! assert!((outcome.x[0] - outcome.x[1] - 4.0).abs() < 1e-8);
//! ```
use crate::numerical::Collocation::collocation_errors::CollocationError;
use nalgebra::DVector;
use std::collections::HashMap;
use strum_macros::Display;

pub mod levenberg_marquardt;

/// Residual function handed to a solver.
pub type ResidualFn<'a> = dyn FnMut(&DVector<f64>) -> Result<DVector<f64>, CollocationError> + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TerminationReason {
    #[strum(to_string = "residual norm below absolute tolerance")]
    ResidualTolerance,
    #[strum(to_string = "relative reduction of the residual below ftol")]
    FunctionTolerance,
    #[strum(to_string = "relative step size below xtol")]
    StepTolerance,
    #[strum(to_string = "scaled gradient below gtol")]
    GradientTolerance,
    #[strum(to_string = "maximum number of iterations reached")]
    MaxIterations,
    #[strum(to_string = "maximum number of function evaluations reached")]
    MaxFunctionEvaluations,
    #[strum(to_string = "damping parameter overflow, no descent step found")]
    DampingOverflow,
    #[strum(to_string = "residual is not finite")]
    NonFiniteResidual,
}

impl TerminationReason {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TerminationReason::ResidualTolerance
                | TerminationReason::FunctionTolerance
                | TerminationReason::StepTolerance
                | TerminationReason::GradientTolerance
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverDiagnostics {
    pub solver: String,
    pub termination: TerminationReason,
    pub message: String,
    pub iterations: usize,
    pub function_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub residual_norm: f64,
}

impl SolverDiagnostics {
    /// Rows for the statistics table.
    pub fn as_table_rows(&self) -> HashMap<String, String> {
        HashMap::from([
            ("solver".to_string(), self.solver.clone()),
            ("termination".to_string(), self.message.clone()),
            ("number of iterations".to_string(), self.iterations.to_string()),
            (
                "function evaluations".to_string(),
                self.function_evaluations.to_string(),
            ),
            (
                "jacobian evaluations".to_string(),
                self.jacobian_evaluations.to_string(),
            ),
            (
                "final residual norm".to_string(),
                format!("{:e}", self.residual_norm),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonlinearOutcome {
    pub x: DVector<f64>,
    pub success: bool,
    pub diagnostics: SolverDiagnostics,
}

pub trait NonlinearSolver {
    fn name(&self) -> &str;

    fn solve(
        &self,
        residual: &mut ResidualFn,
        x0: &DVector<f64>,
    ) -> Result<NonlinearOutcome, CollocationError>;
}
