// ALGORITHM: Levenberg-Marquardt with forward-difference Jacobian (in the spirit of LMDIF)
/*
INPUT:
  - residual: F(x), m functions of n variables (m >= n is not required)
  - x0: initial guess
  - ftol, xtol, gtol, abs_tolerance: termination tolerances
  - max_iterations, max_function_evaluations: budget

EACH ITERATION:
  1. J = forward differences of F at x, h_j = sqrt(eps) * max(|x_j|, 1)
  2. D_j = max over iterations of ||J_j|| (Marquardt scaling, zero columns get 1)
  3. scaled gradient max_j |(J^T F)_j| / (||J_j|| ||F||) <= gtol  -> converged
  4. step p = argmin ||F + J p||^2 + lambda ||D p||^2, solved as the least-squares problem
        | J               |  p  =  | -F |
        | sqrt(lambda) D  |        |  0 |
     through SVD (no normal equations, so no squaring of the condition number)
  5. ||F(x + p)|| < ||F(x)||: accept, lambda /= decrease_factor
     otherwise: reject, lambda *= increase_factor (fails beyond max_lambda)

TERMINATION CODES (TerminationReason):
  ResidualTolerance       ||F|| <= abs_tolerance
  FunctionTolerance       actual and predicted relative reductions <= ftol
  StepTolerance           ||D p|| <= xtol (xtol + ||D x||)
  GradientTolerance       step 3
  MaxIterations, MaxFunctionEvaluations, DampingOverflow, NonFiniteResidual: failure
*/
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Nonlinear_systems::{
    NonlinearOutcome, NonlinearSolver, ResidualFn, SolverDiagnostics, TerminationReason,
};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub struct LevenbergMarquardt {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub abs_tolerance: f64,
    pub max_iterations: usize,
    /// `None` means `200 * (n + 1)`.
    pub max_function_evaluations: Option<usize>,
    pub initial_lambda: f64,
    pub decrease_factor: f64,
    pub increase_factor: f64,
    pub min_lambda: f64,
    pub max_lambda: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        LevenbergMarquardt {
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-12,
            abs_tolerance: 1e-12,
            max_iterations: 100,
            max_function_evaluations: None,
            initial_lambda: 1e-4,
            decrease_factor: 10.0,
            increase_factor: 10.0,
            min_lambda: 1e-20,
            max_lambda: 1e16,
        }
    }
}

struct Counters {
    iterations: usize,
    nfev: usize,
    njev: usize,
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the fields named in `settings`; unknown keys are rejected.
    pub fn with_settings(
        mut self,
        settings: &std::collections::HashMap<String, f64>,
    ) -> Result<Self, CollocationError> {
        for (key, value) in settings {
            let positive = |v: f64| -> Result<f64, CollocationError> {
                if v.is_finite() && v > 0.0 {
                    Ok(v)
                } else {
                    Err(CollocationError::configuration(format!(
                        "solver setting '{}' must be a positive number, got {}",
                        key, v
                    )))
                }
            };
            match key.as_str() {
                "ftol" => self.ftol = positive(*value)?,
                "xtol" => self.xtol = positive(*value)?,
                "gtol" => self.gtol = positive(*value)?,
                "abs_tolerance" => self.abs_tolerance = positive(*value)?,
                "max_iterations" => self.max_iterations = positive(*value)? as usize,
                "max_function_evaluations" => {
                    self.max_function_evaluations = Some(positive(*value)? as usize)
                }
                "initial_lambda" => self.initial_lambda = positive(*value)?,
                "decrease_factor" => self.decrease_factor = positive(*value)?,
                "increase_factor" => self.increase_factor = positive(*value)?,
                "min_lambda" => self.min_lambda = positive(*value)?,
                "max_lambda" => self.max_lambda = positive(*value)?,
                _ => {
                    return Err(CollocationError::configuration(format!(
                        "unknown solver setting '{}'",
                        key
                    )));
                }
            }
        }
        Ok(self)
    }

    fn jacobian(
        &self,
        residual: &mut ResidualFn,
        x: &DVector<f64>,
        f: &DVector<f64>,
        counters: &mut Counters,
    ) -> Result<DMatrix<f64>, CollocationError> {
        let sqrt_eps = f64::EPSILON.sqrt();
        let mut jac = DMatrix::zeros(f.len(), x.len());
        let mut x_h = x.clone();
        for j in 0..x.len() {
            let xj = x[j];
            x_h[j] = xj + sqrt_eps * xj.abs().max(1.0);
            let h = x_h[j] - xj;
            let f_h = residual(&x_h)?;
            counters.nfev += 1;
            if f_h.len() != f.len() {
                return Err(CollocationError::shape("residual vector", f.len(), f_h.len()));
            }
            jac.set_column(j, &((f_h - f) / h));
            x_h[j] = xj;
        }
        counters.njev += 1;
        Ok(jac)
    }

    // minimizer of ||f + J p||^2 + lambda ||D p||^2
    fn damped_step(
        jac: &DMatrix<f64>,
        f: &DVector<f64>,
        diag: &DVector<f64>,
        lambda: f64,
    ) -> Result<DVector<f64>, CollocationError> {
        let (m, n) = jac.shape();
        let mut augmented = DMatrix::zeros(m + n, n);
        augmented.view_mut((0, 0), (m, n)).copy_from(jac);
        let sqrt_lambda = lambda.sqrt();
        for j in 0..n {
            augmented[(m + j, j)] = sqrt_lambda * diag[j];
        }
        let mut rhs = DVector::zeros(m + n);
        rhs.rows_mut(0, m).copy_from(&(-f));
        let svd = augmented.svd(true, true);
        let tol = svd.singular_values.max() * f64::EPSILON * (m + n) as f64;
        svd.solve(&rhs, tol)
            .map_err(|e| CollocationError::Numerical(format!("damped step failed: {}", e)))
    }

    fn finish(
        &self,
        x: DVector<f64>,
        fnorm: f64,
        termination: TerminationReason,
        counters: &Counters,
    ) -> NonlinearOutcome {
        let success = termination.is_success();
        let message = termination.to_string();
        if success {
            info!(
                "Levenberg-Marquardt converged after {} iterations: {}, residual norm {:e}",
                counters.iterations, message, fnorm
            );
        } else {
            warn!(
                "Levenberg-Marquardt stopped after {} iterations: {}, residual norm {:e}",
                counters.iterations, message, fnorm
            );
        }
        NonlinearOutcome {
            x,
            success,
            diagnostics: SolverDiagnostics {
                solver: self.name().to_string(),
                termination,
                message,
                iterations: counters.iterations,
                function_evaluations: counters.nfev,
                jacobian_evaluations: counters.njev,
                residual_norm: fnorm,
            },
        }
    }
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

impl NonlinearSolver for LevenbergMarquardt {
    fn name(&self) -> &str {
        "Levenberg-Marquardt"
    }

    fn solve(
        &self,
        residual: &mut ResidualFn,
        x0: &DVector<f64>,
    ) -> Result<NonlinearOutcome, CollocationError> {
        let n = x0.len();
        let max_fev = self.max_function_evaluations.unwrap_or(200 * (n + 1));
        let mut counters = Counters {
            iterations: 0,
            nfev: 0,
            njev: 0,
        };
        let mut x = x0.clone();
        let mut f = residual(&x)?;
        counters.nfev += 1;
        let m = f.len();
        let mut fnorm = f.norm();
        if !all_finite(&f) {
            return Ok(self.finish(x, fnorm, TerminationReason::NonFiniteResidual, &counters));
        }
        info!(
            "Levenberg-Marquardt: {} unknowns, {} residuals, initial residual norm {:e}",
            n, m, fnorm
        );
        let mut diag = DVector::<f64>::zeros(n);
        let mut lambda = self.initial_lambda;

        while counters.iterations < self.max_iterations {
            if fnorm <= self.abs_tolerance {
                return Ok(self.finish(x, fnorm, TerminationReason::ResidualTolerance, &counters));
            }
            let jac = self.jacobian(residual, &x, &f, &mut counters)?;
            if jac.iter().any(|v| !v.is_finite()) {
                return Ok(self.finish(x, fnorm, TerminationReason::NonFiniteResidual, &counters));
            }
            let col_norms: Vec<f64> = jac.column_iter().map(|c| c.norm()).collect();
            for (d, norm) in diag.iter_mut().zip(col_norms.iter()) {
                *d = d.max(*norm);
            }
            let scaling = diag.map(|d| if d == 0.0 { 1.0 } else { d });

            let gradient = jac.tr_mul(&f);
            let gnorm = gradient
                .iter()
                .zip(col_norms.iter())
                .filter(|(_, norm)| **norm != 0.0)
                .map(|(g, norm)| (g / (norm * fnorm)).abs())
                .fold(0.0, f64::max);
            if gnorm <= self.gtol {
                return Ok(self.finish(x, fnorm, TerminationReason::GradientTolerance, &counters));
            }
            let xnorm = x.component_mul(&scaling).norm();

            loop {
                let step = Self::damped_step(&jac, &f, &scaling, lambda)?;
                let pnorm = step.component_mul(&scaling).norm();
                let x_new = &x + &step;
                let f_new = residual(&x_new)?;
                counters.nfev += 1;
                let fnorm_new = f_new.norm();
                let small_step = pnorm <= self.xtol * (self.xtol + xnorm);

                if all_finite(&f_new) && fnorm_new < fnorm {
                    let linear = (&f + &jac * &step).norm();
                    let actred = 1.0 - (fnorm_new / fnorm).powi(2);
                    let prered = 1.0 - (linear / fnorm).powi(2);
                    x = x_new;
                    f = f_new;
                    fnorm = fnorm_new;
                    lambda = (lambda / self.decrease_factor).max(self.min_lambda);
                    counters.iterations += 1;
                    debug!(
                        "iteration {}: residual norm {:e}, step norm {:e}, lambda {:e}",
                        counters.iterations, fnorm, pnorm, lambda
                    );
                    if fnorm <= self.abs_tolerance {
                        return Ok(self.finish(x, fnorm, TerminationReason::ResidualTolerance, &counters));
                    }
                    if actred.abs() <= self.ftol && prered <= self.ftol {
                        return Ok(self.finish(x, fnorm, TerminationReason::FunctionTolerance, &counters));
                    }
                    if small_step {
                        return Ok(self.finish(x, fnorm, TerminationReason::StepTolerance, &counters));
                    }
                    if counters.nfev >= max_fev {
                        return Ok(self.finish(
                            x,
                            fnorm,
                            TerminationReason::MaxFunctionEvaluations,
                            &counters,
                        ));
                    }
                    break;
                }

                // rejected step
                if small_step {
                    return Ok(self.finish(x, fnorm, TerminationReason::StepTolerance, &counters));
                }
                if counters.nfev >= max_fev {
                    return Ok(self.finish(
                        x,
                        fnorm,
                        TerminationReason::MaxFunctionEvaluations,
                        &counters,
                    ));
                }
                lambda *= self.increase_factor;
                debug!("step rejected, lambda increased to {:e}", lambda);
                if lambda > self.max_lambda {
                    return Ok(self.finish(x, fnorm, TerminationReason::DampingOverflow, &counters));
                }
            }
        }
        Ok(self.finish(x, fnorm, TerminationReason::MaxIterations, &counters))
    }
}
