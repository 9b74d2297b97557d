//! # Residual assembly
//!
//! For a trial coefficient vector the residual of dependent variable `v` at point `x` is
//! `y_v'(x) - f_v(x, y_1(x), .., y_n(x), p_1, .., p_k)`, where every `y` is the basis series built
//! from its coefficients. The full residual handed to the nonlinear solver is
//! 1) the interior residuals of every variable at its collocation nodes, in model order;
//! 2) the lower boundary conditions evaluated at `a`, then the upper ones at `b`.
//!
//! A side without conditions contributes nothing.
use crate::numerical::Collocation::BVP_model::{BoundarySide, TwoPointBVP};
use crate::numerical::Collocation::coefficients::{CoefficientMap, Degrees, to_mapping};
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::expression_compiler::{Arg, CompiledFn, ExpressionCompiler};
use crate::numerical::Collocation::polynomial_basis::{
    BasisFamily, BasisKind, PolySeries, collocation_nodes,
};
use crate::numerical::Collocation::validator::{Domain, Params};
use nalgebra::DVector;
use std::collections::HashMap;

/// Points at which each variable's interior residual is required to vanish.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CollocationNodes {
    nodes: HashMap<String, Vec<f64>>,
}

impl CollocationNodes {
    /// Roots of the degree-`d` basis polynomial of each variable.
    pub fn from_basis(kind: BasisKind, degrees: &Degrees, domain: Domain) -> Self {
        let nodes = degrees
            .iter()
            .map(|(var, degree)| (var.to_string(), collocation_nodes(kind, degree, domain)))
            .collect();
        CollocationNodes { nodes }
    }

    pub fn get(&self, var: &str) -> Option<&[f64]> {
        self.nodes.get(var).map(|n| n.as_slice())
    }

    pub fn total(&self) -> usize {
        self.nodes.values().map(|n| n.len()).sum()
    }
}

/// `y_v' - f_v` for one variable, for a fixed set of coefficients.
#[derive(Clone, Debug)]
pub struct ResidualFunction {
    variable: String,
    functions: Vec<PolySeries>,
    derivative: PolySeries,
    rhs: CompiledFn,
    param_values: Vec<f64>,
}

impl ResidualFunction {
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn eval_many(&self, points: &[f64]) -> Result<DVector<f64>, CollocationError> {
        let values: Vec<DVector<f64>> = self.functions.iter().map(|f| f.eval_many(points)).collect();
        let mut args = Vec::with_capacity(1 + values.len() + self.param_values.len());
        args.push(Arg::Array(points));
        args.extend(values.iter().map(|v| Arg::Array(v.as_slice())));
        args.extend(self.param_values.iter().map(|p| Arg::Scalar(*p)));
        let rhs = self.rhs.call(&args)?;
        Ok(self.derivative.eval_many(points) - rhs)
    }

    pub fn eval(&self, x: f64) -> Result<f64, CollocationError> {
        let mut args = Vec::with_capacity(1 + self.functions.len() + self.param_values.len());
        args.push(x);
        args.extend(self.functions.iter().map(|f| f.eval(x)));
        args.extend(self.param_values.iter());
        let rhs = self.rhs.call_scalar(&args)?;
        Ok(self.derivative.eval(x) - rhs)
    }
}

/// Everything needed to turn coefficients into residuals: compiled expressions, basis, domain,
/// degrees and parameter values. Built once per solve.
#[derive(Clone, Debug)]
pub struct ResidualAssembler<'a> {
    model: &'a TwoPointBVP,
    rhs: Vec<CompiledFn>,
    lower: Option<Vec<CompiledFn>>,
    upper: Option<Vec<CompiledFn>>,
    param_values: Vec<f64>,
    kind: BasisKind,
    domain: Domain,
    degrees: Degrees,
}

impl<'a> ResidualAssembler<'a> {
    pub fn new(
        compiler: &mut ExpressionCompiler,
        model: &'a TwoPointBVP,
        params: &Params,
        kind: BasisKind,
        domain: Domain,
        degrees: Degrees,
    ) -> Result<Self, CollocationError> {
        let arity = model.symbols(params).len();
        let check = |f: &CompiledFn| -> Result<(), CollocationError> {
            if f.arity() != arity {
                return Err(CollocationError::shape(
                    format!("arguments of compiled '{}'", f.source()),
                    arity,
                    f.arity(),
                ));
            }
            Ok(())
        };
        let mut rhs = Vec::with_capacity(model.dependent_vars().len());
        for var in model.dependent_vars() {
            let f = compiler.rhs_callable(model, params, var)?;
            check(&f)?;
            rhs.push(f);
        }
        let lower = compiler.boundary_callable(model, params, BoundarySide::Lower)?;
        let upper = compiler.boundary_callable(model, params, BoundarySide::Upper)?;
        for f in lower.iter().chain(upper.iter()).flatten() {
            check(f)?;
        }
        Ok(ResidualAssembler {
            model,
            rhs,
            lower,
            upper,
            param_values: params.values().copied().collect(),
            kind,
            domain,
            degrees,
        })
    }

    pub fn kind(&self) -> BasisKind {
        self.kind
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn degrees(&self) -> &Degrees {
        &self.degrees
    }

    /// Number of boundary residuals: one per condition of each constrained side.
    pub fn boundary_count(&self) -> usize {
        [&self.lower, &self.upper]
            .into_iter()
            .flatten()
            .map(|conditions| conditions.len())
            .sum()
    }

    fn series(&self, coefs: &CoefficientMap) -> Result<Vec<PolySeries>, CollocationError> {
        self.model
            .dependent_vars()
            .iter()
            .map(|var| {
                coefs
                    .get(var)
                    .map(|c| PolySeries::new(c.clone(), self.domain, self.kind))
                    .ok_or_else(|| {
                        CollocationError::shape(
                            format!("coefficients of '{}'", var),
                            self.degrees.degree_of(var).map_or(0, |d| d + 1),
                            0,
                        )
                    })
            })
            .collect()
    }

    pub fn basis_functions(
        &self,
        coefs: &CoefficientMap,
    ) -> Result<HashMap<String, PolySeries>, CollocationError> {
        let series = self.series(coefs)?;
        Ok(self
            .model
            .dependent_vars()
            .iter()
            .cloned()
            .zip(series)
            .collect())
    }

    pub fn basis_derivatives(
        &self,
        coefs: &CoefficientMap,
    ) -> Result<HashMap<String, PolySeries>, CollocationError> {
        let family = self.kind.family();
        let series = self.series(coefs)?;
        Ok(self
            .model
            .dependent_vars()
            .iter()
            .cloned()
            .zip(series.iter().map(|s| family.differentiate(&s.coefficients, self.domain)))
            .collect())
    }

    /// Residual functions in model order.
    pub fn residual_function_list(
        &self,
        coefs: &CoefficientMap,
    ) -> Result<Vec<ResidualFunction>, CollocationError> {
        let series = self.series(coefs)?;
        Ok(self
            .model
            .dependent_vars()
            .iter()
            .zip(self.rhs.iter())
            .zip(series.iter())
            .map(|((var, rhs), own)| ResidualFunction {
                variable: var.clone(),
                functions: series.clone(),
                derivative: own.derivative(),
                rhs: rhs.clone(),
                param_values: self.param_values.clone(),
            })
            .collect())
    }

    pub fn residual_functions(
        &self,
        coefs: &CoefficientMap,
    ) -> Result<HashMap<String, ResidualFunction>, CollocationError> {
        Ok(self
            .residual_function_list(coefs)?
            .into_iter()
            .map(|r| (r.variable.clone(), r))
            .collect())
    }

    /// Lower side first, then upper; each side in the order its conditions were given.
    pub fn boundary_residuals(&self, coefs: &CoefficientMap) -> Result<Vec<f64>, CollocationError> {
        let series = self.series(coefs)?;
        let mut out = Vec::with_capacity(self.boundary_count());
        for (conditions, point) in [(&self.lower, self.domain.0), (&self.upper, self.domain.1)] {
            let Some(conditions) = conditions else {
                continue;
            };
            let mut args = Vec::with_capacity(1 + series.len() + self.param_values.len());
            args.push(point);
            args.extend(series.iter().map(|s| s.eval(point)));
            args.extend(self.param_values.iter());
            for condition in conditions {
                out.push(condition.call_scalar(&args)?);
            }
        }
        Ok(out)
    }

    /// Full residual vector for a flat coefficient vector.
    pub fn assemble(
        &self,
        flat: &DVector<f64>,
        nodes: &CollocationNodes,
    ) -> Result<DVector<f64>, CollocationError> {
        let coefs = to_mapping(flat, &self.degrees)?;
        let mut out = Vec::with_capacity(nodes.total() + self.boundary_count());
        for residual in self.residual_function_list(&coefs)? {
            let points = nodes.get(residual.variable()).ok_or_else(|| {
                CollocationError::configuration(format!(
                    "no collocation nodes given for '{}'",
                    residual.variable()
                ))
            })?;
            out.extend(residual.eval_many(points)?.iter());
        }
        out.extend(self.boundary_residuals(&coefs)?);
        Ok(DVector::from_vec(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Collocation::validator::canonicalize_params;
    use approx::assert_relative_eq;

    fn model(lower: Option<Vec<&str>>, upper: Option<Vec<&str>>) -> TwoPointBVP {
        TwoPointBVP::from_strings(
            "x",
            &["y", "z"],
            &[("y", "z"), ("z", "-k*y")],
            lower,
            upper,
        )
        .unwrap()
    }

    fn params() -> Params {
        canonicalize_params(HashMap::from([("k".to_string(), 1.0)]))
    }

    // y = sin(x), z = cos(x) solves the system exactly when k = 1
    fn sine_cosine_coefs(assembler: &ResidualAssembler) -> DVector<f64> {
        let family = assembler.kind().family();
        let domain = assembler.domain();
        let x: Vec<f64> = (0..200).map(|i| i as f64 * 3.0 / 199.0).collect();
        let sin: Vec<f64> = x.iter().map(|x| x.sin()).collect();
        let cos: Vec<f64> = x.iter().map(|x| x.cos()).collect();
        let ys = family.fit(&x, &sin, 14, domain).unwrap();
        let zs = family.fit(&x, &cos, 14, domain).unwrap();
        DVector::from_iterator(30, ys.coefficients.iter().chain(zs.coefficients.iter()).copied())
    }

    #[test]
    fn test_boundary_counts() {
        let degrees = Degrees::uniform(&["y", "z"], 14);
        let p = params();
        let cases = [
            (model(None, None), 0),
            (model(Some(vec!["y"]), None), 1),
            (model(None, Some(vec!["z + 0.99"])), 1),
            (model(Some(vec!["y"]), Some(vec!["z + 0.99"])), 2),
            (model(Some(vec!["y", "z - 1"]), Some(vec!["z + 0.99"])), 3),
        ];
        for (m, expected) in cases {
            let mut compiler = ExpressionCompiler::new();
            let assembler = ResidualAssembler::new(
                &mut compiler,
                &m,
                &p,
                BasisKind::Chebyshev,
                (0.0, 3.0),
                degrees.clone(),
            )
            .unwrap();
            assert_eq!(assembler.boundary_count(), expected);
            let flat = sine_cosine_coefs(&assembler);
            let coefs = to_mapping(&flat, &degrees).unwrap();
            assert_eq!(assembler.boundary_residuals(&coefs).unwrap().len(), expected);
            let nodes = CollocationNodes::from_basis(BasisKind::Chebyshev, &degrees, (0.0, 3.0));
            let full = assembler.assemble(&flat, &nodes).unwrap();
            assert_eq!(full.len(), 28 + expected);
        }
    }

    #[test]
    fn test_exact_solution_has_small_residual() {
        let m = model(Some(vec!["y"]), Some(vec!["z - cos(3)"]));
        let degrees = Degrees::uniform(&["y", "z"], 14);
        let mut compiler = ExpressionCompiler::new();
        let assembler = ResidualAssembler::new(
            &mut compiler,
            &m,
            &params(),
            BasisKind::Legendre,
            (0.0, 3.0),
            degrees.clone(),
        )
        .unwrap();
        let flat = sine_cosine_coefs(&assembler);
        let nodes = CollocationNodes::from_basis(BasisKind::Legendre, &degrees, (0.0, 3.0));
        let full = assembler.assemble(&flat, &nodes).unwrap();
        assert!(full.amax() < 1e-8, "max residual {}", full.amax());

        let coefs = to_mapping(&flat, &degrees).unwrap();
        let residuals = assembler.residual_functions(&coefs).unwrap();
        assert!(residuals["z"].eval(1.234).unwrap().abs() < 1e-8);
        let derivatives = assembler.basis_derivatives(&coefs).unwrap();
        assert_relative_eq!(derivatives["y"].eval(1.0), 1.0f64.cos(), epsilon = 1e-8);
    }

    #[test]
    fn test_boundary_order_lower_then_upper() {
        let m = model(Some(vec!["y - 1", "z - 2"]), Some(vec!["y + z"]));
        let degrees = Degrees::uniform(&["y", "z"], 2);
        let mut compiler = ExpressionCompiler::new();
        let assembler = ResidualAssembler::new(
            &mut compiler,
            &m,
            &params(),
            BasisKind::Polynomial,
            (0.0, 1.0),
            degrees.clone(),
        )
        .unwrap();
        // y = 3 and z = 5 everywhere
        let flat = DVector::from_vec(vec![3.0, 0.0, 0.0, 5.0, 0.0, 0.0]);
        let coefs = to_mapping(&flat, &degrees).unwrap();
        assert_eq!(assembler.boundary_residuals(&coefs).unwrap(), vec![2.0, 3.0, 8.0]);
    }

    #[test]
    fn test_residual_eval_reports_bad_arity() {
        let y = PolySeries::new(DVector::from_vec(vec![1.0, 2.0]), (0.0, 1.0), BasisKind::Polynomial);
        let residual = ResidualFunction {
            variable: "y".to_string(),
            functions: vec![y.clone()],
            derivative: y.derivative(),
            // x, y and one parameter are passed, two arguments are expected
            rhs: CompiledFn::new(|args: &[f64]| args[1], 2, "y"),
            param_values: vec![1.0],
        };
        assert!(matches!(
            residual.eval(0.5),
            Err(CollocationError::ShapeMismatch { expected: 2, found: 3, .. })
        ));
        assert!(residual.eval_many(&[0.5]).is_err());
    }

    #[test]
    fn test_assemble_rejects_wrong_length() {
        let m = model(None, None);
        let degrees = Degrees::uniform(&["y", "z"], 3);
        let mut compiler = ExpressionCompiler::new();
        let assembler = ResidualAssembler::new(
            &mut compiler,
            &m,
            &params(),
            BasisKind::Chebyshev,
            (0.0, 1.0),
            degrees.clone(),
        )
        .unwrap();
        let nodes = CollocationNodes::from_basis(BasisKind::Chebyshev, &degrees, (0.0, 1.0));
        let err = assembler.assemble(&DVector::zeros(7), &nodes).unwrap_err();
        assert!(matches!(err, CollocationError::ShapeMismatch { expected: 8, found: 7, .. }));
    }
}
