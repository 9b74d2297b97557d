//!
//! # Collocation - orthogonal collocation solver for two-point boundary value problems
//!
//! Solves first-order ODE systems `y_v' = f_v(x, y_1, .., y_n, p)` on a finite interval `[a, b]`
//! with boundary conditions at `a` and/or `b`. Every unknown function is a finite series in a
//! classical polynomial basis; the coefficients are found by a nonlinear least-squares solver so
//! that the ODE residual vanishes at the collocation nodes and the boundary conditions hold.
//!
//! ## Key Features
//! - **Symbolic input**: right-hand sides and boundary conditions are parsed from strings and
//!   compiled once per session into numeric closures
//! - **Three bases**: Chebyshev, Legendre and monomial ("Polynomial") series with analytic
//!   derivatives
//! - **Per-variable degrees**: each dependent variable may use its own degree and node set
//! - **Substitutable backends**: the nonlinear solver and the expression compiler sit behind traits
//! - **Task files**: the whole problem can be described in a plain text document
//!
//! ## Module Structure
//! - `BVP_model`: the problem descriptor
//! - `validator`: fail-fast checks, parameter canonicalization, document to model conversion
//! - `expression_compiler`: compiled right-hand sides and boundary conditions with caching
//! - `polynomial_basis`: basis families, fitting, evaluation, differentiation, nodes
//! - `coefficients`: flat vector <-> per-variable coefficient mapping
//! - `residuals`: residual functions and the full residual vector
//! - `collocation_solver`: the solve orchestrator and post-solve accessors
//! - `task_parser_collocation`: task documents
//!
//! ## Example
//! ```
//! use RustedCollocation::numerical::Collocation::BVP_model::TwoPointBVP;
//! use RustedCollocation::numerical::Collocation::coefficients::Degrees;
//! use RustedCollocation::numerical::Collocation::collocation_solver::{
//!     CollocationSolver, fit_initial_coefficients,
//! };
//! use RustedCollocation::numerical::Collocation::polynomial_basis::BasisKind;
//! use RustedCollocation::numerical::Collocation::residuals::CollocationNodes;
//! use std::collections::HashMap;
//! // heat exchanger
//! let model = TwoPointBVP::from_strings(
//!     "A",
//!     &["T1", "T2"],
//!     &[("T1", "-(T1 - T2)*U"), ("T2", "-0.5*(T1 - T2)*U")],
//!     Some(vec!["T1 - T10"]),
//!     Some(vec!["T2 - T2Ahx"]),
//! )
//! .unwrap();
//! let params = HashMap::from([
//!     ("T10".to_string(), 130.0),
//!     ("T2Ahx".to_string(), 70.0),
//!     ("U".to_string(), 1.0),
//! ]);
//! let mut solver = CollocationSolver::new(&model, params).unwrap();
//! solver.loglevel = Some("off".to_string());
//! let kind = BasisKind::Chebyshev;
//! let domain = (0.0, 5.0);
//! let degrees = Degrees::uniform(&["T1", "T2"], 15);
//! let mesh: Vec<f64> = (0..100).map(|i| i as f64 * 5.0 / 99.0).collect();
//! let guess = HashMap::from([
//!     ("T1".to_string(), vec![100.0; 100]),
//!     ("T2".to_string(), vec![100.0; 100]),
//! ]);
//! let x0 = fit_initial_coefficients(kind, &degrees, domain, &mesh, &guess).unwrap();
//! let nodes = CollocationNodes::from_basis(kind, &degrees, domain);
//! let result = solver.solve(&x0, &nodes, kind, domain, &degrees).unwrap();
//! assert!(result.success);
//! let solution = solver.evaluate_solution(&[0.0, 5.0]).unwrap();
//! assert!((solution["T1"][0] - 130.0).abs() < 1e-8);
//! assert!((solution["T2"][1] - 70.0).abs() < 1e-8);
//! ```
/// the two-point BVP descriptor: variables, right-hand sides, boundary conditions
pub mod BVP_model;
pub mod collocation_errors;
pub mod validator;
/// turns symbolic expressions into numeric closures with broadcasting; caches right-hand sides
pub mod expression_compiler;
/// Chebyshev, Legendre and monomial series on an arbitrary interval
pub mod polynomial_basis;
pub mod coefficients;
pub mod residuals;
/// orthogonal collocation solve orchestrator
pub mod collocation_solver;
/// parse a collocation task from a text document
pub mod task_parser_collocation;
