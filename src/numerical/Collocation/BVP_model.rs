//! # Two-point BVP model descriptor
//!
//! Immutable description of a system of first-order ODEs
//! `d y_i / d x = f_i(x, y_1, .., y_n, p_1, .., p_k)` on `[a, b]` with boundary conditions given
//! as expressions that must vanish at `x = a` (lower side) and `x = b` (upper side).
//!
//! ```
//! use RustedCollocation::numerical::Collocation::BVP_model::TwoPointBVP;
//! let model = TwoPointBVP::from_strings(
//!     "A",
//!     &["T1", "T2"],
//!     &[("T1", "-(T1 - T2)*U"), ("T2", "-0.5*(T1 - T2)*U")],
//!     Some(vec!["T1 - T10"]),
//!     Some(vec!["T2 - T2Ahx"]),
//! )
//! .unwrap();
//! assert_eq!(model.dependent_vars(), &["T1".to_string(), "T2".to_string()]);
//! ```
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::validator::{Params, validate_model};
use crate::symbolic::symbolic_engine::Expr;
use std::collections::HashMap;
use strum_macros::{Display, EnumIter, EnumString};

/// End of the domain a boundary condition is imposed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
pub enum BoundarySide {
    #[strum(serialize = "lower")]
    Lower,
    #[strum(serialize = "upper")]
    Upper,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TwoPointBVP {
    independent_var: String,
    dependent_vars: Vec<String>,
    rhs: HashMap<String, Expr>,
    boundary_conditions: HashMap<BoundarySide, Option<Vec<Expr>>>,
}

impl TwoPointBVP {
    /// Builds and validates a model; fails with `CollocationError::Configuration`.
    pub fn new(
        independent_var: &str,
        dependent_vars: Vec<String>,
        rhs: HashMap<String, Expr>,
        lower: Option<Vec<Expr>>,
        upper: Option<Vec<Expr>>,
    ) -> Result<Self, CollocationError> {
        let model = TwoPointBVP {
            independent_var: independent_var.to_string(),
            dependent_vars,
            rhs,
            boundary_conditions: HashMap::from([
                (BoundarySide::Lower, lower),
                (BoundarySide::Upper, upper),
            ]),
        };
        validate_model(&model)?;
        Ok(model)
    }

    /// Same as `new` but every expression is given as a string.
    pub fn from_strings(
        independent_var: &str,
        dependent_vars: &[&str],
        rhs: &[(&str, &str)],
        lower: Option<Vec<&str>>,
        upper: Option<Vec<&str>>,
    ) -> Result<Self, CollocationError> {
        let parse = |s: &str| {
            Expr::parse_expression(s).map_err(|e| {
                CollocationError::configuration(format!("cannot parse expression '{}': {}", s, e))
            })
        };
        let parse_list = |list: Option<Vec<&str>>| -> Result<Option<Vec<Expr>>, CollocationError> {
            list.map(|l| l.into_iter().map(parse).collect()).transpose()
        };
        let mut rhs_map = HashMap::new();
        for (var, expr) in rhs {
            if rhs_map.insert(var.to_string(), parse(expr)?).is_some() {
                return Err(CollocationError::configuration(format!(
                    "right-hand side of '{}' given twice",
                    var
                )));
            }
        }
        TwoPointBVP::new(
            independent_var,
            dependent_vars.iter().map(|s| s.to_string()).collect(),
            rhs_map,
            parse_list(lower)?,
            parse_list(upper)?,
        )
    }

    pub fn independent_var(&self) -> &str {
        &self.independent_var
    }

    pub fn dependent_vars(&self) -> &[String] {
        &self.dependent_vars
    }

    pub fn rhs(&self) -> &HashMap<String, Expr> {
        &self.rhs
    }

    pub fn rhs_of(&self, var: &str) -> Option<&Expr> {
        self.rhs.get(var)
    }

    pub fn boundary_conditions(&self) -> &HashMap<BoundarySide, Option<Vec<Expr>>> {
        &self.boundary_conditions
    }

    /// `None` when no condition is imposed at that side.
    pub fn boundary_condition(&self, side: BoundarySide) -> Option<&[Expr]> {
        self.boundary_conditions
            .get(&side)
            .and_then(|c| c.as_deref())
    }

    /// Argument order of every compiled function: independent variable, dependent variables,
    /// then the parameters in their canonical (sorted) order.
    pub fn symbols(&self, params: &Params) -> Vec<String> {
        let mut symbols = Vec::with_capacity(1 + self.dependent_vars.len() + params.len());
        symbols.push(self.independent_var.clone());
        symbols.extend(self.dependent_vars.iter().cloned());
        symbols.extend(params.keys().cloned());
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Collocation::validator::canonicalize_params;
    use std::str::FromStr;

    fn heat_exchanger() -> TwoPointBVP {
        TwoPointBVP::from_strings(
            "A",
            &["T1", "T2"],
            &[("T1", "-(T1 - T2)*U"), ("T2", "-0.5*(T1 - T2)*U")],
            Some(vec!["T1 - T10"]),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let model = heat_exchanger();
        assert_eq!(model.independent_var(), "A");
        assert_eq!(model.rhs().len(), 2);
        assert!(model.rhs_of("T1").is_some());
        assert_eq!(model.boundary_condition(BoundarySide::Lower).map(|l| l.len()), Some(1));
        assert!(model.boundary_condition(BoundarySide::Upper).is_none());
    }

    #[test]
    fn test_symbols_follow_canonical_parameter_order() {
        let model = heat_exchanger();
        let params = canonicalize_params(HashMap::from([
            ("U".to_string(), 1.0),
            ("T10".to_string(), 130.0),
        ]));
        assert_eq!(model.symbols(&params), vec!["A", "T1", "T2", "T10", "U"]);
    }

    #[test]
    fn test_bad_expression_is_configuration_error() {
        let res = TwoPointBVP::from_strings("A", &["T1"], &[("T1", "T1 +")], None, None);
        assert!(matches!(res, Err(CollocationError::Configuration(_))));
    }

    #[test]
    fn test_boundary_side_from_str() {
        assert_eq!(BoundarySide::from_str("lower").unwrap(), BoundarySide::Lower);
        assert_eq!(BoundarySide::Upper.to_string(), "upper");
    }
}
