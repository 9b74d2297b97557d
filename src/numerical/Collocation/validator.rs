//! Fail-fast checks on everything the solver is bound to: the model, the parameter set,
//! the degree specification and the domain.
//!
//! Typed inputs are checked by `validate_model`, `validate_params`, `validate_degrees` and
//! `validate_domain`. Untyped inputs coming from a task document go through
//! `validate_model_document` and `validate_params_section`, which build the typed values.
use crate::Utils::task_parser::{DocumentMap, SectionMap, Value};
use crate::numerical::Collocation::BVP_model::{BoundarySide, TwoPointBVP};
use crate::numerical::Collocation::coefficients::Degrees;
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::symbolic::symbolic_engine::Expr;
use log::info;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use strum::IntoEnumIterator;

/// Parameters in canonical (ascending key) order.
pub type Params = BTreeMap<String, f64>;

pub type Domain = (f64, f64);

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// names the expression parser reads as something other than a variable
const RESERVED: [&str; 1] = ["pi"];

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !RESERVED.contains(&name)
}

fn check_identifier(name: &str, what: &str) -> Result<(), CollocationError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(CollocationError::configuration(format!(
            "{} '{}' is not a valid identifier",
            what, name
        )))
    }
}

pub fn validate_model(model: &TwoPointBVP) -> Result<(), CollocationError> {
    let indep = model.independent_var();
    if indep.is_empty() {
        return Err(CollocationError::configuration(
            "model must define an independent variable",
        ));
    }
    check_identifier(indep, "independent variable")?;

    let dependent = model.dependent_vars();
    if dependent.is_empty() {
        return Err(CollocationError::configuration(
            "model must define at least one dependent variable",
        ));
    }
    let mut seen = HashSet::new();
    for var in dependent {
        check_identifier(var, "dependent variable")?;
        if var == indep {
            return Err(CollocationError::configuration(format!(
                "'{}' is both the independent and a dependent variable",
                var
            )));
        }
        if !seen.insert(var.as_str()) {
            return Err(CollocationError::configuration(format!(
                "dependent variable '{}' listed twice",
                var
            )));
        }
    }

    for var in dependent {
        if model.rhs_of(var).is_none() {
            return Err(CollocationError::configuration(format!(
                "no right-hand side given for '{}'",
                var
            )));
        }
    }
    if let Some(extra) = model.rhs().keys().find(|k| !seen.contains(k.as_str())) {
        return Err(CollocationError::configuration(format!(
            "right-hand side given for '{}', which is not a dependent variable",
            extra
        )));
    }

    for side in BoundarySide::iter() {
        if let Some(Some(conditions)) = model.boundary_conditions().get(&side) {
            if conditions.is_empty() {
                return Err(CollocationError::configuration(format!(
                    "{} boundary condition list is empty; omit the side instead",
                    side
                )));
            }
        }
    }
    Ok(())
}

/// Parameter values must be finite and keyed by identifiers.
pub fn validate_params<'a, I>(params: I) -> Result<(), CollocationError>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    for (name, value) in params {
        check_identifier(name, "parameter")?;
        if !value.is_finite() {
            return Err(CollocationError::configuration(format!(
                "parameter '{}' has non-finite value {}",
                name, value
            )));
        }
    }
    Ok(())
}

pub fn canonicalize_params(params: HashMap<String, f64>) -> Params {
    params.into_iter().collect()
}

fn single_number(key: &str, values: &Option<Vec<Value>>) -> Result<f64, CollocationError> {
    match values.as_deref() {
        Some([value]) => value.as_number().ok_or_else(|| {
            CollocationError::configuration(format!(
                "parameter '{}' must be numeric, found '{}'",
                key, value
            ))
        }),
        Some(list) => Err(CollocationError::configuration(format!(
            "parameter '{}' must hold exactly one value, found {}",
            key,
            list.len()
        ))),
        None => Err(CollocationError::configuration(format!(
            "parameter '{}' has no value",
            key
        ))),
    }
}

/// Builds canonical parameters from an untyped task section.
pub fn validate_params_section(section: Option<&SectionMap>) -> Result<Params, CollocationError> {
    let section = section.ok_or_else(|| {
        CollocationError::configuration("parameters must be given as a mapping of name: value")
    })?;
    let mut params = Params::new();
    for (key, values) in section {
        params.insert(key.clone(), single_number(key, values)?);
    }
    validate_params(&params)?;
    Ok(params)
}

fn section<'d>(doc: &'d DocumentMap, name: &str) -> Result<&'d SectionMap, CollocationError> {
    doc.get(name).ok_or_else(|| {
        CollocationError::configuration(format!("model document has no '{}' section", name))
    })
}

fn required<'s>(section: &'s SectionMap, key: &str) -> Result<&'s [Value], CollocationError> {
    match section.get(key) {
        Some(Some(values)) if !values.is_empty() => Ok(values),
        _ => Err(CollocationError::configuration(format!(
            "model document is missing '{}'",
            key
        ))),
    }
}

fn parse_expr_value(value: &Value) -> Result<Expr, CollocationError> {
    let text = value.to_string_value();
    Expr::parse_expression(&text).map_err(|e| {
        CollocationError::configuration(format!("cannot parse expression '{}': {}", text, e))
    })
}

fn boundary_list(section: &SectionMap, key: &str) -> Result<Option<Vec<Expr>>, CollocationError> {
    match section.get(key) {
        None | Some(None) => Ok(None),
        Some(Some(values)) => {
            if let [Value::String(s)] = values.as_slice() {
                if s.eq_ignore_ascii_case("none") {
                    return Ok(None);
                }
            }
            values.iter().map(parse_expr_value).collect::<Result<Vec<_>, _>>().map(Some)
        }
    }
}

/// Builds a model from the `model`, `rhs` and `boundary_conditions` sections of a task document.
/// A side written as `lower: none` (or left out) carries no condition.
pub fn validate_model_document(doc: &DocumentMap) -> Result<TwoPointBVP, CollocationError> {
    let model_section = section(doc, "model")?;
    let rhs_section = section(doc, "rhs")?;
    let bc_section = section(doc, "boundary_conditions")?;

    let independent_var = match required(model_section, "independent_var")? {
        [value] => value.to_string_value(),
        list => {
            return Err(CollocationError::configuration(format!(
                "independent_var must be a single name, found {} values",
                list.len()
            )));
        }
    };
    let dependent_vars: Vec<String> = required(model_section, "dependent_vars")?
        .iter()
        .map(|v| v.to_string_value())
        .collect();

    let mut rhs = HashMap::new();
    for (var, values) in rhs_section {
        let expr = match values.as_deref() {
            Some([value]) => parse_expr_value(value)?,
            _ => {
                return Err(CollocationError::configuration(format!(
                    "right-hand side of '{}' must be a single expression",
                    var
                )));
            }
        };
        rhs.insert(var.clone(), expr);
    }
    if let Some(key) = bc_section
        .keys()
        .find(|k| k.as_str() != "lower" && k.as_str() != "upper")
    {
        return Err(CollocationError::configuration(format!(
            "unknown boundary side '{}', expected lower or upper",
            key
        )));
    }
    let lower = boundary_list(bc_section, "lower")?;
    let upper = boundary_list(bc_section, "upper")?;

    let model = TwoPointBVP::new(&independent_var, dependent_vars, rhs, lower, upper)?;
    info!(
        "model with {} dependent variables read from document",
        model.dependent_vars().len()
    );
    Ok(model)
}

/// Degrees must name exactly the model's dependent variables, in model order.
pub fn validate_degrees(model: &TwoPointBVP, degrees: &Degrees) -> Result<(), CollocationError> {
    let names: Vec<&str> = degrees.variables().collect();
    let expected: Vec<&str> = model.dependent_vars().iter().map(|s| s.as_str()).collect();
    if names != expected {
        return Err(CollocationError::configuration(format!(
            "degrees are given for {:?} but the model's dependent variables are {:?}",
            names, expected
        )));
    }
    if let Some((var, _)) = degrees.iter().find(|(_, d)| *d == 0) {
        return Err(CollocationError::configuration(format!(
            "degree of '{}' must be at least 1 to place collocation nodes",
            var
        )));
    }
    Ok(())
}

pub fn validate_domain(domain: Domain) -> Result<(), CollocationError> {
    let (a, b) = domain;
    if !a.is_finite() || !b.is_finite() || a >= b {
        return Err(CollocationError::configuration(format!(
            "domain ({}, {}) must be finite with lower < upper",
            a, b
        )));
    }
    Ok(())
}

/// Every symbol used by the model must be the independent variable, a dependent variable or a
/// parameter; parameters must not shadow variables.
pub fn validate_expression_symbols(
    model: &TwoPointBVP,
    params: &Params,
) -> Result<(), CollocationError> {
    let mut variables: HashSet<&str> = model.dependent_vars().iter().map(|s| s.as_str()).collect();
    variables.insert(model.independent_var());
    if let Some(clash) = params.keys().find(|p| variables.contains(p.as_str())) {
        return Err(CollocationError::configuration(format!(
            "parameter '{}' shadows a model variable",
            clash
        )));
    }

    let check = |expr: &Expr, context: &str| -> Result<(), CollocationError> {
        for symbol in expr.all_arguments_are_variables() {
            if !variables.contains(symbol.as_str()) && !params.contains_key(&symbol) {
                return Err(CollocationError::configuration(format!(
                    "unknown symbol '{}' in {}",
                    symbol, context
                )));
            }
        }
        Ok(())
    };
    for var in model.dependent_vars() {
        if let Some(expr) = model.rhs_of(var) {
            check(expr, &format!("right-hand side of '{}'", var))?;
        }
    }
    for side in BoundarySide::iter() {
        for expr in model.boundary_condition(side).unwrap_or_default() {
            check(expr, &format!("{} boundary condition", side))?;
        }
    }
    Ok(())
}
