//! Conversion between the flat coefficient vector the nonlinear solver iterates on and the
//! per-variable coefficient vectors the basis family works with.
//!
//! The flat layout is the concatenation of every variable's `degree + 1` coefficients in the
//! order of the degree specification, which is always the model's dependent-variable order.
use crate::numerical::Collocation::collocation_errors::CollocationError;
use nalgebra::DVector;
use std::collections::HashMap;

pub type CoefficientMap = HashMap<String, DVector<f64>>;

/// Ordered `(variable, degree)` list.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Degrees(Vec<(String, usize)>);

impl Degrees {
    pub fn new(degrees: Vec<(String, usize)>) -> Self {
        Degrees(degrees)
    }

    /// Same degree for every variable.
    pub fn uniform<S: AsRef<str>>(variables: &[S], degree: usize) -> Self {
        Degrees(
            variables
                .iter()
                .map(|v| (v.as_ref().to_string(), degree))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(v, d)| (v.as_str(), *d))
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(v, _)| v.as_str())
    }

    pub fn degree_of(&self, variable: &str) -> Option<usize> {
        self.0.iter().find(|(v, _)| v == variable).map(|(_, d)| *d)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the flat coefficient vector.
    pub fn total_coefficients(&self) -> usize {
        self.0.iter().map(|(_, d)| d + 1).sum()
    }

    /// Number of interior residuals: one per collocation node, `degree` nodes per variable.
    pub fn total_nodes(&self) -> usize {
        self.0.iter().map(|(_, d)| *d).sum()
    }
}

pub fn to_mapping(flat: &DVector<f64>, degrees: &Degrees) -> Result<CoefficientMap, CollocationError> {
    let expected = degrees.total_coefficients();
    if flat.len() != expected {
        return Err(CollocationError::shape("coefficient array", expected, flat.len()));
    }
    let mut mapping = CoefficientMap::with_capacity(degrees.len());
    let mut start = 0;
    for (var, degree) in degrees.iter() {
        let n = degree + 1;
        mapping.insert(var.to_string(), flat.rows(start, n).into_owned());
        start += n;
    }
    Ok(mapping)
}

/// Inverse of `to_mapping`; every vector must have `degree + 1` entries.
pub fn to_array(mapping: &CoefficientMap, degrees: &Degrees) -> Result<DVector<f64>, CollocationError> {
    let mut flat = Vec::with_capacity(degrees.total_coefficients());
    for (var, degree) in degrees.iter() {
        let coefs = mapping.get(var).ok_or_else(|| {
            CollocationError::shape(format!("coefficients of '{}'", var), degree + 1, 0)
        })?;
        if coefs.len() != degree + 1 {
            return Err(CollocationError::shape(
                format!("coefficients of '{}'", var),
                degree + 1,
                coefs.len(),
            ));
        }
        flat.extend(coefs.iter());
    }
    Ok(DVector::from_vec(flat))
}
