//! # Polynomial basis families
//!
//! Each unknown function is approximated by a finite series `sum_k c_k phi_k(u)` where `u` is the
//! independent variable mapped from the problem domain `[a, b]` onto `[-1, 1]`:
//! `u = (2x - (a + b)) / (b - a)`. Supported families:
//! - Chebyshev polynomials of the first kind, evaluated by Clenshaw recurrence;
//! - Legendre polynomials, evaluated by the three-term recurrence;
//! - monomials `u^k` ("Polynomial"), evaluated by Horner scheme.
//!
//! The family is picked through the closed tag `BasisKind`; `BasisKind::family` is the only place
//! that maps a tag to its implementation.
//!
//! ```
//! use RustedCollocation::numerical::Collocation::polynomial_basis::{BasisFamily, BasisKind};
//! use std::str::FromStr;
//! let basis = BasisKind::from_str("Chebyshev").unwrap().family();
//! let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
//! let y: Vec<f64> = x.iter().map(|x| x * x).collect();
//! let series = basis.fit(&x, &y, 2, (0.0, 5.0)).unwrap();
//! assert!((series.eval(3.0) - 9.0).abs() < 1e-10);
//! assert!((series.derivative().eval(3.0) - 6.0).abs() < 1e-10);
//! ```
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::validator::{Domain, validate_domain};
use enum_dispatch::enum_dispatch;
use log::warn;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BasisKind {
    Chebyshev,
    Legendre,
    #[strum(to_string = "Polynomial", serialize = "Standard", serialize = "Monomial")]
    Polynomial,
}

impl BasisKind {
    pub fn family(&self) -> Basis {
        match self {
            BasisKind::Chebyshev => Basis::Chebyshev(ChebyshevBasis),
            BasisKind::Legendre => Basis::Legendre(LegendreBasis),
            BasisKind::Polynomial => Basis::Monomial(MonomialBasis),
        }
    }
}

#[inline]
pub fn to_unit(x: f64, domain: Domain) -> f64 {
    let (a, b) = domain;
    (2.0 * x - (a + b)) / (b - a)
}

#[inline]
pub fn from_unit(u: f64, domain: Domain) -> f64 {
    let (a, b) = domain;
    0.5 * ((b - a) * u + (a + b))
}

/// Factor `du/dx` applied to every derivative taken in the unit variable.
#[inline]
pub fn derivative_scale(domain: Domain) -> f64 {
    2.0 / (domain.1 - domain.0)
}

#[enum_dispatch]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Basis {
    Chebyshev(ChebyshevBasis),
    Legendre(LegendreBasis),
    Monomial(MonomialBasis),
}

#[enum_dispatch(Basis)]
pub trait BasisFamily {
    fn kind(&self) -> BasisKind;
    /// `phi_0(u) ..= phi_degree(u)`
    fn basis_row(&self, u: f64, degree: usize) -> Vec<f64>;
    fn evaluate_unit(&self, coefficients: &[f64], u: f64) -> f64;
    /// Coefficients of `d/du` of the series, one fewer than the input (at least one).
    fn derivative_unit(&self, coefficients: &[f64]) -> Vec<f64>;
    /// `degree` points of `[-1, 1]` in ascending order.
    fn unit_nodes(&self, degree: usize) -> Vec<f64>;

    /// Least-squares fit of `degree + 1` coefficients to `(points, values)` over `domain`.
    fn fit(
        &self,
        points: &[f64],
        values: &[f64],
        degree: usize,
        domain: Domain,
    ) -> Result<PolySeries, CollocationError> {
        validate_domain(domain)?;
        if points.len() != values.len() {
            return Err(CollocationError::shape("fit values", points.len(), values.len()));
        }
        if points.is_empty() {
            return Err(CollocationError::configuration("cannot fit a series to zero points"));
        }
        if points.len() < degree + 1 {
            warn!(
                "fitting {} coefficients to {} points, the fit is underdetermined",
                degree + 1,
                points.len()
            );
        }
        let m = points.len();
        let n = degree + 1;
        let mut vander = DMatrix::<f64>::zeros(m, n);
        for (i, x) in points.iter().enumerate() {
            let row = self.basis_row(to_unit(*x, domain), degree);
            for (j, v) in row.into_iter().enumerate() {
                vander[(i, j)] = v;
            }
        }
        // columns scaled to unit norm before the SVD
        let scale: Vec<f64> = vander
            .column_iter()
            .map(|c| {
                let norm = c.norm();
                if norm == 0.0 { 1.0 } else { norm }
            })
            .collect();
        for (j, s) in scale.iter().enumerate() {
            vander.column_mut(j).unscale_mut(*s);
        }
        let rhs = DVector::from_column_slice(values);
        let svd = vander.svd(true, true);
        let rcond = m.max(n) as f64 * f64::EPSILON * svd.singular_values.max();
        let solution = svd
            .solve(&rhs, rcond)
            .map_err(|e| CollocationError::Numerical(format!("least-squares fit failed: {}", e)))?;
        let coefficients =
            DVector::from_iterator(n, solution.iter().zip(scale.iter()).map(|(c, s)| c / s));
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(CollocationError::Numerical(
                "least-squares fit produced non-finite coefficients".to_string(),
            ));
        }
        Ok(PolySeries::new(coefficients, domain, self.kind()))
    }

    fn evaluate(&self, coefficients: &DVector<f64>, domain: Domain, points: &[f64]) -> DVector<f64> {
        let c = coefficients.as_slice();
        DVector::from_iterator(
            points.len(),
            points.iter().map(|x| self.evaluate_unit(c, to_unit(*x, domain))),
        )
    }

    /// Derivative with respect to the problem variable, in the same family and domain.
    fn differentiate(&self, coefficients: &DVector<f64>, domain: Domain) -> PolySeries {
        let scale = derivative_scale(domain);
        let der = self.derivative_unit(coefficients.as_slice());
        PolySeries::new(
            DVector::from_iterator(der.len(), der.into_iter().map(|d| d * scale)),
            domain,
            self.kind(),
        )
    }

    fn collocation_nodes(&self, degree: usize, domain: Domain) -> Vec<f64> {
        self.unit_nodes(degree)
            .into_iter()
            .map(|u| from_unit(u, domain))
            .collect()
    }
}

fn chebyshev_roots(degree: usize) -> Vec<f64> {
    let n = degree as f64;
    (0..degree)
        .rev()
        .map(|k| (PI * (2.0 * k as f64 + 1.0) / (2.0 * n)).cos())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChebyshevBasis;

impl BasisFamily for ChebyshevBasis {
    fn kind(&self) -> BasisKind {
        BasisKind::Chebyshev
    }

    fn basis_row(&self, u: f64, degree: usize) -> Vec<f64> {
        let mut row = Vec::with_capacity(degree + 1);
        row.push(1.0);
        if degree >= 1 {
            row.push(u);
        }
        for k in 2..=degree {
            row.push(2.0 * u * row[k - 1] - row[k - 2]);
        }
        row
    }

    // Clenshaw
    fn evaluate_unit(&self, coefficients: &[f64], u: f64) -> f64 {
        let Some((&c0, rest)) = coefficients.split_first() else {
            return 0.0;
        };
        let (mut b1, mut b2) = (0.0, 0.0);
        for &c in rest.iter().rev() {
            let b0 = c + 2.0 * u * b1 - b2;
            b2 = b1;
            b1 = b0;
        }
        c0 + u * b1 - b2
    }

    fn derivative_unit(&self, coefficients: &[f64]) -> Vec<f64> {
        let n = coefficients.len().saturating_sub(1);
        if n == 0 {
            return vec![0.0];
        }
        let mut c = coefficients.to_vec();
        let mut der = vec![0.0; n];
        for j in (3..=n).rev() {
            der[j - 1] = 2.0 * j as f64 * c[j];
            c[j - 2] += j as f64 * c[j] / (j as f64 - 2.0);
        }
        if n > 1 {
            der[1] = 4.0 * c[2];
        }
        der[0] = c[1];
        der
    }

    fn unit_nodes(&self, degree: usize) -> Vec<f64> {
        chebyshev_roots(degree)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegendreBasis;

impl LegendreBasis {
    /// `(P_n(u), P_{n-1}(u))`
    fn pair(n: usize, u: f64) -> (f64, f64) {
        let (mut p_prev, mut p) = (1.0, u);
        if n == 0 {
            return (1.0, 0.0);
        }
        for k in 2..=n {
            let kf = k as f64;
            let next = ((2.0 * kf - 1.0) * u * p - (kf - 1.0) * p_prev) / kf;
            p_prev = p;
            p = next;
        }
        (p, p_prev)
    }
}

impl BasisFamily for LegendreBasis {
    fn kind(&self) -> BasisKind {
        BasisKind::Legendre
    }

    fn basis_row(&self, u: f64, degree: usize) -> Vec<f64> {
        let mut row = Vec::with_capacity(degree + 1);
        row.push(1.0);
        if degree >= 1 {
            row.push(u);
        }
        for k in 2..=degree {
            let kf = k as f64;
            row.push(((2.0 * kf - 1.0) * u * row[k - 1] - (kf - 1.0) * row[k - 2]) / kf);
        }
        row
    }

    fn evaluate_unit(&self, coefficients: &[f64], u: f64) -> f64 {
        let mut sum = 0.0;
        let (mut p_prev, mut p) = (0.0, 1.0);
        for (k, c) in coefficients.iter().enumerate() {
            if k == 1 {
                p_prev = p;
                p = u;
            } else if k > 1 {
                let kf = k as f64;
                let next = ((2.0 * kf - 1.0) * u * p - (kf - 1.0) * p_prev) / kf;
                p_prev = p;
                p = next;
            }
            sum += c * p;
        }
        sum
    }

    fn derivative_unit(&self, coefficients: &[f64]) -> Vec<f64> {
        let n = coefficients.len().saturating_sub(1);
        if n == 0 {
            return vec![0.0];
        }
        let mut c = coefficients.to_vec();
        let mut der = vec![0.0; n];
        for j in (3..=n).rev() {
            der[j - 1] = (2.0 * j as f64 - 1.0) * c[j];
            c[j - 2] += c[j];
        }
        if n > 1 {
            der[1] = 3.0 * c[2];
        }
        der[0] = c[1];
        der
    }

    // Newton iteration on P_n from the asymptotic root estimates
    fn unit_nodes(&self, degree: usize) -> Vec<f64> {
        let n = degree as f64;
        let mut roots: Vec<f64> = (0..degree)
            .map(|k| {
                let mut x = (PI * (k as f64 + 0.75) / (n + 0.5)).cos();
                for _ in 0..100 {
                    let (p, p_prev) = Self::pair(degree, x);
                    let dp = n * (x * p - p_prev) / (x * x - 1.0);
                    let dx = p / dp;
                    x -= dx;
                    if dx.abs() <= 1e-15 {
                        break;
                    }
                }
                x
            })
            .collect();
        roots.sort_by(|a, b| a.total_cmp(b));
        roots
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonomialBasis;

impl BasisFamily for MonomialBasis {
    fn kind(&self) -> BasisKind {
        BasisKind::Polynomial
    }

    fn basis_row(&self, u: f64, degree: usize) -> Vec<f64> {
        let mut row = Vec::with_capacity(degree + 1);
        let mut power = 1.0;
        for _ in 0..=degree {
            row.push(power);
            power *= u;
        }
        row
    }

    // Horner
    fn evaluate_unit(&self, coefficients: &[f64], u: f64) -> f64 {
        coefficients.iter().rev().fold(0.0, |acc, c| acc * u + c)
    }

    fn derivative_unit(&self, coefficients: &[f64]) -> Vec<f64> {
        if coefficients.len() <= 1 {
            return vec![0.0];
        }
        coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(j, c)| j as f64 * c)
            .collect()
    }

    /// `u^n` has a single repeated root, Chebyshev points are used instead.
    fn unit_nodes(&self, degree: usize) -> Vec<f64> {
        chebyshev_roots(degree)
    }
}

/// A basis function or its derivative: coefficients bound to a family and a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct PolySeries {
    pub coefficients: DVector<f64>,
    pub domain: Domain,
    pub kind: BasisKind,
}

impl PolySeries {
    pub fn new(coefficients: DVector<f64>, domain: Domain, kind: BasisKind) -> Self {
        PolySeries {
            coefficients,
            domain,
            kind,
        }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.kind
            .family()
            .evaluate_unit(self.coefficients.as_slice(), to_unit(x, self.domain))
    }

    pub fn eval_many(&self, points: &[f64]) -> DVector<f64> {
        self.kind
            .family()
            .evaluate(&self.coefficients, self.domain, points)
    }

    pub fn derivative(&self) -> PolySeries {
        self.kind
            .family()
            .differentiate(&self.coefficients, self.domain)
    }
}

pub fn collocation_nodes(kind: BasisKind, degree: usize, domain: Domain) -> Vec<f64> {
    kind.family().collocation_nodes(degree, domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn cubic(x: f64) -> f64 {
        x * x * x - 2.0 * x + 1.0
    }

    fn mesh(domain: Domain, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| domain.0 + (domain.1 - domain.0) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(BasisKind::from_str("Chebyshev").unwrap(), BasisKind::Chebyshev);
        assert_eq!(BasisKind::from_str("legendre").unwrap(), BasisKind::Legendre);
        assert_eq!(BasisKind::from_str("Standard").unwrap(), BasisKind::Polynomial);
        assert_eq!(BasisKind::from_str("Monomial").unwrap(), BasisKind::Polynomial);
        assert!(BasisKind::from_str("Hermite").is_err());
        assert_eq!(BasisKind::Polynomial.to_string(), "Polynomial");
        assert_eq!(BasisKind::iter().count(), 3);
    }

    #[test]
    fn test_unit_evaluation() {
        // T_2(0.5) = -0.5, P_2(0.5) = -0.125
        let c = [0.0, 0.0, 1.0];
        assert_relative_eq!(ChebyshevBasis.evaluate_unit(&c, 0.5), -0.5, epsilon = 1e-15);
        assert_relative_eq!(LegendreBasis.evaluate_unit(&c, 0.5), -0.125, epsilon = 1e-15);
        assert_relative_eq!(MonomialBasis.evaluate_unit(&c, 0.5), 0.25, epsilon = 1e-15);
        assert_eq!(ChebyshevBasis.evaluate_unit(&[], 0.5), 0.0);
        for kind in BasisKind::iter() {
            let basis = kind.family();
            let row = basis.basis_row(0.3, 4);
            let coefs = [0.5, -1.0, 2.0, 0.25, 3.0];
            let direct: f64 = row.iter().zip(coefs.iter()).map(|(r, c)| r * c).sum();
            assert_relative_eq!(basis.evaluate_unit(&coefs, 0.3), direct, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_fit_recovers_cubic() {
        let domain = (0.0, 5.0);
        let x = mesh(domain, 50);
        let y: Vec<f64> = x.iter().map(|x| cubic(*x)).collect();
        for kind in BasisKind::iter() {
            let series = kind.family().fit(&x, &y, 3, domain).unwrap();
            assert_eq!(series.kind, kind);
            assert_eq!(series.degree(), 3);
            for p in [0.0, 1.3, 2.5, 4.9] {
                assert_relative_eq!(series.eval(p), cubic(p), epsilon = 1e-9);
            }
            let values = series.eval_many(&[0.5, 4.5]);
            assert_relative_eq!(values[1], cubic(4.5), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_derivative_scaled_to_domain() {
        let domain = (-2.0, 3.0);
        let x = mesh(domain, 40);
        let y: Vec<f64> = x.iter().map(|x| cubic(*x)).collect();
        for kind in BasisKind::iter() {
            let series = kind.family().fit(&x, &y, 5, domain).unwrap();
            let der = series.derivative();
            assert_eq!(der.degree(), 4);
            let second = der.derivative();
            for p in [-1.5, 0.0, 2.2] {
                assert_relative_eq!(der.eval(p), 3.0 * p * p - 2.0, epsilon = 1e-8);
                assert_relative_eq!(second.eval(p), 6.0 * p, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_derivative_of_constant_is_zero() {
        for kind in BasisKind::iter() {
            let der = kind
                .family()
                .differentiate(&DVector::from_vec(vec![4.0]), (0.0, 1.0));
            assert_eq!(der.coefficients.len(), 1);
            assert_eq!(der.eval(0.3), 0.0);
        }
    }

    #[test]
    fn test_nodes_are_roots() {
        let domain = (0.0, 5.0);
        for kind in BasisKind::iter() {
            let nodes = collocation_nodes(kind, 15, domain);
            assert_eq!(nodes.len(), 15);
            assert!(nodes.windows(2).all(|w| w[0] < w[1]));
            assert!(nodes.iter().all(|x| *x > 0.0 && *x < 5.0));
        }
        let mut t15 = vec![0.0; 16];
        t15[15] = 1.0;
        let t15 = DVector::from_vec(t15);
        let cheb = ChebyshevBasis.evaluate(&t15, domain, &collocation_nodes(BasisKind::Chebyshev, 15, domain));
        assert!(cheb.amax() < 1e-12);
        let leg = LegendreBasis.evaluate(&t15, domain, &collocation_nodes(BasisKind::Legendre, 15, domain));
        assert!(leg.amax() < 1e-12);
        assert_eq!(
            collocation_nodes(BasisKind::Polynomial, 7, domain),
            collocation_nodes(BasisKind::Chebyshev, 7, domain)
        );
    }

    #[test]
    fn test_fit_input_errors() {
        let basis = BasisKind::Chebyshev.family();
        assert!(matches!(
            basis.fit(&[0.0, 1.0], &[1.0], 1, (0.0, 1.0)),
            Err(CollocationError::ShapeMismatch { .. })
        ));
        assert!(basis.fit(&[], &[], 1, (0.0, 1.0)).is_err());
        assert!(basis.fit(&[0.0, 1.0], &[1.0, 2.0], 1, (1.0, 1.0)).is_err());
    }
}
