//! # Expression compiler
//!
//! Turns the symbolic right-hand sides and boundary conditions of a model into vectorized numeric
//! functions. Every compiled function takes its arguments positionally in the order
//! `[independent var, dependent vars.., parameters in canonical order..]`; each argument may be
//! a scalar or an array, scalars are broadcast against arrays.
//!
//! Compilation goes through the `CompileBackend` trait so that the symbolic layer can be swapped;
//! the default `LambdaBackend` lowers `Expr` into an index-addressed `Lambda` tree.
//!
//! Compiled right-hand sides live in an explicit `RhsCache` keyed by dependent variable id,
//! expression text and argument order. A compiler owns its cache; a cache is only shared between
//! compilers when the caller passes it to `ExpressionCompiler::with_cache`.
use crate::numerical::Collocation::BVP_model::{BoundarySide, TwoPointBVP};
use crate::numerical::Collocation::collocation_errors::CollocationError;
use crate::numerical::Collocation::validator::Params;
use crate::symbolic::symbolic_engine::Expr;
use log::{debug, info};
use nalgebra::DVector;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// One positional argument of a compiled function.
#[derive(Clone, Copy, Debug)]
pub enum Arg<'a> {
    Scalar(f64),
    Array(&'a [f64]),
}

impl<'a> Arg<'a> {
    fn len(&self) -> Option<usize> {
        match self {
            Arg::Scalar(_) => None,
            Arg::Array(a) => Some(a.len()),
        }
    }

    #[inline]
    fn at(&self, i: usize) -> f64 {
        match self {
            Arg::Scalar(v) => *v,
            Arg::Array(a) => a[i],
        }
    }
}

type ScalarFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Numeric function of a fixed number of positional arguments. Cloning is cheap.
#[derive(Clone)]
pub struct CompiledFn {
    function: Arc<ScalarFn>,
    arity: usize,
    source: String,
}

impl fmt::Debug for CompiledFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFn")
            .field("arity", &self.arity)
            .field("source", &self.source)
            .finish()
    }
}

impl CompiledFn {
    pub fn new<F>(function: F, arity: usize, source: impl Into<String>) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        CompiledFn {
            function: Arc::new(function),
            arity,
            source: source.into(),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Text of the expression the function was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates at one point; `args` must hold exactly `arity` values.
    pub fn call_scalar(&self, args: &[f64]) -> Result<f64, CollocationError> {
        if args.len() != self.arity {
            return Err(CollocationError::shape(
                format!("arguments of '{}'", self.source),
                self.arity,
                args.len(),
            ));
        }
        Ok((self.function)(args))
    }

    /// Elementwise evaluation with scalar broadcasting. Without any array argument the result
    /// has length 1.
    pub fn call(&self, args: &[Arg]) -> Result<DVector<f64>, CollocationError> {
        if args.len() != self.arity {
            return Err(CollocationError::shape(
                format!("arguments of '{}'", self.source),
                self.arity,
                args.len(),
            ));
        }
        let mut n: Option<usize> = None;
        for len in args.iter().filter_map(|a| a.len()) {
            match n {
                None => n = Some(len),
                Some(expected) if expected != len => {
                    return Err(CollocationError::shape(
                        format!("argument arrays of '{}'", self.source),
                        expected,
                        len,
                    ));
                }
                _ => {}
            }
        }
        let n = n.unwrap_or(1);
        let mut buffer = vec![0.0; self.arity];
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            for (slot, arg) in buffer.iter_mut().zip(args) {
                *slot = arg.at(i);
            }
            values.push((self.function)(&buffer));
        }
        Ok(DVector::from_vec(values))
    }
}

/// Capability of turning an expression into a numeric function of ordered symbols.
pub trait CompileBackend: Send + Sync {
    fn compile(&self, expression: &Expr, ordered_symbols: &[String])
    -> Result<CompiledFn, CollocationError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LambdaBackend;

impl CompileBackend for LambdaBackend {
    fn compile(
        &self,
        expression: &Expr,
        ordered_symbols: &[String],
    ) -> Result<CompiledFn, CollocationError> {
        let lambda = expression.compile(ordered_symbols).map_err(|e| {
            CollocationError::Compilation(format!("cannot compile '{}': {}", expression, e))
        })?;
        Ok(CompiledFn::new(
            lambda.as_closure(),
            ordered_symbols.len(),
            expression.to_string(),
        ))
    }
}

/// Identity of a compiled right-hand side: the variable it belongs to, the expression text and
/// the ordered argument symbols it was compiled against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RhsKey {
    var: String,
    expression: String,
    symbols: Vec<String>,
}

impl RhsKey {
    pub fn new(var: &str, expression: &Expr, symbols: &[String]) -> Self {
        RhsKey {
            var: var.to_string(),
            expression: expression.to_string(),
            symbols: symbols.to_vec(),
        }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

/// Compiled right-hand sides. A lookup only hits when variable, expression and argument order all
/// match, so sessions with different models or parameter names can share one cache.
#[derive(Clone, Default, Debug)]
pub struct RhsCache {
    inner: Arc<Mutex<HashMap<RhsKey, CompiledFn>>>,
}

impl RhsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RhsKey, CompiledFn>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &RhsKey) -> Option<CompiledFn> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: RhsKey, function: CompiledFn) {
        self.lock().insert(key, function);
    }

    /// True when some right-hand side of `var` is cached.
    pub fn contains(&self, var: &str) -> bool {
        self.lock().keys().any(|key| key.var() == var)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// True when both handles point at the same storage.
    pub fn is_shared_with(&self, other: &RhsCache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// True when another handle to this storage exists.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.inner) > 1
    }
}

pub struct ExpressionCompiler {
    backend: Box<dyn CompileBackend>,
    rhs_cache: RhsCache,
    // absent: not compiled yet; Some(None): side has no condition
    boundary_cache: HashMap<BoundarySide, Option<Vec<CompiledFn>>>,
    compilations: usize,
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self::with_backend_and_cache(Box::new(LambdaBackend), RhsCache::new())
    }

    pub fn with_backend(backend: Box<dyn CompileBackend>) -> Self {
        Self::with_backend_and_cache(backend, RhsCache::new())
    }

    /// Compiler that reads and fills a cache the caller may share with other compilers.
    pub fn with_cache(cache: RhsCache) -> Self {
        Self::with_backend_and_cache(Box::new(LambdaBackend), cache)
    }

    pub fn with_backend_and_cache(backend: Box<dyn CompileBackend>, cache: RhsCache) -> Self {
        ExpressionCompiler {
            backend,
            rhs_cache: cache,
            boundary_cache: HashMap::new(),
            compilations: 0,
        }
    }

    pub fn cache(&self) -> &RhsCache {
        &self.rhs_cache
    }

    /// Number of expressions this compiler has handed to its backend.
    pub fn compilations(&self) -> usize {
        self.compilations
    }

    pub fn compile(
        &mut self,
        expression: &Expr,
        ordered_symbols: &[String],
    ) -> Result<CompiledFn, CollocationError> {
        self.compilations += 1;
        self.backend.compile(expression, ordered_symbols)
    }

    /// Compiled right-hand side of `var`, compiled on first request.
    pub fn rhs_callable(
        &mut self,
        model: &TwoPointBVP,
        params: &Params,
        var: &str,
    ) -> Result<CompiledFn, CollocationError> {
        let expr = model.rhs_of(var).ok_or_else(|| {
            CollocationError::configuration(format!("'{}' is not a dependent variable", var))
        })?;
        let symbols = model.symbols(params);
        let key = RhsKey::new(var, expr, &symbols);
        if let Some(cached) = self.rhs_cache.get(&key) {
            return Ok(cached);
        }
        let compiled = self.compile(expr, &symbols)?;
        debug!("compiled right-hand side of {}: {}", var, compiled.source());
        self.rhs_cache.insert(key, compiled.clone());
        Ok(compiled)
    }

    /// Compiled conditions of one side, or `None` when the side is not constrained.
    pub fn boundary_callable(
        &mut self,
        model: &TwoPointBVP,
        params: &Params,
        side: BoundarySide,
    ) -> Result<Option<Vec<CompiledFn>>, CollocationError> {
        if let Some(cached) = self.boundary_cache.get(&side) {
            return Ok(cached.clone());
        }
        let compiled = match model.boundary_condition(side) {
            None => None,
            Some(conditions) => {
                let symbols = model.symbols(params);
                let mut list = Vec::with_capacity(conditions.len());
                for expr in conditions {
                    list.push(self.compile(expr, &symbols)?);
                }
                debug!("compiled {} {} boundary conditions", list.len(), side);
                Some(list)
            }
        };
        self.boundary_cache.insert(side, compiled.clone());
        Ok(compiled)
    }

    /// Compiles everything the residual needs so that solving never compiles.
    pub fn warm_up(&mut self, model: &TwoPointBVP, params: &Params) -> Result<(), CollocationError> {
        for var in model.dependent_vars() {
            self.rhs_callable(model, params, var)?;
        }
        self.boundary_callable(model, params, BoundarySide::Lower)?;
        self.boundary_callable(model, params, BoundarySide::Upper)?;
        info!(
            "expression compiler ready: {} cached right-hand sides, {} compilations",
            self.rhs_cache.len(),
            self.compilations
        );
        Ok(())
    }

    /// Drops compiled functions when the model or the parameters are rebound. A shared cache
    /// is left to the other sessions holding it.
    pub fn clear(&mut self) {
        if !self.rhs_cache.is_shared() {
            self.rhs_cache.clear();
        }
        self.boundary_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Collocation::validator::canonicalize_params;
    use approx::assert_relative_eq;

    fn model() -> TwoPointBVP {
        TwoPointBVP::from_strings(
            "A",
            &["T1", "T2"],
            &[("T1", "-(T1 - T2)*U"), ("T2", "-0.5*(T1 - T2)*U")],
            Some(vec!["T1 - T10"]),
            None,
        )
        .unwrap()
    }

    fn params() -> Params {
        canonicalize_params(HashMap::from([
            ("T10".to_string(), 130.0),
            ("U".to_string(), 2.0),
        ]))
    }

    #[test]
    fn test_broadcasting() {
        let mut compiler = ExpressionCompiler::new();
        let f = compiler.rhs_callable(&model(), &params(), "T1").unwrap();
        assert_eq!(f.arity(), 5);
        let t1 = [130.0, 100.0, 70.0];
        let out = f
            .call(&[
                Arg::Scalar(0.0),
                Arg::Array(&t1),
                Arg::Scalar(70.0),
                Arg::Scalar(130.0),
                Arg::Scalar(2.0),
            ])
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_relative_eq!(out[0], -120.0);
        assert_relative_eq!(out[1], -60.0);
        assert_relative_eq!(out[2], 0.0);

        let scalar = f.call_scalar(&[0.0, 130.0, 70.0, 130.0, 2.0]).unwrap();
        assert_relative_eq!(scalar, -120.0);
    }

    #[test]
    fn test_array_length_mismatch() {
        let mut compiler = ExpressionCompiler::new();
        let f = compiler.rhs_callable(&model(), &params(), "T2").unwrap();
        let err = f
            .call(&[
                Arg::Scalar(0.0),
                Arg::Array(&[1.0, 2.0]),
                Arg::Array(&[1.0, 2.0, 3.0]),
                Arg::Scalar(130.0),
                Arg::Scalar(2.0),
            ])
            .unwrap_err();
        assert!(matches!(err, CollocationError::ShapeMismatch { expected: 2, found: 3, .. }));
        assert!(f.call(&[Arg::Scalar(0.0)]).is_err());
    }

    #[test]
    fn test_unknown_symbol_is_compilation_error() {
        let expr = Expr::parse_expression("T1 * k").unwrap();
        let err = LambdaBackend
            .compile(&expr, &["T1".to_string()])
            .unwrap_err();
        assert!(matches!(err, CollocationError::Compilation(_)));
    }

    #[test]
    fn test_rhs_compiled_once() {
        let mut compiler = ExpressionCompiler::new();
        let (m, p) = (model(), params());
        compiler.rhs_callable(&m, &p, "T1").unwrap();
        compiler.rhs_callable(&m, &p, "T1").unwrap();
        assert_eq!(compiler.compilations(), 1);
        assert!(compiler.cache().contains("T1"));
        assert!(compiler.rhs_callable(&m, &p, "T3").is_err());
    }

    #[test]
    fn test_shared_cache_is_opt_in() {
        let (m, p) = (model(), params());
        let mut first = ExpressionCompiler::new();
        first.warm_up(&m, &p).unwrap();
        let mut isolated = ExpressionCompiler::new();
        assert!(isolated.cache().is_empty());
        isolated.rhs_callable(&m, &p, "T1").unwrap();
        assert_eq!(isolated.compilations(), 1);

        let mut shared = ExpressionCompiler::with_cache(first.cache().clone());
        assert!(shared.cache().is_shared_with(first.cache()));
        shared.rhs_callable(&m, &p, "T1").unwrap();
        shared.rhs_callable(&m, &p, "T2").unwrap();
        assert_eq!(shared.compilations(), 0);
    }

    #[test]
    fn test_shared_cache_keyed_by_argument_order() {
        let m = TwoPointBVP::from_strings("x", &["y"], &[("y", "-k*y")], None, None).unwrap();
        let kz = canonicalize_params(HashMap::from([("k".to_string(), 1.0), ("z".to_string(), 0.0)]));
        let ak = canonicalize_params(HashMap::from([("a".to_string(), 0.0), ("k".to_string(), 1.0)]));
        let cache = RhsCache::new();
        let mut first = ExpressionCompiler::with_cache(cache.clone());
        let mut second = ExpressionCompiler::with_cache(cache.clone());
        let f = first.rhs_callable(&m, &kz, "y").unwrap();
        let g = second.rhs_callable(&m, &ak, "y").unwrap();
        assert_eq!(second.compilations(), 1);
        assert_eq!(cache.len(), 2);
        // x, y, then the parameters in canonical order
        assert_relative_eq!(f.call_scalar(&[0.0, 2.0, 3.0, 0.0]).unwrap(), -6.0);
        assert_relative_eq!(g.call_scalar(&[0.0, 2.0, 0.0, 3.0]).unwrap(), -6.0);

        // a different expression for the same variable is not a hit either
        let other = TwoPointBVP::from_strings("x", &["y"], &[("y", "k*y")], None, None).unwrap();
        let h = second.rhs_callable(&other, &ak, "y").unwrap();
        assert_relative_eq!(h.call_scalar(&[0.0, 2.0, 0.0, 3.0]).unwrap(), 6.0);
        assert_eq!(second.compilations(), 2);
    }

    #[test]
    fn test_clear_keeps_shared_cache() {
        let (m, p) = (model(), params());
        let cache = RhsCache::new();
        let mut first = ExpressionCompiler::with_cache(cache.clone());
        first.warm_up(&m, &p).unwrap();
        first.clear();
        assert_eq!(cache.len(), 2);
        let mut second = ExpressionCompiler::with_cache(cache.clone());
        second.rhs_callable(&m, &p, "T1").unwrap();
        assert_eq!(second.compilations(), 0);

        drop(cache);
        drop(second);
        first.clear();
        assert!(first.cache().is_empty());
    }

    struct Frozen;

    impl CompileBackend for Frozen {
        fn compile(
            &self,
            expression: &Expr,
            ordered_symbols: &[String],
        ) -> Result<CompiledFn, CollocationError> {
            Ok(CompiledFn::new(
                |_: &[f64]| 42.0,
                ordered_symbols.len(),
                expression.to_string(),
            ))
        }
    }

    #[test]
    fn test_custom_backend() {
        let mut compiler = ExpressionCompiler::with_backend(Box::new(Frozen));
        let f = compiler.rhs_callable(&model(), &params(), "T1").unwrap();
        assert_eq!(f.arity(), 5);
        assert_eq!(f.call_scalar(&[0.0; 5]).unwrap(), 42.0);
        assert_eq!(compiler.compilations(), 1);
    }

    #[test]
    fn test_boundary_memoized() {
        let (m, p) = (model(), params());
        let mut compiler = ExpressionCompiler::new();
        let lower = compiler
            .boundary_callable(&m, &p, BoundarySide::Lower)
            .unwrap()
            .unwrap();
        assert_eq!(lower.len(), 1);
        assert!(compiler
            .boundary_callable(&m, &p, BoundarySide::Upper)
            .unwrap()
            .is_none());
        let before = compiler.compilations();
        compiler.boundary_callable(&m, &p, BoundarySide::Lower).unwrap();
        assert_eq!(compiler.compilations(), before);
        let value = lower[0].call_scalar(&[0.0, 131.0, 70.0, 130.0, 2.0]).unwrap();
        assert_relative_eq!(value, 1.0);

        compiler.clear();
        assert!(compiler.cache().is_empty());
        compiler.boundary_callable(&m, &p, BoundarySide::Lower).unwrap();
        assert_eq!(compiler.compilations(), before + 1);
    }
}
