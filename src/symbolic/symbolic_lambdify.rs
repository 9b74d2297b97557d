//! Lowering of symbolic expressions into numeric evaluators.
//!
//! `Expr::compile` resolves every variable name to its position in the argument list once, so
//! that evaluation walks an index-addressed tree and never looks names up again.
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;

/// Expression tree with variables replaced by argument positions.
#[derive(Clone, Debug, PartialEq)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    Ctg(Box<Lambda>),
    ArcSin(Box<Lambda>),
    ArcCos(Box<Lambda>),
    ArcTg(Box<Lambda>),
    ArcCtg(Box<Lambda>),
}

impl Expr {
    /// Resolves variables against `vars`; a variable missing from `vars` is an error.
    pub fn compile<S: AsRef<str>>(&self, vars: &[S]) -> Result<Lambda, String> {
        let un = |e: &Expr| -> Result<Box<Lambda>, String> { Ok(Box::new(e.compile(vars)?)) };
        let lambda = match self {
            Expr::Var(name) => {
                let idx = vars
                    .iter()
                    .position(|v| v.as_ref() == name)
                    .ok_or_else(|| format!("unknown symbol '{}'", name))?;
                Lambda::Var(idx)
            }
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(un(a)?, un(b)?),
            Expr::Sub(a, b) => Lambda::Sub(un(a)?, un(b)?),
            Expr::Mul(a, b) => Lambda::Mul(un(a)?, un(b)?),
            Expr::Div(a, b) => Lambda::Div(un(a)?, un(b)?),
            Expr::Pow(a, b) => Lambda::Pow(un(a)?, un(b)?),
            Expr::Exp(e) => Lambda::Exp(un(e)?),
            Expr::Ln(e) => Lambda::Ln(un(e)?),
            Expr::sin(e) => Lambda::Sin(un(e)?),
            Expr::cos(e) => Lambda::Cos(un(e)?),
            Expr::tg(e) => Lambda::Tg(un(e)?),
            Expr::ctg(e) => Lambda::Ctg(un(e)?),
            Expr::arcsin(e) => Lambda::ArcSin(un(e)?),
            Expr::arccos(e) => Lambda::ArcCos(un(e)?),
            Expr::arctg(e) => Lambda::ArcTg(un(e)?),
            Expr::arcctg(e) => Lambda::ArcCtg(un(e)?),
        };
        Ok(lambda)
    }

    /// Boxed closure over the compiled tree, for callers that want a plain function.
    pub fn lambdify<S: AsRef<str>>(
        &self,
        vars: &[S],
    ) -> Result<Box<dyn Fn(&[f64]) -> f64 + Send + Sync>, String> {
        let compiled = self.compile(vars)?;
        Ok(Box::new(compiled.as_closure()))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args[*i],
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => a.eval(args).powf(b.eval(args)),
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::Ctg(e) => 1.0 / e.eval(args).tan(),
            Lambda::ArcSin(e) => e.eval(args).asin(),
            Lambda::ArcCos(e) => e.eval(args).acos(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
            Lambda::ArcCtg(e) => (PI / 2.0) - e.eval(args).atan(),
        }
    }

    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.eval(args)
    }
}
