#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedCollocation::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("-0.5*(T1 - T2)*U").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// assert_eq!(parsed_expression.all_arguments_are_variables(), vec!["T1", "T2", "U"]);
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// 1) turns a String expression into a symbolic expression
/// 2) lists the variables the expression depends on
/// 3) turns a symbolic expression into a string expression for printing and control results
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
///________________________________________________________________________________________________________________________________________________
/// turns a symbolic expression into a numeric evaluator with positional arguments
/// ```
/// use RustedCollocation::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x^2 + y").unwrap().lambdify(&["x", "y"]).unwrap();
/// assert_eq!(f(&[3.0, 1.0]), 10.0);
/// ```
pub mod symbolic_lambdify;
///______________________________________________________________________________________________________________________________________________
/// the collection of utility functions mainly for bracket parsing and proceeding
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
