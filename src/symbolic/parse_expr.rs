use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{
    brackets_are_balanced, find_char_positions_outside_brackets,
    find_rightmost_operator_outside_brackets, find_pair_to_this_bracket, is_identifier,
};
use std::f64::consts::PI;
/// turns a String expression into a symbolic expression
///# Example
/// ```
/// use RustedCollocation::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("-(T1 - T2)*U").unwrap();
/// let f = parsed_expression.compile(&["T1", "T2", "U"]).unwrap();
/// assert_eq!(f.eval(&[3.0, 1.0, 2.0]), -4.0);
/// ```
//                  search recursion diagram
//                "y^2+exp(x)-log(x)/y"              |
//                |       left          | right      |
//                |_______________________________   |
//                |  rightmost + or - outside ()     |
//                |__________________________________|
//                |   y^2+exp(x)        |log(x)/y    |
//                |      |              |    |       |
//                |     \|/             |   \|/      |
//                |   split by +        | split by / |
//                |  y^2   |  exp(x)    |log(x) | y  |
//                |  by ^  | function   |function|var |
//                  etc...

// a sign is binary when something that can end an operand stands before it
fn is_binary_sign(input: &str, pos: usize) -> bool {
    let before = input[..pos].trim_end();
    let Some(prev) = before.chars().last() else {
        return false;
    };
    if matches!(prev, '+' | '-' | '*' | '/' | '^' | '(') {
        return false;
    }
    // exponent of a literal like 2.5e-3
    if (prev == 'e' || prev == 'E') && pos > 0 && before.len() == pos {
        let token_start = before
            .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let mantissa = &before[token_start..before.len() - 1];
        if !mantissa.is_empty()
            && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
            && mantissa.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            return false;
        }
    }
    true
}

fn function_of(name: &str, arg: Expr) -> Result<Expr, String> {
    let expr = match name {
        "exp" => Expr::Exp(arg.boxed()),
        "ln" | "log" => Expr::Ln(arg.boxed()),
        "sqrt" => Expr::Pow(arg.boxed(), Expr::Const(0.5).boxed()),
        "sin" => Expr::sin(arg.boxed()),
        "cos" => Expr::cos(arg.boxed()),
        "tg" | "tan" => Expr::tg(arg.boxed()),
        "ctg" | "cot" => Expr::ctg(arg.boxed()),
        "arcsin" | "asin" => Expr::arcsin(arg.boxed()),
        "arccos" | "acos" => Expr::arccos(arg.boxed()),
        "arctg" | "atan" => Expr::arctg(arg.boxed()),
        "arcctg" | "acot" => Expr::arcctg(arg.boxed()),
        _ => return Err(format!("unknown function '{}'", name)),
    };
    Ok(expr)
}

pub fn parse_expression_func(input: &str) -> Result<Expr, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty expression".to_string());
    }
    if !input.is_ascii() {
        return Err(format!("non-ASCII character in expression '{}'", input));
    }
    if !brackets_are_balanced(input) {
        return Err(format!("unbalanced brackets in '{}'", input));
    }

    // addition and subtraction are left associative: split at the rightmost binary sign
    if let Some((pos, op)) = find_rightmost_operator_outside_brackets(input, &['+', '-'], is_binary_sign)
    {
        let left = parse_expression_func(&input[..pos])?;
        let right = parse_expression_func(&input[pos + 1..])?;
        return Ok(match op {
            '+' => Expr::Add(left.boxed(), right.boxed()),
            _ => Expr::Sub(left.boxed(), right.boxed()),
        });
    }

    if let Some((pos, op)) = find_rightmost_operator_outside_brackets(input, &['*', '/'], |_, _| true)
    {
        let left = parse_expression_func(&input[..pos])?;
        let right = parse_expression_func(&input[pos + 1..])?;
        return Ok(match op {
            '*' => Expr::Mul(left.boxed(), right.boxed()),
            _ => Expr::Div(left.boxed(), right.boxed()),
        });
    }

    // unary signs bind weaker than powers: -x^2 == -(x^2)
    if let Some(rest) = input.strip_prefix('-') {
        return Ok(match parse_expression_func(rest)? {
            Expr::Const(value) => Expr::Const(-value),
            inner => -inner,
        });
    }
    if let Some(rest) = input.strip_prefix('+') {
        return parse_expression_func(rest);
    }

    // power is right associative: split at the leftmost ^
    if let Some(&pos) = find_char_positions_outside_brackets(input, '^').first() {
        let base = parse_expression_func(&input[..pos])?;
        let exponent = parse_expression_func(&input[pos + 1..])?;
        return Ok(Expr::Pow(base.boxed(), exponent.boxed()));
    }

    if input.ends_with(')') {
        if let Some(open) = input.find('(') {
            if find_pair_to_this_bracket(input, open) == Some(input.len() - 1) {
                let inner = &input[open + 1..input.len() - 1];
                let name = input[..open].trim();
                if name.is_empty() {
                    return parse_expression_func(inner);
                }
                let arg = parse_expression_func(inner)?;
                return function_of(name, arg);
            }
        }
        return Err(format!("cannot parse '{}'", input));
    }

    if input.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return input
            .parse::<f64>()
            .map(Expr::Const)
            .map_err(|_| format!("malformed number '{}'", input));
    }
    if input == "pi" {
        return Ok(Expr::Const(PI));
    }
    if is_identifier(input) {
        return Ok(Expr::Var(input.to_string()));
    }
    Err(format!("cannot parse '{}'", input))
}
