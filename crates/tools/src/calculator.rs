//! `calculate` — evaluates arithmetic expressions.
//!
//! Supports `+ - * / % ^`, parentheses, unary minus, and decimals, via a
//! small recursive-descent evaluator. `^` binds tightest and is
//! right-associative.

use async_trait::async_trait;
use std::iter::Peekable;
use std::str::Chars;
use thoughtline_core::error::ToolError;
use thoughtline_core::tool::{ParamSpec, ParamType, ToolArgs, ToolHandler, ToolSpec};

pub const NAME: &str = "calculate";

/// Deepest nesting of parentheses, unary minus and `^` the evaluator accepts.
const MAX_DEPTH: usize = 64;

pub struct CalculatorTool;

impl CalculatorTool {
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses and decimals.",
        )
        .category("math")
        .param(ParamSpec::required(
            "expression",
            ParamType::String,
            "The expression to evaluate, e.g. '(2 + 3) * 4'",
        ))
    }
}

#[async_trait]
impl ToolHandler for CalculatorTool {
    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let expr = args
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::failed(NAME, "missing 'expression' argument"))?;

        let value = evaluate(expr).map_err(|e| ToolError::failed(NAME, e.to_string()))?;
        Ok(format_number(value))
    }
}

/// Render integral values without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expected closing parenthesis")]
    UnclosedParen,
    #[error("trailing input after expression")]
    TrailingInput,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("expression is nested too deeply")]
    TooDeep,
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let mut eval = Evaluator {
        chars: expr.chars().peekable(),
        depth: 0,
    };
    let value = eval.expr()?;
    eval.skip_ws();
    if eval.chars.peek().is_some() {
        return Err(CalcError::TrailingInput);
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

struct Evaluator<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Evaluator<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        self.chars.next_if_eq(&expected).is_some()
    }

    // expr = term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.term()?;
        loop {
            if self.eat('+') {
                acc += self.term()?;
            } else if self.eat('-') {
                acc -= self.term()?;
            } else {
                return Ok(acc);
            }
        }
    }

    // term = unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.unary()?;
        loop {
            if self.eat('*') {
                acc *= self.unary()?;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                acc /= rhs;
            } else if self.eat('%') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                acc %= rhs;
            } else {
                return Ok(acc);
            }
        }
    }

    // unary = '-' unary | power
    fn unary(&mut self) -> Result<f64, CalcError> {
        // Every recursive rule passes through here.
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = if self.eat('-') {
            self.unary().map(|v| -v)
        } else {
            self.power()
        };
        self.depth -= 1;
        value
    }

    // power = primary ('^' unary)?
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.eat('^') {
            let exp = self.unary()?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    // primary = NUMBER | '(' expr ')'
    fn primary(&mut self) -> Result<f64, CalcError> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some('(') => {
                self.chars.next();
                let value = self.expr()?;
                if self.eat(')') {
                    Ok(value)
                } else {
                    Err(CalcError::UnclosedParen)
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(d) = self.chars.next_if(|d| d.is_ascii_digit() || *d == '.') {
                    literal.push(d);
                }
                literal
                    .parse()
                    .map_err(|_| CalcError::InvalidNumber(literal))
            }
            Some(c) => Err(CalcError::UnexpectedChar(c)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
    }

    #[test]
    fn modulo_and_division() {
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn malformed_input() {
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate(""), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnclosedParen));
        assert_eq!(evaluate("2 2"), Err(CalcError::TrailingInput));
        assert_eq!(evaluate("2 $ 2"), Err(CalcError::TrailingInput));
        assert_eq!(evaluate("$"), Err(CalcError::UnexpectedChar('$')));
        assert!(matches!(evaluate("1.2.3"), Err(CalcError::InvalidNumber(_))));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate(&parens), Err(CalcError::TooDeep));
        assert_eq!(evaluate(&format!("{}1", "-".repeat(10_000))), Err(CalcError::TooDeep));
        let tower = vec!["1"; 10_000].join("^");
        assert_eq!(evaluate(&tower), Err(CalcError::TooDeep));

        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&shallow).unwrap(), 1.0);
        assert_eq!(evaluate("--2").unwrap(), 2.0);
    }

    #[tokio::test]
    async fn tool_formats_results() {
        let out = CalculatorTool
            .call(&args(json!({"expression": "10 / 2"})))
            .await
            .unwrap();
        assert_eq!(out, "5");

        let out = CalculatorTool
            .call(&args(json!({"expression": "10 / 3"})))
            .await
            .unwrap();
        assert!(out.starts_with("3.333"));
    }

    #[tokio::test]
    async fn tool_reports_evaluation_errors() {
        let err = CalculatorTool
            .call(&args(json!({"expression": "1 / 0"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("division by zero"));

        let deep = format!("{}2{}", "(".repeat(5_000), ")".repeat(5_000));
        let err = CalculatorTool
            .call(&args(json!({ "expression": deep })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn spec_declares_required_expression() {
        let spec = CalculatorTool::spec();
        assert_eq!(spec.name, "calculate");
        assert!(spec.parameters[0].required);
        assert!(spec.permission.is_none());
    }
}
