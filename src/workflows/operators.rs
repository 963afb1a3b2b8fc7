//! Comparison operators shared by the `if_else` and `switch` nodes.
//!
//! Both operands are cast to trimmed strings first. Textual comparisons are
//! case-insensitive, `regex` is a case-insensitive search, and the numeric
//! operators parse both sides as `f64`.

use regex::RegexBuilder;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    IsEmpty,
    IsNotEmpty,
}

/// Why an operator could not produce a verdict
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),

    #[error("Cannot compare non-numeric values with {0} operator")]
    NotNumeric(Operator),
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Regex,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterEqual,
        Operator::LessEqual,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Regex => "regex",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterEqual => "greater_equal",
            Operator::LessEqual => "less_equal",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
        }
    }

    /// Compare a state field against a configured literal
    pub fn evaluate(&self, field: &Value, literal: &Value) -> Result<bool, EvalError> {
        let field = stringify(field);
        let literal = stringify(literal);
        self.evaluate_str(&field, &literal)
    }

    fn evaluate_str(&self, field: &str, literal: &str) -> Result<bool, EvalError> {
        let f = field.to_lowercase();
        let l = literal.to_lowercase();

        let verdict = match self {
            Operator::Equals => f == l,
            Operator::NotEquals => f != l,
            Operator::Contains => f.contains(&l),
            Operator::NotContains => !f.contains(&l),
            Operator::StartsWith => f.starts_with(&l),
            Operator::EndsWith => f.ends_with(&l),
            Operator::Regex => RegexBuilder::new(literal)
                .case_insensitive(true)
                .build()
                .map_err(|e| EvalError::InvalidRegex(e.to_string()))?
                .is_match(field),
            Operator::GreaterThan
            | Operator::LessThan
            | Operator::GreaterEqual
            | Operator::LessEqual => {
                let (a, b) = match (field.parse::<f64>(), literal.parse::<f64>()) {
                    (Ok(a), Ok(b)) => (a, b),
                    _ => return Err(EvalError::NotNumeric(*self)),
                };
                match self {
                    Operator::GreaterThan => a > b,
                    Operator::LessThan => a < b,
                    Operator::GreaterEqual => a >= b,
                    _ => a <= b,
                }
            }
            Operator::IsEmpty => field.is_empty(),
            Operator::IsNotEmpty => !field.is_empty(),
        };
        Ok(verdict)
    }
}

impl FromStr for Operator {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| EvalError::UnknownOperator(name.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluate by operator name
pub fn evaluate(operator: &str, field: &Value, literal: &Value) -> Result<bool, EvalError> {
    operator.parse::<Operator>()?.evaluate(field, literal)
}

/// String form of a JSON value for comparison: strings unquoted, null empty,
/// everything else JSON-encoded; always trimmed.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
