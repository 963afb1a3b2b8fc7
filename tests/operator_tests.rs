//! Operator truth tables for conditional nodes.

use agentplane::workflows::operators::{evaluate, EvalError, Operator};
use rstest::rstest;
use serde_json::{json, Value};

#[rstest]
#[case("equals", json!("Refund"), json!("refund"), true)]
#[case("equals", json!(" yes "), json!("yes"), true)]
#[case("equals", json!(5), json!("5"), true)]
#[case("not_equals", json!("a"), json!("b"), true)]
#[case("not_equals", json!("A"), json!("a"), false)]
#[case("contains", json!("Order Status"), json!("status"), true)]
#[case("contains", json!("billing"), json!("refund"), false)]
#[case("not_contains", json!("billing"), json!("refund"), true)]
#[case("starts_with", json!("ORD-991"), json!("ord-"), true)]
#[case("ends_with", json!("report.PDF"), json!(".pdf"), true)]
#[case("ends_with", json!("report.pdf"), json!(".doc"), false)]
#[case("regex", json!("user@example.com"), json!("^[a-z]+@example\\.com$"), true)]
#[case("regex", json!("call 555-0100"), json!("\\d{3}-\\d{4}"), true)]
#[case("greater_than", json!("10.5"), json!("10"), true)]
#[case("greater_than", json!(10), json!(10), false)]
#[case("less_than", json!("-1"), json!("0"), true)]
#[case("greater_equal", json!(10), json!("10"), true)]
#[case("less_equal", json!("9.99"), json!(10), true)]
#[case("is_empty", json!("   "), json!(null), true)]
#[case("is_empty", Value::Null, json!("ignored"), true)]
#[case("is_empty", json!("x"), json!(null), false)]
#[case("is_not_empty", json!("x"), json!(null), true)]
#[case("is_not_empty", json!(0), json!(null), true)]
fn test_operator_table(
    #[case] operator: &str,
    #[case] field: Value,
    #[case] literal: Value,
    #[case] expected: bool,
) {
    assert_eq!(evaluate(operator, &field, &literal).unwrap(), expected);
}

#[rstest]
#[case("greater_than")]
#[case("less_than")]
#[case("greater_equal")]
#[case("less_equal")]
fn test_numeric_operators_reject_text(#[case] operator: &str) {
    let op: Operator = operator.parse().unwrap();
    assert_eq!(
        evaluate(operator, &json!("ten"), &json!("5")),
        Err(EvalError::NotNumeric(op))
    );
}

#[rstest]
#[case("between")]
#[case("")]
#[case("EQUALS")]
fn test_unknown_operator(#[case] operator: &str) {
    assert!(matches!(
        evaluate(operator, &json!("a"), &json!("a")),
        Err(EvalError::UnknownOperator(_))
    ));
}

#[test]
fn test_error_messages() {
    assert_eq!(
        EvalError::UnknownOperator("between".to_string()).to_string(),
        "Unknown operator: between"
    );
    assert_eq!(
        EvalError::NotNumeric(Operator::LessThan).to_string(),
        "Cannot compare non-numeric values with less_than operator"
    );
}
