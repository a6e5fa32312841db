// tests/function_tests.rs

use chrono::{TimeZone, Utc};
use pipeform::{Engine, ErrorKind, EvalContext, EvalError, Record, Value};

fn context() -> EvalContext {
    let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 20, 30).unwrap();
    EvalContext::new().with_now(now)
}

fn call(formula: &str) -> Value {
    let result = Engine::new().evaluate_formula(formula, None, &context());
    assert!(result.is_ok(), "{} failed: {:?}", formula, result.error);
    result.value
}

fn call_with(formula: &str, record: Record) -> Value {
    let result = Engine::new().evaluate_formula(formula, Some(record), &context());
    assert!(result.is_ok(), "{} failed: {:?}", formula, result.error);
    result.value
}

fn call_err(formula: &str) -> EvalError {
    Engine::new()
        .evaluate_formula(formula, None, &context())
        .error
        .unwrap_or_else(|| panic!("{} should fail", formula))
}

fn list(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::from(*s)).collect())
}

// ============================================================================
// Text
// ============================================================================

#[test]
fn test_concatenate() {
    assert_eq!(call(r#"CONCATENATE("a", 1, true)"#), Value::from("a1true"));
    assert_eq!(call(r#"CONCAT("x", BLANK(), "y")"#), Value::from("xy"));
}

#[test]
fn test_left_right_mid() {
    assert_eq!(call(r#"LEFT("abcdef", 2)"#), Value::from("ab"));
    assert_eq!(call(r#"LEFT("abcdef")"#), Value::from("a"));
    assert_eq!(call(r#"RIGHT("abcdef", 3)"#), Value::from("def"));
    assert_eq!(call(r#"RIGHT("ab", 10)"#), Value::from("ab"));
    assert_eq!(call(r#"MID("abcdef", 2, 3)"#), Value::from("bcd"));
}

#[test]
fn test_negative_count_is_invalid() {
    assert!(matches!(call_err(r#"LEFT("abc", -1)"#), EvalError::InvalidArgument(_)));
}

#[test]
fn test_len_lower_upper_trim() {
    assert_eq!(call(r#"LEN("héllo")"#), Value::Integer(5));
    assert_eq!(call(r#"LOWER("MiXeD")"#), Value::from("mixed"));
    assert_eq!(call(r#"upper("MiXeD")"#), Value::from("MIXED"));
    assert_eq!(call(r#"TRIM("  padded  ")"#), Value::from("padded"));
}

#[test]
fn test_len_of_array_field() {
    let record = Record::new("r1").with_field("Tags", list(&["a", "b", "c"]));
    assert_eq!(call_with("LEN({Tags})", record), Value::Integer(3));
}

// ============================================================================
// Numeric
// ============================================================================

#[test]
fn test_sum_average_min_max() {
    assert_eq!(call("SUM(1, 2, 3)"), Value::Integer(6));
    assert_eq!(call("SUM(1, 2.5)"), Value::Float(3.5));
    assert_eq!(call("AVERAGE(1, 2)"), Value::Float(1.5));
    assert_eq!(call("AVG(2, 4)"), Value::Integer(3));
    assert_eq!(call("MIN(3, 1, 2)"), Value::Integer(1));
    assert_eq!(call("MAX(3, 1, 2)"), Value::Integer(3));
    assert_eq!(call("MAX()"), Value::Null);
    assert_eq!(call("SUM()"), Value::Integer(0));
}

#[test]
fn test_numeric_functions_flatten_arrays() {
    let record = Record::new("r1").with_field(
        "Scores",
        Value::Array(vec![Value::Integer(4), Value::Integer(6), Value::from("n/a")]),
    );
    assert_eq!(call_with("SUM({Scores})", record.clone()), Value::Integer(10));
    assert_eq!(call_with("COUNT({Scores})", record), Value::Integer(2));
}

#[test]
fn test_count_counts_numbers_only() {
    assert_eq!(call(r#"COUNT(1, "x", 2, BLANK())"#), Value::Integer(2));
}

#[test]
fn test_round() {
    assert_eq!(call("ROUND(2.5)"), Value::Integer(3));
    assert_eq!(call("ROUND(-2.5)"), Value::Integer(-3));
    assert_eq!(call("ROUND(3.14159, 2)"), Value::Float(3.14));
    assert_eq!(call("ROUND(1234, -2)"), Value::Integer(1200));
}

#[test]
fn test_abs_floor_ceil() {
    assert_eq!(call("ABS(-7)"), Value::Integer(7));
    assert_eq!(call("ABS(-1.5)"), Value::Float(1.5));
    assert_eq!(call("FLOOR(2.7)"), Value::Integer(2));
    assert_eq!(call("CEIL(2.1)"), Value::Integer(3));
    assert_eq!(call("CEILING(-2.1)"), Value::Integer(-2));
}

#[test]
fn test_sqrt_and_power() {
    assert_eq!(call("SQRT(16)"), Value::Integer(4));
    assert_eq!(call("POWER(2, 3)"), Value::Integer(8));
    assert_eq!(call("POWER(4, 0.5)"), Value::Float(2.0));
    assert!(matches!(call_err("SQRT(-1)"), EvalError::InvalidArgument(_)));
}

#[test]
fn test_non_numeric_argument() {
    let err = call_err(r#"ABS("abc")"#);
    assert!(matches!(err, EvalError::InvalidArgument(_)));
    assert_eq!(err.kind(), ErrorKind::DomainError);
}

// ============================================================================
// Logical
// ============================================================================

#[test]
fn test_if() {
    assert_eq!(call(r#"IF(1 > 0, "yes", "no")"#), Value::from("yes"));
    assert_eq!(call(r#"IF("", "yes", "no")"#), Value::from("no"));
    assert_eq!(call(r#"IF(false, "yes")"#), Value::Null);
    assert!(matches!(call_err("IF(true)"), EvalError::InvalidArgument(_)));
}

#[test]
fn test_and_or_not() {
    assert_eq!(call("AND(true, 1, \"x\")"), Value::Boolean(true));
    assert_eq!(call("AND(true, 0)"), Value::Boolean(false));
    assert_eq!(call("OR(false, 0, \"\")"), Value::Boolean(false));
    assert_eq!(call("OR(false, 2)"), Value::Boolean(true));
    assert_eq!(call("NOT(BLANK())"), Value::Boolean(true));
}

#[test]
fn test_switch() {
    let formula = r#"SWITCH({Status}, "open", 1, "closed", 2, 0)"#;
    assert_eq!(
        call_with(formula, Record::new("a").with_field("Status", "closed")),
        Value::Integer(2)
    );
    assert_eq!(
        call_with(formula, Record::new("b").with_field("Status", "archived")),
        Value::Integer(0)
    );
    assert_eq!(call(r#"SWITCH(3, 1, "one", 3, "three")"#), Value::from("three"));
    assert_eq!(call(r#"SWITCH(9, 1, "one")"#), Value::Null);
}

// ============================================================================
// Dates
// ============================================================================

#[test]
fn test_now_and_today_use_the_context_clock() {
    assert_eq!(call("NOW()"), Value::from("2024-03-05T10:20:30Z"));
    assert_eq!(call("TODAY()"), Value::from("2024-03-05"));
}

#[test]
fn test_date_parts() {
    assert_eq!(call(r#"YEAR("2024-07-09")"#), Value::Integer(2024));
    assert_eq!(call(r#"MONTH("2024-07-09T08:05:03Z")"#), Value::Integer(7));
    assert_eq!(call(r#"DAY("2024-07-09 08:05:03")"#), Value::Integer(9));
    assert_eq!(call("YEAR(0)"), Value::Integer(1970));
    assert_eq!(call("YEAR(BLANK())"), Value::Null);
}

#[test]
fn test_datetime_format() {
    assert_eq!(
        call(r#"DATETIME_FORMAT("2024-07-09 08:05:03", "DD/MM/YYYY HH:mm:ss")"#),
        Value::from("09/07/2024 08:05:03")
    );
    assert_eq!(call(r#"DATETIME_FORMAT("2024-07-09T08:05:03")"#), Value::from("2024-07-09"));
    assert_eq!(call(r#"DATETIME_FORMAT(NOW(), "YYYY")"#), Value::from("2024"));
}

#[test]
fn test_datetime_parse_returns_its_argument() {
    assert_eq!(call(r#"DATETIME_PARSE("2024-07-09")"#), Value::from("2024-07-09"));
}

#[test]
fn test_invalid_date() {
    let err = call_err(r#"YEAR("someday")"#);
    assert_eq!(err, EvalError::InvalidDate("someday".to_string()));
    assert_eq!(err.kind(), ErrorKind::DomainError);
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_array_functions() {
    let record = Record::new("r1")
        .with_field("Tags", list(&["b", "a", "b"]))
        .with_field(
            "Sparse",
            Value::Array(vec![Value::from("x"), Value::Null, Value::from(""), Value::from("y")]),
        );

    assert_eq!(call_with("ARRAYUNIQUE({Tags})", record.clone()), list(&["b", "a"]));
    assert_eq!(call_with("ARRAYCOMPACT({Sparse})", record.clone()), list(&["x", "y"]));
    assert_eq!(call_with("ARRAYJOIN({Tags})", record.clone()), Value::from("b, a, b"));
    assert_eq!(call_with(r#"ARRAYJOIN({Tags}, "|")"#, record), Value::from("b|a|b"));
}

// ============================================================================
// Control
// ============================================================================

#[test]
fn test_coalesce_and_blank() {
    let record = Record::new("r1")
        .with_field("A", Value::Null)
        .with_field("B", "");
    assert_eq!(call_with(r#"COALESCE({A}, {B}, "fallback")"#, record), Value::from("fallback"));
    assert_eq!(call("BLANK()"), Value::Null);
    assert_eq!(call("COALESCE()"), Value::Null);
}

#[test]
fn test_error_function() {
    assert_eq!(call_err(r#"ERROR("bad input")"#), EvalError::Function("bad input".to_string()));
    assert_eq!(call_err("ERROR()").to_string(), "ERROR() called");
}

#[test]
fn test_record_id() {
    assert_eq!(call_with("RECORD_ID()", Record::new("rec42")), Value::from("rec42"));
    assert_eq!(call("RECORD_ID()"), Value::Null);
}
