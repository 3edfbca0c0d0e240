//! Stream creation request validation.
//!
//! Works on untyped JSON so that every field can be checked independently and
//! all violations reported at once, instead of stopping at the first serde
//! error.

use serde::Serialize;
use serde_json::{Map, Value};

use super::CreateStreamInput;

/// Largest duration accepted from a JSON float. Integers beyond this lose
/// precision as `f64`.
const MAX_SAFE_FLOAT_INTEGER: f64 = 9_007_199_254_740_991.0;

// =============================================================================
// Violations
// =============================================================================

/// Kind of rule a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    /// Field missing or null.
    Required,
    /// Field present with the wrong JSON type.
    InvalidType,
    /// Empty string or non-positive number.
    TooSmall,
    /// String present but not in the expected format.
    InvalidFormat,
}

/// A single field-level violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Name of the offending field as it appears in the request.
    pub field: String,
    /// Violated rule.
    pub code: ViolationCode,
    /// Human-readable message.
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }
}

/// Validation failure carrying one violation per offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed with {} violation(s)", .violations.len())]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Create a validation error for a body that could not be read at all.
    #[must_use]
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation::new(
                "body",
                ViolationCode::InvalidType,
                message,
            )],
        }
    }

    /// Get the violations.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Consume the error and return its violations.
    #[must_use]
    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validate a stream creation request body.
///
/// # Errors
///
/// Returns `ValidationError` listing every violated field. Nothing is
/// accepted unless all fields pass.
pub fn validate_create_stream(body: &Value) -> Result<CreateStreamInput, ValidationError> {
    let Some(object) = body.as_object() else {
        return Err(ValidationError::malformed_body(
            "Request body must be a JSON object",
        ));
    };

    let mut violations = Vec::new();

    let sender = required_string(object, "sender", "Sender address", &mut violations);
    let recipient = required_string(object, "recipient", "Recipient address", &mut violations);
    let token_address =
        required_string(object, "tokenAddress", "Token address", &mut violations);
    let amount = digit_string(object, "amount", &mut violations);
    let duration_seconds = positive_integer(object, "duration", &mut violations);

    if let (
        Some(sender),
        Some(recipient),
        Some(token_address),
        Some(amount),
        Some(duration_seconds),
    ) = (sender, recipient, token_address, amount, duration_seconds)
    {
        return Ok(CreateStreamInput {
            sender,
            recipient,
            token_address,
            amount,
            duration_seconds,
        });
    }

    Err(ValidationError { violations })
}

fn present<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).filter(|value| !value.is_null())
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    label: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    let Some(value) = present(object, field) else {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::Required,
            format!("{label} is required"),
        ));
        return None;
    };

    let Some(text) = value.as_str() else {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::InvalidType,
            format!("{label} must be a string"),
        ));
        return None;
    };

    if text.is_empty() {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::TooSmall,
            format!("{label} is required"),
        ));
        return None;
    }

    Some(text.to_string())
}

fn digit_string(
    object: &Map<String, Value>,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    let Some(value) = present(object, field) else {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::Required,
            "Amount is required",
        ));
        return None;
    };

    let Some(text) = value.as_str() else {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::InvalidType,
            "Amount must be a string",
        ));
        return None;
    };

    // `^\d+$` over ASCII digits only
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::InvalidFormat,
            "Amount must be a positive integer string",
        ));
        return None;
    }

    Some(text.to_string())
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn positive_integer(
    object: &Map<String, Value>,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<u64> {
    let Some(value) = present(object, field) else {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::Required,
            "Duration is required",
        ));
        return None;
    };

    let Value::Number(number) = value else {
        violations.push(FieldViolation::new(
            field,
            ViolationCode::InvalidType,
            "Duration must be a number",
        ));
        return None;
    };

    let not_positive = || {
        FieldViolation::new(
            field,
            ViolationCode::TooSmall,
            "Duration must be a positive integer",
        )
    };
    let not_integer = || {
        FieldViolation::new(
            field,
            ViolationCode::InvalidType,
            "Duration must be an integer",
        )
    };

    if let Some(n) = number.as_u64() {
        if n == 0 {
            violations.push(not_positive());
            return None;
        }
        return Some(n);
    }

    if number.is_i64() {
        // Only negative integers reach this branch.
        violations.push(not_positive());
        return None;
    }

    let Some(f) = number.as_f64() else {
        violations.push(not_integer());
        return None;
    };

    if !f.is_finite() || f.trunc() != f {
        violations.push(not_integer());
        return None;
    }

    if f <= 0.0 {
        violations.push(not_positive());
        return None;
    }

    if f > MAX_SAFE_FLOAT_INTEGER {
        violations.push(not_integer());
        return None;
    }

    Some(f as u64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn valid_body() -> Value {
        json!({
            "sender": "S1",
            "recipient": "R1",
            "tokenAddress": "T1",
            "amount": "10000",
            "duration": 86400
        })
    }

    fn with_field(field: &str, value: Value) -> Value {
        let mut body = valid_body();
        body[field] = value;
        body
    }

    fn without_field(field: &str) -> Value {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove(field);
        body
    }

    fn codes_for(err: &ValidationError, field: &str) -> Vec<ViolationCode> {
        err.violations()
            .iter()
            .filter(|v| v.field == field)
            .map(|v| v.code)
            .collect()
    }

    #[test]
    fn accepts_valid_body() {
        let input = validate_create_stream(&valid_body()).unwrap();
        assert_eq!(input.sender, "S1");
        assert_eq!(input.recipient, "R1");
        assert_eq!(input.token_address, "T1");
        assert_eq!(input.amount, "10000");
        assert_eq!(input.duration_seconds, 86_400);
    }

    #[test]
    fn ignores_unknown_fields() {
        let body = with_field("memo", json!("hello"));
        assert!(validate_create_stream(&body).is_ok());
    }

    #[test]
    fn accepts_integral_float_duration() {
        let body = with_field("duration", json!(3600.0));
        let input = validate_create_stream(&body).unwrap();
        assert_eq!(input.duration_seconds, 3600);
    }

    #[test]
    fn keeps_amount_beyond_machine_precision() {
        let huge = "170141183460469231731687303715884105727";
        let body = with_field("amount", json!(huge));
        let input = validate_create_stream(&body).unwrap();
        assert_eq!(input.amount, huge);
    }

    #[test_case("sender" ; "sender")]
    #[test_case("recipient" ; "recipient")]
    #[test_case("tokenAddress" ; "token address")]
    #[test_case("amount" ; "amount")]
    #[test_case("duration" ; "duration")]
    fn missing_field_is_required(field: &str) {
        let err = validate_create_stream(&without_field(field)).unwrap_err();
        assert_eq!(codes_for(&err, field), vec![ViolationCode::Required]);
        assert_eq!(err.violations().len(), 1);
    }

    #[test_case("sender" ; "sender")]
    #[test_case("recipient" ; "recipient")]
    #[test_case("tokenAddress" ; "token address")]
    fn null_counts_as_missing(field: &str) {
        let err = validate_create_stream(&with_field(field, Value::Null)).unwrap_err();
        assert_eq!(codes_for(&err, field), vec![ViolationCode::Required]);
    }

    #[test_case("sender" ; "sender")]
    #[test_case("recipient" ; "recipient")]
    #[test_case("tokenAddress" ; "token address")]
    fn empty_string_is_too_small(field: &str) {
        let err = validate_create_stream(&with_field(field, json!(""))).unwrap_err();
        assert_eq!(codes_for(&err, field), vec![ViolationCode::TooSmall]);
    }

    #[test]
    fn non_string_address_is_invalid_type() {
        let err = validate_create_stream(&with_field("sender", json!(42))).unwrap_err();
        assert_eq!(codes_for(&err, "sender"), vec![ViolationCode::InvalidType]);
    }

    #[test_case(json!("-10") ; "negative")]
    #[test_case(json!("3.5") ; "decimal")]
    #[test_case(json!("abc") ; "alphabetic")]
    #[test_case(json!("") ; "empty")]
    #[test_case(json!(" 10") ; "leading space")]
    #[test_case(json!("١٢٣") ; "non ascii digits")]
    fn rejects_non_digit_amount(amount: Value) {
        let err = validate_create_stream(&with_field("amount", amount)).unwrap_err();
        assert_eq!(codes_for(&err, "amount"), vec![ViolationCode::InvalidFormat]);
    }

    #[test]
    fn rejects_numeric_amount() {
        let err = validate_create_stream(&with_field("amount", json!(100))).unwrap_err();
        assert_eq!(codes_for(&err, "amount"), vec![ViolationCode::InvalidType]);
    }

    #[test_case(json!(0), ViolationCode::TooSmall ; "zero")]
    #[test_case(json!(-5), ViolationCode::TooSmall ; "negative")]
    #[test_case(json!(-0.0), ViolationCode::TooSmall ; "negative zero")]
    #[test_case(json!(1.5), ViolationCode::InvalidType ; "fractional")]
    #[test_case(json!("86400"), ViolationCode::InvalidType ; "string")]
    #[test_case(json!(true), ViolationCode::InvalidType ; "boolean")]
    #[test_case(json!(1e300), ViolationCode::InvalidType ; "too large")]
    fn rejects_bad_duration(duration: Value, code: ViolationCode) {
        let err = validate_create_stream(&with_field("duration", duration)).unwrap_err();
        assert_eq!(codes_for(&err, "duration"), vec![code]);
    }

    #[test]
    fn reports_every_violated_field() {
        let err = validate_create_stream(&json!({ "amount": "x", "duration": 0 })).unwrap_err();
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["sender", "recipient", "tokenAddress", "amount", "duration"]
        );
    }

    #[test_case(json!([]) ; "array")]
    #[test_case(json!("text") ; "string")]
    #[test_case(Value::Null ; "null")]
    fn rejects_non_object_body(body: Value) {
        let err = validate_create_stream(&body).unwrap_err();
        assert_eq!(codes_for(&err, "body"), vec![ViolationCode::InvalidType]);
    }

    #[test]
    fn violation_serializes_snake_case_code() {
        let err = validate_create_stream(&without_field("amount")).unwrap_err();
        let json = serde_json::to_value(err.violations()).unwrap();
        assert_eq!(json[0]["field"], "amount");
        assert_eq!(json[0]["code"], "required");
        assert_eq!(json[0]["message"], "Amount is required");
    }

    #[test]
    fn error_display_counts_violations() {
        let err = validate_create_stream(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "validation failed with 5 violation(s)");
    }

    proptest! {
        #[test]
        fn digit_amounts_always_accepted(amount in "[0-9]{1,60}") {
            let body = with_field("amount", json!(amount.clone()));
            let input = validate_create_stream(&body).unwrap();
            prop_assert_eq!(input.amount, amount);
        }

        #[test]
        fn amounts_with_a_non_digit_always_rejected(
            prefix in "[0-9]{0,10}",
            bad in "[^0-9]",
            suffix in "[0-9]{0,10}",
        ) {
            let amount = format!("{prefix}{bad}{suffix}");
            let body = with_field("amount", json!(amount));
            prop_assert!(validate_create_stream(&body).is_err());
        }

        #[test]
        fn positive_durations_round_trip(duration in 1u64..=u64::MAX) {
            let body = with_field("duration", json!(duration));
            let input = validate_create_stream(&body).unwrap();
            prop_assert_eq!(input.duration_seconds, duration);
        }

        #[test]
        fn non_positive_durations_rejected(duration in i64::MIN..=0i64) {
            let body = with_field("duration", json!(duration));
            prop_assert!(validate_create_stream(&body).is_err());
        }
    }
}
