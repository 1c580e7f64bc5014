use crate::core::resolver::{FieldResolver, RecordView, Resolution};
use crate::domain::model::{Condition, Operator, Record};
use serde_json::Value;

impl Operator {
    /// `None` for an operator this engine does not know.
    pub fn compare(&self, lhs: f64, rhs: f64) -> Option<bool> {
        Some(match self {
            Operator::Gt => lhs > rhs,
            Operator::Gte => lhs >= rhs,
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
            Operator::Lt => lhs < rhs,
            Operator::Lte => lhs <= rhs,
            Operator::Unknown(_) => return None,
        })
    }
}

/// Numeric view of a resolved value. Only numbers and numeric strings qualify.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_finite(s),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Returns the resolved value when the condition holds.
///
/// Every failure (unresolved field, non-numeric input on either side, unknown
/// operator) reads as "not met".
pub fn matching_value(
    resolver: &FieldResolver,
    view: &RecordView<'_>,
    condition: &Condition,
) -> Option<Resolution> {
    let resolved = resolver.resolve_in(view, &condition.field)?;
    let target = parse_finite(&condition.value)?;
    let actual = coerce_number(&resolved.value)?;

    match condition.operator.compare(actual, target) {
        Some(true) => Some(resolved),
        Some(false) => None,
        None => {
            tracing::debug!(
                "Unknown operator '{}' on field '{}'",
                condition.operator,
                condition.field
            );
            None
        }
    }
}

pub fn evaluate_in(resolver: &FieldResolver, view: &RecordView<'_>, condition: &Condition) -> bool {
    matching_value(resolver, view, condition).is_some()
}

/// Evaluates `condition` against `record` with the default resolver.
pub fn evaluate(condition: &Condition, record: &Record) -> bool {
    let resolver = FieldResolver::new();
    evaluate_in(&resolver, &resolver.view(record), condition)
}
