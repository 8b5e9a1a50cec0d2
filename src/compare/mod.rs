//! Drift comparison between desired and observed state
//!
//! [`compare_existing`] walks the resource's desired fields and compares
//! every key that also exists in the observed document. Keys present on
//! only one side are ignored on purpose: the observed document carries
//! server-populated data the user never specified, and a desired field the
//! server has not reported yet is not drift either.

pub mod normalize;

use crate::error::{Error, Result};
use self::normalize::{display_value, numbers_equal};
use serde_json::{Map, Value};

/// Why two documents were judged unequal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason {
    /// Human-readable summary naming the diverging field path.
    pub text: String,
    pub first_value: String,
    pub second_value: String,
}

/// Outcome of one comparison pass. Never retained across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    pub is_equal: bool,
    pub reason: Option<Reason>,
}

impl ComparisonResult {
    fn equal() -> Self {
        Self {
            is_equal: true,
            reason: None,
        }
    }

    fn diverged(path: &str, first: &Value, second: &Value) -> Self {
        Self {
            is_equal: false,
            reason: Some(Reason {
                text: format!("value mismatch at {path}"),
                first_value: display_value(first),
                second_value: display_value(second),
            }),
        }
    }
}

/// JSON kind label, used for mismatch errors.
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &[String]) -> String {
    path.join(".")
}

/// Compare the resource's desired fields against the observed API state.
///
/// Recurses through maps, compares arrays element-wise by index (order is
/// significant), and compares scalars with exact cross-representation
/// numeric equality. A kind mismatch between the two sides is an error,
/// never a silent "different". The first divergence short-circuits.
pub fn compare_existing(
    desired: &Map<String, Value>,
    observed: &Map<String, Value>,
) -> Result<ComparisonResult> {
    compare_maps(desired, observed, &mut Vec::new())
}

fn compare_maps(
    desired: &Map<String, Value>,
    observed: &Map<String, Value>,
    path: &mut Vec<String>,
) -> Result<ComparisonResult> {
    for (key, desired_value) in desired {
        let Some(observed_value) = observed.get(key) else {
            continue;
        };
        path.push(key.clone());
        let result = compare_values(desired_value, observed_value, path)?;
        path.pop();
        if !result.is_equal {
            return Ok(result);
        }
    }
    Ok(ComparisonResult::equal())
}

fn compare_values(
    desired: &Value,
    observed: &Value,
    path: &mut Vec<String>,
) -> Result<ComparisonResult> {
    match (desired, observed) {
        (Value::Object(d), Value::Object(o)) => compare_maps(d, o, path),
        (Value::Array(d), Value::Array(o)) => {
            if d.len() != o.len() {
                return Ok(ComparisonResult::diverged(&join(path), desired, observed));
            }
            for (index, (dv, ov)) in d.iter().zip(o).enumerate() {
                path.push(index.to_string());
                let result = compare_values(dv, ov, path)?;
                path.pop();
                if !result.is_equal {
                    return Ok(result);
                }
            }
            Ok(ComparisonResult::equal())
        }
        (Value::Number(d), Value::Number(o)) => {
            if numbers_equal(d, o) {
                Ok(ComparisonResult::equal())
            } else {
                Ok(ComparisonResult::diverged(&join(path), desired, observed))
            }
        }
        (Value::String(d), Value::String(o)) => {
            if d == o {
                Ok(ComparisonResult::equal())
            } else {
                Ok(ComparisonResult::diverged(&join(path), desired, observed))
            }
        }
        (Value::Bool(d), Value::Bool(o)) => {
            if d == o {
                Ok(ComparisonResult::equal())
            } else {
                Ok(ComparisonResult::diverged(&join(path), desired, observed))
            }
        }
        (Value::Null, Value::Null) => Ok(ComparisonResult::equal()),
        _ => Err(Error::TypeMismatch {
            path: join(path),
            first: format!("{} {}", kind(desired), display_value(desired)),
            second: format!("{} {}", kind(observed), display_value(observed)),
        }),
    }
}

/// Type-aware equality for the matching engine: same scalar rules as the
/// comparator, but a kind mismatch is simply "not equal". Composite values
/// fall back to structural equality, where array order matters.
pub(crate) fn loose_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn equal_when_all_shared_keys_agree() {
        let desired = map(json!({"name": "db", "size": 5}));
        let observed = map(json!({"name": "db", "size": 5.0, "serverField": "x"}));
        let result = compare_existing(&desired, &observed).unwrap();
        assert!(result.is_equal);
        assert!(result.reason.is_none());
    }

    #[test]
    fn extra_and_missing_keys_are_not_drift() {
        let desired = map(json!({"name": "db", "notYetReported": true}));
        let observed = map(json!({"name": "db", "uid": "abc-123"}));
        assert!(compare_existing(&desired, &observed).unwrap().is_equal);
    }

    #[test]
    fn first_mismatch_carries_a_structured_reason() {
        let desired = map(json!({"spec": {"replicas": 3}}));
        let observed = map(json!({"spec": {"replicas": 2}}));
        let result = compare_existing(&desired, &observed).unwrap();
        assert!(!result.is_equal);
        let reason = result.reason.unwrap();
        assert_eq!(reason.text, "value mismatch at spec.replicas");
        assert_eq!(reason.first_value, "3");
        assert_eq!(reason.second_value, "2");
    }

    #[test]
    fn integer_vs_string_is_an_error_not_inequality() {
        let desired = map(json!({"id": 5}));
        let observed = map(json!({"id": "5"}));
        assert!(matches!(
            compare_existing(&desired, &observed),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn fractional_floats_do_not_collapse_to_integers() {
        let desired = map(json!({"limit": 42}));
        let observed = map(json!({"limit": 42.9}));
        let result = compare_existing(&desired, &observed).unwrap();
        assert!(!result.is_equal);
    }

    #[test]
    fn arrays_compare_by_index_and_length() {
        let desired = map(json!({"tags": ["a", "b"]}));
        let same = map(json!({"tags": ["a", "b"]}));
        assert!(compare_existing(&desired, &same).unwrap().is_equal);

        let reordered = map(json!({"tags": ["b", "a"]}));
        assert!(!compare_existing(&desired, &reordered).unwrap().is_equal);

        let shorter = map(json!({"tags": ["a"]}));
        let result = compare_existing(&desired, &shorter).unwrap();
        assert!(!result.is_equal);
        assert!(result.reason.is_some());
    }

    #[test]
    fn array_element_kind_mismatch_is_an_error() {
        let desired = map(json!({"tags": ["a"]}));
        let observed = map(json!({"tags": [1]}));
        assert!(compare_existing(&desired, &observed).is_err());
    }

    #[test]
    fn nested_maps_recurse() {
        let desired = map(json!({"metadata": {"labels": {"app": "web"}}}));
        let observed = map(json!({"metadata": {"labels": {"app": "api"}, "uid": "u"}}));
        let result = compare_existing(&desired, &observed).unwrap();
        assert!(!result.is_equal);
        assert_eq!(
            result.reason.unwrap().text,
            "value mismatch at metadata.labels.app"
        );
    }
}
