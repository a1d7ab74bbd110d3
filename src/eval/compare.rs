use serde::{Deserialize, Serialize};
use serde_json::json;
use strum_macros::{Display, EnumString};

use crate::config::POSSIBLY_INCORRECT_MARKER;
use crate::eval::parse::CallRecord;
use crate::registry::{FunctionRegistry, Parameter};

/// Closed taxonomy of per-sample discrepancies. The wire strings are what
/// the metrics file records under `error_type`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    #[strum(serialize = "hallucinated_function")]
    #[serde(rename = "hallucinated_function")]
    HallucinatedFunction,
    #[strum(serialize = "invalid_function")]
    #[serde(rename = "invalid_function")]
    InvalidFunction,
    #[strum(serialize = "missing_parameter")]
    #[serde(rename = "missing_parameter")]
    MissingParameter,
    #[strum(serialize = "incorrect_parameter_value")]
    #[serde(rename = "incorrect_parameter_value")]
    IncorrectParameterValue,
    #[strum(serialize = "hallucinated_parameter_value")]
    #[serde(rename = "hallucinated_parameter_value")]
    HallucinatedParameterValue,
    #[strum(serialize = "hallucinated_parameter")]
    #[serde(rename = "hallucinated_parameter")]
    HallucinatedParameter,
    #[strum(serialize = "incorrect_parameter_type_array")]
    #[serde(rename = "incorrect_parameter_type_array")]
    IncorrectParameterTypeArray,
    #[strum(serialize = "incorrect_array_element")]
    #[serde(rename = "incorrect_array_element")]
    IncorrectArrayElement,
    #[strum(serialize = "hallucinated_array_element")]
    #[serde(rename = "hallucinated_array_element")]
    HallucinatedArrayElement,
    #[strum(serialize = "missing_array_element")]
    #[serde(rename = "missing_array_element")]
    MissingArrayElement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    #[serde(rename = "error_type")]
    pub kind: ErrorKind,
    pub key: Option<String>,
    #[serde(rename = "gt_value")]
    pub ground_truth_value: Option<serde_json::Value>,
    #[serde(rename = "pred_value")]
    pub predicted_value: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct Comparison {
    pub function_matched: bool,
    pub arguments_matched: bool,
    pub discrepancies: Vec<Discrepancy>,
}

impl Comparison {
    pub fn matched(&self) -> bool {
        self.function_matched && self.arguments_matched
    }
}

/// Compare a predicted call against its ground truth.
///
/// Function names must match exactly, except that two names both carrying
/// the possibly-incorrect marker are treated as matched. A mismatched name
/// short-circuits argument comparison entirely. Once names match, every
/// discrepancy in the argument maps is collected; nothing short-circuits.
///
/// The ground-truth function name must resolve in the registry (directly or
/// through the possibly-incorrect marker); anything else panics, since the
/// registry is the closed source of truth for labels.
pub fn compare_calls(
    registry: &FunctionRegistry,
    ground_truth: &CallRecord,
    predicted: &CallRecord,
) -> Comparison {
    let names_match = ground_truth.function_name == predicted.function_name
        || both_possibly_incorrect(&ground_truth.function_name, &predicted.function_name);

    if !names_match {
        let kind = if registry.contains(&predicted.function_name) {
            ErrorKind::InvalidFunction
        } else {
            ErrorKind::HallucinatedFunction
        };
        return Comparison {
            function_matched: false,
            arguments_matched: false,
            discrepancies: vec![Discrepancy {
                kind,
                key: None,
                ground_truth_value: Some(json!(ground_truth.function_name)),
                predicted_value: Some(json!(predicted.function_name)),
            }],
        };
    }

    let discrepancies = compare_arguments(registry, ground_truth, predicted);
    Comparison {
        function_matched: true,
        arguments_matched: discrepancies.is_empty(),
        discrepancies,
    }
}

fn both_possibly_incorrect(ground_truth_name: &str, predicted_name: &str) -> bool {
    ground_truth_name
        .to_lowercase()
        .contains(POSSIBLY_INCORRECT_MARKER)
        && predicted_name
            .to_lowercase()
            .contains(POSSIBLY_INCORRECT_MARKER)
}

fn compare_arguments(
    registry: &FunctionRegistry,
    ground_truth: &CallRecord,
    predicted: &CallRecord,
) -> Vec<Discrepancy> {
    if ground_truth.arguments == predicted.arguments {
        return Vec::new();
    }

    let schema = registry.ground_truth_schema(&ground_truth.function_name);
    let mut discrepancies = Vec::new();

    // Ground-truth keys first, in declared parameter order; any label key
    // outside the schema trails in insertion order.
    let mut ordered_keys: Vec<&String> = schema
        .parameters
        .keys()
        .filter(|key| ground_truth.arguments.contains_key(*key))
        .collect();
    for key in ground_truth.arguments.keys() {
        if !schema.parameters.contains_key(key) {
            ordered_keys.push(key);
        }
    }

    for key in ordered_keys {
        let gt_value = &ground_truth.arguments[key];
        match predicted.arguments.get(key) {
            None => discrepancies.push(Discrepancy {
                kind: ErrorKind::MissingParameter,
                key: Some(key.clone()),
                ground_truth_value: Some(gt_value.clone()),
                predicted_value: None,
            }),
            Some(pred_value) if !values_equal(gt_value, pred_value) => {
                classify_value_mismatch(
                    schema.parameters.get(key),
                    key,
                    gt_value,
                    pred_value,
                    &mut discrepancies,
                );
            }
            Some(_) => {}
        }
    }

    for (key, pred_value) in predicted.arguments.iter() {
        if !ground_truth.arguments.contains_key(key) {
            discrepancies.push(Discrepancy {
                kind: ErrorKind::HallucinatedParameter,
                key: Some(key.clone()),
                ground_truth_value: None,
                predicted_value: Some(pred_value.clone()),
            });
        }
    }

    discrepancies
}

fn classify_value_mismatch(
    parameter: Option<&Parameter>,
    key: &str,
    gt_value: &serde_json::Value,
    pred_value: &serde_json::Value,
    discrepancies: &mut Vec<Discrepancy>,
) {
    let is_array = parameter.map(|p| p.ty.is_array()).unwrap_or(false);
    if !is_array {
        let kind = if violates_enum(parameter, pred_value) {
            ErrorKind::HallucinatedParameterValue
        } else {
            ErrorKind::IncorrectParameterValue
        };
        discrepancies.push(Discrepancy {
            kind,
            key: Some(key.to_string()),
            ground_truth_value: Some(gt_value.clone()),
            predicted_value: Some(pred_value.clone()),
        });
        return;
    }

    let gt_items = gt_value
        .as_array()
        .cloned()
        .unwrap_or_else(|| vec![gt_value.clone()]);

    let Some(pred_items) = pred_value.as_array() else {
        discrepancies.push(Discrepancy {
            kind: ErrorKind::IncorrectParameterTypeArray,
            key: Some(key.to_string()),
            ground_truth_value: gt_items.first().cloned(),
            predicted_value: Some(pred_value.clone()),
        });
        return;
    };

    // Sorted copies; element comparison is order-insensitive and the
    // reported sequences are deterministic.
    let gt_sorted = sorted_values(&gt_items);
    let pred_sorted = sorted_values(pred_items);

    for pred_item in pred_sorted.iter() {
        if !gt_sorted.iter().any(|gt_item| values_equal(gt_item, pred_item)) {
            let kind = if violates_enum(parameter, pred_item) {
                ErrorKind::HallucinatedArrayElement
            } else {
                ErrorKind::IncorrectArrayElement
            };
            discrepancies.push(Discrepancy {
                kind,
                key: Some(key.to_string()),
                ground_truth_value: Some(serde_json::Value::Array(gt_sorted.clone())),
                predicted_value: Some(serde_json::Value::Array(pred_sorted.clone())),
            });
        }
    }

    for gt_item in gt_sorted.iter() {
        if !pred_sorted.iter().any(|pred_item| values_equal(pred_item, gt_item)) {
            discrepancies.push(Discrepancy {
                kind: ErrorKind::MissingArrayElement,
                key: Some(key.to_string()),
                ground_truth_value: Some(serde_json::Value::Array(gt_sorted.clone())),
                predicted_value: Some(serde_json::Value::Array(pred_sorted.clone())),
            });
        }
    }
}

fn violates_enum(parameter: Option<&Parameter>, value: &serde_json::Value) -> bool {
    let Some(allowed) = parameter.and_then(|p| p.r#enum.as_ref()) else {
        return false;
    };
    !allowed.iter().any(|candidate| values_equal(candidate, value))
}

/// Structural equality with a small tolerance on numbers, so an integer
/// label equals a float prediction of the same magnitude.
pub fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a, b) {
        (serde_json::Value::Number(n1), serde_json::Value::Number(n2)) => {
            match (n1.as_f64(), n2.as_f64()) {
                (Some(f1), Some(f2)) => (f1 - f2).abs() < 1e-4,
                _ => n1 == n2,
            }
        }
        (serde_json::Value::Array(a1), serde_json::Value::Array(a2)) => {
            a1.len() == a2.len()
                && a1.iter().zip(a2.iter()).all(|(v1, v2)| values_equal(v1, v2))
        }
        (serde_json::Value::Object(m1), serde_json::Value::Object(m2)) => {
            m1.len() == m2.len()
                && m1.iter().all(|(k, v1)| {
                    m2.get(k).map(|v2| values_equal(v1, v2)).unwrap_or(false)
                })
        }
        _ => a == b,
    }
}

fn sorted_values(values: &[serde_json::Value]) -> Vec<serde_json::Value> {
    let mut copy = values.to_vec();
    copy.sort_by_cached_key(|value| value.to_string());
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::car_functions;
    use indexmap::IndexMap;
    use serde_json::json;

    fn call(name: &str, args: &[(&str, serde_json::Value)]) -> CallRecord {
        CallRecord {
            function_name: name.to_string(),
            arguments: args
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<IndexMap<_, _>>(),
        }
    }

    #[test]
    fn identical_calls_match_with_no_discrepancies() {
        let registry = car_functions();
        for def in registry.iter() {
            let record = call(&def.name, &[("position", json!("forward"))]);
            let result = compare_calls(registry, &record, &record.clone());
            assert!(result.matched(), "self-compare failed for {}", def.name);
            assert!(result.discrepancies.is_empty());
        }
    }

    #[test]
    fn unknown_predicted_function_is_hallucinated() {
        let registry = car_functions();
        let gt = call("lock_doors", &[("lock", json!("lock"))]);
        let pred = call("fly_to_moon", &[("lock", json!("lock"))]);
        let result = compare_calls(registry, &gt, &pred);
        assert!(!result.function_matched);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].kind, ErrorKind::HallucinatedFunction);
        assert_eq!(result.discrepancies[0].key, None);
    }

    #[test]
    fn registered_but_wrong_function_is_invalid() {
        let registry = car_functions();
        let gt = call("lock_doors", &[("lock", json!("lock"))]);
        let pred = call("start_engine", &[]);
        let result = compare_calls(registry, &gt, &pred);
        assert!(!result.function_matched);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].kind, ErrorKind::InvalidFunction);
    }

    #[test]
    fn possibly_incorrect_names_are_treated_as_matched() {
        let registry = car_functions();
        let gt = call("POSSIBLY_INCORRECT_adjust_seat", &[]);
        let pred = call("possibly_incorrect_adjust_seat", &[]);
        let result = compare_calls(registry, &gt, &pred);
        assert!(result.function_matched);
        assert!(result.matched());
    }

    #[test]
    fn possibly_incorrect_names_still_compare_arguments() {
        let registry = car_functions();
        let gt = call("POSSIBLY_INCORRECT_adjust_seat", &[]);
        let pred = call(
            "POSSIBLY_INCORRECT_adjust_seat",
            &[("position", json!("up"))],
        );
        let result = compare_calls(registry, &gt, &pred);
        assert!(result.function_matched);
        assert!(!result.arguments_matched);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(
            result.discrepancies[0].kind,
            ErrorKind::HallucinatedParameter
        );
    }

    #[test]
    fn missing_parameter_is_reported_once_and_only_as_missing() {
        let registry = car_functions();
        let gt = call(
            "adjust_temperature",
            &[("temperature", json!(22)), ("zone", json!("rear"))],
        );
        let pred = call("adjust_temperature", &[("temperature", json!(22))]);
        let result = compare_calls(registry, &gt, &pred);
        assert!(!result.matched());
        assert_eq!(result.discrepancies.len(), 1);
        let d = &result.discrepancies[0];
        assert_eq!(d.kind, ErrorKind::MissingParameter);
        assert_eq!(d.key.as_deref(), Some("zone"));
        assert_eq!(d.predicted_value, None);
    }

    #[test]
    fn enum_violation_takes_precedence_over_incorrect_value() {
        let registry = car_functions();
        let gt = call("toggle_headlights", &[("state", json!("on"))]);
        let pred = call("toggle_headlights", &[("state", json!("maybe"))]);
        let result = compare_calls(registry, &gt, &pred);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(
            result.discrepancies[0].kind,
            ErrorKind::HallucinatedParameterValue
        );
    }

    #[test]
    fn in_enum_wrong_value_is_incorrect() {
        let registry = car_functions();
        let gt = call("toggle_headlights", &[("state", json!("on"))]);
        let pred = call("toggle_headlights", &[("state", json!("off"))]);
        let result = compare_calls(registry, &gt, &pred);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(
            result.discrepancies[0].kind,
            ErrorKind::IncorrectParameterValue
        );
    }

    #[test]
    fn unconstrained_wrong_value_is_incorrect() {
        let registry = car_functions();
        let gt = call("adjust_seat", &[("position", json!("forward"))]);
        let pred = call("adjust_seat", &[("position", json!("sideways"))]);
        let result = compare_calls(registry, &gt, &pred);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(
            result.discrepancies[0].kind,
            ErrorKind::IncorrectParameterValue
        );
    }

    #[test]
    fn hallucinated_parameter_is_reported_after_ground_truth_keys() {
        let registry = car_functions();
        let gt = call("adjust_seat", &[("position", json!("up"))]);
        let pred = call(
            "adjust_seat",
            &[("position", json!("down")), ("speed", json!(3))],
        );
        let result = compare_calls(registry, &gt, &pred);
        assert_eq!(result.discrepancies.len(), 2);
        assert_eq!(
            result.discrepancies[0].kind,
            ErrorKind::IncorrectParameterValue
        );
        assert_eq!(result.discrepancies[1].kind, ErrorKind::HallucinatedParameter);
        assert_eq!(result.discrepancies[1].key.as_deref(), Some("speed"));
    }

    #[test]
    fn array_order_is_insensitive() {
        let registry = car_functions();
        let gt = call(
            "adjust_fan_speed",
            &[("area", json!(["rear-left", "rear-right"]))],
        );
        let pred = call(
            "adjust_fan_speed",
            &[("area", json!(["rear-right", "rear-left"]))],
        );
        let result = compare_calls(registry, &gt, &pred);
        assert!(result.matched());
        assert!(result.discrepancies.is_empty());
    }

    #[test]
    fn non_sequence_prediction_for_array_parameter() {
        let registry = car_functions();
        let gt = call(
            "adjust_fan_speed",
            &[("area", json!(["rear-left", "rear-right"]))],
        );
        let pred = call("adjust_fan_speed", &[("area", json!("rear-left"))]);
        let result = compare_calls(registry, &gt, &pred);
        assert_eq!(result.discrepancies.len(), 1);
        let d = &result.discrepancies[0];
        assert_eq!(d.kind, ErrorKind::IncorrectParameterTypeArray);
        assert_eq!(d.ground_truth_value, Some(json!("rear-left")));
        assert_eq!(d.predicted_value, Some(json!("rear-left")));
    }

    #[test]
    fn array_element_outside_enum_is_hallucinated() {
        let registry = car_functions();
        let gt = call("adjust_fan_speed", &[("area", json!(["rear-left"]))]);
        let pred = call("adjust_fan_speed", &[("area", json!(["trunk"]))]);
        let result = compare_calls(registry, &gt, &pred);
        let kinds: Vec<ErrorKind> = result.discrepancies.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::HallucinatedArrayElement,
                ErrorKind::MissingArrayElement
            ]
        );
    }

    #[test]
    fn array_element_inside_enum_is_incorrect() {
        let registry = car_functions();
        let gt = call("adjust_fan_speed", &[("area", json!(["rear-left"]))]);
        let pred = call("adjust_fan_speed", &[("area", json!(["rear-right"]))]);
        let result = compare_calls(registry, &gt, &pred);
        let kinds: Vec<ErrorKind> = result.discrepancies.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::IncorrectArrayElement,
                ErrorKind::MissingArrayElement
            ]
        );
    }

    #[test]
    fn missing_array_element_reports_full_sequences() {
        let registry = car_functions();
        let gt = call(
            "check_tire_pressure",
            &[("tire", json!(["front_left", "front_right"]))],
        );
        let pred = call("check_tire_pressure", &[("tire", json!(["front_left"]))]);
        let result = compare_calls(registry, &gt, &pred);
        assert_eq!(result.discrepancies.len(), 1);
        let d = &result.discrepancies[0];
        assert_eq!(d.kind, ErrorKind::MissingArrayElement);
        assert_eq!(
            d.ground_truth_value,
            Some(json!(["front_left", "front_right"]))
        );
        assert_eq!(d.predicted_value, Some(json!(["front_left"])));
    }

    #[test]
    fn integer_and_float_of_same_magnitude_are_equal() {
        let registry = car_functions();
        let gt = call("adjust_temperature", &[("temperature", json!(14))]);
        let pred = call("adjust_temperature", &[("temperature", json!(14.0))]);
        let result = compare_calls(registry, &gt, &pred);
        assert!(result.matched());
    }

    #[test]
    fn all_discrepancies_are_collected_not_short_circuited() {
        let registry = car_functions();
        let gt = call(
            "adjust_temperature",
            &[("temperature", json!(22)), ("zone", json!("rear"))],
        );
        let pred = call(
            "adjust_temperature",
            &[("temperature", json!(30)), ("extra", json!(true))],
        );
        let result = compare_calls(registry, &gt, &pred);
        let kinds: Vec<ErrorKind> = result.discrepancies.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::IncorrectParameterValue,
                ErrorKind::MissingParameter,
                ErrorKind::HallucinatedParameter,
            ]
        );
    }

    #[test]
    fn error_kind_wire_strings_are_snake_case() {
        assert_eq!(
            serde_json::to_value(ErrorKind::HallucinatedFunction).unwrap(),
            json!("hallucinated_function")
        );
        assert_eq!(ErrorKind::MissingArrayElement.to_string(), "missing_array_element");
    }
}
