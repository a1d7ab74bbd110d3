use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GT_UNPARSABLE_KEY, PRED_UNPARSABLE_KEY};
use crate::eval::compare::{compare_calls, Discrepancy};
use crate::eval::file_models::ResultRecord;
use crate::eval::parse::{parse_transcript, DecodeArgs, LegacyPyArgs};
use crate::registry::FunctionRegistry;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleResult {
    #[serde(rename = "gt")]
    pub ground_truth_text: String,
    #[serde(rename = "pred")]
    pub predicted_text: String,
    #[serde(rename = "user_command", skip_serializing_if = "Option::is_none")]
    pub user_command: Option<String>,
    #[serde(rename = "fn_match")]
    pub function_matched: bool,
    #[serde(rename = "arg_match")]
    pub arguments_matched: bool,
    #[serde(rename = "errors", default, skip_serializing_if = "Vec::is_empty")]
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionBucket {
    pub total: usize,
    pub correct: usize,
    #[serde(default)]
    pub samples: Vec<SampleResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvalSummary {
    pub accuracy: f32,
    pub total_cases: usize,
    pub correct_cases: usize,
}

/// Finalized metrics for one evaluation run.
#[derive(Clone, Debug, Default)]
pub struct EvalReport {
    pub per_function: IndexMap<String, FunctionBucket>,
    pub ground_truth_unparsable: Vec<String>,
    pub prediction_unparsable: Vec<String>,
}

impl EvalReport {
    pub fn summary(&self) -> EvalSummary {
        let total_cases: usize = self.per_function.values().map(|b| b.total).sum();
        let correct_cases: usize = self.per_function.values().map(|b| b.correct).sum();
        let accuracy = if total_cases == 0 {
            0.0
        } else {
            correct_cases as f32 / total_cases as f32
        };
        EvalSummary {
            accuracy,
            total_cases,
            correct_cases,
        }
    }

    /// Merge a partial report produced by another worker. Bucket totals are
    /// summed and sample lists concatenated; only the order of entries in
    /// `samples` depends on merge order.
    pub fn merge(&mut self, other: EvalReport) {
        for (name, bucket) in other.per_function {
            let target = self.per_function.entry(name).or_default();
            target.total += bucket.total;
            target.correct += bucket.correct;
            target.samples.extend(bucket.samples);
        }
        self.ground_truth_unparsable
            .extend(other.ground_truth_unparsable);
        self.prediction_unparsable
            .extend(other.prediction_unparsable);
    }

    /// Wire layout: one key per function name, plus the two reserved
    /// unparsable buckets (present only when non-empty).
    pub fn serialize_to_json(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for (name, bucket) in self.per_function.iter() {
            root.insert(
                name.clone(),
                serde_json::to_value(bucket).expect("Should serialize function bucket"),
            );
        }
        if !self.ground_truth_unparsable.is_empty() {
            root.insert(
                GT_UNPARSABLE_KEY.to_string(),
                serde_json::Value::Array(
                    self.ground_truth_unparsable
                        .iter()
                        .map(|text| serde_json::Value::String(text.clone()))
                        .collect(),
                ),
            );
        }
        if !self.prediction_unparsable.is_empty() {
            root.insert(
                PRED_UNPARSABLE_KEY.to_string(),
                serde_json::Value::Array(
                    self.prediction_unparsable
                        .iter()
                        .map(|text| serde_json::Value::String(text.clone()))
                        .collect(),
                ),
            );
        }
        serde_json::Value::Object(root)
    }
}

/// Folds per-sample comparator output into per-function totals. Owns the
/// only mutable state of a run; one aggregator per run.
pub struct EvalAggregator<'r> {
    registry: &'r FunctionRegistry,
    decoder: Box<dyn DecodeArgs>,
    report: EvalReport,
}

impl<'r> EvalAggregator<'r> {
    pub fn new(registry: &'r FunctionRegistry, decoder: Box<dyn DecodeArgs>) -> Self {
        EvalAggregator {
            registry,
            decoder,
            report: EvalReport::default(),
        }
    }

    /// Aggregator over the legacy training-data argument encoding.
    pub fn legacy(registry: &'r FunctionRegistry) -> Self {
        Self::new(registry, Box::new(LegacyPyArgs))
    }

    pub fn record(&mut self, record: &ResultRecord) {
        let ground_truth = match parse_transcript(&record.assistant, self.decoder.as_ref()) {
            Ok(call) => call,
            Err(err) => {
                debug!("ground truth transcript failed to parse: {}", err);
                self.report
                    .ground_truth_unparsable
                    .push(record.assistant.clone());
                return;
            }
        };
        let predicted = match parse_transcript(&record.model_response, self.decoder.as_ref()) {
            Ok(call) => call,
            Err(err) => {
                debug!("prediction failed to parse: {}", err);
                self.report
                    .prediction_unparsable
                    .push(record.model_response.clone());
                return;
            }
        };

        let comparison = compare_calls(self.registry, &ground_truth, &predicted);

        let bucket = self
            .report
            .per_function
            .entry(ground_truth.function_name.clone())
            .or_default();
        bucket.total += 1;
        if comparison.matched() {
            bucket.correct += 1;
        }
        bucket.samples.push(SampleResult {
            ground_truth_text: record.assistant.clone(),
            predicted_text: record.model_response.clone(),
            user_command: record.user.clone(),
            function_matched: comparison.function_matched,
            arguments_matched: comparison.arguments_matched,
            discrepancies: comparison.discrepancies,
        });
    }

    /// Consumes the aggregator; there is no second finalize.
    pub fn finalize(self) -> EvalReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::car_functions;

    fn turn(directive: &str) -> String {
        format!(
            "<|im_start|>assistant\n<functioncall> {} <|im_end|><|endoftext|>",
            directive
        )
    }

    fn record(gt_directive: &str, pred_directive: &str) -> ResultRecord {
        ResultRecord::new(&turn(gt_directive), &turn(pred_directive))
    }

    #[test]
    fn correct_sample_increments_total_and_correct() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        let directive =
            r#"{"name": "adjust_temperature", "arguments": "{'temperature': 14}"}"#;
        aggregator.record(&record(directive, directive));
        let report = aggregator.finalize();
        let bucket = &report.per_function["adjust_temperature"];
        assert_eq!(bucket.total, 1);
        assert_eq!(bucket.correct, 1);
        assert_eq!(bucket.samples.len(), 1);
        assert!(bucket.samples[0].function_matched);
        assert!(bucket.samples[0].arguments_matched);
        assert!(bucket.samples[0].discrepancies.is_empty());
    }

    #[test]
    fn failing_sample_is_retained_with_discrepancies() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        aggregator.record(&record(
            r#"{"name": "lock_doors", "arguments": "{'lock': 'lock'}"}"#,
            r#"{"name": "lock_doors", "arguments": "{'lock': 'unlock'}"}"#,
        ));
        let report = aggregator.finalize();
        let bucket = &report.per_function["lock_doors"];
        assert_eq!(bucket.total, 1);
        assert_eq!(bucket.correct, 0);
        assert_eq!(bucket.samples[0].discrepancies.len(), 1);
    }

    #[test]
    fn unparsable_ground_truth_skips_the_pair() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        aggregator.record(&ResultRecord::new(
            "no directive at all",
            &turn(r#"{"name": "lock_doors", "arguments": "{'lock': 'lock'}"}"#),
        ));
        let report = aggregator.finalize();
        assert!(report.per_function.is_empty());
        assert_eq!(report.ground_truth_unparsable.len(), 1);
        assert!(report.prediction_unparsable.is_empty());
    }

    #[test]
    fn unparsable_prediction_does_not_touch_function_buckets() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        aggregator.record(&ResultRecord::new(
            &turn(r#"{"name": "lock_doors", "arguments": "{'lock': 'lock'}"}"#),
            "<functioncall> {\"name\": \"lock_doors\"}",
        ));
        let report = aggregator.finalize();
        assert!(report.per_function.is_empty());
        assert_eq!(report.prediction_unparsable.len(), 1);
    }

    #[test]
    fn buckets_are_keyed_by_ground_truth_name_including_marker() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        let directive =
            r#"{"name": "POSSIBLY_INCORRECT_adjust_seat", "arguments": "{}"}"#;
        aggregator.record(&record(directive, directive));
        let report = aggregator.finalize();
        assert!(report
            .per_function
            .contains_key("POSSIBLY_INCORRECT_adjust_seat"));
    }

    #[test]
    fn correct_never_exceeds_total() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        let good = r#"{"name": "set_cruise_control", "arguments": "{'speed': 90}"}"#;
        let bad = r#"{"name": "set_cruise_control", "arguments": "{'speed': 80}"}"#;
        aggregator.record(&record(good, good));
        aggregator.record(&record(good, bad));
        let report = aggregator.finalize();
        let bucket = &report.per_function["set_cruise_control"];
        assert_eq!(bucket.total, 2);
        assert_eq!(bucket.correct, 1);
        assert!(bucket.correct <= bucket.total);
        let summary = report.summary();
        assert_eq!(summary.total_cases, 2);
        assert_eq!(summary.correct_cases, 1);
        assert!((summary.accuracy - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn serialized_report_uses_reserved_bucket_keys() {
        let mut aggregator = EvalAggregator::legacy(car_functions());
        aggregator.record(&ResultRecord::new("garbage", "garbage"));
        let good = r#"{"name": "start_engine", "arguments": "{}"}"#;
        aggregator.record(&record(good, good));
        let value = aggregator.finalize().serialize_to_json();
        assert!(value.get("gt_defunctioning_error").is_some());
        assert!(value.get("pred_defunctioning_error").is_none());
        assert_eq!(value["start_engine"]["total"], 1);
        assert_eq!(value["start_engine"]["correct"], 1);
    }

    #[test]
    fn merge_is_lossless_for_totals() {
        let good = r#"{"name": "start_engine", "arguments": "{}"}"#;
        let bad = r#"{"name": "start_engine", "arguments": "{'method': 'hotwire'}"}"#;

        let mut left = EvalAggregator::legacy(car_functions());
        left.record(&record(good, good));
        let mut right = EvalAggregator::legacy(car_functions());
        right.record(&record(good, bad));

        let left_report = left.finalize();
        let right_report = right.finalize();

        let mut forward = left_report.clone();
        forward.merge(right_report.clone());
        let mut backward = right_report;
        backward.merge(left_report);

        for report in [&forward, &backward] {
            let bucket = &report.per_function["start_engine"];
            assert_eq!(bucket.total, 2);
            assert_eq!(bucket.correct, 1);
            assert_eq!(bucket.samples.len(), 2);
        }
    }
}
