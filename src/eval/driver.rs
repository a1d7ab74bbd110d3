use tracing::info;

use crate::config::metrics_path_for;
use crate::eval::aggregate::{EvalAggregator, EvalReport};
use crate::eval::file_models::ResultRecord;
use crate::eval::parse::DecodeArgs;
use crate::registry::FunctionRegistry;
use crate::utils::{load_result_records, write_json_value};

/// Score every stored pair. A single unparsable sample never aborts the
/// run; it lands in the report's unparsable buckets instead.
pub fn run<'a>(
    registry: &FunctionRegistry,
    decoder: Box<dyn DecodeArgs>,
    records: impl IntoIterator<Item = &'a ResultRecord>,
) -> EvalReport {
    let mut aggregator = EvalAggregator::new(registry, decoder);
    for record in records {
        aggregator.record(record);
    }
    aggregator.finalize()
}

/// Load a results file, evaluate it, and persist the metrics next to it
/// (suffix replacement). Returns the metrics path.
pub fn evaluate_results_file(
    result_file: &str,
    registry: &FunctionRegistry,
    decoder: Box<dyn DecodeArgs>,
) -> Result<String, String> {
    let records = load_result_records(result_file)?;
    info!("loaded {} result records from {}", records.len(), result_file);

    let report = run(registry, decoder, records.iter());
    let summary = report.summary();
    info!(
        "evaluated {} samples, {} correct (accuracy {:.3})",
        summary.total_cases, summary.correct_cases, summary.accuracy
    );

    let metrics_path = metrics_path_for(result_file);
    write_json_value(&metrics_path, &report.serialize_to_json())?;
    Ok(metrics_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::parse::LegacyPyArgs;
    use crate::registry::car_functions;

    fn turn(directive: &str) -> String {
        format!(
            "<|im_start|>assistant\n<functioncall> {} <|im_end|><|endoftext|>",
            directive
        )
    }

    #[test]
    fn run_scores_every_pair_and_never_aborts() {
        let good = turn(r#"{"name": "lock_doors", "arguments": "{'lock': 'lock'}"}"#);
        let records = vec![
            ResultRecord::new(&good, &good),
            ResultRecord::new(&good, "unparsable prediction"),
            ResultRecord::new("unparsable ground truth", &good),
        ];
        let report = run(car_functions(), Box::new(LegacyPyArgs), records.iter());
        assert_eq!(report.per_function["lock_doors"].total, 1);
        assert_eq!(report.ground_truth_unparsable.len(), 1);
        assert_eq!(report.prediction_unparsable.len(), 1);
    }

    #[test]
    fn evaluate_results_file_writes_metrics_next_to_input() {
        let dir = std::env::temp_dir().join("carcall_driver_test");
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("predictions.json");
        let input_str = input.to_str().unwrap();

        let good = turn(r#"{"name": "start_engine", "arguments": "{'method': 'remote'}"}"#);
        let records = vec![ResultRecord::new(&good, &good)];
        crate::utils::write_json_value(input_str, &serde_json::to_value(&records).unwrap())
            .unwrap();

        let metrics_path =
            evaluate_results_file(input_str, car_functions(), Box::new(LegacyPyArgs)).unwrap();
        assert!(metrics_path.ends_with("predictions_eval_metrics.json"));

        let written = std::fs::read_to_string(&metrics_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["start_engine"]["correct"], 1);

        std::fs::remove_dir_all(&dir).ok();
    }
}
