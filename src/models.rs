use tracing::debug;

use crate::datagen::TrainingSample;
use crate::eval::file_models::ResultRecord;

/// Boundary to a fine-tuned model: one chat transcript in, one raw text
/// completion out. The evaluator only ever sees the returned string.
pub trait CompletionModel {
    fn complete(&self, system: &str, user: &str) -> String;
}

/// Pair every labeled sample with the model's completion, ready for the
/// evaluation driver.
pub fn run_inference(
    model: &dyn CompletionModel,
    samples: &[TrainingSample],
) -> Vec<ResultRecord> {
    debug!("running inference over {} samples", samples.len());
    samples
        .iter()
        .map(|sample| ResultRecord {
            system: Some(sample.system.clone()),
            user: Some(sample.user.clone()),
            assistant: sample.assistant.clone(),
            model_response: model.complete(&sample.system, &sample.user),
        })
        .collect()
}
