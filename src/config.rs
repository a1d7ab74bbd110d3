/* ---------------------------------------------------------------------------------------------------- */
/* Wire format                                                                                          */
/* ---------------------------------------------------------------------------------------------------- */

/// Marker that opens an embedded call directive in an assistant turn.
/// The trailing space is part of the marker.
pub const CALL_START_MARKER: &str = "<functioncall> ";

/// End-of-turn token that closes the call directive.
pub const CALL_END_MARKER: &str = "<|im_end|>";

pub const ASSISTANT_TURN_PREFIX: &str = "<|im_start|>assistant\n";
pub const USER_TURN_PREFIX: &str = "<|im_start|>user\n";
pub const SYSTEM_TURN_PREFIX: &str = "<|im_start|>system\n";
pub const END_OF_TEXT: &str = "<|endoftext|>";

/// Substring flagging a refusal/ambiguous-command sample. Matched
/// case-insensitively on both sides before function names are declared
/// mismatched.
pub const POSSIBLY_INCORRECT_MARKER: &str = "possibly_incorrect";

/// Prefix the generator attaches to a function name when the sampled
/// command left every argument unfilled.
pub const POSSIBLY_INCORRECT_PREFIX: &str = "POSSIBLY_INCORRECT_";

/* ---------------------------------------------------------------------------------------------------- */
/* Output conventions                                                                                   */
/* ---------------------------------------------------------------------------------------------------- */

/// Reserved aggregate key for ground-truth transcripts that failed to parse.
pub const GT_UNPARSABLE_KEY: &str = "gt_defunctioning_error";

/// Reserved aggregate key for predictions that failed to parse.
pub const PRED_UNPARSABLE_KEY: &str = "pred_defunctioning_error";

/// Derive the metrics output path from a results file path by suffix
/// replacement.
pub fn metrics_path_for(result_file: &str) -> String {
    if let Some(stem) = result_file.strip_suffix(".json") {
        format!("{}_eval_metrics.json", stem)
    } else {
        format!("{}_eval_metrics.json", result_file)
    }
}
