//! Evaluation core: parse both sides of a stored pair, diff them against
//! the function schemas, and fold the verdicts into per-function metrics.

pub mod aggregate;
pub mod compare;
pub mod driver;
pub mod file_models;
pub mod parse;

pub use aggregate::{EvalAggregator, EvalReport, EvalSummary, FunctionBucket, SampleResult};
pub use compare::{compare_calls, Comparison, Discrepancy, ErrorKind};
pub use file_models::ResultRecord;
pub use parse::{
    parse_transcript, parse_transcript_legacy, CallRecord, DecodeArgs, LegacyPyArgs, ParseError,
    StrictJsonArgs,
};
