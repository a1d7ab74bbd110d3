//! Synthesis and evaluation for a car voice-control function-calling
//! assistant. The data generator emits `(system, user, assistant)` triples
//! in the training wire format; the evaluation core parses stored
//! prediction pairs back into canonical call records, diffs them
//! field-by-field against the function schemas, and aggregates per-function
//! accuracy metrics.

pub mod config;
pub mod datagen;
pub mod eval;
pub mod models;
pub mod registry;
pub mod utils;
