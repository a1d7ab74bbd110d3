//! Templated synthesis of labeled training triples in the chat wire
//! format. The LLM-prompted command paraphrasing that produced the original
//! corpus is an external concern; everything here is deterministic given a
//! seeded rng.

pub mod generate;
pub mod templates;

pub use generate::{
    encode_args_py, format_assistant_turn, split_train_test, TrainingDataGenerator,
    TrainingSample,
};
pub use templates::command_templates;
