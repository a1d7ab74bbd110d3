use indexmap::IndexMap;
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::{
    ASSISTANT_TURN_PREFIX, CALL_END_MARKER, END_OF_TEXT, POSSIBLY_INCORRECT_PREFIX,
    SYSTEM_TURN_PREFIX, USER_TURN_PREFIX,
};
use crate::datagen::templates::command_templates;
use crate::registry::{FunctionDef, FunctionRegistry, ParamType, Parameter, ScalarType};

/// One fine-tuning record in the chat wire format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingSample {
    pub system: String,
    pub user: String,
    pub assistant: String,
}

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{(.*?)\}").unwrap();
}

pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Encode an argument map as a Python dict literal: single-quoted strings,
/// `True`/`False` booleans. This is the encoding the training data stores
/// in the directive's arguments field, and the dual of the legacy decoder.
pub fn encode_args_py(arguments: &IndexMap<String, serde_json::Value>) -> String {
    let entries: Vec<String> = arguments
        .iter()
        .map(|(key, value)| format!("'{}': {}", key, py_literal(value)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn py_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "None".to_string(),
        serde_json::Value::Bool(true) => "True".to_string(),
        serde_json::Value::Bool(false) => "False".to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", s),
        serde_json::Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", rendered.join(", "))
        }
        serde_json::Value::Object(_) => value.to_string(),
    }
}

/// Full assistant turn embedding the call directive.
pub fn format_assistant_turn(
    function_name: &str,
    arguments: &IndexMap<String, serde_json::Value>,
) -> String {
    format!(
        "{}<functioncall> {{\"name\": \"{}\", \"arguments\": \"{}\"}} {}{}",
        ASSISTANT_TURN_PREFIX,
        function_name,
        encode_args_py(arguments),
        CALL_END_MARKER,
        END_OF_TEXT
    )
}

fn format_user_turn(command: &str) -> String {
    format!("{}{}{}\n", USER_TURN_PREFIX, command, CALL_END_MARKER)
}

fn plain_system_turn() -> String {
    format!(
        "{}You are a helpful assistant. You have to either provide a way to answer user's request or answer user's query.\n{}\n",
        SYSTEM_TURN_PREFIX, CALL_END_MARKER
    )
}

fn prompted_system_turn(def: &FunctionDef) -> String {
    let schema = serde_json::to_string_pretty(&json!([def.serialize_to_json()]))
        .expect("Should serialize function definition");
    format!(
        "{}You are a helpful assistant with access to the following functions. Use these functions when they are relevant to assist with a user's request\n{}{}\n",
        SYSTEM_TURN_PREFIX, schema, CALL_END_MARKER
    )
}

/// Templated synthesizer of `(system, user, assistant)` triples. Commands
/// come from the per-function templates; argument values are sampled from
/// enum sets and per-parameter ranges.
pub struct TrainingDataGenerator<'r, R: Rng> {
    registry: &'r FunctionRegistry,
    rng: R,
    opt_prob: f64,
    prompt_insertion: bool,
}

impl<'r, R: Rng> TrainingDataGenerator<'r, R> {
    pub fn new(registry: &'r FunctionRegistry, rng: R) -> Self {
        TrainingDataGenerator {
            registry,
            rng,
            opt_prob: 0.5,
            prompt_insertion: false,
        }
    }

    pub fn with_opt_prob(mut self, opt_prob: f64) -> Self {
        self.opt_prob = opt_prob;
        self
    }

    pub fn with_prompt_insertion(mut self, prompt_insertion: bool) -> Self {
        self.prompt_insertion = prompt_insertion;
        self
    }

    /// Generate `per_function` complete command samples for every registry
    /// function that has templates.
    pub fn generate(&mut self, per_function: usize) -> Vec<TrainingSample> {
        let templates = command_templates();
        let mut samples = Vec::new();
        for def in self.registry.iter() {
            let Some(function_templates) = templates.get(def.name.as_str()) else {
                debug!("no command templates for {}, skipping", def.name);
                continue;
            };
            for _ in 0..per_function {
                let template = self.choose_template(def, function_templates);
                samples.push(self.sample_from_template(def, template));
            }
        }
        samples
    }

    /// Negative samples: commands with every argument value blanked out,
    /// labeled with the possibly-incorrect marker and empty arguments.
    /// Functions without required parameters are skipped, since for those a
    /// value-free command is already a complete call.
    pub fn generate_possibly_incorrect(&mut self, per_function: usize) -> Vec<TrainingSample> {
        let templates = command_templates();
        let mut samples = Vec::new();
        for def in self.registry.iter() {
            if def.required.is_empty() {
                continue;
            }
            let Some(function_templates) = templates.get(def.name.as_str()) else {
                continue;
            };
            for _ in 0..per_function {
                let template = function_templates
                    .choose(&mut self.rng)
                    .expect("Template list should not be empty");
                let command = blank_placeholders(template);
                let marked_name = format!("{}{}", POSSIBLY_INCORRECT_PREFIX, def.name);
                samples.push(TrainingSample {
                    system: self.system_turn(def),
                    user: format_user_turn(&command),
                    assistant: format_assistant_turn(&marked_name, &IndexMap::new()),
                });
            }
        }
        samples
    }

    /// Bias template choice so optional parameters show up in roughly
    /// `opt_prob` of the samples.
    fn choose_template(
        &mut self,
        def: &FunctionDef,
        function_templates: &[&'static str],
    ) -> &'static str {
        let wants_optional = !def.optional.is_empty() && self.rng.gen_bool(self.opt_prob);
        let candidates: Vec<&'static str> = function_templates
            .iter()
            .copied()
            .filter(|template| {
                let names = placeholders(template);
                let mentions_optional = names.iter().any(|n| def.optional.contains(n));
                mentions_optional == wants_optional
            })
            .collect();
        match candidates.choose(&mut self.rng).copied() {
            Some(template) => template,
            None => function_templates
                .choose(&mut self.rng)
                .copied()
                .expect("Template list should not be empty"),
        }
    }

    fn sample_from_template(&mut self, def: &FunctionDef, template: &str) -> TrainingSample {
        let names = placeholders(template);
        // Arguments cover every required parameter plus whatever optional
        // parameters the command actually mentions.
        let mut arguments: IndexMap<String, serde_json::Value> = IndexMap::new();
        for (param_name, parameter) in def.parameters.iter() {
            let mentioned = names.iter().any(|n| n == param_name);
            if mentioned || def.required.contains(param_name) {
                arguments.insert(
                    param_name.clone(),
                    sample_value(&mut self.rng, param_name, parameter),
                );
            }
        }

        let mut command = template.to_string();
        for name in &names {
            let value = &arguments[name.as_str()];
            command = command.replace(&format!("{{{}}}", name), &display_value(value));
        }

        TrainingSample {
            system: self.system_turn(def),
            user: format_user_turn(&command),
            assistant: format_assistant_turn(&def.name, &arguments),
        }
    }

    fn system_turn(&self, def: &FunctionDef) -> String {
        if self.prompt_insertion {
            prompted_system_turn(def)
        } else {
            plain_system_turn()
        }
    }
}

fn blank_placeholders(template: &str) -> String {
    let blanked = PLACEHOLDER_RE.replace_all(template, "");
    blanked.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Value rendering inside the natural-language command. Mirrors how the
/// label renders the same value, apart from string quoting.
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => py_literal(other),
    }
}

fn sample_value<R: Rng>(rng: &mut R, param_name: &str, parameter: &Parameter) -> serde_json::Value {
    match parameter.ty {
        ParamType::Array { .. } => {
            let pool = parameter
                .r#enum
                .clone()
                .unwrap_or_else(|| vec![json!("one"), json!("two"), json!("three")]);
            let count = rng.gen_range(1..=pool.len());
            let mut chosen: Vec<serde_json::Value> =
                pool.choose_multiple(rng, count).cloned().collect();
            // 'all' subsumes everything else it was sampled with
            if chosen.len() > 1 {
                chosen.retain(|v| v != &json!("all"));
            }
            serde_json::Value::Array(chosen)
        }
        ParamType::Scalar(scalar) => {
            if let Some(values) = &parameter.r#enum {
                return values
                    .choose(rng)
                    .expect("Enum constraint should not be empty")
                    .clone();
            }
            match scalar {
                ScalarType::Boolean => json!(rng.gen_bool(0.5)),
                ScalarType::Integer | ScalarType::Number => {
                    let (low, high) = integer_range_for(param_name);
                    json!(rng.gen_range(low..=high))
                }
                ScalarType::Str => {
                    let pool = string_pool_for(param_name);
                    json!(pool.choose(rng).expect("String pool should not be empty"))
                }
            }
        }
    }
}

fn integer_range_for(param_name: &str) -> (i64, i64) {
    match param_name {
        "temperature" => (16, 30),
        "speed" => (1, 120),
        "volume" | "intensity" => (1, 10),
        "duration_minutes" => (5, 30),
        _ => (1, 100),
    }
}

fn string_pool_for(param_name: &str) -> &'static [&'static str] {
    match param_name {
        "position" => &["forward", "backward", "up", "down"],
        "track" => &["Imagine", "Bohemian Rhapsody", "Take Five", "Yesterday"],
        "color" => &["blue", "red", "amber", "white"],
        "destination" => &[
            "24 Elm Street",
            "the nearest gas station",
            "downtown parking garage",
            "Lakeside Mall",
        ],
        _ => &["alpha", "beta", "gamma"],
    }
}

/// Shuffle and split into train/test partitions.
pub fn split_train_test<R: Rng>(
    mut samples: Vec<TrainingSample>,
    train_fraction: f64,
    rng: &mut R,
) -> (Vec<TrainingSample>, Vec<TrainingSample>) {
    samples.shuffle(rng);
    let split = (samples.len() as f64 * train_fraction) as usize;
    let test = samples.split_off(split);
    (samples, test)
}
