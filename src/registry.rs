use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde_json::json;

use crate::config::POSSIBLY_INCORRECT_MARKER;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Integer,
    Number,
    Boolean,
}

impl ScalarType {
    pub fn wire_name(self) -> &'static str {
        match self {
            ScalarType::Str => "string",
            ScalarType::Integer => "integer",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
        }
    }
}

/// Declared type of a parameter. The array variant is the only one that
/// carries an element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Scalar(ScalarType),
    Array { items: ScalarType },
}

impl ParamType {
    pub fn is_array(self) -> bool {
        matches!(self, ParamType::Array { .. })
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            ParamType::Scalar(scalar) => scalar.wire_name(),
            ParamType::Array { .. } => "array",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub ty: ParamType,
    pub description: String,
    /// Closed set of allowed literal values. For arrays this constrains the
    /// elements, not the sequence itself.
    pub r#enum: Option<Vec<serde_json::Value>>,
    pub default: Option<serde_json::Value>,
}

impl Parameter {
    pub fn string(description: &str) -> Self {
        Self::scalar(ScalarType::Str, description)
    }

    pub fn integer(description: &str) -> Self {
        Self::scalar(ScalarType::Integer, description)
    }

    pub fn number(description: &str) -> Self {
        Self::scalar(ScalarType::Number, description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::scalar(ScalarType::Boolean, description)
    }

    pub fn array(items: ScalarType, description: &str) -> Self {
        Parameter {
            ty: ParamType::Array { items },
            description: description.to_string(),
            r#enum: None,
            default: None,
        }
    }

    fn scalar(scalar: ScalarType, description: &str) -> Self {
        Parameter {
            ty: ParamType::Scalar(scalar),
            description: description.to_string(),
            r#enum: None,
            default: None,
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.r#enum = Some(values.iter().map(|v| json!(v)).collect());
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Serialize to the JSON-schema-like layout embedded in system prompts.
    pub fn serialize_to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("type".to_string(), json!(self.ty.wire_name()));
        obj.insert("description".to_string(), json!(self.description));
        if let ParamType::Array { items } = self.ty {
            let mut items_obj = serde_json::Map::new();
            items_obj.insert("type".to_string(), json!(items.wire_name()));
            if let Some(values) = &self.r#enum {
                items_obj.insert("enum".to_string(), json!(values));
            }
            obj.insert("items".to_string(), serde_json::Value::Object(items_obj));
        } else if let Some(values) = &self.r#enum {
            obj.insert("enum".to_string(), json!(values));
        }
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        serde_json::Value::Object(obj)
    }
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: IndexMap<String, Parameter>,
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

impl FunctionDef {
    pub fn serialize_to_json(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for (name, parameter) in self.parameters.iter() {
            properties.insert(name.clone(), parameter.serialize_to_json());
        }
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": self.required,
                "optional": self.optional,
            }
        })
    }
}

/// The closed set of callable functions. Loaded once, consulted by the
/// comparator and the generator; always passed explicitly rather than read
/// from ambient scope.
pub struct FunctionRegistry {
    functions: IndexMap<String, FunctionDef>,
}

impl FunctionRegistry {
    pub fn new(defs: Vec<FunctionDef>) -> Self {
        let mut functions = IndexMap::new();
        for def in defs {
            debug_assert!(
                enum_literals_match_type(&def),
                "enum literals of {} must match the declared parameter type",
                def.name
            );
            let name = def.name.clone();
            if functions.insert(name.clone(), def).is_some() {
                panic!("duplicate function name in registry: {}", name);
            }
        }
        FunctionRegistry { functions }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions.values()
    }

    /// Schema lookup for a ground-truth function name. Names carrying the
    /// possibly-incorrect marker resolve to the schema of the base function.
    /// A ground-truth name the registry cannot resolve is a configuration
    /// inconsistency, not an evaluation outcome.
    pub fn ground_truth_schema(&self, name: &str) -> &FunctionDef {
        if let Some(def) = self.functions.get(name) {
            return def;
        }
        let lower = name.to_lowercase();
        if let Some(pos) = lower.find(POSSIBLY_INCORRECT_MARKER) {
            let stripped =
                name[pos + POSSIBLY_INCORRECT_MARKER.len()..].trim_start_matches('_');
            if let Some(def) = self.functions.get(stripped) {
                return def;
            }
        }
        panic!("ground truth function should be in the registry: {}", name)
    }

    pub fn serialize_to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.functions
                .values()
                .map(|def| def.serialize_to_json())
                .collect(),
        )
    }
}

fn enum_literals_match_type(def: &FunctionDef) -> bool {
    def.parameters.values().all(|parameter| {
        let Some(values) = &parameter.r#enum else {
            return true;
        };
        let scalar = match parameter.ty {
            ParamType::Scalar(scalar) => scalar,
            ParamType::Array { items } => items,
        };
        values.iter().all(|value| match scalar {
            ScalarType::Str => value.is_string(),
            ScalarType::Integer => value.is_i64() || value.is_u64(),
            ScalarType::Number => value.is_number(),
            ScalarType::Boolean => value.is_boolean(),
        })
    })
}

fn def(
    name: &str,
    description: &str,
    parameters: Vec<(&str, Parameter)>,
    required: &[&str],
    optional: &[&str],
) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        description: description.to_string(),
        parameters: parameters
            .into_iter()
            .map(|(param_name, parameter)| (param_name.to_string(), parameter))
            .collect(),
        required: required.iter().map(|s| s.to_string()).collect(),
        optional: optional.iter().map(|s| s.to_string()).collect(),
    }
}

lazy_static! {
    static ref CAR_FUNCTIONS: FunctionRegistry = FunctionRegistry::new(vec![
        def(
            "adjust_temperature",
            "Adjust the temperature in a specified zone of the car.",
            vec![
                (
                    "temperature",
                    Parameter::number(
                        "The target temperature for the specified zone in degrees Celsius."
                    ),
                ),
                (
                    "zone",
                    Parameter::string("The zone where the temperature will be adjusted.")
                        .with_enum(&["front", "rear", "all"])
                        .with_default(json!("all")),
                ),
            ],
            &["temperature"],
            &["zone"],
        ),
        def(
            "adjust_fan_speed",
            "Increase or decrease the air flow in one or more cabin areas.",
            vec![(
                "area",
                Parameter::array(ScalarType::Str, "The cabin areas whose fan speed to change.")
                    .with_enum(&[
                        "driver-left",
                        "driver-right",
                        "rear-left",
                        "rear-right",
                        "all",
                    ]),
            )],
            &["area"],
            &[],
        ),
        def(
            "adjust_seat",
            "Adjust a seat's position in the car.",
            vec![
                (
                    "position",
                    Parameter::string(
                        "The desired position of the seat (e.g., 'forward', 'backward', 'up', 'down')."
                    ),
                ),
                (
                    "seat_type",
                    Parameter::string("The type of seat to adjust.")
                        .with_enum(&["driver", "passenger"])
                        .with_default(json!("driver")),
                ),
            ],
            &["position"],
            &["seat_type"],
        ),
        def(
            "control_window",
            "Control the car window's position.",
            vec![
                (
                    "window_position",
                    Parameter::string("The desired position of the window.")
                        .with_enum(&["up", "down"]),
                ),
                (
                    "window_location",
                    Parameter::string("The location of the window.")
                        .with_enum(&["driver", "passenger", "rear_right", "rear_left"])
                        .with_default(json!("driver")),
                ),
            ],
            &["window_position"],
            &["window_location"],
        ),
        def(
            "adjust_wiper_speed",
            "Activate the windshield wipers.",
            vec![(
                "speed",
                Parameter::integer(
                    "The speed of the wipers (e.g., 1 for low, 2 for medium, 3 for high)."
                ),
            )],
            &["speed"],
            &[],
        ),
        def(
            "activate_defroster",
            "Activate the defroster for windows and windshield.",
            vec![
                (
                    "duration_minutes",
                    Parameter::integer(
                        "Duration in minutes for which the defroster should be active."
                    )
                    .with_default(json!(10)),
                ),
                (
                    "defroster_zone",
                    Parameter::string("The zone to defrost.")
                        .with_enum(&["front", "rear", "all"])
                        .with_default(json!("all")),
                ),
            ],
            &[],
            &["duration_minutes", "defroster_zone"],
        ),
        def(
            "start_engine",
            "Start the car's engine remotely.",
            vec![(
                "method",
                Parameter::string("The method to start the engine.")
                    .with_enum(&["remote", "keyless", "keyed"])
                    .with_default(json!("keyless")),
            )],
            &[],
            &["method"],
        ),
        def(
            "lock_doors",
            "Lock or unlock the car doors.",
            vec![(
                "lock",
                Parameter::string("Whether to lock or unlock the doors.")
                    .with_enum(&["lock", "unlock"]),
            )],
            &["lock"],
            &[],
        ),
        def(
            "play_music",
            "Control the music player in the car.",
            vec![
                (
                    "track",
                    Parameter::string("The track name to play.").with_default(json!("random")),
                ),
                (
                    "volume",
                    Parameter::integer("Volume level from 1 (low) to 10 (high).")
                        .with_default(json!(5)),
                ),
            ],
            &[],
            &["track", "volume"],
        ),
        def(
            "toggle_headlights",
            "Turn the headlights on or off.",
            vec![(
                "state",
                Parameter::string("Whether the headlights should be on or off.")
                    .with_enum(&["on", "off"]),
            )],
            &["state"],
            &[],
        ),
        def(
            "set_navigation_destination",
            "Set a destination in the car's navigation system.",
            vec![(
                "destination",
                Parameter::string("The address or location to navigate to."),
            )],
            &["destination"],
            &[],
        ),
        def(
            "control_ambient_lighting",
            "Adjust the color and intensity of the interior ambient lighting.",
            vec![
                ("color", Parameter::string("The color of the ambient lighting.")),
                (
                    "intensity",
                    Parameter::integer("The intensity level of the lighting, from 1 (low) to 10 (high).")
                        .with_default(json!(5)),
                ),
            ],
            &["color"],
            &["intensity"],
        ),
        def(
            "set_cruise_control",
            "Activate and set the speed for cruise control.",
            vec![(
                "speed",
                Parameter::integer("The cruise control speed in km/h."),
            )],
            &["speed"],
            &[],
        ),
        def(
            "check_battery_health",
            "Provide the current status and health of the car's battery.",
            vec![(
                "include_history",
                Parameter::boolean("Whether to include historical health data.")
                    .with_default(json!(false)),
            )],
            &[],
            &["include_history"],
        ),
        def(
            "toggle_sport_mode",
            "Toggle the car's sport mode setting.",
            vec![(
                "action",
                Parameter::string("Whether to enable or disable sport mode.")
                    .with_enum(&["activate", "deactivate"]),
            )],
            &["action"],
            &[],
        ),
        def(
            "check_tire_pressure",
            "Report the pressure of one or more tires.",
            vec![(
                "tire",
                Parameter::array(ScalarType::Str, "The tires to report pressure for.")
                    .with_enum(&[
                        "front_left",
                        "front_right",
                        "rear_left",
                        "rear_right",
                        "all",
                    ]),
            )],
            &["tire"],
            &[],
        ),
    ]);
}

/// The production car function set.
pub fn car_functions() -> &'static FunctionRegistry {
    &CAR_FUNCTIONS
}
