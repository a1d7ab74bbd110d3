use indexmap::IndexMap;

/// Natural-language command templates per function. `{param}` placeholders
/// are filled with sampled argument values; every template mentions all of
/// its function's required parameters so the rendered command carries the
/// information the call needs.
pub fn command_templates() -> IndexMap<&'static str, Vec<&'static str>> {
    let mut templates: IndexMap<&'static str, Vec<&'static str>> = IndexMap::new();
    templates.insert(
        "adjust_temperature",
        vec![
            "Can you set the {zone} temperature to {temperature} degrees?",
            "Please adjust the {zone} zone temperature to {temperature}.",
            "I need the {zone} area to be {temperature} degrees.",
            "Set temperature to {temperature}",
            "Adjust temperature to {temperature}",
        ],
    );
    templates.insert(
        "adjust_fan_speed",
        vec![
            "Turn up the air flow for the {area} areas.",
            "Change the fan speed in {area}.",
            "Adjust the fan for {area}, please.",
        ],
    );
    templates.insert(
        "adjust_seat",
        vec![
            "Can you move the seat {position}?",
            "Please adjust the {seat_type} seat to {position}.",
            "I need the seat adjusted {position}.",
            "Push the seat {position}.",
            "Set the {seat_type}'s seat {position}.",
        ],
    );
    templates.insert(
        "control_window",
        vec![
            "Can you roll the {window_location} window {window_position}?",
            "Move the {window_location} window {window_position}.",
            "Roll the window {window_position}",
            "I need the window {window_position}",
        ],
    );
    templates.insert(
        "adjust_wiper_speed",
        vec![
            "Can you set the wipers to speed {speed}?",
            "Please activate the wipers at speed {speed}.",
            "Turn on the wipers at speed {speed}.",
        ],
    );
    templates.insert(
        "activate_defroster",
        vec![
            "Turn on the defroster.",
            "Please defrost the {defroster_zone} windows for {duration_minutes} minutes.",
            "Run the defroster for {duration_minutes} minutes.",
        ],
    );
    templates.insert(
        "start_engine",
        vec![
            "Start the engine.",
            "Start the car using the {method} method.",
            "Fire up the engine, please.",
        ],
    );
    templates.insert(
        "lock_doors",
        vec![
            "Can you {lock} the doors?",
            "Please {lock} all the car doors.",
            "{lock} the doors.",
        ],
    );
    templates.insert(
        "play_music",
        vec![
            "Play {track} at volume {volume}.",
            "Put on {track}, please.",
            "Play some music.",
        ],
    );
    templates.insert(
        "toggle_headlights",
        vec![
            "Turn the headlights {state}.",
            "Switch the headlights {state}, please.",
        ],
    );
    templates.insert(
        "set_navigation_destination",
        vec![
            "Navigate to {destination}.",
            "Take me to {destination}.",
            "Set the destination to {destination}.",
        ],
    );
    templates.insert(
        "control_ambient_lighting",
        vec![
            "Set the ambient lighting to {color}.",
            "Change the interior lights to {color} at intensity {intensity}.",
        ],
    );
    templates.insert(
        "set_cruise_control",
        vec![
            "Set cruise control to {speed}.",
            "Cruise at {speed} kilometers per hour.",
        ],
    );
    templates.insert(
        "check_battery_health",
        vec![
            "How is the battery doing?",
            "Give me a battery health report.",
        ],
    );
    templates.insert(
        "toggle_sport_mode",
        vec!["Please {action} sport mode.", "{action} the sport mode."],
    );
    templates.insert(
        "check_tire_pressure",
        vec![
            "Check the pressure on the {tire} tires.",
            "What is the tire pressure for {tire}?",
        ],
    );
    templates
}
