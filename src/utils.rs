use std::fs::{create_dir_all, File};
use std::io::{BufReader, Write};
use std::path::Path;

use crate::eval::file_models::ResultRecord;

pub fn load_json_array(file_path: &str) -> Result<Vec<serde_json::Value>, String> {
    let file = File::open(file_path).map_err(|e| format!("Unable to open file: {}", e))?;
    let reader = BufReader::new(file);
    let value: serde_json::Value =
        serde_json::from_reader(reader).map_err(|e| format!("Unable to parse JSON: {}", e))?;
    let entries = value
        .as_array()
        .ok_or("Expected the file to contain a JSON array")?;
    Ok(entries.to_vec())
}

pub fn load_result_records(file_path: &str) -> Result<Vec<ResultRecord>, String> {
    let entries = load_json_array(file_path)?;
    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|e| format!("Result record has wrong format: {}", e))
        })
        .collect()
}

pub fn write_json_value(file_path: &str, value: &serde_json::Value) -> Result<(), String> {
    write_json_string(
        file_path,
        &serde_json::to_string(value).map_err(|e| format!("Unable to serialize JSON: {}", e))?,
    )
}

pub fn write_json_pretty(file_path: &str, value: &serde_json::Value) -> Result<(), String> {
    write_json_string(
        file_path,
        &serde_json::to_string_pretty(value)
            .map_err(|e| format!("Unable to serialize JSON: {}", e))?,
    )
}

fn write_json_string(file_path: &str, payload: &str) -> Result<(), String> {
    let path = Path::new(file_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)
                .map_err(|e| format!("Unable to create parent directory: {}", e))?;
        }
    }
    let mut file = File::create(file_path).map_err(|e| format!("Unable to create file: {}", e))?;
    file.write_all(payload.as_bytes())
        .map_err(|e| format!("Unable to write to file: {}", e))?;
    file.flush().map_err(|e| format!("Unable to flush file: {}", e))?;
    Ok(())
}
