use std::path::Path;

use colored::Colorize;
use serde_json::Value;

use crate::error::{FstkError, Result};
use crate::output::{self, Format};

fn split_path(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(FstkError::KeyNotFound(path.to_string()));
    }
    Ok(parts)
}

/// Parse a command-line value as JSON, falling back to a plain string so
/// that `config set options.redmine.host example.org` works unquoted.
pub fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

pub fn get(config_folder: &Path, path: &str, format: Format) -> Result<()> {
    let parts = split_path(path)?;
    super::with_app(config_folder, |app| {
        let value = app.config().document().get_path(&parts)?.to_json();
        output::print_value(&value, format)
    })
}

pub fn set(config_folder: &Path, path: &str, value: &str, format: Format) -> Result<()> {
    let parts = split_path(path)?;
    let value = parse_value(value);
    super::with_app(config_folder, |app| {
        let changed = app.set_config_value(&parts, value.clone())?;
        match format {
            Format::Json => println!(
                "{}",
                serde_json::json!({ "path": path, "value": value, "changed": changed })
            ),
            Format::Pretty if changed => println!("{} = {}", path.bold(), value),
            Format::Pretty => println!("{} = {} {}", path.bold(), value, "(unchanged)".dimmed()),
        }
        Ok(())
    })
}
