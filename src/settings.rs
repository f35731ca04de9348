//! Strongly-typed, read-only view of the configuration save file.
//!
//! The save file itself stays a change-tracked JSON tree so that migrations
//! can operate on it; once it is at [`CONFIG_VERSION`](crate::store::schema::CONFIG_VERSION)
//! the rest of the program reads it through [`Settings`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FstkError, Result};
use crate::store::files::SaveFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    pub window: Window,
    pub first_run: bool,
    pub stats: Stats,
    pub options: Options,
    pub time_running: bool,
    #[serde(default)]
    pub task_templates: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    pub always_on_top: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_created_tasks: u64,
    pub total_deleted_tasks: u64,
    pub total_time_clears: u64,
    pub total_app_launches: u64,
    pub total_task_switches: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub redmine: RedmineOptions,
    pub boomer_compatibility: bool,
    pub switch_reminder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedmineOptions {
    pub enabled: bool,
    pub host: String,
    pub apikey: String,
    pub copy_time_to_clipboard: bool,
}

impl Settings {
    pub fn from_store(store: &SaveFile) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(store.snapshot()))?)
    }
}

/// Apply `value` at `path` to a copy of the config snapshot and return the
/// result if it still reads as [`Settings`]. Every mapping along the path
/// must already exist. `version` belongs to the migrator and is refused.
pub fn checked_change(config: &Value, path: &[&str], value: Value) -> Result<Value> {
    let Some((last, parents)) = path.split_last() else {
        return Err(FstkError::KeyNotFound(String::new()));
    };
    if path.first() == Some(&"version") {
        return Err(FstkError::validation(
            "path",
            "'version' is set by save file migrations",
        ));
    }

    let mut after = config.clone();
    let mut map = after
        .as_object_mut()
        .ok_or_else(|| FstkError::NotAMapping(String::new()))?;
    for key in parents {
        map = map
            .get_mut(*key)
            .ok_or_else(|| FstkError::KeyNotFound(key.to_string()))?
            .as_object_mut()
            .ok_or_else(|| FstkError::NotAMapping(key.to_string()))?;
    }
    map.insert(last.to_string(), value);

    if let Err(err) = serde_json::from_value::<Settings>(after.clone()) {
        return Err(FstkError::validation(
            "value",
            format!("'{}' would leave the config unreadable: {err}", path.join(".")),
        ));
    }
    Ok(after)
}

/// Compare two snapshots at `path`. A path missing on one side compares as
/// `null`.
pub fn is_property_different(old: &Value, new: &Value, path: &[&str]) -> bool {
    lookup(old, path) != lookup(new, path)
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// True when a change between two config snapshots requires the issue
/// tracker credentials to be checked again.
pub fn tracker_credentials_changed(old: &Value, new: &Value) -> bool {
    ["enabled", "host", "apikey"]
        .into_iter()
        .any(|key| is_property_different(old, new, &["options", "redmine", key]))
}
