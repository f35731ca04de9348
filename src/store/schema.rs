//! Concrete schemas for the two save files: their current versions, their
//! migration chains, and the documents written when no valid file exists.

use serde_json::{Map, Value, json};

use crate::model::{ColorGroup, normalize_ticket};
use crate::store::migration::{MigrationChain, MigrationStep, StepResult, section_mut};

pub const CONFIG_VERSION: u32 = 7;
pub const TASKS_VERSION: u32 = 3;

pub const DEFAULT_WINDOW_WIDTH: i64 = 460;
pub const DEFAULT_WINDOW_HEIGHT: i64 = 520;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Config,
    Tasks,
}

impl DocumentKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Tasks => "tasks",
        }
    }

    pub fn current_version(self) -> u32 {
        match self {
            Self::Config => CONFIG_VERSION,
            Self::Tasks => TASKS_VERSION,
        }
    }

    pub fn chain(self) -> MigrationChain {
        match self {
            Self::Config => config_chain(),
            Self::Tasks => tasks_chain(),
        }
    }

    pub fn default_document(self) -> Value {
        match self {
            Self::Config => default_config(),
            Self::Tasks => default_tasks(),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn default_config() -> Value {
    json!({
        "version": CONFIG_VERSION,
        "window": {
            "x": 0,
            "y": 0,
            "w": DEFAULT_WINDOW_WIDTH,
            "h": DEFAULT_WINDOW_HEIGHT,
            "always_on_top": true,
        },
        "first_run": true,
        "stats": {
            "total_created_tasks": 0,
            "total_deleted_tasks": 0,
            "total_time_clears": 0,
            "total_app_launches": 0,
            "total_task_switches": 0,
        },
        "options": {
            "redmine": {
                "enabled": false,
                "host": "",
                "apikey": "",
                "copy_time_to_clipboard": false,
            },
            "boomer_compatibility": false,
            "switch_reminder": false,
        },
        "time_running": true,
        "task_templates": {},
    })
}

pub fn default_tasks() -> Value {
    json!({
        "version": TASKS_VERSION,
        "current_tasks": {
            "0": {
                "name": "Example task",
                "ticket": "1234",
                "elapsed_time": 4632,
                "color_group": ColorGroup::default().as_str(),
                "ticket_title": null,
                "notes": "",
            },
        },
    })
}

pub fn config_chain() -> MigrationChain {
    MigrationChain::new(
        "config",
        CONFIG_VERSION,
        vec![
            MigrationStep::new(1, "window size and usage stats", config_1_2),
            MigrationStep::new(2, "first run flag and more counters", config_2_3),
            MigrationStep::new(3, "issue tracker options", config_3_4),
            MigrationStep::new(4, "copy time to clipboard option", config_4_5),
            MigrationStep::new(5, "compatibility and switch reminder options", config_5_6),
            MigrationStep::new(6, "persisted running state", config_6_7),
        ],
    )
}

pub fn tasks_chain() -> MigrationChain {
    MigrationChain::new(
        "tasks",
        TASKS_VERSION,
        vec![
            MigrationStep::new(1, "bare ticket numbers and color groups", tasks_1_2),
            MigrationStep::new(2, "ticket titles and notes", tasks_2_3),
        ],
    )
}

fn config_1_2(doc: &mut Map<String, Value>) -> StepResult {
    let window = section_mut(doc, "window")?;
    window.insert("w".into(), json!(DEFAULT_WINDOW_WIDTH));
    window.insert("h".into(), json!(DEFAULT_WINDOW_HEIGHT));
    doc.insert("stats".into(), json!({"total_created_tasks": 0}));
    Ok(())
}

fn config_2_3(doc: &mut Map<String, Value>) -> StepResult {
    let stats = section_mut(doc, "stats")?;
    for counter in ["total_deleted_tasks", "total_time_clears", "total_app_launches"] {
        stats.insert(counter.into(), json!(0));
    }
    doc.insert("first_run".into(), json!(true));
    Ok(())
}

fn config_3_4(doc: &mut Map<String, Value>) -> StepResult {
    doc.insert(
        "options".into(),
        json!({"redmine": {"enabled": false, "host": "", "apikey": ""}}),
    );
    Ok(())
}

fn config_4_5(doc: &mut Map<String, Value>) -> StepResult {
    let options = section_mut(doc, "options")?;
    let redmine = section_mut(options, "redmine")?;
    redmine.insert("copy_time_to_clipboard".into(), json!(false));
    Ok(())
}

fn config_5_6(doc: &mut Map<String, Value>) -> StepResult {
    let options = section_mut(doc, "options")?;
    options.insert("boomer_compatibility".into(), json!(false));
    options.insert("switch_reminder".into(), json!(false));
    section_mut(doc, "stats")?.insert("total_task_switches".into(), json!(0));
    Ok(())
}

fn config_6_7(doc: &mut Map<String, Value>) -> StepResult {
    section_mut(doc, "window")?
        .entry("always_on_top")
        .or_insert(json!(true));
    doc.entry("task_templates").or_insert(json!({}));
    doc.insert("time_running".into(), json!(true));
    Ok(())
}

fn tasks_1_2(doc: &mut Map<String, Value>) -> StepResult {
    for (key, task) in section_mut(doc, "current_tasks")? {
        let task = task
            .as_object_mut()
            .ok_or_else(|| format!("task '{key}' is not an object"))?;
        let ticket = task.get("ticket").and_then(Value::as_str).unwrap_or("");
        let ticket = normalize_ticket(ticket).to_string();
        task.insert("ticket".into(), json!(ticket));
        task.insert("color_group".into(), json!(ColorGroup::default().as_str()));
    }
    Ok(())
}

fn tasks_2_3(doc: &mut Map<String, Value>) -> StepResult {
    for (key, task) in section_mut(doc, "current_tasks")? {
        let task = task
            .as_object_mut()
            .ok_or_else(|| format!("task '{key}' is not an object"))?;
        task.insert("ticket_title".into(), Value::Null);
        task.insert("notes".into(), json!(""));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn chains_are_complete_up_to_their_current_version() {
        for kind in [DocumentKind::Config, DocumentKind::Tasks] {
            let chain = kind.chain();
            assert_eq!(chain.current_version(), kind.current_version());
            for from in 1..kind.current_version() {
                assert!(
                    chain.steps().iter().any(|s| s.from == from && s.to == from + 1),
                    "{kind} chain lacks step {from} -> {}",
                    from + 1
                );
            }
        }
    }

    #[test]
    fn defaults_are_stamped_with_current_versions() {
        assert_eq!(default_config()["version"], json!(CONFIG_VERSION));
        assert_eq!(default_tasks()["version"], json!(TASKS_VERSION));
    }

    #[test]
    fn fully_migrated_config_has_the_default_shape() {
        let v1 = object(json!({"version": 1, "window": {"x": 0, "y": 0}}));
        let migrated = config_chain().migrate_to_current(&v1).unwrap().into_owned();
        let default = object(default_config());

        let mut keys: Vec<_> = migrated.keys().collect();
        let mut expected: Vec<_> = default.keys().collect();
        keys.sort();
        expected.sort();
        assert_eq!(keys, expected);
        assert_eq!(migrated["stats"], default["stats"]);
        assert_eq!(migrated["options"], default["options"]);
        assert_eq!(migrated["window"], default["window"]);
    }

    #[test]
    fn config_step_fails_without_window_section() {
        let v1 = object(json!({"version": 1}));
        let err = config_chain().migrate_to_current(&v1).unwrap_err();
        assert!(err.to_string().contains("'window' section is missing"));
    }

    #[test]
    fn config_6_7_keeps_existing_templates_and_window_flag() {
        let mut doc = object(json!({
            "window": {"always_on_top": false},
            "task_templates": {"standup": {"name": "Standup"}},
        }));
        config_6_7(&mut doc).unwrap();
        assert_eq!(doc["window"]["always_on_top"], json!(false));
        assert_eq!(doc["task_templates"]["standup"]["name"], json!("Standup"));
        assert_eq!(doc["time_running"], json!(true));
    }

    #[test]
    fn tasks_migrate_from_legacy_hash_tickets() {
        let v1 = object(json!({
            "version": 1,
            "current_tasks": {
                "0": {"name": "Example", "ticket": "#1234", "elapsed_time": 4632},
                "1": {"name": "No ticket", "ticket": "", "elapsed_time": 0},
            },
        }));
        let migrated = tasks_chain().migrate_to_current(&v1).unwrap();
        let tasks = &migrated["current_tasks"];
        assert_eq!(tasks["0"]["ticket"], json!("1234"));
        assert_eq!(tasks["0"]["color_group"], json!("No color"));
        assert_eq!(tasks["0"]["ticket_title"], Value::Null);
        assert_eq!(tasks["1"]["notes"], json!(""));
        assert_eq!(migrated["version"], json!(TASKS_VERSION));
    }

    #[test]
    fn tasks_step_rejects_non_object_task() {
        let v2 = object(json!({"version": 2, "current_tasks": {"0": 7}}));
        let err = tasks_chain().migrate_to_current(&v2).unwrap_err();
        assert!(err.to_string().contains("task '0' is not an object"));
    }
}
