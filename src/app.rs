//! Application context: the single owner of both save files, the task
//! collection, and the session state the front end renders.

use serde_json::Value;

use crate::collection::TaskCollection;
use crate::error::{FstkError, Result};
use crate::model::{ColorGroup, TaskRecord};
use crate::remote::{self, UpdateInstaller};
use crate::settings::{self, Settings};
use crate::store::files::SaveFile;
use crate::store::workspace::Workspace;
use crate::worker::JobResult;

/// Seconds between automatic saves while the tick loop runs.
pub const AUTOSAVE_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Field edits for one task. Fields left `None` are not touched.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub name: Option<String>,
    pub ticket: Option<String>,
    pub color_group: Option<ColorGroup>,
    pub notes: Option<String>,
}

/// Something the front end should tell the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UpdateAvailable { latest: String },
    UpToDate,
    UpdateCheckFailed(String),
    InvalidCredentials,
}

#[derive(Debug)]
pub struct App {
    workspace: Workspace,
    tasks: TaskCollection,
    running: bool,
    show_changelog: bool,
}

impl App {
    /// Load the task collection and session flags, count the launch, and
    /// consume the one-time `first_run` flag.
    pub fn open(mut workspace: Workspace) -> Result<Self> {
        match start_session(&mut workspace) {
            Ok((tasks, running, show_changelog)) => {
                tracing::debug!(tasks = tasks.len(), running, "session opened");
                Ok(Self {
                    workspace,
                    tasks,
                    running,
                    show_changelog,
                })
            }
            Err(err) => {
                if let Err(release_err) = workspace.abandon() {
                    tracing::warn!(error = %release_err, "failed to release lock after open error");
                }
                Err(err)
            }
        }
    }

    /// Whether this is the first session after install or update.
    pub fn show_changelog(&self) -> bool {
        self.show_changelog
    }

    pub fn tasks(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn config(&self) -> &SaveFile {
        &self.workspace.config
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::from_store(&self.workspace.config)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause or resume time accrual. Persisted on shutdown.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn add_task(&mut self, task: TaskRecord) -> Result<usize> {
        let index = self.tasks.push(task);
        bump_counter(&mut self.workspace.config, "total_created_tasks")?;
        Ok(index)
    }

    pub fn delete_task(&mut self, index: usize) -> Result<TaskRecord> {
        let task = self.tasks.remove(index)?;
        bump_counter(&mut self.workspace.config, "total_deleted_tasks")?;
        Ok(task)
    }

    /// Apply every edit or none of them.
    pub fn edit_task(&mut self, index: usize, edit: TaskEdit) -> Result<()> {
        let mut task = self.tasks.get(index)?.clone();
        if let Some(name) = &edit.name {
            task.set_name(name)?;
        }
        if let Some(ticket) = &edit.ticket {
            task.set_ticket(ticket)?;
        }
        if let Some(color_group) = edit.color_group {
            task.set_color_group(color_group);
        }
        if let Some(notes) = edit.notes {
            task.set_notes(notes);
        }
        *self.tasks.get_mut(index)? = task;
        Ok(())
    }

    /// Add or remove time by hand; returns the new elapsed time.
    pub fn adjust_time(&mut self, index: usize, seconds: i64) -> Result<u64> {
        let task = self.tasks.get_mut(index)?;
        task.apply_delta(seconds);
        Ok(task.elapsed_time())
    }

    pub fn clear_time(&mut self, index: usize) -> Result<()> {
        self.tasks.get_mut(index)?.clear_time();
        bump_counter(&mut self.workspace.config, "total_time_clears")
    }

    pub fn move_task(&mut self, from: usize, to: usize) -> Result<()> {
        self.tasks.move_task(from, to)
    }

    /// Select the task that accrues time. Switching to a different task is
    /// counted.
    pub fn select(&mut self, index: Option<usize>) -> Result<()> {
        if self.tasks.select(index)? && index.is_some() {
            bump_counter(&mut self.workspace.config, "total_task_switches")?;
        }
        Ok(())
    }

    /// One-second timer tick. Returns whether any time accrued.
    pub fn tick(&mut self) -> bool {
        self.running && self.tasks.tick(1)
    }

    /// Write the collection into the tasks store (in memory only).
    pub fn flush_tasks(&mut self) -> Result<bool> {
        self.tasks.flush_to(&mut self.workspace.tasks)
    }

    /// Periodic save of both files. Cheap when nothing changed.
    pub fn autosave(&mut self) -> Result<()> {
        tracing::info!("autoflushing tasks to file");
        self.flush_tasks()?;
        self.workspace.save_all()
    }

    /// Set a configuration value by path. Returns whether the value changed.
    /// A change that would leave the config unreadable is refused and
    /// nothing is written.
    pub fn set_config_value(&mut self, path: &[&str], value: Value) -> Result<bool> {
        let before = Value::Object(self.workspace.config.snapshot());
        let after = settings::checked_change(&before, path, value.clone())?;
        self.workspace.config.document_mut().set_path(path, value)?;

        if settings::tracker_credentials_changed(&before, &after) {
            tracing::info!("issue tracker credentials changed");
        }
        Ok(settings::is_property_different(&before, &after, path))
    }

    /// Tickets whose titles should be looked up, or nothing when the issue
    /// tracker integration is off.
    pub fn tickets_to_resolve(&self) -> Result<Vec<String>> {
        if self.settings()?.options.redmine.enabled {
            Ok(self.tasks.tickets())
        } else {
            Ok(Vec::new())
        }
    }

    /// Apply a finished background job on the owning thread.
    pub fn apply_job_result(&mut self, result: JobResult) -> Option<Notice> {
        match result {
            JobResult::TicketTitles(titles) => {
                if titles.is_none() {
                    tracing::info!("ticket title lookup failed");
                }
                self.tasks.apply_ticket_titles(titles.as_ref());
                None
            }
            JobResult::CredentialsChecked {
                valid,
                user_requested,
            } => {
                if valid {
                    None
                } else {
                    tracing::info!("issue tracker credentials rejected");
                    user_requested.then_some(Notice::InvalidCredentials)
                }
            }
            JobResult::UpdateChecked {
                latest,
                user_requested,
            } => match latest {
                Ok(latest) if remote::is_newer_version(&latest, remote::RUNNING_VERSION) => {
                    tracing::info!(%latest, "new version available");
                    Some(Notice::UpdateAvailable {
                        latest: latest.trim().to_string(),
                    })
                }
                Ok(_) => user_requested.then_some(Notice::UpToDate),
                Err(err) => user_requested.then(|| Notice::UpdateCheckFailed(err.to_string())),
            },
        }
    }

    /// Install an update. On success the changelog is shown again on the next
    /// start; the caller then shuts down and calls [`App::restart`].
    pub fn install_update(&mut self, installer: &dyn UpdateInstaller, version: &str) -> Result<()> {
        installer.install(remote::PACKAGE_NAME, version)?;
        tracing::info!(%version, "update installed");
        self.workspace.config.set("first_run", true);
        Ok(())
    }

    /// Shut down cleanly, then hand the process over to the new build.
    pub fn restart(self, installer: &dyn UpdateInstaller) -> Result<()> {
        self.shutdown(None)?;
        installer.restart_process()
    }

    /// Record window geometry and running state, flush the tasks, save both
    /// files, and release the instance lock. Any failure is returned.
    pub fn shutdown(mut self, geometry: Option<WindowGeometry>) -> Result<()> {
        {
            let config = &mut self.workspace.config;
            if let Some(geometry) = geometry {
                let window = config.get_map_mut("window")?;
                window.set("x", geometry.x);
                window.set("y", geometry.y);
                window.set("w", geometry.w);
                window.set("h", geometry.h);
            }
            config.set("time_running", self.running);
        }
        self.flush_tasks()?;
        self.workspace.close()?;
        tracing::info!("shut down");
        Ok(())
    }
}

/// Returns the task collection, the running flag, and whether to show the
/// changelog.
fn start_session(workspace: &mut Workspace) -> Result<(TaskCollection, bool, bool)> {
    let tasks = TaskCollection::load(&workspace.tasks)?;
    let config = &mut workspace.config;

    let show_changelog = config.get("first_run")?.as_bool().unwrap_or(false);
    let running = config.get("time_running")?.as_bool().unwrap_or(true);
    bump_counter(config, "total_app_launches")?;
    config.set("first_run", false);
    Ok((tasks, running, show_changelog))
}

fn bump_counter(config: &mut SaveFile, counter: &str) -> Result<()> {
    let stats = config.get_map_mut("stats")?;
    let current = match stats.get(counter) {
        Ok(value) => value.as_u64().ok_or_else(|| {
            FstkError::InvalidDocument(format!("stats.{counter} is not a counter"))
        })?,
        Err(FstkError::KeyNotFound(_)) => 0,
        Err(err) => return Err(err),
    };
    stats.set(counter, current + 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::workspace::{CONFIG_FILE_NAME, TASKS_FILE_NAME};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    fn open_app() -> (TempDir, App) {
        let dir = tempdir().unwrap();
        let app = App::open(Workspace::open(dir.path()).unwrap()).unwrap();
        (dir, app)
    }

    fn reopen(dir: &TempDir) -> App {
        App::open(Workspace::open(dir.path()).unwrap()).unwrap()
    }

    #[test]
    fn first_session_shows_changelog_once() {
        let (dir, app) = open_app();
        assert!(app.show_changelog());
        assert_eq!(app.tasks().len(), 1);
        app.shutdown(None).unwrap();

        let app = reopen(&dir);
        assert!(!app.show_changelog());
        assert_eq!(app.settings().unwrap().stats.total_app_launches, 2);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn failed_open_releases_the_lock() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(TASKS_FILE_NAME),
            r#"{"version": 3, "current_tasks": {"0": {"name": "   "}}}"#,
        )
        .unwrap();

        let err = App::open(Workspace::open(dir.path()).unwrap()).unwrap_err();
        assert!(matches!(err, FstkError::Validation { field: "name", .. }));
        Workspace::open(dir.path()).unwrap().abandon().unwrap();
    }

    #[test]
    fn counters_track_task_lifecycle() {
        let (_dir, mut app) = open_app();
        let idx = app.add_task(TaskRecord::new("Write report", "#77").unwrap()).unwrap();
        app.select(Some(idx)).unwrap();
        app.select(Some(idx)).unwrap();
        app.select(Some(0)).unwrap();
        app.clear_time(0).unwrap();
        app.delete_task(idx).unwrap();

        let stats = app.settings().unwrap().stats;
        assert_eq!(stats.total_created_tasks, 1);
        assert_eq!(stats.total_task_switches, 2);
        assert_eq!(stats.total_time_clears, 1);
        assert_eq!(stats.total_deleted_tasks, 1);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn tick_accrues_only_while_running_and_selected() {
        let (_dir, mut app) = open_app();
        let before = app.tasks().get(0).unwrap().elapsed_time();
        assert!(!app.tick());

        app.select(Some(0)).unwrap();
        assert!(app.tick());
        app.set_running(false);
        assert!(!app.tick());
        assert_eq!(app.tasks().get(0).unwrap().elapsed_time(), before + 1);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn invalid_edit_changes_nothing() {
        let (_dir, mut app) = open_app();
        let before = app.tasks().get(0).unwrap().clone();
        let err = app
            .edit_task(
                0,
                TaskEdit {
                    name: Some("Renamed".into()),
                    ticket: Some("not a number".into()),
                    ..TaskEdit::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, FstkError::Validation { field: "ticket", .. }));
        assert_eq!(app.tasks().get(0).unwrap(), &before);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn autosave_is_a_noop_when_nothing_changed() {
        let (dir, mut app) = open_app();
        app.autosave().unwrap();

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let tasks_path = dir.path().join(TASKS_FILE_NAME);
        fs::write(&config_path, "config sentinel").unwrap();
        fs::write(&tasks_path, "tasks sentinel").unwrap();

        app.autosave().unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "config sentinel");
        assert_eq!(fs::read_to_string(&tasks_path).unwrap(), "tasks sentinel");

        app.adjust_time(0, 5).unwrap();
        app.autosave().unwrap();
        assert_ne!(fs::read_to_string(&tasks_path).unwrap(), "tasks sentinel");
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "config sentinel");
    }

    #[test]
    fn shutdown_persists_geometry_running_state_and_tasks() {
        let (dir, mut app) = open_app();
        app.add_task(TaskRecord::new("Second", "").unwrap()).unwrap();
        app.move_task(1, 0).unwrap();
        app.set_running(false);
        app.shutdown(Some(WindowGeometry { x: 10, y: 20, w: 300, h: 400 }))
            .unwrap();

        let app = reopen(&dir);
        let settings = app.settings().unwrap();
        assert_eq!(settings.window.x, 10);
        assert_eq!(settings.window.h, 400);
        assert!(!settings.time_running);
        assert!(!app.is_running());
        let names: Vec<_> = app.tasks().iter().map(TaskRecord::name).collect();
        assert_eq!(names, vec!["Second", "Example task"]);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn set_config_value_reports_effective_change() {
        let (_dir, mut app) = open_app();
        assert!(app
            .set_config_value(&["options", "switch_reminder"], Value::Bool(true))
            .unwrap());
        assert!(!app
            .set_config_value(&["options", "switch_reminder"], Value::Bool(true))
            .unwrap());
        assert!(app.config().is_dirty());
        assert!(app.settings().unwrap().options.switch_reminder);
        assert!(app.set_config_value(&["nope", "x"], Value::Null).is_err());
        app.shutdown(None).unwrap();
    }

    #[test]
    fn config_changes_that_break_the_schema_are_refused() {
        let (dir, mut app) = open_app();
        app.autosave().unwrap();
        assert!(matches!(
            app.set_config_value(&["version"], Value::from(99)),
            Err(FstkError::Validation { .. })
        ));
        assert!(matches!(
            app.set_config_value(&["stats"], Value::from(5)),
            Err(FstkError::Validation { .. })
        ));
        assert!(!app.config().is_dirty());
        app.add_task(TaskRecord::new("Still counting", "").unwrap())
            .unwrap();
        app.shutdown(None).unwrap();

        let app = reopen(&dir);
        let settings = app.settings().unwrap();
        assert_eq!(settings.version, 7);
        assert_eq!(settings.stats.total_created_tasks, 1);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn job_results_become_notices_only_when_requested() {
        let (_dir, mut app) = open_app();
        assert_eq!(
            app.apply_job_result(JobResult::UpdateChecked {
                latest: Ok("999.0.0".into()),
                user_requested: false,
            }),
            Some(Notice::UpdateAvailable {
                latest: "999.0.0".into()
            })
        );
        assert_eq!(
            app.apply_job_result(JobResult::UpdateChecked {
                latest: Ok(remote::RUNNING_VERSION.into()),
                user_requested: false,
            }),
            None
        );
        assert_eq!(
            app.apply_job_result(JobResult::UpdateChecked {
                latest: Err(FstkError::Remote("offline".into())),
                user_requested: true,
            }),
            Some(Notice::UpdateCheckFailed("remote call failed: offline".into()))
        );
        assert_eq!(
            app.apply_job_result(JobResult::CredentialsChecked {
                valid: false,
                user_requested: false,
            }),
            None
        );
        app.shutdown(None).unwrap();
    }

    #[test]
    fn ticket_titles_apply_to_the_collection() {
        let (_dir, mut app) = open_app();
        assert!(app.tickets_to_resolve().unwrap().is_empty());
        app.set_config_value(&["options", "redmine", "enabled"], Value::Bool(true))
            .unwrap();
        assert_eq!(app.tickets_to_resolve().unwrap(), vec!["1234"]);

        let titles = std::collections::HashMap::from([("1234".to_string(), "Demo".to_string())]);
        app.apply_job_result(JobResult::TicketTitles(Some(titles)));
        assert_eq!(app.tasks().get(0).unwrap().ticket_title(), Some("Demo"));
        app.shutdown(None).unwrap();
    }

    struct FakeInstaller {
        installed: Mutex<Vec<String>>,
        fail: bool,
    }

    impl UpdateInstaller for FakeInstaller {
        fn latest_version(&self) -> Result<String> {
            Ok("9.9.9".into())
        }

        fn install(&self, package_name: &str, version: &str) -> Result<()> {
            if self.fail {
                return Err(FstkError::Remote("pip exited with code 1".into()));
            }
            self.installed
                .lock()
                .unwrap()
                .push(format!("{package_name}=={version}"));
            Ok(())
        }

        fn restart_process(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn successful_update_rearms_changelog() {
        let (dir, mut app) = open_app();
        let installer = FakeInstaller {
            installed: Mutex::new(Vec::new()),
            fail: false,
        };
        app.install_update(&installer, "9.9.9").unwrap();
        assert_eq!(*installer.installed.lock().unwrap(), vec!["fstk==9.9.9"]);
        app.restart(&installer).unwrap();

        let app = reopen(&dir);
        assert!(app.show_changelog());
        app.shutdown(None).unwrap();
    }

    #[test]
    fn failed_update_keeps_session_usable() {
        let (_dir, mut app) = open_app();
        let installer = FakeInstaller {
            installed: Mutex::new(Vec::new()),
            fail: true,
        };
        assert!(matches!(
            app.install_update(&installer, "9.9.9"),
            Err(FstkError::Remote(_))
        ));
        assert!(!app.config().get("first_run").unwrap().as_bool().unwrap());
        app.shutdown(None).unwrap();
    }
}
