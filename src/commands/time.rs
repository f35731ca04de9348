use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use colored::Colorize;

use crate::app::{AUTOSAVE_INTERVAL_SECS, App};
use crate::error::Result;
use crate::model::format_time;
use crate::output::{self, Format, TaskView};

pub fn adjust(config_folder: &Path, index: usize, seconds: i64, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| {
        app.adjust_time(index, seconds)?;
        output::print_task(&TaskView::of(app.tasks(), index)?, format)
    })
}

pub fn clear(config_folder: &Path, index: usize, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| {
        app.clear_time(index)?;
        output::print_task(&TaskView::of(app.tasks(), index)?, format)
    })
}

pub fn pause(config_folder: &Path, format: Format) -> Result<()> {
    set_running(config_folder, false, format)
}

pub fn resume(config_folder: &Path, format: Format) -> Result<()> {
    set_running(config_folder, true, format)
}

fn set_running(config_folder: &Path, running: bool, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| {
        app.set_running(running);
        match format {
            Format::Json => println!("{}", serde_json::json!({ "time_running": running })),
            Format::Pretty if running => println!("{}", "Time tracking resumed".green()),
            Format::Pretty => println!("{}", "Time tracking paused".yellow()),
        }
        Ok(())
    })
}

/// Track time on one task, once per second, until `duration` seconds have
/// passed or the process is interrupted. An interrupt ends the loop so the
/// session still shuts down and saves.
pub fn run(
    config_folder: &Path,
    index: usize,
    duration: Option<u64>,
    format: Format,
) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let interrupted = Arc::clone(&stop);
    if let Err(err) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }

    super::with_app(config_folder, |app| {
        app.select(Some(index))?;
        app.set_running(true);
        if format == Format::Pretty {
            let task = app.tasks().get(index)?;
            println!(
                "Tracking {} from {}",
                task.name().bold(),
                format_time(task.elapsed_time())
            );
        }
        let ticks = tick_loop(app, duration, &stop, || thread::sleep(Duration::from_secs(1)))?;
        if stop.load(Ordering::SeqCst) {
            tracing::info!(ticks, "interrupted, shutting down");
        }
        output::print_task(&TaskView::of(app.tasks(), index)?, format)
    })
}

/// Drive the one-second timer until `duration` ticks have run or `stop` is
/// set. `wait` blocks for one tick. Both files are autosaved every
/// [`AUTOSAVE_INTERVAL_SECS`] ticks.
pub fn tick_loop(
    app: &mut App,
    duration: Option<u64>,
    stop: &AtomicBool,
    mut wait: impl FnMut(),
) -> Result<u64> {
    let mut ticks = 0;
    while !stop.load(Ordering::SeqCst) && duration.is_none_or(|limit| ticks < limit) {
        wait();
        app.tick();
        ticks += 1;
        if ticks % AUTOSAVE_INTERVAL_SECS == 0 {
            app.autosave()?;
        }
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::workspace::{LOCK_FILE_NAME, TASKS_FILE_NAME, Workspace};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn tick_loop_accrues_and_autosaves_each_minute() {
        let dir = tempdir().unwrap();
        let mut app = App::open(Workspace::open(dir.path()).unwrap()).unwrap();
        app.select(Some(0)).unwrap();
        let start = app.tasks().get(0).unwrap().elapsed_time();

        let mut waits = 0;
        let tasks_path = dir.path().join(TASKS_FILE_NAME);
        let ticks = tick_loop(&mut app, Some(60), &AtomicBool::new(false), || {
            waits += 1;
            if waits == 60 {
                assert!(fs::read_to_string(&tasks_path).unwrap().is_empty());
            }
        })
        .unwrap();
        assert_eq!(ticks, 60);

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&tasks_path).unwrap()).unwrap();
        assert_eq!(on_disk["current_tasks"]["0"]["elapsed_time"], start + 60);
        app.shutdown(None).unwrap();
    }

    #[test]
    fn stop_flag_ends_an_open_ended_run_and_shutdown_keeps_the_time() {
        let dir = tempdir().unwrap();
        let mut app = App::open(Workspace::open(dir.path()).unwrap()).unwrap();
        app.select(Some(0)).unwrap();
        let start = app.tasks().get(0).unwrap().elapsed_time();

        let stop = AtomicBool::new(false);
        let mut waits = 0;
        let ticks = tick_loop(&mut app, None, &stop, || {
            waits += 1;
            if waits == 5 {
                stop.store(true, Ordering::SeqCst);
            }
        })
        .unwrap();
        assert_eq!(ticks, 5);
        app.shutdown(None).unwrap();

        let tasks_path = dir.path().join(TASKS_FILE_NAME);
        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&tasks_path).unwrap()).unwrap();
        assert_eq!(on_disk["current_tasks"]["0"]["elapsed_time"], start + 5);
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
    }
}
