use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::Value;

use crate::collection::TaskCollection;
use crate::error::Result;
use crate::model::{ColorGroup, TaskRecord, format_time};
use crate::settings::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
}

/// One task as the CLI reports it.
#[derive(Debug, Serialize)]
pub struct TaskView<'a> {
    pub index: usize,
    #[serde(flatten)]
    pub task: &'a TaskRecord,
    pub elapsed: String,
    pub duplicated_ticket: bool,
    pub selected: bool,
}

impl<'a> TaskView<'a> {
    pub fn of(tasks: &'a TaskCollection, index: usize) -> Result<Self> {
        let task = tasks.get(index)?;
        Ok(Self {
            index,
            task,
            elapsed: format_time(task.elapsed_time()),
            duplicated_ticket: tasks.is_duplicated(index),
            selected: tasks.selected() == Some(index),
        })
    }
}

#[derive(Debug, Serialize)]
struct TaskListView<'a> {
    tasks: Vec<TaskView<'a>>,
    total_time: u64,
    total: String,
}

fn paint(text: &str, color_group: ColorGroup) -> ColoredString {
    match color_group {
        ColorGroup::NoColor => text.normal(),
        ColorGroup::Blue => text.blue(),
        ColorGroup::Green => text.green(),
        ColorGroup::Yellow => text.yellow(),
        ColorGroup::Orange => text.truecolor(255, 165, 0),
        ColorGroup::Red => text.red(),
        ColorGroup::Purple => text.magenta(),
    }
}

fn pretty_line(view: &TaskView<'_>) -> String {
    let marker = if view.selected { "▶" } else { " " };
    let ticket = view.task.display_ticket();
    let ticket = if view.duplicated_ticket {
        format!("{ticket:8}").red().bold()
    } else {
        format!("{ticket:8}").normal()
    };
    let title = view
        .task
        .ticket_title()
        .map(|t| format!(" {}", format!("({t})").dimmed()))
        .unwrap_or_default();
    format!(
        "{marker}{:>3} {} {}{} {}",
        view.index,
        ticket,
        paint(view.task.name(), view.task.color_group()),
        title,
        view.elapsed.bold()
    )
}

pub fn print_task(view: &TaskView<'_>, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(view)?),
        Format::Pretty => {
            println!("{}", pretty_line(view));
            if !view.task.notes().is_empty() {
                println!("      {} {}", "notes:".dimmed(), view.task.notes());
            }
        }
    }
    Ok(())
}

pub fn print_tasks(tasks: &TaskCollection, format: Format) -> Result<()> {
    let views = (0..tasks.len())
        .map(|i| TaskView::of(tasks, i))
        .collect::<Result<Vec<_>>>()?;
    let total_time = tasks.total_time();
    match format {
        Format::Json => {
            let list = TaskListView {
                tasks: views,
                total_time,
                total: format_time(total_time),
            };
            println!("{}", serde_json::to_string(&list)?);
        }
        Format::Pretty => {
            if views.is_empty() {
                println!("{}", "No tasks.".dimmed());
            }
            for view in &views {
                println!("{}", pretty_line(view));
            }
            println!("{}", "-".repeat(40));
            println!("{:>13} {}", "total", format_time(total_time).bold());
        }
    }
    Ok(())
}

pub fn print_stats(stats: &Stats, total_time: u64, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let mut value = serde_json::to_value(stats)?;
            if let Value::Object(map) = &mut value {
                map.insert("total_time".into(), total_time.into());
            }
            println!("{value}");
        }
        Format::Pretty => {
            let rows = [
                ("tasks created", stats.total_created_tasks),
                ("tasks deleted", stats.total_deleted_tasks),
                ("time clears", stats.total_time_clears),
                ("app launches", stats.total_app_launches),
                ("task switches", stats.total_task_switches),
            ];
            for (label, count) in rows {
                println!("  {:14} {}", format!("{label}:").dimmed(), count);
            }
            println!(
                "  {:14} {}",
                "tracked:".dimmed(),
                format_time(total_time).bold()
            );
        }
    }
    Ok(())
}

pub fn print_value(value: &Value, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(value)?),
        Format::Pretty => match value {
            Value::String(s) => println!("{s}"),
            other => println!("{}", serde_json::to_string_pretty(other)?),
        },
    }
    Ok(())
}
