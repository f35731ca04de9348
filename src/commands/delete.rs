use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::output::Format;

pub fn run(config_folder: &Path, index: usize, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| {
        let task = app.delete_task(index)?;
        tracing::info!(index, name = task.name(), "task deleted");
        match format {
            Format::Json => println!(
                "{}",
                serde_json::json!({ "deleted": index, "task": task })
            ),
            Format::Pretty => println!("Deleted task {} ({})", index, task.name().bold()),
        }
        Ok(())
    })
}
