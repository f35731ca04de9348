use std::path::Path;

use crate::error::Result;
use crate::model::{ColorGroup, TaskRecord};
use crate::output::{self, Format, TaskView};

pub fn run(
    config_folder: &Path,
    name: String,
    ticket: Option<String>,
    color_group: ColorGroup,
    notes: Option<String>,
    format: Format,
) -> Result<()> {
    let task = TaskRecord::new(&name, ticket.as_deref().unwrap_or_default())?
        .with_color_group(color_group)
        .with_notes(notes.unwrap_or_default());

    super::with_app(config_folder, |app| {
        let index = app.add_task(task)?;
        tracing::info!(index, "task created");
        output::print_task(&TaskView::of(app.tasks(), index)?, format)
    })
}
