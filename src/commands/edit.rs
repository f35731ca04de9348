use std::path::Path;

use crate::app::TaskEdit;
use crate::error::Result;
use crate::output::{self, Format, TaskView};

pub fn run(config_folder: &Path, index: usize, edit: TaskEdit, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| {
        app.edit_task(index, edit)?;
        output::print_task(&TaskView::of(app.tasks(), index)?, format)
    })
}
