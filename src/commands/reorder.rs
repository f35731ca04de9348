use std::path::Path;

use crate::error::Result;
use crate::output::{self, Format};

/// Move a task so that it ends up at position `to`.
pub fn run(config_folder: &Path, from: usize, to: usize, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| {
        app.move_task(from, to)?;
        output::print_tasks(app.tasks(), format)
    })
}
