use std::path::Path;

use crate::error::Result;
use crate::output::{self, Format};

pub fn run(config_folder: &Path, format: Format) -> Result<()> {
    super::with_app(config_folder, |app| output::print_tasks(app.tasks(), format))
}
