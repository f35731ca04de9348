pub mod config;
pub mod create;
pub mod delete;
pub mod edit;
pub mod list;
pub mod reorder;
pub mod stats;
pub mod time;

use std::path::Path;

use crate::app::App;
use crate::error::Result;
use crate::store::workspace::Workspace;

/// Open the config folder, run `action` against the session, and shut down.
///
/// Shutdown runs even when the action fails so that the lock is released and
/// usage counters are kept; the action's error wins over a shutdown error.
pub fn with_app<T>(config_folder: &Path, action: impl FnOnce(&mut App) -> Result<T>) -> Result<T> {
    let mut app = App::open(Workspace::open(config_folder)?)?;
    match action(&mut app) {
        Ok(value) => {
            app.shutdown(None)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(shutdown_err) = app.shutdown(None) {
                tracing::warn!(error = %shutdown_err, "shutdown after failed command");
            }
            Err(err)
        }
    }
}
