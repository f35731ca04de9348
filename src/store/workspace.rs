use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FstkError, Result};
use crate::store::files::SaveFile;
use crate::store::lock::InstanceLock;
use crate::store::schema::DocumentKind;

pub const CONFIG_FOLDER_ENV: &str = "FSTK_CONFIG_FOLDER";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const TASKS_FILE_NAME: &str = "tasks.json";
pub const LOCK_FILE_NAME: &str = "fstk.lock";

/// `~/.config/fstk` on Linux, the platform equivalent elsewhere.
pub fn default_config_folder() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("fstk"))
        .ok_or(FstkError::NoConfigDir)
}

/// The config folder of one running instance: both save files plus the
/// single-instance lock that guards them.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    pub config: SaveFile,
    pub tasks: SaveFile,
    lock: InstanceLock,
}

impl Workspace {
    /// Create the folder if needed, take the instance lock, then open and
    /// migrate both save files. The lock is released again if either file
    /// cannot be opened.
    pub fn open(root: &Path) -> Result<Self> {
        if root.is_dir() {
            tracing::debug!(path = %root.display(), "config folder already existing");
        } else {
            fs::create_dir_all(root)?;
            tracing::debug!(path = %root.display(), "config folder created");
        }

        let lock = InstanceLock::acquire(&root.join(LOCK_FILE_NAME))?;

        let stores = SaveFile::open(
            &root.join(CONFIG_FILE_NAME),
            DocumentKind::Config,
            DocumentKind::Config.default_document(),
        )
        .and_then(|config| {
            let tasks = SaveFile::open(
                &root.join(TASKS_FILE_NAME),
                DocumentKind::Tasks,
                DocumentKind::Tasks.default_document(),
            )?;
            Ok((config, tasks))
        });

        match stores {
            Ok((config, tasks)) => Ok(Self {
                root: root.to_path_buf(),
                config,
                tasks,
                lock,
            }),
            Err(err) => {
                if let Err(release_err) = lock.release() {
                    tracing::warn!(error = %release_err, "failed to release lock after open error");
                }
                Err(err)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Save both files; each is a no-op when clean.
    pub fn save_all(&mut self) -> Result<()> {
        self.config.save()?;
        self.tasks.save()?;
        Ok(())
    }

    /// Final save of both files, then release the lock. A failed save is
    /// returned before the lock is touched.
    pub fn close(mut self) -> Result<()> {
        self.save_all()?;
        self.lock.release()
    }

    /// Release the lock without saving anything.
    pub fn abandon(self) -> Result<()> {
        self.lock.release()
    }
}
