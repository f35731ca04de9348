use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{FstkError, Result};

/// Single-instance guard: a PID file held under an exclusive advisory lock.
///
/// A PID file left behind by a crashed process is not locked by anyone, so
/// it is treated as stale and overwritten. The OS drops the lock when the
/// owning process exits, however it exits.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            let pid = read_pid(&mut file).unwrap_or(0);
            tracing::warn!(pid, "there is another instance running");
            return Err(FstkError::AlreadyRunning(pid));
        }

        match read_pid(&mut file) {
            Some(stale) => {
                tracing::warn!(pid = stale, path = %path.display(), "found a stale lock file, cleaning up");
            }
            None => tracing::debug!(path = %path.display(), "lock file not present"),
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the PID file and drop the lock.
    pub fn release(self) -> Result<()> {
        tracing::debug!(path = %self.path.display(), "cleaning lock file for the current execution");
        fs::remove_file(&self.path)?;
        FileExt::unlock(&self.file)?;
        Ok(())
    }
}

fn read_pid(file: &mut File) -> Option<u32> {
    let mut content = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut content).ok()?;
    content.trim().parse().ok()
}
