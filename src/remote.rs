//! Interfaces to the services the time keeper talks to but does not own:
//! the issue tracker and the package index used for self-update.
//!
//! Implementations are expected to do blocking network I/O and are called
//! from background jobs (see [`crate::worker`]), never from the thread that
//! owns the save files.
//!
//! No implementation ships with this crate. A front end that offers ticket
//! titles or self-update supplies its own and hands it to [`App`] and
//! [`Jobs`]; the bundled CLI does neither.
//!
//! [`App`]: crate::app::App
//! [`Jobs`]: crate::worker::Jobs

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::Result;

/// Name the application is published under in the package index.
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Version of the running build.
pub const RUNNING_VERSION: &str = env!("CARGO_PKG_VERSION");

pub trait IssueTracker: Send + Sync {
    /// Titles for the given ticket numbers. `None` means the lookup failed as
    /// a whole; tickets the tracker does not know are simply absent.
    fn resolve_titles(&self, ticket_ids: &[String]) -> Option<HashMap<String, String>>;

    fn credentials_valid(&self) -> bool;
}

pub trait UpdateInstaller: Send + Sync {
    /// Latest version published in the package index.
    fn latest_version(&self) -> Result<String>;

    /// Install `version` of `package_name`. Errors carry the installer's
    /// message.
    fn install(&self, package_name: &str, version: &str) -> Result<()>;

    /// Replace the running process with the freshly installed build. Only
    /// returns on failure.
    fn restart_process(&self) -> Result<()>;
}

/// Whether `candidate` should be offered as an update over `running`.
///
/// Dotted numeric versions (`1.10.0`, `v2.1`) compare component-wise with
/// missing components read as zero. Anything else falls back to "different
/// means newer".
pub fn is_newer_version(candidate: &str, running: &str) -> bool {
    match (parse_version(candidate), parse_version(running)) {
        (Some(candidate), Some(running)) => compare_versions(&candidate, &running) == Ordering::Greater,
        _ => candidate.trim() != running.trim(),
    }
}

fn parse_version(text: &str) -> Option<Vec<u64>> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);
    text.split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

fn compare_versions(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}
