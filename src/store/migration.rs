//! Sequential schema migration for save-file documents.
//!
//! A [`MigrationChain`] holds one step per adjacent version pair. Migrating
//! from `n` to `m` applies `n -> n+1`, `n+1 -> n+2`, ... in order on a private
//! copy of the document; the caller's document is never modified, and a gap
//! in the chain or a failing step aborts the whole migration.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::{FstkError, Result};

/// Version assumed for documents written before versions were stamped.
pub const UNVERSIONED: u32 = 1;

pub type StepResult = std::result::Result<(), String>;

/// A pure transformation from version `from` to version `to` (`from + 1`).
/// Returns a human-readable reason on failure.
pub type StepFn = fn(&mut Map<String, Value>) -> StepResult;

#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub from: u32,
    pub to: u32,
    pub description: &'static str,
    pub apply: StepFn,
}

impl MigrationStep {
    pub const fn new(from: u32, description: &'static str, apply: StepFn) -> Self {
        Self {
            from,
            to: from + 1,
            description,
            apply,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationChain {
    kind: &'static str,
    current: u32,
    steps: Vec<MigrationStep>,
}

impl MigrationChain {
    pub fn new(kind: &'static str, current: u32, steps: Vec<MigrationStep>) -> Self {
        Self {
            kind,
            current,
            steps,
        }
    }

    /// Document kind this chain migrates, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Schema version the running build reads and writes.
    pub fn current_version(&self) -> u32 {
        self.current
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Unregister the step starting at `from`, returning it if present.
    pub fn remove_step(&mut self, from: u32) -> Option<MigrationStep> {
        let idx = self.steps.iter().position(|step| step.from == from)?;
        Some(self.steps.remove(idx))
    }

    fn step(&self, from: u32, to: u32) -> Option<&MigrationStep> {
        self.steps
            .iter()
            .find(|step| step.from == from && step.to == to)
    }

    /// Bring `document` from version `from` to version `to`.
    ///
    /// Returns the input unchanged (borrowed) when `from == to`; otherwise an
    /// owned copy with every step applied and `version` stamped to `to`.
    pub fn migrate<'a>(
        &self,
        from: u32,
        to: u32,
        document: &'a Map<String, Value>,
    ) -> Result<Cow<'a, Map<String, Value>>> {
        if to < from {
            tracing::error!(
                kind = self.kind,
                from,
                to,
                "refusing to migrate save file to a lower version"
            );
            return Err(FstkError::Migration(format!(
                "cannot downgrade {} save file from version {from} to version {to}",
                self.kind
            )));
        }

        if from == to {
            tracing::debug!(kind = self.kind, version = from, "nothing to migrate");
            return Ok(Cow::Borrowed(document));
        }

        let mut working = document.clone();
        for version in from..to {
            let next = version + 1;
            let Some(step) = self.step(version, next) else {
                tracing::error!(kind = self.kind, from = version, to = next, "missing migration step");
                return Err(FstkError::Migration(format!(
                    "missing migration step for {} save file from version {version} to version {next}",
                    self.kind
                )));
            };

            if let Err(reason) = (step.apply)(&mut working) {
                tracing::error!(
                    kind = self.kind,
                    from = version,
                    to = next,
                    %reason,
                    "migration step failed"
                );
                return Err(FstkError::Migration(format!(
                    "error migrating {} save file from version {version} to version {next}: {reason}",
                    self.kind
                )));
            }

            tracing::info!(
                kind = self.kind,
                from = version,
                to = next,
                step = step.description,
                "migrated save file"
            );
        }

        working.insert("version".into(), Value::from(to));
        Ok(Cow::Owned(working))
    }

    /// Migrate from the document's own `version` to [`Self::current_version`].
    pub fn migrate_to_current<'a>(
        &self,
        document: &'a Map<String, Value>,
    ) -> Result<Cow<'a, Map<String, Value>>> {
        let from = document_version(document)?;
        self.migrate(from, self.current, document)
    }
}

/// Read the `version` stamp of a raw document.
pub fn document_version(document: &Map<String, Value>) -> Result<u32> {
    match document.get("version") {
        None => Ok(UNVERSIONED),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                FstkError::InvalidDocument(format!("'version' is not a schema version: {value}"))
            }),
    }
}

/// The mapping at `key`, or a step failure reason naming it.
pub fn section_mut<'a>(
    document: &'a mut Map<String, Value>,
    key: &str,
) -> std::result::Result<&'a mut Map<String, Value>, String> {
    document
        .get_mut(key)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| format!("'{key}' section is missing or not an object"))
}
