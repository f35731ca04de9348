use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{FstkError, Result};
use crate::store::migration::MigrationChain;
use crate::store::schema::DocumentKind;
use crate::store::tracked::{DirtyFlag, TrackedMap, TrackedValue};

/// One JSON save file bound to its in-memory, change-tracked document.
///
/// The file handle stays open for the lifetime of the store. [`SaveFile::save`]
/// only touches the disk when something was `set` since the last save, so it
/// is cheap to call on every autosave tick.
#[derive(Debug)]
pub struct SaveFile {
    path: PathBuf,
    file: File,
    kind: &'static str,
    data: TrackedMap,
}

impl SaveFile {
    /// Open (creating if absent) the save file for `kind`, migrating it to the
    /// kind's current schema. Falls back to `default` when the file is empty
    /// or not a JSON object.
    pub fn open(path: &Path, kind: DocumentKind, default: Value) -> Result<Self> {
        Self::open_with_chain(path, &kind.chain(), default)
    }

    pub fn open_with_chain(path: &Path, chain: &MigrationChain, default: Value) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        let flag = DirtyFlag::new();
        let data = match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Object(map)) => {
                let migrated = chain.migrate_to_current(&map)?;
                let upgraded = matches!(migrated, std::borrow::Cow::Owned(_));
                let data = TrackedMap::from_json(migrated.into_owned(), &flag);
                if upgraded {
                    flag.mark_dirty();
                }
                data
            }
            Ok(other) => {
                tracing::warn!(
                    path = %path.display(),
                    found = json_type(&other),
                    "save file is not a JSON object, using default"
                );
                Self::fallback(default, &flag)?
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "exception occurred loading save file, using default"
                );
                Self::fallback(default, &flag)?
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            kind: chain.kind(),
            data,
        })
    }

    /// Deep-wrap the default document and mark it dirty so the first save
    /// replaces whatever invalid content is on disk.
    fn fallback(default: Value, flag: &DirtyFlag) -> Result<TrackedMap> {
        let Value::Object(map) = default else {
            return Err(FstkError::InvalidDocument(format!(
                "default document must be an object, got {}",
                json_type(&default)
            )));
        };
        let data = TrackedMap::from_json(map, flag);
        flag.mark_dirty();
        Ok(data)
    }

    /// Rewrite the file if and only if the document is dirty.
    /// Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool> {
        if !self.data.is_dirty() {
            tracing::info!(path = %self.path.display(), "save file has nothing to flush");
            return Ok(false);
        }

        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.data.serialize(&mut serializer)?;

        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&buf)?;
        self.file.flush()?;
        self.data.flag().mark_clean();

        tracing::info!(path = %self.path.display(), kind = self.kind, "flushed save file");
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn is_dirty(&self) -> bool {
        self.data.is_dirty()
    }

    pub fn version(&self) -> Result<i64> {
        self.data.get_i64("version")
    }

    pub fn get(&self, key: &str) -> Result<&TrackedValue> {
        self.data.get(key)
    }

    pub fn get_map(&self, key: &str) -> Result<&TrackedMap> {
        self.data.get_map(key)
    }

    pub fn get_map_mut(&mut self, key: &str) -> Result<&mut TrackedMap> {
        self.data.get_map_mut(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.set(key, value);
    }

    pub fn document(&self) -> &TrackedMap {
        &self.data
    }

    pub fn document_mut(&mut self) -> &mut TrackedMap {
        &mut self.data
    }

    /// Untracked copy of the whole document, for diffing and typed views.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.data.to_json_map()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
