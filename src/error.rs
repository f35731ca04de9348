use thiserror::Error;

#[derive(Debug, Error)]
pub enum FstkError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("value at '{0}' is not a mapping")]
    NotAMapping(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("invalid save file: {0}")]
    InvalidDocument(String),

    #[error("task {0} not found")]
    TaskNotFound(usize),

    #[error("another instance is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error("could not determine config directory (no HOME or XDG_CONFIG_HOME)")]
    NoConfigDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FstkError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::KeyNotFound(_) => "key_not_found",
            Self::NotAMapping(_) => "not_a_mapping",
            Self::Migration(_) => "migration_error",
            Self::InvalidDocument(_) => "invalid_document",
            Self::TaskNotFound(_) => "task_not_found",
            Self::AlreadyRunning(_) => "already_running",
            Self::Remote(_) => "remote_error",
            Self::NoConfigDir => "no_config_dir",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// Errors that must abort startup rather than be shown inline.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Migration(_)
                | Self::InvalidDocument(_)
                | Self::AlreadyRunning(_)
                | Self::NoConfigDir
                | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FstkError>;
