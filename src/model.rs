use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{FstkError, Result};

/// Upper bound (exclusive) for issue tracker ticket numbers.
pub const MAX_TICKET: u64 = 1_000_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ColorGroup {
    #[default]
    #[serde(rename = "No color")]
    #[value(name = "none")]
    NoColor,
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
    Purple,
}

impl ColorGroup {
    pub const ALL: [ColorGroup; 7] = [
        Self::NoColor,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Orange,
        Self::Red,
        Self::Purple,
    ];

    /// Key stored in save files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoColor => "No color",
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Orange => "Orange",
            Self::Red => "Red",
            Self::Purple => "Purple",
        }
    }
}

impl std::fmt::Display for ColorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip the display-only `#` decoration and surrounding spaces from a ticket.
pub fn normalize_ticket(text: &str) -> &str {
    text.trim_matches(|c| c == '#' || c == ' ')
}

/// Accepts an empty ticket or an integer in `1..MAX_TICKET`, with or without
/// the `#` prefix. Returns the canonical stored form.
pub fn validate_ticket(text: &str) -> Result<String> {
    let raw = normalize_ticket(text);
    if raw.is_empty() {
        return Ok(String::new());
    }

    let n: i64 = raw.parse().map_err(|_| {
        FstkError::validation("ticket", "The number is invalid. It must be an integer")
    })?;
    if n > 0 && n.unsigned_abs() < MAX_TICKET {
        Ok(n.to_string())
    } else {
        Err(FstkError::validation(
            "ticket",
            format!("The number must be between 0 and {MAX_TICKET}"),
        ))
    }
}

pub fn validate_name(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FstkError::validation("name", "The text cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Render seconds as `HH:MM:SS`; hours are not wrapped.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Durable state of one task.
///
/// Fields are private so that the name/ticket rules and the non-negative
/// elapsed time hold for every value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct TaskRecord {
    name: String,
    ticket: String,
    elapsed_time: u64,
    color_group: ColorGroup,
    ticket_title: Option<String>,
    notes: String,
}

/// Persisted shape before validation. Older or hand-edited files may omit
/// optional fields or carry a negative time.
#[derive(Deserialize)]
struct RawRecord {
    name: String,
    #[serde(default)]
    ticket: String,
    #[serde(default)]
    elapsed_time: i64,
    #[serde(default)]
    color_group: ColorGroup,
    #[serde(default)]
    ticket_title: Option<String>,
    #[serde(default)]
    notes: String,
}

impl TryFrom<RawRecord> for TaskRecord {
    type Error = FstkError;

    fn try_from(raw: RawRecord) -> Result<Self> {
        Ok(Self {
            name: validate_name(&raw.name)?,
            ticket: validate_ticket(&raw.ticket)?,
            elapsed_time: raw.elapsed_time.max(0).unsigned_abs(),
            color_group: raw.color_group,
            ticket_title: raw.ticket_title,
            notes: raw.notes,
        })
    }
}

impl TaskRecord {
    pub fn new(name: &str, ticket: &str) -> Result<Self> {
        Ok(Self {
            name: validate_name(name)?,
            ticket: validate_ticket(ticket)?,
            elapsed_time: 0,
            color_group: ColorGroup::default(),
            ticket_title: None,
            notes: String::new(),
        })
    }

    pub fn with_elapsed_time(mut self, seconds: u64) -> Self {
        self.elapsed_time = seconds;
        self
    }

    pub fn with_color_group(mut self, color_group: ColorGroup) -> Self {
        self.color_group = color_group;
        self
    }

    pub fn with_ticket_title(mut self, title: Option<String>) -> Self {
        self.ticket_title = title;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticket number without the `#` decoration; empty when unset.
    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    pub fn has_ticket(&self) -> bool {
        !self.ticket.is_empty()
    }

    /// `#1234`, or empty when no ticket is set.
    pub fn display_ticket(&self) -> String {
        if self.ticket.is_empty() {
            String::new()
        } else {
            format!("#{}", self.ticket)
        }
    }

    pub fn elapsed_time(&self) -> u64 {
        self.elapsed_time
    }

    pub fn color_group(&self) -> ColorGroup {
        self.color_group
    }

    /// `None` until the title has been resolved, or when resolution failed.
    pub fn ticket_title(&self) -> Option<&str> {
        self.ticket_title.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.name = validate_name(name)?;
        Ok(())
    }

    /// A changed ticket invalidates the cached title.
    pub fn set_ticket(&mut self, ticket: &str) -> Result<()> {
        let ticket = validate_ticket(ticket)?;
        if ticket != self.ticket {
            self.ticket = ticket;
            self.ticket_title = None;
        }
        Ok(())
    }

    pub fn set_color_group(&mut self, color_group: ColorGroup) {
        self.color_group = color_group;
    }

    pub fn set_ticket_title(&mut self, title: Option<String>) {
        self.ticket_title = title;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// `elapsed_time = max(0, elapsed_time + seconds)`.
    pub fn apply_delta(&mut self, seconds: i64) {
        self.elapsed_time = self.elapsed_time.saturating_add_signed(seconds);
    }

    pub fn clear_time(&mut self) {
        self.apply_delta(i64::MIN);
    }

    /// Persisted shape. `ticket_title` is always present, `null` when unresolved.
    pub fn to_record(&self) -> Value {
        json!({
            "name": self.name,
            "ticket": self.ticket,
            "elapsed_time": self.elapsed_time,
            "color_group": self.color_group.as_str(),
            "ticket_title": self.ticket_title,
            "notes": self.notes,
        })
    }

    pub fn from_record(record: &Value) -> Result<Self> {
        let raw = RawRecord::deserialize(record)?;
        Self::try_from(raw)
    }
}
