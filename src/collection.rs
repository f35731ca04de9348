use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::error::{FstkError, Result};
use crate::model::TaskRecord;
use crate::store::files::SaveFile;

/// Key of the task mapping inside the tasks save file.
pub const CURRENT_TASKS: &str = "current_tasks";

/// Ordered set of active tasks plus the current selection.
///
/// Order is user-significant and survives a save/load cycle: tasks are
/// written under sequential index keys and read back in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCollection {
    tasks: Vec<TaskRecord>,
    selected: Option<usize>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(tasks: Vec<TaskRecord>) -> Self {
        Self {
            tasks,
            selected: None,
        }
    }

    /// Read `current_tasks` from the tasks save file, in file order.
    pub fn load(store: &SaveFile) -> Result<Self> {
        let current = store.get_map(CURRENT_TASKS)?;
        let tasks = current
            .iter()
            .map(|(_, record)| TaskRecord::from_record(&record.to_json()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_records(tasks))
    }

    /// Persisted form of `current_tasks`: `{"0": {...}, "1": {...}}`.
    pub fn to_document(&self) -> Map<String, Value> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (idx.to_string(), task.to_record()))
            .collect()
    }

    /// Replace `current_tasks` in the store when its content differs from
    /// this collection. Returns whether the store was touched.
    pub fn flush_to(&self, store: &mut SaveFile) -> Result<bool> {
        let document = Value::Object(self.to_document());
        let unchanged = match store.get(CURRENT_TASKS) {
            Ok(stored) => stored.to_json() == document,
            Err(FstkError::KeyNotFound(_)) => false,
            Err(err) => return Err(err),
        };
        if unchanged {
            return Ok(false);
        }
        store.set(CURRENT_TASKS, document);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter()
    }

    pub fn get(&self, index: usize) -> Result<&TaskRecord> {
        self.tasks.get(index).ok_or(FstkError::TaskNotFound(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut TaskRecord> {
        self.tasks
            .get_mut(index)
            .ok_or(FstkError::TaskNotFound(index))
    }

    /// Append a task, returning its index.
    pub fn push(&mut self, task: TaskRecord) -> usize {
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    /// Remove a task. The selection follows the remaining tasks and is
    /// cleared when the selected task itself is removed.
    pub fn remove(&mut self, index: usize) -> Result<TaskRecord> {
        self.get(index)?;
        let task = self.tasks.remove(index);
        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        Ok(task)
    }

    /// Move the task at `from` so that it ends up at `to`. The selected task
    /// stays selected.
    pub fn move_task(&mut self, from: usize, to: usize) -> Result<()> {
        self.get(from)?;
        self.get(to)?;
        let selected_task = self.selected;
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.selected = selected_task.map(|sel| {
            if sel == from {
                to
            } else if from < sel && sel <= to {
                sel - 1
            } else if to <= sel && sel < from {
                sel + 1
            } else {
                sel
            }
        });
        Ok(())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Change the selection; returns whether it changed.
    pub fn select(&mut self, index: Option<usize>) -> Result<bool> {
        if let Some(idx) = index {
            self.get(idx)?;
        }
        let changed = self.selected != index;
        self.selected = index;
        Ok(changed)
    }

    /// Accrue time on the selected task only. Returns false when nothing is
    /// selected.
    pub fn tick(&mut self, seconds: i64) -> bool {
        let Some(idx) = self.selected else {
            return false;
        };
        match self.tasks.get_mut(idx) {
            Some(task) => {
                task.apply_delta(seconds);
                true
            }
            None => false,
        }
    }

    pub fn total_time(&self) -> u64 {
        self.tasks.iter().map(TaskRecord::elapsed_time).sum()
    }

    /// Non-empty tickets held by more than one task.
    pub fn duplicated_tickets(&self) -> BTreeSet<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for task in self.tasks.iter().filter(|t| t.has_ticket()) {
            *counts.entry(task.ticket()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(ticket, _)| ticket.to_string())
            .collect()
    }

    pub fn is_duplicated(&self, index: usize) -> bool {
        self.tasks.get(index).is_some_and(|task| {
            task.has_ticket() && self.tasks.iter().filter(|t| t.ticket() == task.ticket()).count() > 1
        })
    }

    /// Distinct non-empty tickets, in first-seen order.
    pub fn tickets(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.tasks
            .iter()
            .filter(|t| t.has_ticket() && seen.insert(t.ticket()))
            .map(|t| t.ticket().to_string())
            .collect()
    }

    /// Apply an issue tracker lookup. `None` means the lookup failed as a
    /// whole; a ticket missing from the map was not found. Either way the
    /// cached title becomes `None`.
    pub fn apply_ticket_titles(&mut self, titles: Option<&HashMap<String, String>>) {
        for task in self.tasks.iter_mut().filter(|t| t.has_ticket()) {
            let title = titles.and_then(|map| map.get(task.ticket()).cloned());
            task.set_ticket_title(title);
        }
    }
}
