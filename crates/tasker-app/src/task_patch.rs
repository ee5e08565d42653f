use std::collections::BTreeSet;

use tasker_core::{ListId, Priority, TagId, Task};
use time::OffsetDateTime;

/// Difference between two sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// Entries present in the desired set but missing from the current set.
    pub added: Vec<T>,
    /// Entries present in the current set but removed from the desired set.
    pub removed: Vec<T>,
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T> SetDiff<T> {
    /// Returns true when both added/removed are empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl<T: PartialEq + Clone> SetDiff<T> {
    /// Apply the diff to an ordered list, keeping existing order and appending additions.
    pub fn apply(&self, target: &mut Vec<T>) {
        target.retain(|item| !self.removed.contains(item));
        for item in &self.added {
            if !target.contains(item) {
                target.push(item.clone());
            }
        }
    }
}

/// Compute differences between two sets.
#[must_use]
pub fn diff_sets<T: Ord + Clone>(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> SetDiff<T> {
    SetDiff {
        added: desired.difference(current).cloned().collect(),
        removed: current.difference(desired).cloned().collect(),
    }
}

/// Patch for the description body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionPatch {
    /// Overwrite with a new string.
    Set {
        /// Description body.
        description: String,
    },
    /// Clear the description.
    Clear,
}

/// Patch for the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuePatch {
    /// Set the due instant.
    Set {
        /// New due instant.
        due: OffsetDateTime,
    },
    /// Remove the due date.
    Clear,
}

/// Partial task update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// Overwrite the task title.
    pub title: Option<String>,
    /// Patch applied to the description.
    pub description: Option<DescriptionPatch>,
    /// Set the completion flag.
    pub completed: Option<bool>,
    /// Overwrite the priority.
    pub priority: Option<Priority>,
    /// Patch applied to the due date.
    pub due: Option<DuePatch>,
    /// Move the task to another list. Cascades to subtasks.
    pub list: Option<ListId>,
    /// Tag diffs.
    pub tags: SetDiff<TagId>,
}

impl TaskUpdate {
    /// Returns true when the update would not change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due.is_none()
            && self.list.is_none()
            && self.tags.is_empty()
    }

    /// Replace the tag set with `desired`, computing the diff against `task`.
    #[must_use]
    pub fn with_tags(mut self, task: &Task, desired: &[TagId]) -> Self {
        let current: BTreeSet<TagId> = task.tags.iter().cloned().collect();
        let desired: BTreeSet<TagId> = desired.iter().cloned().collect();
        self.tags = diff_sets(&current, &desired);
        self
    }

    /// Write every present field into `task`. Returns true when something changed.
    pub(crate) fn apply_to(&self, task: &mut Task) -> bool {
        let before = task.clone();
        if let Some(title) = &self.title {
            title.trim().clone_into(&mut task.title);
        }
        match &self.description {
            Some(DescriptionPatch::Set { description }) => task.description = Some(description.clone()),
            Some(DescriptionPatch::Clear) => task.description = None,
            None => {}
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        match self.due {
            Some(DuePatch::Set { due }) => task.due = Some(due),
            Some(DuePatch::Clear) => task.due = None,
            None => {}
        }
        if let Some(list) = &self.list {
            task.list = list.clone();
        }
        self.tags.apply(&mut task.tags);
        *task != before
    }
}

/// Partial list update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New color.
    pub color: Option<String>,
    /// New icon; `Some(None)` clears it.
    pub icon: Option<Option<String>>,
}

/// Partial tag update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New color.
    pub color: Option<String>,
}
