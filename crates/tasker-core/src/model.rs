//! Records shared by the parser, the query engine and the storage layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::id::{ListId, TagId, TaskId};

/// Task priority. Variant order is the sort rank: none < low < medium < high.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// No priority assigned.
    #[default]
    None,
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// All priorities in rank order.
    pub const ALL: [Self; 4] = [Self::None, Self::Low, Self::Medium, Self::High];

    /// Numeric sort rank (none=0 .. high=3).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Lower-case name as written in the quick-add syntax.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a priority token is not recognized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    /// Accepts `none|low|medium|high` and the shorthands `1`..`4`
    /// (1=low, 2=medium, 3 and 4=high), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "1" | "low" => Ok(Self::Low),
            "2" | "medium" => Ok(Self::Medium),
            "3" | "4" | "high" => Ok(Self::High),
            _ => Err(UnknownPriority(s.to_owned())),
        }
    }
}

/// A single to-do item. Subtasks are stored as ordinary tasks whose
/// [`parent`](Self::parent) points at a top-level task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier.
    pub id: TaskId,
    /// Title shown in lists.
    pub title: String,
    /// Optional free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// End-of-day due instant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due: Option<OffsetDateTime>,
    /// Owning list.
    pub list: ListId,
    /// Parent task for subtasks; `None` for top-level tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TaskId>,
    /// Attached tag ids, in insertion order.
    #[serde(default)]
    pub tags: Vec<TagId>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    /// Last modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
    /// Manual sort key, strictly increasing in creation order.
    pub order: i64,
}

impl Task {
    /// Create an open, unprioritized top-level task.
    pub fn new(title: impl Into<String>, list: ListId, now: OffsetDateTime, order: i64) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into().trim().to_owned(),
            description: None,
            completed: false,
            priority: Priority::None,
            due: None,
            list,
            parent: None,
            tags: Vec::new(),
            created: now,
            updated: now,
            order,
        }
    }

    /// True when the task is a subtask.
    #[must_use]
    pub const fn is_subtask(&self) -> bool {
        self.parent.is_some()
    }

    /// True when the task carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &TagId) -> bool {
        self.tags.contains(tag)
    }
}

/// A named bucket of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    /// Identifier.
    pub id: ListId,
    /// Display name.
    pub name: String,
    /// CSS-style color, e.g. `#0ea5e9`.
    pub color: String,
    /// Optional emoji or icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    /// Last modification timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

/// A label that can be attached to many tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Identifier.
    pub id: TagId,
    /// Display name.
    pub name: String,
    /// CSS-style color.
    pub color: String,
}

/// Name lookup entry handed to the parser and suggestion helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedRef<'a, Id> {
    /// Identifier of the referenced record.
    pub id: &'a Id,
    /// Display name of the referenced record.
    pub name: &'a str,
}

impl<'a> From<&'a TaskList> for NamedRef<'a, ListId> {
    fn from(list: &'a TaskList) -> Self {
        Self {
            id: &list.id,
            name: &list.name,
        }
    }
}

impl<'a> From<&'a Tag> for NamedRef<'a, TagId> {
    fn from(tag: &'a Tag) -> Self {
        Self {
            id: &tag.id,
            name: &tag.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_words_and_digits() {
        let parse = |raw: &str| {
            raw.parse::<Priority>()
                .unwrap_or_else(|err| panic!("{raw} must parse: {err}"))
        };
        assert_eq!(parse("1"), Priority::Low);
        assert_eq!(parse("2"), Priority::Medium);
        assert_eq!(parse("3"), Priority::High);
        assert_eq!(parse("4"), Priority::High);
        assert_eq!(parse("HIGH"), Priority::High);
        assert_eq!(parse("None"), Priority::None);
        assert!("5".parse::<Priority>().is_err());
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_rank_matches_ordering() {
        let mut shuffled = vec![Priority::High, Priority::None, Priority::Medium, Priority::Low];
        shuffled.sort();
        assert_eq!(shuffled, Priority::ALL.to_vec());
        assert!(Priority::ALL.windows(2).all(|w| w[0].rank() < w[1].rank()));
    }

    #[test]
    fn task_serializes_dates_as_rfc3339() {
        let now = time::macros::datetime!(2025-03-01 10:00:00 UTC);
        let mut task = Task::new("  Write report ", ListId::inbox(), now, 1);
        task.due = Some(time::macros::datetime!(2025-03-02 23:59:59.999 UTC));

        let json = serde_json::to_value(&task).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(json["title"], "Write report");
        assert_eq!(json["created"], "2025-03-01T10:00:00Z");
        assert_eq!(json["due"], "2025-03-02T23:59:59.999Z");
        assert!(json.get("parent").is_none());

        let back: Task = serde_json::from_value(json).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(back, task);
    }
}
