use std::fmt::{self, Display};

use tasker_core::due;
use tasker_core::{DueRange, Priority, Tag, TagId, TaskFilter};
use thiserror::Error;
use time::{OffsetDateTime, Time};

/// Error type returned while constructing task filters from user-facing inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterBuildError {
    /// Priority name not recognized.
    #[error("invalid priority: {token}")]
    InvalidPriority {
        /// Raw input.
        token: String,
    },
    /// No tag has this name.
    #[error("unknown tag: {name}")]
    UnknownTag {
        /// Raw input.
        name: String,
    },
    /// Date bound could not be resolved.
    #[error("invalid {field} date: {value}")]
    InvalidDate {
        /// Which bound failed.
        field: &'static str,
        /// Raw input.
        value: String,
    },
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into [`TaskFilter`] values.
#[derive(Debug, Clone, Default)]
pub struct TaskFilterBuilder {
    completed: Option<bool>,
    priority: Option<Priority>,
    tags: Vec<TagId>,
    text: Option<String>,
    due_from: Option<OffsetDateTime>,
    due_until: Option<OffsetDateTime>,
}

impl TaskFilterBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a completion state.
    #[must_use]
    pub const fn with_completed(mut self, completed: Option<bool>) -> Self {
        self.completed = completed;
        self
    }

    /// Require a priority given by name or digit.
    ///
    /// # Errors
    /// Returns an error if the token is not a priority.
    pub fn with_priority(mut self, priority: Option<&str>) -> FilterBuildResult<Self> {
        self.priority = priority
            .map(|token| {
                token.parse::<Priority>().map_err(|_| FilterBuildError::InvalidPriority {
                    token: token.to_owned(),
                })
            })
            .transpose()?;
        Ok(self)
    }

    /// Extend the tag filter (logical OR) with tag names resolved against `known`.
    ///
    /// # Errors
    /// Returns an error if any name does not match a known tag.
    pub fn with_tag_names(mut self, names: &[String], known: &[Tag]) -> FilterBuildResult<Self> {
        for name in names {
            let needle = name.trim().trim_start_matches('#').to_lowercase();
            let tag = known
                .iter()
                .find(|tag| tag.name.to_lowercase() == needle || tag.id.as_str() == needle)
                .ok_or_else(|| FilterBuildError::UnknownTag { name: name.clone() })?;
            if !self.tags.contains(&tag.id) {
                self.tags.push(tag.id.clone());
            }
        }
        Ok(self)
    }

    /// Configure the optional search text (whitespace-only inputs become `None`).
    #[must_use]
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text.and_then(|raw| {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });
        self
    }

    /// Configure the due window from date strings using the quick-add date syntax.
    ///
    /// `from` starts at midnight of its day and `until` ends at the end of its
    /// day, so both bounds are inclusive.
    ///
    /// # Errors
    /// Returns an error if either bound cannot be resolved.
    pub fn with_due_range(
        mut self,
        from: Option<&str>,
        until: Option<&str>,
        now: OffsetDateTime,
    ) -> FilterBuildResult<Self> {
        self.due_from = resolve_bound("from", from, now)?.map(|due| due.replace_time(Time::MIDNIGHT));
        self.due_until = resolve_bound("until", until, now)?;
        Ok(self)
    }

    /// Build the final [`TaskFilter`].
    #[must_use]
    pub fn build(self) -> TaskFilter {
        let due = (self.due_from.is_some() || self.due_until.is_some()).then_some(DueRange {
            start: self.due_from,
            end: self.due_until,
        });
        TaskFilter {
            completed: self.completed,
            priority: self.priority,
            tags: self.tags,
            search: self.text,
            due,
        }
    }
}

fn resolve_bound(
    field: &'static str,
    value: Option<&str>,
    now: OffsetDateTime,
) -> FilterBuildResult<Option<OffsetDateTime>> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    due::resolve(raw, now)
        .map(Some)
        .ok_or_else(|| FilterBuildError::InvalidDate {
            field,
            value: raw.to_owned(),
        })
}

impl Display for TaskFilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFilterBuilder")
            .field("completed", &self.completed)
            .field("priority", &self.priority)
            .field("tags", &self.tags)
            .field("text", &self.text)
            .field("due_from", &self.due_from)
            .field("due_until", &self.due_until)
            .finish()
    }
}
