//! Filter and sort engine producing the visible task list.
//!
//! [`visible`] is a pure function of the task snapshot, the selected list,
//! the filter, the sort options and the caller's clock. Callers re-run it
//! whenever any of those change instead of patching a previous result.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::id::{ListId, TODAY, TagId, UPCOMING};
use crate::model::{Priority, Task, TaskList};
use crate::text_matcher::TextMatcher;

/// Which list the view is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<ListId>", into = "Option<ListId>")]
pub enum ListSelection {
    /// No list restriction.
    #[default]
    All,
    /// A stored list or one of the smart lists `today` / `upcoming`.
    List(ListId),
}

impl From<Option<ListId>> for ListSelection {
    fn from(value: Option<ListId>) -> Self {
        value.map_or(Self::All, Self::List)
    }
}

impl From<ListSelection> for Option<ListId> {
    fn from(value: ListSelection) -> Self {
        match value {
            ListSelection::All => None,
            ListSelection::List(id) => Some(id),
        }
    }
}

impl ListSelection {
    /// Membership test for a top-level task.
    ///
    /// `today` also admits tasks due on the current calendar day and
    /// `upcoming` tasks due after `now`; calendar days are taken in the
    /// offset of `now`.
    #[must_use]
    pub fn contains(&self, task: &Task, now: OffsetDateTime) -> bool {
        let Self::List(id) = self else {
            return true;
        };
        if task.list == *id {
            return true;
        }
        match id.as_str() {
            TODAY => task.due.is_some_and(|due| is_same_day(due, now)),
            UPCOMING => task.due.is_some_and(|due| due > now),
            _ => false,
        }
    }
}

fn is_same_day(instant: OffsetDateTime, now: OffsetDateTime) -> bool {
    instant.to_offset(now.offset()).date() == now.date()
}

/// Inclusive due-date window. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueRange {
    /// Earliest accepted due instant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    /// Latest accepted due instant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl DueRange {
    fn contains(&self, due: Option<OffsetDateTime>) -> bool {
        let Some(due) = due else {
            return false;
        };
        self.start.is_none_or(|start| due >= start) && self.end.is_none_or(|end| due <= end)
    }
}

/// Predicate filter; every present condition must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Required completion state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Required priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// At least one of these tags must be present. Empty means no constraint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagId>,
    /// Case-insensitive text searched in title and description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Due-date window; tasks without a due date never match a window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DueRange>,
}

impl TaskFilter {
    /// True when the filter imposes no condition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_none()
            && self.priority.is_none()
            && self.tags.is_empty()
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.due.is_none()
    }

    /// Evaluate the filter against a single task.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let text = self.search.as_deref().and_then(TextMatcher::new);
        self.matches_with(task, text.as_ref())
    }

    fn matches_with(&self, task: &Task, text: Option<&TextMatcher>) -> bool {
        if self.completed.is_some_and(|completed| task.completed != completed) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| task.has_tag(tag)) {
            return false;
        }
        if text.is_some_and(|matcher| !matcher.matches(task)) {
            return false;
        }
        self.due.is_none_or(|range| range.contains(task.due))
    }
}

/// Field used to order the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Manual creation order.
    #[default]
    Order,
    /// Title, case-insensitive.
    Title,
    /// Priority rank.
    Priority,
    /// Due date; tasks without one sort as if infinitely late.
    Due,
    /// Creation timestamp.
    Created,
    /// Modification timestamp.
    Updated,
}

impl SortField {
    /// Name accepted by [`FromStr`] and used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Title => "title",
            Self::Priority => "priority",
            Self::Due => "due",
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for unknown sort field or direction names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sort {kind}: {value}")]
pub struct UnknownSort {
    kind: &'static str,
    value: String,
}

impl FromStr for SortField {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "order" => Ok(Self::Order),
            "title" => Ok(Self::Title),
            "priority" => Ok(Self::Priority),
            "due" | "due_date" | "duedate" => Ok(Self::Due),
            "created" | "created_at" | "createdat" => Ok(Self::Created),
            "updated" | "updated_at" | "updatedat" => Ok(Self::Updated),
            _ => Err(UnknownSort {
                kind: "field",
                value: s.to_owned(),
            }),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl FromStr for SortDirection {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(UnknownSort {
                kind: "direction",
                value: s.to_owned(),
            }),
        }
    }
}

/// Sort configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
    /// Field to compare.
    #[serde(default)]
    pub field: SortField,
    /// Direction applied to the comparison result.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortOptions {
    /// Three-way comparison of two tasks under these options.
    #[must_use]
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.field {
            SortField::Order => a.order.cmp(&b.order),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortField::Due => match (a.due, b.due) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortField::Created => a.created.cmp(&b.created),
            SortField::Updated => a.updated.cmp(&b.updated),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Compute the ordered top-level view.
///
/// Subtasks never appear. The list selection is applied first, then the
/// filter, then the sort.
#[must_use]
pub fn visible<'a, I>(
    tasks: I,
    selection: &ListSelection,
    filter: &TaskFilter,
    sort: SortOptions,
    now: OffsetDateTime,
) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let text = filter.search.as_deref().and_then(TextMatcher::new);
    let mut view: Vec<&Task> = tasks
        .into_iter()
        .filter(|task| !task.is_subtask())
        .filter(|task| selection.contains(task, now))
        .filter(|task| filter.matches_with(task, text.as_ref()))
        .collect();
    view.sort_by(|a, b| sort.compare(a, b));
    view
}

/// Number of top-level tasks shown next to each list in a sidebar.
///
/// `today` counts tasks due today and `upcoming` tasks due after `now`;
/// every other list counts the tasks stored in it.
#[must_use]
pub fn list_counts<'a, I>(tasks: I, lists: &[TaskList], now: OffsetDateTime) -> Vec<(ListId, usize)>
where
    I: IntoIterator<Item = &'a Task>,
    I::IntoIter: Clone,
{
    let tasks = tasks.into_iter().filter(|task| !task.is_subtask());
    lists
        .iter()
        .map(|list| {
            let count = tasks
                .clone()
                .filter(|task| match list.id.as_str() {
                    TODAY => task.due.is_some_and(|due| is_same_day(due, now)),
                    UPCOMING => task.due.is_some_and(|due| due > now),
                    _ => task.list == list.id,
                })
                .count();
            (list.id.clone(), count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;
    use time::macros::datetime;
    use time::Duration;

    const NOW: OffsetDateTime = datetime!(2025-06-10 12:00:00 UTC);

    fn task(title: &str, list: &str, order: i64) -> Task {
        Task::new(title, ListId::from(list), NOW - Duration::days(1), order)
    }

    fn titles(view: &[&Task]) -> Vec<String> {
        view.iter().map(|task| task.title.clone()).collect()
    }

    fn run(tasks: &[Task], selection: &ListSelection, filter: &TaskFilter, sort: SortOptions) -> Vec<String> {
        titles(&visible(tasks, selection, filter, sort, NOW))
    }

    #[test]
    fn today_includes_due_today_and_stored_today() {
        let mut due_today = task("due today", "work", 1);
        due_today.due = Some(datetime!(2025-06-10 23:59:59.999 UTC));
        let stored_today = task("stored today", TODAY, 2);
        let mut future = task("future", "work", 3);
        future.due = Some(datetime!(2025-06-12 23:59:59.999 UTC));

        let tasks = vec![due_today, stored_today, future];
        let view = run(
            &tasks,
            &ListSelection::List(TODAY.into()),
            &TaskFilter::default(),
            SortOptions::default(),
        );
        assert_eq!(view, vec!["due today", "stored today"]);
    }

    #[test]
    fn today_compares_calendar_days_in_clock_offset() {
        let now = datetime!(2025-06-10 08:00:00 +09:00);
        let mut late_utc = task("late utc", "work", 1);
        // 2025-06-09 23:30 UTC is 2025-06-10 08:30 in +09:00.
        late_utc.due = Some(datetime!(2025-06-09 23:30:00 UTC));
        let tasks = [late_utc];
        let view = visible(
            &tasks,
            &ListSelection::List(TODAY.into()),
            &TaskFilter::default(),
            SortOptions::default(),
            now,
        );
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn upcoming_includes_future_due_and_stored_upcoming() {
        let mut past = task("past", "work", 1);
        past.due = Some(NOW - Duration::hours(1));
        let mut future = task("future", "work", 2);
        future.due = Some(NOW + Duration::hours(1));
        let stored = task("stored", UPCOMING, 3);
        let undated = task("undated", "work", 4);

        let tasks = vec![past, future, stored, undated];
        let view = run(
            &tasks,
            &ListSelection::List(UPCOMING.into()),
            &TaskFilter::default(),
            SortOptions::default(),
        );
        assert_eq!(view, vec!["future", "stored"]);
    }

    #[test]
    fn plain_lists_match_stored_list_and_all_bypasses() {
        let tasks = vec![task("a", "work", 1), task("b", "home", 2), task("c", "work", 3)];
        let work = run(
            &tasks,
            &ListSelection::List("work".into()),
            &TaskFilter::default(),
            SortOptions::default(),
        );
        assert_eq!(work, vec!["a", "c"]);

        let all = run(&tasks, &ListSelection::All, &TaskFilter::default(), SortOptions::default());
        assert_eq!(all, vec!["a", "b", "c"]);
    }

    #[test]
    fn subtasks_are_never_top_level() {
        let parent = task("parent", "work", 1);
        let mut child = task("child", "work", 2);
        child.parent = Some(parent.id);
        let mut orphan = task("orphan", "work", 3);
        orphan.parent = Some(TaskId::new());

        let tasks = vec![parent, child, orphan];
        let view = run(&tasks, &ListSelection::All, &TaskFilter::default(), SortOptions::default());
        assert_eq!(view, vec!["parent"]);
    }

    #[test]
    fn priority_sort_uses_rank_in_both_directions() {
        let mut tasks = Vec::new();
        for (order, priority) in [Priority::Medium, Priority::None, Priority::High, Priority::Low]
            .into_iter()
            .enumerate()
        {
            let mut t = task(priority.as_str(), "work", i64::try_from(order).unwrap_or_default());
            t.priority = priority;
            tasks.push(t);
        }

        let asc = SortOptions {
            field: SortField::Priority,
            direction: SortDirection::Asc,
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &TaskFilter::default(), asc),
            vec!["none", "low", "medium", "high"]
        );

        let desc = SortOptions {
            direction: SortDirection::Desc,
            ..asc
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &TaskFilter::default(), desc),
            vec!["high", "medium", "low", "none"]
        );
    }

    #[test]
    fn missing_due_dates_sort_last_ascending() {
        let undated = task("undated", "work", 1);
        let mut later = task("later", "work", 2);
        later.due = Some(NOW + Duration::days(3));
        let mut sooner = task("sooner", "work", 3);
        sooner.due = Some(NOW + Duration::days(1));
        let tasks = vec![undated, later, sooner];

        let asc = SortOptions {
            field: SortField::Due,
            direction: SortDirection::Asc,
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &TaskFilter::default(), asc),
            vec!["sooner", "later", "undated"]
        );
        let desc = SortOptions {
            direction: SortDirection::Desc,
            ..asc
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &TaskFilter::default(), desc),
            vec!["undated", "later", "sooner"]
        );
    }

    #[test]
    fn title_sort_ignores_case() {
        let tasks = vec![task("banana", "x", 1), task("Apple", "x", 2), task("cherry", "x", 3)];
        let sort = SortOptions {
            field: SortField::Title,
            direction: SortDirection::Asc,
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &TaskFilter::default(), sort),
            vec!["Apple", "banana", "cherry"]
        );
    }

    #[test]
    fn empty_tag_filter_never_excludes() {
        let mut tagged = task("tagged", "x", 1);
        tagged.tags.push(TagId::from("work"));
        let untagged = task("untagged", "x", 2);
        let tasks = vec![tagged, untagged];

        let filter = TaskFilter {
            tags: Vec::new(),
            ..TaskFilter::default()
        };
        assert!(filter.is_empty());
        assert_eq!(
            run(&tasks, &ListSelection::All, &filter, SortOptions::default()),
            vec!["tagged", "untagged"]
        );

        let filter = TaskFilter {
            tags: vec![TagId::from("home"), TagId::from("work")],
            ..TaskFilter::default()
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &filter, SortOptions::default()),
            vec!["tagged"]
        );
    }

    #[test]
    fn conditions_are_anded() {
        let mut done_high = task("Ship release", "x", 1);
        done_high.completed = true;
        done_high.priority = Priority::High;
        let mut open_high = task("Ship docs", "x", 2);
        open_high.priority = Priority::High;
        open_high.description = Some("release notes".into());
        let open_low = task("Release party", "x", 3);
        let tasks = vec![done_high, open_high, open_low];

        let filter = TaskFilter {
            completed: Some(false),
            priority: Some(Priority::High),
            search: Some("RELEASE".into()),
            ..TaskFilter::default()
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &filter, SortOptions::default()),
            vec!["Ship docs"]
        );
    }

    #[test]
    fn due_range_excludes_undated_tasks() {
        let undated = task("undated", "x", 1);
        let mut inside = task("inside", "x", 2);
        inside.due = Some(NOW + Duration::days(2));
        let mut outside = task("outside", "x", 3);
        outside.due = Some(NOW + Duration::days(20));
        let tasks = vec![undated, inside, outside];

        let filter = TaskFilter {
            due: Some(DueRange {
                start: Some(NOW),
                end: Some(NOW + Duration::days(7)),
            }),
            ..TaskFilter::default()
        };
        assert_eq!(
            run(&tasks, &ListSelection::All, &filter, SortOptions::default()),
            vec!["inside"]
        );
    }

    #[test]
    fn counts_follow_sidebar_rules() {
        let mut due_today = task("due today", "work", 1);
        due_today.due = Some(NOW + Duration::hours(2));
        let stored_today = task("stored today", TODAY, 2);
        let inbox = task("inbox", "inbox", 3);
        let mut sub = task("sub", "work", 4);
        sub.parent = Some(due_today.id);
        let tasks = vec![due_today, stored_today, inbox, sub];

        let list = |id: &str| TaskList {
            id: ListId::from(id),
            name: id.to_owned(),
            color: "#000000".into(),
            icon: None,
            created: NOW,
            updated: NOW,
        };
        let lists = vec![list("inbox"), list(TODAY), list(UPCOMING), list("work")];
        let counts = list_counts(&tasks, &lists, NOW);
        assert_eq!(
            counts,
            vec![
                (ListId::from("inbox"), 1),
                (ListId::from(TODAY), 1),
                (ListId::from(UPCOMING), 1),
                (ListId::from("work"), 1),
            ]
        );
    }

    #[test]
    fn sort_names_parse() {
        assert_eq!("dueDate".parse::<SortField>(), Ok(SortField::Due));
        assert_eq!("created-at".parse::<SortField>(), Ok(SortField::Created));
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("size".parse::<SortField>().is_err());
    }

    #[test]
    fn selection_serializes_as_optional_id() {
        let json = serde_json::to_string(&ListSelection::List(ListId::inbox()))
            .unwrap_or_else(|err| panic!("serialize selection: {err}"));
        assert_eq!(json, r#""inbox""#);
        let all: ListSelection =
            serde_json::from_str("null").unwrap_or_else(|err| panic!("deserialize selection: {err}"));
        assert_eq!(all, ListSelection::All);
    }
}
