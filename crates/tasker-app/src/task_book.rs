//! In-memory task collection with the cascade rules applied on every mutation.

use std::collections::{BTreeMap, HashMap};

use tasker_core::id::{INBOX, TODAY, UPCOMING};
use tasker_core::{
    ListId, ListSelection, NamedRef, Priority, SortOptions, Tag, TagId, Task, TaskFilter, TaskId,
    TaskList,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::app_state::{AppState, Theme};
use crate::task_patch::{ListUpdate, TagUpdate, TaskUpdate};

/// Color given to lists created without one.
pub const DEFAULT_LIST_COLOR: &str = "#0ea5e9";
/// Color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#64748b";

/// Errors raised while mutating a [`TaskBook`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    /// Target task could not be found.
    #[error("task {0} not found")]
    MissingTask(TaskId),
    /// Parent task could not be found.
    #[error("parent task {0} not found")]
    MissingParent(TaskId),
    /// Subtasks cannot have subtasks of their own.
    #[error("task {0} is already a subtask")]
    NestedSubtask(TaskId),
    /// Subtasks follow their parent's list.
    #[error("subtask {0} cannot change list on its own")]
    SubtaskList(TaskId),
    /// Titles must contain non-whitespace text.
    #[error("title must not be empty")]
    EmptyTitle,
    /// List and tag names must contain non-whitespace text.
    #[error("name must not be empty")]
    EmptyName,
    /// Referenced list does not exist.
    #[error("list {0} not found")]
    MissingList(ListId),
    /// Built-in lists cannot be deleted.
    #[error("list {0} is built in and cannot be deleted")]
    ReservedList(ListId),
    /// Referenced tag does not exist.
    #[error("tag {0} not found")]
    MissingTag(TagId),
}

/// Result alias for task book mutations.
pub type BookResult<T> = Result<T, BookError>;

/// Fields of a new top-level task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Title; trimmed and required to be non-empty.
    pub title: String,
    /// Optional notes.
    pub description: Option<String>,
    /// Priority.
    pub priority: Priority,
    /// Due instant.
    pub due: Option<OffsetDateTime>,
    /// Destination list; `None` uses the inbox.
    pub list: Option<ListId>,
    /// Tags to attach; every id must exist.
    pub tags: Vec<TagId>,
}

impl NewTask {
    /// Task with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Tasks, lists, tags and view state, kept consistent with each other.
#[derive(Debug, Clone)]
pub struct TaskBook {
    tasks: BTreeMap<TaskId, Task>,
    children_index: HashMap<TaskId, Vec<TaskId>>,
    lists: Vec<TaskList>,
    tags: Vec<Tag>,
    app: AppState,
    last_order: i64,
}

/// Built-in lists present in a fresh book.
#[must_use]
pub fn default_lists(now: OffsetDateTime) -> Vec<TaskList> {
    [
        (INBOX, "Inbox", "#0ea5e9", "📥"),
        (TODAY, "Today", "#10b981", "📅"),
        (UPCOMING, "Upcoming", "#f59e0b", "📆"),
    ]
    .into_iter()
    .map(|(id, name, color, icon)| TaskList {
        id: ListId::from(id),
        name: name.to_owned(),
        color: color.to_owned(),
        icon: Some(icon.to_owned()),
        created: now,
        updated: now,
    })
    .collect()
}

/// Tags present in a fresh book.
#[must_use]
pub fn default_tags() -> Vec<Tag> {
    [
        ("work", "Work", "#ef4444"),
        ("personal", "Personal", "#10b981"),
        ("urgent", "Urgent", "#f59e0b"),
    ]
    .into_iter()
    .map(|(id, name, color)| Tag {
        id: TagId::from(id),
        name: name.to_owned(),
        color: color.to_owned(),
    })
    .collect()
}

fn non_blank(value: &str, err: BookError) -> BookResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_owned())
}

fn unix_millis(now: OffsetDateTime) -> i64 {
    i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

impl TaskBook {
    /// Fresh book holding the built-in lists and default tags.
    #[must_use]
    pub fn with_defaults(now: OffsetDateTime) -> Self {
        Self::from_parts(Vec::new(), default_lists(now), default_tags(), AppState::default(), now)
    }

    /// Rebuild a book from stored records.
    ///
    /// Empty list or tag registries fall back to the defaults and a missing
    /// inbox is re-created. Subtasks whose parent is missing or is itself a
    /// subtask are promoted to top-level tasks, and every subtask is moved to
    /// its parent's list.
    #[must_use]
    pub fn from_parts(
        tasks: Vec<Task>,
        mut lists: Vec<TaskList>,
        mut tags: Vec<Tag>,
        app: AppState,
        now: OffsetDateTime,
    ) -> Self {
        if lists.is_empty() {
            lists = default_lists(now);
        } else if !lists.iter().any(|list| list.id.as_str() == INBOX) {
            warn!("Stored lists have no inbox, re-creating it");
            if let Some(inbox) = default_lists(now).into_iter().next() {
                lists.insert(0, inbox);
            }
        }
        if tags.is_empty() {
            tags = default_tags();
        }

        let mut map: BTreeMap<TaskId, Task> = tasks.into_iter().map(|task| (task.id, task)).collect();
        let parents: HashMap<TaskId, (Option<TaskId>, ListId)> = map
            .values()
            .map(|task| (task.id, (task.parent, task.list.clone())))
            .collect();
        for task in map.values_mut() {
            let Some(parent) = task.parent else {
                continue;
            };
            match parents.get(&parent) {
                Some((None, list)) => task.list.clone_from(list),
                _ => {
                    warn!(task = %task.id, %parent, "Promoting subtask with invalid parent");
                    task.parent = None;
                }
            }
        }

        let last_order = map.values().map(|task| task.order).max().unwrap_or(0);
        let mut book = Self {
            tasks: map,
            children_index: HashMap::new(),
            lists,
            tags,
            app,
            last_order,
        };
        book.rebuild_children_index();
        debug!(
            tasks = book.tasks.len(),
            lists = book.lists.len(),
            tags = book.tags.len(),
            "Loaded task book"
        );
        book
    }

    fn rebuild_children_index(&mut self) {
        let mut index: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in self.tasks.values() {
            if let Some(parent) = task.parent {
                index.entry(parent).or_default().push(task.id);
            }
        }
        for children in index.values_mut() {
            children.sort_by_key(|id| self.tasks.get(id).map(|task| task.order));
        }
        self.children_index = index;
    }

    const fn next_order_after(last: i64, now_millis: i64) -> i64 {
        if now_millis > last { now_millis } else { last.saturating_add(1) }
    }

    fn next_order(&mut self, now: OffsetDateTime) -> i64 {
        self.last_order = Self::next_order_after(self.last_order, unix_millis(now));
        self.last_order
    }

    /// Every task, subtasks included, in id order.
    #[must_use]
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + Clone {
        self.tasks.values()
    }

    /// Number of tasks, subtasks included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when the book holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Lookup a task by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Subtasks of `parent` in creation order.
    #[must_use]
    pub fn subtasks_of(&self, parent: TaskId) -> Vec<&Task> {
        self.children_index
            .get(&parent)
            .map(|ids| ids.iter().filter_map(|id| self.tasks.get(id)).collect())
            .unwrap_or_default()
    }

    /// All lists, built-in ones included.
    #[must_use]
    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    /// All tags.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// View state.
    #[must_use]
    pub const fn app(&self) -> &AppState {
        &self.app
    }

    /// Lookup a list by id.
    #[must_use]
    pub fn list(&self, id: &ListId) -> Option<&TaskList> {
        self.lists.iter().find(|list| list.id == *id)
    }

    /// Lookup a tag by id.
    #[must_use]
    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == *id)
    }

    /// Case-insensitive exact lookup of a list name.
    #[must_use]
    pub fn find_list_by_name(&self, name: &str) -> Option<&TaskList> {
        let needle = name.trim().to_lowercase();
        self.lists.iter().find(|list| list.name.to_lowercase() == needle)
    }

    /// Case-insensitive exact lookup of a tag name.
    #[must_use]
    pub fn find_tag_by_name(&self, name: &str) -> Option<&Tag> {
        let needle = name.trim().to_lowercase();
        self.tags.iter().find(|tag| tag.name.to_lowercase() == needle)
    }

    /// List name references for the parser and suggestions.
    #[must_use]
    pub fn list_refs(&self) -> Vec<NamedRef<'_, ListId>> {
        self.lists.iter().map(NamedRef::from).collect()
    }

    /// Tag name references for suggestions.
    #[must_use]
    pub fn tag_refs(&self) -> Vec<NamedRef<'_, TagId>> {
        self.tags.iter().map(NamedRef::from).collect()
    }

    fn ensure_list(&self, id: &ListId) -> BookResult<()> {
        if self.list(id).is_none() {
            return Err(BookError::MissingList(id.clone()));
        }
        Ok(())
    }

    fn ensure_tags<'a>(&self, ids: impl IntoIterator<Item = &'a TagId>) -> BookResult<()> {
        for id in ids {
            if self.tag(id).is_none() {
                return Err(BookError::MissingTag(id.clone()));
            }
        }
        Ok(())
    }

    /// Create a top-level task.
    ///
    /// # Errors
    /// Returns an error when the title is blank or the list or a tag does not exist.
    pub fn add_task(&mut self, input: NewTask, now: OffsetDateTime) -> BookResult<TaskId> {
        let title = non_blank(&input.title, BookError::EmptyTitle)?;
        let list = input.list.unwrap_or_else(ListId::inbox);
        self.ensure_list(&list)?;
        self.ensure_tags(&input.tags)?;

        let order = self.next_order(now);
        let mut task = Task::new(title, list, now, order);
        task.description = input.description.filter(|text| !text.trim().is_empty());
        task.priority = input.priority;
        task.due = input.due;
        for tag in input.tags {
            if !task.tags.contains(&tag) {
                task.tags.push(tag);
            }
        }

        let id = task.id;
        info!(task = %id, list = %task.list, "Created task");
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Create a subtask under a top-level task. The subtask joins the parent's list.
    ///
    /// # Errors
    /// Returns an error when the title is blank, the parent is missing or the
    /// parent is itself a subtask.
    pub fn add_subtask(&mut self, parent: TaskId, title: &str, now: OffsetDateTime) -> BookResult<TaskId> {
        let title = non_blank(title, BookError::EmptyTitle)?;
        let parent_task = self.tasks.get(&parent).ok_or(BookError::MissingParent(parent))?;
        if parent_task.is_subtask() {
            return Err(BookError::NestedSubtask(parent));
        }
        let list = parent_task.list.clone();

        let order = self.next_order(now);
        let mut task = Task::new(title, list, now, order);
        task.parent = Some(parent);
        let id = task.id;
        self.tasks.insert(id, task);
        self.children_index.entry(parent).or_default().push(id);
        self.touch(parent, now);
        info!(task = %id, %parent, "Created subtask");
        Ok(id)
    }

    fn touch(&mut self, id: TaskId, now: OffsetDateTime) {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.updated = now;
        }
    }

    /// Apply a partial update.
    ///
    /// A list change on a top-level task is copied to its subtasks; any change
    /// to a subtask bumps its parent's `updated` timestamp.
    ///
    /// # Errors
    /// Returns an error when the task is missing, the new title is blank, the
    /// target list or an added tag does not exist, or the update moves a
    /// subtask to another list.
    pub fn update_task(&mut self, id: TaskId, update: &TaskUpdate, now: OffsetDateTime) -> BookResult<()> {
        let current = self.tasks.get(&id).ok_or(BookError::MissingTask(id))?;
        if let Some(title) = &update.title {
            non_blank(title, BookError::EmptyTitle)?;
        }
        if let Some(list) = &update.list {
            if current.is_subtask() && *list != current.list {
                return Err(BookError::SubtaskList(id));
            }
            self.ensure_list(list)?;
        }
        self.ensure_tags(&update.tags.added)?;
        let parent = current.parent;

        let Some(task) = self.tasks.get_mut(&id) else {
            return Err(BookError::MissingTask(id));
        };
        if !update.apply_to(task) {
            return Ok(());
        }
        task.updated = now;
        let list = task.list.clone();
        debug!(task = %id, "Updated task");

        if let Some(parent) = parent {
            self.touch(parent, now);
        } else if update.list.is_some() {
            self.cascade_list(id, &list, now);
        }
        Ok(())
    }

    fn cascade_list(&mut self, parent: TaskId, list: &ListId, now: OffsetDateTime) {
        let children = self.children_index.get(&parent).cloned().unwrap_or_default();
        for child in children {
            if let Some(task) = self.tasks.get_mut(&child)
                && task.list != *list
            {
                task.list = list.clone();
                task.updated = now;
                debug!(task = %child, %list, "Moved subtask with parent");
            }
        }
    }

    /// Flip the completion flag. Returns the new state.
    ///
    /// # Errors
    /// Returns an error when the task does not exist.
    pub fn toggle_complete(&mut self, id: TaskId, now: OffsetDateTime) -> BookResult<bool> {
        let completed = !self.tasks.get(&id).ok_or(BookError::MissingTask(id))?.completed;
        let update = TaskUpdate {
            completed: Some(completed),
            ..TaskUpdate::default()
        };
        self.update_task(id, &update, now)?;
        Ok(completed)
    }

    /// Delete a task and its subtasks. Returns every removed id, the task first.
    ///
    /// # Errors
    /// Returns an error when the task does not exist.
    pub fn delete_task(&mut self, id: TaskId, now: OffsetDateTime) -> BookResult<Vec<TaskId>> {
        let task = self.tasks.remove(&id).ok_or(BookError::MissingTask(id))?;
        let mut removed = vec![id];
        for child in self.children_index.remove(&id).unwrap_or_default() {
            if self.tasks.remove(&child).is_some() {
                removed.push(child);
            }
        }
        if let Some(parent) = task.parent {
            if let Some(siblings) = self.children_index.get_mut(&parent) {
                siblings.retain(|sibling| *sibling != id);
            }
            self.touch(parent, now);
        }
        info!(task = %id, removed = removed.len(), "Deleted task");
        Ok(removed)
    }

    /// Create a list.
    ///
    /// # Errors
    /// Returns an error when the name is blank.
    pub fn add_list(
        &mut self,
        name: &str,
        color: Option<String>,
        icon: Option<String>,
        now: OffsetDateTime,
    ) -> BookResult<ListId> {
        let name = non_blank(name, BookError::EmptyName)?;
        let list = TaskList {
            id: ListId::generate(),
            name,
            color: color.unwrap_or_else(|| DEFAULT_LIST_COLOR.to_owned()),
            icon,
            created: now,
            updated: now,
        };
        let id = list.id.clone();
        info!(list = %id, name = %list.name, "Created list");
        self.lists.push(list);
        Ok(id)
    }

    /// Rename or restyle a list.
    ///
    /// # Errors
    /// Returns an error when the list does not exist or the new name is blank.
    pub fn update_list(&mut self, id: &ListId, update: ListUpdate, now: OffsetDateTime) -> BookResult<()> {
        let name = update
            .name
            .as_deref()
            .map(|name| non_blank(name, BookError::EmptyName))
            .transpose()?;
        let list = self
            .lists
            .iter_mut()
            .find(|list| list.id == *id)
            .ok_or_else(|| BookError::MissingList(id.clone()))?;
        if let Some(name) = name {
            list.name = name;
        }
        if let Some(color) = update.color {
            list.color = color;
        }
        if let Some(icon) = update.icon {
            list.icon = icon;
        }
        list.updated = now;
        Ok(())
    }

    /// Delete a list, moving its tasks to the inbox. Returns the number of moved tasks.
    ///
    /// # Errors
    /// Returns an error when the list does not exist or is built in.
    pub fn delete_list(&mut self, id: &ListId, now: OffsetDateTime) -> BookResult<usize> {
        if id.is_reserved() {
            return Err(BookError::ReservedList(id.clone()));
        }
        let position = self
            .lists
            .iter()
            .position(|list| list.id == *id)
            .ok_or_else(|| BookError::MissingList(id.clone()))?;
        self.lists.remove(position);

        let inbox = ListId::inbox();
        let mut moved = 0;
        for task in self.tasks.values_mut().filter(|task| task.list == *id) {
            task.list = inbox.clone();
            task.updated = now;
            moved += 1;
        }
        if self.app.selected_list == ListSelection::List(id.clone()) {
            self.app.selected_list = ListSelection::List(inbox);
        }
        info!(list = %id, moved, "Deleted list");
        Ok(moved)
    }

    /// Create a tag.
    ///
    /// # Errors
    /// Returns an error when the name is blank.
    pub fn add_tag(&mut self, name: &str, color: Option<String>) -> BookResult<TagId> {
        let name = non_blank(name, BookError::EmptyName)?;
        let tag = Tag {
            id: TagId::generate(),
            name,
            color: color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_owned()),
        };
        let id = tag.id.clone();
        info!(tag = %id, name = %tag.name, "Created tag");
        self.tags.push(tag);
        Ok(id)
    }

    /// Rename or recolor a tag.
    ///
    /// # Errors
    /// Returns an error when the tag does not exist or the new name is blank.
    pub fn update_tag(&mut self, id: &TagId, update: TagUpdate) -> BookResult<()> {
        let name = update
            .name
            .as_deref()
            .map(|name| non_blank(name, BookError::EmptyName))
            .transpose()?;
        let tag = self
            .tags
            .iter_mut()
            .find(|tag| tag.id == *id)
            .ok_or_else(|| BookError::MissingTag(id.clone()))?;
        if let Some(name) = name {
            tag.name = name;
        }
        if let Some(color) = update.color {
            tag.color = color;
        }
        Ok(())
    }

    /// Delete a tag and detach it from every task. Returns the number of affected tasks.
    ///
    /// # Errors
    /// Returns an error when the tag does not exist.
    pub fn delete_tag(&mut self, id: &TagId, now: OffsetDateTime) -> BookResult<usize> {
        let position = self
            .tags
            .iter()
            .position(|tag| tag.id == *id)
            .ok_or_else(|| BookError::MissingTag(id.clone()))?;
        self.tags.remove(position);

        let mut affected = 0;
        for task in self.tasks.values_mut().filter(|task| task.has_tag(id)) {
            task.tags.retain(|tag| tag != id);
            task.updated = now;
            affected += 1;
        }
        self.app.filter.tags.retain(|tag| tag != id);
        info!(tag = %id, affected, "Deleted tag");
        Ok(affected)
    }

    /// Change the list shown by default.
    ///
    /// # Errors
    /// Returns an error when the selected list does not exist.
    pub fn select_list(&mut self, selection: ListSelection) -> BookResult<()> {
        if let ListSelection::List(id) = &selection {
            self.ensure_list(id)?;
        }
        self.app.selected_list = selection;
        Ok(())
    }

    /// Replace the active filter.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.app.filter = filter;
    }

    /// Replace the active sort.
    pub const fn set_sort(&mut self, sort: SortOptions) {
        self.app.sort = sort;
    }

    /// Switch between light and dark. Returns the new theme.
    pub const fn toggle_theme(&mut self) -> Theme {
        self.app.theme = self.app.theme.toggled();
        self.app.theme
    }

    /// Top-level view under the stored selection, filter and sort.
    #[must_use]
    pub fn visible(&self, now: OffsetDateTime) -> Vec<&Task> {
        tasker_core::visible(
            self.tasks.values(),
            &self.app.selected_list,
            &self.app.filter,
            self.app.sort,
            now,
        )
    }

    /// Per-list task counts for a sidebar.
    #[must_use]
    pub fn list_counts(&self, now: OffsetDateTime) -> Vec<(ListId, usize)> {
        tasker_core::list_counts(self.tasks.values(), &self.lists, now)
    }

    /// Decompose into stored records.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Task>, Vec<TaskList>, Vec<Tag>, AppState) {
        (self.tasks.into_values().collect(), self.lists, self.tags, self.app)
    }
}
