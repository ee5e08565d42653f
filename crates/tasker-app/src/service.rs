use tasker_core::{
    ListId, ListSelection, ParsedTaskInput, Priority, Suggestions, TagId, TaskId, TokenKind,
};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::debug;

use crate::task_book::{BookError, BookResult, NewTask, TaskBook};

/// Service façade running quick-add lines against a [`TaskBook`].
pub struct TaskService<'a> {
    book: &'a mut TaskBook,
    default_list: ListId,
}

/// Outcome of [`TaskService::quick_add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickAddOutput {
    /// The created task.
    pub task: TaskId,
    /// Tags created because the line named unknown ones.
    pub created_tags: Vec<TagId>,
    /// The parse the task was built from.
    pub parsed: ParsedTaskInput,
}

impl<'a> TaskService<'a> {
    /// Wrap a book. `default_list` is used when neither the line nor the
    /// selection names a list; it falls back to the inbox when it does not exist.
    pub const fn new(book: &'a mut TaskBook, default_list: ListId) -> Self {
        Self { book, default_list }
    }

    /// Underlying book.
    #[must_use]
    pub const fn book(&self) -> &TaskBook {
        self.book
    }

    /// Parse a line with the book's list names.
    #[must_use]
    pub fn parse(&self, input: &str, now: OffsetDateTime) -> ParsedTaskInput {
        tasker_core::parse(input, &self.book.list_refs(), now)
    }

    /// Destination for a parsed line: the parsed list, then the selected
    /// list, then the configured default, then the inbox. Lists that no
    /// longer exist are skipped.
    fn destination(&self, parsed: &ParsedTaskInput) -> ListId {
        if let Some(list) = &parsed.list {
            return list.clone();
        }
        if let ListSelection::List(selected) = &self.book.app().selected_list
            && self.book.list(selected).is_some()
        {
            return selected.clone();
        }
        if self.book.list(&self.default_list).is_some() {
            return self.default_list.clone();
        }
        ListId::inbox()
    }

    /// Create a task from a quick-add line.
    ///
    /// Tag names without a matching tag (case-insensitive) create new tags.
    ///
    /// The line is validated before any tag is created, so a failed call
    /// leaves the book untouched.
    ///
    /// # Errors
    /// Returns [`BookError::EmptyTitle`] when nothing but tokens was typed and
    /// [`BookError::MissingList`] when the destination list does not exist.
    pub fn quick_add(&mut self, input: &str, now: OffsetDateTime) -> BookResult<QuickAddOutput> {
        let parsed = self.parse(input, now);
        if parsed.title.trim().is_empty() {
            return Err(BookError::EmptyTitle);
        }
        let list = self.destination(&parsed);
        if self.book.list(&list).is_none() {
            return Err(BookError::MissingList(list));
        }

        let mut tags = Vec::new();
        let mut created_tags = Vec::new();
        for name in parsed.tags.iter().flatten() {
            let id = if let Some(tag) = self.book.find_tag_by_name(name) {
                tag.id.clone()
            } else {
                let id = self.book.add_tag(name, None)?;
                created_tags.push(id.clone());
                id
            };
            tags.push(id);
        }

        let task = self.book.add_task(
            NewTask {
                title: parsed.title.clone(),
                description: None,
                priority: parsed.priority.unwrap_or(Priority::None),
                due: parsed.due,
                list: Some(list),
                tags,
            },
            now,
        )?;
        debug!(%task, input, "Quick-added task");
        Ok(QuickAddOutput {
            task,
            created_tags,
            parsed,
        })
    }

    /// Add a subtask with a plain title.
    ///
    /// # Errors
    /// Returns an error when the parent is missing or is itself a subtask.
    pub fn add_subtask(&mut self, parent: TaskId, title: &str, now: OffsetDateTime) -> BookResult<TaskId> {
        self.book.add_subtask(parent, title, now)
    }

    /// Completion candidates for the sigil word being typed, narrowed to
    /// those starting with the text typed after the sigil.
    #[must_use]
    pub fn suggest(&self, input: &str) -> Option<Suggestions> {
        let mut suggestions = tasker_core::suggest(input, &self.book.list_refs(), &self.book.tag_refs())?;
        let partial = input
            .rsplit(char::is_whitespace)
            .next()
            .and_then(|word| word.get(1..))
            .unwrap_or_default()
            .to_lowercase();
        if !partial.is_empty() {
            suggestions
                .candidates
                .retain(|candidate| candidate.to_lowercase().starts_with(&partial));
        }
        Some(suggestions)
    }

    /// One-line summary of what a quick-add line would create, e.g.
    /// `"Pay rent" • Priority: high • Due: 2025-03-11 • Tags: home • List: Inbox`.
    #[must_use]
    pub fn preview(&self, input: &str, now: OffsetDateTime) -> String {
        let parsed = self.parse(input, now);
        let mut parts = Vec::new();
        if !parsed.title.is_empty() {
            parts.push(format!("\"{}\"", parsed.title));
        }
        if let Some(priority) = parsed.priority.filter(|p| *p != Priority::None) {
            parts.push(format!("Priority: {priority}"));
        }
        if let Some(due) = parsed.due
            && let Ok(date) = due.to_offset(now.offset()).format(format_description!("[year]-[month]-[day]"))
        {
            parts.push(format!("Due: {date}"));
        }
        if let Some(tags) = parsed.tags.as_ref().filter(|tags| !tags.is_empty()) {
            parts.push(format!("Tags: {}", tags.join(", ")));
        }
        if let Some(list) = parsed.list.as_ref().and_then(|id| self.book.list(id)) {
            parts.push(format!("List: {}", list.name));
        }
        parts.join(" • ")
    }

    /// Kind of token being completed, if any.
    #[must_use]
    pub fn completing(&self, input: &str) -> Option<TokenKind> {
        self.suggest(input).map(|suggestions| suggestions.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasker_core::id::TODAY;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-03-10 09:00 UTC);

    fn ok<T>(result: BookResult<T>) -> T {
        result.unwrap_or_else(|err| panic!("service call failed: {err}"))
    }

    #[test]
    fn quick_add_extracts_fields_and_creates_missing_tags() {
        let mut book = TaskBook::with_defaults(NOW);
        let work = ok(book.add_list("Work", None, None, NOW));
        let mut service = TaskService::new(&mut book, ListId::inbox());

        let output = ok(service.quick_add("Finish report @tomorrow !high #WORK #quarterly ~work", NOW));
        assert_eq!(output.created_tags.len(), 1);

        let book = service.book();
        let task = book.task(output.task).unwrap_or_else(|| panic!("task must exist"));
        assert_eq!(task.title, "Finish report");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due, Some(datetime!(2025-03-11 23:59:59.999 UTC)));
        assert_eq!(task.list, work);
        assert_eq!(task.tags[0], TagId::from("work"));
        assert_eq!(
            book.tag(&task.tags[1]).map(|tag| tag.name.as_str()),
            Some("quarterly")
        );
    }

    #[test]
    fn quick_add_rejects_token_only_lines() {
        let mut book = TaskBook::with_defaults(NOW);
        let mut service = TaskService::new(&mut book, ListId::inbox());
        assert_eq!(service.quick_add("#newtag !high", NOW), Err(BookError::EmptyTitle));
        assert!(book.find_tag_by_name("newtag").is_none());
    }

    #[test]
    fn quick_add_falls_back_to_selected_list_then_default() {
        let mut book = TaskBook::with_defaults(NOW);
        ok(book.select_list(ListSelection::List(ListId::from(TODAY))));
        let mut service = TaskService::new(&mut book, ListId::inbox());
        let selected = ok(service.quick_add("Stretch", NOW)).task;
        assert_eq!(
            service.book().task(selected).map(|task| task.list.as_str()),
            Some(TODAY)
        );

        let mut book = TaskBook::with_defaults(NOW);
        ok(book.select_list(ListSelection::All));
        let mut service = TaskService::new(&mut book, ListId::from("missing"));
        let fallback = ok(service.quick_add("Stretch", NOW)).task;
        assert_eq!(
            service.book().task(fallback).map(|task| task.list.clone()),
            Some(ListId::inbox())
        );
    }

    #[test]
    fn quick_add_skips_stale_selection_without_orphaning_tags() {
        let mut book = TaskBook::from_parts(
            Vec::new(),
            crate::task_book::default_lists(NOW),
            crate::task_book::default_tags(),
            crate::app_state::AppState {
                selected_list: ListSelection::List(ListId::from("deleted")),
                ..crate::app_state::AppState::default()
            },
            NOW,
        );
        let tags_before = book.tags().len();
        let mut service = TaskService::new(&mut book, ListId::inbox());
        let output = ok(service.quick_add("Pick up parcel #errands", NOW));
        assert_eq!(
            service.book().task(output.task).map(|task| task.list.clone()),
            Some(ListId::inbox())
        );
        assert_eq!(service.book().tags().len(), tags_before + 1);
    }

    #[test]
    fn suggest_narrows_by_typed_prefix() {
        let mut book = TaskBook::with_defaults(NOW);
        let service = TaskService::new(&mut book, ListId::inbox());

        let all = service
            .suggest("Call mom !")
            .unwrap_or_else(|| panic!("priority suggestions expected"));
        assert_eq!(all.candidates.len(), 4);

        let narrowed = service
            .suggest("Call mom #WO")
            .unwrap_or_else(|| panic!("tag suggestions expected"));
        assert_eq!(narrowed.kind, TokenKind::Tag);
        assert_eq!(narrowed.candidates, vec!["Work".to_owned()]);

        assert!(service.suggest("Call mom").is_none());
        assert_eq!(service.completing("Call mom ~"), Some(TokenKind::List));
    }

    #[test]
    fn preview_summarizes_parse() {
        let mut book = TaskBook::with_defaults(NOW);
        let service = TaskService::new(&mut book, ListId::inbox());
        assert_eq!(
            service.preview("Pay rent !high @tomorrow #home ~inbox", NOW),
            "\"Pay rent\" • Priority: high • Due: 2025-03-11 • Tags: home • List: Inbox"
        );
        assert_eq!(service.preview("!none", NOW), "");
    }

    #[test]
    fn add_subtask_delegates_to_book() {
        let mut book = TaskBook::with_defaults(NOW);
        let mut service = TaskService::new(&mut book, ListId::inbox());
        let parent = ok(service.quick_add("Plan trip", NOW)).task;
        let child = ok(service.add_subtask(parent, "Book flights", NOW));
        assert_eq!(
            service.book().subtasks_of(parent).first().map(|task| task.id),
            Some(child)
        );
    }
}
