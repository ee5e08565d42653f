use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use tasker_app::{DefaultsConfig, StateFile, TaskBook};
use tasker_core::{ListId, ListSelection, TagId, Task, TaskId};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::Command;

mod handlers;

/// Loaded state plus the file it is saved back to.
pub struct Session {
    file: StateFile,
    book: TaskBook,
    defaults: DefaultsConfig,
}

impl Session {
    pub const fn new(file: StateFile, book: TaskBook, defaults: DefaultsConfig) -> Self {
        Self { file, book, defaults }
    }

    /// Execute one command and persist the book when it changed.
    pub fn run(&mut self, command: Command, now: OffsetDateTime, out: &mut impl Write) -> Result<()> {
        let changed = handlers::run(command, &mut self.book, &self.defaults, now, out)?;
        if changed {
            self.file
                .save(&self.book)
                .with_context(|| format!("failed to save {}", self.file.path().display()))?;
        }
        Ok(())
    }
}

/// Resolve a full task id or a unique prefix of one.
fn parse_task_id(book: &TaskBook, raw: &str) -> Result<TaskId> {
    let raw = raw.trim();
    if let Ok(id) = TaskId::from_str(raw) {
        return Ok(id);
    }
    let needle = raw.to_ascii_lowercase();
    let mut matches = book
        .tasks()
        .map(|task| task.id)
        .filter(|id| !needle.is_empty() && id.to_string().starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => bail!("Ambiguous task id prefix: {raw}"),
        (None, _) => Err(anyhow!("no task id starts with {raw:?}"))
            .with_context(|| format!("Invalid task id: {raw}")),
    }
}

/// Resolve a list by id or case-insensitive name.
fn resolve_list(book: &TaskBook, raw: &str) -> Result<ListId> {
    let raw = raw.trim().trim_start_matches('~');
    let id = ListId::new(raw);
    if book.list(&id).is_some() {
        return Ok(id);
    }
    book.find_list_by_name(raw)
        .map(|list| list.id.clone())
        .ok_or_else(|| anyhow!("Unknown list: {raw}"))
}

/// `all` clears the restriction; anything else names a list.
fn resolve_selection(book: &TaskBook, raw: &str) -> Result<ListSelection> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(ListSelection::All);
    }
    resolve_list(book, raw).map(ListSelection::List)
}

/// Resolve a tag by id or case-insensitive name.
fn resolve_tag(book: &TaskBook, raw: &str) -> Result<TagId> {
    let raw = raw.trim().trim_start_matches('#');
    let id = TagId::new(raw);
    if book.tag(&id).is_some() {
        return Ok(id);
    }
    book.find_tag_by_name(raw)
        .map(|tag| tag.id.clone())
        .ok_or_else(|| anyhow!("Unknown tag: {raw}"))
}

/// A top-level task with its subtasks, as printed by `ls --format json` and `show`.
#[derive(Serialize)]
struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    subtasks: Vec<&'a Task>,
}

impl<'a> TaskView<'a> {
    fn new(book: &'a TaskBook, task: &'a Task) -> Self {
        Self {
            task,
            subtasks: book.subtasks_of(task.id),
        }
    }
}

fn format_due(due: Option<OffsetDateTime>, now: OffsetDateTime) -> String {
    due.and_then(|due| {
        due.to_offset(now.offset())
            .format(format_description!("[year]-[month]-[day]"))
            .ok()
    })
    .unwrap_or_else(|| "-".to_owned())
}

fn render_row(book: &TaskBook, task: &Task, now: OffsetDateTime, out: &mut impl Write) -> Result<()> {
    let done = if task.completed { "x" } else { " " };
    let title = if task.is_subtask() {
        format!("↳ {}", task.title)
    } else {
        task.title.clone()
    };
    let list = book
        .list(&task.list)
        .map_or_else(|| task.list.to_string(), |list| list.name.clone());
    let tags = if task.tags.is_empty() {
        "-".to_owned()
    } else {
        task.tags
            .iter()
            .map(|id| book.tag(id).map_or_else(|| id.to_string(), |tag| tag.name.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    writeln!(
        out,
        "{} | {} | {} | {} | {} | {} | {}",
        task.id,
        done,
        title,
        task.priority,
        format_due(task.due, now),
        list,
        tags
    )?;
    Ok(())
}

fn render_task_table(book: &TaskBook, tasks: &[&Task], now: OffsetDateTime, out: &mut impl Write) -> Result<()> {
    writeln!(out, "ID | Done | Title | Priority | Due | List | Tags")?;
    writeln!(out, "-- | ---- | ----- | -------- | --- | ---- | ----")?;
    for task in tasks {
        render_row(book, task, now, out)?;
        for subtask in book.subtasks_of(task.id) {
            render_row(book, subtask, now, out)?;
        }
    }
    Ok(())
}
