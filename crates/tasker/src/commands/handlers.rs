use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use tasker_app::{
    DefaultsConfig, DescriptionPatch, DuePatch, ExportFormat, ExportOptions, ListUpdate, StateDocument, TagUpdate,
    TaskBook, TaskFilterBuilder, TaskService, TaskUpdate, render_export,
};
use tasker_core::{ListId, Priority, SortDirection, SortField, SortOptions, TagId, TaskFilter, due};
use time::OffsetDateTime;
use tracing::info;

use super::{
    TaskView, parse_task_id, render_task_table, resolve_list, resolve_selection, resolve_tag,
};
use crate::{Command, EditArgs, ExportArgs, ListCommand, LsArgs, LsFormat, TagCommand};

/// Dispatch a command against the book. Returns `true` when the book changed
/// and must be saved.
pub fn run(
    command: Command,
    book: &mut TaskBook,
    defaults: &DefaultsConfig,
    now: OffsetDateTime,
    out: &mut impl Write,
) -> Result<bool> {
    match command {
        Command::Add { text, description } => handle_add(book, defaults, &text.join(" "), description, now, out),
        Command::Sub { parent, title } => {
            let parent = parse_task_id(book, &parent)?;
            let id = book.add_subtask(parent, &title.join(" "), now)?;
            writeln!(out, "created subtask: {id}")?;
            Ok(true)
        }
        Command::Ls(args) => handle_ls(book, defaults, args, now, out),
        Command::Show { task } => {
            let id = parse_task_id(book, &task)?;
            let task = book
                .task(id)
                .with_context(|| format!("Task not found: {id}"))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&TaskView::new(book, task))?)?;
            Ok(false)
        }
        Command::Done { task } => {
            let id = parse_task_id(book, &task)?;
            let completed = book.toggle_complete(id, now)?;
            let state = if completed { "completed" } else { "reopened" };
            writeln!(out, "{state}: {id}")?;
            Ok(true)
        }
        Command::Edit(args) => handle_edit(book, args, now, out),
        Command::Rm { task } => {
            let id = parse_task_id(book, &task)?;
            let removed = book.delete_task(id, now)?;
            writeln!(out, "deleted {} task(s)", removed.len())?;
            Ok(true)
        }
        Command::Suggest { text } => {
            let default_list = default_list(book, defaults);
            let service = TaskService::new(book, default_list);
            if let Some(suggestions) = service.suggest(&text.join(" ")) {
                for candidate in suggestions.candidates {
                    writeln!(out, "{}{candidate}", suggestions.kind.sigil())?;
                }
            }
            Ok(false)
        }
        Command::Preview { text } => {
            let default_list = default_list(book, defaults);
            let service = TaskService::new(book, default_list);
            writeln!(out, "{}", service.preview(&text.join(" "), now))?;
            Ok(false)
        }
        Command::List(command) => handle_list(book, command, now, out),
        Command::Tag(command) => handle_tag(book, command, now, out),
        Command::Select { list } => {
            let selection = resolve_selection(book, &list)?;
            book.select_list(selection)?;
            writeln!(out, "selected: {list}")?;
            Ok(true)
        }
        Command::Sort { field, desc } => {
            let field: SortField = field.parse()?;
            book.set_sort(SortOptions {
                field,
                direction: direction(desc),
            });
            writeln!(out, "sort: {field} {}", if desc { "desc" } else { "asc" })?;
            Ok(true)
        }
        Command::Theme => {
            let theme = book.toggle_theme();
            writeln!(out, "theme: {}", serde_json::to_string(&theme)?.trim_matches('"'))?;
            Ok(true)
        }
        Command::Export(args) => handle_export(book, args, now, out),
        Command::Dump => {
            writeln!(out, "{}", StateDocument::from_book(book).to_json()?)?;
            Ok(false)
        }
        Command::Import { file } => {
            let document = StateDocument::read(&file)
                .with_context(|| format!("failed to import {}", file.display()))?;
            *book = document.into_book(now);
            info!(path = %file.display(), tasks = book.len(), "Imported state");
            writeln!(out, "imported {} task(s)", book.len())?;
            Ok(true)
        }
    }
}

const fn direction(desc: bool) -> SortDirection {
    if desc { SortDirection::Desc } else { SortDirection::Asc }
}

/// Configured default list, resolved by id or name; the inbox when unknown.
fn default_list(book: &TaskBook, defaults: &DefaultsConfig) -> ListId {
    resolve_list(book, &defaults.list).unwrap_or_else(|_| defaults.list_id())
}

fn handle_add(
    book: &mut TaskBook,
    defaults: &DefaultsConfig,
    text: &str,
    description: Option<String>,
    now: OffsetDateTime,
    out: &mut impl Write,
) -> Result<bool> {
    let default_list = default_list(book, defaults);
    let output = TaskService::new(book, default_list).quick_add(text, now)?;
    if let Some(description) = description.filter(|text| !text.trim().is_empty()) {
        let update = TaskUpdate {
            description: Some(DescriptionPatch::Set { description }),
            ..TaskUpdate::default()
        };
        book.update_task(output.task, &update, now)?;
    }
    for tag in &output.created_tags {
        writeln!(out, "created tag: {tag}")?;
    }
    writeln!(out, "created task: {} ({})", output.task, output.parsed.describe(now))?;
    Ok(true)
}

fn has_filter_flags(args: &LsArgs) -> bool {
    args.completed
        || args.pending
        || args.priority.is_some()
        || !args.tags.is_empty()
        || args.search.is_some()
        || args.due_from.is_some()
        || args.due_until.is_some()
}

fn build_filter(book: &TaskBook, args: &LsArgs, now: OffsetDateTime) -> Result<TaskFilter> {
    let completed = if args.completed {
        Some(true)
    } else if args.pending {
        Some(false)
    } else {
        None
    };
    let filter = TaskFilterBuilder::new()
        .with_completed(completed)
        .with_priority(args.priority.as_deref())?
        .with_tag_names(&args.tags, book.tags())?
        .with_text(args.search.clone())
        .with_due_range(args.due_from.as_deref(), args.due_until.as_deref(), now)?
        .build();
    Ok(filter)
}

/// Stored sort, or the configured default when the stored one was never changed.
fn effective_sort(book: &TaskBook, defaults: &DefaultsConfig) -> Result<SortOptions> {
    let stored = book.app().sort;
    if stored == SortOptions::default() {
        defaults.sort()
    } else {
        Ok(stored)
    }
}

fn handle_ls(
    book: &mut TaskBook,
    defaults: &DefaultsConfig,
    args: LsArgs,
    now: OffsetDateTime,
    out: &mut impl Write,
) -> Result<bool> {
    let selection = match args.list.as_deref() {
        Some(raw) => resolve_selection(book, raw)?,
        None => book.app().selected_list.clone(),
    };
    let filter_flags = has_filter_flags(&args);
    let filter = if filter_flags {
        build_filter(book, &args, now)?
    } else {
        book.app().filter.clone()
    };
    let sort = match args.sort.as_deref() {
        Some(raw) => SortOptions {
            field: raw.parse()?,
            direction: direction(args.desc),
        },
        None if args.desc => SortOptions {
            direction: SortDirection::Desc,
            ..effective_sort(book, defaults)?
        },
        None => effective_sort(book, defaults)?,
    };

    let changed = args.save && (filter_flags || args.sort.is_some() || args.desc);
    if changed {
        book.set_filter(filter.clone());
        book.set_sort(sort);
        info!(field = %sort.field, direction = ?sort.direction, "Saved view settings");
    }

    let tasks = tasker_core::visible(book.tasks(), &selection, &filter, sort, now);
    if tasks.is_empty() {
        if filter.is_empty() {
            writeln!(out, "No tasks found")?;
        } else {
            writeln!(out, "No tasks matched the provided filters")?;
        }
        return Ok(changed);
    }

    match args.format {
        LsFormat::Table => render_task_table(book, &tasks, now, out)?,
        LsFormat::Json => {
            let views: Vec<TaskView<'_>> = tasks.iter().map(|task| TaskView::new(book, task)).collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&views)?)?;
        }
    }
    Ok(changed)
}

fn handle_edit(book: &mut TaskBook, args: EditArgs, now: OffsetDateTime, out: &mut impl Write) -> Result<bool> {
    let id = parse_task_id(book, &args.task)?;

    let priority = args
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;
    let due = if args.clear_due {
        Some(DuePatch::Clear)
    } else if let Some(raw) = args.due.as_deref() {
        let due = due::resolve(raw, now).with_context(|| format!("Invalid due date: {raw}"))?;
        Some(DuePatch::Set { due })
    } else {
        None
    };
    let description = if args.clear_description {
        Some(DescriptionPatch::Clear)
    } else {
        args.description
            .map(|description| DescriptionPatch::Set { description })
    };
    let list = args
        .list
        .as_deref()
        .map(|raw| resolve_list(book, raw))
        .transpose()?;

    let mut added = Vec::new();
    for name in &args.add_tags {
        let tag = match resolve_tag(book, name) {
            Ok(tag) => tag,
            Err(_) => book.add_tag(name.trim().trim_start_matches('#'), None)?,
        };
        added.push(tag);
    }
    let removed = args
        .remove_tags
        .iter()
        .map(|name| resolve_tag(book, name))
        .collect::<Result<Vec<TagId>>>()?;

    let task = book.task(id).with_context(|| format!("Task not found: {id}"))?;
    let mut desired: Vec<TagId> = task
        .tags
        .iter()
        .filter(|tag| !removed.contains(tag))
        .cloned()
        .collect();
    for tag in added {
        if !desired.contains(&tag) {
            desired.push(tag);
        }
    }

    let update = TaskUpdate {
        title: args.title,
        description,
        completed: None,
        priority,
        due,
        list,
        ..TaskUpdate::default()
    }
    .with_tags(task, &desired);

    if update.is_empty() {
        writeln!(out, "nothing to update: {id}")?;
        return Ok(false);
    }
    book.update_task(id, &update, now)?;
    writeln!(out, "updated task: {id}")?;
    Ok(true)
}

fn handle_list(book: &mut TaskBook, command: ListCommand, now: OffsetDateTime, out: &mut impl Write) -> Result<bool> {
    match command {
        ListCommand::Add { name, color, icon } => {
            let id = book.add_list(&name, color, icon, now)?;
            writeln!(out, "created list: {name} ({id})")?;
            Ok(true)
        }
        ListCommand::Rename { list, name } => {
            let id = resolve_list(book, &list)?;
            book.update_list(
                &id,
                ListUpdate {
                    name: Some(name.clone()),
                    ..ListUpdate::default()
                },
                now,
            )?;
            writeln!(out, "renamed list: {id} -> {name}")?;
            Ok(true)
        }
        ListCommand::Rm { list } => {
            let id = resolve_list(book, &list)?;
            let moved = book.delete_list(&id, now)?;
            writeln!(out, "deleted list: {id} ({moved} task(s) moved to Inbox)")?;
            Ok(true)
        }
        ListCommand::Ls => {
            writeln!(out, "ID | Name | Tasks")?;
            writeln!(out, "-- | ---- | -----")?;
            for (id, count) in book.list_counts(now) {
                let name = book.list(&id).map_or("-", |list| list.name.as_str());
                let icon = book
                    .list(&id)
                    .and_then(|list| list.icon.as_deref())
                    .map_or_else(String::new, |icon| format!("{icon} "));
                writeln!(out, "{id} | {icon}{name} | {count}")?;
            }
            Ok(false)
        }
    }
}

fn handle_tag(book: &mut TaskBook, command: TagCommand, now: OffsetDateTime, out: &mut impl Write) -> Result<bool> {
    match command {
        TagCommand::Add { name, color } => {
            let id = book.add_tag(&name, color)?;
            writeln!(out, "created tag: {name} ({id})")?;
            Ok(true)
        }
        TagCommand::Rename { tag, name } => {
            let id = resolve_tag(book, &tag)?;
            book.update_tag(
                &id,
                TagUpdate {
                    name: Some(name.clone()),
                    ..TagUpdate::default()
                },
            )?;
            writeln!(out, "renamed tag: {id} -> {name}")?;
            Ok(true)
        }
        TagCommand::Rm { tag } => {
            let id = resolve_tag(book, &tag)?;
            let detached = book.delete_tag(&id, now)?;
            writeln!(out, "deleted tag: {id} (removed from {detached} task(s))")?;
            Ok(true)
        }
        TagCommand::Ls => {
            writeln!(out, "ID | Name | Color")?;
            writeln!(out, "-- | ---- | -----")?;
            for tag in book.tags() {
                writeln!(out, "{} | {} | {}", tag.id, tag.name, tag.color)?;
            }
            Ok(false)
        }
    }
}

fn handle_export(book: &TaskBook, args: ExportArgs, now: OffsetDateTime, out: &mut impl Write) -> Result<bool> {
    let options = ExportOptions {
        include_completed: !args.no_completed,
        include_subtasks: !args.no_subtasks,
        list: args
            .list
            .as_deref()
            .map(|raw| resolve_list(book, raw))
            .transpose()?,
    };
    let format: ExportFormat = args.format.into();
    let rendered = render_export(book, format, &options, now);
    match args.output {
        Some(path) => {
            let path = if path.is_dir() { path.join(format.file_name(now)) } else { path };
            fs::write(&path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), %format, "Exported tasks");
            writeln!(out, "exported to {}", path.display())?;
        }
        None => write!(out, "{rendered}")?,
    }
    Ok(false)
}
