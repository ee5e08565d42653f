//! Markdown and CSV renderings of a task book.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use tasker_core::{ListId, Priority, TagId, Task};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::task_book::TaskBook;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Markdown table with a summary.
    #[default]
    Markdown,
    /// Comma-separated values.
    Csv,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Csv => "csv",
        }
    }

    /// Suggested file name, e.g. `tasks-export-2025-03-10.md`.
    #[must_use]
    pub fn file_name(self, now: OffsetDateTime) -> String {
        format!("tasks-export-{}.{}", date(now), self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Csv => "csv",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Which tasks to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Include completed tasks.
    pub include_completed: bool,
    /// Emit subtasks below their parent.
    pub include_subtasks: bool,
    /// Restrict to one stored list.
    pub list: Option<ListId>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_completed: true,
            include_subtasks: true,
            list: None,
        }
    }
}

/// A top-level task and the subtasks exported with it.
struct Row<'a> {
    task: &'a Task,
    subtasks: Vec<&'a Task>,
}

struct Exporter<'a> {
    book: &'a TaskBook,
    rows: Vec<Row<'a>>,
}

impl<'a> Exporter<'a> {
    fn new(book: &'a TaskBook, options: &ExportOptions) -> Self {
        let keep = |task: &Task| options.include_completed || !task.completed;
        let mut top: Vec<&Task> = book
            .tasks()
            .filter(|task| !task.is_subtask())
            .filter(|task| keep(*task))
            .filter(|task| options.list.as_ref().is_none_or(|list| task.list == *list))
            .collect();
        top.sort_by(|a, b| {
            let by_list = if a.list == b.list {
                std::cmp::Ordering::Equal
            } else {
                list_sort_name(book, &a.list).cmp(&list_sort_name(book, &b.list))
            };
            by_list.then(a.order.cmp(&b.order))
        });
        let rows = top
            .into_iter()
            .map(|task| Row {
                task,
                subtasks: if options.include_subtasks {
                    book.subtasks_of(task.id).into_iter().filter(|sub| keep(*sub)).collect()
                } else {
                    Vec::new()
                },
            })
            .collect();
        Self { book, rows }
    }

    fn list_name(&self, id: &ListId) -> &'a str {
        self.book.list(id).map_or("Unknown", |list| list.name.as_str())
    }

    fn tag_names(&self, ids: &[TagId]) -> Vec<String> {
        ids.iter()
            .map(|id| self.book.tag(id).map_or_else(|| id.to_string(), |tag| tag.name.clone()))
            .collect()
    }
}

fn list_sort_name(book: &TaskBook, id: &ListId) -> String {
    book.list(id).map(|list| list.name.to_lowercase()).unwrap_or_default()
}

fn date(instant: OffsetDateTime) -> String {
    instant
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Render the book in `format`.
#[must_use]
pub fn render(book: &TaskBook, format: ExportFormat, options: &ExportOptions, now: OffsetDateTime) -> String {
    match format {
        ExportFormat::Markdown => to_markdown(book, options, now),
        ExportFormat::Csv => to_csv(book, options),
    }
}

const fn status_glyph(completed: bool) -> &'static str {
    if completed { "✅" } else { "⬜" }
}

const fn priority_glyph(priority: Priority) -> &'static str {
    match priority {
        Priority::None => "⚪",
        Priority::Low => "🔵",
        Priority::Medium => "🟡",
        Priority::High => "🔴",
    }
}

fn priority_cell(priority: Priority) -> String {
    if priority == Priority::None {
        String::new()
    } else {
        format!("{} {priority}", priority_glyph(priority))
    }
}

fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Markdown table followed by a summary.
#[must_use]
pub fn to_markdown(book: &TaskBook, options: &ExportOptions, now: OffsetDateTime) -> String {
    let exporter = Exporter::new(book, options);
    let mut out = String::from("# Tasks Export\n\n");
    let exported = now
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default();
    let _ = writeln!(out, "*Exported on {exported}*\n");

    if exporter.rows.is_empty() {
        out.push_str("No tasks found matching the specified criteria.\n");
        return out;
    }

    out.push_str("| Status | Task | Priority | Due Date | List | Tags |\n");
    out.push_str("|--------|------|----------|----------|------|------|\n");
    let mut markdown_row = |task: &Task, prefix: &str, list_name: &str| {
        let tags = exporter
            .tag_names(&task.tags)
            .iter()
            .map(|name| format!("#{name}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "| {} | {prefix}{} | {} | {} | {} | {} |",
            status_glyph(task.completed),
            escape_pipes(&task.title),
            priority_cell(task.priority),
            task.due.map(date).unwrap_or_default(),
            escape_pipes(list_name),
            escape_pipes(&tags),
        );
    };
    for row in &exporter.rows {
        let list_name = exporter.list_name(&row.task.list);
        markdown_row(row.task, "", list_name);
        for sub in row.subtasks.iter().copied() {
            markdown_row(sub, "↳ ", list_name);
        }
    }

    let total = exporter.rows.len();
    let completed = exporter.rows.iter().filter(|row| row.task.completed).count();
    out.push_str("\n## Summary\n\n");
    let _ = writeln!(out, "- **Total Tasks**: {total}");
    let _ = writeln!(out, "- **Completed**: {completed}");
    let _ = writeln!(out, "- **Pending**: {}", total - completed);

    let mut by_list: Vec<(&str, usize)> = Vec::new();
    for row in &exporter.rows {
        let name = exporter.list_name(&row.task.list);
        match by_list.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, count)) => *count += 1,
            None => by_list.push((name, 1)),
        }
    }
    if by_list.len() > 1 {
        out.push_str("\n### Tasks by List\n\n");
        for (name, count) in by_list {
            let _ = writeln!(out, "- **{name}**: {count}");
        }
    }

    out.push_str("\n### Tasks by Priority\n\n");
    for priority in Priority::ALL.into_iter().rev() {
        let count = exporter
            .rows
            .iter()
            .filter(|row| row.task.priority == priority)
            .count();
        if count == 0 {
            continue;
        }
        let label = match priority {
            Priority::None => "No Priority",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        let _ = writeln!(out, "- {} **{label}**: {count}", priority_glyph(priority));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// CSV with one row per task, subtasks directly after their parent.
#[must_use]
pub fn to_csv(book: &TaskBook, options: &ExportOptions) -> String {
    let exporter = Exporter::new(book, options);
    let mut out = String::from("Status,Title,Priority,Due Date,List,Tags,Created,Updated\n");
    let mut csv_row = |task: &Task, title: &str, list_name: &str| {
        let priority = if task.priority == Priority::None {
            ""
        } else {
            task.priority.as_str()
        };
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            if task.completed { "Completed" } else { "Pending" },
            csv_field(title),
            priority,
            task.due.map(date).unwrap_or_default(),
            csv_field(list_name),
            csv_field(&exporter.tag_names(&task.tags).join(";")),
            date(task.created),
            date(task.updated),
        );
    };
    for row in &exporter.rows {
        let list_name = exporter.list_name(&row.task.list);
        csv_row(row.task, &row.task.title, list_name);
        for sub in row.subtasks.iter().copied() {
            csv_row(sub, &format!("↳ {}", sub.title), list_name);
        }
    }
    out
}
