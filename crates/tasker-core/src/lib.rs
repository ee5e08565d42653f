//! Domain types, quick-add parsing and the task query engine for tasker.
//!
//! Everything in this crate is pure: no I/O, no global clock. Functions that
//! depend on "now" take it as an argument.

/// Due-date keywords and date formats.
pub mod due;
/// Identifier types.
pub mod id;
/// Task, list and tag records.
pub mod model;
/// Quick-add line parser.
pub mod parser;
/// Filter/sort query engine.
pub mod query;
/// Completion suggestions while typing.
pub mod suggest;
/// Case-insensitive text search.
pub mod text_matcher;

pub use id::{ListId, TagId, TaskId};
pub use model::{NamedRef, Priority, Tag, Task, TaskList};
pub use parser::{ParsedTaskInput, TokenKind, parse};
pub use query::{
    DueRange, ListSelection, SortDirection, SortField, SortOptions, TaskFilter, list_counts, visible,
};
pub use suggest::{Suggestions, apply_suggestion, suggest};
