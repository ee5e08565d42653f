//! Application layer logic for tasker.
//!
//! This crate owns the mutable task book and its cascade rules, the JSON state
//! file, configuration, the quick-add service and exporters shared by
//! front ends.

pub mod app_state;
/// TOML configuration.
pub mod config;
pub mod export;
/// Filter construction from user-facing strings.
pub mod filter_util;
/// Quick-add service.
pub mod service;
pub mod storage;
pub mod task_book;
/// Partial updates for tasks, lists and tags.
pub mod task_patch;

// Re-exports for convenience
pub use app_state::{AppState, Theme};
pub use config::{AppConfig, DefaultsConfig, StorageConfig};
pub use export::{ExportFormat, ExportOptions, render as render_export, to_csv, to_markdown};
pub use filter_util::{FilterBuildError, FilterBuildResult, TaskFilterBuilder};
pub use service::{QuickAddOutput, TaskService};
pub use storage::{STATE_VERSION, StateDocument, StateFile, StorageError};
pub use task_book::{
    BookError, BookResult, DEFAULT_LIST_COLOR, DEFAULT_TAG_COLOR, NewTask, TaskBook, default_lists,
    default_tags,
};
pub use task_patch::{DescriptionPatch, DuePatch, ListUpdate, SetDiff, TagUpdate, TaskUpdate, diff_sets};
