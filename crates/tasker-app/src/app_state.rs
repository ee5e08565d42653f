//! Persisted view preferences.

use serde::{Deserialize, Serialize};
use tasker_core::{ListId, ListSelection, SortOptions, TaskFilter};

/// Color scheme remembered between sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Selected list, filter, sort and theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// List shown by default; `null` shows every list.
    #[serde(default = "inbox_selection")]
    pub selected_list: ListSelection,
    /// Active filter.
    #[serde(default)]
    pub filter: TaskFilter,
    /// Active sort.
    #[serde(default)]
    pub sort: SortOptions,
    /// Color scheme.
    #[serde(default)]
    pub theme: Theme,
}

fn inbox_selection() -> ListSelection {
    ListSelection::List(ListId::inbox())
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            selected_list: inbox_selection(),
            filter: TaskFilter::default(),
            sort: SortOptions::default(),
            theme: Theme::default(),
        }
    }
}
