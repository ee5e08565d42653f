use crate::model::Task;

/// Case-insensitive substring matcher for task text.
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Determine whether the title or the description contains the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_field(&task.title)
            || task
                .description
                .as_deref()
                .is_some_and(|description| self.matches_field(description))
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ListId;
    use time::macros::datetime;

    fn task(title: &str, description: Option<&str>) -> Task {
        let mut task = Task::new(title, ListId::inbox(), datetime!(2025-01-01 0:00 UTC), 1);
        task.description = description.map(str::to_owned);
        task
    }

    #[test]
    fn matcher_skips_blank_queries() {
        assert!(TextMatcher::new("").is_none());
        assert!(TextMatcher::new("   ").is_none());
        assert!(TextMatcher::new("\n").is_none());
    }

    #[test]
    fn matcher_checks_title_and_description() {
        let task = task("Renew Passport", Some("Bring two PHOTOS"));

        let matcher = TextMatcher::new("passport")
            .unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(matcher.matches(&task));

        let matcher = TextMatcher::new("photos")
            .unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(matcher.matches(&task));

        let missing = TextMatcher::new("visa")
            .unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(!missing.matches(&task));
    }

    #[test]
    fn matcher_handles_missing_description() {
        let task = task("Improve CLI", None);

        let matcher =
            TextMatcher::new("CLI").unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(matcher.matches(&task));

        let missing =
            TextMatcher::new("notes").unwrap_or_else(|| panic!("matcher must exist for queries with content"));
        assert!(!missing.matches(&task));
    }
}
