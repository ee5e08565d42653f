use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Identifier of a task (UUID v7).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct TaskId(pub Uuid);

impl TaskId {
    #[must_use]
    /// Generate a fresh task identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of the reserved inbox list.
pub const INBOX: &str = "inbox";
/// Identifier of the "due today" smart list.
pub const TODAY: &str = "today";
/// Identifier of the "due later" smart list.
pub const UPCOMING: &str = "upcoming";

/// Identifier of a task list.
///
/// User-created lists get a UUID v7 string, the built-in lists use the
/// fixed ids [`INBOX`], [`TODAY`] and [`UPCOMING`].
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(String);

impl ListId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier for a user-created list.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The inbox list, home of tasks whose list was deleted.
    #[must_use]
    pub fn inbox() -> Self {
        Self::new(INBOX)
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `today` and `upcoming`, whose membership is computed from due dates.
    #[must_use]
    pub fn is_smart(&self) -> bool {
        matches!(self.0.as_str(), TODAY | UPCOMING)
    }

    /// True for the three built-in lists.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        matches!(self.0.as_str(), INBOX | TODAY | UPCOMING)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a tag.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_uses_uuid_v7() {
        let id = TaskId::new();
        assert_eq!(id.0.get_version_num(), 7);
    }

    #[test]
    fn task_id_roundtrip() {
        let uuid = Uuid::now_v7();
        let parsed: TaskId = uuid
            .to_string()
            .parse()
            .unwrap_or_else(|err| panic!("must parse task id: {err}"));
        assert_eq!(parsed.0, uuid);
    }

    #[test]
    fn reserved_lists_are_recognized() {
        assert!(ListId::inbox().is_reserved());
        assert!(!ListId::inbox().is_smart());
        assert!(ListId::from(TODAY).is_smart());
        assert!(ListId::from(UPCOMING).is_smart());
        assert!(!ListId::generate().is_reserved());
    }

    #[test]
    fn list_and_tag_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&(ListId::inbox(), TagId::from("work")))
            .unwrap_or_else(|err| panic!("serialize ids: {err}"));
        assert_eq!(json, r#"["inbox","work"]"#);
    }
}
