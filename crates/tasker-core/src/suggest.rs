//! Completion candidates for a partially typed quick-add line.

use crate::due::DUE_KEYWORDS;
use crate::id::{ListId, TagId};
use crate::model::{NamedRef, Priority};
use crate::parser::TokenKind;

/// Candidates for the sigil word currently being typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions {
    /// Family of the sigil being completed.
    pub kind: TokenKind,
    /// Values that may follow the sigil.
    pub candidates: Vec<String>,
}

fn last_word(input: &str) -> &str {
    input.rsplit(char::is_whitespace).next().unwrap_or(input)
}

/// Inspect the last whitespace-delimited word of `input` and, when it is a
/// sigil (alone or followed by a partial token), return the candidates for
/// that family.
///
/// Due dates and priorities have fixed candidate lists; tags and lists offer
/// the names of the known records.
#[must_use]
pub fn suggest(
    input: &str,
    lists: &[NamedRef<'_, ListId>],
    tags: &[NamedRef<'_, TagId>],
) -> Option<Suggestions> {
    let kind = last_word(input).chars().next().and_then(TokenKind::from_sigil)?;
    let candidates = match kind {
        TokenKind::Due => DUE_KEYWORDS.iter().map(|k| (*k).to_owned()).collect(),
        TokenKind::Priority => [Priority::Low, Priority::Medium, Priority::High, Priority::None]
            .iter()
            .map(|p| p.as_str().to_owned())
            .collect(),
        TokenKind::Tag => tags.iter().map(|tag| tag.name.to_owned()).collect(),
        TokenKind::List => lists.iter().map(|list| list.name.to_owned()).collect(),
    };
    Some(Suggestions { kind, candidates })
}

/// Complete the sigil word at the end of `input` with `candidate`.
///
/// `"buy milk #gr"` + `"groceries"` becomes `"buy milk #groceries "`. When
/// the last word is not a sigil word the candidate is appended as a new word.
#[must_use]
pub fn apply_suggestion(input: &str, candidate: &str) -> String {
    let (head, last) = input.rsplit_once(char::is_whitespace).unwrap_or(("", input));
    let separator = if head.is_empty() && !input.starts_with(char::is_whitespace) {
        ""
    } else {
        " "
    };
    match last.chars().next().and_then(TokenKind::from_sigil) {
        Some(kind) => format!("{head}{separator}{}{candidate} ", kind.sigil()),
        None if last.is_empty() => format!("{input}{candidate} "),
        None => format!("{input} {candidate} "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_candidates_for_due_and_priority() {
        let due = suggest("call mom @", &[], &[]).unwrap_or_else(|| panic!("@ must suggest"));
        assert_eq!(due.kind, TokenKind::Due);
        assert_eq!(due.candidates, vec!["today", "tomorrow", "next week", "next month"]);

        let priority = suggest("call mom !h", &[], &[]).unwrap_or_else(|| panic!("! must suggest"));
        assert_eq!(priority.kind, TokenKind::Priority);
        assert_eq!(priority.candidates, vec!["low", "medium", "high", "none"]);
    }

    #[test]
    fn live_names_for_tags_and_lists() {
        let errands = TagId::from("errands");
        let work = ListId::from("work");
        let tags = [NamedRef {
            id: &errands,
            name: "Errands",
        }];
        let lists = [NamedRef {
            id: &work,
            name: "Work",
        }];

        let tag = suggest("milk #", &lists, &tags).unwrap_or_else(|| panic!("# must suggest"));
        assert_eq!(tag.kind, TokenKind::Tag);
        assert_eq!(tag.candidates, vec!["Errands"]);

        let list = suggest("milk ~wo", &lists, &tags).unwrap_or_else(|| panic!("~ must suggest"));
        assert_eq!(list.kind, TokenKind::List);
        assert_eq!(list.candidates, vec!["Work"]);
    }

    #[test]
    fn nothing_outside_sigil_words() {
        assert_eq!(suggest("", &[], &[]), None);
        assert_eq!(suggest("buy milk", &[], &[]), None);
        assert_eq!(suggest("buy milk #dairy ", &[], &[]), None);
        assert_eq!(suggest("me@home", &[], &[]), None);
    }

    #[test]
    fn applying_a_suggestion_completes_the_sigil_word() {
        assert_eq!(apply_suggestion("buy milk #gr", "groceries"), "buy milk #groceries ");
        assert_eq!(apply_suggestion("buy milk @", "tomorrow"), "buy milk @tomorrow ");
        assert_eq!(apply_suggestion("!", "high"), "!high ");
        assert_eq!(apply_suggestion("buy milk ", "later"), "buy milk later ");
        assert_eq!(apply_suggestion("buy milk", "later"), "buy milk later ");
    }
}
