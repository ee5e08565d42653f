//! Quick-add micro-syntax.
//!
//! A single line of text may carry four kinds of sigil tokens next to the
//! title words:
//!
//! | sigil | meaning  | example              |
//! |-------|----------|----------------------|
//! | `@`   | due date | `@tomorrow`, `@3/14/2025` |
//! | `!`   | priority | `!high`, `!2`        |
//! | `#`   | tag      | `#errands`           |
//! | `~`   | list     | `~work stuff`        |
//!
//! Parsing happens in two passes: [`tokenize`] records typed spans over the
//! original string, then [`parse`] resolves each family (the last occurrence
//! wins) and removes every span from the title using the recorded offsets.

use std::ops::Range;

use time::macros::format_description;
use time::OffsetDateTime;

use crate::due;
use crate::id::ListId;
use crate::model::{NamedRef, Priority};

/// Token families of the quick-add syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `@` due date.
    Due,
    /// `!` priority.
    Priority,
    /// `#` tag name.
    Tag,
    /// `~` list name.
    List,
}

impl TokenKind {
    /// Character introducing the token.
    #[must_use]
    pub const fn sigil(self) -> char {
        match self {
            Self::Due => '@',
            Self::Priority => '!',
            Self::Tag => '#',
            Self::List => '~',
        }
    }

    /// Map a leading character back to its family.
    #[must_use]
    pub const fn from_sigil(c: char) -> Option<Self> {
        match c {
            '@' => Some(Self::Due),
            '!' => Some(Self::Priority),
            '#' => Some(Self::Tag),
            '~' => Some(Self::List),
            _ => None,
        }
    }

    /// Multi-word families run until the next sigil word or the end of input.
    const fn is_multi_word(self) -> bool {
        matches!(self, Self::Due | Self::List)
    }
}

/// A recognized sigil token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token family.
    pub kind: TokenKind,
    /// Byte range in the input, sigil included.
    pub span: Range<usize>,
    /// Text after the sigil.
    pub value: &'a str,
}

/// Structured result of parsing one quick-add line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTaskInput {
    /// Title with every token removed and whitespace collapsed. May be empty.
    pub title: String,
    /// Priority from the last `!` token.
    pub priority: Option<Priority>,
    /// Due instant from the last resolvable `@` token.
    pub due: Option<OffsetDateTime>,
    /// Lower-cased tag names in order of appearance, without duplicates.
    pub tags: Option<Vec<String>>,
    /// List resolved from the last `~` token.
    pub list: Option<ListId>,
}

impl ParsedTaskInput {
    /// Render a normalized quick-add line, e.g. `Pay rent !high @tomorrow #home`.
    #[must_use]
    pub fn describe(&self, now: OffsetDateTime) -> String {
        let mut parts = Vec::new();
        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }
        if let Some(priority) = self.priority.filter(|p| *p != Priority::None) {
            parts.push(format!("!{priority}"));
        }
        if let Some(due) = self.due {
            let date = due.to_offset(now.offset()).date();
            if date == now.date() {
                parts.push("@today".to_owned());
            } else if now.date().next_day() == Some(date) {
                parts.push("@tomorrow".to_owned());
            } else if let Ok(formatted) = date.format(format_description!("[year]-[month]-[day]")) {
                parts.push(format!("@{formatted}"));
            }
        }
        for tag in self.tags.iter().flatten() {
            parts.push(format!("#{tag}"));
        }
        parts.join(" ")
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte length of the word run at the start of `text`.
///
/// With `connectors`, `-` and `/` are accepted between word characters so
/// numeric dates such as `2025-07-01` or `07/01/2025` stay in one run.
fn word_run_len(text: &str, connectors: bool) -> usize {
    let mut chars = text.char_indices().peekable();
    let mut len = 0;
    while let Some((idx, c)) = chars.next() {
        let joins = connectors
            && len > 0
            && matches!(c, '-' | '/')
            && chars.peek().is_some_and(|(_, next)| is_word_char(*next));
        if !is_word_char(c) && !joins {
            break;
        }
        len = idx + c.len_utf8();
    }
    len
}

/// Read the token opened by the sigil at `start`, if its body is valid.
fn read_token(input: &str, start: usize, kind: TokenKind) -> Option<Token<'_>> {
    let body_start = start + kind.sigil().len_utf8();
    let multi_word = kind.is_multi_word();
    let first = word_run_len(&input[body_start..], multi_word);
    if first == 0 {
        return None;
    }
    let mut end = body_start + first;
    if multi_word {
        loop {
            let gap: usize = input[end..]
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            let next = word_run_len(&input[end + gap..], true);
            if gap == 0 || next == 0 {
                break;
            }
            end += gap + next;
        }
    }
    let value = &input[body_start..end];
    if kind == TokenKind::Priority && value.parse::<Priority>().is_err() {
        return None;
    }
    Some(Token {
        kind,
        span: start..end,
        value,
    })
}

/// Scan `input` once and return every sigil token in order of appearance.
///
/// A sigil opens a token at the start of a word or right where the previous
/// token ended (`@today!high`). `#` and `!` capture one run of letters,
/// digits and underscores, and `!` only counts when that run names a
/// priority. `@` and `~` capture word runs separated by whitespace, so they
/// stop before the next sigil or any punctuation; the punctuation stays in
/// the title.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut after_token = false;
    while let Some(c) = input[pos..].chars().next() {
        let opens = after_token || input[..pos].chars().next_back().is_none_or(char::is_whitespace);
        if opens
            && let Some(kind) = TokenKind::from_sigil(c)
            && let Some(token) = read_token(input, pos, kind)
        {
            pos = token.span.end;
            tokens.push(token);
            after_token = true;
            continue;
        }
        after_token = false;
        pos += c.len_utf8();
    }
    tokens
}

/// Parse one quick-add line.
///
/// `lists` is consulted to resolve the `~` token and `now` anchors relative
/// due keywords. Nothing here fails: tokens that do not resolve simply leave
/// their field unset.
#[must_use]
pub fn parse(input: &str, lists: &[NamedRef<'_, ListId>], now: OffsetDateTime) -> ParsedTaskInput {
    let tokens = tokenize(input);
    let last = |kind: TokenKind| tokens.iter().rev().find(|token| token.kind == kind);

    let priority = last(TokenKind::Priority).and_then(|token| token.value.parse().ok());
    let due = last(TokenKind::Due).and_then(|token| due::resolve(token.value, now));
    let list = last(TokenKind::List).and_then(|token| resolve_list(token.value, lists));

    let mut tags: Vec<String> = Vec::new();
    for token in tokens.iter().filter(|token| token.kind == TokenKind::Tag) {
        let name = token.value.to_lowercase();
        if !tags.contains(&name) {
            tags.push(name);
        }
    }

    ParsedTaskInput {
        title: strip_tokens(input, &tokens),
        priority,
        due,
        tags: (!tags.is_empty()).then_some(tags),
        list,
    }
}

/// Exact (case-insensitive) name match first, then the first list whose name
/// contains the query.
fn resolve_list(query: &str, lists: &[NamedRef<'_, ListId>]) -> Option<ListId> {
    let wanted = query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    lists
        .iter()
        .find(|list| list.name.to_lowercase() == wanted)
        .or_else(|| lists.iter().find(|list| list.name.to_lowercase().contains(&wanted)))
        .map(|list| list.id.clone())
}

fn strip_tokens(input: &str, tokens: &[Token<'_>]) -> String {
    let mut kept = String::with_capacity(input.len());
    let mut cursor = 0;
    for token in tokens {
        kept.push_str(&input[cursor..token.span.start]);
        cursor = token.span.end;
    }
    kept.push_str(&input[cursor..]);
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
