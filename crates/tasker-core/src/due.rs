//! Due-date resolution for the `@` quick-add token.
//!
//! Due dates are end-of-day instants: whatever the input, the resolved value
//! carries the time 23:59:59.999 in the offset of the caller's clock.

use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::{format_description, time};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Time of day every due date is pinned to.
pub const END_OF_DAY: Time = time!(23:59:59.999);

/// Relative keywords understood after `@`, in suggestion order.
pub const DUE_KEYWORDS: [&str; 4] = ["today", "tomorrow", "next week", "next month"];

const TEXTUAL_FORMATS: [&[BorrowedFormatItem<'static>]; 5] = [
    format_description!("[month repr:long case_sensitive:false] [day padding:none] [year]"),
    format_description!("[month repr:short case_sensitive:false] [day padding:none] [year]"),
    format_description!("[day padding:none] [month repr:long case_sensitive:false] [year]"),
    format_description!("[day padding:none] [month repr:short case_sensitive:false] [year]"),
    format_description!("[year]/[month padding:none]/[day padding:none]"),
];

/// Pin `date` to [`END_OF_DAY`] in the offset of `now`.
#[must_use]
pub const fn end_of_day(date: Date, now: OffsetDateTime) -> OffsetDateTime {
    PrimitiveDateTime::new(date, END_OF_DAY).assume_offset(now.offset())
}

/// Resolve the text captured after `@` into a due instant.
///
/// Keywords are tried first, then numeric dates (`YYYY-MM-DD`, `MM/DD/YYYY`,
/// `MM-DD-YYYY`), then a handful of textual formats. Returns `None` when
/// nothing matches or the date does not exist on the calendar.
#[must_use]
pub fn resolve(text: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }
    keyword_date(&normalized.to_lowercase(), now.date())
        .or_else(|| parse_date(&normalized, now))
        .map(|date| end_of_day(date, now))
}

fn keyword_date(keyword: &str, today: Date) -> Option<Date> {
    match keyword {
        "today" => Some(today),
        "tomorrow" => today.next_day(),
        "next week" => today.checked_add(Duration::days(7)),
        "next month" => add_one_month(today),
        _ => None,
    }
}

/// Same day next month, clamped to the last day of a shorter month.
fn add_one_month(date: Date) -> Option<Date> {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        other => (date.year(), other.next()),
    };
    (1..=date.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
}

fn parse_date(text: &str, now: OffsetDateTime) -> Option<Date> {
    if let Some(shape) = numeric_shape(text) {
        // A numeric date that fails calendar validation is rejected outright.
        return shape.into_date();
    }
    if let Ok(instant) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(instant.to_offset(now.offset()).date());
    }
    let cleaned = text.replace(',', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    TEXTUAL_FORMATS
        .iter()
        .find_map(|format| Date::parse(&cleaned, *format).ok())
}

struct NumericDate<'a> {
    year: &'a str,
    month: &'a str,
    day: &'a str,
}

impl NumericDate<'_> {
    fn into_date(self) -> Option<Date> {
        let year: i32 = self.year.parse().ok()?;
        let month = Month::try_from(self.month.parse::<u8>().ok()?).ok()?;
        let day: u8 = self.day.parse().ok()?;
        Date::from_calendar_date(year, month, day).ok()
    }
}

/// Split `YYYY-MM-DD`, `MM/DD/YYYY` or `MM-DD-YYYY` into its fields.
fn numeric_shape(text: &str) -> Option<NumericDate<'_>> {
    let parts: Vec<&str> = text.split(['/', '-']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };
    if !parts
        .iter()
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let short = |part: &str| part.len() <= 2;
    if first.len() == 4 && short(second) && short(third) && !text.contains('/') {
        Some(NumericDate {
            year: first,
            month: second,
            day: third,
        })
    } else if short(first) && short(second) && third.len() == 4 {
        Some(NumericDate {
            year: third,
            month: first,
            day: second,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-01-31 09:30:00 +02:00);

    fn resolved_date(text: &str) -> Option<Date> {
        resolve(text, NOW).map(OffsetDateTime::date)
    }

    #[test]
    fn keywords_are_offsets_from_now() {
        assert_eq!(resolved_date("today"), Some(date!(2024-01-31)));
        assert_eq!(resolved_date("Tomorrow"), Some(date!(2024-02-01)));
        assert_eq!(resolved_date("next week"), Some(date!(2024-02-07)));
        assert_eq!(resolved_date("next   week"), Some(date!(2024-02-07)));
        assert_eq!(resolved_date("next month"), Some(date!(2024-02-29)));
    }

    #[test]
    fn next_month_rolls_over_the_year() {
        assert_eq!(add_one_month(date!(2024-12-15)), Some(date!(2025-01-15)));
    }

    #[test]
    fn results_are_pinned_to_end_of_day_in_clock_offset() {
        let due = resolve("03/15/2024", NOW).unwrap_or_else(|| panic!("date must resolve"));
        assert_eq!(due.time(), END_OF_DAY);
        assert_eq!(due.offset(), NOW.offset());
        assert_eq!(due.date(), date!(2024-03-15));
    }

    #[test]
    fn numeric_formats() {
        assert_eq!(resolved_date("2024-03-05"), Some(date!(2024-03-05)));
        assert_eq!(resolved_date("3/5/2024"), Some(date!(2024-03-05)));
        assert_eq!(resolved_date("03-05-2024"), Some(date!(2024-03-05)));
        assert_eq!(resolved_date("2024/03/05"), Some(date!(2024-03-05)));
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        assert_eq!(resolved_date("02/30/2024"), None);
        assert_eq!(resolved_date("13/01/2024"), None);
        assert_eq!(resolved_date("2023-02-29"), None);
    }

    #[test]
    fn textual_formats() {
        assert_eq!(resolved_date("March 5 2024"), Some(date!(2024-03-05)));
        assert_eq!(resolved_date("mar 5, 2024"), Some(date!(2024-03-05)));
        assert_eq!(resolved_date("5 march 2024"), Some(date!(2024-03-05)));
        assert_eq!(resolved_date("2024-03-05T22:30:00Z"), Some(date!(2024-03-06)));
    }

    #[test]
    fn unknown_text_leaves_date_unset() {
        assert_eq!(resolved_date("someday"), None);
        assert_eq!(resolved_date("call mom"), None);
        assert_eq!(resolved_date(""), None);
    }
}
