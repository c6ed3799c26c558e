use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};

/// Format a task date as `DD.MM.YY`.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates. Empty input yields an
/// empty string and anything unparseable is returned unchanged.
#[must_use]
pub fn format_date_display(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    parse_date(trimmed)
        .and_then(|date| date.format(DISPLAY_DATE).ok())
        .unwrap_or_else(|| raw.to_owned())
}

const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day].[month].[year repr:last_two]");

fn parse_date(raw: &str) -> Option<Date> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts.date());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_plain_dates() {
        assert_eq!(format_date_display("2024-03-09"), "09.03.24");
    }

    #[test]
    fn formats_timestamps_using_their_own_offset() {
        assert_eq!(format_date_display("2025-12-31T23:30:00.000Z"), "31.12.25");
        assert_eq!(format_date_display("2025-01-01T00:30:00+09:00"), "01.01.25");
    }

    #[test]
    fn empty_and_garbage_inputs() {
        assert_eq!(format_date_display(""), "");
        assert_eq!(format_date_display("   "), "");
        assert_eq!(format_date_display("next tuesday"), "next tuesday");
    }

    #[test]
    fn pads_two_digit_years() {
        assert_eq!(format_date_display("2005-07-04"), "04.07.05");
    }
}
