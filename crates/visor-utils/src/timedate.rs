//! Date and time helpers in the formats shown to the user.
//!
//! Local time is used when the platform can report the UTC offset safely;
//! otherwise the helpers fall back to UTC, which the rendered offset makes
//! visible.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, error::Format};

/// `YYYY-MM-DD`.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// `HH:MM:SS`, 24-hour clock.
pub const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// `YYYY-MM-DD -- HH:MM:SS (UTC±hh:mm)`.
pub const DATE_TIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] -- [hour]:[minute]:[second] (UTC[offset_hour sign:mandatory]:[offset_minute])"
);

/// Current local date and time in [`DATE_TIME_FORMAT`].
#[must_use]
pub fn date_time_str() -> String {
    render(now(), DATE_TIME_FORMAT)
}

/// Current local date in [`DATE_FORMAT`].
#[must_use]
pub fn date_str() -> String {
    render(now(), DATE_FORMAT)
}

/// Current local time in [`TIME_FORMAT`].
#[must_use]
pub fn time_str() -> String {
    render(now(), TIME_FORMAT)
}

/// Formats `moment` in [`DATE_TIME_FORMAT`].
pub fn format_date_time(moment: OffsetDateTime) -> Result<String, Format> {
    moment.format(DATE_TIME_FORMAT)
}

/// Nanoseconds since the Unix epoch, saturating at the bounds of `i64`.
#[must_use]
pub fn now_nanos() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(if nanos.is_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

// Every component of the formats above is always available on an
// `OffsetDateTime`, so formatting cannot fail in practice.
fn render(moment: OffsetDateTime, format: &[FormatItem<'_>]) -> String {
    moment.format(format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_with_signed_offset() {
        let moment = datetime!(2024-03-09 07:05:01 -03:30);
        assert_eq!(
            format_date_time(moment).expect("format"),
            "2024-03-09 -- 07:05:01 (UTC-03:30)"
        );
        assert_eq!(
            format_date_time(datetime!(2024-12-31 23:59:59 UTC)).expect("format"),
            "2024-12-31 -- 23:59:59 (UTC+00:00)"
        );
    }

    #[test]
    fn current_strings_have_expected_shape() {
        assert_eq!(date_str().len(), "2024-03-09".len());
        assert_eq!(time_str().len(), "07:05:01".len());
        assert!(date_time_str().contains(" -- "));
        assert!(date_time_str().contains("(UTC"));
    }

    #[test]
    fn now_nanos_is_after_2020() {
        assert!(now_nanos() > 1_577_836_800_000_000_000);
    }
}
