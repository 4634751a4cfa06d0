use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const OFFSET: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Source of the viewer's current calendar date.
pub trait Clock {
    fn today(&self) -> Date;
}

/// Reads the system clock and converts it to the viewer's local date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<UtcOffset>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { offset: None }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset.unwrap_or_else(local_offset)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> Date {
        local_date(OffsetDateTime::now_utc(), self.offset())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Calendar date of `instant` as seen at `offset`.
pub fn local_date(instant: OffsetDateTime, offset: UtcOffset) -> Date {
    instant.to_offset(offset).date()
}

pub fn format_iso_date(date: Date) -> String {
    date.format(ISO_DATE).unwrap_or_else(|_| date.to_string())
}

pub fn parse_iso_date(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    Date::parse(trimmed, ISO_DATE).map_err(|_| {
        AppError::invalid_input(format!("date must be YYYY-MM-DD, got '{trimmed}'"))
    })
}

pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, AppError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(trimmed, OFFSET).map_err(|_| {
        AppError::invalid_input(format!("utc_offset must be +HH:MM, got '{trimmed}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock, format_iso_date, local_date, parse_iso_date, parse_utc_offset};
    use time::macros::{date, datetime, offset};

    #[test]
    fn iso_date_round_trip() {
        let day = date!(2025 - 03 - 07);
        assert_eq!(format_iso_date(day), "2025-03-07");
        assert_eq!(parse_iso_date(" 2025-03-07 ").unwrap(), day);
    }

    #[test]
    fn parse_iso_date_rejects_garbage() {
        let err = parse_iso_date("07.03.2025").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(parse_iso_date("2025-02-30").is_err());
    }

    #[test]
    fn local_date_follows_viewer_offset() {
        let instant = datetime!(2025-12-22 23:30 UTC);
        assert_eq!(local_date(instant, offset!(UTC)), date!(2025 - 12 - 22));
        assert_eq!(local_date(instant, offset!(+2)), date!(2025 - 12 - 23));
        assert_eq!(
            local_date(datetime!(2025-12-22 01:00 UTC), offset!(-5)),
            date!(2025 - 12 - 21)
        );
    }

    #[test]
    fn parse_utc_offset_accepts_signed_offsets() {
        assert_eq!(parse_utc_offset("+02:00").unwrap(), offset!(+2));
        assert_eq!(parse_utc_offset("-05:30").unwrap(), offset!(-5:30));
        assert_eq!(parse_utc_offset("UTC").unwrap(), offset!(UTC));
        assert_eq!(parse_utc_offset("2").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn fixed_clock_returns_its_date() {
        let clock = FixedClock(date!(2025 - 12 - 21));
        assert_eq!(clock.today(), date!(2025 - 12 - 21));
    }
}
