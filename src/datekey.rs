use std::fmt;
use thiserror::Error;
use time::{Date, Month};

/// Lookup key for one calendar day in the event store, of the form
/// `{year}-{month}-{day}` with a one-based month and no zero padding.
///
/// The format is shared with whatever writes the store, so it must not
/// change: `2024-2-5`, never `2024-02-05`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct DateKey(String);

impl DateKey {
    /// `month0` is zero-based (January is 0), matching calendar month fields
    /// that count from zero.
    pub(crate) fn encode(year: i32, month0: u8, day: u8) -> DateKey {
        DateKey(format!("{year}-{}-{day}", u16::from(month0) + 1))
    }

    pub(crate) fn for_date(date: Date) -> DateKey {
        DateKey::encode(date.year(), u8::from(date.month()) - 1, date.day())
    }

    /// Parse a key such as `2024-2-5` (zero padding is tolerated) into its
    /// canonical form, rejecting strings that do not name a real date
    pub(crate) fn parse(s: &str) -> Result<DateKey, InvalidDate> {
        let malformed = || InvalidDate::Malformed(s.to_owned());
        let mut parts = s.trim().split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let year = year.parse::<i32>().map_err(|_| malformed())?;
        let month = month.parse::<u8>().map_err(|_| malformed())?;
        let day = day.parse::<u8>().map_err(|_| malformed())?;
        let month0 = month.checked_sub(1).ok_or(InvalidDate::OutOfRange {
            year,
            month: 0,
            day,
        })?;
        date_from_parts(year, month0, day).map(DateKey::for_date)
    }

    pub(crate) fn has_events_key(&self) -> String {
        format!("has_events_{}", self.0)
    }

    pub(crate) fn event_title_key(&self) -> String {
        format!("event_title_{}", self.0)
    }

    #[cfg(test)]
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a date from raw components with a zero-based month.  This is the
/// only place unchecked integers become a [`Date`].
pub(crate) fn date_from_parts(year: i32, month0: u8, day: u8) -> Result<Date, InvalidDate> {
    let invalid = || InvalidDate::OutOfRange {
        year,
        month: u16::from(month0) + 1,
        day,
    };
    let month = month0
        .checked_add(1)
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(invalid)?;
    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum InvalidDate {
    #[error("malformed date key {0:?}")]
    Malformed(String),
    #[error("no such date: year {year}, month {month}, day {day}")]
    OutOfRange { year: i32, month: u16, day: u8 },
}
