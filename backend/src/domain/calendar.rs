//! Calendar conversion between canonical Gregorian storage dates and the
//! Jalali (solar Hijri) dates shown to and typed by staff.
//!
//! Everything persisted is `YYYY-MM-DD` Gregorian. Everything displayed is
//! `YYYY/MM/DD` Jalali. Conversion never panics: a date that cannot be
//! converted comes back as a [`DateConversionError`] which callers must handle
//! before writing anything that depends on it.
//!
//! Calendar arithmetic is done by `icu_calendar`; this module only handles
//! the text formats and the supported year span.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use icu_calendar::persian::Persian;
use icu_calendar::Date;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

use shared::{format_gregorian, GREGORIAN_DATE_FORMAT};

/// Shown instead of a date when a value cannot be interpreted
pub const UNKNOWN_DATE: &str = "تاریخ نامشخص";

const MONTH_NAMES: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

/// Jalali years converted. The arithmetic leap rule matches the observed
/// calendar throughout this span.
const SUPPORTED_YEARS: RangeInclusive<i32> = 1178..=1633;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateConversionError {
    #[error("unparsable date '{0}'")]
    Unparsable(String),
    #[error("date '{0}' is outside the supported range")]
    OutOfRange(String),
}

impl DateConversionError {
    pub fn input(&self) -> &str {
        match self {
            DateConversionError::Unparsable(input) | DateConversionError::OutOfRange(input) => input,
        }
    }
}

/// A validated Jalali calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

fn persian_date(year: i32, month: u32, day: u32) -> Option<Date<Persian>> {
    if !SUPPORTED_YEARS.contains(&year) {
        return None;
    }
    let date =
        Date::try_new_persian_date(year, u8::try_from(month).ok()?, u8::try_from(day).ok()?).ok()?;
    (date.month().ordinal == month && date.day_of_month().0 == day).then_some(date)
}

impl JalaliDate {
    /// Build a date, checking month and day against the Jalali month lengths
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        persian_date(year, month, day).map(|_| Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Persian name of this date's month
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn is_leap_year(year: i32) -> bool {
        persian_date(year, 1, 1)
            .map(|date| date.days_in_year() == 366)
            .unwrap_or(false)
    }

    /// Days in the given month, or `None` for an unsupported year or month
    pub fn month_length(year: i32, month: u32) -> Option<u32> {
        persian_date(year, month, 1).map(|date| u32::from(date.days_in_month()))
    }

    pub fn from_gregorian(date: NaiveDate) -> Option<Self> {
        let month = u8::try_from(date.month()).ok()?;
        let day = u8::try_from(date.day()).ok()?;
        let iso = Date::try_new_iso_date(date.year(), month, day).ok()?;
        let persian = iso.to_calendar(Persian);
        let year = persian.year().number;
        if !SUPPORTED_YEARS.contains(&year) {
            return None;
        }
        Some(Self {
            year,
            month: persian.month().ordinal,
            day: persian.day_of_month().0,
        })
    }

    pub fn to_gregorian(&self) -> Option<NaiveDate> {
        let iso = persian_date(self.year, self.month, self.day)?.to_iso();
        NaiveDate::from_ymd_opt(iso.year().number, iso.month().ordinal, iso.day_of_month().0)
    }

    pub fn today() -> Option<Self> {
        Self::from_gregorian(Local::now().date_naive())
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for JalaliDate {
    type Err = DateConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || DateConversionError::Unparsable(s.to_string());

        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(unparsable());
        }

        let year: i32 = parts[0].parse().map_err(|_| unparsable())?;
        let month: u32 = parts[1].parse().map_err(|_| unparsable())?;
        let day: u32 = parts[2].parse().map_err(|_| unparsable())?;

        if !SUPPORTED_YEARS.contains(&year) {
            return Err(DateConversionError::OutOfRange(s.to_string()));
        }
        Self::new(year, month, day).ok_or_else(unparsable)
    }
}

/// Date values accepted by [`format_long`]
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Text(&'a str),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(value: &'a str) -> Self {
        DateInput::Text(value)
    }
}

impl<'a> From<&'a String> for DateInput<'a> {
    fn from(value: &'a String) -> Self {
        DateInput::Text(value.as_str())
    }
}

impl From<NaiveDate> for DateInput<'_> {
    fn from(value: NaiveDate) -> Self {
        DateInput::Date(value)
    }
}

impl From<NaiveDateTime> for DateInput<'_> {
    fn from(value: NaiveDateTime) -> Self {
        DateInput::DateTime(value)
    }
}

/// Convert a canonical `YYYY-MM-DD` date to Jalali `YYYY/MM/DD`
pub fn to_local(gregorian: &str) -> Result<String, DateConversionError> {
    let date = NaiveDate::parse_from_str(gregorian.trim(), GREGORIAN_DATE_FORMAT)
        .map_err(|_| DateConversionError::Unparsable(gregorian.to_string()))?;
    JalaliDate::from_gregorian(date)
        .map(|jalali| jalali.to_string())
        .ok_or_else(|| DateConversionError::OutOfRange(gregorian.to_string()))
}

/// Convert a Jalali `YYYY/MM/DD` date to canonical `YYYY-MM-DD`
pub fn to_gregorian(local: &str) -> Result<String, DateConversionError> {
    local_to_naive(local).map(format_gregorian)
}

/// Parse a Jalali `YYYY/MM/DD` string straight to a Gregorian date
pub fn local_to_naive(local: &str) -> Result<NaiveDate, DateConversionError> {
    let jalali: JalaliDate = local.parse()?;
    jalali
        .to_gregorian()
        .ok_or_else(|| DateConversionError::OutOfRange(local.to_string()))
}

/// Today's Jalali date, for pre-filling date inputs
pub fn today_local() -> String {
    JalaliDate::today()
        .map(|date| date.to_string())
        .unwrap_or_default()
}

/// Human-readable Jalali date such as `"1 فروردین 1403"`. Returns
/// [`UNKNOWN_DATE`] for empty or unparsable input.
pub fn format_long<'a>(input: impl Into<DateInput<'a>>) -> String {
    let date = match input.into() {
        DateInput::Text(text) => {
            match NaiveDate::parse_from_str(text.trim(), GREGORIAN_DATE_FORMAT) {
                Ok(date) => date,
                Err(_) => return UNKNOWN_DATE.to_string(),
            }
        }
        DateInput::Date(date) => date,
        DateInput::DateTime(date_time) => date_time.date(),
    };

    match JalaliDate::from_gregorian(date) {
        Some(jalali) => format!("{} {} {}", jalali.day(), jalali.month_name(), jalali.year()),
        None => UNKNOWN_DATE.to_string(),
    }
}
