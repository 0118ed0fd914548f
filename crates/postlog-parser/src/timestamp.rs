//! Timestamp normalization.
//!
//! Mail logs carry one of two timestamp shapes:
//!
//! - classic syslog, `Oct 10 04:02:08`, with no year and no zone; a
//!   single-digit day may be padded with an extra space (`Jul  3`)
//! - ISO8601 / RFC 3339, `2023-10-10T15:59:29.123456+09:00`
//!
//! [`normalize`] is the pure conversion given an explicit reference year.
//! [`TimestampNormalizer`] wraps it with the per-run [`YearTracker`] that
//! supplies that year and advances it when the log crosses from December into
//! January.

use std::str::FromStr;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};

use crate::error::{Error, Result};

/// Which timestamp grammar a raw string is expected to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    /// `Mon D HH:MM:SS`, no year.
    Syslog,
    /// `YYYY-MM-DDTHH:MM:SS[.fff][±HH:MM|Z]`.
    Iso8601,
}

impl FormatHint {
    /// Guesses the grammar from the first character.
    #[must_use]
    pub fn detect(raw: &str) -> Self {
        if raw.starts_with(|c: char| c.is_ascii_digit()) {
            Self::Iso8601
        } else {
            Self::Syslog
        }
    }
}

/// Zone that zone-less timestamps are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyslogZone {
    /// The host's local time zone, with daylight saving rules.
    #[default]
    Local,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl SyslogZone {
    /// UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Attaches this zone to a naive local time.
    ///
    /// Returns `None` for local times skipped by a daylight saving jump;
    /// ambiguous times resolve to the earlier instant.
    #[must_use]
    pub fn resolve(self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Self::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }
}

impl FromStr for SyslogZone {
    type Err = Error;

    /// Accepts `local`, `UTC` / `Z`, `±HH:MM` and `±HHMM`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
            return Ok(Self::utc());
        }
        parse_offset(trimmed)
            .map(Self::Fixed)
            .ok_or_else(|| Error::InvalidTimezone(s.to_string()))
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => return None,
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Month, day and time of a yearless syslog timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyslogStamp {
    /// Month, 1-12.
    pub month: u32,
    /// Day of month as written, 1-31.
    pub day: u32,
    /// Time of day.
    pub time: NaiveTime,
}

impl SyslogStamp {
    /// Parses `Mon D HH:MM:SS`; any run of whitespace separates the fields.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let month = month_number(parts.next()?)?;
        let day: u32 = parts.next()?.parse().ok()?;
        let time = NaiveTime::parse_from_str(parts.next()?, "%H:%M:%S").ok()?;
        if parts.next().is_some() || !(1..=31).contains(&day) {
            return None;
        }
        Some(Self { month, day, time })
    }

    /// Combines the stamp with a year. `None` for impossible dates such as
    /// Feb 29 in a common year.
    #[must_use]
    pub fn with_year(&self, year: i32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, self.month, self.day).map(|date| date.and_time(self.time))
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Parses an ISO8601 timestamp.
///
/// Timestamps without an offset are attached to `zone`.
#[must_use]
pub fn parse_iso8601(raw: &str, zone: SyslogZone) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .and_then(|naive| zone.resolve(&naive))
        })
}

/// Converts a raw timestamp into an instant.
///
/// Syslog timestamps take `reference_year` and are attached to `zone`.
/// Returns `None` for anything that does not parse; malformed timestamps are
/// never an error.
#[must_use]
pub fn normalize(
    raw: &str,
    hint: FormatHint,
    reference_year: i32,
    zone: SyslogZone,
) -> Option<DateTime<FixedOffset>> {
    match hint {
        FormatHint::Iso8601 => parse_iso8601(raw, zone),
        FormatHint::Syslog => SyslogStamp::parse(raw)
            .and_then(|stamp| stamp.with_year(reference_year))
            .and_then(|naive| zone.resolve(&naive)),
    }
}

/// Reference year state for one run.
///
/// The year starts at the wall-clock year (or a pinned value) and moves
/// forward by one whenever a syslog timestamp in January follows one in
/// December.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearTracker {
    year: i32,
    last_month: Option<u32>,
    pinned: bool,
    seen_any: bool,
}

impl YearTracker {
    /// Starts at the current local year.
    #[must_use]
    pub fn current() -> Self {
        Self::starting_at(Local::now().year(), false)
    }

    /// Starts at an explicit year that ISO8601 lines may not re-anchor.
    ///
    /// # Errors
    ///
    /// Returns an error if chrono cannot represent dates in `year`.
    pub fn pinned(year: i32) -> Result<Self> {
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(Error::InvalidYear(year));
        }
        Ok(Self::starting_at(year, true))
    }

    const fn starting_at(year: i32, pinned: bool) -> Self {
        Self {
            year,
            last_month: None,
            pinned,
            seen_any: false,
        }
    }

    /// Returns the current reference year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Records a syslog month and returns the year it belongs to.
    pub fn observe_month(&mut self, month: u32) -> i32 {
        if self.last_month == Some(12) && month == 1 {
            self.year += 1;
            tracing::debug!(year = self.year, "syslog timestamps rolled over into a new year");
        }
        self.last_month = Some(month);
        self.seen_any = true;
        self.year
    }

    /// Records an absolute timestamp.
    ///
    /// When it is the first timestamp of the run and the year is not pinned,
    /// its year becomes the reference year.
    pub fn observe_absolute(&mut self, instant: &DateTime<FixedOffset>) {
        if !self.seen_any && !self.pinned {
            self.year = instant.year();
        }
        self.seen_any = true;
    }
}

impl Default for YearTracker {
    fn default() -> Self {
        Self::current()
    }
}

/// Stateful normalizer used while classifying one stream.
#[derive(Debug, Clone, Default)]
pub struct TimestampNormalizer {
    zone: SyslogZone,
    years: YearTracker,
}

impl TimestampNormalizer {
    /// Creates a normalizer.
    #[must_use]
    pub const fn new(zone: SyslogZone, years: YearTracker) -> Self {
        Self { zone, years }
    }

    /// Returns the zone used for zone-less timestamps.
    #[must_use]
    pub const fn zone(&self) -> SyslogZone {
        self.zone
    }

    /// Returns the current reference year.
    #[must_use]
    pub const fn reference_year(&self) -> i32 {
        self.years.year()
    }

    /// Normalizes one raw timestamp, updating the reference year.
    pub fn normalize(&mut self, raw: &str, hint: FormatHint) -> Option<DateTime<FixedOffset>> {
        match hint {
            FormatHint::Syslog => {
                let stamp = SyslogStamp::parse(raw)?;
                let year = self.years.observe_month(stamp.month);
                stamp
                    .with_year(year)
                    .and_then(|naive| self.zone.resolve(&naive))
            }
            FormatHint::Iso8601 => {
                let instant = parse_iso8601(raw, self.zone)?;
                self.years.observe_absolute(&instant);
                Some(instant)
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn utc_normalizer(year: i32) -> TimestampNormalizer {
        TimestampNormalizer::new(SyslogZone::utc(), YearTracker::pinned(year).unwrap())
    }

    mod syslog_tests {
        use super::*;

        #[test]
        fn parses_single_space() {
            let stamp = SyslogStamp::parse("Oct 10 04:02:08").unwrap();
            assert_eq!(stamp.month, 10);
            assert_eq!(stamp.day, 10);
            assert_eq!(stamp.time, NaiveTime::from_hms_opt(4, 2, 8).unwrap());
        }

        #[test]
        fn double_space_padding_matches_single_space() {
            let padded = normalize("Jul  3 00:00:02", FormatHint::Syslog, 2024, SyslogZone::utc());
            let plain = normalize("Jul 3 00:00:02", FormatHint::Syslog, 2024, SyslogZone::utc());
            assert!(padded.is_some());
            assert_eq!(padded, plain);
            assert_eq!(padded.unwrap().to_rfc3339(), "2024-07-03T00:00:02+00:00");
        }

        #[test]
        fn rejects_bad_month_and_day() {
            assert!(SyslogStamp::parse("Foo 10 04:02:08").is_none());
            assert!(SyslogStamp::parse("Oct 32 04:02:08").is_none());
            assert!(SyslogStamp::parse("Oct 0 04:02:08").is_none());
            assert!(SyslogStamp::parse("Oct 10 25:02:08").is_none());
            assert!(SyslogStamp::parse("Oct 10").is_none());
        }

        #[test]
        fn leap_day_depends_on_year() {
            assert!(normalize("Feb 29 12:00:00", FormatHint::Syslog, 2024, SyslogZone::utc()).is_some());
            assert!(normalize("Feb 29 12:00:00", FormatHint::Syslog, 2023, SyslogZone::utc()).is_none());
        }

        #[test]
        fn month_names_are_case_insensitive() {
            assert_eq!(SyslogStamp::parse("OCT 10 04:02:08").unwrap().month, 10);
            assert_eq!(SyslogStamp::parse("dec 1 04:02:08").unwrap().month, 12);
        }

        #[test]
        fn fixed_zone_offset_is_kept() {
            let zone: SyslogZone = "+09:00".parse().unwrap();
            let instant = normalize("Oct 10 04:02:08", FormatHint::Syslog, 2024, zone).unwrap();
            assert_eq!(instant.to_rfc3339(), "2024-10-10T04:02:08+09:00");
        }
    }

    mod iso_tests {
        use super::*;

        #[test]
        fn parses_fractional_with_offset() {
            let instant = normalize(
                "2023-10-10T15:59:29.123456+09:00",
                FormatHint::Iso8601,
                1999,
                SyslogZone::utc(),
            )
            .unwrap();
            assert_eq!(instant.year(), 2023);
            assert_eq!(instant.offset().local_minus_utc(), 9 * 3600);
        }

        #[test]
        fn parses_zulu_and_compact_offset() {
            assert!(parse_iso8601("2023-10-10T15:59:29Z", SyslogZone::utc()).is_some());
            let compact = parse_iso8601("2023-10-10T15:59:29+0200", SyslogZone::utc()).unwrap();
            assert_eq!(compact.offset().local_minus_utc(), 2 * 3600);
        }

        #[test]
        fn zone_less_uses_configured_zone() {
            let instant = parse_iso8601("2023-10-10T15:59:29", SyslogZone::utc()).unwrap();
            assert_eq!(instant.to_rfc3339(), "2023-10-10T15:59:29+00:00");
        }

        #[test]
        fn malformed_is_none() {
            assert!(parse_iso8601("2023-13-10T15:59:29Z", SyslogZone::utc()).is_none());
            assert!(parse_iso8601("not a date", SyslogZone::utc()).is_none());
        }

        #[test]
        fn detect_hint() {
            assert_eq!(FormatHint::detect("2023-10-10T15:59:29Z"), FormatHint::Iso8601);
            assert_eq!(FormatHint::detect("Oct 10 04:02:08"), FormatHint::Syslog);
        }
    }

    mod zone_tests {
        use super::*;

        #[test]
        fn parses_names_and_offsets() {
            assert_eq!("local".parse::<SyslogZone>().unwrap(), SyslogZone::Local);
            assert_eq!("UTC".parse::<SyslogZone>().unwrap(), SyslogZone::utc());
            assert_eq!("z".parse::<SyslogZone>().unwrap(), SyslogZone::utc());
            assert_eq!(
                "-0530".parse::<SyslogZone>().unwrap(),
                SyslogZone::Fixed(FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap())
            );
        }

        #[test]
        fn rejects_garbage() {
            assert!("Europe/Paris".parse::<SyslogZone>().is_err());
            assert!("+25:00".parse::<SyslogZone>().is_err());
            assert!("+9".parse::<SyslogZone>().is_err());
        }

        #[test]
        fn rejects_non_ascii_offset() {
            assert!(matches!(
                "+1\u{e9}1".parse::<SyslogZone>(),
                Err(Error::InvalidTimezone(_))
            ));
            assert!("+\u{e9}\u{e9}".parse::<SyslogZone>().is_err());
            assert!("++1:00".parse::<SyslogZone>().is_err());
        }
    }

    mod year_tests {
        use super::*;

        #[test]
        fn december_to_january_advances_year() {
            let mut normalizer = utc_normalizer(2023);
            let dec = normalizer.normalize("Dec 31 23:59:59", FormatHint::Syslog).unwrap();
            let jan = normalizer.normalize("Jan  1 00:00:01", FormatHint::Syslog).unwrap();
            assert_eq!(dec.year(), 2023);
            assert_eq!(jan.year(), 2024);
            assert!(jan > dec);
            assert_eq!(normalizer.reference_year(), 2024);
        }

        #[test]
        fn other_backwards_steps_do_not_advance() {
            let mut tracker = YearTracker::pinned(2023).unwrap();
            assert_eq!(tracker.observe_month(11), 2023);
            assert_eq!(tracker.observe_month(10), 2023);
            assert_eq!(tracker.observe_month(1), 2023);
        }

        #[test]
        fn repeated_january_does_not_advance_twice() {
            let mut tracker = YearTracker::pinned(2023).unwrap();
            tracker.observe_month(12);
            assert_eq!(tracker.observe_month(1), 2024);
            assert_eq!(tracker.observe_month(1), 2024);
        }

        #[test]
        fn first_iso_line_anchors_unpinned_year() {
            let mut normalizer = TimestampNormalizer::new(SyslogZone::utc(), YearTracker::starting_at(2030, false));
            normalizer
                .normalize("2019-06-01T10:00:00+00:00", FormatHint::Iso8601)
                .unwrap();
            let syslog = normalizer.normalize("Jun  1 10:00:05", FormatHint::Syslog).unwrap();
            assert_eq!(syslog.year(), 2019);
        }

        #[test]
        fn pinned_year_ignores_iso_anchor() {
            let mut normalizer = utc_normalizer(2024);
            normalizer
                .normalize("2019-06-01T10:00:00+00:00", FormatHint::Iso8601)
                .unwrap();
            assert_eq!(normalizer.reference_year(), 2024);
        }

        #[test]
        fn pinned_rejects_unrepresentable_year() {
            assert_eq!(YearTracker::pinned(i32::MAX), Err(Error::InvalidYear(i32::MAX)));
        }
    }
}
