use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{OfxError, Result};

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<datetime>[.0-9]+)(?:\[(?P<offset>[+-]?[0-9]+(?:\.[0-9]+)?)(?::(?P<name>[^\]]*))?\])?$")
        .expect("datetime pattern is valid")
});

const SECONDS_PER_HOUR: i64 = 60 * 60;

/// A timestamp along with the zone name supplied by the document, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfxDateTime {
    instant: DateTime<FixedOffset>,
    zone_name: Option<String>,
}

impl OfxDateTime {
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    pub fn zone_name(&self) -> Option<&str> {
        self.zone_name.as_deref()
    }
}

impl fmt::Display for OfxDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant)?;
        if let Some(name) = &self.zone_name {
            write!(f, " {}", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum DateFormat {
    /// YYYYMMDDhhmmss.sss
    Fractional,
    /// YYYYMMDDhhmmss
    Seconds,
    /// YYYYMMDD
    Date,
}

const FORMATS: [DateFormat; 3] = [DateFormat::Fractional, DateFormat::Seconds, DateFormat::Date];

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_seconds(s: &str) -> Option<NaiveDateTime> {
    if s.len() != 14 || !all_digits(s) {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S").ok()
}

impl DateFormat {
    fn parse(self, s: &str) -> Option<NaiveDateTime> {
        match self {
            DateFormat::Fractional => {
                let (whole, fraction) = s.split_once('.')?;
                if fraction.len() > 9 || !all_digits(fraction) {
                    return None;
                }

                // Right pad to nanoseconds
                let nanos = fraction.parse::<u32>().ok()? * 10u32.pow(9 - fraction.len() as u32);
                parse_seconds(whole)?.with_nanosecond(nanos)
            }
            DateFormat::Seconds => parse_seconds(s),
            DateFormat::Date => {
                if s.len() != 8 || !all_digits(s) {
                    return None;
                }
                NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()?
                    .and_hms_opt(0, 0, 0)
            }
        }
    }
}

/// Offset in hours, possibly fractional ("-3.5")
fn parse_offset(hours: &str) -> Option<FixedOffset> {
    let hours: Decimal = hours.parse().ok()?;
    let seconds = hours.checked_mul(Decimal::from(SECONDS_PER_HOUR))?.to_i64()?;
    FixedOffset::east_opt(i32::try_from(seconds).ok()?)
}

/// Parse an OFX timestamp.
///
/// The wall clock digits are read literally in the zone given by the
/// optional `[offset:name]` suffix, or in UTC when there is none.
pub fn parse_datetime(text: &str) -> Result<OfxDateTime> {
    let captures = DATETIME_RE
        .captures(text)
        .ok_or_else(|| OfxError::invalid_datetime(text))?;

    let (offset, zone_name) = match captures.name("offset") {
        Some(offset) => (
            parse_offset(offset.as_str()).ok_or_else(|| OfxError::invalid_datetime(text))?,
            captures
                .name("name")
                .map(|n| n.as_str().to_owned())
                .filter(|n| !n.is_empty()),
        ),
        None => (Utc.fix(), None),
    };

    let datetime = &captures["datetime"];
    let naive = FORMATS
        .iter()
        .find_map(|format| format.parse(datetime))
        .ok_or_else(|| OfxError::invalid_datetime(text))?;

    let instant = naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| OfxError::invalid_datetime(text))?;

    Ok(OfxDateTime { instant, zone_name })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<FixedOffset> {
        Utc.fix()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .map(|t| t + chrono::Duration::milliseconds(ms as i64))
            .expect("valid test date")
    }

    fn pst(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .and_then(|tz| tz.with_ymd_and_hms(y, mo, d, h, mi, s).single())
            .map(|t| t + chrono::Duration::milliseconds(ms as i64))
            .expect("valid test date")
    }

    #[test]
    fn accepts_every_format_variant() {
        let cases = [
            ("20070329", utc(2007, 3, 29, 0, 0, 0, 0), None),
            ("20070329131415", utc(2007, 3, 29, 13, 14, 15, 0), None),
            ("20070329131415.123", utc(2007, 3, 29, 13, 14, 15, 123), None),
            ("20070329[-8:PST]", pst(2007, 3, 29, 0, 0, 0, 0), Some("PST")),
            ("20070329131415[-8:PST]", pst(2007, 3, 29, 13, 14, 15, 0), Some("PST")),
            ("20070329131415.123[-8:PST]", pst(2007, 3, 29, 13, 14, 15, 123), Some("PST")),
        ];

        for (text, expected, zone) in cases {
            let parsed = parse_datetime(text).unwrap_or_else(|e| panic!("{}: {}", text, e));
            assert_eq!(parsed.instant(), expected, "{}", text);
            assert_eq!(parsed.instant().offset(), expected.offset(), "{}", text);
            assert_eq!(parsed.zone_name(), zone, "{}", text);
        }
    }

    #[test]
    fn wall_clock_is_read_in_the_given_zone() {
        let parsed = parse_datetime("20070329131415[-8:PST]").unwrap();
        assert_eq!(parsed.instant().naive_local().to_string(), "2007-03-29 13:14:15");
        assert_eq!(parsed.instant().naive_utc().to_string(), "2007-03-29 21:14:15");
    }

    #[test]
    fn fractional_and_nameless_offsets() {
        let parsed = parse_datetime("20240101120000[+5.5:IST]").unwrap();
        assert_eq!(parsed.instant().offset().local_minus_utc(), 5 * 3600 + 1800);

        let parsed = parse_datetime("20240101[0]").unwrap();
        assert_eq!(parsed.instant().offset().local_minus_utc(), 0);
        assert_eq!(parsed.zone_name(), None);
    }

    #[test]
    fn short_fractions_are_scaled() {
        let parsed = parse_datetime("20070329131415.5").unwrap();
        assert_eq!(parsed.instant().nanosecond(), 500_000_000);
    }

    #[test]
    fn rejects_unstructured_text() {
        for text in [
            "2007",
            "not-a-date",
            "",
            "200703291314",
            "20071329",
            "20070329131415.",
            "20070329[abc:PST]",
            "20070329[-30:XYZ]",
            "20070329[9999999999999999999999999999:X]",
        ] {
            match parse_datetime(text) {
                Err(OfxError::InvalidDateTime { text: t, .. }) => assert_eq!(t, text),
                other => panic!("unexpected result for {:?}: {:?}", text, other),
            }
        }
    }
}
