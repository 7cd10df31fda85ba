// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! `dateTime.iso8601` text.
//!
//! Accepted profile, left to right:
//!
//! * date: `YYYY`, `YYYYMM` or `YYYYMMDD`, hyphens optional (`1985-03-04`).
//!   Month and day default to 1.
//! * `T` then time: `hh`, `hhmm` or `hhmmss`, colons optional. A `.fraction`
//!   applies to the last unit present and spills into the smaller ones,
//!   truncated to milliseconds.
//! * timezone: `Z`, or `+hh`, `+hhmm`, `+hh:mm` (and `-`). Without one the
//!   caller-supplied default offset is used.
//!
//! Only calendar dates are understood: no week dates, no ordinal dates, no
//! reduced-precision years.

use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::DecodeError;

type Parsed<T> = Result<T, &'static str>;

/// Parses `text`, interpreting a timezone-less value at `default_offset`.
pub fn parse(text: &str, default_offset: UtcOffset) -> Result<OffsetDateTime, DecodeError> {
    let text = text.trim();
    parse_parts(text, default_offset).map_err(|reason| DecodeError::InvalidDate {
        text: text.to_string(),
        reason: reason.to_string(),
    })
}

/// Formats `dt` as `yyyyMMdd'T'HH:mm:ss` in its own offset. The offset and
/// any sub-second part are dropped.
pub fn format(dt: &OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}T{:02}:{:02}:{:02}",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

fn parse_parts(text: &str, default_offset: UtcOffset) -> Parsed<OffsetDateTime> {
    let (date_part, time_part) = match text.find('T') {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    };

    let date = parse_date(date_part)?;
    let (time, spill, offset) = match time_part {
        Some(time_part) => parse_time_and_zone(time_part)?,
        None => (Time::MIDNIGHT, Duration::ZERO, None),
    };

    PrimitiveDateTime::new(date, time)
        .assume_offset(offset.unwrap_or(default_offset))
        .checked_add(spill)
        .ok_or("date out of range")
}

fn parse_date(text: &str) -> Parsed<Date> {
    let digits: String = text.chars().filter(|&c| c != '-').collect();
    if !is_digits(&digits) {
        return Err("date must only contain digits and hyphens");
    }

    let (year, month, day) = match digits.len() {
        4 => (number::<i32>(&digits[..4])?, 1, 1),
        6 => (number(&digits[..4])?, number(&digits[4..6])?, 1),
        8 => (
            number(&digits[..4])?,
            number(&digits[4..6])?,
            number(&digits[6..8])?,
        ),
        _ => return Err("date must be YYYY, YYYYMM or YYYYMMDD"),
    };

    let month = Month::try_from(month).map_err(|_| "month out of range")?;
    Date::from_calendar_date(year, month, day).map_err(|_| "day out of range")
}

fn parse_time_and_zone(text: &str) -> Parsed<(Time, Duration, Option<UtcOffset>)> {
    let compact: String = text.chars().filter(|&c| c != ':').collect();

    let (clock, offset) = if let Some(index) = compact.find('Z') {
        if index + 1 != compact.len() {
            return Err("unexpected characters after Z");
        }
        (&compact[..index], Some(UtcOffset::UTC))
    } else if let Some(index) = compact.find(|c: char| c == '+' || c == '-') {
        (&compact[..index], Some(parse_offset(&compact[index..])?))
    } else {
        (&compact[..], None)
    };

    let (time, spill) = parse_clock(clock)?;
    Ok((time, spill, offset))
}

fn parse_clock(text: &str) -> Parsed<(Time, Duration)> {
    let (whole, fraction) = match text.find('.') {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    };
    if !is_digits(whole) {
        return Err("time must only contain digits");
    }

    // milliseconds covered by one unit of the last component present
    let (hour, minute, second, unit) = match whole.len() {
        2 => (number(&whole[..2])?, 0, 0, 3_600_000),
        4 => (number(&whole[..2])?, number(&whole[2..4])?, 0, 60_000),
        6 => (
            number(&whole[..2])?,
            number(&whole[2..4])?,
            number(&whole[4..6])?,
            1_000,
        ),
        _ => return Err("time must be hh, hhmm or hhmmss"),
    };

    let spill = match fraction {
        None => Duration::ZERO,
        Some(digits) if !digits.is_empty() && is_digits(digits) => {
            // never carries into the next unit
            let digits = &digits[..digits.len().min(18)];
            let numerator: u128 = number(digits)?;
            let millis = numerator * unit / 10u128.pow(digits.len() as u32);
            Duration::milliseconds(millis as i64)
        }
        Some(_) => return Err("malformed fraction"),
    };

    let time = Time::from_hms(hour, minute, second).map_err(|_| "time out of range")?;
    Ok((time, spill))
}

fn parse_offset(text: &str) -> Parsed<UtcOffset> {
    let (sign, digits) = text.split_at(1);
    let sign: i8 = if sign == "-" { -1 } else { 1 };
    if !is_digits(digits) {
        return Err("timezone must only contain digits");
    }

    let (hours, minutes) = match digits.len() {
        2 => (number::<i8>(digits)?, 0),
        4 => (number::<i8>(&digits[..2])?, number::<i8>(&digits[2..])?),
        _ => return Err("timezone must be +hh or +hhmm"),
    };
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| "timezone out of range")
}

fn is_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

fn number<T: std::str::FromStr>(digits: &str) -> Parsed<T> {
    digits.parse().map_err(|_| "number out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn utc(text: &str) -> OffsetDateTime {
        parse(text, UtcOffset::UTC).unwrap()
    }

    #[test]
    fn legacy_and_offset_forms() {
        let expected = datetime!(1985-03-04 11:13:14 UTC);
        assert_eq!(parse("19850304T12:13:14", offset!(+1)).unwrap(), expected);
        assert_eq!(utc("1985-03-04T12:13:14+01:00"), expected);
        assert_eq!(utc("1985-03-04T12:13:14+0100"), expected);
        assert_eq!(utc("1985-03-04T13:13:14+0100"), datetime!(1985-03-04 12:13:14 UTC));
    }

    #[test]
    fn keeps_the_parsed_offset() {
        let dt = utc("1985-03-04T12:13:14+01:00");
        assert_eq!(dt.offset(), offset!(+1));
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn hour_precision_with_explicit_utc() {
        assert_eq!(utc("1980-01-01T00Z"), datetime!(1980-01-01 00:00:00 UTC));
        assert_eq!(utc("20200908T0440Z"), datetime!(2020-09-08 04:40:00 UTC));
        assert_eq!(utc("2018-03-06T06:21:20Z"), datetime!(2018-03-06 06:21:20 UTC));
    }

    #[test]
    fn reduced_date_precision() {
        assert_eq!(utc("1985"), datetime!(1985-01-01 00:00:00 UTC));
        assert_eq!(utc("1985-03"), datetime!(1985-03-01 00:00:00 UTC));
        assert_eq!(utc("19850304"), datetime!(1985-03-04 00:00:00 UTC));
    }

    #[test]
    fn fractions_spill_into_smaller_units() {
        assert_eq!(utc("1985-03-04T12.5Z"), datetime!(1985-03-04 12:30:00 UTC));
        assert_eq!(utc("1985-03-04T12:13.5Z"), datetime!(1985-03-04 12:13:30 UTC));
        assert_eq!(
            utc("1985-03-04T12:13:14.25Z"),
            datetime!(1985-03-04 12:13:14.25 UTC)
        );
        assert_eq!(
            utc("1985-03-04T12:13.001Z"),
            datetime!(1985-03-04 12:13:00.06 UTC)
        );
    }

    #[test]
    fn fractions_truncate_to_milliseconds() {
        assert_eq!(
            utc("1985-03-04T12:13:14.9996Z"),
            datetime!(1985-03-04 12:13:14.999 UTC)
        );
        assert_eq!(
            utc("1985-03-04T12:13:14.123Z"),
            datetime!(1985-03-04 12:13:14.123 UTC)
        );
        assert_eq!(
            utc("1985-03-04T23:59:59.99999999999999999999Z"),
            datetime!(1985-03-04 23:59:59.999 UTC)
        );
        assert_eq!(
            utc("1985-03-04T12.00001Z"),
            datetime!(1985-03-04 12:00:00.036 UTC)
        );
    }

    #[test]
    fn negative_offsets() {
        assert_eq!(utc("1985-03-04T12:13:14-05"), datetime!(1985-03-04 17:13:14 UTC));
        assert_eq!(utc("1985-03-04T12:13:14-05:30").offset(), offset!(-5:30));
    }

    #[test]
    fn default_offset_applies_only_without_zone() {
        let dt = parse("19850304T12:13:14", offset!(-3)).unwrap();
        assert_eq!(dt.offset(), offset!(-3));
        let dt = parse("19850304T12:13:14Z", offset!(-3)).unwrap();
        assert_eq!(dt.offset(), UtcOffset::UTC);
    }

    #[test]
    fn rejects_malformed_text() {
        for text in [
            "",
            "85",
            "198503041",
            "1985-13-01",
            "1985-02-30",
            "abcd",
            "19850304T",
            "19850304T1",
            "19850304T25",
            "19850304T12:61",
            "19850304T12x",
            "19850304T12.",
            "19850304T12Zjunk",
            "19850304T12+1",
            "19850304T12+ab",
        ] {
            assert!(
                matches!(parse(text, UtcOffset::UTC), Err(DecodeError::InvalidDate { .. })),
                "{:?} should not parse",
                text
            );
        }
    }

    #[test]
    fn formats_in_own_offset_without_zone() {
        assert_eq!(format(&datetime!(1985-05-03 12:23:34 UTC)), "19850503T12:23:34");
        assert_eq!(format(&datetime!(1985-05-03 12:23:34.9 +02:00)), "19850503T12:23:34");
    }

    #[test]
    fn formatted_text_parses_back_to_the_same_second() {
        let original = datetime!(2021-11-30 23:59:58.75 UTC);
        let reparsed = utc(&format(&original));
        assert_eq!(reparsed, original.replace_nanosecond(0).unwrap());
    }
}
