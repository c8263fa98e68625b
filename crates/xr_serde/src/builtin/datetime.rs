use alloc::string::String;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::{FieldReader, Fields, TypeSerializer, Value};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Errors raised by the date and time plugins.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatetimeError {
    #[error("Invalid {kind} text `{text}`")]
    InvalidText { kind: &'static str, text: String },

    #[error("Invalid timezone `{0}`, expected `UTC` or an offset like `+02:00`")]
    InvalidTimezone(String),
}

fn invalid(kind: &'static str, text: &str) -> DatetimeError {
    DatetimeError::InvalidText {
        kind,
        text: String::from(text),
    }
}

// -----------------------------------------------------------------------------
// Parsing

/// `T` or a space between date and time, minutes or seconds precision, any
/// fraction. A bare date is midnight.
fn parse_datetime(text: &str) -> Result<NaiveDateTime, DatetimeError> {
    const FORMATS: [&str; 4] = [
        DATETIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| parse_date(text).ok().map(|date| date.and_time(NaiveTime::MIN)))
        .ok_or_else(|| invalid("datetime", text))
}

fn parse_date(text: &str) -> Result<NaiveDate, DatetimeError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| invalid("date", text))
}

fn parse_time(text: &str) -> Result<NaiveTime, DatetimeError> {
    NaiveTime::parse_from_str(text.trim(), TIME_FORMAT).map_err(|_| invalid("time", text))
}

/// `UTC`, `GMT`, `Z`, or a signed `HH:MM`/`HHMM` offset.
fn parse_offset(name: &str) -> Result<FixedOffset, DatetimeError> {
    let bad = || DatetimeError::InvalidTimezone(String::from(name));
    let name = name.trim();
    if matches!(name, "UTC" | "GMT" | "Z" | "Etc/UTC") {
        return FixedOffset::east_opt(0).ok_or_else(bad);
    }

    let (sign, digits) = match name.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(bad()),
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None => digits.split_at_checked(2).ok_or_else(bad)?,
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(bad());
    }
    let hours: i32 = hours.parse().map_err(|_| bad())?;
    let minutes: i32 = minutes.parse().map_err(|_| bad())?;
    if minutes >= 60 {
        return Err(bad());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

fn offset_name(offset: &FixedOffset) -> String {
    if offset.local_minus_utc() == 0 {
        String::from("UTC")
    } else {
        offset.to_string()
    }
}

// -----------------------------------------------------------------------------
// Plugins

crate::impl_object_value!(
    FixedOffset,
    DateTime<FixedOffset>,
    NaiveDateTime,
    NaiveDate,
    NaiveTime,
);

fn value_field(text: String) -> Fields {
    let mut fields = Fields::with_capacity(1);
    fields.insert(String::from("value"), Value::Str(text));
    fields
}

pub(super) fn timezone_plugin() -> TypeSerializer {
    TypeSerializer::new::<FixedOffset>()
        .with_signature("timezone")
        .with_alias("pytz.timezone")
        .with_encoder(|offset: &FixedOffset| {
            let mut fields = Fields::with_capacity(1);
            fields.insert(String::from("name"), Value::Str(offset_name(offset)));
            Ok(fields)
        })
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let name = reader.required::<String>("name")?;
            reader.finish()?;
            Ok(parse_offset(&name)?)
        })
}

/// Aware datetimes write their wall-clock time and a nested `timezone`.
/// Decoding gives a [`NaiveDateTime`] when `timezone` is missing.
pub(super) fn datetime_plugin() -> TypeSerializer {
    TypeSerializer::new::<DateTime<FixedOffset>>()
        .with_signature("datetime")
        .with_encoder(|datetime: &DateTime<FixedOffset>| {
            let text = datetime.naive_local().format(DATETIME_FORMAT).to_string();
            let mut fields = value_field(text);
            fields.insert(String::from("timezone"), Value::object(*datetime.offset()));
            Ok(fields)
        })
        .with_decoder(|fields| {
            let mut reader = FieldReader::new(fields);
            let text = reader.required::<String>("value")?;
            let timezone = reader.optional::<Option<FixedOffset>>("timezone")?.flatten();
            reader.finish()?;

            let naive = parse_datetime(&text)?;
            Ok(match timezone {
                None => Value::object(naive),
                Some(offset) => naive
                    .and_local_timezone(offset)
                    .single()
                    .map(Value::object)
                    .ok_or_else(|| invalid("datetime", &text))?,
            })
        })
}

/// Encode side of `datetime` for values without a timezone.
pub(super) fn naive_datetime_plugin() -> TypeSerializer {
    TypeSerializer::new::<NaiveDateTime>()
        .with_signature("datetime")
        .with_encoder(|datetime: &NaiveDateTime| {
            Ok(value_field(datetime.format(DATETIME_FORMAT).to_string()))
        })
        .without_decoder()
}

pub(super) fn date_plugin() -> TypeSerializer {
    TypeSerializer::new::<NaiveDate>()
        .with_signature("date")
        .with_encoder(|date: &NaiveDate| Ok(value_field(date.format("%Y-%m-%d").to_string())))
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let text = reader.required::<String>("value")?;
            reader.finish()?;
            Ok(parse_date(&text)?)
        })
}

pub(super) fn time_plugin() -> TypeSerializer {
    TypeSerializer::new::<NaiveTime>()
        .with_signature("time")
        .with_encoder(|time: &NaiveTime| Ok(value_field(time.format(TIME_FORMAT).to_string())))
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let text = reader.required::<String>("value")?;
            reader.finish()?;
            Ok(parse_time(&text)?)
        })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets() {
        let plus_two = FixedOffset::east_opt(7200).unwrap();
        assert_eq!(parse_offset("+02:00").unwrap(), plus_two);
        assert_eq!(parse_offset("+0200").unwrap(), plus_two);
        assert_eq!(parse_offset("-05:30").unwrap().local_minus_utc(), -19800);
        assert_eq!(parse_offset("UTC").unwrap().local_minus_utc(), 0);
        for bad in ["Europe/Paris", "+2", "+02:75", "02:00", ""] {
            assert!(parse_offset(bad).is_err(), "{bad}");
        }
        assert_eq!(offset_name(&plus_two), "+02:00");
        assert_eq!(offset_name(&FixedOffset::west_opt(0).unwrap()), "UTC");
    }

    #[test]
    fn datetime_text() {
        let expected = NaiveDate::from_ymd_opt(2020, 10, 10)
            .unwrap()
            .and_hms_micro_opt(10, 20, 30, 123)
            .unwrap();
        assert_eq!(parse_datetime("2020-10-10T10:20:30.000123").unwrap(), expected);
        assert_eq!(parse_datetime("2020-10-10 10:20:30.000123").unwrap(), expected);
        assert_eq!(
            parse_datetime("2020-10-10T10:20").unwrap(),
            expected.date().and_hms_opt(10, 20, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("2020-10-10").unwrap(),
            expected.date().and_time(NaiveTime::MIN)
        );
        assert!(parse_datetime("10/10/2020").is_err());
    }

    #[test]
    fn time_text() {
        let plugin = time_plugin();
        let time = NaiveTime::from_hms_milli_opt(1, 2, 3, 400).unwrap();
        let fields = plugin.encode(&time).unwrap();
        assert_eq!(fields["value"], Value::from("01:02:03.400"));
        assert_eq!(plugin.decode(fields).unwrap().downcast_ref::<NaiveTime>(), Some(&time));

        let whole = plugin.decode(value_field(String::from("01:02:03"))).unwrap();
        assert_eq!(whole.downcast_ref::<NaiveTime>(), Some(&NaiveTime::from_hms_opt(1, 2, 3).unwrap()));
    }

    #[test]
    fn aware_and_naive_share_a_signature() {
        let naive = NaiveDate::from_ymd_opt(2021, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let fields = naive_datetime_plugin().encode(&naive).unwrap();
        assert!(!fields.contains_key("timezone"));
        let back = datetime_plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<NaiveDateTime>(), Some(&naive));

        let offset = FixedOffset::east_opt(3600).unwrap();
        let aware = naive.and_local_timezone(offset).unwrap();
        let fields = datetime_plugin().encode(&aware).unwrap();
        assert_eq!(fields["value"], Value::from("2021-01-02T03:04:05"));
        let back = datetime_plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<DateTime<FixedOffset>>(), Some(&aware));
    }
}
