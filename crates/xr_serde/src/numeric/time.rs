use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::NumericError;
use crate::{BoxError, FieldReader, Fields, TypeSerializer, Value};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

// -----------------------------------------------------------------------------
// TimeUnit

/// Tick length of a [`Datetime64`] or [`Timedelta64`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
    Second,
    Milli,
    Micro,
    Nano,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Day,
        TimeUnit::Hour,
        TimeUnit::Minute,
        TimeUnit::Second,
        TimeUnit::Milli,
        TimeUnit::Micro,
        TimeUnit::Nano,
    ];

    /// The unit code, `D`, `h`, `m`, `s`, `ms`, `us` or `ns`.
    pub const fn code(self) -> &'static str {
        match self {
            TimeUnit::Day => "D",
            TimeUnit::Hour => "h",
            TimeUnit::Minute => "m",
            TimeUnit::Second => "s",
            TimeUnit::Milli => "ms",
            TimeUnit::Micro => "us",
            TimeUnit::Nano => "ns",
        }
    }

    const fn seconds_per_tick(self) -> i64 {
        match self {
            TimeUnit::Day => 86_400,
            TimeUnit::Hour => 3_600,
            TimeUnit::Minute => 60,
            _ => 1,
        }
    }

    const fn ticks_per_second(self) -> i64 {
        match self {
            TimeUnit::Milli => 1_000,
            TimeUnit::Micro => 1_000_000,
            TimeUnit::Nano => NANOS_PER_SECOND,
            _ => 1,
        }
    }

    /// Whole seconds and the nanosecond remainder of `ticks`.
    fn split(self, ticks: i64) -> Option<(i64, u32)> {
        let per_second = self.ticks_per_second();
        let secs = ticks
            .div_euclid(per_second)
            .checked_mul(self.seconds_per_tick())?;
        let nanos = ticks.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second);
        Some((secs, u32::try_from(nanos).ok()?))
    }

    /// Ticks of this unit in `secs` and `nanos`, rounded toward the past.
    fn join(self, secs: i64, nanos: u32) -> Option<i64> {
        let per_second = self.ticks_per_second();
        secs.div_euclid(self.seconds_per_tick())
            .checked_mul(per_second)?
            .checked_add(i64::from(nanos) / (NANOS_PER_SECOND / per_second))
    }

    /// The `chrono` format writing exactly this precision.
    const fn format(self) -> &'static str {
        match self {
            TimeUnit::Day => "%Y-%m-%d",
            TimeUnit::Hour => "%Y-%m-%dT%H",
            TimeUnit::Minute => "%Y-%m-%dT%H:%M",
            TimeUnit::Second => "%Y-%m-%dT%H:%M:%S",
            TimeUnit::Milli => "%Y-%m-%dT%H:%M:%S%.3f",
            TimeUnit::Micro => "%Y-%m-%dT%H:%M:%S%.6f",
            TimeUnit::Nano => "%Y-%m-%dT%H:%M:%S%.9f",
        }
    }
}

impl fmt::Display for TimeUnit {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Accepts a bare code or a dtype name such as `datetime64[ms]`.
impl FromStr for TimeUnit {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = match s.split_once('[') {
            Some((_, rest)) => rest.strip_suffix(']').unwrap_or(rest),
            None => s,
        };
        TimeUnit::ALL
            .into_iter()
            .find(|u| u.code() == code)
            .ok_or_else(|| NumericError::UnknownUnit(String::from(s)))
    }
}

// -----------------------------------------------------------------------------
// Datetime64

/// A point in time counted in ticks of a [`TimeUnit`] since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Datetime64 {
    pub ticks: i64,
    pub unit: TimeUnit,
}

impl Datetime64 {
    #[inline]
    pub const fn new(ticks: i64, unit: TimeUnit) -> Self {
        Self { ticks, unit }
    }

    /// Truncates `datetime` to `unit`.
    pub fn from_naive(datetime: NaiveDateTime, unit: TimeUnit) -> Result<Self, NumericError> {
        let utc = datetime.and_utc();
        let ticks = unit
            .join(utc.timestamp(), utc.timestamp_subsec_nanos())
            .ok_or(NumericError::OutOfRange(unit.code()))?;
        Ok(Self { ticks, unit })
    }

    pub fn to_naive(self) -> Result<NaiveDateTime, NumericError> {
        self.unit
            .split(self.ticks)
            .and_then(|(secs, nanos)| DateTime::from_timestamp(secs, nanos))
            .map(|utc| utc.naive_utc())
            .ok_or(NumericError::OutOfRange(self.unit.code()))
    }

    /// Parses ISO text, taking the unit from its precision.
    pub fn parse(text: &str) -> Result<Self, NumericError> {
        let (datetime, unit) = parse_iso(text)?;
        Self::from_naive(datetime, unit)
    }

    /// Parses ISO text at a given unit.
    pub fn parse_in(text: &str, unit: TimeUnit) -> Result<Self, NumericError> {
        let (datetime, _) = parse_iso(text)?;
        Self::from_naive(datetime, unit)
    }
}

impl fmt::Display for Datetime64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive() {
            Ok(datetime) => write!(f, "{}", datetime.format(self.unit.format())),
            Err(_) => write!(f, "{}{}", self.ticks, self.unit),
        }
    }
}

crate::impl_object_value!(Datetime64);

/// Date alone, or date and time separated by `T` or a space. The time may
/// stop after hours, minutes, seconds or a fraction of up to nine digits.
fn parse_iso(text: &str) -> Result<(NaiveDateTime, TimeUnit), NumericError> {
    let invalid = || NumericError::InvalidDatetime(String::from(text));
    let (date, time) = match text.trim().split_once(['T', ' ']) {
        Some((date, time)) => (date, Some(time)),
        None => (text.trim(), None),
    };
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
    let Some(time) = time else {
        return Ok((date.and_time(NaiveTime::MIN), TimeUnit::Day));
    };

    let parts: Vec<&str> = time.split(':').collect();
    let (full, unit) = match parts.as_slice() {
        [h] => (alloc::format!("{h}:00:00"), TimeUnit::Hour),
        [h, m] => (alloc::format!("{h}:{m}:00"), TimeUnit::Minute),
        [_, _, s] => {
            let unit = match s.split_once('.').map_or(0, |(_, frac)| frac.len()) {
                0 => TimeUnit::Second,
                1..=3 => TimeUnit::Milli,
                4..=6 => TimeUnit::Micro,
                7..=9 => TimeUnit::Nano,
                _ => return Err(invalid()),
            };
            (String::from(time), unit)
        }
        _ => return Err(invalid()),
    };
    let time = NaiveTime::parse_from_str(&full, "%H:%M:%S%.f").map_err(|_| invalid())?;
    Ok((date.and_time(time), unit))
}

// -----------------------------------------------------------------------------
// Timedelta64

/// A duration in ticks of a [`TimeUnit`], or in unit-less ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timedelta64 {
    pub ticks: i64,
    pub unit: Option<TimeUnit>,
}

impl Timedelta64 {
    #[inline]
    pub const fn new(ticks: i64, unit: TimeUnit) -> Self {
        Self {
            ticks,
            unit: Some(unit),
        }
    }

    /// A duration without a unit.
    #[inline]
    pub const fn generic(ticks: i64) -> Self {
        Self { ticks, unit: None }
    }

    /// `None` for unit-less durations and for those out of range.
    pub fn to_time_delta(self) -> Option<TimeDelta> {
        let (secs, nanos) = self.unit?.split(self.ticks)?;
        TimeDelta::new(secs, nanos)
    }
}

crate::impl_object_value!(Timedelta64);

// -----------------------------------------------------------------------------
// Plugins

/// Reads the `value`/`args` pair shared by both time plugins.
///
/// `dtype` may only accompany `value`; it carries the unit.
fn time_fields(fields: Fields) -> Result<(Value, Option<Value>), BoxError> {
    let mut reader = FieldReader::new(fields);
    let value = reader.take("value");
    let args = reader.optional::<Vec<Value>>("args")?;
    let dtype = reader.optional::<String>("dtype")?;
    reader.finish()?;

    match (value, args, dtype) {
        (Some(value), None, dtype) => Ok((value, dtype.map(Value::Str))),
        (None, Some(args), None) => {
            let mut args = args.into_iter();
            match (args.next(), args.next(), args.next()) {
                (Some(first), unit, None) => Ok((first, unit)),
                _ => Err(NumericError::Arguments("expected one or two items in `args`").into()),
            }
        }
        (None, Some(_), Some(_)) => {
            Err(NumericError::Arguments("`dtype` can only be used with `value`").into())
        }
        (Some(_), Some(_), _) => {
            Err(NumericError::Arguments("`value` and `args` are mutually exclusive").into())
        }
        (None, None, _) => Err(NumericError::Arguments("expected `value` or `args`").into()),
    }
}

fn time_unit(unit: Option<Value>) -> Result<Option<TimeUnit>, BoxError> {
    match unit {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Str(code)) => Ok(Some(code.parse()?)),
        Some(other) => Err(crate::Error::unexpected("time unit", &other).into()),
    }
}

pub(super) fn datetime64_plugin() -> TypeSerializer {
    TypeSerializer::new::<Datetime64>()
        .with_signature("np.datetime64")
        .with_alias("numpy.datetime64")
        .with_encoder(|d: &Datetime64| {
            let mut fields = Fields::with_capacity(1);
            let args = alloc::vec![Value::Str(d.to_string()), Value::from(d.unit.code())];
            fields.insert(String::from("args"), Value::List(args));
            Ok(fields)
        })
        .with_constructor(|fields| {
            let (text, unit) = time_fields(fields)?;
            let text = match text {
                Value::Str(text) => text,
                other => return Err(crate::Error::unexpected("datetime text", &other).into()),
            };
            Ok(match time_unit(unit)? {
                Some(unit) => Datetime64::parse_in(&text, unit)?,
                None => Datetime64::parse(&text)?,
            })
        })
}

pub(super) fn timedelta64_plugin() -> TypeSerializer {
    TypeSerializer::new::<Timedelta64>()
        .with_signature("np.timedelta64")
        .with_alias("numpy.timedelta64")
        .with_encoder(|d: &Timedelta64| {
            let mut args = alloc::vec![Value::Int(d.ticks)];
            if let Some(unit) = d.unit {
                args.push(Value::from(unit.code()));
            }
            let mut fields = Fields::with_capacity(1);
            fields.insert(String::from("args"), Value::List(args));
            Ok(fields)
        })
        .with_constructor(|fields| {
            let (ticks, unit) = time_fields(fields)?;
            let ticks = match ticks {
                Value::Int(ticks) => ticks,
                other => return Err(crate::Error::unexpected("int tick count", &other).into()),
            };
            Ok(Timedelta64 {
                ticks,
                unit: time_unit(unit)?,
            })
        })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Fields {
        entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
    }

    #[test]
    fn precision_sets_the_unit() {
        let cases = [
            ("2021-03-04", TimeUnit::Day),
            ("2021-03-04T05", TimeUnit::Hour),
            ("2021-03-04T05:06", TimeUnit::Minute),
            ("2021-03-04T05:06:07", TimeUnit::Second),
            ("2021-03-04T05:06:07.250", TimeUnit::Milli),
            ("2021-03-04T05:06:07.250001", TimeUnit::Micro),
            ("2021-03-04T05:06:07.250000001", TimeUnit::Nano),
        ];
        for (text, unit) in cases {
            let parsed = Datetime64::parse(text).unwrap();
            assert_eq!(parsed.unit, unit, "{text}");
            assert_eq!(parsed.to_string(), text);
        }
        assert_eq!(Datetime64::parse("1970-01-02").unwrap().ticks, 1);
        assert!(Datetime64::parse("2021-13-01").is_err());
        assert!(Datetime64::parse("2021-01-01T05:06:07.1234567890").is_err());
    }

    #[test]
    fn ticks_before_the_epoch() {
        let early = Datetime64::parse_in("1969-12-31T23:59:59.5", TimeUnit::Second).unwrap();
        assert_eq!(early.ticks, -1);
        let early = Datetime64::parse("1969-12-31T23:59:59.5").unwrap();
        assert_eq!(early.ticks, -500);
        assert_eq!(early.to_string(), "1969-12-31T23:59:59.500");
    }

    #[test]
    fn datetime64_fields() {
        let plugin = datetime64_plugin();
        let value = Datetime64::parse("2020-10-10T10:20").unwrap();
        let encoded = plugin.encode(&value).unwrap();
        assert_eq!(
            encoded["args"],
            Value::List(vec!["2020-10-10T10:20".into(), "m".into()])
        );
        let back = plugin.decode(encoded).unwrap();
        assert_eq!(back.downcast_ref::<Datetime64>(), Some(&value));

        let back = plugin
            .decode(fields([("value", "2020-10-10T10:20".into()), ("dtype", "datetime64[s]".into())]))
            .unwrap();
        assert_eq!(
            back.downcast_ref::<Datetime64>(),
            Some(&Datetime64::parse("2020-10-10T10:20:00").unwrap())
        );

        assert!(plugin.decode(fields([])).is_err());
        assert!(
            plugin
                .decode(fields([
                    ("value", "2020-10-10".into()),
                    ("args", Value::List(vec!["2020-10-10".into()])),
                ]))
                .is_err()
        );
    }

    #[test]
    fn timedelta64_fields() {
        let plugin = timedelta64_plugin();
        for value in [Timedelta64::new(-90, TimeUnit::Minute), Timedelta64::generic(7)] {
            let back = plugin.decode(plugin.encode(&value).unwrap()).unwrap();
            assert_eq!(back.downcast_ref::<Timedelta64>(), Some(&value));
        }

        let back = plugin.decode(fields([("value", 3.into())])).unwrap();
        assert_eq!(back.downcast_ref::<Timedelta64>(), Some(&Timedelta64::generic(3)));
        assert!(plugin.decode(fields([("value", "3".into())])).is_err());
        assert!(
            plugin
                .decode(fields([("args", Value::List(vec![1.into(), "weeks".into()]))]))
                .is_err()
        );
    }

    #[test]
    fn durations() {
        assert_eq!(
            Timedelta64::new(-1500, TimeUnit::Milli).to_time_delta(),
            Some(TimeDelta::milliseconds(-1500))
        );
        assert_eq!(Timedelta64::generic(1).to_time_delta(), None);
        assert_eq!(Timedelta64::new(i64::MAX, TimeUnit::Day).to_time_delta(), None);
    }
}
