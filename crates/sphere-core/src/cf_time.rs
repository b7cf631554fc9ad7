//! CF ("climate and forecast") time-unit parsing and conversion.
//!
//! Handles strings of the form `<unit> since <YYYY-MM-DD[ HH:MM:SS]>`, the
//! convention used by NetCDF/Zarr/GRIB-derived time coordinates throughout
//! this codebase's data. Conversion between two unit strings is best-effort:
//! a string that fails to parse leaves the value unchanged rather than
//! propagating an error, since time normalization is a display nicety, not
//! a correctness requirement for the slices themselves.

/// A recognized CF time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit, in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86_400.0,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" => Some(TimeUnit::Seconds),
            "minute" | "minutes" | "min" | "mins" => Some(TimeUnit::Minutes),
            "hour" | "hours" | "hr" | "hrs" | "h" => Some(TimeUnit::Hours),
            "day" | "days" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// A parsed `<unit> since <epoch>` string: the unit, plus the epoch expressed
/// as absolute seconds from 1970-01-01T00:00:00 (may be negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch_seconds: i64,
}

/// Parse a CF time-units string.
pub fn parse_time_units(s: &str) -> Option<TimeUnits> {
    let s = s.trim();
    let (unit_token, rest) = s.split_once(" since ")?;
    let unit = TimeUnit::parse(unit_token.trim())?;
    let epoch_seconds = parse_epoch(rest.trim())?;
    Some(TimeUnits {
        unit,
        epoch_seconds,
    })
}

/// Parse `YYYY-MM-DD[ HH:MM:SS]` into absolute seconds since the Unix epoch.
fn parse_epoch(s: &str) -> Option<i64> {
    let mut parts = s.splitn(2, |c| c == ' ' || c == 'T');
    let date_part = parts.next()?;
    let time_part = parts.next();

    let mut date_fields = date_part.split('-');
    let y: i64 = date_fields.next()?.parse().ok()?;
    let m: u32 = date_fields.next()?.parse().ok()?;
    let d: u32 = date_fields.next()?.parse().ok()?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }

    let (hh, mm, ss) = match time_part {
        Some(t) => {
            let mut f = t.trim().splitn(3, ':');
            let hh: i64 = f.next()?.parse().ok()?;
            let mm: i64 = f.next().unwrap_or("0").parse().ok()?;
            let ss: i64 = f.next().unwrap_or("0").parse().ok()?;
            (hh, mm, ss)
        }
        None => (0, 0, 0),
    };

    let days = days_from_civil(y, m, d);
    Some(days * 86_400 + hh * 3600 + mm * 60 + ss)
}

/// Days since 1970-01-01 for a civil (proleptic Gregorian) date. Valid for
/// any year representable in `i64`; negative results denote dates before
/// the epoch. This is the zero-dependency algorithm cited in the spec.
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = y.div_euclid(400);
    let yoe = y - era * 400; // [0, 399]
    let mp = m as i64 + if m > 2 { -3 } else { 9 };
    let doy = (153 * mp + 2) / 5 + d as i64 - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    era * 146_097 + doe - 719_468
}

/// Convert `value` expressed in `src_units` into the equivalent value in
/// `dst_units`. Returns `value` unchanged if either string fails to parse.
pub fn convert_time_units(value: f64, src_units: &str, dst_units: &str) -> f64 {
    let (Some(src), Some(dst)) = (parse_time_units(src_units), parse_time_units(dst_units)) else {
        return value;
    };
    let absolute_seconds = value * src.unit.seconds() + src.epoch_seconds as f64;
    (absolute_seconds - dst.epoch_seconds as f64) / dst.unit.seconds()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_from_civil_matches_known_dates() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(1969, 12, 31), -1);
        assert_eq!(days_from_civil(2000, 3, 1), 11017);
    }

    #[test]
    fn parse_days_since() {
        let u = parse_time_units("days since 1950-01-01").unwrap();
        assert_eq!(u.unit, TimeUnit::Days);
        assert_eq!(u.epoch_seconds, days_from_civil(1950, 1, 1) * 86_400);
    }

    #[test]
    fn parse_with_time_of_day() {
        let u = parse_time_units("hours since 2020-06-15 12:30:00").unwrap();
        assert_eq!(u.unit, TimeUnit::Hours);
        let expected = days_from_civil(2020, 6, 15) * 86_400 + 12 * 3600 + 30 * 60;
        assert_eq!(u.epoch_seconds, expected);
    }

    #[test]
    fn unparseable_strings_return_none() {
        assert!(parse_time_units("garbage").is_none());
        assert!(parse_time_units("days after 1950-01-01").is_none());
    }

    #[test]
    fn convert_accounts_for_leap_years_1950_to_1960() {
        // 1950 to 1960 spans the leap years 1952 and 1956.
        let days = convert_time_units(0.0, "days since 1960-01-01", "days since 1950-01-01");
        assert_eq!(days.round() as i64, 3652);
        let days = convert_time_units(1.0, "days since 1960-01-01", "days since 1950-01-01");
        assert_eq!(days.round() as i64, 3653);
    }

    #[test]
    fn round_trip_is_stable() {
        let a = "hours since 1999-05-01 06:00:00";
        let b = "days since 2001-01-01";
        for v in [0.0, 1.0, -42.5, 8760.25] {
            let forward = convert_time_units(v, a, b);
            let back = convert_time_units(forward, b, a);
            assert!((back - v).abs() < 1e-6, "v={v} back={back}");
        }
    }

    #[test]
    fn unparseable_unit_leaves_value_unchanged() {
        let v = convert_time_units(42.0, "fortnights since 2000-01-01", "days since 2000-01-01");
        assert_eq!(v, 42.0);
    }
}
