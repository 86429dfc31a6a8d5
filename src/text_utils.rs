use std::ops::Index;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M %z",
];

fn to_int<T: std::str::FromStr>(num_str: &str, date_str: &str) -> Result<T, String> {
    match num_str.parse::<T>() {
        Ok(x) => Ok(x),
        Err(_) => Err(format!("Error parsing {} from the date {}", num_str, date_str)),
    }
}

/// Parses a date without offset: `2017-09-10`, `2017-09-10 10:42`,
/// `2017-09-10 10:42:32` or `2017-09-10T10:42:32.123`.
pub fn parse_date_time(buf: &str) -> Result<NaiveDateTime, String> {
    lazy_static! {
        static ref DATE_REGEX: Regex = Regex::new(
            r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{1,2})(?::(\d{1,2}))?(\.\d{1,9})?)?$"
        ).unwrap();
    }

    let Some(caps) = DATE_REGEX.captures(buf) else {
        return Err(format!("Unable to parse date time {}", buf));
    };

    let to_i32 = |num_str: &str| to_int::<i32>(num_str, buf);
    let to_u32 = |num_str: &str| to_int::<u32>(num_str, buf);
    let opt_u32 = |idx: usize| caps.get(idx).map(|m| to_u32(m.as_str())).unwrap_or(Ok(0));

    // We are using the regex approach to make it more flexible
    let y: i32 = to_i32(caps.index(1))?;
    let m: u32 = to_u32(caps.index(2))?;
    let d: u32 = to_u32(caps.index(3))?;
    let h: u32 = opt_u32(4)?;
    let mn: u32 = opt_u32(5)?;
    let s: u32 = opt_u32(6)?;

    let date = NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| format!("Invalid calendar date {}", buf))?;
    let time = NaiveTime::from_hms_opt(h, mn, s)
        .ok_or_else(|| format!("Invalid time of day {}", buf))?;

    Ok(NaiveDateTime::new(date, time))
}

/// Parses a publication timestamp. Timestamps carrying an offset are taken as
/// they are; naive ones only resolve when a default offset is available.
pub fn parse_published_at(buf: &str, default_offset: Option<FixedOffset>) -> Result<DateTime<FixedOffset>, String> {
    let buf = buf.trim();

    if let Ok(date_time) = DateTime::parse_from_rfc3339(buf) {
        return Ok(date_time);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(date_time) = DateTime::parse_from_str(buf, fmt) {
            return Ok(date_time);
        }
    }

    let naive = parse_date_time(buf)?;
    match default_offset {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| format!("Ambiguous date time {}", buf)),
        None => Err(format!("Date {} has no UTC offset and no default_offset is configured", buf)),
    }
}

pub fn format_date_time(date_time: &DateTime<FixedOffset>) -> (String, String) {
    let date = date_time.format("%Y-%m-%d").to_string();
    let time = date_time.format("%H:%M:%S").to_string();
    (date, time)
}
