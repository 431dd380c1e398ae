use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

/// Render a unix-ms instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso8601_utc_ms(ts_ms: u64) -> String {
    let secs = ts_ms / 1000;
    let millis = ts_ms % 1000;
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (y, m, d) = civil_from_days(days);
    let hh = rem / 3600;
    let mm = (rem % 3600) / 60;
    let ss = rem % 60;
    format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}.{millis:03}Z")
}

/// Parse an RFC3339 UTC timestamp to unix ms.
///
/// Accepts:
/// - "2026-02-28T12:00:00Z"
/// - "2025-01-08T01:33:54.924Z"
/// - "2026-08-20T10:00:00+00:00" (PostgREST timestamptz)
pub fn parse_rfc3339_ms(s: &str) -> Option<u64> {
    let s = s.trim();
    let (date, time) = s.split_once('T')?;
    let (y, m, d) = parse_ymd(date)?;

    let time = time
        .strip_suffix('Z')
        .or_else(|| time.strip_suffix("+00:00"))?;
    let (hms, frac) = time.split_once('.').unwrap_or((time, ""));
    let mut it = hms.split(':');
    let hh = it.next()?.parse::<u32>().ok()?;
    let mm = it.next()?.parse::<u32>().ok()?;
    let ss = it.next()?.parse::<u32>().ok()?;

    let days = days_from_civil(y, m, d)?;
    let secs = days
        .checked_mul(86_400)?
        .checked_add((hh as u64).checked_mul(3600)?)?
        .checked_add((mm as u64).checked_mul(60)?)?
        .checked_add(ss as u64)?;

    let frac_ms = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().take_while(|c| c.is_ascii_digit()).collect();
        let mut padded = digits;
        while padded.len() < 3 {
            padded.push('0');
        }
        padded[..3].parse::<u64>().ok()?
    };

    secs.checked_mul(1000)?.checked_add(frac_ms)
}

fn parse_ymd(s: &str) -> Option<(i32, u32, u32)> {
    let mut it = s.split('-');
    let y = it.next()?.parse::<i32>().ok()?;
    let m = it.next()?.parse::<u32>().ok()?;
    let d = it.next()?.parse::<u32>().ok()?;
    Some((y, m, d))
}

// Days since 1970-01-01 (Howard Hinnant's algorithm).
fn days_from_civil(year: i32, month: u32, day: u32) -> Option<u64> {
    if month == 0 || month > 12 || day == 0 || day > 31 {
        return None;
    }
    let y = i64::from(year) - i64::from(month <= 2);
    let m = i64::from(month) + if month <= 2 { 9 } else { -3 };
    let d = i64::from(day);
    let era = if y >= 0 { y } else { y - 399 }.div_euclid(400);
    let yoe = y - era * 400;
    let doy = (153 * m + 2).div_euclid(5) + d - 1;
    let doe = yoe * 365 + yoe.div_euclid(4) - yoe.div_euclid(100) + doy;
    let days = era * 146_097 + doe - 719_468;
    if days < 0 {
        None
    } else {
        Some(days as u64)
    }
}

// Inverse of days_from_civil.
fn civil_from_days(days: u64) -> (i64, u64, u64) {
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    (y + i64::from(m <= 2), m as u64, d as u64)
}
