//! UTC calendar formatting for Unix timestamps.
//!
//! Self-contained so `build.rs` can include it with `#[path]`.

/// Split a day count relative to 1970-01-01 into `(year, month, day)`.
///
/// Works on a March-based year so the leap day falls at the end, in 400-year
/// eras of 146 097 days. Valid for negative inputs.
pub fn civil_date(days: i64) -> (i64, u32, u32) {
    let since_0000_03_01 = days + 719_468;
    let era = since_0000_03_01.div_euclid(146_097);
    let day_of_era = since_0000_03_01.rem_euclid(146_097);

    let year_of_era =
        (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let march_month = (5 * day_of_year + 2) / 153;

    let day = day_of_year - (153 * march_month + 2) / 5 + 1;
    let month = if march_month < 10 { march_month + 3 } else { march_month - 9 };
    let year = era * 400 + year_of_era + i64::from(month <= 2);
    (year, month as u32, day as u32)
}

/// Format a Unix timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_epoch(timestamp: i64) -> String {
    let (year, month, day) = civil_date(timestamp.div_euclid(86_400));
    let clock = timestamp.rem_euclid(86_400);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        clock / 3_600,
        clock % 3_600 / 60,
        clock % 60
    )
}
