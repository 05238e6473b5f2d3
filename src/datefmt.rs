use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Parses a `DD.MM.YYYY` quiz window bound. End bounds cover the whole last
/// day of the window.
pub fn parse_window_date(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(Utc.from_utc_datetime(&time))
}

pub fn format_date<Tz: TimeZone>(datetime: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    datetime.format("%d/%m/%Y").to_string()
}

pub fn format_date_time<Tz: TimeZone>(datetime: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    datetime.format("%d/%m/%Y %H:%M:%S").to_string()
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}ч {minutes}мин {secs}сек")
}
