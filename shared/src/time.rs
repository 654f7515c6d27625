use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday();
    date - Duration::days(back as i64)
}

/// Sunday of the ISO week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Inclusive date iterator over `[from, to]`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}
