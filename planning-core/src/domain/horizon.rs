use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use shared::time;
use shared::types::WeekRef;

use crate::error::PlannerError;

/// One ISO week of the extended range, Monday first.
#[derive(Debug, Clone)]
pub struct WeekBucket {
    pub week: WeekRef,
    pub dates: [NaiveDate; 7],
}

impl WeekBucket {
    pub fn weekdays(&self) -> &[NaiveDate] {
        &self.dates[..5]
    }

    pub fn weekend(&self) -> &[NaiveDate] {
        &self.dates[5..]
    }
}

/// The requested reporting window plus its extension to whole ISO weeks.
///
/// Weeks that straddle the original range on either side are boundary weeks;
/// their dates are planned (to anchor week-level constraints) but only rows
/// inside the original range are ever emitted.
#[derive(Debug, Clone)]
pub struct Horizon {
    pub original_start: NaiveDate,
    pub original_end: NaiveDate,
    pub extended_start: NaiveDate,
    pub extended_end: NaiveDate,
    pub weeks: Vec<WeekBucket>,
    boundary_dates: BTreeSet<NaiveDate>,
}

impl Horizon {
    pub fn build(from: NaiveDate, to: NaiveDate) -> Result<Self, PlannerError> {
        if from > to {
            return Err(PlannerError::InvalidInput(format!(
                "Planning range starts after it ends: {from} > {to}"
            )));
        }

        let extended_start = time::week_start(from);
        let extended_end = time::week_end(to);

        let mut weeks = Vec::new();
        let mut boundary_dates = BTreeSet::new();
        let mut monday = extended_start;
        while monday <= extended_end {
            let mut dates = [monday; 7];
            for (offset, slot) in dates.iter_mut().enumerate() {
                *slot = monday + Duration::days(offset as i64);
            }
            let straddles = dates.iter().any(|d| *d < from || *d > to);
            if straddles {
                boundary_dates.extend(dates.iter().copied());
            }
            weeks.push(WeekBucket {
                week: WeekRef::of(monday),
                dates,
            });
            monday += Duration::days(7);
        }

        Ok(Self {
            original_start: from,
            original_end: to,
            extended_start,
            extended_end,
            weeks,
            boundary_dates,
        })
    }

    pub fn in_original(&self, date: NaiveDate) -> bool {
        self.original_start <= date && date <= self.original_end
    }

    pub fn in_extended(&self, date: NaiveDate) -> bool {
        self.extended_start <= date && date <= self.extended_end
    }

    /// Whether `date` lies in a week straddling the original range.
    pub fn is_boundary(&self, date: NaiveDate) -> bool {
        self.boundary_dates.contains(&date)
    }

    /// All dates of the extended range in chronological order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.weeks.iter().flat_map(|w| w.dates.iter().copied())
    }

    /// The lookback window `[extended_start - days, extended_start - 1]`.
    pub fn lookback_window(&self, days: i64) -> (NaiveDate, NaiveDate) {
        (
            self.extended_start - Duration::days(days),
            self.extended_start - Duration::days(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn january_2026_extends_to_five_weeks() {
        // 2026-01-01 is a Thursday, 2026-01-31 a Saturday.
        let horizon = Horizon::build(date(2026, 1, 1), date(2026, 1, 31)).unwrap();

        assert_eq!(horizon.extended_start, date(2025, 12, 29));
        assert_eq!(horizon.extended_end, date(2026, 2, 1));
        assert_eq!(horizon.weeks.len(), 5);
        assert_eq!(horizon.weeks[0].week, WeekRef { year: 2026, week: 1 });
    }

    #[test]
    fn boundary_weeks_cover_both_ends() {
        let horizon = Horizon::build(date(2026, 1, 1), date(2026, 1, 31)).unwrap();

        // first week straddles into December, last week into February
        assert!(horizon.is_boundary(date(2025, 12, 29)));
        assert!(horizon.is_boundary(date(2026, 1, 1)));
        assert!(horizon.is_boundary(date(2026, 1, 31)));
        assert!(horizon.is_boundary(date(2026, 2, 1)));
        // fully-inside weeks are not boundary
        assert!(!horizon.is_boundary(date(2026, 1, 7)));
        assert!(!horizon.is_boundary(date(2026, 1, 14)));
    }

    #[test]
    fn aligned_month_has_no_boundary_weeks() {
        // 2026-06-01 is a Monday and 2026-06-28 a Sunday.
        let horizon = Horizon::build(date(2026, 6, 1), date(2026, 6, 28)).unwrap();

        assert_eq!(horizon.extended_start, horizon.original_start);
        assert_eq!(horizon.extended_end, horizon.original_end);
        assert!(horizon.dates().all(|d| !horizon.is_boundary(d)));
    }

    #[test]
    fn week_buckets_hold_seven_consecutive_dates() {
        let horizon = Horizon::build(date(2026, 3, 1), date(2026, 3, 31)).unwrap();

        for bucket in &horizon.weeks {
            for pair in bucket.dates.windows(2) {
                assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
            assert_eq!(bucket.weekdays().len(), 5);
            assert_eq!(bucket.weekend().len(), 2);
        }
    }

    #[test]
    fn lookback_window_ends_the_day_before_the_extension() {
        let horizon = Horizon::build(date(2026, 3, 1), date(2026, 3, 31)).unwrap();

        let (from, to) = horizon.lookback_window(6);
        assert_eq!(to, horizon.extended_start - Duration::days(1));
        assert_eq!(from, horizon.extended_start - Duration::days(6));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let output = Horizon::build(date(2026, 3, 2), date(2026, 3, 1));
        assert!(matches!(output, Err(PlannerError::InvalidInput(_))));
    }
}
