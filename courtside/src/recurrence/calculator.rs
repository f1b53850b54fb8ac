//! Occurrence dates of a recurrence rule.
//!
//! The series is walked one period at a time (a week, a month or N days)
//! from the rule's start, so interval counting never depends on how many
//! dates a period produced.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc, Weekday};

use super::models::{
    GenerationWindow, Occurrence, RecurrenceError, RecurrencePattern, RecurrenceResult,
    RecurrenceRule,
};

/// Reject rules that could never produce a sensible series.
pub fn validate_rule(rule: &RecurrenceRule) -> RecurrenceResult<()> {
    if rule.interval == 0 {
        return Err(RecurrenceError::ZeroInterval);
    }
    match &rule.pattern {
        RecurrencePattern::Weekly { weekdays } if weekdays.is_empty() => {
            return Err(RecurrenceError::NoWeekdays);
        }
        RecurrencePattern::Monthly { day_of_month } if !(1..=31).contains(day_of_month) => {
            return Err(RecurrenceError::InvalidDayOfMonth(*day_of_month));
        }
        _ => {}
    }
    if let Some(end) = rule.ends_on {
        if end < rule.starts_on {
            return Err(RecurrenceError::EndBeforeStart {
                start: rule.starts_on,
                end,
            });
        }
    }
    Ok(())
}

/// Monday of the week holding `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Last day of the given month
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt()
}

/// Every occurrence of a series, in order, from its first date.
///
/// Ends at the rule's end date or after `max_occurrences`; otherwise the
/// iterator is unbounded and the caller stops it.
#[derive(Debug, Clone)]
pub struct Series<'a> {
    rule: &'a RecurrenceRule,
    period: u32,
    pending: VecDeque<NaiveDate>,
    emitted: u32,
    done: bool,
}

impl<'a> Series<'a> {
    pub fn new(rule: &'a RecurrenceRule) -> RecurrenceResult<Self> {
        validate_rule(rule)?;
        Ok(Self {
            rule,
            period: 0,
            pending: VecDeque::new(),
            emitted: 0,
            done: false,
        })
    }

    /// Dates of the next period, or `None` once dates stop being representable
    fn next_period(&mut self) -> Option<Vec<NaiveDate>> {
        let step = self.period.checked_mul(self.rule.interval)?;
        self.period += 1;

        let dates = match &self.rule.pattern {
            RecurrencePattern::Weekly { weekdays } => {
                let week = week_start(self.rule.starts_on)
                    .checked_add_signed(Duration::weeks(i64::from(step)))?;
                let mut days: Vec<Weekday> = weekdays.clone();
                days.sort_by_key(|d| d.num_days_from_monday());
                days.dedup();
                days.into_iter()
                    .filter_map(|d| {
                        week.checked_add_signed(Duration::days(i64::from(d.num_days_from_monday())))
                    })
                    .collect()
            }
            RecurrencePattern::Monthly { day_of_month } => {
                let month = self
                    .rule
                    .starts_on
                    .with_day(1)?
                    .checked_add_months(Months::new(step))?;
                let last = last_day_of_month(month.year(), month.month())?;
                vec![month.with_day((*day_of_month).min(last.day()))?]
            }
            RecurrencePattern::Custom => {
                vec![self
                    .rule
                    .starts_on
                    .checked_add_signed(Duration::days(i64::from(step)))?]
            }
        };
        Some(dates)
    }
}

impl Iterator for Series<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            if self.done {
                return None;
            }
            if self
                .rule
                .max_occurrences
                .is_some_and(|max| self.emitted >= max)
            {
                self.done = true;
                return None;
            }

            let Some(date) = self.pending.pop_front() else {
                match self.next_period() {
                    Some(dates) => self.pending.extend(dates),
                    None => self.done = true,
                }
                continue;
            };

            if date < self.rule.starts_on {
                continue;
            }
            if self.rule.ends_on.is_some_and(|end| date > end) {
                self.done = true;
                continue;
            }

            self.emitted += 1;
            return Some(Occurrence {
                index: self.emitted,
                starts_at: date.and_time(self.rule.time_of_day).and_utc(),
            });
        }
    }
}

/// Occurrences inside `window` that are not already in `existing`.
///
/// Calling again with the returned dates added to `existing` yields nothing.
pub fn occurrences(
    rule: &RecurrenceRule,
    window: &GenerationWindow,
    existing: &HashSet<DateTime<Utc>>,
) -> RecurrenceResult<Vec<Occurrence>> {
    if window.until < window.from {
        return Err(RecurrenceError::EmptyWindow);
    }
    Ok(Series::new(rule)?
        .take_while(|o| o.starts_at < window.until)
        .filter(|o| o.starts_at >= window.from && !existing.contains(&o.starts_at))
        .collect())
}

/// First occurrence at or after `after`
pub fn next_occurrence(
    rule: &RecurrenceRule,
    after: DateTime<Utc>,
) -> RecurrenceResult<Option<Occurrence>> {
    Ok(Series::new(rule)?.find(|o| o.starts_at >= after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn evening() -> NaiveTime {
        NaiveTime::from_hms_opt(18, 0, 0).unwrap()
    }

    fn at(d: NaiveDate) -> DateTime<Utc> {
        d.and_time(evening()).and_utc()
    }

    fn window(from: NaiveDate, days: u32) -> GenerationWindow {
        GenerationWindow::ahead(from.and_hms_opt(0, 0, 0).unwrap().and_utc(), days).unwrap()
    }

    #[test]
    fn test_window_past_the_last_date_is_an_error() {
        let last = DateTime::<Utc>::MAX_UTC;
        assert_eq!(
            GenerationWindow::ahead(last, 1),
            Err(RecurrenceError::OutOfRange(last))
        );
        assert!(GenerationWindow::ahead(last, 0).is_ok());
    }

    #[test]
    fn test_weekly_two_days_two_weeks() {
        // 2026-01-05 is a Monday
        let rule =
            RecurrenceRule::weekly(vec![Weekday::Wed, Weekday::Mon], date(2026, 1, 5), evening());
        let win = window(date(2026, 1, 5), 14);

        let first = occurrences(&rule, &win, &HashSet::new()).unwrap();
        let dates: Vec<_> = first.iter().map(|o| o.starts_at).collect();
        assert_eq!(
            dates,
            vec![
                at(date(2026, 1, 5)),
                at(date(2026, 1, 7)),
                at(date(2026, 1, 12)),
                at(date(2026, 1, 14)),
            ]
        );

        let existing: HashSet<_> = dates.into_iter().collect();
        assert!(occurrences(&rule, &win, &existing).unwrap().is_empty());
    }

    #[test]
    fn test_weekly_interval_counts_weeks_not_dates() {
        let rule = RecurrenceRule::weekly(vec![Weekday::Mon, Weekday::Fri], date(2026, 1, 5), evening())
            .with_interval(2);
        let dates: Vec<_> = Series::new(&rule).unwrap().take(4).map(|o| o.starts_at).collect();
        assert_eq!(
            dates,
            vec![
                at(date(2026, 1, 5)),
                at(date(2026, 1, 9)),
                at(date(2026, 1, 19)),
                at(date(2026, 1, 23)),
            ]
        );
    }

    #[test]
    fn test_weekly_skips_days_before_series_start() {
        // Starts on a Thursday; the Monday of that week is skipped
        let rule =
            RecurrenceRule::weekly(vec![Weekday::Mon, Weekday::Fri], date(2026, 1, 8), evening());
        let first: Vec<_> = Series::new(&rule).unwrap().take(2).collect();
        assert_eq!(first[0].starts_at, at(date(2026, 1, 9)));
        assert_eq!(first[0].index, 1);
        assert_eq!(first[1].starts_at, at(date(2026, 1, 12)));
    }

    #[test]
    fn test_monthly_clamps_to_short_months() {
        let rule = RecurrenceRule::monthly(31, date(2026, 1, 1), evening());
        let dates: Vec<_> = Series::new(&rule).unwrap().take(4).map(|o| o.starts_at).collect();
        assert_eq!(
            dates,
            vec![
                at(date(2026, 1, 31)),
                at(date(2026, 2, 28)),
                at(date(2026, 3, 31)),
                at(date(2026, 4, 30)),
            ]
        );
    }

    #[test]
    fn test_monthly_interval_and_late_start() {
        // The 10th of January is before the series start, so February is first
        let rule = RecurrenceRule::monthly(10, date(2026, 1, 15), evening()).with_interval(3);
        let dates: Vec<_> = Series::new(&rule).unwrap().take(2).map(|o| o.starts_at).collect();
        assert_eq!(dates, vec![at(date(2026, 4, 10)), at(date(2026, 7, 10))]);
    }

    #[test]
    fn test_custom_every_n_days() {
        let rule = RecurrenceRule::every_days(10, date(2026, 2, 25), evening());
        let dates: Vec<_> = Series::new(&rule).unwrap().take(3).map(|o| o.starts_at).collect();
        assert_eq!(
            dates,
            vec![at(date(2026, 2, 25)), at(date(2026, 3, 7)), at(date(2026, 3, 17))]
        );
    }

    #[test]
    fn test_series_end_and_max_count() {
        let ended =
            RecurrenceRule::every_days(1, date(2026, 3, 1), evening()).until(date(2026, 3, 3));
        assert_eq!(Series::new(&ended).unwrap().count(), 3);

        let capped = RecurrenceRule::every_days(1, date(2026, 3, 1), evening()).limit(5);
        let all: Vec<_> = Series::new(&capped).unwrap().collect();
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].index, 5);
    }

    #[test]
    fn test_max_count_spans_whole_series() {
        // Three instances already happened before the window; only two remain
        let rule = RecurrenceRule::every_days(1, date(2026, 3, 1), evening()).limit(5);
        let win = window(date(2026, 3, 4), 30);
        let found = occurrences(&rule, &win, &HashSet::new()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 4);
    }

    #[test]
    fn test_invalid_rules() {
        let start = date(2026, 1, 1);
        assert_eq!(
            validate_rule(&RecurrenceRule::weekly(vec![], start, evening())),
            Err(RecurrenceError::NoWeekdays)
        );
        assert_eq!(
            validate_rule(&RecurrenceRule::monthly(32, start, evening())),
            Err(RecurrenceError::InvalidDayOfMonth(32))
        );
        assert_eq!(
            validate_rule(&RecurrenceRule::every_days(0, start, evening())),
            Err(RecurrenceError::ZeroInterval)
        );
        assert!(matches!(
            validate_rule(&RecurrenceRule::every_days(1, start, evening()).until(date(2025, 1, 1))),
            Err(RecurrenceError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_next_occurrence() {
        let rule = RecurrenceRule::weekly(vec![Weekday::Sat], date(2026, 1, 1), evening());
        let after = Utc.with_ymd_and_hms(2026, 1, 10, 19, 0, 0).unwrap();
        let next = next_occurrence(&rule, after).unwrap().unwrap();
        assert_eq!(next.starts_at, at(date(2026, 1, 17)));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(week_start(date(2026, 1, 8)), date(2026, 1, 5));
        assert_eq!(last_day_of_month(2028, 2), Some(date(2028, 2, 29)));
        assert_eq!(last_day_of_month(2026, 12), Some(date(2026, 12, 31)));
    }
}
