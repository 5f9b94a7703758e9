use std::collections::BTreeMap;

use anyhow::ensure;
use chrono::{Duration, NaiveDate, Utc};

use crate::models::{AttendanceRecord, AttendanceStatus, TodayCounts, TrendSeries};

/// Computes the daily presence-rate series over the closed window
/// `[window_start, window_end]`.
///
/// Labels are the dates that actually have records, ascending. Dates without
/// records are not zero-filled; callers that need a dense series reindex on
/// their side. A bucket with no classifiable denominator yields `None`, since
/// `0.0` would read as an observed 0% presence.
pub fn compute_trend(
    records: &[AttendanceRecord],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> anyhow::Result<TrendSeries> {
    ensure!(
        window_start <= window_end,
        "trend window ends ({window_end}) before it starts ({window_start})"
    );

    let mut buckets: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();

    for record in records {
        if record.date < window_start || record.date > window_end {
            continue;
        }

        let entry = buckets.entry(record.date).or_insert((0, 0));
        entry.1 += 1;
        let presentish = AttendanceStatus::parse(&record.status)
            .is_some_and(AttendanceStatus::is_presentish);
        if presentish {
            entry.0 += 1;
        }
    }

    let mut labels = Vec::with_capacity(buckets.len());
    let mut values = Vec::with_capacity(buckets.len());

    for (date, (presentish, total)) in buckets {
        labels.push(date);
        values.push(if total == 0 {
            None
        } else {
            Some(round_one_decimal(presentish as f64 / total as f64 * 100.0))
        });
    }

    Ok(TrendSeries { labels, values })
}

/// Tallies records dated `today` into the four dashboard buckets.
///
/// Independent of any trend window. `partial` taps land in the present
/// bucket; statuses outside the vocabulary are ignored.
pub fn tally_today(records: &[AttendanceRecord], today: NaiveDate) -> TodayCounts {
    let mut counts = TodayCounts::default();

    for record in records {
        if record.date != today {
            continue;
        }

        match AttendanceStatus::parse(&record.status) {
            Some(AttendanceStatus::Present | AttendanceStatus::Partial) => counts.present += 1,
            Some(AttendanceStatus::Late) => counts.late += 1,
            Some(AttendanceStatus::ExcusedAbsent) => counts.excused += 1,
            Some(AttendanceStatus::Absent) => counts.absent += 1,
            None => {}
        }
    }

    counts
}

/// First date of a trend window that ends today and spans `days` calendar days.
pub fn window_start(days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(days.max(1) - 1)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            date: date.parse().unwrap(),
            student_id: None,
            status: status.to_string(),
            class_id: None,
            tap_in_time: None,
            tap_out_time: None,
            remarks: None,
        }
    }

    fn date(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn buckets_mixed_statuses_into_a_rate() {
        let records = vec![record("2024-02-01", "present"), record("2024-02-01", "absent")];

        let series = compute_trend(&records, date("2024-02-01"), date("2024-02-07")).unwrap();
        assert_eq!(series.labels, vec![date("2024-02-01")]);
        assert_eq!(series.values, vec![Some(50.0)]);
    }

    #[test]
    fn trend_is_sparse_over_observed_dates_only() {
        let records = vec![record("2024-02-01", "present"), record("2024-02-05", "late")];

        let series = compute_trend(&records, date("2024-02-01"), date("2024-02-07")).unwrap();
        assert_eq!(series.labels.len(), 2);
        assert_eq!(series.labels, vec![date("2024-02-01"), date("2024-02-05")]);
        assert_eq!(series.values, vec![Some(100.0), Some(100.0)]);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let records = vec![
            record("2024-01-31", "present"),
            record("2024-02-01", "present"),
            record("2024-02-07", "present"),
            record("2024-02-08", "present"),
        ];

        let series = compute_trend(&records, date("2024-02-01"), date("2024-02-07")).unwrap();
        assert_eq!(series.labels, vec![date("2024-02-01"), date("2024-02-07")]);
    }

    #[test]
    fn rates_round_to_one_decimal() {
        let records = vec![
            record("2024-02-01", "present"),
            record("2024-02-01", "late"),
            record("2024-02-01", "absent"),
        ];

        let series = compute_trend(&records, date("2024-02-01"), date("2024-02-01")).unwrap();
        assert_eq!(series.values, vec![Some(66.7)]);
    }

    #[test]
    fn unknown_status_counts_toward_the_denominator_only() {
        let records = vec![
            record("2024-02-01", "present"),
            record("2024-02-01", "sick_leave"),
        ];

        let series = compute_trend(&records, date("2024-02-01"), date("2024-02-01")).unwrap();
        assert_eq!(series.values, vec![Some(50.0)]);
    }

    #[test]
    fn inverted_window_is_a_caller_error() {
        let result = compute_trend(&[], date("2024-02-07"), date("2024-02-01"));
        assert!(result.is_err());
    }

    #[test]
    fn empty_input_yields_an_empty_series() {
        let series = compute_trend(&[], date("2024-02-01"), date("2024-02-07")).unwrap();
        assert!(series.labels.is_empty());
        assert!(series.values.is_empty());
    }

    #[test]
    fn compute_trend_does_not_mutate_its_input() {
        let records = vec![record("2024-02-01", "present"), record("2024-02-01", "absent")];

        let first = compute_trend(&records, date("2024-02-01"), date("2024-02-07")).unwrap();
        let second = compute_trend(&records, date("2024-02-01"), date("2024-02-07")).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.values, second.values);
    }

    #[test]
    fn today_tally_maps_statuses_to_dashboard_buckets() {
        let records = vec![
            record("2024-02-01", "present"),
            record("2024-02-01", "partial"),
            record("2024-02-01", "late"),
            record("2024-02-01", "absent"),
            record("2024-02-01", "excused_absent"),
            record("2024-02-01", "sick_leave"),
            record("2024-01-31", "present"),
        ];

        let counts = tally_today(&records, date("2024-02-01"));
        assert_eq!(
            counts,
            TodayCounts {
                present: 2,
                late: 1,
                absent: 1,
                excused: 1,
            }
        );
    }

    #[test]
    fn today_tally_is_zero_for_a_recordless_day() {
        let records = vec![record("2024-02-01", "present")];
        assert_eq!(tally_today(&records, date("2024-02-02")), TodayCounts::default());
    }
}
