use std::collections::{BTreeSet, HashMap};

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{AttendanceRecord, AttendanceStatus, StudentRiskRow};
use crate::roster::{self, Roster};

struct RiskTally {
    session_dates: BTreeSet<NaiveDate>,
    absences: usize,
}

/// Ranks students by unexcused absence rate over records dated on or after
/// `window_start` (open upper bound, "through now").
///
/// A session is a distinct date with at least one record for the student, so
/// double scans on one day count once. Only rows whose rate exceeds
/// `threshold` are kept, sorted by rate descending with student id ascending
/// as the tie-break so equal rates order reproducibly.
pub fn score_absence_risk(
    records: &[AttendanceRecord],
    roster: &Roster,
    window_start: NaiveDate,
    threshold: f64,
) -> Vec<StudentRiskRow> {
    let mut tallies: HashMap<Uuid, RiskTally> = HashMap::new();

    for record in records {
        if record.date < window_start {
            continue;
        }

        // A row without a student id cannot be attributed; skip it rather
        // than abort the report for everyone else.
        let Some(student_id) = record.student_id else {
            continue;
        };

        let entry = tallies.entry(student_id).or_insert_with(|| RiskTally {
            session_dates: BTreeSet::new(),
            absences: 0,
        });
        entry.session_dates.insert(record.date);
        let risk_absent = AttendanceStatus::parse(&record.status)
            .is_some_and(AttendanceStatus::is_risk_absent);
        if risk_absent {
            entry.absences += 1;
        }
    }

    let mut rows: Vec<StudentRiskRow> = tallies
        .into_iter()
        .map(|(student_id, tally)| {
            let total_sessions = tally.session_dates.len();
            let absence_rate = if total_sessions == 0 {
                0.0
            } else {
                tally.absences as f64 / total_sessions as f64 * 100.0
            };
            let (full_name, grade_level) = roster::display_fields(roster, Some(student_id));

            StudentRiskRow {
                student_id,
                full_name,
                grade_level,
                total_sessions,
                absences: tally.absences,
                absence_rate,
            }
        })
        .filter(|row| row.absence_rate > threshold)
        .collect();

    rows.sort_by(|a, b| {
        b.absence_rate
            .partial_cmp(&a.absence_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    rows
}

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}
