use std::fmt::Write;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AttendanceRecord, StudentRiskRow, TodayCounts, TrendSeries};
use crate::roster::{self, Roster};

/// Document written to `dashboard_metrics.json` for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub generated_at: String,
    pub today: NaiveDate,
    pub today_counts: TodayCounts,
    pub trend: TrendSeries,
}

/// Row-per-record attendance export with resolved student display fields.
pub fn attendance_csv(records: &[AttendanceRecord], roster: &Roster) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "date",
        "student_id",
        "student_name",
        "grade_level",
        "status",
        "tap_in_time",
        "tap_out_time",
        "remarks",
        "class_id",
    ])?;

    for record in records {
        let (student_name, grade_level) = roster::display_fields(roster, record.student_id);
        writer.write_record([
            record.date.to_string(),
            record
                .student_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            student_name,
            grade_level,
            record.status.clone(),
            record
                .tap_in_time
                .map(|t| t.to_string())
                .unwrap_or_default(),
            record
                .tap_out_time
                .map(|t| t.to_string())
                .unwrap_or_default(),
            record.remarks.clone().unwrap_or_default(),
            record.class_id.map(|id| id.to_string()).unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().context("failed to flush attendance csv")?;
    String::from_utf8(bytes).context("attendance csv was not valid utf-8")
}

pub fn risk_csv(rows: &[StudentRiskRow]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "student_id",
        "full_name",
        "grade_level",
        "total_sessions",
        "absences",
        "absence_rate",
    ])?;

    for row in rows {
        writer.write_record([
            row.student_id.to_string(),
            row.full_name.clone(),
            row.grade_level.clone(),
            row.total_sessions.to_string(),
            row.absences.to_string(),
            format!("{:.1}", row.absence_rate),
        ])?;
    }

    let bytes = writer.into_inner().context("failed to flush risk csv")?;
    String::from_utf8(bytes).context("risk csv was not valid utf-8")
}

pub fn build_report(
    window_start: NaiveDate,
    threshold: f64,
    records: &[AttendanceRecord],
    series: &TrendSeries,
    rows: &[StudentRiskRow],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Analytics Report");
    let _ = writeln!(
        output,
        "Records since {} (risk threshold {:.1}%)",
        window_start, threshold
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Presence Rate");

    if series.labels.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this window.");
    } else {
        for (label, value) in series.labels.iter().zip(series.values.iter()) {
            match value {
                Some(rate) => {
                    let _ = writeln!(output, "- {}: {:.1}% present", label, rate);
                }
                None => {
                    let _ = writeln!(output, "- {}: no data", label);
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Chronic Absence Risk");

    if rows.is_empty() {
        if records.is_empty() {
            let _ = writeln!(output, "No attendance recorded for this window.");
        } else {
            let _ = writeln!(output, "No students above the risk threshold.");
        }
    } else {
        for row in rows {
            let _ = writeln!(
                output,
                "- {} (grade {}) {:.1}% absent across {} tracked days",
                display_name(row),
                row.grade_level,
                row.absence_rate,
                row.total_sessions
            );
        }
    }

    output
}

/// Falls back to the raw id when the roster had no profile for the student.
pub fn display_name(row: &StudentRiskRow) -> String {
    if row.full_name.is_empty() {
        row.student_id.to_string()
    } else {
        row.full_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentProfile;
    use crate::roster::index_students;
    use uuid::Uuid;

    fn record(date: &str, student_id: Option<Uuid>, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            date: date.parse().unwrap(),
            student_id,
            status: status.to_string(),
            class_id: None,
            tap_in_time: None,
            tap_out_time: None,
            remarks: Some("gate scan".to_string()),
        }
    }

    fn risk_row(rate: f64) -> StudentRiskRow {
        StudentRiskRow {
            student_id: Uuid::new_v4(),
            full_name: "Maria Santos".to_string(),
            grade_level: "Grade 7".to_string(),
            total_sessions: 10,
            absences: 3,
            absence_rate: rate,
        }
    }

    #[test]
    fn attendance_csv_resolves_student_fields() {
        let id = Uuid::new_v4();
        let roster = index_students(&[StudentProfile {
            id,
            full_name: "Maria Santos".to_string(),
            grade_level: "Grade 7".to_string(),
            lrn: None,
        }]);
        let records = vec![record("2024-02-01", Some(id), "present")];

        let csv = attendance_csv(&records, &roster).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,student_id,student_name,grade_level,status,tap_in_time,tap_out_time,remarks,class_id"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Maria Santos"));
        assert!(row.contains("Grade 7"));
        assert!(row.contains("2024-02-01"));
    }

    #[test]
    fn attendance_csv_leaves_unknown_students_blank() {
        let records = vec![record("2024-02-01", None, "present")];

        let csv = attendance_csv(&records, &Roster::new()).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "2024-02-01,,,,present,,,gate scan,");
    }

    #[test]
    fn risk_csv_formats_rates_to_one_decimal() {
        let rows = vec![risk_row(33.333_333)];

        let csv = risk_csv(&rows).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",10,3,33.3"));
    }

    #[test]
    fn report_lists_trend_and_risk_sections() {
        let records = vec![record("2024-02-01", Some(Uuid::new_v4()), "absent")];
        let series = TrendSeries {
            labels: vec!["2024-02-01".parse().unwrap()],
            values: vec![Some(50.0)],
        };
        let rows = vec![risk_row(50.0)];

        let report = build_report("2024-02-01".parse().unwrap(), 15.0, &records, &series, &rows);
        assert!(report.contains("# Attendance Analytics Report"));
        assert!(report.contains("- 2024-02-01: 50.0% present"));
        assert!(report.contains("Maria Santos"));
        assert!(report.contains("50.0% absent across 10 tracked days"));
    }

    #[test]
    fn report_distinguishes_no_data_from_no_risk() {
        let series = TrendSeries {
            labels: Vec::new(),
            values: Vec::new(),
        };

        let empty = build_report("2024-02-01".parse().unwrap(), 15.0, &[], &series, &[]);
        assert!(empty.contains("No attendance recorded for this window."));

        let records = vec![record("2024-02-01", Some(Uuid::new_v4()), "present")];
        let calm = build_report("2024-02-01".parse().unwrap(), 15.0, &records, &series, &[]);
        assert!(calm.contains("No students above the risk threshold."));
    }

    #[test]
    fn display_name_falls_back_to_the_id() {
        let mut row = risk_row(20.0);
        row.full_name = String::new();
        assert_eq!(display_name(&row), row.student_id.to_string());
    }
}
