use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

/// One homeroom scan/check event as stored in the attendance table.
///
/// `status` stays the raw stored string: rows written by older app versions
/// can carry values outside the current vocabulary and still have to count
/// toward daily totals and tracked sessions.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub student_id: Option<Uuid>,
    pub status: String,
    pub class_id: Option<Uuid>,
    pub tap_in_time: Option<NaiveTime>,
    pub tap_out_time: Option<NaiveTime>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub id: Uuid,
    pub full_name: String,
    pub grade_level: String,
    pub lrn: Option<String>,
}

/// Closed attendance status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Late,
    Partial,
    Absent,
    ExcusedAbsent,
}

impl AttendanceStatus {
    /// Unknown values map to `None` and are classified nowhere.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "present" => Some(Self::Present),
            "late" => Some(Self::Late),
            "partial" => Some(Self::Partial),
            "absent" => Some(Self::Absent),
            "excused_absent" => Some(Self::ExcusedAbsent),
            _ => None,
        }
    }

    /// Statuses that count toward the daily presence-rate numerator.
    pub fn is_presentish(self) -> bool {
        matches!(self, Self::Present | Self::Late | Self::Partial)
    }

    /// Statuses that count toward the absence-risk numerator. Excused
    /// absences are tracked as sessions but not penalized.
    pub fn is_risk_absent(self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Daily presence-rate series over the dates that actually have records.
/// `values` parallels `labels`; `None` marks a date with no computable rate.
#[derive(Debug, Clone, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodayCounts {
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub excused: usize,
}

#[derive(Debug, Clone)]
pub struct StudentRiskRow {
    pub student_id: Uuid,
    pub full_name: String,
    pub grade_level: String,
    pub total_sessions: usize,
    pub absences: usize,
    pub absence_rate: f64,
}
