use std::collections::HashMap;

use uuid::Uuid;

use crate::models::StudentProfile;

/// Lookup table from student id to profile, used to resolve display fields.
pub type Roster = HashMap<Uuid, StudentProfile>;

/// Builds the id -> profile lookup. Duplicate ids keep the first profile, so
/// the order of the input slice fully determines the result.
pub fn index_students(students: &[StudentProfile]) -> Roster {
    let mut roster = Roster::with_capacity(students.len());
    for student in students {
        roster
            .entry(student.id)
            .or_insert_with(|| student.clone());
    }
    roster
}

/// Resolves (full_name, grade_level) for an attendance record's student id.
///
/// Attendance rows can reference students that were since deleted or renamed;
/// those resolve to empty strings so one dangling foreign key cannot sink the
/// report for everyone else.
pub fn display_fields(roster: &Roster, student_id: Option<Uuid>) -> (String, String) {
    student_id
        .and_then(|id| roster.get(&id))
        .map(|student| (student.full_name.clone(), student.grade_level.clone()))
        .unwrap_or_default()
}
