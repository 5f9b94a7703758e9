use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::{AttendanceRecord, StudentProfile};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("8f4f2c1a-56d1-4b8a-9f33-0b1d2a6c9e01")?,
            "Maria Santos",
            "Grade 7",
            Some("108000123456"),
        ),
        (
            Uuid::parse_str("2b9e7d44-0c3f-4e25-8a8e-6f1a5d20c702")?,
            "Jose Ramirez",
            "Grade 8",
            Some("108000234567"),
        ),
        (
            Uuid::parse_str("c61a8e02-73b5-4f69-b2d4-9ad07c55e803")?,
            "Ana Dela Cruz",
            "Grade 7",
            None,
        ),
    ];

    for (id, full_name, grade_level, lrn) in students {
        sqlx::query(
            r#"
            INSERT INTO educare_track.students (id, full_name, grade_level, lrn)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, grade_level = EXCLUDED.grade_level
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(grade_level)
        .bind(lrn)
        .execute(pool)
        .await?;
    }

    let taps = vec![
        (
            "seed-001",
            "8f4f2c1a-56d1-4b8a-9f33-0b1d2a6c9e01",
            "present",
            Some("07:12:00"),
            None,
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
        ),
        (
            "seed-002",
            "2b9e7d44-0c3f-4e25-8a8e-6f1a5d20c702",
            "late",
            Some("08:41:00"),
            Some("overslept, parent notified"),
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
        ),
        (
            "seed-003",
            "c61a8e02-73b5-4f69-b2d4-9ad07c55e803",
            "absent",
            None,
            None,
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
        ),
        (
            "seed-004",
            "c61a8e02-73b5-4f69-b2d4-9ad07c55e803",
            "excused_absent",
            None,
            Some("medical certificate on file"),
            NaiveDate::from_ymd_opt(2026, 2, 3).context("invalid date")?,
        ),
    ];

    for (source_key, student_id, status, tap_in, remarks, date) in taps {
        let tap_in_time = tap_in
            .map(|raw| raw.parse::<NaiveTime>())
            .transpose()
            .context("invalid tap-in time")?;

        sqlx::query(
            r#"
            INSERT INTO educare_track.homeroom_attendance
            (id, student_id, date, status, tap_in_time, remarks, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::parse_str(student_id)?)
        .bind(date)
        .bind(status)
        .bind(tap_in_time)
        .bind(remarks)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_attendance(
    pool: &PgPool,
    since: NaiveDate,
    until: Option<NaiveDate>,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let mut query = String::from(
        "SELECT date, student_id, status, class_id, tap_in_time, tap_out_time, remarks \
         FROM educare_track.homeroom_attendance \
         WHERE date >= $1",
    );

    if until.is_some() {
        query.push_str(" AND date <= $2");
    }
    query.push_str(" ORDER BY date, student_id");

    let mut rows = sqlx::query(&query).bind(since);
    if let Some(value) = until {
        rows = rows.bind(value);
    }

    let fetched = rows.fetch_all(pool).await?;
    let mut records = Vec::with_capacity(fetched.len());

    for row in fetched {
        records.push(AttendanceRecord {
            date: row.get("date"),
            student_id: row.get("student_id"),
            status: row.get("status"),
            class_id: row.get("class_id"),
            tap_in_time: row.get("tap_in_time"),
            tap_out_time: row.get("tap_out_time"),
            remarks: row.get("remarks"),
        });
    }

    debug!(count = records.len(), %since, "fetched attendance records");
    Ok(records)
}

pub async fn fetch_students(pool: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<StudentProfile>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        "SELECT id, full_name, grade_level, lrn \
         FROM educare_track.students \
         WHERE id = ANY($1) \
         ORDER BY id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut students = Vec::with_capacity(rows.len());
    for row in rows {
        students.push(StudentProfile {
            id: row.get("id"),
            full_name: row.get("full_name"),
            grade_level: row.get("grade_level"),
            lrn: row.get("lrn"),
        });
    }

    debug!(count = students.len(), "fetched student profiles");
    Ok(students)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        date: NaiveDate,
        student_id: Uuid,
        status: String,
        class_id: Option<Uuid>,
        tap_in_time: Option<NaiveTime>,
        tap_out_time: Option<NaiveTime>,
        remarks: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO educare_track.homeroom_attendance
            (id, student_id, date, status, class_id, tap_in_time, tap_out_time, remarks, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.student_id)
        .bind(row.date)
        .bind(&row.status)
        .bind(row.class_id)
        .bind(row.tap_in_time)
        .bind(row.tap_out_time)
        .bind(&row.remarks)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
