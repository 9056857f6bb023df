use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Attendance, AttendanceStatus, BehaviorObservations, FrequencyReport, Justification, JustificationReason, Lesson,
    StudentFrequency,
};
use crate::utils::round1;

impl Attendance {
    /// Builds the normalized record for a student's roster entry on `lesson`.
    pub fn for_lesson(
        lesson: &Lesson,
        student_id: Uuid,
        status: AttendanceStatus,
        recorded_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Attendance {
            id: Uuid::new_v4(),
            version: 0,
            student_id,
            class_id: lesson.class_id,
            lesson_id: lesson.id,
            teacher_id: lesson.teacher_id,
            date: lesson.date,
            start: lesson.start,
            end: lesson.end,
            status,
            justification: None,
            observations: None,
            recorded_by,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: AttendanceStatus, recorded_by: Uuid, now: DateTime<Utc>) {
        self.status = status;
        self.recorded_by = recorded_by;
        self.updated_at = now;
        if status == AttendanceStatus::Present {
            self.justification = None;
        }
    }

    /// Only absences can be justified; the status becomes an excused absence.
    pub fn justify(
        &mut self,
        reason: JustificationReason,
        description: Option<String>,
        attachment_url: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status == AttendanceStatus::Present {
            return Err(AppError::invalid_transition("Attendance", self.status, "justify"));
        }
        self.justification = Some(Justification {
            reason,
            description,
            attachment_url,
            justified_at: now,
        });
        if self.status == AttendanceStatus::Absent {
            self.status = AttendanceStatus::ExcusedAbsence;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn observe(&mut self, observations: BehaviorObservations, now: DateTime<Utc>) {
        self.observations = Some(observations);
        self.updated_at = now;
    }

    pub fn counts_as_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

fn in_range(record: &Attendance, from: NaiveDate, to: NaiveDate) -> bool {
    record.date >= from && record.date <= to
}

fn report<'a>(records: impl Iterator<Item = &'a Attendance>) -> FrequencyReport {
    let mut report = FrequencyReport::default();
    for record in records {
        report.total += 1;
        match record.status {
            AttendanceStatus::Present => report.present += 1,
            AttendanceStatus::Absent => report.absent += 1,
            AttendanceStatus::ExcusedAbsence => report.excused += 1,
            AttendanceStatus::MedicalNote => report.medical += 1,
        }
    }
    if report.total > 0 {
        report.percentage = round1(report.present as f64 / report.total as f64 * 100.0);
    }
    report
}

pub fn student_frequency(records: &[Attendance], student_id: Uuid, from: NaiveDate, to: NaiveDate) -> FrequencyReport {
    report(
        records
            .iter()
            .filter(|r| r.student_id == student_id && in_range(r, from, to)),
    )
}

/// Per-student frequency inside one class, best attendance first.
pub fn class_frequency(records: &[Attendance], class_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<StudentFrequency> {
    let mut by_student: HashMap<Uuid, Vec<&Attendance>> = HashMap::new();
    for record in records.iter().filter(|r| r.class_id == class_id && in_range(r, from, to)) {
        by_student.entry(record.student_id).or_default().push(record);
    }

    let mut result: Vec<StudentFrequency> = by_student
        .into_iter()
        .map(|(student_id, records)| StudentFrequency {
            student_id,
            report: report(records.into_iter()),
        })
        .collect();
    result.sort_by(|a, b| {
        b.report
            .percentage
            .total_cmp(&a.report.percentage)
            .then(a.student_id.cmp(&b.student_id))
    });
    result
}
