use chrono::{DateTime, NaiveDate, Timelike, Utc};
use uuid::Uuid;

use crate::domain::roster::intervals_overlap;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AttendanceStats, AttendanceStatus, CancellationReason, Class, CreateLessonRequest, Lesson, LessonCancellation,
    LessonContent, LessonFeedback, LessonStatus, RosterEntry, TeacherLessonStats, TimeOfDay,
};
use crate::utils::{round1, weekday_of};

/// Present share of the roster, rounded to the nearest whole percent.
pub fn attendance_stats(roster: &[RosterEntry]) -> AttendanceStats {
    let total = roster.len() as u32;
    let present = roster
        .iter()
        .filter(|e| e.status == AttendanceStatus::Present)
        .count() as u32;
    let percentage = if total > 0 {
        (present as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };
    AttendanceStats {
        total,
        present,
        absent: total - present,
        percentage,
    }
}

impl Lesson {
    pub fn create(request: CreateLessonRequest, class: &Class, created_by: Uuid, now: DateTime<Utc>) -> AppResult<Self> {
        if request.class_id != class.id {
            return Err(AppError::Validation("Lesson class does not match the given class".to_string()));
        }
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Lesson title is required".to_string()));
        }
        validate_range(request.start, request.end)?;

        Ok(Lesson {
            id: Uuid::new_v4(),
            version: 0,
            class_id: class.id,
            teacher_id: request.teacher_id.unwrap_or(class.teacher_id),
            date: request.date,
            start: request.start,
            end: request.end,
            duration_minutes: request.end.minutes() - request.start.minutes(),
            title: request.title.trim().to_string(),
            description: request.description,
            objectives: request.objectives,
            content: request.content,
            status: LessonStatus::Scheduled,
            cancellation: None,
            roster: Vec::new(),
            stats: AttendanceStats::default(),
            feedback: None,
            created_by,
            updated_at: now,
        })
    }

    pub fn weekday(&self) -> u8 {
        weekday_of(self.date)
    }

    pub fn overlaps(&self, other: &Lesson) -> bool {
        self.date == other.date && intervals_overlap(self.start, self.end, other.start, other.end)
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != LessonStatus::Scheduled {
            return Err(AppError::invalid_transition("Lesson", self.status, "start"));
        }
        self.status = LessonStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    pub fn finish(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != LessonStatus::InProgress {
            return Err(AppError::invalid_transition("Lesson", self.status, "finish"));
        }
        self.status = LessonStatus::Completed;
        self.stats = attendance_stats(&self.roster);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the lesson, or postpones it when a reschedule date is given.
    /// Only a lesson that has not started yet can be postponed.
    pub fn cancel(
        &mut self,
        reason: CancellationReason,
        description: Option<String>,
        reschedule_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        match (self.status, reschedule_date) {
            (LessonStatus::Scheduled, Some(_)) => {}
            (LessonStatus::Scheduled | LessonStatus::InProgress, None) => {}
            (status, Some(_)) => return Err(AppError::invalid_transition("Lesson", status, "postpone")),
            (status, None) => return Err(AppError::invalid_transition("Lesson", status, "cancel")),
        }
        if let Some(date) = reschedule_date {
            if date <= self.date {
                return Err(AppError::Validation(format!(
                    "Reschedule date {} must be after the lesson date {}",
                    date, self.date
                )));
            }
        }

        self.status = if reschedule_date.is_some() {
            LessonStatus::Postponed
        } else {
            LessonStatus::Cancelled
        };
        self.cancellation = Some(LessonCancellation {
            reason,
            description,
            reschedule_date,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Upserts the student's roster entry and refreshes the statistics.
    /// Present students get their arrival time stamped from `now`.
    pub fn mark_attendance(
        &mut self,
        student_id: Uuid,
        status: AttendanceStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if matches!(self.status, LessonStatus::Cancelled | LessonStatus::Postponed) {
            return Err(AppError::invalid_transition("Lesson", self.status, "mark attendance on"));
        }
        let arrival_time = match status {
            AttendanceStatus::Present => Some(TimeOfDay::hm(now.hour() as u16, now.minute() as u16)?),
            _ => None,
        };

        match self.roster.iter_mut().find(|e| e.student_id == student_id) {
            Some(entry) => {
                entry.status = status;
                entry.note = note;
                entry.arrival_time = arrival_time;
            }
            None => self.roster.push(RosterEntry {
                student_id,
                status,
                arrival_time,
                note,
            }),
        }
        self.stats = attendance_stats(&self.roster);
        self.updated_at = now;
        Ok(())
    }

    pub fn roster_entry(&self, student_id: Uuid) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.student_id == student_id)
    }

    pub fn reschedule(&mut self, date: NaiveDate, start: TimeOfDay, end: TimeOfDay, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != LessonStatus::Scheduled {
            return Err(AppError::invalid_transition("Lesson", self.status, "reschedule"));
        }
        validate_range(start, end)?;
        self.date = date;
        self.start = start;
        self.end = end;
        self.duration_minutes = end.minutes() - start.minutes();
        self.updated_at = now;
        Ok(())
    }

    pub fn update_content(&mut self, content: LessonContent, objectives: Vec<String>, now: DateTime<Utc>) -> AppResult<()> {
        if matches!(self.status, LessonStatus::Cancelled | LessonStatus::Postponed) {
            return Err(AppError::invalid_transition("Lesson", self.status, "edit"));
        }
        self.content = content;
        self.objectives = objectives;
        self.updated_at = now;
        Ok(())
    }

    pub fn record_feedback(&mut self, feedback: LessonFeedback, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != LessonStatus::Completed {
            return Err(AppError::invalid_transition("Lesson", self.status, "record feedback on"));
        }
        for (label, score) in [
            ("quality", feedback.quality),
            ("participation", feedback.participation),
            ("objectives_met", feedback.objectives_met),
        ] {
            if !(1..=5).contains(&score) {
                return Err(AppError::Validation(format!("Feedback {} must be between 1 and 5, got {}", label, score)));
            }
        }
        self.feedback = Some(feedback);
        self.updated_at = now;
        Ok(())
    }
}

fn validate_range(start: TimeOfDay, end: TimeOfDay) -> AppResult<()> {
    if end <= start {
        return Err(AppError::Validation(format!("End time {} must be after start time {}", end, start)));
    }
    Ok(())
}

/// Another non-cancelled lesson of the same teacher overlapping `candidate`
/// on the same date.
pub fn find_lesson_conflict<'a>(existing: &'a [Lesson], candidate: &Lesson) -> Option<&'a Lesson> {
    existing.iter().find(|other| {
        other.id != candidate.id
            && other.teacher_id == candidate.teacher_id
            && other.status != LessonStatus::Cancelled
            && other.overlaps(candidate)
    })
}

/// Lesson counts and mean attendance for lessons dated within `[from, to]`.
pub fn teacher_lesson_stats(lessons: &[Lesson], teacher_id: Uuid, from: NaiveDate, to: NaiveDate) -> TeacherLessonStats {
    let in_range: Vec<&Lesson> = lessons
        .iter()
        .filter(|l| l.teacher_id == teacher_id && l.date >= from && l.date <= to)
        .collect();
    if in_range.is_empty() {
        return TeacherLessonStats::default();
    }

    let attendance_sum: u32 = in_range.iter().map(|l| l.stats.percentage).sum();
    TeacherLessonStats {
        total: in_range.len() as u32,
        completed: in_range.iter().filter(|l| l.status == LessonStatus::Completed).count() as u32,
        cancelled: in_range.iter().filter(|l| l.status == LessonStatus::Cancelled).count() as u32,
        average_attendance: round1(attendance_sum as f64 / in_range.len() as f64),
    }
}
