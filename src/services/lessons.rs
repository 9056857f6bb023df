use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::domain::attendance::{class_frequency, student_frequency};
use crate::domain::lessons::{find_lesson_conflict, teacher_lesson_stats};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Attendance, AttendanceStatus, BehaviorObservations, CancellationReason, Class, CreateLessonRequest,
    FrequencyReport, JustificationReason, Lesson, LessonFeedback, LessonStatus, RescheduleLessonRequest,
    StudentFrequency, Teacher, TeacherLessonStats,
};
use crate::store::{DocumentStore, Query, find_all, load, persist};

async fn ensure_no_double_booking(store: &dyn DocumentStore, lesson: &Lesson) -> AppResult<()> {
    let same_day: Vec<Lesson> = find_all(
        store,
        &Query::filter(json!({ "teacher_id": lesson.teacher_id, "date": lesson.date })),
    )
    .await?;
    if let Some(other) = find_lesson_conflict(&same_day, lesson) {
        warn!("Teacher {} is double-booked on {} by lesson {}", lesson.teacher_id, lesson.date, other.id);
        return Err(AppError::ScheduleConflict {
            teacher_id: lesson.teacher_id,
            detail: format!("lesson '{}' on {} from {} to {}", other.title, other.date, other.start, other.end),
        });
    }
    Ok(())
}

fn ensure_available(teacher: &Teacher, lesson: &Lesson) -> AppResult<()> {
    let weekday = lesson.weekday();
    if teacher.is_available(weekday, lesson.start) && teacher.is_available(weekday, lesson.end) {
        return Ok(());
    }
    Err(AppError::ScheduleConflict {
        teacher_id: teacher.id,
        detail: format!(
            "outside working hours on {} from {} to {}",
            lesson.date, lesson.start, lesson.end
        ),
    })
}

pub async fn schedule_lesson(
    store: &dyn DocumentStore,
    clock: Clock,
    request: CreateLessonRequest,
    created_by: Uuid,
    enforce_availability: bool,
) -> AppResult<Lesson> {
    let class: Class = load(store, request.class_id).await?;
    if !class.active {
        return Err(AppError::invalid_transition("Class", "closed", "schedule a lesson for"));
    }
    let mut lesson = Lesson::create(request, &class, created_by, clock.now)?;
    let teacher: Teacher = load(store, lesson.teacher_id).await?;
    if enforce_availability {
        ensure_available(&teacher, &lesson)?;
    }
    ensure_no_double_booking(store, &lesson).await?;

    persist(store, &mut lesson).await?;
    info!("Scheduled lesson {} for class {} on {}", lesson.id, lesson.class_id, lesson.date);
    Ok(lesson)
}

pub async fn reschedule_lesson(
    store: &dyn DocumentStore,
    clock: Clock,
    lesson_id: Uuid,
    request: RescheduleLessonRequest,
    enforce_availability: bool,
) -> AppResult<Lesson> {
    let mut lesson: Lesson = load(store, lesson_id).await?;
    lesson.reschedule(request.date, request.start, request.end, clock.now)?;
    if enforce_availability {
        let teacher: Teacher = load(store, lesson.teacher_id).await?;
        ensure_available(&teacher, &lesson)?;
    }
    ensure_no_double_booking(store, &lesson).await?;
    persist(store, &mut lesson).await?;
    info!("Rescheduled lesson {} to {} {}-{}", lesson.id, lesson.date, lesson.start, lesson.end);
    Ok(lesson)
}

pub async fn start_lesson(store: &dyn DocumentStore, clock: Clock, lesson_id: Uuid) -> AppResult<Lesson> {
    let mut lesson: Lesson = load(store, lesson_id).await?;
    lesson.start(clock.now)?;
    persist(store, &mut lesson).await?;
    info!("Lesson {} started", lesson_id);
    Ok(lesson)
}

/// Completes the lesson and refreshes the class statistics from all of its
/// completed lessons.
pub async fn finish_lesson(store: &dyn DocumentStore, clock: Clock, lesson_id: Uuid) -> AppResult<Lesson> {
    let mut lesson: Lesson = load(store, lesson_id).await?;
    lesson.finish(clock.now)?;
    persist(store, &mut lesson).await?;
    info!("Lesson {} finished with {}% attendance", lesson_id, lesson.stats.percentage);

    let completed: Vec<Lesson> = find_all(
        store,
        &Query::filter(json!({ "class_id": lesson.class_id, "status": LessonStatus::Completed })),
    )
    .await?;
    let average = if completed.is_empty() {
        0.0
    } else {
        completed.iter().map(|l| l.stats.percentage as f64).sum::<f64>() / completed.len() as f64
    };
    let mut class: Class = load(store, lesson.class_id).await?;
    class.record_statistics(completed.len() as u32, average, clock.now);
    persist(store, &mut class).await?;
    Ok(lesson)
}

pub async fn cancel_lesson(
    store: &dyn DocumentStore,
    clock: Clock,
    lesson_id: Uuid,
    reason: CancellationReason,
    description: Option<String>,
    reschedule_date: Option<NaiveDate>,
) -> AppResult<Lesson> {
    let mut lesson: Lesson = load(store, lesson_id).await?;
    lesson.cancel(reason, description, reschedule_date, clock.now)?;
    persist(store, &mut lesson).await?;
    info!("Lesson {} is now {:?}", lesson_id, lesson.status);
    Ok(lesson)
}

/// Records attendance on the lesson roster and upserts the matching
/// attendance record. Repeated calls for the same student overwrite the
/// previous status and note.
pub async fn mark_attendance(
    store: &dyn DocumentStore,
    clock: Clock,
    lesson_id: Uuid,
    student_id: Uuid,
    status: AttendanceStatus,
    note: Option<String>,
    recorded_by: Uuid,
) -> AppResult<Attendance> {
    let mut lesson: Lesson = load(store, lesson_id).await?;
    lesson.mark_attendance(student_id, status, note, clock.now)?;
    persist(store, &mut lesson).await?;

    let existing: Option<Attendance> = find_all(
        store,
        &Query::filter(json!({ "student_id": student_id, "lesson_id": lesson_id })),
    )
    .await?
    .into_iter()
    .next();

    let mut record = match existing {
        Some(mut record) => {
            debug!("Overwriting attendance {} for student {}", record.id, student_id);
            record.set_status(status, recorded_by, clock.now);
            record
        }
        None => Attendance::for_lesson(&lesson, student_id, status, recorded_by, clock.now),
    };
    persist(store, &mut record).await?;
    info!("Marked student {} as {:?} on lesson {}", student_id, status, lesson_id);
    Ok(record)
}

pub async fn justify_absence(
    store: &dyn DocumentStore,
    clock: Clock,
    attendance_id: Uuid,
    reason: JustificationReason,
    description: Option<String>,
    attachment_url: Option<String>,
) -> AppResult<Attendance> {
    let mut record: Attendance = load(store, attendance_id).await?;
    record.justify(reason, description, attachment_url, clock.now)?;
    persist(store, &mut record).await?;
    Ok(record)
}

pub async fn record_observations(
    store: &dyn DocumentStore,
    clock: Clock,
    attendance_id: Uuid,
    observations: BehaviorObservations,
) -> AppResult<Attendance> {
    let mut record: Attendance = load(store, attendance_id).await?;
    record.observe(observations, clock.now);
    persist(store, &mut record).await?;
    Ok(record)
}

pub async fn record_feedback(
    store: &dyn DocumentStore,
    clock: Clock,
    lesson_id: Uuid,
    feedback: LessonFeedback,
) -> AppResult<Lesson> {
    let mut lesson: Lesson = load(store, lesson_id).await?;
    lesson.record_feedback(feedback, clock.now)?;
    persist(store, &mut lesson).await?;
    Ok(lesson)
}

pub async fn lessons_of_class(store: &dyn DocumentStore, class_id: Uuid) -> AppResult<Vec<Lesson>> {
    find_all(store, &Query::filter(json!({ "class_id": class_id })).sort_by("date", false)).await
}

pub async fn teacher_statistics(
    store: &dyn DocumentStore,
    teacher_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<TeacherLessonStats> {
    let lessons: Vec<Lesson> = find_all(store, &Query::filter(json!({ "teacher_id": teacher_id }))).await?;
    Ok(teacher_lesson_stats(&lessons, teacher_id, from, to))
}

pub async fn student_frequency_report(
    store: &dyn DocumentStore,
    student_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<FrequencyReport> {
    let records: Vec<Attendance> = find_all(store, &Query::filter(json!({ "student_id": student_id }))).await?;
    Ok(student_frequency(&records, student_id, from, to))
}

pub async fn class_frequency_report(
    store: &dyn DocumentStore,
    class_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<StudentFrequency>> {
    let records: Vec<Attendance> = find_all(store, &Query::filter(json!({ "class_id": class_id }))).await?;
    Ok(class_frequency(&records, class_id, from, to))
}
