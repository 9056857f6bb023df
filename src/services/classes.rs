use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::domain::roster::find_teacher_conflict;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Class, CreateClassRequest, Student, StudentDocumentKind, Teacher, TimeOfDay, TimeSlot, WaitlistEntry,
};
use crate::store::{DocumentStore, Query, find_all, load, persist};

/// Result of removing a student: the class as saved and the waitlist head
/// the caller may decide to promote.
#[derive(Debug, Clone)]
pub struct Unenrollment {
    pub class: Class,
    pub candidate: Option<WaitlistEntry>,
}

async fn active_teacher(store: &dyn DocumentStore, teacher_id: Uuid) -> AppResult<Teacher> {
    let teacher: Teacher = load(store, teacher_id).await?;
    if !teacher.active {
        return Err(AppError::Validation(format!("Teacher {} is not active", teacher_id)));
    }
    Ok(teacher)
}

/// Rejects `slots` when the teacher already teaches an overlapping class,
/// and, when `enforce_availability` is set, when a slot falls outside the
/// teacher's working hours.
async fn check_teacher_schedule(
    store: &dyn DocumentStore,
    teacher: &Teacher,
    slots: &[TimeSlot],
    exclude: Option<Uuid>,
    enforce_availability: bool,
) -> AppResult<()> {
    if enforce_availability {
        if let Some(slot) = slots.iter().find(|s| !teacher.covers_slot(s)) {
            warn!("Teacher {} is not available on weekday {} at {}", teacher.id, slot.weekday, slot.start);
            return Err(AppError::ScheduleConflict {
                teacher_id: teacher.id,
                detail: format!(
                    "outside working hours on weekday {} from {} to {}",
                    slot.weekday, slot.start, slot.end
                ),
            });
        }
    }

    let classes: Vec<Class> = find_all(store, &Query::filter(json!({ "teacher_id": teacher.id, "active": true }))).await?;
    if let Some((class, slot)) = find_teacher_conflict(&classes, teacher.id, slots, exclude) {
        warn!("Teacher {} already teaches class {} at weekday {} {}", teacher.id, class.id, slot.weekday, slot.start);
        return Err(AppError::ScheduleConflict {
            teacher_id: teacher.id,
            detail: format!(
                "class '{}' on weekday {} from {} to {}",
                class.name, slot.weekday, slot.start, slot.end
            ),
        });
    }
    Ok(())
}

pub async fn create_class(
    store: &dyn DocumentStore,
    request: CreateClassRequest,
    enforce_availability: bool,
) -> AppResult<Class> {
    let teacher = active_teacher(store, request.teacher_id).await?;
    if let Some(substitute) = request.substitute_teacher_id {
        active_teacher(store, substitute).await?;
    }

    let mut class = Class::create(request)?;
    check_teacher_schedule(store, &teacher, &class.slots, None, enforce_availability).await?;
    persist(store, &mut class).await?;
    info!("Created class {} ({}) for teacher {}", class.id, class.name, class.teacher_id);
    Ok(class)
}

pub async fn update_slots(
    store: &dyn DocumentStore,
    class_id: Uuid,
    slots: Vec<TimeSlot>,
    enforce_availability: bool,
) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    let teacher = active_teacher(store, class.teacher_id).await?;
    check_teacher_schedule(store, &teacher, &slots, Some(class.id), enforce_availability).await?;
    class.set_slots(slots)?;
    persist(store, &mut class).await?;
    info!("Updated schedule of class {}", class.id);
    Ok(class)
}

/// Moves the class to another primary teacher after the same schedule checks
/// as creation.
pub async fn assign_teacher(
    store: &dyn DocumentStore,
    class_id: Uuid,
    teacher_id: Uuid,
    enforce_availability: bool,
) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    let teacher = active_teacher(store, teacher_id).await?;
    check_teacher_schedule(store, &teacher, &class.slots, Some(class.id), enforce_availability).await?;
    class.teacher_id = teacher_id;
    persist(store, &mut class).await?;
    info!("Class {} is now taught by {}", class.id, teacher_id);
    Ok(class)
}

/// Active classes whose roster contains the student.
pub async fn classes_of_student(store: &dyn DocumentStore, student_id: Uuid) -> AppResult<Vec<Class>> {
    find_all(store, &Query::filter(json!({ "enrolled": [student_id], "active": true }))).await
}

pub async fn current_class(store: &dyn DocumentStore, student_id: Uuid) -> AppResult<Option<Class>> {
    Ok(classes_of_student(store, student_id).await?.into_iter().next())
}

fn check_eligibility(clock: Clock, class: &Class, student: &Student) -> AppResult<()> {
    if !student.active {
        return Err(AppError::Validation(format!("Student {} is inactive", student.id)));
    }
    let age = student.age(clock.today());
    if !class.accepts_age(age) {
        return Err(AppError::Validation(format!(
            "Student age {} is outside the class range {}-{}",
            age, class.age_range.min, class.age_range.max
        )));
    }
    let has_certificate = student
        .documents
        .iter()
        .any(|d| d.kind == StudentDocumentKind::MedicalCertificate);
    if class.settings.require_medical_certificate && !has_certificate {
        return Err(AppError::Validation(format!(
            "Class {} requires a medical certificate",
            class.id
        )));
    }
    Ok(())
}

/// Seats the student in `class` and saves it. A student sitting in another
/// class is moved: the target is saved first, then the previous class
/// releases the seat and the change is appended to the student's history.
async fn admit(store: &dyn DocumentStore, clock: Clock, class: &mut Class, student_id: Uuid) -> AppResult<()> {
    let mut student: Student = load(store, student_id).await?;
    check_eligibility(clock, class, &student)?;

    let previous = classes_of_student(store, student_id)
        .await?
        .into_iter()
        .find(|c| c.id != class.id);

    if let Err(e) = class.enroll(student_id) {
        warn!("Enrollment of {} into class {} rejected: {}", student_id, class.id, e);
        return Err(e);
    }
    persist(store, &mut *class).await?;

    if let Some(mut previous) = previous {
        previous.unenroll(student_id)?;
        persist(store, &mut previous).await?;
        let started_on = student
            .class_history
            .last()
            .map(|h| h.ended_on)
            .unwrap_or(student.enrolled_on);
        student.record_class_change(previous.id, started_on, clock.today(), None);
        persist(store, &mut student).await?;
        info!("Moved student {} from class {} to {}", student_id, previous.id, class.id);
    }
    Ok(())
}

pub async fn enroll_student(
    store: &dyn DocumentStore,
    clock: Clock,
    class_id: Uuid,
    student_id: Uuid,
) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    admit(store, clock, &mut class, student_id).await?;
    info!("Enrolled student {} into class {}", student_id, class_id);
    Ok(class)
}

pub async fn unenroll_student(
    store: &dyn DocumentStore,
    clock: Clock,
    class_id: Uuid,
    student_id: Uuid,
    reason: Option<String>,
) -> AppResult<Unenrollment> {
    let mut class: Class = load(store, class_id).await?;
    let candidate = class.unenroll(student_id)?;
    persist(store, &mut class).await?;

    let mut student: Student = load(store, student_id).await?;
    let started_on = student
        .class_history
        .last()
        .map(|h| h.ended_on)
        .unwrap_or(student.enrolled_on);
    student.record_class_change(class_id, started_on, clock.today(), reason);
    persist(store, &mut student).await?;

    info!("Removed student {} from class {}", student_id, class_id);
    Ok(Unenrollment { class, candidate })
}

pub async fn add_to_waitlist(
    store: &dyn DocumentStore,
    clock: Clock,
    class_id: Uuid,
    student_id: Uuid,
    priority: Option<i32>,
) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    load::<Student>(store, student_id).await?;
    class.add_to_waitlist(student_id, priority, clock.now)?;
    persist(store, &mut class).await?;
    info!("Student {} joined the waitlist of class {}", student_id, class_id);
    Ok(class)
}

pub async fn remove_from_waitlist(store: &dyn DocumentStore, class_id: Uuid, student_id: Uuid) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    class.remove_from_waitlist(student_id)?;
    persist(store, &mut class).await?;
    Ok(class)
}

/// Enrolls the waitlist head, if any, with the same checks and move logic
/// as a direct enrollment. Returns the promoted student.
pub async fn promote_from_waitlist(store: &dyn DocumentStore, clock: Clock, class_id: Uuid) -> AppResult<Option<Uuid>> {
    let mut class: Class = load(store, class_id).await?;
    let Some(student_id) = class.next_candidate().map(|e| e.student_id) else {
        return Ok(None);
    };
    admit(store, clock, &mut class, student_id).await?;
    info!("Promoted student {} from the waitlist of class {}", student_id, class_id);
    Ok(Some(student_id))
}

/// Classes, open or closed, whose waitlist holds the student.
pub async fn waitlists_of_student(store: &dyn DocumentStore, student_id: Uuid) -> AppResult<Vec<Class>> {
    find_all(store, &Query::filter(json!({ "waitlist": [{ "student_id": student_id }] }))).await
}

pub async fn close_class(store: &dyn DocumentStore, clock: Clock, class_id: Uuid, reason: String) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    class.close(reason, clock.today())?;
    persist(store, &mut class).await?;
    info!("Closed class {}", class_id);
    Ok(class)
}

pub async fn reopen_class(store: &dyn DocumentStore, class_id: Uuid) -> AppResult<Class> {
    let mut class: Class = load(store, class_id).await?;
    class.reopen()?;
    persist(store, &mut class).await?;
    info!("Reopened class {}", class_id);
    Ok(class)
}

pub async fn classes_by_teacher(store: &dyn DocumentStore, teacher_id: Uuid) -> AppResult<Vec<Class>> {
    let query = Query::filter(json!({ "teacher_id": teacher_id })).sort_by("name", false);
    find_all(store, &query).await
}

pub async fn classes_with_open_seats(store: &dyn DocumentStore) -> AppResult<Vec<Class>> {
    let classes: Vec<Class> = find_all(store, &Query::filter(json!({ "active": true })).sort_by("name", false)).await?;
    Ok(classes.into_iter().filter(Class::has_open_seats).collect())
}

pub async fn classes_running_at(store: &dyn DocumentStore, weekday: u8, time: TimeOfDay) -> AppResult<Vec<Class>> {
    let classes: Vec<Class> = find_all(store, &Query::filter(json!({ "active": true }))).await?;
    Ok(classes.into_iter().filter(|c| c.runs_at(weekday, time)).collect())
}
