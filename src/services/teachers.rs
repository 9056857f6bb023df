use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::domain::availability::available_teachers;
use crate::errors::{AppError, AppResult};
use crate::models::{Certification, Class, CreateTeacherRequest, Teacher, TimeOfDay, WorkingHours};
use crate::store::{DocumentStore, Query, find_all, load, persist};

pub async fn create_teacher(store: &dyn DocumentStore, request: CreateTeacherRequest) -> AppResult<Teacher> {
    let mut teacher = Teacher::create(request)?;
    persist(store, &mut teacher).await?;
    info!("Registered teacher {} ({})", teacher.id, teacher.name);
    Ok(teacher)
}

pub async fn update_working_hours(
    store: &dyn DocumentStore,
    teacher_id: Uuid,
    hours: WorkingHours,
) -> AppResult<Teacher> {
    hours.validate()?;
    let mut teacher: Teacher = load(store, teacher_id).await?;
    teacher.working_hours = hours;
    persist(store, &mut teacher).await?;
    Ok(teacher)
}

pub async fn add_certification(
    store: &dyn DocumentStore,
    teacher_id: Uuid,
    certification: Certification,
) -> AppResult<Teacher> {
    let mut teacher: Teacher = load(store, teacher_id).await?;
    teacher.add_certification(certification)?;
    persist(store, &mut teacher).await?;
    Ok(teacher)
}

/// Terminates the teacher. Refused while they still teach an active class.
pub async fn terminate_teacher(
    store: &dyn DocumentStore,
    clock: Clock,
    teacher_id: Uuid,
    reason: String,
) -> AppResult<Teacher> {
    let mut teacher: Teacher = load(store, teacher_id).await?;
    let classes: Vec<Class> =
        find_all(store, &Query::filter(json!({ "teacher_id": teacher_id, "active": true }))).await?;
    if let Some(class) = classes.first() {
        warn!("Teacher {} still teaches class {}", teacher_id, class.id);
        return Err(AppError::invalid_transition(
            "Teacher",
            format!("teaching {} active classes", classes.len()),
            "terminate",
        ));
    }
    teacher.terminate(reason, clock.today())?;
    persist(store, &mut teacher).await?;
    info!("Terminated teacher {}", teacher_id);
    Ok(teacher)
}

pub async fn reactivate_teacher(store: &dyn DocumentStore, teacher_id: Uuid) -> AppResult<Teacher> {
    let mut teacher: Teacher = load(store, teacher_id).await?;
    teacher.reactivate()?;
    persist(store, &mut teacher).await?;
    Ok(teacher)
}

pub async fn teachers_available_at(store: &dyn DocumentStore, weekday: u8, time: TimeOfDay) -> AppResult<Vec<Teacher>> {
    let teachers: Vec<Teacher> = find_all(store, &Query::filter(json!({ "active": true }))).await?;
    Ok(available_teachers(&teachers, weekday, time).into_iter().cloned().collect())
}
