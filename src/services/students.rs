use log::info;
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use super::classes::{classes_of_student, waitlists_of_student};
use crate::domain::students::student_statistics;
use crate::errors::AppResult;
use crate::models::{CreateStudentRequest, Plan, Student, StudentDocument, StudentStatistics};
use crate::store::{DocumentStore, Query, find_all, load, persist};

pub async fn create_student(store: &dyn DocumentStore, clock: Clock, request: CreateStudentRequest) -> AppResult<Student> {
    if let Some(plan_id) = request.plan_id {
        load::<Plan>(store, plan_id).await?;
    }
    let mut student = Student::create(request, clock.today())?;
    persist(store, &mut student).await?;
    info!("Registered student {} ({})", student.id, student.name);
    Ok(student)
}

pub async fn assign_plan(store: &dyn DocumentStore, student_id: Uuid, plan_id: Option<Uuid>) -> AppResult<Student> {
    if let Some(plan_id) = plan_id {
        load::<Plan>(store, plan_id).await?;
    }
    let mut student: Student = load(store, student_id).await?;
    student.plan_id = plan_id;
    persist(store, &mut student).await?;
    Ok(student)
}

/// Inactivates the student, releases their seats and drops them from every
/// waitlist.
pub async fn inactivate_student(
    store: &dyn DocumentStore,
    clock: Clock,
    student_id: Uuid,
    reason: String,
) -> AppResult<Student> {
    let mut student: Student = load(store, student_id).await?;
    student.inactivate(reason.clone(), clock.now)?;

    for mut class in classes_of_student(store, student_id).await? {
        class.unenroll(student_id)?;
        persist(store, &mut class).await?;
        let started_on = student
            .class_history
            .last()
            .map(|h| h.ended_on)
            .unwrap_or(student.enrolled_on);
        student.record_class_change(class.id, started_on, clock.today(), Some(reason.clone()));
    }
    for mut class in waitlists_of_student(store, student_id).await? {
        class.remove_from_waitlist(student_id)?;
        persist(store, &mut class).await?;
    }

    persist(store, &mut student).await?;
    info!("Inactivated student {}", student_id);
    Ok(student)
}

pub async fn reactivate_student(store: &dyn DocumentStore, student_id: Uuid) -> AppResult<Student> {
    let mut student: Student = load(store, student_id).await?;
    student.reactivate()?;
    persist(store, &mut student).await?;
    info!("Reactivated student {}", student_id);
    Ok(student)
}

pub async fn add_document(store: &dyn DocumentStore, student_id: Uuid, document: StudentDocument) -> AppResult<Student> {
    let mut student: Student = load(store, student_id).await?;
    student.add_document(document);
    persist(store, &mut student).await?;
    Ok(student)
}

pub async fn remove_document(store: &dyn DocumentStore, student_id: Uuid, document_id: Uuid) -> AppResult<Student> {
    let mut student: Student = load(store, student_id).await?;
    student.remove_document(document_id)?;
    persist(store, &mut student).await?;
    Ok(student)
}

pub async fn students_of_guardian(store: &dyn DocumentStore, guardian_user_id: Uuid) -> AppResult<Vec<Student>> {
    find_all(
        store,
        &Query::filter(json!({ "guardian_user_id": guardian_user_id })).sort_by("name", false),
    )
    .await
}

pub async fn statistics(store: &dyn DocumentStore) -> AppResult<StudentStatistics> {
    let students: Vec<Student> = find_all(store, &Query::all()).await?;
    Ok(student_statistics(&students))
}
