use log::info;
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::domain::evaluations::{period_statistics, student_evolution};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Class, CreateEvaluationRequest, Evaluation, EvaluationPeriod, EvaluationUpdate, PeriodStatistics, Student,
};
use crate::store::{DocumentStore, Query, find_all, load, persist};

/// Creates a draft evaluation. The student must be on the class roster and
/// the evaluating teacher defaults to the class's primary teacher.
pub async fn create_evaluation(
    store: &dyn DocumentStore,
    request: CreateEvaluationRequest,
    teacher_id: Option<Uuid>,
    created_by: Uuid,
) -> AppResult<Evaluation> {
    let class: Class = load(store, request.class_id).await?;
    load::<Student>(store, request.student_id).await?;
    if !class.is_enrolled(request.student_id) {
        return Err(AppError::NotEnrolled {
            class_id: class.id,
            student_id: request.student_id,
        });
    }

    let mut evaluation = Evaluation::create(request, teacher_id.unwrap_or(class.teacher_id), created_by)?;
    persist(store, &mut evaluation).await?;
    info!("Created evaluation {} for student {}", evaluation.id, evaluation.student_id);
    Ok(evaluation)
}

pub async fn update_evaluation(
    store: &dyn DocumentStore,
    evaluation_id: Uuid,
    update: EvaluationUpdate,
) -> AppResult<Evaluation> {
    let mut evaluation: Evaluation = load(store, evaluation_id).await?;
    evaluation.apply_update(update)?;
    persist(store, &mut evaluation).await?;
    Ok(evaluation)
}

pub async fn finalize_evaluation(store: &dyn DocumentStore, evaluation_id: Uuid) -> AppResult<Evaluation> {
    let mut evaluation: Evaluation = load(store, evaluation_id).await?;
    evaluation.finalize()?;
    persist(store, &mut evaluation).await?;
    info!("Finalized evaluation {} with grade {}", evaluation_id, evaluation.grade());
    Ok(evaluation)
}

pub async fn send_to_guardian(store: &dyn DocumentStore, clock: Clock, evaluation_id: Uuid) -> AppResult<Evaluation> {
    let mut evaluation: Evaluation = load(store, evaluation_id).await?;
    evaluation.send_to_guardian(clock.now)?;
    persist(store, &mut evaluation).await?;
    info!("Sent evaluation {} to the guardian", evaluation_id);
    Ok(evaluation)
}

pub async fn mark_viewed(store: &dyn DocumentStore, clock: Clock, evaluation_id: Uuid) -> AppResult<Evaluation> {
    let mut evaluation: Evaluation = load(store, evaluation_id).await?;
    evaluation.mark_viewed(clock.now)?;
    persist(store, &mut evaluation).await?;
    Ok(evaluation)
}

pub async fn class_period_statistics(
    store: &dyn DocumentStore,
    class_id: Uuid,
    period: EvaluationPeriod,
) -> AppResult<PeriodStatistics> {
    let evaluations: Vec<Evaluation> =
        find_all(store, &Query::filter(json!({ "class_id": class_id, "period": period }))).await?;
    Ok(period_statistics(&evaluations, class_id, period))
}

pub async fn evolution(store: &dyn DocumentStore, student_id: Uuid, limit: usize) -> AppResult<Vec<Evaluation>> {
    let evaluations: Vec<Evaluation> = find_all(store, &Query::filter(json!({ "student_id": student_id }))).await?;
    Ok(student_evolution(&evaluations, student_id, limit)
        .into_iter()
        .cloned()
        .collect())
}
