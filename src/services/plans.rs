use log::info;
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::domain::plans::plans_on_promotion;
use crate::errors::AppResult;
use crate::models::{CreatePlanRequest, Plan, Promotion};
use crate::store::{DocumentStore, Query, find_all, load, persist};

pub async fn create_plan(store: &dyn DocumentStore, request: CreatePlanRequest) -> AppResult<Plan> {
    let mut plan = Plan::create(request)?;
    persist(store, &mut plan).await?;
    info!("Created plan {} ({}) at {:.2}", plan.id, plan.name, plan.price);
    Ok(plan)
}

pub async fn activate_promotion(store: &dyn DocumentStore, plan_id: Uuid, promotion: Promotion) -> AppResult<Plan> {
    let mut plan: Plan = load(store, plan_id).await?;
    plan.activate_promotion(promotion)?;
    persist(store, &mut plan).await?;
    info!("Promotion activated on plan {}", plan_id);
    Ok(plan)
}

pub async fn deactivate_promotion(store: &dyn DocumentStore, plan_id: Uuid) -> AppResult<Plan> {
    let mut plan: Plan = load(store, plan_id).await?;
    plan.deactivate_promotion();
    persist(store, &mut plan).await?;
    Ok(plan)
}

pub async fn discontinue_plan(store: &dyn DocumentStore, clock: Clock, plan_id: Uuid, reason: String) -> AppResult<Plan> {
    let mut plan: Plan = load(store, plan_id).await?;
    plan.discontinue(reason, clock.today())?;
    persist(store, &mut plan).await?;
    info!("Discontinued plan {}", plan_id);
    Ok(plan)
}

pub async fn reactivate_plan(store: &dyn DocumentStore, plan_id: Uuid) -> AppResult<Plan> {
    let mut plan: Plan = load(store, plan_id).await?;
    plan.reactivate()?;
    persist(store, &mut plan).await?;
    Ok(plan)
}

pub async fn active_plans(store: &dyn DocumentStore) -> AppResult<Vec<Plan>> {
    find_all(store, &Query::filter(json!({ "active": true })).sort_by("price", false)).await
}

pub async fn promotional_plans(store: &dyn DocumentStore, clock: Clock) -> AppResult<Vec<Plan>> {
    let plans = active_plans(store).await?;
    Ok(plans_on_promotion(&plans, clock.today()).into_iter().cloned().collect())
}
