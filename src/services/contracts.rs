use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::config::AppConfig;
use crate::domain::contracts::{expiring_contracts, status_counts};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Contract, ContractStatus, ContractStatusCount, CreateContractRequest, GeoLocation, IntegrityReport, Plan, Student,
    Witness,
};
use crate::store::{DocumentStore, Query, find_all, load, persist};

/// Contract numbers are random; a collision surfaces from the store as a
/// duplicate and the number is drawn again.
const NUMBER_ATTEMPTS: usize = 5;

pub async fn create_contract(
    store: &dyn DocumentStore,
    clock: Clock,
    request: CreateContractRequest,
    created_by: Uuid,
) -> AppResult<Contract> {
    load::<Student>(store, request.student_id).await?;
    let plan: Plan = load(store, request.plan_id).await?;
    if !plan.active {
        return Err(AppError::Validation(format!("Plan {} is discontinued", plan.id)));
    }

    let mut last_error = None;
    for _ in 0..NUMBER_ATTEMPTS {
        let mut contract = Contract::create(request.clone(), created_by, clock.now, &mut rand::thread_rng())?;
        match persist(store, &mut contract).await {
            Ok(()) => {
                info!("Created contract {} ({}) for student {}", contract.number, contract.id, contract.student_id);
                return Ok(contract);
            }
            Err(e @ AppError::Duplicate { .. }) => {
                warn!("Contract number {} already taken, drawing another", contract.number);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error.unwrap_or(AppError::Internal))
}

/// Loads a contract, flipping it to expired when its term is over.
pub async fn get_contract(store: &dyn DocumentStore, clock: Clock, contract_id: Uuid) -> AppResult<Contract> {
    let mut contract: Contract = load(store, contract_id).await?;
    if contract.refresh_expiry(clock.today(), clock.now) {
        persist(store, &mut contract).await?;
        info!("Contract {} expired", contract.number);
    }
    Ok(contract)
}

/// Expires every active contract whose term is over. Returns how many.
pub async fn refresh_expired(store: &dyn DocumentStore, clock: Clock) -> AppResult<usize> {
    let active: Vec<Contract> = find_all(store, &Query::filter(json!({ "status": ContractStatus::Active }))).await?;
    let mut expired = 0;
    for mut contract in active {
        if contract.refresh_expiry(clock.today(), clock.now) {
            persist(store, &mut contract).await?;
            expired += 1;
        }
    }
    if expired > 0 {
        info!("Expired {} contracts", expired);
    }
    Ok(expired)
}

pub async fn sign_as_guardian(
    store: &dyn DocumentStore,
    clock: Clock,
    contract_id: Uuid,
    signature: String,
    ip: Option<String>,
    location: Option<GeoLocation>,
) -> AppResult<Contract> {
    let mut contract = get_contract(store, clock, contract_id).await?;
    contract.sign_as_guardian(signature, ip, location, clock.now)?;
    persist(store, &mut contract).await?;
    info!("Guardian signed contract {}; status {:?}", contract.number, contract.status);
    Ok(contract)
}

pub async fn sign_as_school(
    store: &dyn DocumentStore,
    clock: Clock,
    contract_id: Uuid,
    signer_id: Uuid,
    signer_role: String,
    signature: String,
) -> AppResult<Contract> {
    let mut contract = get_contract(store, clock, contract_id).await?;
    contract.sign_as_school(signer_id, signer_role, signature, clock.now)?;
    persist(store, &mut contract).await?;
    info!("School signed contract {}; status {:?}", contract.number, contract.status);
    Ok(contract)
}

pub async fn add_witness(store: &dyn DocumentStore, contract_id: Uuid, witness: Witness) -> AppResult<Contract> {
    let mut contract: Contract = load(store, contract_id).await?;
    contract.add_witness(witness)?;
    persist(store, &mut contract).await?;
    Ok(contract)
}

pub async fn activate_contract(
    store: &dyn DocumentStore,
    clock: Clock,
    contract_id: Uuid,
    actor: Uuid,
) -> AppResult<Contract> {
    let mut contract = get_contract(store, clock, contract_id).await?;
    if let Err(e) = contract.activate(actor, clock.now) {
        warn!("Activation of contract {} rejected: {}", contract.number, e);
        return Err(e);
    }
    persist(store, &mut contract).await?;
    info!("Contract {} is active", contract.number);
    Ok(contract)
}

pub async fn cancel_contract(
    store: &dyn DocumentStore,
    clock: Clock,
    contract_id: Uuid,
    reason: String,
    actor: Uuid,
) -> AppResult<Contract> {
    let mut contract = get_contract(store, clock, contract_id).await?;
    contract.cancel(reason, actor, clock.now)?;
    persist(store, &mut contract).await?;
    info!("Contract {} cancelled", contract.number);
    Ok(contract)
}

pub async fn suspend_contract(
    store: &dyn DocumentStore,
    clock: Clock,
    contract_id: Uuid,
    reason: String,
    actor: Uuid,
) -> AppResult<Contract> {
    let mut contract = get_contract(store, clock, contract_id).await?;
    contract.suspend(reason, actor, clock.now)?;
    persist(store, &mut contract).await?;
    info!("Contract {} suspended", contract.number);
    Ok(contract)
}

pub async fn resume_contract(
    store: &dyn DocumentStore,
    clock: Clock,
    contract_id: Uuid,
    actor: Uuid,
) -> AppResult<Contract> {
    let mut contract = get_contract(store, clock, contract_id).await?;
    contract.resume(actor, clock.now)?;
    persist(store, &mut contract).await?;
    Ok(contract)
}

pub async fn verify_integrity(store: &dyn DocumentStore, clock: Clock, contract_id: Uuid) -> AppResult<IntegrityReport> {
    let contract: Contract = load(store, contract_id).await?;
    let report = contract.verify_integrity(clock.now)?;
    if !report.intact {
        warn!(
            "Contract {} failed the integrity check: stored {} current {}",
            contract.number, report.stored_hash, report.current_hash
        );
    }
    Ok(report)
}

pub async fn contracts_of_student(store: &dyn DocumentStore, student_id: Uuid) -> AppResult<Vec<Contract>> {
    find_all(
        store,
        &Query::filter(json!({ "student_id": student_id })).sort_by("created_at", true),
    )
    .await
}

/// Active contracts ending within the configured warning window.
pub async fn expiring_soon(store: &dyn DocumentStore, clock: Clock, config: &AppConfig) -> AppResult<Vec<Contract>> {
    let active: Vec<Contract> = find_all(store, &Query::filter(json!({ "status": ContractStatus::Active }))).await?;
    Ok(expiring_contracts(&active, clock.today(), config.contract_expiry_warning_days)
        .into_iter()
        .cloned()
        .collect())
}

pub async fn contract_statistics(store: &dyn DocumentStore) -> AppResult<Vec<ContractStatusCount>> {
    let contracts: Vec<Contract> = find_all(store, &Query::all()).await?;
    Ok(status_counts(&contracts))
}
