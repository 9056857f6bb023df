use chrono::NaiveDate;
use futures::try_join;
use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::config::AppConfig;
use crate::domain::payments::{delinquency, monthly_revenue};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AdjustmentInput, BillingPeriod, BulkChargeSummary, CreatePaymentRequest, DelinquencyEntry, MonthlyRevenue,
    Payment, PaymentMethod, PaymentStatus, Plan, Student,
};
use crate::store::{DocumentStore, Query, find_all, load, persist};
use crate::utils::date_in_month;

/// Pending and overdue charges, fetched side by side.
async fn open_payments(store: &dyn DocumentStore) -> AppResult<Vec<Payment>> {
    let pending = Query::filter(json!({ "status": PaymentStatus::Pending }));
    let overdue = Query::filter(json!({ "status": PaymentStatus::Overdue }));
    let (mut open, overdue) = try_join!(
        find_all::<Payment>(store, &pending),
        find_all::<Payment>(store, &overdue)
    )?;
    open.extend(overdue);
    Ok(open)
}

pub async fn create_payment(
    store: &dyn DocumentStore,
    clock: Clock,
    request: CreatePaymentRequest,
    created_by: Uuid,
) -> AppResult<Payment> {
    load::<Student>(store, request.student_id).await?;
    load::<Plan>(store, request.plan_id).await?;
    let mut payment = Payment::create(request, created_by, clock.now)?;
    persist(store, &mut payment).await?;
    info!(
        "Created payment {} of {:.2} for student {}",
        payment.id, payment.total, payment.student_id
    );
    Ok(payment)
}

/// Loads a payment with its overdue status and interest brought up to date.
pub async fn get_payment(
    store: &dyn DocumentStore,
    clock: Clock,
    config: &AppConfig,
    payment_id: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    if payment.refresh(clock.today(), config.monthly_interest_percent, clock.now) {
        persist(store, &mut payment).await?;
    }
    Ok(payment)
}

/// Refreshes every open charge. Returns how many changed.
pub async fn refresh_overdue(store: &dyn DocumentStore, clock: Clock, config: &AppConfig) -> AppResult<usize> {
    let mut changed = 0;
    for mut payment in open_payments(store).await? {
        if payment.refresh(clock.today(), config.monthly_interest_percent, clock.now) {
            persist(store, &mut payment).await?;
            changed += 1;
        }
    }
    if changed > 0 {
        info!("Refreshed {} open payments", changed);
    }
    Ok(changed)
}

pub async fn confirm_payment(
    store: &dyn DocumentStore,
    clock: Clock,
    config: &AppConfig,
    payment_id: Uuid,
    method: PaymentMethod,
    actor: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    payment.refresh(clock.today(), config.monthly_interest_percent, clock.now);
    payment.confirm(method, actor, clock.now)?;
    persist(store, &mut payment).await?;
    info!("Payment {} confirmed: {:.2}", payment_id, payment.total);
    Ok(payment)
}

pub async fn cancel_payment(
    store: &dyn DocumentStore,
    clock: Clock,
    payment_id: Uuid,
    reason: String,
    actor: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    if let Err(e) = payment.cancel(reason, actor, clock.now) {
        warn!("Cancellation of payment {} rejected: {}", payment_id, e);
        return Err(e);
    }
    persist(store, &mut payment).await?;
    info!("Payment {} cancelled", payment_id);
    Ok(payment)
}

pub async fn refund_payment(
    store: &dyn DocumentStore,
    clock: Clock,
    payment_id: Uuid,
    reason: String,
    actor: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    payment.refund(reason, actor, clock.now)?;
    persist(store, &mut payment).await?;
    info!("Payment {} refunded", payment_id);
    Ok(payment)
}

pub async fn flag_for_review(
    store: &dyn DocumentStore,
    clock: Clock,
    payment_id: Uuid,
    note: String,
    actor: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    payment.flag_for_review(note, actor, clock.now)?;
    persist(store, &mut payment).await?;
    Ok(payment)
}

pub async fn apply_discount(
    store: &dyn DocumentStore,
    clock: Clock,
    payment_id: Uuid,
    input: AdjustmentInput,
    reason: Option<String>,
    actor: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    payment.apply_discount(input, reason, actor, clock.now)?;
    persist(store, &mut payment).await?;
    info!("Discount applied to payment {}, total now {:.2}", payment_id, payment.total);
    Ok(payment)
}

pub async fn apply_late_fee(
    store: &dyn DocumentStore,
    clock: Clock,
    payment_id: Uuid,
    input: AdjustmentInput,
    reason: Option<String>,
    actor: Uuid,
) -> AppResult<Payment> {
    let mut payment: Payment = load(store, payment_id).await?;
    payment.apply_late_fee(input, reason, actor, clock.now)?;
    persist(store, &mut payment).await?;
    Ok(payment)
}

/// Creates one pending charge per active student with a plan for `period`.
/// Students already charged for the period (any non-cancelled charge) are
/// skipped, so running it twice creates nothing new.
pub async fn generate_monthly_charges(
    store: &dyn DocumentStore,
    clock: Clock,
    config: &AppConfig,
    period: BillingPeriod,
    created_by: Uuid,
) -> AppResult<BulkChargeSummary> {
    period.validate()?;
    let students: Vec<Student> = find_all(store, &Query::filter(json!({ "active": true }))).await?;
    let mut summary = BulkChargeSummary {
        period,
        created: Vec::new(),
        skipped_existing: 0,
        skipped_without_plan: 0,
    };

    for student in students {
        let Some(plan_id) = student.plan_id else {
            summary.skipped_without_plan += 1;
            continue;
        };
        let plan: Plan = match load(store, plan_id).await {
            Ok(plan) => plan,
            Err(AppError::NotFound { .. }) => {
                warn!("Student {} references missing plan {}", student.id, plan_id);
                summary.skipped_without_plan += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let existing: Vec<Payment> = find_all(
            store,
            &Query::filter(json!({ "student_id": student.id, "period": period })),
        )
        .await?;
        if existing.iter().any(|p| p.status != PaymentStatus::Cancelled) {
            debug!("Student {} already has a charge for {:02}/{}", student.id, period.month, period.year);
            summary.skipped_existing += 1;
            continue;
        }

        let amount = plan.effective_price(clock.today());
        if amount <= 0.0 {
            debug!("Plan {} is free, no charge for student {}", plan.id, student.id);
            summary.skipped_without_plan += 1;
            continue;
        }

        let due_day = plan.billing_day.unwrap_or(config.default_due_day);
        let due_date: NaiveDate = date_in_month(period.year, period.month, due_day).ok_or_else(|| {
            AppError::Validation(format!("Invalid billing period {:02}/{}", period.month, period.year))
        })?;
        let request = CreatePaymentRequest {
            student_id: student.id,
            plan_id: plan.id,
            guardian_id: student.guardian_user_id,
            description: format!("Monthly fee {:02}/{} - {}", period.month, period.year, plan.name),
            original_amount: amount,
            due_date,
            period,
            method: PaymentMethod::BankSlip {
                barcode: None,
                digitable_line: None,
                our_number: None,
            },
        };
        let mut payment = Payment::create(request, created_by, clock.now)?;
        persist(store, &mut payment).await?;
        summary.created.push(payment.id);
    }

    info!(
        "Generated {} charges for {:02}/{} ({} already charged, {} without plan)",
        summary.created.len(),
        period.month,
        period.year,
        summary.skipped_existing,
        summary.skipped_without_plan
    );
    Ok(summary)
}

pub async fn payments_of_student(store: &dyn DocumentStore, student_id: Uuid) -> AppResult<Vec<Payment>> {
    find_all(
        store,
        &Query::filter(json!({ "student_id": student_id })).sort_by("due_date", true),
    )
    .await
}

pub async fn revenue_report(store: &dyn DocumentStore, period: BillingPeriod) -> AppResult<MonthlyRevenue> {
    let payments: Vec<Payment> = find_all(
        store,
        &Query::filter(json!({ "period": period, "status": PaymentStatus::Paid })),
    )
    .await?;
    Ok(monthly_revenue(&payments, period))
}

pub async fn delinquency_report(store: &dyn DocumentStore, clock: Clock) -> AppResult<Vec<DelinquencyEntry>> {
    let open = open_payments(store).await?;
    Ok(delinquency(&open, clock.today()))
}
