//! Payment totals, status transitions, interest accrual and billing reports.

mod common;

use uuid::Uuid;

use aquavida::config::AppConfig;
use aquavida::models::*;
use aquavida::services::{payments, students};
use aquavida::store::{MemoryStore, load};
use aquavida::AppError;

use common::*;

fn pix() -> PaymentMethod {
    PaymentMethod::Pix {
        key: Some("financeiro@aquavida.com.br".to_string()),
        qr_code: None,
    }
}

fn payment_request(student_id: Uuid, plan_id: Uuid, amount: f64, due_date: chrono::NaiveDate) -> CreatePaymentRequest {
    CreatePaymentRequest {
        student_id,
        plan_id,
        guardian_id: None,
        description: "Monthly fee 02/2025".to_string(),
        original_amount: amount,
        due_date,
        period: BillingPeriod { month: 2, year: 2025 },
        method: PaymentMethod::BankSlip {
            barcode: None,
            digitable_line: None,
            our_number: None,
        },
    }
}

async fn seeded_payment(store: &MemoryStore, amount: f64, due_date: chrono::NaiveDate) -> Payment {
    let plan = seed_plan(store, 180.0).await;
    let student = seed_student(store, 1).await;
    payments::create_payment(store, clock(), payment_request(student.id, plan.id, amount, due_date), Uuid::nil())
        .await
        .unwrap()
}

fn new_payment(amount: f64) -> Payment {
    Payment::create(
        payment_request(Uuid::new_v4(), Uuid::new_v4(), amount, date(2025, 3, 10)),
        Uuid::nil(),
        clock().now,
    )
    .unwrap()
}

/// Test 1: The total is recomputed from its parts, never accumulated
#[test]
fn test_total_is_idempotent() {
    let mut payment = new_payment(100.0);
    let now = clock().now;

    payment.apply_discount(AdjustmentInput::Percent(10.0), None, Uuid::nil(), now).unwrap();
    assert_eq!(payment.total, 90.0);
    payment.apply_discount(AdjustmentInput::Percent(10.0), None, Uuid::nil(), now).unwrap();
    assert_eq!(payment.total, 90.0);

    payment.apply_late_fee(AdjustmentInput::Amount(5.0), None, Uuid::nil(), now).unwrap();
    assert_eq!(payment.total, 95.0);
    payment.recompute();
    payment.recompute();
    assert_eq!(payment.total, 95.0);
}

/// Test 2: A flat amount wins over a percentage
#[test]
fn test_flat_amount_wins() {
    let mut payment = new_payment(200.0);
    payment.discount = Adjustment {
        amount: 15.0,
        percent: 50.0,
        reason: None,
    };
    assert_eq!(payment.compute_total(), 185.0);
}

/// Test 3: A discount larger than the amount is refused
#[test]
fn test_discount_cannot_exceed_amount() {
    let mut payment = new_payment(50.0);
    let err = payment
        .apply_discount(AdjustmentInput::Amount(60.0), None, Uuid::nil(), clock().now)
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(payment.total, 50.0);
}

/// Test 4: A paid charge is locked against adjustments and cancellation
#[test]
fn test_paid_is_locked() {
    let mut payment = new_payment(100.0);
    let now = clock().now;
    payment.confirm(pix(), Uuid::nil(), now).unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(payment.paid_at.is_some());

    assert!(matches!(
        payment.apply_discount(AdjustmentInput::Percent(5.0), None, Uuid::nil(), now),
        Err(AppError::InvalidTransition { .. })
    ));
    assert!(matches!(
        payment.cancel("Mistake", Uuid::nil(), now),
        Err(AppError::InvalidTransition { .. })
    ));
    assert!(payment.confirm(pix(), Uuid::nil(), now).is_err());

    payment.refund("Family moved", Uuid::nil(), now).unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert!(payment.cancel("Again", Uuid::nil(), now).is_err());
}

/// Test 5: Cancelling twice reports the second attempt
#[test]
fn test_cancel_twice() {
    let mut payment = new_payment(100.0);
    payment.cancel("Duplicate charge", Uuid::nil(), clock().now).unwrap();
    assert!(matches!(
        payment.cancel("Duplicate charge", Uuid::nil(), clock().now),
        Err(AppError::AlreadyCancelled { .. })
    ));
    assert_eq!(payment.history.len(), 2);
}

/// Test 6: Late charges turn overdue and accrue daily interest
#[tokio::test]
async fn test_overdue_refresh_and_interest() {
    init_logging();
    let store = MemoryStore::new();
    let config = AppConfig::default();
    // Due 2025-02-10, the clock reads 2025-03-03: 21 days late.
    let payment = seeded_payment(&store, 100.0, date(2025, 2, 10)).await;
    assert_eq!(payment.status, PaymentStatus::Pending);

    let refreshed = payments::get_payment(&store, clock(), &config, payment.id).await.unwrap();
    assert_eq!(refreshed.status, PaymentStatus::Overdue);
    assert_eq!(refreshed.interest.days_late, 21);
    assert_eq!(refreshed.total, 100.7);

    // Refreshing again on the same day changes nothing.
    assert_eq!(payments::refresh_overdue(&store, clock(), &config).await.unwrap(), 0);

    let paid = payments::confirm_payment(&store, clock(), &config, payment.id, pix(), Uuid::nil())
        .await
        .unwrap();
    assert_eq!(paid.total, 100.7);

    let later = clock_on(2025, 4, 1);
    let frozen = payments::get_payment(&store, later, &config, payment.id).await.unwrap();
    assert_eq!(frozen.total, 100.7);
    assert_eq!(frozen.status, PaymentStatus::Paid);
}

/// Test 7: The refresh job flips every late pending charge
#[tokio::test]
async fn test_refresh_overdue_job() {
    init_logging();
    let store = MemoryStore::new();
    let config = AppConfig::default();
    let late = seeded_payment(&store, 100.0, date(2025, 2, 20)).await;
    let on_time = payments::create_payment(
        &store,
        clock(),
        payment_request(late.student_id, late.plan_id, 100.0, date(2025, 3, 10)),
        Uuid::nil(),
    )
    .await
    .unwrap();

    assert_eq!(payments::refresh_overdue(&store, clock(), &config).await.unwrap(), 1);
    let late: Payment = load(&store, late.id).await.unwrap();
    let on_time: Payment = load(&store, on_time.id).await.unwrap();
    assert_eq!(late.status, PaymentStatus::Overdue);
    assert_eq!(on_time.status, PaymentStatus::Pending);
}

/// Test 8: Revenue groups paid charges by method; delinquency lists debtors
#[tokio::test]
async fn test_revenue_and_delinquency() {
    init_logging();
    let store = MemoryStore::new();
    let config = AppConfig::default();
    let first = seeded_payment(&store, 150.0, date(2025, 2, 10)).await;
    let second = payments::create_payment(
        &store,
        clock(),
        payment_request(first.student_id, first.plan_id, 120.0, date(2025, 2, 15)),
        Uuid::nil(),
    )
    .await
    .unwrap();
    let third = payments::create_payment(
        &store,
        clock(),
        payment_request(first.student_id, first.plan_id, 80.0, date(2025, 2, 28)),
        Uuid::nil(),
    )
    .await
    .unwrap();

    // Paid before the due date, so no interest.
    let early = clock_on(2025, 2, 5);
    payments::confirm_payment(&store, early, &config, first.id, pix(), Uuid::nil()).await.unwrap();
    payments::confirm_payment(&store, early, &config, second.id, PaymentMethod::Cash, Uuid::nil())
        .await
        .unwrap();

    let revenue = payments::revenue_report(&store, BillingPeriod { month: 2, year: 2025 }).await.unwrap();
    assert_eq!(revenue.paid_count, 2);
    assert_eq!(revenue.total, 270.0);
    assert_eq!(revenue.by_method.len(), 2);

    let debtors = payments::delinquency_report(&store, clock()).await.unwrap();
    assert_eq!(debtors.len(), 1);
    assert_eq!(debtors[0].student_id, third.student_id);
    assert_eq!(debtors[0].overdue_count, 1);
    assert_eq!(debtors[0].oldest_due_date, date(2025, 2, 28));
}

/// Test 9: Monthly charges are created once per student and period
#[tokio::test]
async fn test_generate_monthly_charges() {
    init_logging();
    let store = MemoryStore::new();
    let config = AppConfig::default();
    let mut request = plan_request(180.0);
    request.billing_day = Some(31);
    let plan = aquavida::services::plans::create_plan(&store, request).await.unwrap();
    let free = seed_plan(&store, 0.0).await;

    let charged = seed_student(&store, 1).await;
    students::assign_plan(&store, charged.id, Some(plan.id)).await.unwrap();
    let on_free_plan = seed_student(&store, 2).await;
    students::assign_plan(&store, on_free_plan.id, Some(free.id)).await.unwrap();
    seed_student(&store, 3).await;

    let period = BillingPeriod::new(4, 2025).unwrap();
    let summary = payments::generate_monthly_charges(&store, clock(), &config, period, Uuid::nil())
        .await
        .unwrap();
    assert_eq!(summary.created.len(), 1);
    assert_eq!(summary.skipped_without_plan, 2);

    let charge: Payment = load(&store, summary.created[0]).await.unwrap();
    assert_eq!(charge.student_id, charged.id);
    assert_eq!(charge.total, 180.0);
    // April has 30 days.
    assert_eq!(charge.due_date, date(2025, 4, 30));
    assert_eq!(charge.description, "Monthly fee 04/2025 - Kids 2x");

    let again = payments::generate_monthly_charges(&store, clock(), &config, period, Uuid::nil())
        .await
        .unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.skipped_existing, 1);
}

/// Test 10: Billing periods are validated
#[test]
fn test_billing_period_validation() {
    assert!(BillingPeriod::new(13, 2025).is_err());
    assert!(BillingPeriod::new(0, 2025).is_err());
    assert!(BillingPeriod::new(12, 2019).is_err());
    assert!(BillingPeriod::new(1, 2026).is_ok());
}

/// Test 11: Period arguments default to today but malformed ones are refused
#[test]
fn test_billing_period_from_args() {
    let today = date(2025, 3, 3);
    assert_eq!(BillingPeriod::from_args(None, None, today).unwrap(), BillingPeriod { month: 3, year: 2025 });
    assert_eq!(
        BillingPeriod::from_args(Some("11"), Some("2024"), today).unwrap(),
        BillingPeriod { month: 11, year: 2024 }
    );
    assert!(matches!(
        BillingPeriod::from_args(Some("Nov"), None, today),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        BillingPeriod::from_args(Some("4"), Some("25x"), today),
        Err(AppError::Validation(_))
    ));
    assert!(BillingPeriod::from_args(Some("13"), None, today).is_err());
}
