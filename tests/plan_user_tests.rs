//! Plan pricing rules, role permissions and the login bookkeeping kept on
//! user accounts.

mod common;

use chrono::Duration;

use aquavida::config::AppConfig;
use aquavida::domain::users::{Action, token_digest};
use aquavida::models::*;
use aquavida::services::{plans, users};
use aquavida::store::MemoryStore;
use aquavida::AppError;

use common::*;

fn promo_plan() -> Plan {
    let mut request = plan_request(200.0);
    request.promotional_price = Some(150.0);
    request.promotion = Promotion {
        active: true,
        starts_on: Some(date(2025, 3, 1)),
        ends_on: Some(date(2025, 3, 31)),
        description: Some("Autumn".to_string()),
    };
    Plan::create(request).unwrap()
}

fn user_request(email: &str, role: Role) -> CreateUserRequest {
    CreateUserRequest {
        name: "Ana Costa".to_string(),
        email: email.to_string(),
        role,
        password_hash: "$argon2id$v=19$stub".to_string(),
    }
}

/// Test 1: The promotional price applies only inside the promotion window
#[test]
fn test_effective_price() {
    let plan = promo_plan();
    assert_eq!(plan.effective_price(date(2025, 3, 15)), 150.0);
    assert_eq!(plan.effective_price(date(2025, 4, 1)), 200.0);
    assert_eq!(plan.promotion_status(date(2025, 2, 1)), PromotionStatus::Scheduled);
    assert_eq!(plan.promotion_status(date(2025, 3, 15)), PromotionStatus::Active);
    assert_eq!(plan.promotion_status(date(2025, 4, 1)), PromotionStatus::Expired);
    assert_eq!(plan.discount_percent(), 25.0);
}

/// Test 2: Per-session price and monthly hours
#[test]
fn test_session_pricing() {
    let plan = promo_plan();
    // 150 over 2 sessions a week for four weeks.
    assert_eq!(plan.price_per_session(date(2025, 3, 15)), 18.75);
    assert_eq!(plan.hours_per_month(), 6.0);
    assert_eq!(plan.price_with_discount(PlanDiscount::Percent(10.0), date(2025, 4, 1)), 180.0);
    assert_eq!(plan.price_with_discount(PlanDiscount::Fixed(500.0), date(2025, 4, 1)), 0.0);
}

/// Test 3: Plan validation bounds
#[test]
fn test_plan_validation() {
    let mut request = plan_request(100.0);
    request.session_minutes = 20;
    assert!(matches!(Plan::create(request), Err(AppError::Validation(_))));

    let mut request = plan_request(100.0);
    request.sessions_per_week = 8;
    assert!(Plan::create(request).is_err());

    let mut request = plan_request(100.0);
    request.promotional_price = Some(120.0);
    assert!(Plan::create(request).is_err());
}

/// Test 4: Promotional plans are listed only while running
#[tokio::test]
async fn test_promotional_plans() {
    init_logging();
    let store = MemoryStore::new();
    let mut request = plan_request(200.0);
    request.promotional_price = Some(150.0);
    let plan = plans::create_plan(&store, request).await.unwrap();
    seed_plan(&store, 90.0).await;

    assert!(plans::promotional_plans(&store, clock()).await.unwrap().is_empty());

    let promotion = Promotion {
        active: false,
        starts_on: Some(date(2025, 3, 1)),
        ends_on: Some(date(2025, 3, 31)),
        description: None,
    };
    plans::activate_promotion(&store, plan.id, promotion).await.unwrap();
    let running = plans::promotional_plans(&store, clock()).await.unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, plan.id);

    let listed = plans::active_plans(&store).await.unwrap();
    assert_eq!(listed.iter().map(|p| p.price).collect::<Vec<_>>(), vec![90.0, 200.0]);
}

/// Test 5: Role permissions
#[test]
fn test_role_permissions() {
    assert!(Role::Admin.permits(Action::ManagePayments));
    assert!(Role::Teacher.permits(Action::RecordAttendance));
    assert!(!Role::Teacher.permits(Action::ManagePayments));
    assert!(Role::Guardian.permits(Action::SignContracts));
    assert!(!Role::Guardian.permits(Action::WriteEvaluations));

    let mut user = User::create(user_request("ana@example.com", Role::Teacher), clock().now).unwrap();
    assert!(user.can(Action::ScheduleLessons));
    user.deactivate();
    assert!(!user.can(Action::ScheduleLessons));
}

/// Test 6: Emails are normalised and unique
#[tokio::test]
async fn test_unique_email() {
    init_logging();
    let store = MemoryStore::new();
    let user = users::create_user(&store, clock(), user_request(" Ana@Example.com ", Role::Admin))
        .await
        .unwrap();
    assert_eq!(user.email, "ana@example.com");

    let err = users::create_user(&store, clock(), user_request("ana@example.com", Role::Guardian))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { .. }));

    let found = users::find_by_email(&store, "ANA@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

/// Test 7: Refresh tokens are stored hashed and capped, oldest evicted
#[test]
fn test_refresh_token_cap() {
    let mut user = User::create(user_request("ana@example.com", Role::Guardian), clock().now).unwrap();
    let start = clock().now;
    for i in 0..7 {
        user.add_refresh_token(&format!("token-{}", i), start + Duration::minutes(i), 5);
    }

    assert_eq!(user.refresh_tokens.len(), 5);
    assert!(user.refresh_tokens.iter().all(|r| r.token_hash.len() == 64));
    assert_eq!(user.refresh_tokens[0].token_hash, token_digest("token-2"));
    assert!(!user.has_refresh_token("token-0", start + Duration::hours(1), 7));
    assert!(user.has_refresh_token("token-6", start + Duration::hours(1), 7));
    assert!(!user.has_refresh_token("token-6", start + Duration::days(8), 7));
}

/// Test 8: Repeated failures lock the account until the lockout ends
#[tokio::test]
async fn test_lockout() {
    init_logging();
    let store = MemoryStore::new();
    let config = AppConfig {
        max_failed_logins: 3,
        lockout_minutes: 30,
        ..AppConfig::default()
    };
    let user = users::create_user(&store, clock(), user_request("ana@example.com", Role::Guardian))
        .await
        .unwrap();

    assert!(!users::record_failed_login(&store, clock(), &config, user.id).await.unwrap());
    assert!(!users::record_failed_login(&store, clock(), &config, user.id).await.unwrap());
    assert!(users::record_failed_login(&store, clock(), &config, user.id).await.unwrap());

    let err = users::record_login(&store, clock(), &config, user.id, "refresh-1").await.unwrap_err();
    assert!(matches!(err, AppError::LockedForEditing { .. }));

    let later = aquavida::Clock::at(clock().now + Duration::minutes(31));
    let logged_in = users::record_login(&store, later, &config, user.id, "refresh-1").await.unwrap();
    assert_eq!(logged_in.failed_logins, 0);
    assert_eq!(logged_in.refresh_tokens.len(), 1);
}

/// Test 9: Rotation swaps the token; logout revokes it
#[tokio::test]
async fn test_rotation_and_logout() {
    init_logging();
    let store = MemoryStore::new();
    let config = AppConfig::default();
    let user = users::create_user(&store, clock(), user_request("ana@example.com", Role::Guardian))
        .await
        .unwrap();
    users::record_login(&store, clock(), &config, user.id, "first").await.unwrap();

    let rotated = users::rotate_refresh_token(&store, clock(), &config, user.id, "first", "second")
        .await
        .unwrap();
    assert!(rotated.has_refresh_token("second", clock().now, config.refresh_token_ttl_days));
    assert!(!rotated.has_refresh_token("first", clock().now, config.refresh_token_ttl_days));
    assert!(users::rotate_refresh_token(&store, clock(), &config, user.id, "first", "third")
        .await
        .is_err());

    let out = users::logout(&store, user.id, "second").await.unwrap();
    assert!(out.refresh_tokens.is_empty());
}
