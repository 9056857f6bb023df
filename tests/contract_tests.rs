//! Contract signing, activation, integrity and expiry.

mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;
use uuid::Uuid;

use aquavida::config::AppConfig;
use aquavida::domain::contracts::{content_hash, generate_number};
use aquavida::models::*;
use aquavida::services::{contracts, plans};
use aquavida::store::{MemoryStore, load, persist};
use aquavida::AppError;

use common::*;

async fn seeded_contract(store: &MemoryStore) -> Contract {
    let plan = seed_plan(store, 180.0).await;
    let student = seed_student(store, 1).await;
    contracts::create_contract(store, clock(), contract_request(student.id, plan.id, date(2025, 3, 1)), Uuid::nil())
        .await
        .unwrap()
}

async fn fully_signed(store: &MemoryStore) -> Contract {
    let contract = seeded_contract(store).await;
    contracts::sign_as_guardian(store, clock(), contract.id, "Maria Souza".to_string(), Some("10.0.0.7".to_string()), None)
        .await
        .unwrap();
    contracts::sign_as_school(store, clock(), contract.id, Uuid::new_v4(), "Director".to_string(), "AquaVida".to_string())
        .await
        .unwrap()
}

/// Test 1: Numbers are CT, the year and six digits
#[test]
fn test_number_format() {
    let pattern = Regex::new(r"^CT2025\d{6}$").unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let number = generate_number(2025, &mut rng);
        assert!(pattern.is_match(&number), "unexpected number {}", number);
    }
}

/// Test 2: The content hash is stable and tracks the clauses
#[test]
fn test_hash_stability() {
    let student = Uuid::new_v4();
    let plan = Uuid::new_v4();
    let clauses = Clauses::standard(180.0, 10, ContractPaymentMethod::Pix);
    let terms = SpecificTerms::default();

    let first = content_hash(student, plan, &clauses, &terms).unwrap();
    let second = content_hash(student, plan, &clauses.clone(), &terms.clone()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);

    let mut changed = clauses.clone();
    changed.monthly_amount = 200.0;
    assert_ne!(first, content_hash(student, plan, &changed, &terms).unwrap());
}

/// Test 3: Creation computes the end date and starts as a draft
#[tokio::test]
async fn test_create_contract() {
    init_logging();
    let store = MemoryStore::new();
    let contract = seeded_contract(&store).await;

    assert_eq!(contract.status, ContractStatus::Draft);
    assert_eq!(contract.end_date, Some(date(2026, 3, 1)));
    assert!(contract.number.starts_with("CT2025"));
    assert_eq!(contract.history.len(), 1);
    assert_eq!(contract.signature_status(), SignatureStatus::Pending);
}

/// Test 4: A discontinued plan cannot be contracted
#[tokio::test]
async fn test_discontinued_plan() {
    init_logging();
    let store = MemoryStore::new();
    let plan = seed_plan(&store, 180.0).await;
    plans::discontinue_plan(&store, clock(), plan.id, "Replaced".to_string()).await.unwrap();
    let student = seed_student(&store, 1).await;

    let err = contracts::create_contract(&store, clock(), contract_request(student.id, plan.id, date(2025, 3, 1)), Uuid::nil())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

/// Test 5: Activation needs both signatures
#[tokio::test]
async fn test_activation_gate() {
    init_logging();
    let store = MemoryStore::new();
    let contract = seeded_contract(&store).await;

    let err = contracts::activate_contract(&store, clock(), contract.id, Uuid::nil()).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let half = contracts::sign_as_guardian(&store, clock(), contract.id, "Maria".to_string(), None, None)
        .await
        .unwrap();
    assert_eq!(half.status, ContractStatus::AwaitingSignature);
    assert_eq!(half.signature_status(), SignatureStatus::PartialGuardian);
    assert!(contracts::activate_contract(&store, clock(), contract.id, Uuid::nil()).await.is_err());

    let err = contracts::sign_as_guardian(&store, clock(), contract.id, "Maria".to_string(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadySigned { party: "guardian" }));

    let signed = contracts::sign_as_school(&store, clock(), contract.id, Uuid::new_v4(), "Director".to_string(), "AquaVida".to_string())
        .await
        .unwrap();
    assert_eq!(signed.status, ContractStatus::Signed);

    let active = contracts::activate_contract(&store, clock(), contract.id, Uuid::nil()).await.unwrap();
    assert_eq!(active.status, ContractStatus::Active);
}

/// Test 6: Suspend, resume and cancel
#[tokio::test]
async fn test_suspend_resume_cancel() {
    init_logging();
    let store = MemoryStore::new();
    let contract = fully_signed(&store).await;
    contracts::activate_contract(&store, clock(), contract.id, Uuid::nil()).await.unwrap();

    let suspended = contracts::suspend_contract(&store, clock(), contract.id, "Medical leave".to_string(), Uuid::nil())
        .await
        .unwrap();
    assert_eq!(suspended.status, ContractStatus::Suspended);
    let resumed = contracts::resume_contract(&store, clock(), contract.id, Uuid::nil()).await.unwrap();
    assert_eq!(resumed.status, ContractStatus::Active);

    contracts::cancel_contract(&store, clock(), contract.id, "Moving".to_string(), Uuid::nil())
        .await
        .unwrap();
    let err = contracts::cancel_contract(&store, clock(), contract.id, "Moving".to_string(), Uuid::nil())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCancelled { .. }));
}

/// Test 7: Tampering with stored clauses fails the integrity check
#[tokio::test]
async fn test_integrity_check() {
    init_logging();
    let store = MemoryStore::new();
    let contract = seeded_contract(&store).await;
    assert!(contracts::verify_integrity(&store, clock(), contract.id).await.unwrap().intact);

    let mut tampered: Contract = load(&store, contract.id).await.unwrap();
    tampered.clauses.monthly_amount = 1.0;
    persist(&store, &mut tampered).await.unwrap();

    let report = contracts::verify_integrity(&store, clock(), contract.id).await.unwrap();
    assert!(!report.intact);
    assert_ne!(report.stored_hash, report.current_hash);
}

/// Test 8: Witnesses need a valid, unique CPF
#[tokio::test]
async fn test_witnesses() {
    init_logging();
    let store = MemoryStore::new();
    let contract = seeded_contract(&store).await;
    let witness = Witness {
        name: "João Lima".to_string(),
        cpf: "222.333.444-55".to_string(),
        signature: None,
        signed_at: None,
    };

    contracts::add_witness(&store, contract.id, witness.clone()).await.unwrap();
    assert!(matches!(
        contracts::add_witness(&store, contract.id, witness.clone()).await,
        Err(AppError::Duplicate { .. })
    ));
    let bad = Witness {
        cpf: "22233344455".to_string(),
        ..witness
    };
    assert!(matches!(
        contracts::add_witness(&store, contract.id, bad).await,
        Err(AppError::Validation(_))
    ));
}

/// Test 9: Active contracts past their end date expire lazily
#[tokio::test]
async fn test_expiry() {
    init_logging();
    let store = MemoryStore::new();
    let contract = fully_signed(&store).await;
    contracts::activate_contract(&store, clock(), contract.id, Uuid::nil()).await.unwrap();

    let config = AppConfig::default();
    let near_end = clock_on(2026, 2, 20);
    let expiring = contracts::expiring_soon(&store, near_end, &config).await.unwrap();
    assert_eq!(expiring.len(), 1);

    let after_end = clock_on(2026, 3, 2);
    let loaded = contracts::get_contract(&store, after_end, contract.id).await.unwrap();
    assert_eq!(loaded.status, ContractStatus::Expired);
    assert_eq!(contracts::refresh_expired(&store, after_end).await.unwrap(), 0);

    let counts = contracts::contract_statistics(&store).await.unwrap();
    assert_eq!(counts, vec![ContractStatusCount { status: ContractStatus::Expired, count: 1 }]);
}

/// Test 10: Indefinite terms have no end date
#[test]
fn test_indefinite_term() {
    let term = ContractTerm {
        kind: TermKind::Indefinite,
        months: None,
    };
    assert_eq!(term.end_date(date(2025, 1, 31)), None);

    let quarterly = ContractTerm {
        kind: TermKind::Quarterly,
        months: None,
    };
    assert_eq!(quarterly.end_date(date(2025, 1, 31)), Some(date(2025, 4, 30)));
}
