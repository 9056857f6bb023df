//! Teacher working-hours checks. Contracted hours include both ends.

mod common;

use uuid::Uuid;

use aquavida::domain::availability::available_teachers;
use aquavida::models::*;
use aquavida::services::teachers;
use aquavida::store::MemoryStore;

use common::*;

fn teacher(n: u32) -> Teacher {
    Teacher::create(teacher_request(n)).unwrap()
}

/// Test 1: Start and end of the working day are both available
#[test]
fn test_working_hours_are_inclusive() {
    let teacher = teacher(1);
    assert!(teacher.is_available(1, time(7, 0)));
    assert!(teacher.is_available(1, time(21, 0)));
    assert!(!teacher.is_available(1, time(6, 59)));
    assert!(!teacher.is_available(1, time(21, 1)));
}

/// Test 2: Inactive weekdays are never available
#[test]
fn test_inactive_weekday() {
    let teacher = teacher(2);
    assert!(!teacher.is_available(0, time(10, 0)));
    assert!(!teacher.is_available(6, time(10, 0)));
    assert!(!teacher.is_available(7, time(10, 0)));
}

/// Test 3: A slot is covered only when both of its ends are
#[test]
fn test_covers_slot() {
    let teacher = teacher(3);
    assert!(teacher.covers_slot(&slot(2, "07:00", "08:00")));
    assert!(teacher.covers_slot(&slot(2, "20:00", "21:00")));
    assert!(!teacher.covers_slot(&slot(2, "20:30", "21:30")));
    assert!(!teacher.covers_slot(&slot(6, "09:00", "10:00")));
}

/// Test 4: Only active teachers working at that time are listed
#[test]
fn test_available_teachers() {
    let early = teacher(4);
    let mut late = teacher(5);
    late.working_hours.monday = DaySchedule {
        active: true,
        start: Some(time(14, 0)),
        end: Some(time(21, 0)),
    };
    let mut terminated = teacher(6);
    terminated.terminate("End of contract", date(2025, 3, 1)).unwrap();
    let all = vec![early.clone(), late.clone(), terminated];

    let at_opening: Vec<Uuid> = available_teachers(&all, 1, time(7, 0)).iter().map(|t| t.id).collect();
    assert_eq!(at_opening, vec![early.id]);

    let at_two: Vec<Uuid> = available_teachers(&all, 1, time(14, 0)).iter().map(|t| t.id).collect();
    assert_eq!(at_two, vec![early.id, late.id]);

    assert!(available_teachers(&all, 1, time(21, 1)).is_empty());
}

/// Test 5: The store query applies the same rule
#[tokio::test]
async fn test_teachers_available_at() {
    init_logging();
    let store = MemoryStore::new();
    let teacher = seed_teacher(&store, 7).await;

    let at_close = teachers::teachers_available_at(&store, 5, time(21, 0)).await.unwrap();
    assert_eq!(at_close.len(), 1);
    assert_eq!(at_close[0].id, teacher.id);
    assert!(teachers::teachers_available_at(&store, 5, time(21, 1)).await.unwrap().is_empty());
    assert!(teachers::teachers_available_at(&store, 0, time(10, 0)).await.unwrap().is_empty());
}
