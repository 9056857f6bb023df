//! Lesson lifecycle and attendance tests.

mod common;

use uuid::Uuid;

use aquavida::domain::lessons::attendance_stats;
use aquavida::models::*;
use aquavida::services::lessons;
use aquavida::store::{MemoryStore, load};
use aquavida::AppError;

use common::*;

fn lesson_request(class_id: Uuid, start: &str, end: &str) -> CreateLessonRequest {
    CreateLessonRequest {
        class_id,
        teacher_id: None,
        date: date(2025, 3, 3),
        start: start.parse().unwrap(),
        end: end.parse().unwrap(),
        title: "Freestyle drills".to_string(),
        description: None,
        objectives: vec!["Side breathing".to_string()],
        content: LessonContent::default(),
    }
}

async fn scheduled_lesson(store: &MemoryStore, teacher_n: u32) -> Lesson {
    let teacher = seed_teacher(store, teacher_n).await;
    let class = seed_class(store, teacher.id, 12).await;
    lessons::schedule_lesson(store, clock(), lesson_request(class.id, "08:00", "09:00"), Uuid::nil(), true)
        .await
        .unwrap()
}

/// Test 1: Ten students with eight present gives 80%
#[test]
fn test_attendance_percentage() {
    let roster: Vec<RosterEntry> = (0..10)
        .map(|i| RosterEntry {
            student_id: Uuid::new_v4(),
            status: if i < 8 { AttendanceStatus::Present } else { AttendanceStatus::Absent },
            arrival_time: None,
            note: None,
        })
        .collect();

    let stats = attendance_stats(&roster);
    assert_eq!(stats.total, 10);
    assert_eq!(stats.present, 8);
    assert_eq!(stats.absent, 2);
    assert_eq!(stats.percentage, 80);
}

/// Test 2: An empty roster reports zero
#[test]
fn test_empty_roster() {
    assert_eq!(attendance_stats(&[]), AttendanceStats::default());
}

/// Test 3: Scheduled -> InProgress -> Completed, and nothing else
#[tokio::test]
async fn test_lesson_transitions() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 1).await;
    assert_eq!(lesson.status, LessonStatus::Scheduled);

    let err = lessons::finish_lesson(&store, clock(), lesson.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    lessons::start_lesson(&store, clock(), lesson.id).await.unwrap();
    assert!(lessons::start_lesson(&store, clock(), lesson.id).await.is_err());

    let done = lessons::finish_lesson(&store, clock(), lesson.id).await.unwrap();
    assert_eq!(done.status, LessonStatus::Completed);

    let err = lessons::cancel_lesson(&store, clock(), lesson.id, CancellationReason::Weather, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

/// Test 4: Marking attendance on a running lesson and finishing it updates
/// the class statistics
#[tokio::test]
async fn test_attendance_flow_updates_class_statistics() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 2).await;
    lessons::start_lesson(&store, clock(), lesson.id).await.unwrap();

    for i in 0..10 {
        let status = if i < 8 { AttendanceStatus::Present } else { AttendanceStatus::Absent };
        lessons::mark_attendance(&store, clock(), lesson.id, Uuid::new_v4(), status, None, Uuid::nil())
            .await
            .unwrap();
    }

    let done = lessons::finish_lesson(&store, clock(), lesson.id).await.unwrap();
    assert_eq!(done.stats.percentage, 80);

    let class: Class = load(&store, lesson.class_id).await.unwrap();
    assert_eq!(class.statistics.total_lessons, 1);
    assert_eq!(class.statistics.average_attendance, 80.0);
}

/// Test 5: Marking the same student twice overwrites the record
#[tokio::test]
async fn test_attendance_is_upserted() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 3).await;
    let student = Uuid::new_v4();

    let first = lessons::mark_attendance(&store, clock(), lesson.id, student, AttendanceStatus::Absent, None, Uuid::nil())
        .await
        .unwrap();
    let second = lessons::mark_attendance(
        &store,
        clock(),
        lesson.id,
        student,
        AttendanceStatus::Present,
        Some("Arrived late".to_string()),
        Uuid::nil(),
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, AttendanceStatus::Present);
    let lesson: Lesson = load(&store, lesson.id).await.unwrap();
    assert_eq!(lesson.roster.len(), 1);
    let entry = lesson.roster_entry(student).unwrap();
    assert_eq!(entry.arrival_time, Some(time(10, 0)));
    assert_eq!(entry.note.as_deref(), Some("Arrived late"));
}

/// Test 6: Absences can be justified, presences cannot
#[tokio::test]
async fn test_justify_absence() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 4).await;
    let absent = lessons::mark_attendance(&store, clock(), lesson.id, Uuid::new_v4(), AttendanceStatus::Absent, None, Uuid::nil())
        .await
        .unwrap();
    let present = lessons::mark_attendance(&store, clock(), lesson.id, Uuid::new_v4(), AttendanceStatus::Present, None, Uuid::nil())
        .await
        .unwrap();

    let justified = lessons::justify_absence(&store, clock(), absent.id, JustificationReason::Illness, None, None)
        .await
        .unwrap();
    assert_eq!(justified.status, AttendanceStatus::ExcusedAbsence);
    assert!(justified.justification.is_some());

    let err = lessons::justify_absence(&store, clock(), present.id, JustificationReason::Travel, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

/// Test 7: A teacher cannot be booked into overlapping lessons
#[tokio::test]
async fn test_double_booking() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 5).await;
    let other_class = aquavida::services::classes::create_class(
        &store,
        class_request(lesson.teacher_id, 10, vec![slot(1, "09:00", "10:00")]),
        false,
    )
    .await
    .unwrap();

    let overlap = lesson_request(other_class.id, "08:30", "09:30");
    let err = lessons::schedule_lesson(&store, clock(), overlap.clone(), Uuid::nil(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ScheduleConflict { .. }));

    let adjacent = lesson_request(other_class.id, "09:00", "10:00");
    assert!(lessons::schedule_lesson(&store, clock(), adjacent, Uuid::nil(), false).await.is_ok());

    // A cancelled lesson frees the time.
    lessons::cancel_lesson(&store, clock(), lesson.id, CancellationReason::TeacherIllness, None, None)
        .await
        .unwrap();
    let mut freed = overlap;
    freed.start = time(8, 0);
    freed.end = time(8, 50);
    assert!(lessons::schedule_lesson(&store, clock(), freed, Uuid::nil(), false).await.is_ok());
}

/// Test 8: Lessons outside working hours are refused when enforced
#[tokio::test]
async fn test_lesson_availability() {
    init_logging();
    let store = MemoryStore::new();
    let teacher = seed_teacher(&store, 6).await;
    let class = seed_class(&store, teacher.id, 10).await;

    let late = lesson_request(class.id, "21:00", "22:00");
    let err = lessons::schedule_lesson(&store, clock(), late.clone(), Uuid::nil(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ScheduleConflict { .. }));
    assert!(lessons::schedule_lesson(&store, clock(), late, Uuid::nil(), false).await.is_ok());
}

/// Test 9: Postponing needs a later date and only works before the start
#[tokio::test]
async fn test_postpone() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 7).await;

    let err = lessons::cancel_lesson(&store, clock(), lesson.id, CancellationReason::Holiday, None, Some(date(2025, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let postponed = lessons::cancel_lesson(
        &store,
        clock(),
        lesson.id,
        CancellationReason::Maintenance,
        Some("Heater repair".to_string()),
        Some(date(2025, 3, 10)),
    )
    .await
    .unwrap();
    assert_eq!(postponed.status, LessonStatus::Postponed);

    let err = lessons::mark_attendance(&store, clock(), lesson.id, Uuid::new_v4(), AttendanceStatus::Present, None, Uuid::nil())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
}

/// Test 10: Feedback only after completion and within 1..=5
#[tokio::test]
async fn test_feedback() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 8).await;
    let feedback = LessonFeedback {
        quality: 4,
        participation: 5,
        objectives_met: 3,
        comments: None,
    };

    assert!(lessons::record_feedback(&store, clock(), lesson.id, feedback.clone()).await.is_err());

    lessons::start_lesson(&store, clock(), lesson.id).await.unwrap();
    lessons::finish_lesson(&store, clock(), lesson.id).await.unwrap();

    let bad = LessonFeedback { quality: 6, ..feedback.clone() };
    assert!(matches!(
        lessons::record_feedback(&store, clock(), lesson.id, bad).await,
        Err(AppError::Validation(_))
    ));
    let saved = lessons::record_feedback(&store, clock(), lesson.id, feedback).await.unwrap();
    assert_eq!(saved.feedback.map(|f| f.quality), Some(4));
}

/// Test 11: Frequency reports count every status
#[tokio::test]
async fn test_frequency_reports() {
    init_logging();
    let store = MemoryStore::new();
    let lesson = scheduled_lesson(&store, 9).await;
    let student = Uuid::new_v4();
    lessons::mark_attendance(&store, clock(), lesson.id, student, AttendanceStatus::Present, None, Uuid::nil())
        .await
        .unwrap();
    lessons::mark_attendance(&store, clock(), lesson.id, Uuid::new_v4(), AttendanceStatus::MedicalNote, None, Uuid::nil())
        .await
        .unwrap();

    let report = lessons::student_frequency_report(&store, student, date(2025, 3, 1), date(2025, 3, 31))
        .await
        .unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.percentage, 100.0);

    let by_student = lessons::class_frequency_report(&store, lesson.class_id, date(2025, 3, 1), date(2025, 3, 31))
        .await
        .unwrap();
    assert_eq!(by_student.len(), 2);
    assert_eq!(by_student[0].student_id, student);
    assert_eq!(by_student[1].report.medical, 1);
}
