//! Shared fixtures for the integration tests.
//!
//! Every test runs against a fresh [`MemoryStore`] and a pinned clock
//! (Monday 2025-03-03, 10:00 UTC) so ages, due dates and weekdays are stable.

#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use aquavida::models::*;
use aquavida::services::{Clock, classes, plans, students, teachers};
use aquavida::store::MemoryStore;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn clock() -> Clock {
    Clock::at(Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap())
}

pub fn clock_on(year: i32, month: u32, day: u32) -> Clock {
    Clock::at(Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap())
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn time(hour: u16, minute: u16) -> TimeOfDay {
    TimeOfDay::hm(hour, minute).unwrap()
}

pub fn slot(weekday: u8, start: &str, end: &str) -> TimeSlot {
    TimeSlot::parse(weekday, start, end).unwrap()
}

/// Distinct, well-formed CPF for fixture number `n`.
pub fn cpf(n: u32) -> String {
    format!("{:03}.{:03}.{:03}-{:02}", n % 1000, (n / 1000) % 1000, 123, n % 100)
}

pub fn weekday_hours() -> WorkingHours {
    let open = DaySchedule {
        active: true,
        start: Some(time(7, 0)),
        end: Some(time(21, 0)),
    };
    WorkingHours {
        monday: open,
        tuesday: open,
        wednesday: open,
        thursday: open,
        friday: open,
        ..WorkingHours::default()
    }
}

pub fn teacher_request(n: u32) -> CreateTeacherRequest {
    CreateTeacherRequest {
        user_id: None,
        name: format!("Teacher {}", n),
        cpf: cpf(n),
        email: format!("teacher{}@aquavida.test", n),
        phone: None,
        birth_date: Some(date(1988, 6, 15)),
        specialties: vec![Specialty::ChildrenSwimming],
        certifications: Vec::new(),
        experience_years: 5,
        working_hours: weekday_hours(),
        employment: Employment {
            kind: EmploymentKind::Employee,
            started_on: date(2020, 1, 6),
            ends_on: None,
            notes: None,
        },
    }
}

pub fn guardian() -> GuardianContact {
    GuardianContact {
        name: "Maria Souza".to_string(),
        cpf: "111.222.333-44".to_string(),
        phone: "(11) 98888-7777".to_string(),
        email: "maria@example.com".to_string(),
        relationship: GuardianRelationship::Mother,
    }
}

/// A seven-year-old on the pinned clock.
pub fn student_request(n: u32) -> CreateStudentRequest {
    CreateStudentRequest {
        name: format!("Student {}", n),
        birth_date: date(2017, 5, 10),
        cpf: None,
        phone: None,
        guardian: guardian(),
        guardian_user_id: None,
        swim_level: SwimLevel::Beginner,
        medical: MedicalNotes::default(),
        image_consent: true,
        plan_id: None,
    }
}

pub fn class_request(teacher_id: Uuid, capacity: u32, slots: Vec<TimeSlot>) -> CreateClassRequest {
    CreateClassRequest {
        name: "Tubarões".to_string(),
        description: None,
        age_range: AgeRange { min: 5, max: 12 },
        level: ClassLevel::Beginner,
        modality: Modality::ChildrenSwimming,
        slots,
        teacher_id,
        substitute_teacher_id: None,
        capacity,
        venue: Venue {
            pool: PoolName::Pool1,
            lane: Some(2),
            notes: None,
        },
        settings: ClassSettings::default(),
        starts_on: date(2025, 2, 3),
    }
}

pub fn plan_request(price: f64) -> CreatePlanRequest {
    CreatePlanRequest {
        name: "Kids 2x".to_string(),
        description: None,
        kind: PlanKind::Monthly,
        modality: PlanModality::ChildrenSwimming,
        price,
        promotional_price: None,
        duration_months: 1,
        sessions_per_week: 2,
        session_minutes: 45,
        age_range: AgeRange { min: 4, max: 14 },
        promotion: Promotion::default(),
        policy: PlanPolicy::default(),
        limits: PlanLimits::default(),
        category: PlanCategory::Basic,
        billing_day: None,
    }
}

pub fn contracting_party() -> ContractingParty {
    ContractingParty {
        name: "Maria Souza".to_string(),
        cpf: "111.222.333-44".to_string(),
        rg: None,
        address: Address::default(),
        phone: None,
        email: Some("maria@example.com".to_string()),
        profession: None,
        marital_status: None,
    }
}

pub fn contract_request(student_id: Uuid, plan_id: Uuid, start_date: NaiveDate) -> CreateContractRequest {
    CreateContractRequest {
        kind: ContractKind::Enrollment,
        student_id,
        guardian_id: Uuid::new_v4(),
        plan_id,
        start_date,
        term: ContractTerm {
            kind: TermKind::Annual,
            months: None,
        },
        contracting_party: contracting_party(),
        contracted_party: ContractedParty::default(),
        clauses: Clauses::standard(180.0, 10, ContractPaymentMethod::Pix),
        specific_terms: SpecificTerms::default(),
        witnesses: Vec::new(),
        auto_renewal: AutoRenewal::default(),
    }
}

pub async fn seed_teacher(store: &MemoryStore, n: u32) -> Teacher {
    teachers::create_teacher(store, teacher_request(n)).await.unwrap()
}

pub async fn seed_student(store: &MemoryStore, n: u32) -> Student {
    students::create_student(store, clock(), student_request(n)).await.unwrap()
}

/// Monday 08:00-09:00 class.
pub async fn seed_class(store: &MemoryStore, teacher_id: Uuid, capacity: u32) -> Class {
    classes::create_class(store, class_request(teacher_id, capacity, vec![slot(1, "08:00", "09:00")]), false)
        .await
        .unwrap()
}

pub async fn seed_plan(store: &MemoryStore, price: f64) -> Plan {
    plans::create_plan(store, plan_request(price)).await.unwrap()
}
