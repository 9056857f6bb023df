use utoipa::OpenApi;

use crate::domain::users::Action;
use crate::models::*;

/// Schema catalogue for the HTTP layer built on top of this crate.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AquaVida API",
        version = "0.1.0",
        description = "Swim school management: students, classes, lessons, evaluations, billing and contracts."
    ),
    components(
        schemas(
            TimeOfDay, TimeSlot, AgeRange, Address,
            Role, Action, RefreshTokenRecord, User, CreateUserRequest,
            SwimLevel, GuardianRelationship, GuardianContact, MedicalNotes, StudentDocumentKind, StudentDocument,
            ClassHistoryEntry, Student, CreateStudentRequest, LevelCount, StudentStatistics,
            Specialty, Certification, DaySchedule, WorkingHours, EmploymentKind, Employment, Teacher,
            CreateTeacherRequest,
            ClassLevel, Modality, PoolName, Venue, ClassSettings, WaitlistEntry, ClassStatistics, Class,
            OccupancyStatus, NextSession, CreateClassRequest,
            LessonStatus, CancellationReason, LessonCancellation, AttendanceStatus, RosterEntry, AttendanceStats,
            LessonContent, LessonFeedback, Lesson, CreateLessonRequest, RescheduleLessonRequest, TeacherLessonStats,
            JustificationReason, Justification, BehaviorObservations, Attendance, FrequencyReport, StudentFrequency,
            EvaluationPeriod, EvaluationStatus, StrokeLevel, Score, TechniqueScores, StrokeAssessment, StrokeScores,
            BehaviorScores, Goals, Recommendations, FrozenAverages, Grade, Evaluation, EvaluationUpdate,
            CreateEvaluationRequest, PeriodStatistics,
            PlanKind, PlanModality, PlanCategory, Promotion, PromotionStatus, PlanPolicy, PlanLimits, PlanDiscount,
            Plan, CreatePlanRequest,
            PaymentStatus, CardKind, PaymentMethod, PaymentMethodKind, BillingPeriod, Adjustment, Interest,
            AdjustmentInput, PaymentAction, PaymentHistoryEntry, Payment, CreatePaymentRequest, RevenueByMethod,
            MonthlyRevenue, DelinquencyEntry, BulkChargeSummary,
            ContractKind, TermKind, ContractTerm, ContractingParty, ContractedParty, ContractPaymentMethod,
            RateClause, AdjustmentClause, CancellationClause, Jurisdiction, Clauses, SpecificTerms, GeoLocation,
            GuardianSignature, SchoolSignature, Witness, Signatures, SignatureStatus, ContractStatus, ContractAction,
            ContractHistoryEntry, AutoRenewal, Contract, CreateContractRequest, IntegrityReport, ContractStatusCount,
        )
    ),
    tags(
        (name = "students", description = "Student records"),
        (name = "classes", description = "Classes, rosters and waitlists"),
        (name = "lessons", description = "Lessons and attendance"),
        (name = "evaluations", description = "Pedagogical evaluations"),
        (name = "billing", description = "Plans and payments"),
        (name = "contracts", description = "Contracts and signatures"),
    )
)]
pub struct ApiDoc;
