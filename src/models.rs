use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])$").expect("valid time pattern"));

static CPF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\.\d{3}\.\d{3}-\d{2}$").expect("valid cpf pattern"));

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.+-]+@[\w-]+(\.[\w-]+)*\.\w{2,}$").expect("valid email pattern"));

pub fn validate_cpf(cpf: &str) -> AppResult<()> {
    if CPF_PATTERN.is_match(cpf) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("CPF must use the XXX.XXX.XXX-XX format, got '{}'", cpf)))
    }
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid email address '{}'", email)))
    }
}

// ---------------------------------------------------------------------------
// Time values
// ---------------------------------------------------------------------------

/// Minute of the day, written as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "08:30")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> AppResult<Self> {
        if minutes >= 24 * 60 {
            return Err(AppError::Validation(format!("{} is not a minute of the day", minutes)));
        }
        Ok(TimeOfDay(minutes))
    }

    pub fn hm(hour: u16, minute: u16) -> AppResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::Validation(format!("Invalid time {}:{}", hour, minute)));
        }
        Ok(TimeOfDay(hour * 60 + minute))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_PATTERN
            .captures(s.trim())
            .ok_or_else(|| AppError::Validation(format!("Time must use the HH:MM format, got '{}'", s)))?;
        let hour: u16 = caps[1].parse().map_err(|_| AppError::Validation(format!("Invalid hour in '{}'", s)))?;
        let minute: u16 = caps[2].parse().map_err(|_| AppError::Validation(format!("Invalid minute in '{}'", s)))?;
        TimeOfDay::hm(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Recurring weekly slot. `weekday` counts from 0 (Sunday) to 6 (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    pub weekday: u8,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u16,
}

impl TimeSlot {
    pub fn new(weekday: u8, start: TimeOfDay, end: TimeOfDay) -> AppResult<Self> {
        if weekday > 6 {
            return Err(AppError::Validation(format!(
                "Weekday must be between 0 (Sunday) and 6 (Saturday), got {}",
                weekday
            )));
        }
        if end <= start {
            return Err(AppError::Validation(format!("Slot end {} must be after start {}", end, start)));
        }
        Ok(TimeSlot {
            weekday,
            start,
            end,
            duration_minutes: end.minutes() - start.minutes(),
        })
    }

    pub fn parse(weekday: u8, start: &str, end: &str) -> AppResult<Self> {
        TimeSlot::new(weekday, start.parse()?, end.parse()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn validate(&self) -> AppResult<()> {
        if self.max < self.min {
            return Err(AppError::Validation(format!(
                "Maximum age {} must be greater than or equal to minimum age {}",
                self.max, self.min
            )));
        }
        Ok(())
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Guardian,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub password_hash: String,
    pub last_login: Option<DateTime<Utc>>,
    pub failed_logins: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub refresh_tokens: Vec<RefreshTokenRecord>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SwimLevel {
    Beginner,
    Basic,
    Intermediate,
    Advanced,
    Competitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuardianRelationship {
    Father,
    Mother,
    Grandfather,
    Grandmother,
    Uncle,
    Aunt,
    LegalGuardian,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GuardianContact {
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub email: String,
    pub relationship: GuardianRelationship,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicalNotes {
    pub restrictions: Option<String>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StudentDocumentKind {
    IdCard,
    Cpf,
    ProofOfAddress,
    MedicalCertificate,
    Photo,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentDocument {
    pub id: Uuid,
    pub kind: StudentDocumentKind,
    pub name: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassHistoryEntry {
    pub class_id: Uuid,
    pub started_on: NaiveDate,
    pub ended_on: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub name: String,
    pub birth_date: NaiveDate,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub guardian: GuardianContact,
    pub guardian_user_id: Option<Uuid>,
    pub swim_level: SwimLevel,
    pub medical: MedicalNotes,
    pub image_consent: bool,
    pub plan_id: Option<Uuid>,
    pub active: bool,
    pub enrolled_on: NaiveDate,
    pub inactivated_at: Option<DateTime<Utc>>,
    pub inactivation_reason: Option<String>,
    pub documents: Vec<StudentDocument>,
    pub class_history: Vec<ClassHistoryEntry>,
}

// ---------------------------------------------------------------------------
// Teachers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    ChildrenSwimming,
    AdultSwimming,
    CompetitiveSwimming,
    WaterAerobics,
    AquaFitness,
    TherapeuticSwimming,
    WaterPolo,
    Synchronized,
    Diving,
    Lifesaving,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Certification {
    pub name: String,
    pub institution: String,
    pub obtained_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub number: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    pub active: bool,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkingHours {
    pub sunday: DaySchedule,
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentKind {
    Employee,
    Contractor,
    Freelancer,
    Intern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Employment {
    pub kind: EmploymentKind,
    pub started_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Teacher {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub specialties: Vec<Specialty>,
    pub certifications: Vec<Certification>,
    pub experience_years: u32,
    pub working_hours: WorkingHours,
    pub employment: Employment,
    pub active: bool,
    pub terminated_on: Option<NaiveDate>,
    pub termination_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassLevel {
    Beginner,
    Basic,
    Intermediate,
    Advanced,
    Competitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    FreeSwimming,
    ChildrenSwimming,
    AdultSwimming,
    WaterAerobics,
    AquaFitness,
    TherapeuticSwimming,
    WaterPolo,
    Synchronized,
    Diving,
    Lifesaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PoolName {
    Pool1,
    Pool2,
    Kids,
    Heated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Venue {
    pub pool: PoolName,
    pub lane: Option<u8>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassSettings {
    pub allow_waitlist: bool,
    pub notify_guardians: bool,
    pub require_medical_certificate: bool,
    pub flexible_age: bool,
}

impl Default for ClassSettings {
    fn default() -> Self {
        Self {
            allow_waitlist: true,
            notify_guardians: true,
            require_medical_certificate: false,
            flexible_age: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WaitlistEntry {
    pub student_id: Uuid,
    pub priority: i32,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassStatistics {
    pub total_lessons: u32,
    pub average_attendance: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Class {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub name: String,
    pub description: Option<String>,
    pub age_range: AgeRange,
    pub level: ClassLevel,
    pub modality: Modality,
    pub slots: Vec<TimeSlot>,
    pub teacher_id: Uuid,
    pub substitute_teacher_id: Option<Uuid>,
    pub capacity: u32,
    pub enrolled: Vec<Uuid>,
    pub waitlist: Vec<WaitlistEntry>,
    pub venue: Venue,
    pub settings: ClassSettings,
    pub active: bool,
    pub starts_on: NaiveDate,
    pub ended_on: Option<NaiveDate>,
    pub close_reason: Option<String>,
    pub statistics: ClassStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    Inactive,
    Empty,
    Full,
    NearlyFull,
    Available,
}

// ---------------------------------------------------------------------------
// Lessons and attendance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Postponed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    TeacherIllness,
    Holiday,
    Maintenance,
    Weather,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LessonCancellation {
    pub reason: CancellationReason,
    pub description: Option<String>,
    pub reschedule_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    ExcusedAbsence,
    MedicalNote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RosterEntry {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    pub arrival_time: Option<TimeOfDay>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceStats {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LessonContent {
    pub warm_up: Option<String>,
    pub main_set: Option<String>,
    pub cool_down: Option<String>,
    pub notes: Option<String>,
}

/// Teacher's 1-5 appraisal of how a lesson went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LessonFeedback {
    pub quality: u8,
    pub participation: u8,
    pub objectives_met: u8,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lesson {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u16,
    pub title: String,
    pub description: Option<String>,
    pub objectives: Vec<String>,
    pub content: LessonContent,
    pub status: LessonStatus,
    pub cancellation: Option<LessonCancellation>,
    pub roster: Vec<RosterEntry>,
    pub stats: AttendanceStats,
    pub feedback: Option<LessonFeedback>,
    pub created_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JustificationReason {
    Illness,
    Travel,
    FamilyCommitment,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Justification {
    pub reason: JustificationReason,
    pub description: Option<String>,
    pub attachment_url: Option<String>,
    pub justified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BehaviorObservations {
    pub behavior: Option<String>,
    pub participation: Option<String>,
    pub progress: Option<String>,
    pub comments: Option<String>,
}

/// One fact per (student, lesson).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Attendance {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub lesson_id: Uuid,
    pub teacher_id: Uuid,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub status: AttendanceStatus,
    pub justification: Option<Justification>,
    pub observations: Option<BehaviorObservations>,
    pub recorded_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Evaluations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPeriod {
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Draft,
    Finalized,
    SentToGuardian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrokeLevel {
    CannotSwim,
    Beginner,
    Basic,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Score {
    pub score: Option<f64>,
    pub notes: Option<String>,
}

impl Score {
    pub fn of(score: f64) -> Self {
        Score { score: Some(score), notes: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TechniqueScores {
    pub breathing: Score,
    pub floating: Score,
    pub propulsion: Score,
    pub coordination: Score,
    pub endurance: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrokeAssessment {
    pub level: StrokeLevel,
    pub score: Option<f64>,
    pub notes: Option<String>,
}

impl Default for StrokeAssessment {
    fn default() -> Self {
        StrokeAssessment { level: StrokeLevel::CannotSwim, score: None, notes: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrokeScores {
    pub freestyle: StrokeAssessment,
    pub backstroke: StrokeAssessment,
    pub breaststroke: StrokeAssessment,
    pub butterfly: StrokeAssessment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BehaviorScores {
    pub discipline: Score,
    pub participation: Score,
    pub relationships: Score,
    pub dedication: Score,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Goals {
    pub achieved: Vec<String>,
    pub in_progress: Vec<String>,
    pub upcoming: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recommendations {
    pub strengths: Vec<String>,
    pub areas_to_improve: Vec<String>,
    pub suggestions_for_guardians: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Averages frozen when the evaluation is finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FrozenAverages {
    pub technical: f64,
    pub behavioral: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    VeryGood,
    Good,
    Regular,
    Insufficient,
    Inadequate,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::Excellent => "Excellent",
            Grade::VeryGood => "Very Good",
            Grade::Good => "Good",
            Grade::Regular => "Regular",
            Grade::Insufficient => "Insufficient",
            Grade::Inadequate => "Inadequate",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Evaluation {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub period: EvaluationPeriod,
    pub technique: TechniqueScores,
    pub strokes: StrokeScores,
    pub behavior: BehaviorScores,
    pub goals: Goals,
    pub recommendations: Recommendations,
    pub averages: Option<FrozenAverages>,
    pub status: EvaluationStatus,
    pub created_by: Uuid,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_by_guardian: bool,
    pub viewed_at: Option<DateTime<Utc>>,
}

/// Partial update of an evaluation; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EvaluationUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technique: Option<TechniqueScores>,
    pub strokes: Option<StrokeScores>,
    pub behavior: Option<BehaviorScores>,
    pub goals: Option<Goals>,
    pub recommendations: Option<Recommendations>,
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
    SingleSession,
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanModality {
    FreeSwimming,
    ChildrenSwimming,
    AdultSwimming,
    WaterAerobics,
    AquaFitness,
    TherapeuticSwimming,
    WaterPolo,
    Synchronized,
    Diving,
    Lifesaving,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Basic,
    Intermediate,
    Premium,
    Vip,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    pub active: bool,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Inactive,
    Scheduled,
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanPolicy {
    pub allows_freeze: bool,
    pub freeze_days: u32,
    pub allows_cancellation: bool,
    pub notice_days: u32,
    pub termination_fee: f64,
    pub grace_days: u32,
}

impl Default for PlanPolicy {
    fn default() -> Self {
        Self {
            allows_freeze: true,
            freeze_days: 30,
            allows_cancellation: true,
            notice_days: 30,
            termination_fee: 0.0,
            grace_days: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlanLimits {
    pub max_students_per_class: u32,
    pub max_absences_per_month: u32,
    pub makeup_lessons: bool,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_students_per_class: 15,
            max_absences_per_month: 4,
            makeup_lessons: false,
        }
    }
}

/// Discount offered on top of a plan's effective price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PlanDiscount {
    Percent(f64),
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Plan {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub name: String,
    pub description: Option<String>,
    pub kind: PlanKind,
    pub modality: PlanModality,
    pub price: f64,
    pub promotional_price: Option<f64>,
    pub duration_months: u32,
    pub sessions_per_week: u32,
    pub session_minutes: u32,
    pub age_range: AgeRange,
    pub promotion: Promotion,
    pub policy: PlanPolicy,
    pub limits: PlanLimits,
    pub category: PlanCategory,
    pub billing_day: Option<u32>,
    pub active: bool,
    pub discontinued_on: Option<NaiveDate>,
    pub discontinuation_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
    Refunded,
    UnderReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Credit,
    Debit,
}

/// Method metadata; the shape depends on how the charge was settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    Card {
        kind: CardKind,
        brand: Option<String>,
        last_digits: Option<String>,
        installments: Option<u32>,
    },
    BankSlip {
        barcode: Option<String>,
        digitable_line: Option<String>,
        our_number: Option<String>,
    },
    Pix {
        key: Option<String>,
        qr_code: Option<String>,
    },
    Transfer {
        bank: Option<String>,
        branch: Option<String>,
        account: Option<String>,
    },
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Card,
    BankSlip,
    Pix,
    Transfer,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BillingPeriod {
    pub month: u32,
    pub year: i32,
}

/// Flat amount or percent of the original amount; a non-zero amount wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Adjustment {
    pub amount: f64,
    pub percent: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Interest {
    pub amount: f64,
    pub percent: f64,
    pub days_late: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AdjustmentInput {
    Amount(f64),
    Percent(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    Created,
    MarkedOverdue,
    PaymentConfirmed,
    Cancelled,
    Refunded,
    FlaggedForReview,
    DiscountApplied,
    LateFeeApplied,
    NoteAdded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentHistoryEntry {
    pub at: DateTime<Utc>,
    pub actor: Option<Uuid>,
    pub action: PaymentAction,
    pub previous_status: PaymentStatus,
    pub new_status: PaymentStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub student_id: Uuid,
    pub plan_id: Uuid,
    pub guardian_id: Option<Uuid>,
    pub description: String,
    pub original_amount: f64,
    pub discount: Adjustment,
    pub late_fee: Adjustment,
    pub interest: Interest,
    pub total: f64,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub period: BillingPeriod,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub history: Vec<PaymentHistoryEntry>,
    pub created_by: Uuid,
    pub processed_by: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Enrollment,
    Renewal,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
    Indefinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContractTerm {
    pub kind: TermKind,
    /// Overrides the month count implied by `kind`.
    pub months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContractingParty {
    pub name: String,
    pub cpf: String,
    pub rg: Option<String>,
    pub address: Address,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub profession: Option<String>,
    pub marital_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContractedParty {
    pub legal_name: String,
    pub cnpj: String,
    pub address: Address,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub legal_representative: Option<String>,
}

impl Default for ContractedParty {
    fn default() -> Self {
        Self {
            legal_name: "AquaVida Escola de Natação".to_string(),
            cnpj: "00.000.000/0001-00".to_string(),
            address: Address {
                street: Some("Rua das Águas".to_string()),
                number: Some("123".to_string()),
                district: Some("Centro".to_string()),
                city: Some("São Paulo".to_string()),
                state: Some("SP".to_string()),
                postal_code: Some("01000-000".to_string()),
                complement: None,
            },
            phone: Some("(11) 99999-9999".to_string()),
            email: Some("contato@aquavida.com.br".to_string()),
            legal_representative: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractPaymentMethod {
    BankSlip,
    Card,
    Pix,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RateClause {
    pub percent: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdjustmentClause {
    pub index: String,
    pub periodicity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CancellationClause {
    pub notice_days: u32,
    pub conditions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Jurisdiction {
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Clauses {
    pub subject: String,
    pub monthly_amount: f64,
    pub due_day: u32,
    pub payment_method: ContractPaymentMethod,
    pub late_fee: RateClause,
    pub interest: RateClause,
    pub adjustment: AdjustmentClause,
    pub cancellation: CancellationClause,
    pub jurisdiction: Jurisdiction,
}

impl Clauses {
    /// Standard clause set with the school's default penalty terms.
    pub fn standard(monthly_amount: f64, due_day: u32, payment_method: ContractPaymentMethod) -> Self {
        Clauses {
            subject: "Prestação de serviços de ensino de natação".to_string(),
            monthly_amount,
            due_day,
            payment_method,
            late_fee: RateClause { percent: 2.0, description: None },
            interest: RateClause { percent: 1.0, description: None },
            adjustment: AdjustmentClause {
                index: "IPCA".to_string(),
                periodicity: "annual".to_string(),
            },
            cancellation: CancellationClause { notice_days: 30, conditions: None },
            jurisdiction: Jurisdiction::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpecificTerms {
    pub medical_restrictions: Option<String>,
    pub image_authorization: bool,
    pub civil_liability: Option<String>,
    pub internal_rules: Option<String>,
    pub privacy_policy_accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GuardianSignature {
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip: Option<String>,
    pub signature: Option<String>,
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SchoolSignature {
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<Uuid>,
    pub signer_role: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Witness {
    pub name: String,
    pub cpf: String,
    pub signature: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Signatures {
    pub guardian: GuardianSignature,
    pub school: SchoolSignature,
    pub witnesses: Vec<Witness>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    PartialGuardian,
    PartialSchool,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    AwaitingSignature,
    Signed,
    Active,
    Suspended,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContractAction {
    Created,
    GuardianSigned,
    SchoolSigned,
    Activated,
    Suspended,
    Resumed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContractHistoryEntry {
    pub at: DateTime<Utc>,
    pub actor: Option<Uuid>,
    pub action: ContractAction,
    pub previous_status: ContractStatus,
    pub new_status: ContractStatus,
    pub note: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AutoRenewal {
    pub active: bool,
    pub conditions: Option<String>,
    pub next_renewal_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Contract {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub number: String,
    pub kind: ContractKind,
    pub student_id: Uuid,
    pub guardian_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub term: ContractTerm,
    pub contracting_party: ContractingParty,
    pub contracted_party: ContractedParty,
    pub clauses: Clauses,
    pub specific_terms: SpecificTerms,
    pub signatures: Signatures,
    pub status: ContractStatus,
    pub history: Vec<ContractHistoryEntry>,
    pub content_hash: String,
    pub template_version: String,
    pub auto_renewal: AutoRenewal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IntegrityReport {
    pub intact: bool,
    pub stored_hash: String,
    pub current_hash: String,
    pub checked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Hash produced by the authentication layer.
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStudentRequest {
    pub name: String,
    pub birth_date: NaiveDate,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub guardian: GuardianContact,
    pub guardian_user_id: Option<Uuid>,
    pub swim_level: SwimLevel,
    #[serde(default)]
    pub medical: MedicalNotes,
    #[serde(default)]
    pub image_consent: bool,
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTeacherRequest {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub specialties: Vec<Specialty>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub working_hours: WorkingHours,
    pub employment: Employment,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateClassRequest {
    pub name: String,
    pub description: Option<String>,
    pub age_range: AgeRange,
    pub level: ClassLevel,
    pub modality: Modality,
    pub slots: Vec<TimeSlot>,
    pub teacher_id: Uuid,
    pub substitute_teacher_id: Option<Uuid>,
    pub capacity: u32,
    pub venue: Venue,
    #[serde(default)]
    pub settings: ClassSettings,
    pub starts_on: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub class_id: Uuid,
    /// Defaults to the class's primary teacher.
    pub teacher_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub content: LessonContent,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RescheduleLessonRequest {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEvaluationRequest {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub period: EvaluationPeriod,
    #[serde(default)]
    pub technique: TechniqueScores,
    #[serde(default)]
    pub strokes: StrokeScores,
    #[serde(default)]
    pub behavior: BehaviorScores,
    #[serde(default)]
    pub goals: Goals,
    #[serde(default)]
    pub recommendations: Recommendations,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub name: String,
    pub description: Option<String>,
    pub kind: PlanKind,
    pub modality: PlanModality,
    pub price: f64,
    pub promotional_price: Option<f64>,
    pub duration_months: u32,
    pub sessions_per_week: u32,
    pub session_minutes: u32,
    pub age_range: AgeRange,
    #[serde(default)]
    pub promotion: Promotion,
    #[serde(default)]
    pub policy: PlanPolicy,
    #[serde(default)]
    pub limits: PlanLimits,
    pub category: PlanCategory,
    pub billing_day: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub student_id: Uuid,
    pub plan_id: Uuid,
    pub guardian_id: Option<Uuid>,
    pub description: String,
    pub original_amount: f64,
    pub due_date: NaiveDate,
    pub period: BillingPeriod,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateContractRequest {
    pub kind: ContractKind,
    pub student_id: Uuid,
    pub guardian_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDate,
    pub term: ContractTerm,
    pub contracting_party: ContractingParty,
    #[serde(default)]
    pub contracted_party: ContractedParty,
    pub clauses: Clauses,
    #[serde(default)]
    pub specific_terms: SpecificTerms,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
    #[serde(default)]
    pub auto_renewal: AutoRenewal,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct NextSession {
    pub weekday: u8,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct TeacherLessonStats {
    pub total: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub average_attendance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct FrequencyReport {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub excused: u32,
    pub medical: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentFrequency {
    pub student_id: Uuid,
    pub report: FrequencyReport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct PeriodStatistics {
    pub count: u32,
    pub technical_average: Option<f64>,
    pub behavioral_average: Option<f64>,
    pub overall_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RevenueByMethod {
    pub method: PaymentMethodKind,
    pub count: u32,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    pub period: BillingPeriod,
    pub by_method: Vec<RevenueByMethod>,
    pub total: f64,
    pub paid_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DelinquencyEntry {
    pub student_id: Uuid,
    pub overdue_count: u32,
    pub total_due: f64,
    pub oldest_due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContractStatusCount {
    pub status: ContractStatus,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BulkChargeSummary {
    pub period: BillingPeriod,
    pub created: Vec<Uuid>,
    pub skipped_existing: u32,
    pub skipped_without_plan: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LevelCount {
    pub level: SwimLevel,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct StudentStatistics {
    pub total: u32,
    pub active: u32,
    pub inactive: u32,
    pub by_level: Vec<LevelCount>,
}
