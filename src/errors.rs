use actix_web::{HttpResponse, ResponseError};
use actix_web::http::StatusCode;
use serde_json::json;
use std::fmt;
use uuid::Uuid;

/// Coarse classification of an [`AppError`], used by callers to pick a
/// transport-level response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InvalidTransition,
    LockedForEditing,
    Internal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Validation(String),
    NotFound { entity: &'static str, id: Uuid },
    CapacityExceeded { class_id: Uuid, capacity: u32 },
    AlreadyEnrolled { class_id: Uuid, student_id: Uuid },
    NotEnrolled { class_id: Uuid, student_id: Uuid },
    WaitlistDisabled { class_id: Uuid },
    AlreadyWaitlisted { class_id: Uuid, student_id: Uuid },
    ScheduleConflict { teacher_id: Uuid, detail: String },
    AlreadySigned { party: &'static str },
    AlreadyCancelled { entity: &'static str, id: Uuid },
    Duplicate { field: String, value: String },
    StaleWrite { entity: &'static str, id: Uuid },
    InvalidTransition { entity: &'static str, from: String, action: &'static str },
    LockedForEditing { entity: &'static str, id: Uuid },
    Database,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::CapacityExceeded { .. }
            | AppError::AlreadyEnrolled { .. }
            | AppError::NotEnrolled { .. }
            | AppError::WaitlistDisabled { .. }
            | AppError::AlreadyWaitlisted { .. }
            | AppError::ScheduleConflict { .. }
            | AppError::AlreadySigned { .. }
            | AppError::AlreadyCancelled { .. }
            | AppError::Duplicate { .. }
            | AppError::StaleWrite { .. } => ErrorKind::Conflict,
            AppError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            AppError::LockedForEditing { .. } => ErrorKind::LockedForEditing,
            AppError::Database | AppError::Internal => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::AlreadyEnrolled { .. } => "ALREADY_ENROLLED",
            AppError::NotEnrolled { .. } => "NOT_ENROLLED",
            AppError::WaitlistDisabled { .. } => "WAITLIST_DISABLED",
            AppError::AlreadyWaitlisted { .. } => "ALREADY_WAITLISTED",
            AppError::ScheduleConflict { .. } => "SCHEDULE_CONFLICT",
            AppError::AlreadySigned { .. } => "ALREADY_SIGNED",
            AppError::AlreadyCancelled { .. } => "ALREADY_CANCELLED",
            AppError::Duplicate { .. } => "DUPLICATE",
            AppError::StaleWrite { .. } => "STALE_WRITE",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::LockedForEditing { .. } => "LOCKED_FOR_EDITING",
            AppError::Database => "DATABASE_ERROR",
            AppError::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn invalid_transition(entity: &'static str, from: impl fmt::Debug, action: &'static str) -> Self {
        AppError::InvalidTransition {
            entity,
            from: format!("{:?}", from).trim_matches('"').to_string(),
            action,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            AppError::CapacityExceeded { class_id, capacity } => {
                write!(f, "Class {} is full ({} seats)", class_id, capacity)
            }
            AppError::AlreadyEnrolled { class_id, student_id } => {
                write!(f, "Student {} is already enrolled in class {}", student_id, class_id)
            }
            AppError::NotEnrolled { class_id, student_id } => {
                write!(f, "Student {} is not enrolled in class {}", student_id, class_id)
            }
            AppError::WaitlistDisabled { class_id } => {
                write!(f, "Class {} does not accept a waitlist", class_id)
            }
            AppError::AlreadyWaitlisted { class_id, student_id } => {
                write!(f, "Student {} is already on the waitlist of class {}", student_id, class_id)
            }
            AppError::ScheduleConflict { teacher_id, detail } => {
                write!(f, "Schedule conflict for teacher {}: {}", teacher_id, detail)
            }
            AppError::AlreadySigned { party } => write!(f, "Contract already signed by {}", party),
            AppError::AlreadyCancelled { entity, id } => write!(f, "{} {} is already cancelled", entity, id),
            AppError::Duplicate { field, value } => write!(f, "Duplicate value for {}: {}", field, value),
            AppError::StaleWrite { entity, id } => {
                write!(f, "{} {} was modified concurrently", entity, id)
            }
            AppError::InvalidTransition { entity, from, action } => {
                write!(f, "Cannot {} {} in state {}", action, entity, from)
            }
            AppError::LockedForEditing { entity, id } => write!(f, "{} {} is locked for editing", entity, id),
            AppError::Database => write!(f, "Database operation failed"),
            AppError::Internal => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
            ErrorKind::LockedForEditing => StatusCode::LOCKED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Infrastructure details stay in the logs
        let message = match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                log::warn!("Unique constraint violated: {}", db_err.message());
                return AppError::Duplicate {
                    field: db_err.constraint().unwrap_or("unique").to_string(),
                    value: String::new(),
                };
            }
        }
        log::error!("Database error: {:?}", err);
        sentry::capture_error(&err);
        AppError::Database
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        log::error!("Document (de)serialization error: {:?}", err);
        sentry::capture_error(&err);
        AppError::Internal
    }
}
