use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{CreateUserRequest, RefreshTokenRecord, Role, User, validate_email};

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ManageUsers,
    ManageTeachers,
    ManageStudents,
    ViewStudents,
    ManageClasses,
    ViewClasses,
    ScheduleLessons,
    RecordAttendance,
    WriteEvaluations,
    ViewEvaluations,
    ManagePlans,
    ManagePayments,
    ViewPayments,
    ManageContracts,
    SignContracts,
    ViewReports,
}

impl Role {
    pub fn permits(self, action: Action) -> bool {
        use Action::*;
        match self {
            Role::Admin => true,
            Role::Teacher => match action {
                ViewStudents | ViewClasses | ScheduleLessons | RecordAttendance | WriteEvaluations
                | ViewEvaluations => true,
                ManageUsers | ManageTeachers | ManageStudents | ManageClasses | ManagePlans | ManagePayments
                | ViewPayments | ManageContracts | SignContracts | ViewReports => false,
            },
            Role::Guardian => match action {
                ViewStudents | ViewClasses | ViewEvaluations | ViewPayments | SignContracts => true,
                ManageUsers | ManageTeachers | ManageStudents | ManageClasses | ScheduleLessons
                | RecordAttendance | WriteEvaluations | ManagePlans | ManagePayments | ManageContracts
                | ViewReports => false,
            },
        }
    }
}

/// Refresh tokens are only ever stored as their SHA-256 digest.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl User {
    pub fn create(request: CreateUserRequest, now: DateTime<Utc>) -> AppResult<Self> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("User name is required".to_string()));
        }
        let email = request.email.trim().to_lowercase();
        validate_email(&email)?;
        if request.password_hash.is_empty() {
            return Err(AppError::Validation("Password hash is required".to_string()));
        }
        Ok(User {
            id: Uuid::new_v4(),
            version: 0,
            name,
            email,
            role: request.role,
            active: true,
            password_hash: request.password_hash,
            last_login: None,
            failed_logins: 0,
            locked_until: None,
            refresh_tokens: Vec::new(),
            created_at: now,
        })
    }

    pub fn can(&self, action: Action) -> bool {
        self.active && self.role.permits(action)
    }

    /// Stores the token digest, evicting the oldest records above `cap`.
    pub fn add_refresh_token(&mut self, token: &str, now: DateTime<Utc>, cap: usize) {
        self.refresh_tokens.push(RefreshTokenRecord {
            token_hash: token_digest(token),
            created_at: now,
        });
        self.refresh_tokens.sort_by_key(|r| r.created_at);
        let excess = self.refresh_tokens.len().saturating_sub(cap.max(1));
        self.refresh_tokens.drain(..excess);
    }

    pub fn revoke_refresh_token(&mut self, token: &str) -> bool {
        let digest = token_digest(token);
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|r| r.token_hash != digest);
        self.refresh_tokens.len() != before
    }

    pub fn has_refresh_token(&self, token: &str, now: DateTime<Utc>, ttl_days: i64) -> bool {
        let digest = token_digest(token);
        let cutoff = now - Duration::days(ttl_days);
        self.refresh_tokens
            .iter()
            .any(|r| r.token_hash == digest && r.created_at > cutoff)
    }

    /// Drops tokens older than `ttl_days`. Returns how many were removed.
    pub fn prune_refresh_tokens(&mut self, now: DateTime<Utc>, ttl_days: i64) -> usize {
        let cutoff = now - Duration::days(ttl_days);
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|r| r.created_at > cutoff);
        before - self.refresh_tokens.len()
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Counts a failed login and locks the account once `max_failures` is
    /// reached. An expired lock starts a fresh count. Returns the lock state.
    pub fn record_failed_login(&mut self, now: DateTime<Utc>, max_failures: u32, lockout_minutes: i64) -> bool {
        if self.locked_until.is_some_and(|until| until <= now) {
            self.failed_logins = 0;
            self.locked_until = None;
        }
        self.failed_logins += 1;
        if self.failed_logins >= max_failures && !self.is_locked(now) {
            self.locked_until = Some(now + Duration::minutes(lockout_minutes));
        }
        self.is_locked(now)
    }

    pub fn record_successful_login(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if !self.active {
            return Err(AppError::invalid_transition("User", "inactive", "log in"));
        }
        if self.is_locked(now) {
            return Err(AppError::LockedForEditing {
                entity: "User",
                id: self.id,
            });
        }
        self.failed_logins = 0;
        self.locked_until = None;
        self.last_login = Some(now);
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.refresh_tokens.clear();
    }

    pub fn activate(&mut self) {
        self.active = true;
    }
}
