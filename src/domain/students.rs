use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    ClassHistoryEntry, CreateStudentRequest, LevelCount, Student, StudentDocument, StudentStatistics, SwimLevel,
    validate_cpf, validate_email,
};
use crate::utils::age_on;

impl Student {
    pub fn create(request: CreateStudentRequest, today: NaiveDate) -> AppResult<Self> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation("Student name is required".to_string()));
        }
        if request.birth_date > today {
            return Err(AppError::Validation("Birth date cannot be in the future".to_string()));
        }
        if let Some(cpf) = &request.cpf {
            validate_cpf(cpf)?;
        }
        validate_cpf(&request.guardian.cpf)?;
        validate_email(&request.guardian.email)?;

        Ok(Student {
            id: Uuid::new_v4(),
            version: 0,
            name: request.name.trim().to_string(),
            birth_date: request.birth_date,
            cpf: request.cpf,
            phone: request.phone,
            guardian: request.guardian,
            guardian_user_id: request.guardian_user_id,
            swim_level: request.swim_level,
            medical: request.medical,
            image_consent: request.image_consent,
            plan_id: request.plan_id,
            active: true,
            enrolled_on: today,
            inactivated_at: None,
            inactivation_reason: None,
            documents: Vec::new(),
            class_history: Vec::new(),
        })
    }

    pub fn age(&self, today: NaiveDate) -> u32 {
        age_on(self.birth_date, today)
    }

    pub fn inactivate(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> AppResult<()> {
        if !self.active {
            return Err(AppError::invalid_transition("Student", "inactive", "inactivate"));
        }
        self.active = false;
        self.inactivated_at = Some(now);
        self.inactivation_reason = Some(reason.into());
        Ok(())
    }

    pub fn reactivate(&mut self) -> AppResult<()> {
        if self.active {
            return Err(AppError::invalid_transition("Student", "active", "reactivate"));
        }
        self.active = true;
        self.inactivated_at = None;
        self.inactivation_reason = None;
        Ok(())
    }

    pub fn add_document(&mut self, document: StudentDocument) {
        self.documents.push(document);
    }

    pub fn remove_document(&mut self, document_id: Uuid) -> AppResult<StudentDocument> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == document_id)
            .ok_or(AppError::NotFound {
                entity: "Student document",
                id: document_id,
            })?;
        Ok(self.documents.remove(index))
    }

    /// Appends the class the student is leaving to the history log.
    pub fn record_class_change(
        &mut self,
        previous_class_id: Uuid,
        started_on: NaiveDate,
        today: NaiveDate,
        reason: Option<String>,
    ) {
        self.class_history.push(ClassHistoryEntry {
            class_id: previous_class_id,
            started_on,
            ended_on: today,
            reason: reason.unwrap_or_else(|| "Class change".to_string()),
        });
    }
}

pub fn student_statistics(students: &[Student]) -> StudentStatistics {
    let active: Vec<&Student> = students.iter().filter(|s| s.active).collect();
    let levels = [
        SwimLevel::Beginner,
        SwimLevel::Basic,
        SwimLevel::Intermediate,
        SwimLevel::Advanced,
        SwimLevel::Competitive,
    ];
    let by_level = levels
        .into_iter()
        .map(|level| LevelCount {
            level,
            count: active.iter().filter(|s| s.swim_level == level).count() as u32,
        })
        .filter(|c| c.count > 0)
        .collect();

    StudentStatistics {
        total: students.len() as u32,
        active: active.len() as u32,
        inactive: (students.len() - active.len()) as u32,
        by_level,
    }
}
