use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Certification, CreateTeacherRequest, DaySchedule, Specialty, Teacher, TimeOfDay, TimeSlot, WorkingHours,
};
use crate::utils::age_on;

impl WorkingHours {
    pub fn day(&self, weekday: u8) -> Option<&DaySchedule> {
        match weekday {
            0 => Some(&self.sunday),
            1 => Some(&self.monday),
            2 => Some(&self.tuesday),
            3 => Some(&self.wednesday),
            4 => Some(&self.thursday),
            5 => Some(&self.friday),
            6 => Some(&self.saturday),
            _ => None,
        }
    }

    fn days(&self) -> [&DaySchedule; 7] {
        [
            &self.sunday,
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
        ]
    }

    pub fn validate(&self) -> AppResult<()> {
        for (weekday, day) in self.days().iter().enumerate() {
            if !day.active {
                continue;
            }
            match (day.start, day.end) {
                (Some(start), Some(end)) if end > start => {}
                _ => {
                    return Err(AppError::Validation(format!(
                        "Working hours for weekday {} need a start before the end",
                        weekday
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Teacher {
    pub fn create(request: CreateTeacherRequest) -> AppResult<Self> {
        crate::models::validate_cpf(&request.cpf)?;
        crate::models::validate_email(&request.email)?;
        if request.name.trim().is_empty() {
            return Err(AppError::Validation("Teacher name is required".to_string()));
        }
        request.working_hours.validate()?;

        let mut teacher = Teacher {
            id: Uuid::new_v4(),
            version: 0,
            user_id: request.user_id,
            name: request.name.trim().to_string(),
            cpf: request.cpf,
            email: request.email.to_lowercase(),
            phone: request.phone,
            birth_date: request.birth_date,
            specialties: Vec::new(),
            certifications: request.certifications,
            experience_years: request.experience_years,
            working_hours: request.working_hours,
            employment: request.employment,
            active: true,
            terminated_on: None,
            termination_reason: None,
        };
        for specialty in request.specialties {
            teacher.add_specialty(specialty);
        }
        Ok(teacher)
    }

    /// Contracted-hours check: the weekday must be active and `time` must
    /// fall within `[start, end]` inclusive.
    pub fn is_available(&self, weekday: u8, time: TimeOfDay) -> bool {
        match self.working_hours.day(weekday) {
            Some(DaySchedule {
                active: true,
                start: Some(start),
                end: Some(end),
            }) => *start <= time && time <= *end,
            _ => false,
        }
    }

    /// Both ends of the slot must be inside the contracted hours.
    pub fn covers_slot(&self, slot: &TimeSlot) -> bool {
        self.is_available(slot.weekday, slot.start) && self.is_available(slot.weekday, slot.end)
    }

    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.map(|birth| age_on(birth, today))
    }

    /// Certifications without expiry or expiring after `today`.
    pub fn valid_certifications(&self, today: NaiveDate) -> Vec<&Certification> {
        self.certifications
            .iter()
            .filter(|c| c.expires_on.is_none_or(|expiry| expiry > today))
            .collect()
    }

    pub fn add_certification(&mut self, certification: Certification) -> AppResult<()> {
        if let Some(expiry) = certification.expires_on {
            if expiry <= certification.obtained_on {
                return Err(AppError::Validation(format!(
                    "Certification '{}' expires before it was obtained",
                    certification.name
                )));
            }
        }
        self.certifications.push(certification);
        Ok(())
    }

    /// Specialties behave as a set; returns false when already present.
    pub fn add_specialty(&mut self, specialty: Specialty) -> bool {
        if self.specialties.contains(&specialty) {
            return false;
        }
        self.specialties.push(specialty);
        self.specialties.sort();
        true
    }

    pub fn terminate(&mut self, reason: impl Into<String>, today: NaiveDate) -> AppResult<()> {
        if !self.active {
            return Err(AppError::invalid_transition("Teacher", "terminated", "terminate"));
        }
        self.active = false;
        self.terminated_on = Some(today);
        self.termination_reason = Some(reason.into());
        Ok(())
    }

    pub fn reactivate(&mut self) -> AppResult<()> {
        if self.active {
            return Err(AppError::invalid_transition("Teacher", "active", "reactivate"));
        }
        self.active = true;
        self.terminated_on = None;
        self.termination_reason = None;
        Ok(())
    }
}

/// Active teachers whose contracted hours cover `time` on `weekday`.
pub fn available_teachers(teachers: &[Teacher], weekday: u8, time: TimeOfDay) -> Vec<&Teacher> {
    teachers
        .iter()
        .filter(|t| t.active && t.is_available(weekday, time))
        .collect()
}
