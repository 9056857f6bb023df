use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{CreatePlanRequest, Plan, PlanDiscount, PlanModality, Promotion, PromotionStatus};
use crate::utils::{round1, round2};

impl Promotion {
    fn covers(&self, today: NaiveDate) -> bool {
        self.starts_on.is_none_or(|start| today >= start) && self.ends_on.is_none_or(|end| today <= end)
    }

    fn validate(&self) -> AppResult<()> {
        if let (Some(start), Some(end)) = (self.starts_on, self.ends_on) {
            if end <= start {
                return Err(AppError::Validation("Promotion must end after it starts".to_string()));
            }
        }
        Ok(())
    }
}

impl Plan {
    pub fn create(request: CreatePlanRequest) -> AppResult<Self> {
        let plan = Plan {
            id: Uuid::new_v4(),
            version: 0,
            name: request.name.trim().to_string(),
            description: request.description,
            kind: request.kind,
            modality: request.modality,
            price: request.price,
            promotional_price: request.promotional_price,
            duration_months: request.duration_months,
            sessions_per_week: request.sessions_per_week,
            session_minutes: request.session_minutes,
            age_range: request.age_range,
            promotion: request.promotion,
            policy: request.policy,
            limits: request.limits,
            category: request.category,
            billing_day: request.billing_day,
            active: true,
            discontinued_on: None,
            discontinuation_reason: None,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.is_empty() {
            return Err(AppError::Validation("Plan name is required".to_string()));
        }
        if !(self.price >= 0.0) {
            return Err(AppError::Validation(format!("Plan price cannot be negative, got {}", self.price)));
        }
        if let Some(promo) = self.promotional_price {
            if !(promo >= 0.0 && promo < self.price) {
                return Err(AppError::Validation(format!(
                    "Promotional price {} must be below the regular price {}",
                    promo, self.price
                )));
            }
        }
        if self.duration_months == 0 {
            return Err(AppError::Validation("Plan duration must be at least one month".to_string()));
        }
        if !(1..=7).contains(&self.sessions_per_week) {
            return Err(AppError::Validation(format!(
                "Sessions per week must be between 1 and 7, got {}",
                self.sessions_per_week
            )));
        }
        if !(30..=120).contains(&self.session_minutes) {
            return Err(AppError::Validation(format!(
                "Session length must be between 30 and 120 minutes, got {}",
                self.session_minutes
            )));
        }
        if let Some(day) = self.billing_day {
            if !(1..=31).contains(&day) {
                return Err(AppError::Validation(format!("Billing day must be between 1 and 31, got {}", day)));
            }
        }
        self.age_range.validate()?;
        self.promotion.validate()
    }

    /// Promotional price when the promotion is switched on and `today` is in
    /// its window; the regular price otherwise.
    pub fn effective_price(&self, today: NaiveDate) -> f64 {
        match self.promotional_price {
            Some(promo) if self.promotion.active && self.promotion.covers(today) => promo,
            _ => self.price,
        }
    }

    /// Effective price spread over four weeks per month of duration.
    pub fn price_per_session(&self, today: NaiveDate) -> f64 {
        let sessions = self.sessions_per_week * 4 * self.duration_months;
        if sessions == 0 {
            return 0.0;
        }
        round2(self.effective_price(today) / sessions as f64)
    }

    pub fn discount_percent(&self) -> f64 {
        match self.promotional_price {
            Some(promo) if promo < self.price && self.price > 0.0 => round1((self.price - promo) / self.price * 100.0),
            _ => 0.0,
        }
    }

    pub fn promotion_status(&self, today: NaiveDate) -> PromotionStatus {
        if !self.promotion.active {
            return PromotionStatus::Inactive;
        }
        if self.promotion.starts_on.is_some_and(|start| today < start) {
            return PromotionStatus::Scheduled;
        }
        if self.promotion.ends_on.is_some_and(|end| today > end) {
            return PromotionStatus::Expired;
        }
        PromotionStatus::Active
    }

    pub fn hours_per_month(&self) -> f64 {
        round1((self.sessions_per_week * 4 * self.session_minutes) as f64 / 60.0)
    }

    pub fn accepts_age(&self, age: u32) -> bool {
        self.age_range.contains(age)
    }

    pub fn offers(&self, modality: PlanModality) -> bool {
        self.modality == modality || self.modality == PlanModality::All
    }

    pub fn price_with_discount(&self, discount: PlanDiscount, today: NaiveDate) -> f64 {
        let base = self.effective_price(today);
        let discounted = match discount {
            PlanDiscount::Percent(pct) => base * (1.0 - pct / 100.0),
            PlanDiscount::Fixed(amount) => base - amount,
        };
        round2(discounted.max(0.0))
    }

    pub fn activate_promotion(&mut self, mut promotion: Promotion) -> AppResult<()> {
        if self.promotional_price.is_none() {
            return Err(AppError::Validation("Set a promotional price before activating a promotion".to_string()));
        }
        promotion.active = true;
        promotion.validate()?;
        self.promotion = promotion;
        Ok(())
    }

    pub fn deactivate_promotion(&mut self) {
        self.promotion.active = false;
    }

    pub fn discontinue(&mut self, reason: impl Into<String>, today: NaiveDate) -> AppResult<()> {
        if !self.active {
            return Err(AppError::invalid_transition("Plan", "discontinued", "discontinue"));
        }
        self.active = false;
        self.discontinued_on = Some(today);
        self.discontinuation_reason = Some(reason.into());
        Ok(())
    }

    pub fn reactivate(&mut self) -> AppResult<()> {
        if self.active {
            return Err(AppError::invalid_transition("Plan", "active", "reactivate"));
        }
        self.active = true;
        self.discontinued_on = None;
        self.discontinuation_reason = None;
        Ok(())
    }
}

/// Active plans whose promotion is running on `today`.
pub fn plans_on_promotion(plans: &[Plan], today: NaiveDate) -> Vec<&Plan> {
    plans
        .iter()
        .filter(|p| p.active && p.promotion_status(today) == PromotionStatus::Active)
        .collect()
}
