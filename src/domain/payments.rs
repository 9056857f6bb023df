use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Adjustment, AdjustmentInput, BillingPeriod, CreatePaymentRequest, DelinquencyEntry, Interest, MonthlyRevenue,
    Payment, PaymentAction, PaymentHistoryEntry, PaymentMethod, PaymentMethodKind, PaymentStatus, RevenueByMethod,
};
use crate::utils::{days_after, round2};

impl PaymentMethod {
    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            PaymentMethod::Card { .. } => PaymentMethodKind::Card,
            PaymentMethod::BankSlip { .. } => PaymentMethodKind::BankSlip,
            PaymentMethod::Pix { .. } => PaymentMethodKind::Pix,
            PaymentMethod::Transfer { .. } => PaymentMethodKind::Transfer,
            PaymentMethod::Cash => PaymentMethodKind::Cash,
        }
    }
}

impl BillingPeriod {
    pub fn new(month: u32, year: i32) -> AppResult<Self> {
        let period = BillingPeriod { month, year };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(1..=12).contains(&self.month) || !(2020..=2100).contains(&self.year) {
            return Err(AppError::Validation(format!(
                "Invalid billing period {:02}/{}",
                self.month, self.year
            )));
        }
        Ok(())
    }

    /// Reads an optional `MONTH YEAR` pair given as text. A missing value
    /// defaults to the month or year of `today`; a malformed one is an error.
    pub fn from_args(month: Option<&str>, year: Option<&str>, today: NaiveDate) -> AppResult<Self> {
        let month = match month {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Validation(format!("Invalid billing month '{}'", raw)))?,
            None => today.month(),
        };
        let year = match year {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Validation(format!("Invalid billing year '{}'", raw)))?,
            None => today.year(),
        };
        BillingPeriod::new(month, year)
    }
}

impl Adjustment {
    /// A non-zero flat amount wins over the percentage of `base`.
    fn resolve(&self, base: f64) -> f64 {
        if self.amount > 0.0 {
            self.amount
        } else if self.percent > 0.0 {
            base * self.percent / 100.0
        } else {
            0.0
        }
    }
}

fn adjustment_from(input: AdjustmentInput, reason: Option<String>) -> AppResult<Adjustment> {
    match input {
        AdjustmentInput::Amount(amount) => {
            if !(amount >= 0.0) {
                return Err(AppError::Validation(format!("Amount cannot be negative, got {}", amount)));
            }
            Ok(Adjustment {
                amount,
                percent: 0.0,
                reason,
            })
        }
        AdjustmentInput::Percent(percent) => {
            if !(0.0..=100.0).contains(&percent) {
                return Err(AppError::Validation(format!(
                    "Percentage must be between 0 and 100, got {}",
                    percent
                )));
            }
            Ok(Adjustment {
                amount: 0.0,
                percent,
                reason,
            })
        }
    }
}

impl Payment {
    pub fn create(request: CreatePaymentRequest, created_by: Uuid, now: DateTime<Utc>) -> AppResult<Self> {
        if request.description.trim().is_empty() {
            return Err(AppError::Validation("Payment description is required".to_string()));
        }
        if !(request.original_amount > 0.0) {
            return Err(AppError::Validation(format!(
                "Payment amount must be positive, got {}",
                request.original_amount
            )));
        }
        request.period.validate()?;

        let mut payment = Payment {
            id: Uuid::new_v4(),
            version: 0,
            student_id: request.student_id,
            plan_id: request.plan_id,
            guardian_id: request.guardian_id,
            description: request.description.trim().to_string(),
            original_amount: round2(request.original_amount),
            discount: Adjustment::default(),
            late_fee: Adjustment::default(),
            interest: Interest::default(),
            total: 0.0,
            due_date: request.due_date,
            paid_at: None,
            period: request.period,
            status: PaymentStatus::Pending,
            method: request.method,
            history: Vec::new(),
            created_by,
            processed_by: None,
        };
        payment.recompute();
        payment.log(PaymentAction::Created, PaymentStatus::Pending, Some(created_by), None, now);
        Ok(payment)
    }

    pub fn discount_amount(&self) -> f64 {
        self.discount.resolve(self.original_amount)
    }

    pub fn late_fee_amount(&self) -> f64 {
        self.late_fee.resolve(self.original_amount)
    }

    /// Flat interest, or the monthly percentage accrued per day late.
    pub fn interest_amount(&self) -> f64 {
        if self.interest.amount > 0.0 {
            self.interest.amount
        } else if self.interest.percent > 0.0 && self.interest.days_late > 0 {
            self.original_amount * (self.interest.percent / 100.0) / 30.0 * self.interest.days_late as f64
        } else {
            0.0
        }
    }

    /// `original - discount + late fee + interest`, in cents.
    pub fn compute_total(&self) -> f64 {
        round2(self.original_amount - self.discount_amount() + self.late_fee_amount() + self.interest_amount())
    }

    pub fn recompute(&mut self) {
        self.total = self.compute_total();
    }

    pub fn accrues_interest(&self) -> bool {
        !matches!(
            self.status,
            PaymentStatus::Paid | PaymentStatus::Cancelled | PaymentStatus::Refunded
        )
    }

    pub fn is_late(&self, today: NaiveDate) -> bool {
        self.accrues_interest() && today > self.due_date
    }

    pub fn days_late(&self, today: NaiveDate) -> u32 {
        if self.is_late(today) {
            days_after(self.due_date, today) as u32
        } else {
            0
        }
    }

    fn log(
        &mut self,
        action: PaymentAction,
        previous_status: PaymentStatus,
        actor: Option<Uuid>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.history.push(PaymentHistoryEntry {
            at: now,
            actor,
            action,
            previous_status,
            new_status: self.status,
            note,
        });
    }

    fn ensure_adjustable(&self, action: &'static str) -> AppResult<()> {
        if matches!(
            self.status,
            PaymentStatus::Paid | PaymentStatus::Cancelled | PaymentStatus::Refunded
        ) {
            return Err(AppError::invalid_transition("Payment", self.status, action));
        }
        Ok(())
    }

    /// Flips a late pending charge to overdue and accrues interest at
    /// `monthly_interest_percent` per 30 days. Returns whether anything changed.
    pub fn refresh(&mut self, today: NaiveDate, monthly_interest_percent: f64, now: DateTime<Utc>) -> bool {
        let before = (self.status, self.total, self.interest.days_late);

        if self.status == PaymentStatus::Pending && today > self.due_date {
            let previous = self.status;
            self.status = PaymentStatus::Overdue;
            self.log(PaymentAction::MarkedOverdue, previous, None, None, now);
        }
        if self.accrues_interest() {
            let days_late = self.days_late(today);
            self.interest.days_late = days_late;
            if days_late > 0 && self.interest.amount == 0.0 && self.interest.percent == 0.0 {
                self.interest.percent = monthly_interest_percent;
            }
        }
        self.recompute();

        before != (self.status, self.total, self.interest.days_late)
    }

    pub fn confirm(&mut self, method: PaymentMethod, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if !matches!(
            self.status,
            PaymentStatus::Pending | PaymentStatus::Overdue | PaymentStatus::UnderReview
        ) {
            return Err(AppError::invalid_transition("Payment", self.status, "confirm"));
        }
        let previous = self.status;
        let note = format!("Payment confirmed via {:?}", method.kind());
        self.status = PaymentStatus::Paid;
        self.paid_at = Some(now);
        self.processed_by = Some(actor);
        self.method = method;
        self.recompute();
        self.log(PaymentAction::PaymentConfirmed, previous, Some(actor), Some(note), now);
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        match self.status {
            PaymentStatus::Cancelled => {
                return Err(AppError::AlreadyCancelled {
                    entity: "Payment",
                    id: self.id,
                });
            }
            PaymentStatus::Paid | PaymentStatus::Refunded => {
                return Err(AppError::invalid_transition("Payment", self.status, "cancel"));
            }
            _ => {}
        }
        let previous = self.status;
        self.status = PaymentStatus::Cancelled;
        self.recompute();
        self.log(PaymentAction::Cancelled, previous, Some(actor), Some(reason.into()), now);
        Ok(())
    }

    pub fn refund(&mut self, reason: impl Into<String>, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != PaymentStatus::Paid {
            return Err(AppError::invalid_transition("Payment", self.status, "refund"));
        }
        let previous = self.status;
        self.status = PaymentStatus::Refunded;
        self.processed_by = Some(actor);
        self.log(PaymentAction::Refunded, previous, Some(actor), Some(reason.into()), now);
        Ok(())
    }

    pub fn flag_for_review(&mut self, note: impl Into<String>, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if !matches!(self.status, PaymentStatus::Pending | PaymentStatus::Overdue) {
            return Err(AppError::invalid_transition("Payment", self.status, "flag for review"));
        }
        let previous = self.status;
        self.status = PaymentStatus::UnderReview;
        self.log(PaymentAction::FlaggedForReview, previous, Some(actor), Some(note.into()), now);
        Ok(())
    }

    pub fn apply_discount(
        &mut self,
        input: AdjustmentInput,
        reason: Option<String>,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_adjustable("discount")?;
        let discount = adjustment_from(input, reason.clone())?;
        if discount.resolve(self.original_amount) > self.original_amount {
            return Err(AppError::Validation(format!(
                "Discount of {} exceeds the original amount {}",
                discount.amount, self.original_amount
            )));
        }
        let previous = self.status;
        self.discount = discount;
        self.recompute();
        self.log(PaymentAction::DiscountApplied, previous, Some(actor), reason, now);
        Ok(())
    }

    pub fn apply_late_fee(
        &mut self,
        input: AdjustmentInput,
        reason: Option<String>,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_adjustable("apply a late fee to")?;
        let late_fee = adjustment_from(input, reason.clone())?;
        let previous = self.status;
        self.late_fee = late_fee;
        self.recompute();
        self.log(PaymentAction::LateFeeApplied, previous, Some(actor), reason, now);
        Ok(())
    }

    pub fn add_note(&mut self, note: impl Into<String>, actor: Uuid, now: DateTime<Utc>) {
        let status = self.status;
        self.log(PaymentAction::NoteAdded, status, Some(actor), Some(note.into()), now);
    }
}

/// Paid charges of a billing period grouped by settlement method.
pub fn monthly_revenue(payments: &[Payment], period: BillingPeriod) -> MonthlyRevenue {
    let mut by_method: BTreeMap<PaymentMethodKind, (u32, f64)> = BTreeMap::new();
    for payment in payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid && p.period == period)
    {
        let slot = by_method.entry(payment.method.kind()).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += payment.total;
    }

    let by_method: Vec<RevenueByMethod> = by_method
        .into_iter()
        .map(|(method, (count, total))| RevenueByMethod {
            method,
            count,
            total: round2(total),
        })
        .collect();
    MonthlyRevenue {
        period,
        total: round2(by_method.iter().map(|m| m.total).sum()),
        paid_count: by_method.iter().map(|m| m.count).sum(),
        by_method,
    }
}

/// Unpaid charges past their due date, grouped per student, largest debt first.
pub fn delinquency(payments: &[Payment], today: NaiveDate) -> Vec<DelinquencyEntry> {
    let mut by_student: HashMap<Uuid, DelinquencyEntry> = HashMap::new();
    for payment in payments.iter().filter(|p| {
        matches!(p.status, PaymentStatus::Pending | PaymentStatus::Overdue) && p.due_date < today
    }) {
        let entry = by_student.entry(payment.student_id).or_insert(DelinquencyEntry {
            student_id: payment.student_id,
            overdue_count: 0,
            total_due: 0.0,
            oldest_due_date: payment.due_date,
        });
        entry.overdue_count += 1;
        entry.total_due = round2(entry.total_due + payment.total);
        entry.oldest_due_date = entry.oldest_due_date.min(payment.due_date);
    }

    let mut entries: Vec<DelinquencyEntry> = by_student.into_values().collect();
    entries.sort_by(|a, b| {
        b.total_due
            .total_cmp(&a.total_due)
            .then(a.oldest_due_date.cmp(&b.oldest_due_date))
    });
    entries
}
