use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Clauses, Contract, ContractAction, ContractHistoryEntry, ContractStatus, ContractStatusCount, ContractTerm,
    CreateContractRequest, GeoLocation, GuardianSignature, IntegrityReport, SchoolSignature, SignatureStatus,
    Signatures, SpecificTerms, TermKind, Witness, validate_cpf,
};
use crate::utils::add_months;

pub const TEMPLATE_VERSION: &str = "1.0";

impl ContractTerm {
    /// Length in months, `None` for indefinite terms.
    pub fn months(&self) -> Option<u32> {
        let default = match self.kind {
            TermKind::Monthly => 1,
            TermKind::Quarterly => 3,
            TermKind::Semiannual => 6,
            TermKind::Annual => 12,
            TermKind::Indefinite => return None,
        };
        Some(self.months.filter(|m| *m > 0).unwrap_or(default))
    }

    pub fn end_date(&self, start: NaiveDate) -> Option<NaiveDate> {
        self.months().map(|months| add_months(start, months))
    }
}

/// `CT` + year + six random digits.
pub fn generate_number<R: Rng>(year: i32, rng: &mut R) -> String {
    format!("CT{}{:06}", year, rng.gen_range(0..1_000_000))
}

#[derive(Serialize)]
struct HashedContent<'a> {
    student_id: Uuid,
    plan_id: Uuid,
    clauses: &'a Clauses,
    specific_terms: &'a SpecificTerms,
}

/// Hex SHA-256 of the canonical JSON of the immutable contract content.
pub fn content_hash(
    student_id: Uuid,
    plan_id: Uuid,
    clauses: &Clauses,
    specific_terms: &SpecificTerms,
) -> AppResult<String> {
    let canonical = serde_json::to_vec(&HashedContent {
        student_id,
        plan_id,
        clauses,
        specific_terms,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

fn validate_clauses(clauses: &Clauses) -> AppResult<()> {
    if !(clauses.monthly_amount > 0.0) {
        return Err(AppError::Validation(format!(
            "Monthly amount must be positive, got {}",
            clauses.monthly_amount
        )));
    }
    if !(1..=31).contains(&clauses.due_day) {
        return Err(AppError::Validation(format!(
            "Due day must be between 1 and 31, got {}",
            clauses.due_day
        )));
    }
    for (label, percent) in [("late fee", clauses.late_fee.percent), ("interest", clauses.interest.percent)] {
        if !(0.0..=100.0).contains(&percent) {
            return Err(AppError::Validation(format!(
                "The {} rate must be between 0 and 100, got {}",
                label, percent
            )));
        }
    }
    Ok(())
}

impl Contract {
    pub fn create<R: Rng>(
        request: CreateContractRequest,
        created_by: Uuid,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> AppResult<Self> {
        validate_clauses(&request.clauses)?;
        validate_cpf(&request.contracting_party.cpf)?;
        for witness in &request.witnesses {
            validate_cpf(&witness.cpf)?;
        }

        let content_hash = content_hash(
            request.student_id,
            request.plan_id,
            &request.clauses,
            &request.specific_terms,
        )?;
        let end_date = request.term.end_date(request.start_date);
        let mut auto_renewal = request.auto_renewal;
        if auto_renewal.active && auto_renewal.next_renewal_on.is_none() {
            auto_renewal.next_renewal_on = end_date;
        }

        let mut contract = Contract {
            id: Uuid::new_v4(),
            version: 0,
            number: generate_number(now.year(), rng),
            kind: request.kind,
            student_id: request.student_id,
            guardian_id: request.guardian_id,
            plan_id: request.plan_id,
            start_date: request.start_date,
            end_date,
            term: request.term,
            contracting_party: request.contracting_party,
            contracted_party: request.contracted_party,
            clauses: request.clauses,
            specific_terms: request.specific_terms,
            signatures: Signatures {
                witnesses: request.witnesses,
                ..Signatures::default()
            },
            status: ContractStatus::Draft,
            history: Vec::new(),
            content_hash,
            template_version: TEMPLATE_VERSION.to_string(),
            auto_renewal,
            created_by,
            created_at: now,
        };
        contract.log(ContractAction::Created, ContractStatus::Draft, Some(created_by), None, None, now);
        Ok(contract)
    }

    pub fn signature_status(&self) -> SignatureStatus {
        match (self.signatures.guardian.signed, self.signatures.school.signed) {
            (true, true) => SignatureStatus::Complete,
            (true, false) => SignatureStatus::PartialGuardian,
            (false, true) => SignatureStatus::PartialSchool,
            (false, false) => SignatureStatus::Pending,
        }
    }

    fn log(
        &mut self,
        action: ContractAction,
        previous_status: ContractStatus,
        actor: Option<Uuid>,
        note: Option<String>,
        ip: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.history.push(ContractHistoryEntry {
            at: now,
            actor,
            action,
            previous_status,
            new_status: self.status,
            note,
            ip,
        });
    }

    fn ensure_signable(&self) -> AppResult<()> {
        if !matches!(self.status, ContractStatus::Draft | ContractStatus::AwaitingSignature) {
            return Err(AppError::invalid_transition("Contract", self.status, "sign"));
        }
        Ok(())
    }

    fn status_after_signature(&self) -> ContractStatus {
        if self.signature_status() == SignatureStatus::Complete {
            ContractStatus::Signed
        } else {
            ContractStatus::AwaitingSignature
        }
    }

    pub fn sign_as_guardian(
        &mut self,
        signature: String,
        ip: Option<String>,
        location: Option<GeoLocation>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.signatures.guardian.signed {
            return Err(AppError::AlreadySigned { party: "guardian" });
        }
        self.ensure_signable()?;

        let previous = self.status;
        self.signatures.guardian = GuardianSignature {
            signed: true,
            signed_at: Some(now),
            ip: ip.clone(),
            signature: Some(signature),
            location,
        };
        self.status = self.status_after_signature();
        let guardian_id = self.guardian_id;
        self.log(
            ContractAction::GuardianSigned,
            previous,
            Some(guardian_id),
            Some("Signed by the guardian".to_string()),
            ip,
            now,
        );
        Ok(())
    }

    pub fn sign_as_school(
        &mut self,
        signer_id: Uuid,
        signer_role: impl Into<String>,
        signature: String,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.signatures.school.signed {
            return Err(AppError::AlreadySigned { party: "school" });
        }
        self.ensure_signable()?;

        let previous = self.status;
        self.signatures.school = SchoolSignature {
            signed: true,
            signed_at: Some(now),
            signed_by: Some(signer_id),
            signer_role: Some(signer_role.into()),
            signature: Some(signature),
        };
        self.status = self.status_after_signature();
        self.log(
            ContractAction::SchoolSigned,
            previous,
            Some(signer_id),
            Some("Signed by the school".to_string()),
            None,
            now,
        );
        Ok(())
    }

    pub fn add_witness(&mut self, witness: Witness) -> AppResult<()> {
        self.ensure_signable()?;
        validate_cpf(&witness.cpf)?;
        if self.signatures.witnesses.iter().any(|w| w.cpf == witness.cpf) {
            return Err(AppError::Duplicate {
                field: "witness.cpf".to_string(),
                value: witness.cpf,
            });
        }
        self.signatures.witnesses.push(witness);
        Ok(())
    }

    pub fn activate(&mut self, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ContractStatus::Signed || self.signature_status() != SignatureStatus::Complete {
            return Err(AppError::invalid_transition("Contract", self.status, "activate"));
        }
        let previous = self.status;
        self.status = ContractStatus::Active;
        self.log(ContractAction::Activated, previous, Some(actor), None, None, now);
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if self.status == ContractStatus::Cancelled {
            return Err(AppError::AlreadyCancelled {
                entity: "Contract",
                id: self.id,
            });
        }
        let previous = self.status;
        self.status = ContractStatus::Cancelled;
        self.auto_renewal.active = false;
        self.log(ContractAction::Cancelled, previous, Some(actor), Some(reason.into()), None, now);
        Ok(())
    }

    pub fn suspend(&mut self, reason: impl Into<String>, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ContractStatus::Active {
            return Err(AppError::invalid_transition("Contract", self.status, "suspend"));
        }
        let previous = self.status;
        self.status = ContractStatus::Suspended;
        self.log(ContractAction::Suspended, previous, Some(actor), Some(reason.into()), None, now);
        Ok(())
    }

    pub fn resume(&mut self, actor: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ContractStatus::Suspended {
            return Err(AppError::invalid_transition("Contract", self.status, "resume"));
        }
        let previous = self.status;
        self.status = ContractStatus::Active;
        self.log(ContractAction::Resumed, previous, Some(actor), None, None, now);
        Ok(())
    }

    pub fn is_past_end(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| today > end)
    }

    /// Lazily flips an active contract whose term is over to expired.
    pub fn refresh_expiry(&mut self, today: NaiveDate, now: DateTime<Utc>) -> bool {
        if self.status != ContractStatus::Active || !self.is_past_end(today) {
            return false;
        }
        let previous = self.status;
        self.status = ContractStatus::Expired;
        self.log(ContractAction::Expired, previous, None, None, None, now);
        true
    }

    /// End date falls within the next `days` days (today excluded).
    pub fn expires_within(&self, today: NaiveDate, days: i64) -> bool {
        self.end_date
            .is_some_and(|end| end > today && end <= today + Duration::days(days))
    }

    pub fn current_hash(&self) -> AppResult<String> {
        content_hash(self.student_id, self.plan_id, &self.clauses, &self.specific_terms)
    }

    pub fn verify_integrity(&self, now: DateTime<Utc>) -> AppResult<IntegrityReport> {
        let current_hash = self.current_hash()?;
        Ok(IntegrityReport {
            intact: current_hash == self.content_hash,
            stored_hash: self.content_hash.clone(),
            current_hash,
            checked_at: now,
        })
    }
}

/// Active contracts ending within the next `days` days, soonest first.
pub fn expiring_contracts(contracts: &[Contract], today: NaiveDate, days: i64) -> Vec<&Contract> {
    let mut expiring: Vec<&Contract> = contracts
        .iter()
        .filter(|c| c.status == ContractStatus::Active && c.expires_within(today, days))
        .collect();
    expiring.sort_by_key(|c| c.end_date);
    expiring
}

pub fn status_counts(contracts: &[Contract]) -> Vec<ContractStatusCount> {
    [
        ContractStatus::Draft,
        ContractStatus::AwaitingSignature,
        ContractStatus::Signed,
        ContractStatus::Active,
        ContractStatus::Suspended,
        ContractStatus::Cancelled,
        ContractStatus::Expired,
    ]
    .into_iter()
    .map(|status| ContractStatusCount {
        status,
        count: contracts.iter().filter(|c| c.status == status).count() as u32,
    })
    .filter(|c| c.count > 0)
    .collect()
}
