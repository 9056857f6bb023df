use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    BehaviorScores, CreateEvaluationRequest, Evaluation, EvaluationPeriod, EvaluationStatus, EvaluationUpdate,
    FrozenAverages, Grade, PeriodStatistics, StrokeScores, TechniqueScores,
};
use crate::utils::{mean, round2};

impl TechniqueScores {
    pub fn values(&self) -> [Option<f64>; 5] {
        [
            self.breathing.score,
            self.floating.score,
            self.propulsion.score,
            self.coordination.score,
            self.endurance.score,
        ]
    }
}

impl BehaviorScores {
    pub fn values(&self) -> [Option<f64>; 4] {
        [
            self.discipline.score,
            self.participation.score,
            self.relationships.score,
            self.dedication.score,
        ]
    }
}

impl StrokeScores {
    pub fn values(&self) -> [Option<f64>; 4] {
        [
            self.freestyle.score,
            self.backstroke.score,
            self.breaststroke.score,
            self.butterfly.score,
        ]
    }
}

impl Grade {
    pub fn from_average(average: f64) -> Self {
        if average >= 9.0 {
            Grade::Excellent
        } else if average >= 8.0 {
            Grade::VeryGood
        } else if average >= 7.0 {
            Grade::Good
        } else if average >= 6.0 {
            Grade::Regular
        } else if average >= 5.0 {
            Grade::Insufficient
        } else {
            Grade::Inadequate
        }
    }
}

fn check_scores(group: &str, scores: &[Option<f64>]) -> AppResult<()> {
    for score in scores.iter().flatten() {
        if !(0.0..=10.0).contains(score) {
            return Err(AppError::Validation(format!(
                "{} scores must be between 0 and 10, got {}",
                group, score
            )));
        }
    }
    Ok(())
}

impl Evaluation {
    pub fn create(request: CreateEvaluationRequest, teacher_id: Uuid, created_by: Uuid) -> AppResult<Self> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Evaluation title is required".to_string()));
        }
        let evaluation = Evaluation {
            id: Uuid::new_v4(),
            version: 0,
            student_id: request.student_id,
            teacher_id,
            class_id: request.class_id,
            title: request.title.trim().to_string(),
            description: request.description,
            date: request.date,
            period: request.period,
            technique: request.technique,
            strokes: request.strokes,
            behavior: request.behavior,
            goals: request.goals,
            recommendations: request.recommendations,
            averages: None,
            status: EvaluationStatus::Draft,
            created_by,
            sent_at: None,
            viewed_by_guardian: false,
            viewed_at: None,
        };
        evaluation.validate_scores()?;
        Ok(evaluation)
    }

    pub fn validate_scores(&self) -> AppResult<()> {
        check_scores("Technique", &self.technique.values())?;
        check_scores("Behavior", &self.behavior.values())?;
        check_scores("Stroke", &self.strokes.values())
    }

    /// Mean of the set technique scores, two decimals.
    pub fn technical_average(&self) -> Option<f64> {
        mean(self.technique.values()).map(round2)
    }

    pub fn behavioral_average(&self) -> Option<f64> {
        mean(self.behavior.values()).map(round2)
    }

    /// Mean of the two group averages. A group with no scores counts as 0.
    pub fn overall_average(&self) -> f64 {
        let technical = self.technical_average().unwrap_or(0.0);
        let behavioral = self.behavioral_average().unwrap_or(0.0);
        round2((technical + behavioral) / 2.0)
    }

    /// Frozen averages once finalized, live values while a draft.
    pub fn grade(&self) -> Grade {
        let overall = match self.averages {
            Some(frozen) => frozen.overall,
            None => self.overall_average(),
        };
        Grade::from_average(overall)
    }

    pub fn compute_averages(&self) -> FrozenAverages {
        FrozenAverages {
            technical: self.technical_average().unwrap_or(0.0),
            behavioral: self.behavioral_average().unwrap_or(0.0),
            overall: self.overall_average(),
        }
    }

    fn ensure_editable(&self) -> AppResult<()> {
        if self.status == EvaluationStatus::SentToGuardian {
            return Err(AppError::LockedForEditing {
                entity: "Evaluation",
                id: self.id,
            });
        }
        Ok(())
    }

    pub fn apply_update(&mut self, update: EvaluationUpdate) -> AppResult<()> {
        self.ensure_editable()?;

        let mut next = self.clone();
        if let Some(title) = update.title {
            next.title = title;
        }
        if let Some(description) = update.description {
            next.description = Some(description);
        }
        if let Some(technique) = update.technique {
            next.technique = technique;
        }
        if let Some(strokes) = update.strokes {
            next.strokes = strokes;
        }
        if let Some(behavior) = update.behavior {
            next.behavior = behavior;
        }
        if let Some(goals) = update.goals {
            next.goals = goals;
        }
        if let Some(recommendations) = update.recommendations {
            next.recommendations = recommendations;
        }
        next.validate_scores()?;
        if next.averages.is_some() {
            next.averages = Some(next.compute_averages());
        }
        *self = next;
        Ok(())
    }

    pub fn finalize(&mut self) -> AppResult<()> {
        self.ensure_editable()?;
        self.averages = Some(self.compute_averages());
        self.status = EvaluationStatus::Finalized;
        Ok(())
    }

    pub fn send_to_guardian(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status == EvaluationStatus::SentToGuardian {
            return Err(AppError::invalid_transition("Evaluation", self.status, "send"));
        }
        self.finalize()?;
        self.status = EvaluationStatus::SentToGuardian;
        self.sent_at = Some(now);
        Ok(())
    }

    pub fn mark_viewed(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != EvaluationStatus::SentToGuardian {
            return Err(AppError::invalid_transition("Evaluation", self.status, "mark as viewed"));
        }
        if !self.viewed_by_guardian {
            self.viewed_by_guardian = true;
            self.viewed_at = Some(now);
        }
        Ok(())
    }
}

/// Aggregates the frozen averages of non-draft evaluations of a class.
pub fn period_statistics(evaluations: &[Evaluation], class_id: Uuid, period: EvaluationPeriod) -> PeriodStatistics {
    let frozen: Vec<FrozenAverages> = evaluations
        .iter()
        .filter(|e| e.class_id == class_id && e.period == period && e.status != EvaluationStatus::Draft)
        .map(|e| e.averages.unwrap_or_else(|| e.compute_averages()))
        .collect();

    PeriodStatistics {
        count: frozen.len() as u32,
        technical_average: mean(frozen.iter().map(|a| Some(a.technical))).map(round2),
        behavioral_average: mean(frozen.iter().map(|a| Some(a.behavioral))).map(round2),
        overall_average: mean(frozen.iter().map(|a| Some(a.overall))).map(round2),
    }
}

/// Latest `limit` evaluations of a student, newest first.
pub fn student_evolution(evaluations: &[Evaluation], student_id: Uuid, limit: usize) -> Vec<&Evaluation> {
    let mut own: Vec<&Evaluation> = evaluations.iter().filter(|e| e.student_id == student_id).collect();
    own.sort_by(|a, b| b.date.cmp(&a.date));
    own.truncate(limit);
    own
}
