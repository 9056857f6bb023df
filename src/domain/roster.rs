use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use log::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Class, ClassStatistics, CreateClassRequest, NextSession, OccupancyStatus, TimeOfDay, TimeSlot, WaitlistEntry,
};
use crate::utils::{round1, weekday_of};

pub const MAX_CLASS_CAPACITY: u32 = 50;

/// Two weekly slots conflict when they share a weekday and their half-open
/// `[start, end)` intervals overlap. Adjacent slots do not conflict.
pub fn slots_conflict(a: &TimeSlot, b: &TimeSlot) -> bool {
    a.weekday == b.weekday && intervals_overlap(a.start, a.end, b.start, b.end)
}

pub fn intervals_overlap(a_start: TimeOfDay, a_end: TimeOfDay, b_start: TimeOfDay, b_end: TimeOfDay) -> bool {
    !(a_end <= b_start || b_end <= a_start)
}

/// Rebuilds each slot so `duration_minutes` is always derived from its ends.
fn normalise_slots(slots: Vec<TimeSlot>) -> AppResult<Vec<TimeSlot>> {
    slots
        .into_iter()
        .map(|s| TimeSlot::new(s.weekday, s.start, s.end))
        .collect()
}

impl Class {
    pub fn create(request: CreateClassRequest) -> AppResult<Self> {
        let class = Class {
            id: Uuid::new_v4(),
            version: 0,
            name: request.name.trim().to_string(),
            description: request.description,
            age_range: request.age_range,
            level: request.level,
            modality: request.modality,
            slots: normalise_slots(request.slots)?,
            teacher_id: request.teacher_id,
            substitute_teacher_id: request.substitute_teacher_id,
            capacity: request.capacity,
            enrolled: Vec::new(),
            waitlist: Vec::new(),
            venue: request.venue,
            settings: request.settings,
            active: true,
            starts_on: request.starts_on,
            ended_on: None,
            close_reason: None,
            statistics: ClassStatistics::default(),
        };
        class.validate()?;
        Ok(class)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.is_empty() || self.name.chars().count() > 100 {
            return Err(AppError::Validation("Class name must have between 1 and 100 characters".to_string()));
        }
        if self.capacity == 0 || self.capacity > MAX_CLASS_CAPACITY {
            return Err(AppError::Validation(format!(
                "Capacity must be between 1 and {}, got {}",
                MAX_CLASS_CAPACITY, self.capacity
            )));
        }
        if self.enrolled.len() > self.capacity as usize {
            return Err(AppError::Validation(format!(
                "Capacity {} is below the {} students already enrolled",
                self.capacity,
                self.enrolled.len()
            )));
        }
        self.age_range.validate()?;
        if self.slots.is_empty() {
            return Err(AppError::Validation("A class needs at least one weekly slot".to_string()));
        }
        for slot in &self.slots {
            TimeSlot::new(slot.weekday, slot.start, slot.end)?;
        }
        for (i, a) in self.slots.iter().enumerate() {
            if self.slots[i + 1..].iter().any(|b| slots_conflict(a, b)) {
                return Err(AppError::Validation(format!(
                    "Slots of class '{}' overlap on weekday {}",
                    self.name, a.weekday
                )));
            }
        }
        if let Some(lane) = self.venue.lane {
            if !(1..=8).contains(&lane) {
                return Err(AppError::Validation(format!("Lane must be between 1 and 8, got {}", lane)));
            }
        }
        Ok(())
    }

    pub fn set_slots(&mut self, slots: Vec<TimeSlot>) -> AppResult<()> {
        self.slots = normalise_slots(slots)?;
        self.validate()
    }

    pub fn has_conflict_with(&self, slot: &TimeSlot) -> bool {
        self.slots.iter().any(|own| slots_conflict(own, slot))
    }

    pub fn is_taught_by(&self, teacher_id: Uuid) -> bool {
        self.teacher_id == teacher_id || self.substitute_teacher_id == Some(teacher_id)
    }

    pub fn is_enrolled(&self, student_id: Uuid) -> bool {
        self.enrolled.contains(&student_id)
    }

    pub fn is_waitlisted(&self, student_id: Uuid) -> bool {
        self.waitlist.iter().any(|e| e.student_id == student_id)
    }

    pub fn enroll(&mut self, student_id: Uuid) -> AppResult<()> {
        if !self.active {
            return Err(AppError::invalid_transition("Class", "closed", "enroll into"));
        }
        if self.enrolled.len() >= self.capacity as usize {
            return Err(AppError::CapacityExceeded {
                class_id: self.id,
                capacity: self.capacity,
            });
        }
        if self.is_enrolled(student_id) {
            return Err(AppError::AlreadyEnrolled {
                class_id: self.id,
                student_id,
            });
        }
        self.enrolled.push(student_id);
        self.waitlist.retain(|e| e.student_id != student_id);
        Ok(())
    }

    /// Removes the student and returns the waitlist head, if any. The
    /// candidate stays on the waitlist until promoted explicitly.
    pub fn unenroll(&mut self, student_id: Uuid) -> AppResult<Option<WaitlistEntry>> {
        let index = self
            .enrolled
            .iter()
            .position(|id| *id == student_id)
            .ok_or(AppError::NotEnrolled {
                class_id: self.id,
                student_id,
            })?;
        self.enrolled.remove(index);

        let candidate = self.next_candidate().cloned();
        if let Some(entry) = &candidate {
            debug!(
                "Class {} has a free seat; next waitlist candidate is {} (priority {})",
                self.id, entry.student_id, entry.priority
            );
        }
        Ok(candidate)
    }

    /// Highest priority first, then earliest join time.
    pub fn next_candidate(&self) -> Option<&WaitlistEntry> {
        self.waitlist
            .iter()
            .min_by(|a, b| b.priority.cmp(&a.priority).then(a.joined_at.cmp(&b.joined_at)))
    }

    pub fn add_to_waitlist(&mut self, student_id: Uuid, priority: Option<i32>, now: DateTime<Utc>) -> AppResult<()> {
        if !self.settings.allow_waitlist {
            return Err(AppError::WaitlistDisabled { class_id: self.id });
        }
        if self.is_waitlisted(student_id) {
            return Err(AppError::AlreadyWaitlisted {
                class_id: self.id,
                student_id,
            });
        }
        if self.is_enrolled(student_id) {
            return Err(AppError::AlreadyEnrolled {
                class_id: self.id,
                student_id,
            });
        }
        self.waitlist.push(WaitlistEntry {
            student_id,
            priority: priority.unwrap_or(1),
            joined_at: now,
        });
        Ok(())
    }

    pub fn remove_from_waitlist(&mut self, student_id: Uuid) -> AppResult<WaitlistEntry> {
        let index = self
            .waitlist
            .iter()
            .position(|e| e.student_id == student_id)
            .ok_or(AppError::NotFound {
                entity: "Waitlist entry",
                id: student_id,
            })?;
        Ok(self.waitlist.remove(index))
    }

    pub fn enrolled_count(&self) -> u32 {
        self.enrolled.len() as u32
    }

    pub fn open_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled_count())
    }

    pub fn has_open_seats(&self) -> bool {
        self.active && self.open_seats() > 0
    }

    /// Percentage of seats taken, one decimal.
    pub fn occupancy_rate(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        round1(self.enrolled_count() as f64 / self.capacity as f64 * 100.0)
    }

    pub fn occupancy_status(&self, nearly_full_ratio: f64) -> OccupancyStatus {
        let enrolled = self.enrolled_count();
        if !self.active {
            OccupancyStatus::Inactive
        } else if enrolled == 0 {
            OccupancyStatus::Empty
        } else if enrolled >= self.capacity {
            OccupancyStatus::Full
        } else if enrolled as f64 >= self.capacity as f64 * nearly_full_ratio {
            OccupancyStatus::NearlyFull
        } else {
            OccupancyStatus::Available
        }
    }

    pub fn accepts_age(&self, age: u32) -> bool {
        self.settings.flexible_age || self.age_range.contains(age)
    }

    /// First slot starting strictly after `now`, looking up to one week ahead.
    pub fn next_session(&self, now: DateTime<Utc>) -> Option<NextSession> {
        let today = now.date_naive();
        let today_weekday = weekday_of(today) as i64;
        let minute_now = (now.hour() * 60 + now.minute()) as u16;

        self.slots
            .iter()
            .map(|slot| {
                let mut days_ahead = (slot.weekday as i64 - today_weekday).rem_euclid(7);
                if days_ahead == 0 && slot.start.minutes() <= minute_now {
                    days_ahead = 7;
                }
                (days_ahead, slot)
            })
            .min_by_key(|(days_ahead, slot)| (*days_ahead, slot.start))
            .map(|(days_ahead, slot)| NextSession {
                weekday: slot.weekday,
                start: slot.start,
                end: slot.end,
                date: today + Duration::days(days_ahead),
            })
    }

    /// True when some slot is running at `time` on `weekday`.
    pub fn runs_at(&self, weekday: u8, time: TimeOfDay) -> bool {
        self.slots
            .iter()
            .any(|s| s.weekday == weekday && s.start <= time && time < s.end)
    }

    pub fn close(&mut self, reason: impl Into<String>, today: NaiveDate) -> AppResult<()> {
        if !self.active {
            return Err(AppError::invalid_transition("Class", "closed", "close"));
        }
        self.active = false;
        self.ended_on = Some(today);
        self.close_reason = Some(reason.into());
        Ok(())
    }

    pub fn reopen(&mut self) -> AppResult<()> {
        if self.active {
            return Err(AppError::invalid_transition("Class", "active", "reopen"));
        }
        self.active = true;
        self.ended_on = None;
        self.close_reason = None;
        Ok(())
    }

    pub fn record_statistics(&mut self, total_lessons: u32, average_attendance: f64, now: DateTime<Utc>) {
        self.statistics = ClassStatistics {
            total_lessons,
            average_attendance: round1(average_attendance),
            updated_at: Some(now),
        };
    }
}

/// Finds the first existing class of the same teacher whose slots collide
/// with any of `slots`. Closed classes and `exclude` are ignored.
pub fn find_teacher_conflict<'a>(
    existing: &'a [Class],
    teacher_id: Uuid,
    slots: &[TimeSlot],
    exclude: Option<Uuid>,
) -> Option<(&'a Class, TimeSlot)> {
    existing
        .iter()
        .filter(|c| c.active && c.teacher_id == teacher_id && Some(c.id) != exclude)
        .find_map(|c| slots.iter().find(|s| c.has_conflict_with(s)).map(|s| (c, *s)))
}
