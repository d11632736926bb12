//! Achievement engine — badge catalog and per-student progress.
//!
//! State machine per (student, achievement) pair:
//!   not_started → in_progress (progress > 0) → completed
//! The completed transition is one-way; completed_at is fixed at the
//! first crossing. A repeated sweep with the same metrics snapshot
//! returns no new completions.

use crate::{
    clock::SimClock,
    types::{EntityId, Money, StudentId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Threshold condition for one achievement — a tagged variant with one
/// evaluator arm per kind. Each variant carries its numeric target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum AchievementCondition {
    TransactionCount(u64),
    AmountSaved(Money),
    ProfitEarned(Money),
    JobsCompleted(u64),
    DonationsMade(u64),
    PortfolioValue(Money),
    ConsecutiveDays(u64),
}

impl AchievementCondition {
    pub fn target(&self) -> f64 {
        match *self {
            Self::TransactionCount(t) => t as f64,
            Self::AmountSaved(t) => t,
            Self::ProfitEarned(t) => t,
            Self::JobsCompleted(t) => t as f64,
            Self::DonationsMade(t) => t as f64,
            Self::PortfolioValue(t) => t,
            Self::ConsecutiveDays(t) => t as f64,
        }
    }

    /// Current raw progress towards this condition, read from the
    /// matching snapshot field.
    pub fn progress_from(&self, snapshot: &MetricsSnapshot) -> f64 {
        match self {
            Self::TransactionCount(_) => snapshot.transaction_count as f64,
            Self::AmountSaved(_) => snapshot.amount_saved,
            Self::ProfitEarned(_) => snapshot.profit_earned,
            Self::JobsCompleted(_) => snapshot.jobs_completed as f64,
            Self::DonationsMade(_) => snapshot.donations_made as f64,
            Self::PortfolioValue(_) => snapshot.portfolio_value,
            Self::ConsecutiveDays(_) => snapshot.consecutive_days as f64,
        }
    }
}

/// Per-student counters the conditions are evaluated against. Built by
/// the engine from ledger, savings and market state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub transaction_count: u64,
    pub amount_saved: Money,
    pub profit_earned: Money,
    pub jobs_completed: u64,
    pub donations_made: u64,
    pub portfolio_value: Money,
    pub consecutive_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub points: i32,
    pub condition: AchievementCondition,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAchievement {
    pub student_id: StudentId,
    pub achievement_id: EntityId,
    pub progress: f64,
    /// Monotonic: false -> true, once.
    pub is_completed: bool,
    /// Set exactly once, at the first completion crossing.
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct AchievementStore {
    pub catalog: Vec<Achievement>,
    pub progress: Vec<StudentAchievement>,
}

impl AchievementStore {
    pub fn achievement(&self, id: &str) -> Option<&Achievement> {
        self.catalog.iter().find(|a| a.id == id)
    }

    pub fn student_progress(&self, student_id: &str, achievement_id: &str) -> Option<&StudentAchievement> {
        self.progress
            .iter()
            .find(|p| p.student_id == student_id && p.achievement_id == achievement_id)
    }

    /// Recompute progress for every active achievement against the
    /// snapshot, writing records only when progress changed. Returns
    /// the ids that transitioned to completed in this call; calling
    /// again with the same snapshot returns an empty list.
    pub fn check_and_complete(
        &mut self,
        student_id: &str,
        snapshot: &MetricsSnapshot,
        clock: &SimClock,
    ) -> Vec<EntityId> {
        let mut newly_completed = Vec::new();
        for achievement in self.catalog.iter().filter(|a| a.active) {
            let target = achievement.condition.target();
            let progress = achievement.condition.progress_from(snapshot).min(target);

            let record = match self
                .progress
                .iter_mut()
                .find(|p| p.student_id == student_id && p.achievement_id == achievement.id)
            {
                Some(existing) => existing,
                None => {
                    if progress <= 0.0 {
                        continue; // stays not_started, no row
                    }
                    self.progress.push(StudentAchievement {
                        student_id: student_id.to_string(),
                        achievement_id: achievement.id.clone(),
                        progress: 0.0,
                        is_completed: false,
                        completed_at: None,
                    });
                    self.progress.last_mut().expect("just pushed")
                }
            };

            if record.is_completed {
                continue; // one-way transition, completed_at stays fixed
            }
            if (record.progress - progress).abs() > f64::EPSILON {
                record.progress = progress;
            }
            if record.progress >= target {
                record.is_completed = true;
                record.completed_at = Some(clock.now);
                newly_completed.push(achievement.id.clone());
            }
        }
        newly_completed
    }

    pub fn completed_for(&self, student_id: &str) -> Vec<&StudentAchievement> {
        self.progress
            .iter()
            .filter(|p| p.student_id == student_id && p.is_completed)
            .collect()
    }
}
