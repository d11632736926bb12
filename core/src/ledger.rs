//! Ledger store — classrooms, students, jobs and the append-only
//! transaction log.
//!
//! RULES:
//!   - Balances never go negative; debits that would overdraw fail.
//!   - Transactions are immutable once appended. All analytics read them.
//!   - Students are soft-deleted (active flag) — rows referenced by
//!     transactions, portfolios or savings accounts are never removed.

use crate::{
    clock::SimClock,
    config::EconConfig,
    types::{ClassroomId, EntityId, Money, StudentId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const CREDIT_SCORE_MIN: i32 = 300;
pub const CREDIT_SCORE_MAX: i32 = 850;
pub const CREDIT_SCORE_DEFAULT: i32 = 650;

/// Letter bucket for a numeric credit score. Monotonic step function
/// over the boundaries {300,550,600,650,700,750,800,850}.
pub fn credit_grade(score: i32) -> &'static str {
    match score {
        s if s >= 800 => "A+",
        s if s >= 750 => "A",
        s if s >= 700 => "B+",
        s if s >= 650 => "B",
        s if s >= 600 => "C+",
        s if s >= 550 => "C",
        _ => "D",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    pub currency_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub classroom_id: ClassroomId,
    pub name: String,
    pub balance: Money,
    pub credit_score: i32,
    pub credit_grade: String,
    pub total_earnings: Money,
    pub total_transactions: u64,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    #[serde(default)]
    pub late_count: u32,
    #[serde(default)]
    pub homework_missed: u32,
    #[serde(default)]
    pub book_overdue: u32,
    #[serde(default)]
    pub job_id: Option<EntityId>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    pub title: String,
    pub salary: Money,
    pub max_positions: u32,
    pub current_positions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxDirection {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxCategory {
    Salary,
    Bonus,
    Purchase,
    Donation,
    SavingsDeposit,
    SavingsWithdrawal,
    StockTrade,
    Adjustment,
}

/// One immutable ledger entry. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    pub student_id: StudentId,
    pub direction: TxDirection,
    pub category: TxCategory,
    pub amount: Money,
    pub memo: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorIncident {
    Late,
    HomeworkMissed,
    BookOverdue,
}

#[derive(Default)]
pub struct LedgerStore {
    pub classrooms: Vec<Classroom>,
    pub students: Vec<Student>,
    pub jobs: Vec<Job>,
    pub transactions: Vec<LedgerTransaction>,
}

impl LedgerStore {
    pub fn create_classroom(
        &mut self,
        name: &str,
        currency_name: &str,
        clock: &SimClock,
    ) -> ClassroomId {
        let id = Uuid::new_v4().to_string();
        self.classrooms.push(Classroom {
            id: id.clone(),
            name: name.to_string(),
            currency_name: currency_name.to_string(),
            created_at: clock.now,
        });
        id
    }

    /// New students start with balance 0, credit score 650, grade B.
    pub fn create_student(
        &mut self,
        classroom_id: &str,
        name: &str,
        clock: &SimClock,
    ) -> StudentId {
        let id = Uuid::new_v4().to_string();
        self.students.push(Student {
            id: id.clone(),
            classroom_id: classroom_id.to_string(),
            name: name.to_string(),
            balance: 0.0,
            credit_score: CREDIT_SCORE_DEFAULT,
            credit_grade: credit_grade(CREDIT_SCORE_DEFAULT).to_string(),
            total_earnings: 0.0,
            total_transactions: 0,
            achievements: BTreeSet::new(),
            late_count: 0,
            homework_missed: 0,
            book_overdue: 0,
            job_id: None,
            active: true,
            created_at: clock.now,
        });
        id
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn student_mut(&mut self, id: &str) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| s.id == id)
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Active students of one classroom.
    pub fn roster(&self, classroom_id: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.classroom_id == classroom_id && s.active)
            .collect()
    }

    // ── Money movement ─────────────────────────────────────────

    /// Credit a student. Appends a transaction, bumps earnings and the
    /// transaction counter, and applies the per-transaction credit-score
    /// bonus. Returns false for unknown or inactive students.
    pub fn credit(
        &mut self,
        student_id: &str,
        amount: Money,
        category: TxCategory,
        memo: &str,
        config: &EconConfig,
        clock: &SimClock,
    ) -> bool {
        if amount <= 0.0 {
            return false;
        }
        let bonus = config.credit.transaction_bonus;
        let Some(student) = self.students.iter_mut().find(|s| s.id == student_id && s.active)
        else {
            return false;
        };
        student.balance += amount;
        student.total_earnings += amount;
        student.total_transactions += 1;
        apply_score_delta(student, bonus);
        let entry = LedgerTransaction {
            id: Uuid::new_v4().to_string(),
            classroom_id: student.classroom_id.clone(),
            student_id: student.id.clone(),
            direction: TxDirection::Credit,
            category,
            amount,
            memo: memo.to_string(),
            at: clock.now,
        };
        self.transactions.push(entry);
        true
    }

    /// Debit a student. Fails on insufficient funds — balances are
    /// clamped non-negative by refusing the overdraw, not by truncating.
    pub fn debit(
        &mut self,
        student_id: &str,
        amount: Money,
        category: TxCategory,
        memo: &str,
        config: &EconConfig,
        clock: &SimClock,
    ) -> bool {
        if amount <= 0.0 {
            return false;
        }
        let bonus = config.credit.transaction_bonus;
        let Some(student) = self.students.iter_mut().find(|s| s.id == student_id && s.active)
        else {
            return false;
        };
        if student.balance < amount {
            return false;
        }
        student.balance = (student.balance - amount).max(0.0);
        student.total_transactions += 1;
        apply_score_delta(student, bonus);
        let entry = LedgerTransaction {
            id: Uuid::new_v4().to_string(),
            classroom_id: student.classroom_id.clone(),
            student_id: student.id.clone(),
            direction: TxDirection::Debit,
            category,
            amount,
            memo: memo.to_string(),
            at: clock.now,
        };
        self.transactions.push(entry);
        true
    }

    // ── Jobs ───────────────────────────────────────────────────

    pub fn create_job(
        &mut self,
        classroom_id: &str,
        title: &str,
        salary: Money,
        max_positions: u32,
    ) -> EntityId {
        let id = Uuid::new_v4().to_string();
        self.jobs.push(Job {
            id: id.clone(),
            classroom_id: classroom_id.to_string(),
            title: title.to_string(),
            salary,
            max_positions,
            current_positions: 0,
        });
        id
    }

    /// Assign a student to a job. Fails when the job is at capacity or
    /// either id is unknown. A student holding another job resigns it
    /// first, so position counts stay consistent.
    pub fn assign_job(&mut self, student_id: &str, job_id: &str) -> bool {
        let Some(job_idx) = self.jobs.iter().position(|j| j.id == job_id) else {
            return false;
        };
        if self.jobs[job_idx].current_positions >= self.jobs[job_idx].max_positions {
            return false;
        }
        if self.student(student_id).map(|s| s.active) != Some(true) {
            return false;
        }
        self.resign_job(student_id);
        self.jobs[job_idx].current_positions += 1;
        let job_id = self.jobs[job_idx].id.clone();
        if let Some(student) = self.student_mut(student_id) {
            student.job_id = Some(job_id);
        }
        true
    }

    /// Remove a student's job assignment, releasing the position.
    pub fn resign_job(&mut self, student_id: &str) -> bool {
        let Some(old_job) = self.student_mut(student_id).and_then(|s| s.job_id.take()) else {
            return false;
        };
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == old_job) {
            job.current_positions = job.current_positions.saturating_sub(1);
        }
        true
    }

    // ── Credit score & behavior ────────────────────────────────

    /// Adjust a student's credit score by a signed delta. The score is
    /// clamped to [300, 850] and the letter grade recomputed.
    pub fn adjust_credit_score(&mut self, student_id: &str, delta: i32) -> bool {
        match self.student_mut(student_id) {
            Some(student) => {
                apply_score_delta(student, delta);
                true
            }
            None => false,
        }
    }

    /// Record a behavior incident: bump the counter and apply the
    /// configured credit-score penalty.
    pub fn record_incident(
        &mut self,
        student_id: &str,
        incident: BehaviorIncident,
        config: &EconConfig,
    ) -> bool {
        let penalties = &config.credit;
        let (counter_delta, score_delta) = match incident {
            BehaviorIncident::Late => (1, -penalties.late_penalty),
            BehaviorIncident::HomeworkMissed => (1, -penalties.homework_penalty),
            BehaviorIncident::BookOverdue => (1, -penalties.book_overdue_penalty),
        };
        let Some(student) = self.student_mut(student_id) else {
            return false;
        };
        match incident {
            BehaviorIncident::Late => student.late_count += counter_delta,
            BehaviorIncident::HomeworkMissed => student.homework_missed += counter_delta,
            BehaviorIncident::BookOverdue => student.book_overdue += counter_delta,
        }
        apply_score_delta(student, score_delta);
        true
    }

    /// Soft delete. The student keeps their rows everywhere; the job
    /// position is released.
    pub fn deactivate_student(&mut self, student_id: &str) -> bool {
        if self.student(student_id).is_none() {
            return false;
        }
        self.resign_job(student_id);
        if let Some(student) = self.student_mut(student_id) {
            student.active = false;
        }
        true
    }

    /// Transactions of one classroom, most recent last.
    pub fn classroom_transactions(&self, classroom_id: &str) -> Vec<&LedgerTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.classroom_id == classroom_id)
            .collect()
    }
}

fn apply_score_delta(student: &mut Student, delta: i32) {
    student.credit_score =
        (student.credit_score + delta).clamp(CREDIT_SCORE_MIN, CREDIT_SCORE_MAX);
    student.credit_grade = credit_grade(student.credit_score).to_string();
}
