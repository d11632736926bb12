//! Savings engine — fixed-term deposit and installment accounts.
//!
//! Interest bases differ by design: deposit accounts accrue on the
//! fixed principal, installment accounts accrue on the running balance.
//! The monthly batch is a lazily-checked idempotent gate: it compares
//! the stored last-process month ("YYYY-MM") against the clock and only
//! accrues on a month boundary crossing, however often it is invoked.

use crate::{
    clock::SimClock,
    types::{EntityId, Money, StudentId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Deposit,
    Installment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsAccount {
    pub id: EntityId,
    pub student_id: StudentId,
    pub kind: AccountKind,
    /// Lump sum for deposit accounts; 0 for installment accounts.
    pub principal: Money,
    /// Contribution per month for installment accounts; 0 for deposit.
    pub monthly_deposit: Money,
    /// Annual interest rate in percent, e.g. 3.6 for 3.6%/yr.
    pub annual_rate_pct: f64,
    pub term_months: u32,
    pub opened_at: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub total_balance: Money,
    /// Monotonic: false -> true, once.
    pub is_matured: bool,
}

impl SavingsAccount {
    /// Monthly rate as a fraction: annual % / 100 / 12.
    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_pct / 100.0 / 12.0
    }

    /// One month of interest. Deposit: on the fixed principal.
    /// Installment: on the accrued running balance.
    pub fn monthly_interest(&self) -> Money {
        match self.kind {
            AccountKind::Deposit => self.principal * self.monthly_rate(),
            AccountKind::Installment => self.total_balance * self.monthly_rate(),
        }
    }

    /// Closed-form final balance at the end of the term.
    /// Deposit: compound interest, principal × (1+r)^n.
    /// Installment: future value of an annuity, d × ((1+r)^n − 1)/r,
    /// falling back to d × n when r = 0.
    pub fn maturity_amount(&self) -> Money {
        let r = self.monthly_rate();
        let n = self.term_months as f64;
        match self.kind {
            AccountKind::Deposit => self.principal * (1.0 + r).powf(n),
            AccountKind::Installment => {
                if r == 0.0 {
                    self.monthly_deposit * n
                } else {
                    self.monthly_deposit * ((1.0 + r).powf(n) - 1.0) / r
                }
            }
        }
    }

    /// How much may be withdrawn right now. Before maturity the early
    /// withdrawal penalty costs half a month of interest, but never
    /// eats into the principal.
    pub fn available_for_withdrawal(&self) -> Money {
        if self.is_matured {
            self.total_balance
        } else {
            (self.total_balance - 0.5 * self.monthly_interest()).max(self.principal)
        }
    }
}

#[derive(Default)]
pub struct SavingsStore {
    pub accounts: Vec<SavingsAccount>,
    /// "YYYY-MM" of the last monthly batch, persisted across loads.
    pub last_process_month: Option<String>,
}

impl SavingsStore {
    /// Open an account. For deposit accounts the principal is presumed
    /// already debited from the ledger by the caller; installment
    /// accounts start at balance 0.
    pub fn open_account(
        &mut self,
        student_id: &str,
        kind: AccountKind,
        amount: Money,
        annual_rate_pct: f64,
        term_months: u32,
        clock: &SimClock,
    ) -> Option<EntityId> {
        if amount <= 0.0 || term_months == 0 {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        let (principal, monthly_deposit, total_balance) = match kind {
            AccountKind::Deposit => (amount, 0.0, amount),
            AccountKind::Installment => (0.0, amount, 0.0),
        };
        self.accounts.push(SavingsAccount {
            id: id.clone(),
            student_id: student_id.to_string(),
            kind,
            principal,
            monthly_deposit,
            annual_rate_pct,
            term_months,
            opened_at: clock.now,
            maturity_date: clock.months_from_now(term_months),
            total_balance,
            is_matured: false,
        });
        Some(id)
    }

    pub fn account(&self, id: &str) -> Option<&SavingsAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn student_accounts(&self, student_id: &str) -> Vec<&SavingsAccount> {
        self.accounts
            .iter()
            .filter(|a| a.student_id == student_id)
            .collect()
    }

    /// Total saved across one student's open accounts.
    pub fn student_savings_balance(&self, student_id: &str) -> Money {
        self.accounts
            .iter()
            .filter(|a| a.student_id == student_id)
            .map(|a| a.total_balance)
            .sum()
    }

    /// Run the monthly accrual batch if a calendar month boundary has
    /// been crossed since the last run. Installment accounts receive
    /// their monthly deposit after interest accrues on the running
    /// balance, so a deposit earns from the following month.
    ///
    /// Returns the summed interest credited, or None when gated.
    pub fn process_monthly_interest(&mut self, clock: &SimClock) -> Option<Money> {
        let month = clock.month_key();
        if self.last_process_month.as_deref() == Some(month.as_str()) {
            return None;
        }
        let mut total = 0.0;
        for account in self.accounts.iter_mut().filter(|a| !a.is_matured) {
            let interest = account.monthly_interest();
            account.total_balance += interest;
            if account.kind == AccountKind::Installment {
                account.total_balance += account.monthly_deposit;
            }
            total += interest;
        }
        self.last_process_month = Some(month);
        log::info!("monthly savings batch credited {total:.2} across accounts");
        Some(total)
    }

    /// Withdraw from an account. Fails when the id is unknown, the
    /// amount is non-positive, or the request exceeds the available
    /// amount (which embeds the early-withdrawal penalty).
    pub fn withdraw(&mut self, account_id: &str, amount: Money) -> bool {
        if amount <= 0.0 {
            return false;
        }
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            return false;
        };
        if amount > account.available_for_withdrawal() {
            return false;
        }
        account.total_balance -= amount;
        true
    }

    /// One-shot maturity transition: requires the maturity date to have
    /// passed, locks in the closed-form maturity amount and flips the
    /// monotonic is_matured flag. No-op (false) when already matured,
    /// premature, or unknown.
    pub fn process_maturity(&mut self, account_id: &str, clock: &SimClock) -> bool {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            return false;
        };
        if account.is_matured || clock.now < account.maturity_date {
            return false;
        }
        account.total_balance = account.maturity_amount();
        account.is_matured = true;
        true
    }

    /// Mature every account whose term has elapsed. Invoked
    /// opportunistically by the engine on load and day advance.
    pub fn process_due_maturities(&mut self, clock: &SimClock) -> usize {
        let due: Vec<String> = self
            .accounts
            .iter()
            .filter(|a| !a.is_matured && clock.now >= a.maturity_date)
            .map(|a| a.id.clone())
            .collect();
        for id in &due {
            self.process_maturity(id, clock);
        }
        due.len()
    }
}
