//! The economy engine — owns the clock, the RNG bank, the persistence
//! layer and every domain store, and wires the operations that span
//! store boundaries.
//!
//! RULES:
//!   - Execution is single-threaded and synchronous: every operation
//!     runs to completion before the next starts, so multi-step
//!     mutations (buy = ledger debit + portfolio credit) need no locks
//!     and no rollback path.
//!   - Derived views (analytics) are recomputed on read, never cached.
//!   - The monthly savings batch is not on a timer: it is re-checked
//!     opportunistically on load and on every day advance, and its
//!     calendar-month gate makes the extra invocations no-ops.
//!   - Collections are flushed in full after each mutating operation.

use crate::{
    achievements::{AchievementStore, MetricsSnapshot},
    activity::ActivityStore,
    analytics::AnalyticsEngine,
    clock::SimClock,
    config::EconConfig,
    error::EconResult,
    ledger::{LedgerStore, TxCategory},
    market::{MarketStore, Sector},
    news::NewsStore,
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    savings::{AccountKind, SavingsStore},
    store::KvStore,
    types::{EntityId, Money},
};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

pub struct EconEngine {
    pub clock: SimClock,
    pub config: EconConfig,
    pub ledger: LedgerStore,
    pub savings: SavingsStore,
    pub market: MarketStore,
    pub news: NewsStore,
    pub activity: ActivityStore,
    pub achievements: AchievementStore,
    pub analytics: AnalyticsEngine,
    market_rng: SubsystemRng,
    news_rng: SubsystemRng,
    store: KvStore,
}

impl EconEngine {
    /// Open (or create) a database file and load all state.
    pub fn open(path: &str, seed: u64, config: EconConfig, clock: SimClock) -> EconResult<Self> {
        Self::from_store(KvStore::open(path)?, seed, config, clock)
    }

    /// Fully in-memory engine. Used in tests.
    pub fn in_memory(seed: u64, config: EconConfig, clock: SimClock) -> EconResult<Self> {
        Self::from_store(KvStore::in_memory()?, seed, config, clock)
    }

    fn from_store(
        store: KvStore,
        seed: u64,
        config: EconConfig,
        clock: SimClock,
    ) -> EconResult<Self> {
        let rng_bank = RngBank::new(seed);
        let mut engine = Self {
            clock,
            market_rng: rng_bank.for_subsystem(SubsystemSlot::Market),
            news_rng: rng_bank.for_subsystem(SubsystemSlot::News),
            achievements: AchievementStore {
                catalog: config.achievements.clone(),
                progress: Vec::new(),
            },
            config,
            ledger: LedgerStore::default(),
            savings: SavingsStore::default(),
            market: MarketStore::default(),
            news: NewsStore::default(),
            activity: ActivityStore::default(),
            analytics: AnalyticsEngine::default(),
            store,
        };
        engine.load()?;
        Ok(engine)
    }

    /// Read every collection into memory, then run the lazily-gated
    /// periodic work (due maturities, monthly interest) that may have
    /// been missed since the last session.
    fn load(&mut self) -> EconResult<()> {
        self.ledger.classrooms = self.store.read_collection("classrooms")?;
        self.ledger.students = self.store.read_collection("students")?;
        self.ledger.jobs = self.store.read_collection("jobs")?;
        self.ledger.transactions = self.store.read_collection("transactions")?;
        self.savings.accounts = self.store.read_collection("savings_accounts")?;
        self.savings.last_process_month = self.store.read_meta("savings_last_month")?;
        self.market.stocks = self.store.read_collection("stocks")?;
        self.market.portfolios = self.store.read_collection("portfolios")?;
        self.market.transactions = self.store.read_collection("stock_transactions")?;
        self.news.indicators = self.store.read_collection("market_indicators")?;
        self.news.news = self.store.read_collection("market_news")?;
        self.activity.records = self.store.read_collection("activity_log")?;
        self.achievements.progress = self.store.read_collection("student_achievements")?;
        self.analytics.market_participation = self.store.read_collection("participation_snapshots")?;
        self.analytics.savings_rates = self.store.read_collection("savings_rate_snapshots")?;

        self.savings.process_due_maturities(&self.clock);
        self.savings.process_monthly_interest(&self.clock);
        self.flush()
    }

    /// Rewrite every collection. No partial updates, no indexing.
    pub fn flush(&mut self) -> EconResult<()> {
        self.store.write_collection("classrooms", &self.ledger.classrooms)?;
        self.store.write_collection("students", &self.ledger.students)?;
        self.store.write_collection("jobs", &self.ledger.jobs)?;
        self.store.write_collection("transactions", &self.ledger.transactions)?;
        self.store.write_collection("savings_accounts", &self.savings.accounts)?;
        if let Some(month) = &self.savings.last_process_month {
            self.store.write_meta("savings_last_month", month)?;
        }
        self.store.write_collection("stocks", &self.market.stocks)?;
        self.store.write_collection("portfolios", &self.market.portfolios)?;
        self.store.write_collection("stock_transactions", &self.market.transactions)?;
        self.store.write_collection("market_indicators", &self.news.indicators)?;
        self.store.write_collection("market_news", &self.news.news)?;
        self.store.write_collection("activity_log", &self.activity.records)?;
        self.store.write_collection("student_achievements", &self.achievements.progress)?;
        self.store
            .write_collection("participation_snapshots", &self.analytics.market_participation)?;
        self.store
            .write_collection("savings_rate_snapshots", &self.analytics.savings_rates)?;
        Ok(())
    }

    // ── Day advance ────────────────────────────────────────────

    /// Advance the simulated clock one day and run the per-day work:
    /// market tick, news generation, snapshot recording and the
    /// opportunistic savings checks.
    pub fn advance_day(&mut self) -> EconResult<()> {
        self.clock.advance_days(1);
        let classroom_ids: Vec<EntityId> =
            self.ledger.classrooms.iter().map(|c| c.id.clone()).collect();
        for classroom_id in &classroom_ids {
            self.market
                .tick(classroom_id, &self.config, &mut self.market_rng);
            let mut sectors: Vec<Sector> = Vec::new();
            for stock in self.market.classroom_stocks(classroom_id) {
                if !sectors.contains(&stock.sector) {
                    sectors.push(stock.sector);
                }
            }
            self.news.generate_daily_news(
                classroom_id,
                &sectors,
                &self.config,
                &self.clock,
                &mut self.news_rng,
            );
            self.record_daily_snapshots(classroom_id);
        }
        self.news.prune(&self.clock);
        self.savings.process_due_maturities(&self.clock);
        self.savings.process_monthly_interest(&self.clock);
        self.flush()
    }

    pub fn advance_days(&mut self, days: u32) -> EconResult<()> {
        for _ in 0..days {
            self.advance_day()?;
        }
        Ok(())
    }

    /// Participation = share of active students holding any stock;
    /// savings rate = share holding any savings account. Appended here
    /// as the upstream caller of the analytics snapshot sequences.
    fn record_daily_snapshots(&mut self, classroom_id: &str) {
        let roster = self.ledger.roster(classroom_id);
        if roster.is_empty() {
            return;
        }
        let n = roster.len() as f64;
        let investing = roster
            .iter()
            .filter(|s| !self.market.student_positions(&s.id).is_empty())
            .count() as f64;
        let saving = roster
            .iter()
            .filter(|s| !self.savings.student_accounts(&s.id).is_empty())
            .count() as f64;
        self.analytics
            .record_participation(investing / n * 100.0, &self.clock);
        self.analytics
            .record_savings_rate(saving / n * 100.0, &self.clock);
    }

    // ── Cross-store operations ─────────────────────────────────

    /// Pay one salary installment for the student's assigned job.
    /// Credits the ledger and sweeps achievements. False without a job.
    pub fn pay_salary(&mut self, student_id: &str) -> EconResult<bool> {
        let Some((salary, title)) = self
            .ledger
            .student(student_id)
            .and_then(|s| s.job_id.as_deref())
            .and_then(|job_id| self.ledger.job(job_id))
            .map(|j| (j.salary, j.title.clone()))
        else {
            return Ok(false);
        };
        let memo = format!("Salary: {title}");
        if !self.ledger.credit(
            student_id,
            salary,
            TxCategory::Salary,
            &memo,
            &self.config,
            &self.clock,
        ) {
            return Ok(false);
        }
        self.check_achievements(student_id);
        self.flush()?;
        Ok(true)
    }

    /// Donate from a student's balance. False on insufficient funds.
    pub fn donate(&mut self, student_id: &str, amount: Money, memo: &str) -> EconResult<bool> {
        if !self.ledger.debit(
            student_id,
            amount,
            TxCategory::Donation,
            memo,
            &self.config,
            &self.clock,
        ) {
            return Ok(false);
        }
        self.check_achievements(student_id);
        self.flush()?;
        Ok(true)
    }

    /// Buy stock at the current price: ledger debit, then portfolio and
    /// trade-log update. The two steps are not atomic across stores —
    /// in this synchronous model no I/O can fail between them.
    pub fn buy_stock(&mut self, student_id: &str, stock_id: &str, quantity: u64) -> EconResult<bool> {
        let Some(stock) = self.market.stock(stock_id) else {
            return Ok(false);
        };
        let cost = stock.current_price * quantity as f64;
        let memo = format!("Buy {} × {}", quantity, stock.symbol);
        if quantity == 0
            || !self.ledger.debit(
                student_id,
                cost,
                TxCategory::StockTrade,
                &memo,
                &self.config,
                &self.clock,
            )
        {
            return Ok(false);
        }
        self.market
            .record_buy(student_id, stock_id, quantity, &self.clock);
        self.check_achievements(student_id);
        self.flush()?;
        Ok(true)
    }

    /// Sell stock at the current price; proceeds are credited to the
    /// ledger. Quantity is capped at the held position.
    pub fn sell_stock(&mut self, student_id: &str, stock_id: &str, quantity: u64) -> EconResult<bool> {
        let symbol = match self.market.stock(stock_id) {
            Some(s) => s.symbol.clone(),
            None => return Ok(false),
        };
        let Some(proceeds) = self
            .market
            .record_sell(student_id, stock_id, quantity, &self.clock)
        else {
            return Ok(false);
        };
        let memo = format!("Sell {quantity} × {symbol}");
        self.ledger.credit(
            student_id,
            proceeds,
            TxCategory::StockTrade,
            &memo,
            &self.config,
            &self.clock,
        );
        self.check_achievements(student_id);
        self.flush()?;
        Ok(true)
    }

    /// Open a savings account. Deposit accounts debit the principal
    /// from the ledger up front; installment accounts start empty.
    pub fn open_savings(
        &mut self,
        student_id: &str,
        kind: AccountKind,
        amount: Money,
        annual_rate_pct: f64,
        term_months: u32,
    ) -> EconResult<Option<EntityId>> {
        if kind == AccountKind::Deposit
            && !self.ledger.debit(
                student_id,
                amount,
                TxCategory::SavingsDeposit,
                "Fixed deposit principal",
                &self.config,
                &self.clock,
            )
        {
            return Ok(None);
        }
        let account =
            self.savings
                .open_account(student_id, kind, amount, annual_rate_pct, term_months, &self.clock);
        self.check_achievements(student_id);
        self.flush()?;
        Ok(account)
    }

    /// Withdraw from a savings account back into the ledger balance.
    pub fn withdraw_savings(&mut self, account_id: &str, amount: Money) -> EconResult<bool> {
        let Some(student_id) = self
            .savings
            .account(account_id)
            .map(|a| a.student_id.clone())
        else {
            return Ok(false);
        };
        if !self.savings.withdraw(account_id, amount) {
            return Ok(false);
        }
        self.ledger.credit(
            &student_id,
            amount,
            TxCategory::SavingsWithdrawal,
            "Savings withdrawal",
            &self.config,
            &self.clock,
        );
        self.flush()?;
        Ok(true)
    }

    // ── Achievements ───────────────────────────────────────────

    /// Build the per-student metrics snapshot the achievement
    /// conditions are evaluated against.
    pub fn metrics_snapshot(&self, student_id: &str) -> MetricsSnapshot {
        let Some(student) = self.ledger.student(student_id) else {
            return MetricsSnapshot::default();
        };
        let salary_payments = self
            .ledger
            .transactions
            .iter()
            .filter(|t| t.student_id == student_id && t.category == TxCategory::Salary)
            .count() as u64;
        let donations = self
            .ledger
            .transactions
            .iter()
            .filter(|t| t.student_id == student_id && t.category == TxCategory::Donation)
            .count() as u64;
        MetricsSnapshot {
            transaction_count: student.total_transactions,
            amount_saved: self.savings.student_savings_balance(student_id),
            profit_earned: self.market.realized_profit(student_id).max(0.0),
            jobs_completed: salary_payments,
            donations_made: donations,
            portfolio_value: self.market.portfolio_value(student_id),
            consecutive_days: self.consecutive_active_days(student_id),
        }
    }

    /// Sweep achievements for one student. Newly completed badges are
    /// added to the student's set and pay the credit-score bonus.
    pub fn check_achievements(&mut self, student_id: &str) -> Vec<EntityId> {
        let snapshot = self.metrics_snapshot(student_id);
        let completed = self
            .achievements
            .check_and_complete(student_id, &snapshot, &self.clock);
        for achievement_id in &completed {
            if let Some(student) = self.ledger.student_mut(student_id) {
                student.achievements.insert(achievement_id.clone());
            }
            self.ledger
                .adjust_credit_score(student_id, self.config.credit.achievement_bonus);
            log::info!("student {student_id} unlocked achievement {achievement_id}");
        }
        completed
    }

    /// Length of the streak of consecutive days with recorded activity
    /// ending today (or yesterday, so a streak survives until midnight).
    fn consecutive_active_days(&self, student_id: &str) -> u64 {
        let days: BTreeSet<NaiveDate> = self
            .activity
            .student_records(student_id)
            .iter()
            .map(|r| r.at.date_naive())
            .collect();
        let today = self.clock.now.date_naive();
        let mut cursor = if days.contains(&today) {
            today
        } else if days.contains(&(today - Duration::days(1))) {
            today - Duration::days(1)
        } else {
            return 0;
        };
        let mut streak = 0u64;
        while days.contains(&cursor) {
            streak += 1;
            cursor -= Duration::days(1);
        }
        streak
    }

    /// Record student activity and re-sweep streak achievements.
    pub fn record_activity(
        &mut self,
        classroom_id: &str,
        student_id: &str,
        activity_level: f64,
    ) -> EconResult<()> {
        self.activity
            .record(classroom_id, student_id, activity_level, &self.clock);
        self.check_achievements(student_id);
        self.flush()
    }
}
