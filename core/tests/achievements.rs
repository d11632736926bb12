//! Achievement engine tests — the progress state machine, idempotent
//! sweeps, and the credit-score feedback loop.

use chrono::{TimeZone, Utc};
use classbank_core::{
    achievements::{AchievementCondition, AchievementStore, MetricsSnapshot},
    clock::SimClock,
    config::EconConfig,
    engine::EconEngine,
};

fn fixed_clock() -> SimClock {
    SimClock::fixed(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
}

#[test]
fn first_salary_unlocks_first_transaction_and_bumps_credit() {
    let mut engine =
        EconEngine::in_memory(1, EconConfig::default(), fixed_clock()).unwrap();
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let student = engine.ledger.create_student(&classroom, "Ava", &clock);
    let job = engine.ledger.create_job(&classroom, "Teller", 10_000.0, 1);
    engine.ledger.assign_job(&student, &job);

    assert!(engine.pay_salary(&student).unwrap());

    let row = engine.ledger.student(&student).unwrap();
    assert_eq!(row.balance, 10_000.0);
    assert_eq!(row.total_transactions, 1);
    assert!(row.achievements.contains("first_transaction"));
    // 650 base + 2 (transaction) + 25 (achievement unlock) = 677.
    assert_eq!(row.credit_score, 677);
    // 677 is still a 'B'; 'B+' starts at 700.
    assert_eq!(row.credit_grade, "B");

    let progress = engine
        .achievements
        .student_progress(&student, "first_transaction")
        .unwrap();
    assert!(progress.is_completed);
    assert!(progress.completed_at.is_some());
}

#[test]
fn repeated_sweep_with_same_snapshot_completes_nothing() {
    let mut store = AchievementStore {
        catalog: EconConfig::default().achievements,
        progress: Vec::new(),
    };
    let clock = fixed_clock();
    let snapshot = MetricsSnapshot {
        transaction_count: 1,
        ..Default::default()
    };

    let first = store.check_and_complete("s1", &snapshot, &clock);
    assert_eq!(first, vec!["first_transaction".to_string()]);

    let second = store.check_and_complete("s1", &snapshot, &clock);
    assert!(second.is_empty(), "same snapshot must be idempotent");
}

#[test]
fn completed_at_is_fixed_at_the_first_crossing() {
    let mut store = AchievementStore {
        catalog: EconConfig::default().achievements,
        progress: Vec::new(),
    };
    let clock = fixed_clock();
    let snapshot = MetricsSnapshot {
        transaction_count: 3,
        ..Default::default()
    };
    store.check_and_complete("s1", &snapshot, &clock);
    let completed_at = store
        .student_progress("s1", "first_transaction")
        .unwrap()
        .completed_at;

    let mut later = fixed_clock();
    later.advance_days(30);
    let more = MetricsSnapshot {
        transaction_count: 50,
        ..Default::default()
    };
    store.check_and_complete("s1", &more, &later);
    assert_eq!(
        store
            .student_progress("s1", "first_transaction")
            .unwrap()
            .completed_at,
        completed_at
    );
}

#[test]
fn progress_advances_without_completing_below_target() {
    let mut store = AchievementStore {
        catalog: EconConfig::default().achievements,
        progress: Vec::new(),
    };
    let clock = fixed_clock();

    // No progress at all: no row is created (not_started).
    store.check_and_complete("s1", &MetricsSnapshot::default(), &clock);
    assert!(store.student_progress("s1", "busy_trader").is_none());

    // Partial progress: in_progress, not completed, capped at target.
    let partial = MetricsSnapshot {
        transaction_count: 10,
        ..Default::default()
    };
    store.check_and_complete("s1", &partial, &clock);
    let row = store.student_progress("s1", "busy_trader").unwrap();
    assert_eq!(row.progress, 10.0);
    assert!(!row.is_completed);
}

#[test]
fn each_condition_kind_reads_its_own_snapshot_field() {
    let snapshot = MetricsSnapshot {
        transaction_count: 1,
        amount_saved: 2.0,
        profit_earned: 3.0,
        jobs_completed: 4,
        donations_made: 5,
        portfolio_value: 6.0,
        consecutive_days: 7,
    };
    assert_eq!(AchievementCondition::TransactionCount(9).progress_from(&snapshot), 1.0);
    assert_eq!(AchievementCondition::AmountSaved(9.0).progress_from(&snapshot), 2.0);
    assert_eq!(AchievementCondition::ProfitEarned(9.0).progress_from(&snapshot), 3.0);
    assert_eq!(AchievementCondition::JobsCompleted(9).progress_from(&snapshot), 4.0);
    assert_eq!(AchievementCondition::DonationsMade(9).progress_from(&snapshot), 5.0);
    assert_eq!(AchievementCondition::PortfolioValue(9.0).progress_from(&snapshot), 6.0);
    assert_eq!(AchievementCondition::ConsecutiveDays(9).progress_from(&snapshot), 7.0);
}

#[test]
fn donations_feed_the_philanthropist_badge() {
    let mut engine =
        EconEngine::in_memory(2, EconConfig::default(), fixed_clock()).unwrap();
    let clock = engine.clock.clone();
    let config = EconConfig::default();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let student = engine.ledger.create_student(&classroom, "Ben", &clock);
    engine.ledger.credit(
        &student,
        1000.0,
        classbank_core::ledger::TxCategory::Bonus,
        "",
        &config,
        &clock,
    );

    for _ in 0..5 {
        assert!(engine.donate(&student, 10.0, "class fund").unwrap());
    }
    let row = engine.ledger.student(&student).unwrap();
    assert!(row.achievements.contains("philanthropist"));
}

#[test]
fn activity_streak_unlocks_streak_keeper() {
    let mut engine =
        EconEngine::in_memory(3, EconConfig::default(), fixed_clock()).unwrap();
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let student = engine.ledger.create_student(&classroom, "Chloe", &clock);

    for day in 0..7 {
        engine.record_activity(&classroom, &student, 0.5).unwrap();
        if day < 6 {
            engine.clock.advance_days(1);
        }
    }
    let row = engine.ledger.student(&student).unwrap();
    assert!(
        row.achievements.contains("streak_keeper"),
        "7 consecutive active days should unlock the streak badge"
    );
}
