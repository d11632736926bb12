//! Savings engine tests — accrual math, the calendar-month gate,
//! early withdrawal and maturity.

use chrono::{TimeZone, Utc};
use classbank_core::{
    clock::SimClock,
    savings::{AccountKind, SavingsStore},
};

fn clock_at(y: i32, m: u32, d: u32) -> SimClock {
    SimClock::fixed(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
}

#[test]
fn deposit_maturity_uses_compound_interest() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Deposit, 10_000.0, 3.6, 12, &clock)
        .unwrap();
    let account = store.account(&id).unwrap();
    // 10000 x 1.003^12
    let maturity = account.maturity_amount();
    assert!(
        (maturity - 10_366.0).abs() < 1.0,
        "deposit maturity {maturity:.1} should be ~10366"
    );
}

#[test]
fn installment_maturity_uses_annuity_future_value() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Installment, 200.0, 3.6, 12, &clock)
        .unwrap();
    let account = store.account(&id).unwrap();
    let r: f64 = 0.003;
    let expected = 200.0 * ((1.0 + r).powf(12.0) - 1.0) / r;
    assert!((account.maturity_amount() - expected).abs() < 1e-6);
}

#[test]
fn installment_zero_rate_falls_back_to_linear_sum() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Installment, 250.0, 0.0, 10, &clock)
        .unwrap();
    assert_eq!(store.account(&id).unwrap().maturity_amount(), 2500.0);
}

#[test]
fn monthly_interest_runs_at_most_once_per_calendar_month() {
    let mut store = SavingsStore::default();
    let mut clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Deposit, 10_000.0, 3.6, 12, &clock)
        .unwrap();

    let first = store.process_monthly_interest(&clock).unwrap();
    assert!((first - 30.0).abs() < 1e-9, "deposit accrues principal x 0.3%");

    // Second invocation inside the same month is gated.
    clock.advance_days(10);
    assert_eq!(store.process_monthly_interest(&clock), None);
    assert!((store.account(&id).unwrap().total_balance - 10_030.0).abs() < 1e-9);

    // Crossing the month boundary accrues again (still on principal).
    clock.advance_days(25); // 2026-04-06
    let second = store.process_monthly_interest(&clock).unwrap();
    assert!((second - 30.0).abs() < 1e-9);
    assert!((store.account(&id).unwrap().total_balance - 10_060.0).abs() < 1e-9);
}

#[test]
fn installment_batch_credits_deposit_and_compounds_on_balance() {
    let mut store = SavingsStore::default();
    let mut clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Installment, 1000.0, 12.0, 12, &clock)
        .unwrap();

    // Month 1: balance 0, interest 0, then the deposit lands.
    store.process_monthly_interest(&clock);
    assert_eq!(store.account(&id).unwrap().total_balance, 1000.0);

    // Month 2: 1% on the running balance, then another deposit.
    clock.advance_days(31);
    let credited = store.process_monthly_interest(&clock).unwrap();
    assert!((credited - 10.0).abs() < 1e-9);
    assert!((store.account(&id).unwrap().total_balance - 2010.0).abs() < 1e-9);
}

#[test]
fn early_withdrawal_pays_half_a_month_of_interest() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Deposit, 10_000.0, 3.6, 12, &clock)
        .unwrap();
    store.process_monthly_interest(&clock); // balance 10030

    // Available: max(principal, 10030 - 15) = 10015.
    assert!(!store.withdraw(&id, 10_016.0), "over the penalty-capped amount");
    assert!(store.withdraw(&id, 10_015.0));
    assert!((store.account(&id).unwrap().total_balance - 15.0).abs() < 1e-9);
}

#[test]
fn early_withdrawal_never_eats_into_principal_cap() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    // No interest accrued yet: available = max(principal, p - penalty) = p.
    let id = store
        .open_account("s1", AccountKind::Deposit, 5000.0, 3.6, 12, &clock)
        .unwrap();
    assert!(store.withdraw(&id, 5000.0));
    assert!(!store.withdraw(&id, 1.0), "account is empty");
}

#[test]
fn maturity_is_one_shot_and_date_gated() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Deposit, 10_000.0, 3.6, 12, &clock)
        .unwrap();

    assert!(
        !store.process_maturity(&id, &clock),
        "term has not elapsed yet"
    );

    let later = clock_at(2027, 3, 3);
    assert!(store.process_maturity(&id, &later));
    let matured = store.account(&id).unwrap();
    assert!(matured.is_matured);
    assert!((matured.total_balance - matured.maturity_amount()).abs() < 1e-9);

    // Already matured: no-op, balance untouched.
    assert!(!store.process_maturity(&id, &later));
}

#[test]
fn matured_account_allows_full_withdrawal() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Deposit, 10_000.0, 3.6, 12, &clock)
        .unwrap();
    let later = clock_at(2027, 4, 1);
    assert_eq!(store.process_due_maturities(&later), 1);

    let balance = store.account(&id).unwrap().total_balance;
    assert!(store.withdraw(&id, balance));
    assert_eq!(store.account(&id).unwrap().total_balance, 0.0);
}

#[test]
fn matured_accounts_are_skipped_by_the_monthly_batch() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    let id = store
        .open_account("s1", AccountKind::Deposit, 10_000.0, 3.6, 1, &clock)
        .unwrap();
    let later = clock_at(2026, 4, 10);
    store.process_due_maturities(&later);
    let locked = store.account(&id).unwrap().total_balance;

    let credited = store.process_monthly_interest(&later);
    assert_eq!(credited, Some(0.0), "only matured accounts exist");
    assert_eq!(store.account(&id).unwrap().total_balance, locked);
}

#[test]
fn operations_on_unknown_accounts_are_noops() {
    let mut store = SavingsStore::default();
    let clock = clock_at(2026, 3, 2);
    assert!(!store.withdraw("nope", 10.0));
    assert!(!store.process_maturity("nope", &clock));
    assert!(store.account("nope").is_none());
}
