//! Analytics engine tests — Gini, trend rules, patterns, risk flags.

use chrono::{TimeZone, Utc};
use classbank_core::{
    analytics::{gini_coefficient, AnalyticsEngine, EconTrend, TradingStyle},
    clock::SimClock,
    config::EconConfig,
    engine::EconEngine,
    market::Sector,
};

fn fixed_clock() -> SimClock {
    SimClock::fixed(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
}

fn engine(seed: u64) -> EconEngine {
    EconEngine::in_memory(seed, EconConfig::default(), fixed_clock()).unwrap()
}

#[test]
fn gini_zero_for_uniform_population() {
    assert_eq!(gini_coefficient(&[50.0, 50.0, 50.0, 50.0]), 0.0);
}

#[test]
fn gini_approaches_one_minus_one_over_n_for_single_holder() {
    for n in [2usize, 5, 10] {
        let mut balances = vec![0.0; n - 1];
        balances.push(1000.0);
        let expected = (n as f64 - 1.0) / n as f64;
        let gini = gini_coefficient(&balances);
        assert!(
            (gini - expected).abs() < 1e-9,
            "n={n}: gini {gini} != {expected}"
        );
    }
}

#[test]
fn gini_zero_for_empty_and_zero_wealth_populations() {
    assert_eq!(gini_coefficient(&[]), 0.0);
    assert_eq!(gini_coefficient(&[0.0, 0.0, 0.0]), 0.0);
}

#[test]
fn trend_rule_table_growing() {
    let mut engine = engine(1);
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let job = engine.ledger.create_job(&classroom, "Teller", 100.0, 10);
    for i in 0..4 {
        let student = engine
            .ledger
            .create_student(&classroom, &format!("s{i}"), &clock);
        engine.ledger.assign_job(&student, &job);
        engine.pay_salary(&student).unwrap(); // equal balances, gini 0
    }
    engine.analytics.record_participation(80.0, &clock);
    engine.analytics.record_savings_rate(35.0, &clock);

    let prediction = engine.analytics.predict_economic_trend(&engine.ledger, &classroom);
    // +2 participation, +2 employment (100%), +1 savings, +1 gini < 0.3
    assert_eq!(prediction.score, 6);
    assert_eq!(prediction.trend, EconTrend::Growing);
}

#[test]
fn trend_rule_table_declining() {
    let mut engine = engine(2);
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    // Nobody employed; one student hoards all wealth -> gini 0.75.
    for i in 0..4 {
        let student = engine
            .ledger
            .create_student(&classroom, &format!("s{i}"), &clock);
        if i == 0 {
            engine.ledger.credit(
                &student,
                1000.0,
                classbank_core::ledger::TxCategory::Bonus,
                "prize",
                &EconConfig::default(),
                &clock,
            );
        }
    }
    engine.analytics.record_participation(10.0, &clock);
    engine.analytics.record_savings_rate(5.0, &clock);

    let prediction = engine.analytics.predict_economic_trend(&engine.ledger, &classroom);
    // -1 participation, -1 employment, -1 savings, -2 gini > 0.5
    assert_eq!(prediction.score, -5);
    assert_eq!(prediction.trend, EconTrend::Declining);
    assert!(prediction.gini > 0.5, "gini {} should exceed 0.5", prediction.gini);
}

#[test]
fn trend_defaults_to_stable_with_no_snapshots() {
    let mut engine = engine(3);
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let job = engine.ledger.create_job(&classroom, "Teller", 100.0, 10);
    for i in 0..3 {
        let student = engine
            .ledger
            .create_student(&classroom, &format!("s{i}"), &clock);
        engine.ledger.assign_job(&student, &job);
    }
    let prediction = engine.analytics.predict_economic_trend(&engine.ledger, &classroom);
    // participation 0 (-1), employment 100% (+2), savings 0 (-1), gini 0 (+1)
    assert_eq!(prediction.score, 1);
    assert_eq!(prediction.trend, EconTrend::Stable);
}

#[test]
fn risk_flag_requires_low_balance_and_secondary_factor() {
    let mut engine = engine(4);
    let clock = engine.clock.clone();
    let config = EconConfig::default();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);

    // Average balance will be (1500 + 500) / 2 = 1000.
    let rich = engine.ledger.create_student(&classroom, "rich", &clock);
    engine.ledger.credit(
        &rich,
        1500.0,
        classbank_core::ledger::TxCategory::Bonus,
        "",
        &config,
        &clock,
    );
    // Unemployed but at exactly 0.5x average: fails the 0.3x threshold.
    let halfway = engine.ledger.create_student(&classroom, "halfway", &clock);
    engine.ledger.credit(
        &halfway,
        500.0,
        classbank_core::ledger::TxCategory::Bonus,
        "",
        &config,
        &clock,
    );

    let flags = engine.analytics.identify_risk_students(&engine.ledger, &classroom);
    assert!(
        flags.is_empty(),
        "student at 0.5x average must not be flagged: {flags:?}"
    );
}

#[test]
fn risk_flag_set_for_broke_unemployed_student() {
    let mut engine = engine(5);
    let clock = engine.clock.clone();
    let config = EconConfig::default();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let job = engine.ledger.create_job(&classroom, "Teller", 100.0, 10);

    let rich = engine.ledger.create_student(&classroom, "rich", &clock);
    engine.ledger.assign_job(&rich, &job);
    engine.ledger.credit(
        &rich,
        2000.0,
        classbank_core::ledger::TxCategory::Bonus,
        "",
        &config,
        &clock,
    );
    let broke = engine.ledger.create_student(&classroom, "broke", &clock);

    let flags = engine.analytics.identify_risk_students(&engine.ledger, &classroom);
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].student_id, broke);
    assert!(flags[0].unemployed);
}

#[test]
fn low_balance_employed_good_credit_is_not_at_risk() {
    let mut engine = engine(6);
    let clock = engine.clock.clone();
    let config = EconConfig::default();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let job = engine.ledger.create_job(&classroom, "Teller", 100.0, 10);

    let rich = engine.ledger.create_student(&classroom, "rich", &clock);
    engine.ledger.credit(
        &rich,
        2000.0,
        classbank_core::ledger::TxCategory::Bonus,
        "",
        &config,
        &clock,
    );
    // Low balance, but employed with the default 650 credit score.
    let poor_but_employed = engine.ledger.create_student(&classroom, "pe", &clock);
    engine.ledger.assign_job(&poor_but_employed, &job);

    let flags = engine.analytics.identify_risk_students(&engine.ledger, &classroom);
    assert!(flags.is_empty(), "secondary risk factor missing: {flags:?}");
}

#[test]
fn transaction_patterns_classify_trading_style() {
    let mut engine = engine(7);
    let clock = engine.clock.clone();
    let config = EconConfig::default();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let student = engine.ledger.create_student(&classroom, "s", &clock);
    engine.ledger.credit(
        &student,
        10_000.0,
        classbank_core::ledger::TxCategory::Bonus,
        "",
        &config,
        &clock,
    );
    let stock = engine
        .market
        .create_stock(&classroom, "BYT", "ByteWorks", Sector::Technology, 50.0);

    // Four buys, one sell: aggressive (4 > 1.5 x 1).
    for _ in 0..4 {
        assert!(engine.buy_stock(&student, &stock, 1).unwrap());
    }
    assert!(engine.sell_stock(&student, &stock, 1).unwrap());

    let patterns = engine
        .analytics
        .transaction_patterns(&engine.market, &classroom, Some(student.as_str()));
    assert_eq!(patterns.buy_count, 4);
    assert_eq!(patterns.sell_count, 1);
    assert_eq!(patterns.trading_style, TradingStyle::Aggressive);
    // All trades happened at the fixed clock's hour.
    assert_eq!(patterns.peak_hour, 9);
    assert_eq!(patterns.hourly[9], 5);
}

#[test]
fn heatmap_scores_zero_without_activity() {
    let mut engine = engine(8);
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let idle = engine.ledger.create_student(&classroom, "idle", &clock);
    let busy = engine.ledger.create_student(&classroom, "busy", &clock);
    engine.record_activity(&classroom, &busy, 0.8).unwrap();
    engine.record_activity(&classroom, &busy, 0.6).unwrap();

    let heatmap = engine
        .analytics
        .student_activity_heatmap(&engine.ledger, &engine.activity, &classroom);
    let idle_row = heatmap.iter().find(|h| h.student_id == idle).unwrap();
    let busy_row = heatmap.iter().find(|h| h.student_id == busy).unwrap();
    assert_eq!(idle_row.activity_score, 0);
    assert_eq!(busy_row.activity_score, 70); // round(100 x mean(0.8, 0.6))
    // Fixed clock is a Monday at 09:00.
    assert_eq!(busy_row.weekday[0], 2);
    assert_eq!(busy_row.hourly[9], 2);
}

#[test]
fn economic_metrics_defaults_are_zero_on_empty_classroom() {
    let mut engine = engine(9);
    let clock = engine.clock.clone();
    let classroom = engine.ledger.create_classroom("4B", "BB", &clock);
    let metrics = engine.analytics.economic_metrics(
        &engine.ledger,
        &engine.market,
        &classroom,
        &engine.clock,
    );
    assert_eq!(metrics.average_balance, 0.0);
    assert_eq!(metrics.employment_rate, 0.0);
    assert_eq!(metrics.market_participation, 0.0);
    assert_eq!(metrics.savings_rate, 0.0);
    assert_eq!(metrics.trading_volume_7d, 0.0);
}

#[test]
fn latest_snapshot_wins() {
    let mut analytics = AnalyticsEngine::default();
    let mut clock = fixed_clock();
    analytics.record_participation(20.0, &clock);
    clock.advance_days(1);
    analytics.record_participation(55.0, &clock);

    let engine = engine(10);
    // economic_metrics reads the latest-by-timestamp snapshot.
    let metrics =
        analytics.economic_metrics(&engine.ledger, &engine.market, "none", &clock);
    assert_eq!(metrics.market_participation, 55.0);
}
