//! econ-runner: headless demo runner for the ClassBank economy core.
//!
//! Usage:
//!   econ-runner --seed 42 --days 90 --db run.db

use anyhow::Result;
use classbank_core::{
    clock::SimClock,
    config::EconConfig,
    engine::EconEngine,
    market::Sector,
    savings::AccountKind,
    types::EntityId,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 90u32);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");

    let config = EconConfig::default();
    let mut engine = if db == ":memory:" {
        EconEngine::in_memory(seed, config, SimClock::system())?
    } else {
        EconEngine::open(db, seed, config, SimClock::system())?
    };

    let classroom = engine
        .ledger
        .create_classroom("Room 4B", "Bankbucks", &engine.clock.clone());
    let students = seed_classroom(&mut engine, &classroom)?;

    log::info!("seeded classroom {classroom} with {} students", students.len());

    for day in 1..=days {
        // Weekly payday, Mondays.
        if day % 7 == 1 {
            for student in &students {
                engine.pay_salary(student)?;
            }
        }
        // A little trading and saving to move the analytics.
        if day % 5 == 0 {
            let stock_id = engine.market.classroom_stocks(&classroom)[0].id.clone();
            engine.buy_stock(&students[0], &stock_id, 2)?;
        }
        if day == 10 {
            engine.open_savings(&students[1], AccountKind::Deposit, 500.0, 3.6, 6)?;
        }
        for student in &students {
            engine.record_activity(&classroom, student, 0.6)?;
        }
        engine.advance_day()?;
    }

    print_summary(&engine, &classroom);
    Ok(())
}

fn seed_classroom(engine: &mut EconEngine, classroom: &str) -> Result<Vec<EntityId>> {
    let clock = engine.clock.clone();
    let names = ["Ava", "Ben", "Chloe", "Dev", "Emma", "Felix"];
    let students: Vec<EntityId> = names
        .iter()
        .map(|name| engine.ledger.create_student(classroom, name, &clock))
        .collect();

    let teller = engine.ledger.create_job(classroom, "Bank Teller", 120.0, 2);
    let librarian = engine.ledger.create_job(classroom, "Librarian", 100.0, 2);
    let janitor = engine.ledger.create_job(classroom, "Caretaker", 90.0, 2);
    for (i, student) in students.iter().enumerate() {
        let job = match i % 3 {
            0 => &teller,
            1 => &librarian,
            _ => &janitor,
        };
        engine.ledger.assign_job(student, job);
    }

    let catalog = [
        ("GRN", "GreenGrow Co", Sector::Environment, 50.0),
        ("SOL", "Solar Sprouts", Sector::Environment, 40.0),
        ("BYT", "ByteWorks", Sector::Technology, 80.0),
        ("ROB", "RoboLab", Sector::Technology, 65.0),
        ("SNK", "SnackStand", Sector::Food, 30.0),
        ("LMN", "Lemonade Ltd", Sector::Food, 25.0),
    ];
    for (symbol, name, sector, price) in catalog {
        engine
            .market
            .create_stock(classroom, symbol, name, sector, price);
    }
    engine.flush()?;
    Ok(students)
}

fn print_summary(engine: &EconEngine, classroom: &str) {
    let metrics = engine
        .analytics
        .economic_metrics(&engine.ledger, &engine.market, classroom, &engine.clock);
    let trend = engine
        .analytics
        .predict_economic_trend(&engine.ledger, classroom);
    let mood = engine.market.market_mood(classroom);
    let patterns = engine
        .analytics
        .transaction_patterns(&engine.market, classroom, None);

    println!("=== ClassBank run summary ===");
    println!("date:               {}", engine.clock.day_key());
    println!("avg balance:        {:.2}", metrics.average_balance);
    println!("total circulation:  {:.2}", metrics.total_circulation);
    println!("employment rate:    {:.1}%", metrics.employment_rate);
    println!("participation:      {:.1}%", metrics.market_participation);
    println!("savings rate:       {:.1}%", metrics.savings_rate);
    println!("7d trading volume:  {:.2}", metrics.trading_volume_7d);
    println!("inflation proxy:    {:.1}%", metrics.inflation_proxy);
    println!("gini:               {:.3}", trend.gini);
    println!("trend:              {:?} (score {})", trend.trend, trend.score);
    println!("market mood:        {mood:?}");
    println!(
        "trades:             {} buys / {} sells ({:?})",
        patterns.buy_count, patterns.sell_count, patterns.trading_style
    );
    for news in engine.news.active_news(classroom, &engine.clock) {
        println!("news [{:?}/{}]: {}", news.impact, news.severity, news.headline);
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
