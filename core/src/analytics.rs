//! Analytics engine — derived economic metrics.
//!
//! This engine is REACTIVE. It never mutates the ledger, market or
//! savings stores; every metric is recomputed from current store state
//! on demand (pull-based, no incremental maintenance). The one piece of
//! owned state is a pair of snapshot sequences (market participation,
//! savings rate) appended by upstream callers, never by the engine.

use crate::{
    activity::ActivityStore,
    clock::SimClock,
    ledger::LedgerStore,
    market::{MarketStore, TradeSide},
    types::{Money, StudentId},
};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One externally-recorded rate observation, in percent (0–100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub at: DateTime<Utc>,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconTrend {
    Growing,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStyle {
    Aggressive,
    Conservative,
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicMetrics {
    pub average_balance: Money,
    pub total_circulation: Money,
    /// Percent of active students holding a job.
    pub employment_rate: f64,
    /// Latest externally-recorded snapshots; 0 when none recorded yet.
    pub market_participation: f64,
    pub savings_rate: f64,
    /// Trailing 7-day stock trading volume in currency units.
    pub trading_volume_7d: Money,
    /// Mean per-stock percentage price change this tick, annualized ×12.
    /// A simplification, not a CPI computation.
    pub inflation_proxy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPatterns {
    pub buy_count: u64,
    pub sell_count: u64,
    /// buys per sell; equals buy_count when no sells exist.
    pub buy_sell_ratio: f64,
    pub average_size: Money,
    pub hourly: [u64; 24],
    pub peak_hour: u32,
    pub trading_style: TradingStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub score: i32,
    pub trend: EconTrend,
    pub gini: f64,
    pub participation: f64,
    pub employment_rate: f64,
    pub savings_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlag {
    pub student_id: StudentId,
    pub balance: Money,
    pub unemployed: bool,
    pub low_credit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentHeatmap {
    pub student_id: StudentId,
    /// Monday-first weekday histogram.
    pub weekday: [u64; 7],
    pub hourly: [u64; 24],
    /// round(100 × mean activity level); 0 with no records.
    pub activity_score: u32,
}

/// Discrete Gini coefficient over a balance population.
/// 0 for perfect equality; (n−1)/n when one member holds all wealth.
/// Returns 0 for empty input or zero total wealth.
pub fn gini_coefficient(balances: &[Money]) -> f64 {
    let n = balances.len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = balances.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, b)| (i as f64 + 1.0) * b)
        .sum();
    let n = n as f64;
    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

#[derive(Default)]
pub struct AnalyticsEngine {
    pub market_participation: Vec<RateSnapshot>,
    pub savings_rates: Vec<RateSnapshot>,
}

impl AnalyticsEngine {
    /// Append an externally-computed participation observation.
    pub fn record_participation(&mut self, rate: f64, clock: &SimClock) {
        self.market_participation.push(RateSnapshot {
            at: clock.now,
            rate,
        });
    }

    /// Append an externally-computed savings-rate observation.
    pub fn record_savings_rate(&mut self, rate: f64, clock: &SimClock) {
        self.savings_rates.push(RateSnapshot {
            at: clock.now,
            rate,
        });
    }

    fn latest_participation(&self) -> f64 {
        latest_rate(&self.market_participation)
    }

    fn latest_savings_rate(&self) -> f64 {
        latest_rate(&self.savings_rates)
    }

    pub fn economic_metrics(
        &self,
        ledger: &LedgerStore,
        market: &MarketStore,
        classroom_id: &str,
        clock: &SimClock,
    ) -> EconomicMetrics {
        let roster = ledger.roster(classroom_id);
        let total_circulation: Money = roster.iter().map(|s| s.balance).sum();
        let average_balance = if roster.is_empty() {
            0.0
        } else {
            total_circulation / roster.len() as f64
        };
        let employed = roster.iter().filter(|s| s.job_id.is_some()).count();
        let employment_rate = if roster.is_empty() {
            0.0
        } else {
            employed as f64 / roster.len() as f64 * 100.0
        };

        let week_ago = clock.now - Duration::days(7);
        let trading_volume_7d: Money = market
            .classroom_trades(classroom_id)
            .iter()
            .filter(|t| t.at > week_ago)
            .map(|t| t.amount)
            .sum();

        let stocks = market.classroom_stocks(classroom_id);
        let inflation_proxy = if stocks.is_empty() {
            0.0
        } else {
            let mean_change: f64 =
                stocks.iter().map(|s| s.change_pct()).sum::<f64>() / stocks.len() as f64;
            mean_change * 12.0
        };

        EconomicMetrics {
            average_balance,
            total_circulation,
            employment_rate,
            market_participation: self.latest_participation(),
            savings_rate: self.latest_savings_rate(),
            trading_volume_7d,
            inflation_proxy,
        }
    }

    /// Buy/sell pattern classification over the classroom's stock
    /// trades, optionally narrowed to one student.
    pub fn transaction_patterns(
        &self,
        market: &MarketStore,
        classroom_id: &str,
        student_id: Option<&str>,
    ) -> TransactionPatterns {
        let trades: Vec<_> = market
            .classroom_trades(classroom_id)
            .into_iter()
            .filter(|t| student_id.map_or(true, |id| t.student_id == id))
            .collect();

        let buy_count = trades.iter().filter(|t| t.side == TradeSide::Buy).count() as u64;
        let sell_count = trades.iter().filter(|t| t.side == TradeSide::Sell).count() as u64;
        let buy_sell_ratio = if sell_count == 0 {
            buy_count as f64
        } else {
            buy_count as f64 / sell_count as f64
        };
        let average_size = if trades.is_empty() {
            0.0
        } else {
            trades.iter().map(|t| t.amount).sum::<f64>() / trades.len() as f64
        };

        let mut hourly = [0u64; 24];
        for trade in &trades {
            hourly[trade.at.hour() as usize] += 1;
        }
        let peak_hour = hourly
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(hour, _)| hour as u32)
            .unwrap_or(0);

        let trading_style = if buy_count as f64 > 1.5 * sell_count as f64 {
            TradingStyle::Aggressive
        } else if sell_count as f64 > 1.5 * buy_count as f64 {
            TradingStyle::Conservative
        } else {
            TradingStyle::Balanced
        };

        TransactionPatterns {
            buy_count,
            sell_count,
            buy_sell_ratio,
            average_size,
            hourly,
            peak_hour,
            trading_style,
        }
    }

    /// Additive scored heuristic — a fixed, deterministic rule table.
    ///
    ///   participation >70 → +2, >40 → +1, else −1
    ///   employment    >80 → +2, >50 → +1, else −1
    ///   savings       >30 → +1, <10 → −1
    ///   gini         <0.3 → +1, >0.5 → −2
    ///
    /// growing at score ≥ 3, declining at ≤ −2, else stable.
    pub fn predict_economic_trend(
        &self,
        ledger: &LedgerStore,
        classroom_id: &str,
    ) -> TrendPrediction {
        let roster = ledger.roster(classroom_id);
        let balances: Vec<Money> = roster.iter().map(|s| s.balance).collect();
        let gini = gini_coefficient(&balances);
        let employed = roster.iter().filter(|s| s.job_id.is_some()).count();
        let employment_rate = if roster.is_empty() {
            0.0
        } else {
            employed as f64 / roster.len() as f64 * 100.0
        };
        let participation = self.latest_participation();
        let savings_rate = self.latest_savings_rate();

        let mut score = 0i32;
        score += if participation > 70.0 {
            2
        } else if participation > 40.0 {
            1
        } else {
            -1
        };
        score += if employment_rate > 80.0 {
            2
        } else if employment_rate > 50.0 {
            1
        } else {
            -1
        };
        if savings_rate > 30.0 {
            score += 1;
        } else if savings_rate < 10.0 {
            score -= 1;
        }
        if gini < 0.3 {
            score += 1;
        } else if gini > 0.5 {
            score -= 2;
        }

        let trend = if score >= 3 {
            EconTrend::Growing
        } else if score <= -2 {
            EconTrend::Declining
        } else {
            EconTrend::Stable
        };

        TrendPrediction {
            score,
            trend,
            gini,
            participation,
            employment_rate,
            savings_rate,
        }
    }

    /// Flag students whose balance is below 30% of the classroom
    /// average AND who carry a secondary risk factor (unemployed or
    /// credit score under 500). Both branches are required.
    pub fn identify_risk_students(
        &self,
        ledger: &LedgerStore,
        classroom_id: &str,
    ) -> Vec<RiskFlag> {
        let roster = ledger.roster(classroom_id);
        if roster.is_empty() {
            return Vec::new();
        }
        let average: Money =
            roster.iter().map(|s| s.balance).sum::<f64>() / roster.len() as f64;
        roster
            .iter()
            .filter(|s| s.balance < 0.3 * average)
            .filter(|s| s.job_id.is_none() || s.credit_score < 500)
            .map(|s| RiskFlag {
                student_id: s.id.clone(),
                balance: s.balance,
                unemployed: s.job_id.is_none(),
                low_credit: s.credit_score < 500,
            })
            .collect()
    }

    /// Weekly/hourly engagement histograms per student, with a 0–100
    /// activity score (0 when a student has no recorded activity).
    pub fn student_activity_heatmap(
        &self,
        ledger: &LedgerStore,
        activity: &ActivityStore,
        classroom_id: &str,
    ) -> Vec<StudentHeatmap> {
        ledger
            .roster(classroom_id)
            .iter()
            .map(|student| {
                let records = activity.student_records(&student.id);
                let mut weekday = [0u64; 7];
                let mut hourly = [0u64; 24];
                for record in &records {
                    weekday[record.at.weekday().num_days_from_monday() as usize] += 1;
                    hourly[record.at.hour() as usize] += 1;
                }
                let activity_score = if records.is_empty() {
                    0
                } else {
                    let mean: f64 = records.iter().map(|r| r.activity_level).sum::<f64>()
                        / records.len() as f64;
                    (100.0 * mean).round() as u32
                };
                StudentHeatmap {
                    student_id: student.id.clone(),
                    weekday,
                    hourly,
                    activity_score,
                }
            })
            .collect()
    }
}

fn latest_rate(snapshots: &[RateSnapshot]) -> f64 {
    snapshots
        .iter()
        .max_by_key(|s| s.at)
        .map(|s| s.rate)
        .unwrap_or(0.0)
}
