//! Market simulator — classroom stocks, sector-conditioned random-walk
//! price ticks, and student portfolios.
//!
//! RULES:
//!   - Price changes flow through the Market RNG stream only.
//!   - A tick never drops a price below 50% of its pre-tick value, and
//!     prices are held to whole currency units (min 1).
//!   - previous_price always holds the pre-tick price of the same tick
//!     that produced current_price, so one read of both yields the
//!     period return.
//!   - A portfolio row with quantity 0 is removed, never kept.

use crate::{
    clock::SimClock,
    config::EconConfig,
    rng::SubsystemRng,
    types::{ClassroomId, EntityId, Money, StudentId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Environment,
    Technology,
    Food,
    Industry,
    Consumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMood {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    pub symbol: String,
    pub name: String,
    pub sector: Sector,
    pub current_price: Money,
    pub previous_price: Money,
}

impl Stock {
    pub fn gained(&self) -> bool {
        self.current_price > self.previous_price
    }

    /// Percentage change of the last tick, e.g. 3.0 for +3%.
    pub fn change_pct(&self) -> f64 {
        if self.previous_price <= 0.0 {
            return 0.0;
        }
        (self.current_price - self.previous_price) / self.previous_price * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub student_id: StudentId,
    pub stock_id: EntityId,
    pub quantity: u64,
    pub average_price: Money,
    pub total_cost: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One immutable trade record. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    pub student_id: StudentId,
    pub stock_id: EntityId,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: Money,
    pub amount: Money,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MarketStore {
    pub stocks: Vec<Stock>,
    pub portfolios: Vec<Portfolio>,
    pub transactions: Vec<StockTransaction>,
}

impl MarketStore {
    pub fn create_stock(
        &mut self,
        classroom_id: &str,
        symbol: &str,
        name: &str,
        sector: Sector,
        initial_price: Money,
    ) -> EntityId {
        let id = Uuid::new_v4().to_string();
        let price = initial_price.floor().max(1.0);
        self.stocks.push(Stock {
            id: id.clone(),
            classroom_id: classroom_id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector,
            current_price: price,
            previous_price: price,
        });
        id
    }

    pub fn stock(&self, id: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.id == id)
    }

    pub fn classroom_stocks(&self, classroom_id: &str) -> Vec<&Stock> {
        self.stocks
            .iter()
            .filter(|s| s.classroom_id == classroom_id)
            .collect()
    }

    /// Advance every stock of the classroom one tick. Returns the number
    /// of stocks updated.
    pub fn tick(&mut self, classroom_id: &str, config: &EconConfig, rng: &mut SubsystemRng) -> usize {
        let mut updated = 0;
        for stock in self
            .stocks
            .iter_mut()
            .filter(|s| s.classroom_id == classroom_id)
        {
            let profile = config.market.profile(stock.sector);
            let u = rng.next_f64();
            let change =
                (u - 0.5 + profile.drift) * config.market.base_volatility * profile.volatility_mult;
            let pre_tick = stock.current_price;
            let candidate = pre_tick * (1.0 + change);
            // Bounded daily downside, then whole currency units.
            stock.current_price = candidate.max(pre_tick * 0.5).floor().max(1.0);
            stock.previous_price = pre_tick;
            updated += 1;
        }
        updated
    }

    /// Bullish if >60% of stocks gained this tick, bearish if <40%.
    pub fn market_mood(&self, classroom_id: &str) -> MarketMood {
        let stocks = self.classroom_stocks(classroom_id);
        if stocks.is_empty() {
            return MarketMood::Neutral;
        }
        let gained = stocks.iter().filter(|s| s.gained()).count() as f64;
        let fraction = gained / stocks.len() as f64;
        if fraction > 0.6 {
            MarketMood::Bullish
        } else if fraction < 0.4 {
            MarketMood::Bearish
        } else {
            MarketMood::Neutral
        }
    }

    pub fn position(&self, student_id: &str, stock_id: &str) -> Option<&Portfolio> {
        self.portfolios
            .iter()
            .find(|p| p.student_id == student_id && p.stock_id == stock_id)
    }

    pub fn student_positions(&self, student_id: &str) -> Vec<&Portfolio> {
        self.portfolios
            .iter()
            .filter(|p| p.student_id == student_id)
            .collect()
    }

    /// Mark-to-market value of one student's holdings.
    pub fn portfolio_value(&self, student_id: &str) -> Money {
        self.portfolios
            .iter()
            .filter(|p| p.student_id == student_id)
            .map(|p| {
                self.stock(&p.stock_id)
                    .map(|s| s.current_price * p.quantity as f64)
                    .unwrap_or(0.0)
            })
            .sum()
    }

    /// Realized profit across all closed trades of one student:
    /// sell proceeds minus buy cost, plus current holdings at cost.
    pub fn realized_profit(&self, student_id: &str) -> Money {
        let sold: Money = self
            .transactions
            .iter()
            .filter(|t| t.student_id == student_id && t.side == TradeSide::Sell)
            .map(|t| t.amount)
            .sum();
        let bought: Money = self
            .transactions
            .iter()
            .filter(|t| t.student_id == student_id && t.side == TradeSide::Buy)
            .map(|t| t.amount)
            .sum();
        let held_cost: Money = self
            .portfolios
            .iter()
            .filter(|p| p.student_id == student_id)
            .map(|p| p.total_cost)
            .sum();
        sold + held_cost - bought
    }

    /// Record a buy at the stock's current price: append the trade and
    /// upsert the position, recomputing average price and total cost.
    /// The cash side lives in the ledger; the engine debits it first.
    pub fn record_buy(
        &mut self,
        student_id: &str,
        stock_id: &str,
        quantity: u64,
        clock: &SimClock,
    ) -> Option<Money> {
        if quantity == 0 {
            return None;
        }
        let (classroom_id, price) = match self.stock(stock_id) {
            Some(s) => (s.classroom_id.clone(), s.current_price),
            None => return None,
        };
        let amount = price * quantity as f64;
        match self
            .portfolios
            .iter_mut()
            .find(|p| p.student_id == student_id && p.stock_id == stock_id)
        {
            Some(position) => {
                position.total_cost += amount;
                position.quantity += quantity;
                position.average_price = position.total_cost / position.quantity as f64;
            }
            None => self.portfolios.push(Portfolio {
                student_id: student_id.to_string(),
                stock_id: stock_id.to_string(),
                quantity,
                average_price: price,
                total_cost: amount,
            }),
        }
        self.transactions.push(StockTransaction {
            id: Uuid::new_v4().to_string(),
            classroom_id,
            student_id: student_id.to_string(),
            stock_id: stock_id.to_string(),
            side: TradeSide::Buy,
            quantity,
            price,
            amount,
            at: clock.now,
        });
        Some(amount)
    }

    /// Record a sell at the stock's current price. The quantity sold
    /// never exceeds the held quantity; selling the full position
    /// removes the row. Returns the proceeds, or None on a business
    /// rule violation (no position, oversell, unknown stock).
    pub fn record_sell(
        &mut self,
        student_id: &str,
        stock_id: &str,
        quantity: u64,
        clock: &SimClock,
    ) -> Option<Money> {
        if quantity == 0 {
            return None;
        }
        let (classroom_id, price) = match self.stock(stock_id) {
            Some(s) => (s.classroom_id.clone(), s.current_price),
            None => return None,
        };
        let idx = self
            .portfolios
            .iter()
            .position(|p| p.student_id == student_id && p.stock_id == stock_id)?;
        if self.portfolios[idx].quantity < quantity {
            return None;
        }
        let amount = price * quantity as f64;
        {
            let position = &mut self.portfolios[idx];
            position.total_cost -= position.average_price * quantity as f64;
            position.quantity -= quantity;
        }
        if self.portfolios[idx].quantity == 0 {
            self.portfolios.swap_remove(idx);
        }
        self.transactions.push(StockTransaction {
            id: Uuid::new_v4().to_string(),
            classroom_id,
            student_id: student_id.to_string(),
            stock_id: stock_id.to_string(),
            side: TradeSide::Sell,
            quantity,
            price,
            amount,
            at: clock.now,
        });
        Some(amount)
    }

    pub fn classroom_trades(&self, classroom_id: &str) -> Vec<&StockTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.classroom_id == classroom_id)
            .collect()
    }
}
