//! Tuning constants for one classroom economy.
//!
//! `EconConfig::default()` carries the built-in catalog used by tests
//! and the runner; `EconConfig::load()` reads teacher-customized JSON.

use crate::{
    achievements::{Achievement, AchievementCondition},
    market::Sector,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    /// Credit score delta applied on every ledger transaction.
    pub transaction_bonus: i32,
    /// Credit score delta applied when an achievement unlocks.
    pub achievement_bonus: i32,
    pub late_penalty: i32,
    pub homework_penalty: i32,
    pub book_overdue_penalty: i32,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            transaction_bonus: 2,
            achievement_bonus: 25,
            late_penalty: 3,
            homework_penalty: 5,
            book_overdue_penalty: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SectorProfile {
    pub sector: Sector,
    pub volatility_mult: f64,
    /// Shift of the random walk's midpoint; positive skews gains.
    pub drift: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Base per-tick volatility as a fraction of price.
    pub base_volatility: f64,
    pub sector_profiles: Vec<SectorProfile>,
}

impl MarketConfig {
    pub fn profile(&self, sector: Sector) -> SectorProfile {
        self.sector_profiles
            .iter()
            .find(|p| p.sector == sector)
            .copied()
            .unwrap_or(SectorProfile {
                sector,
                volatility_mult: 1.0,
                drift: 0.0,
            })
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_volatility: 0.10,
            sector_profiles: vec![
                // Environmental sector skews positive; technology runs
                // hotter, food quieter. Pedagogical contrast, on purpose.
                SectorProfile {
                    sector: Sector::Environment,
                    volatility_mult: 1.0,
                    drift: 0.10,
                },
                SectorProfile {
                    sector: Sector::Technology,
                    volatility_mult: 1.5,
                    drift: 0.0,
                },
                SectorProfile {
                    sector: Sector::Food,
                    volatility_mult: 0.7,
                    drift: 0.0,
                },
                SectorProfile {
                    sector: Sector::Industry,
                    volatility_mult: 1.0,
                    drift: 0.0,
                },
                SectorProfile {
                    sector: Sector::Consumer,
                    volatility_mult: 1.0,
                    drift: 0.0,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsTemplate {
    pub sector: Sector,
    /// Headline with a `{value}` placeholder for the day's indicator.
    pub headline: String,
    /// Indicator at or above this reads as positive news.
    pub positive_above: f64,
    /// Indicator at or below this reads as negative news.
    pub negative_below: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconConfig {
    #[serde(default)]
    pub credit: CreditConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default = "default_news_templates")]
    pub news_templates: Vec<NewsTemplate>,
    #[serde(default = "default_achievements")]
    pub achievements: Vec<Achievement>,
}

impl Default for EconConfig {
    fn default() -> Self {
        Self {
            credit: CreditConfig::default(),
            market: MarketConfig::default(),
            news_templates: default_news_templates(),
            achievements: default_achievements(),
        }
    }
}

impl EconConfig {
    /// Load a teacher-customized config file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn template(sector: Sector, headline: &str, positive_above: f64, negative_below: f64) -> NewsTemplate {
    NewsTemplate {
        sector,
        headline: headline.to_string(),
        positive_above,
        negative_below,
    }
}

fn default_news_templates() -> Vec<NewsTemplate> {
    vec![
        template(
            Sector::Environment,
            "Sustainability index hits {value} as green projects expand",
            60.0,
            30.0,
        ),
        template(
            Sector::Environment,
            "Recycling drive scores {value} in the class eco-audit",
            55.0,
            25.0,
        ),
        template(
            Sector::Technology,
            "Innovation index at {value} after the robotics showcase",
            65.0,
            35.0,
        ),
        template(
            Sector::Technology,
            "Gadget demand meter reads {value} this week",
            70.0,
            40.0,
        ),
        template(
            Sector::Food,
            "Cafeteria harvest report comes in at {value}",
            60.0,
            35.0,
        ),
        template(
            Sector::Food,
            "Snack supply index steady at {value}",
            65.0,
            30.0,
        ),
        template(
            Sector::Industry,
            "Workshop output gauge posts {value}",
            60.0,
            30.0,
        ),
        template(
            Sector::Consumer,
            "Class store footfall index lands on {value}",
            60.0,
            30.0,
        ),
    ]
}

fn achievement(
    id: &str,
    title: &str,
    description: &str,
    points: i32,
    condition: AchievementCondition,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        points,
        condition,
        active: true,
    }
}

fn default_achievements() -> Vec<Achievement> {
    vec![
        achievement(
            "first_transaction",
            "First Paycheck",
            "Complete your first ledger transaction",
            10,
            AchievementCondition::TransactionCount(1),
        ),
        achievement(
            "busy_trader",
            "Busy Bee",
            "Complete 25 ledger transactions",
            20,
            AchievementCondition::TransactionCount(25),
        ),
        achievement(
            "saver",
            "Piggy Bank",
            "Hold 5000 in savings accounts",
            20,
            AchievementCondition::AmountSaved(5000.0),
        ),
        achievement(
            "investor",
            "Market Mover",
            "Earn 1000 in stock profits",
            30,
            AchievementCondition::ProfitEarned(1000.0),
        ),
        achievement(
            "steady_worker",
            "Steady Worker",
            "Collect 10 salary payments",
            15,
            AchievementCondition::JobsCompleted(10),
        ),
        achievement(
            "philanthropist",
            "Philanthropist",
            "Make 5 donations",
            25,
            AchievementCondition::DonationsMade(5),
        ),
        achievement(
            "portfolio_builder",
            "Portfolio Builder",
            "Hold stocks worth 10000",
            30,
            AchievementCondition::PortfolioValue(10000.0),
        ),
        achievement(
            "streak_keeper",
            "Streak Keeper",
            "Stay active 7 days in a row",
            15,
            AchievementCondition::ConsecutiveDays(7),
        ),
    ]
}
