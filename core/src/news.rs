//! Synthetic market news, keyed off one randomized indicators record
//! per classroom per UTC day.
//!
//! Idempotence: a second generation call on the same day returns the
//! day's existing record instead of re-rolling. News items expire 24
//! hours after creation.

use crate::{
    clock::SimClock,
    config::{EconConfig, NewsTemplate},
    market::Sector,
    rng::SubsystemRng,
    types::{ClassroomId, EntityId},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsImpact {
    Positive,
    Neutral,
    Negative,
}

/// One indicators row per classroom per day. Values are 0–100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketIndicators {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    /// UTC day key, "YYYY-MM-DD".
    pub date: String,
    pub values: BTreeMap<String, f64>,
}

impl MarketIndicators {
    pub fn value_for(&self, sector: Sector) -> f64 {
        self.values
            .get(sector_key(sector))
            .copied()
            .unwrap_or(50.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketNews {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    pub sector: Sector,
    pub headline: String,
    pub impact: NewsImpact,
    /// 1 (minor) to 5 (major), clamped.
    pub severity: u8,
    pub indicator_value: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn sector_key(sector: Sector) -> &'static str {
    match sector {
        Sector::Environment => "environment",
        Sector::Technology => "technology",
        Sector::Food => "food",
        Sector::Industry => "industry",
        Sector::Consumer => "consumer",
    }
}

#[derive(Default)]
pub struct NewsStore {
    pub indicators: Vec<MarketIndicators>,
    pub news: Vec<MarketNews>,
}

impl NewsStore {
    /// The day's indicators for a classroom, rolling them once per UTC
    /// day. A second call on the same day returns the existing record.
    pub fn ensure_indicators(
        &mut self,
        classroom_id: &str,
        clock: &SimClock,
        rng: &mut SubsystemRng,
    ) -> &MarketIndicators {
        let date = clock.day_key();
        if let Some(idx) = self
            .indicators
            .iter()
            .position(|i| i.classroom_id == classroom_id && i.date == date)
        {
            return &self.indicators[idx];
        }
        let mut values = BTreeMap::new();
        for sector in [
            Sector::Environment,
            Sector::Technology,
            Sector::Food,
            Sector::Industry,
            Sector::Consumer,
        ] {
            values.insert(sector_key(sector).to_string(), rng.next_f64_in(0.0, 100.0));
        }
        self.indicators.push(MarketIndicators {
            id: Uuid::new_v4().to_string(),
            classroom_id: classroom_id.to_string(),
            date,
            values,
        });
        self.indicators.last().expect("just pushed")
    }

    /// Generate the day's news for the sectors traded in a classroom.
    /// Idempotent per day: if any news was already created today for
    /// the classroom, nothing new is rolled.
    pub fn generate_daily_news(
        &mut self,
        classroom_id: &str,
        sectors: &[Sector],
        config: &EconConfig,
        clock: &SimClock,
        rng: &mut SubsystemRng,
    ) -> usize {
        let today = clock.day_key();
        let already = self.news.iter().any(|n| {
            n.classroom_id == classroom_id && n.created_at.format("%Y-%m-%d").to_string() == today
        });
        if already {
            return 0;
        }
        let indicators = self.ensure_indicators(classroom_id, clock, rng).clone();
        let mut created = 0;
        for &sector in sectors {
            let candidates: Vec<&NewsTemplate> = config
                .news_templates
                .iter()
                .filter(|t| t.sector == sector)
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let template = candidates[rng.next_u64_below(candidates.len() as u64) as usize];
            let value = indicators.value_for(sector);
            let impact = if value >= template.positive_above {
                NewsImpact::Positive
            } else if value <= template.negative_below {
                NewsImpact::Negative
            } else {
                NewsImpact::Neutral
            };
            // Severity grows with the distance from the neutral midpoint.
            let severity = (((value - 50.0).abs() / 10.0).round() as i64).clamp(1, 5) as u8;
            self.news.push(MarketNews {
                id: Uuid::new_v4().to_string(),
                classroom_id: classroom_id.to_string(),
                sector,
                headline: template.headline.replace("{value}", &format!("{value:.0}")),
                impact,
                severity,
                indicator_value: value,
                created_at: clock.now,
                expires_at: clock.now + Duration::hours(24),
            });
            created += 1;
        }
        created
    }

    /// News not yet past its 24-hour expiry.
    pub fn active_news(&self, classroom_id: &str, clock: &SimClock) -> Vec<&MarketNews> {
        self.news
            .iter()
            .filter(|n| n.classroom_id == classroom_id && n.expires_at > clock.now)
            .collect()
    }

    /// Drop expired news and indicator rows older than today. Keeps the
    /// persisted collections bounded.
    pub fn prune(&mut self, clock: &SimClock) {
        let today = clock.day_key();
        self.news.retain(|n| n.expires_at > clock.now);
        self.indicators.retain(|i| i.date == today);
    }
}
