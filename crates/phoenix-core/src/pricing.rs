//! 봇 렌탈 가격 책정.
//!
//! 최근 성공률에서 성능 배수를 구하고, 렌탈 생성가와 전략별 견적을 계산한다.

use serde::Serialize;

use crate::models::rental::RentalDuration;

/// 월간 견적 할인율 (20%)
const MONTHLY_DISCOUNT: f64 = 0.8;

/// 성공률(%) → 성능 배수
pub fn performance_multiplier(success_rate_pct: f64) -> f64 {
    if success_rate_pct > 95.0 {
        1.5
    } else if success_rate_pct > 90.0 {
        1.25
    } else if success_rate_pct > 80.0 {
        1.0
    } else {
        0.8
    }
}

/// 렌탈 생성 가격 = 기간 기본가 × 성능 배수
pub fn rental_price(duration: RentalDuration, success_rate_pct: f64) -> (f64, f64) {
    let multiplier = performance_multiplier(success_rate_pct);
    (duration.base_price() * multiplier, multiplier)
}

/// 봇 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Arbitrage,
    Mev,
    Trading,
    Monitoring,
    Defi,
    Nft,
}

impl Strategy {
    /// 봇 식별자에서 전략 추정
    pub fn from_bot_id(bot_id: &str) -> Self {
        let id = bot_id.to_lowercase();
        if id.contains("mev") {
            Self::Mev
        } else if id.contains("trade") || id.contains("snipe") {
            Self::Trading
        } else if id.contains("monitor") {
            Self::Monitoring
        } else {
            Self::Arbitrage
        }
    }

    /// 시간당 기본 가격
    pub fn base_hourly(&self) -> f64 {
        match self {
            Self::Arbitrage => 0.5,
            Self::Mev => 0.8,
            Self::Trading => 0.6,
            Self::Monitoring => 0.3,
            Self::Defi => 0.7,
            Self::Nft => 0.4,
        }
    }
}

/// 렌탈 견적
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
    pub performance_multiplier: f64,
    pub base_strategy: Strategy,
}

/// 전략 기본가 × 성능 배수로 기간별 견적 (소수점 2자리)
pub fn quote(bot_id: &str, success_rate_pct: f64) -> PriceQuote {
    let strategy = Strategy::from_bot_id(bot_id);
    let multiplier = performance_multiplier(success_rate_pct);
    let hourly = strategy.base_hourly() * multiplier;

    PriceQuote {
        hourly: round2(hourly),
        daily: round2(hourly * 24.0),
        monthly: round2(hourly * 24.0 * 30.0 * MONTHLY_DISCOUNT),
        performance_multiplier: round2(multiplier),
        base_strategy: strategy,
    }
}

/// 소수점 2자리 반올림
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
