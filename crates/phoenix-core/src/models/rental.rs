//! 봇 렌탈 모델.
//!
//! 렌탈 기간/결제 수단/상태 enum과 렌탈 레코드를 정의한다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// 렌탈 기간
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalDuration {
    Hourly,
    Daily,
    Monthly,
}

impl RentalDuration {
    /// 기간별 기본 가격 (성능 배수 적용 전)
    pub fn base_price(&self) -> f64 {
        match self {
            Self::Hourly => 0.5,
            Self::Daily => 12.0,
            // 월간 할인 적용가
            Self::Monthly => 300.0,
        }
    }

    /// 렌탈 유효 기간
    pub fn period(&self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::Daily => Duration::days(1),
            Self::Monthly => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for RentalDuration {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            other => Err(CoreError::validation(
                "duration",
                format!("알 수 없는 렌탈 기간: {other}"),
            )),
        }
    }
}

/// 결제 수단
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Crypto,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::Crypto => "crypto",
            Self::Paypal => "paypal",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(Self::CreditCard),
            "crypto" => Ok(Self::Crypto),
            "paypal" => Ok(Self::Paypal),
            other => Err(CoreError::validation(
                "payment_method",
                format!("알 수 없는 결제 수단: {other}"),
            )),
        }
    }
}

/// 렌탈 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Active,
    Expired,
    Cancelled,
    Pending,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for RentalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            "pending" => Ok(Self::Pending),
            other => Err(CoreError::validation(
                "status",
                format!("알 수 없는 렌탈 상태: {other}"),
            )),
        }
    }
}

/// 렌탈 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRental {
    pub id: String,
    pub bot_id: String,
    pub bot_name: String,
    pub user_id: Option<String>,
    pub duration: RentalDuration,
    pub price: f64,
    pub payment_method: PaymentMethod,
    pub status: RentalStatus,
    pub rented_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BotRental {
    /// `rented_at` 기준 활성 렌탈 생성
    pub fn activate(
        id: impl Into<String>,
        request: &RentalRequest,
        bot_name: impl Into<String>,
        price: f64,
        rented_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            bot_id: request.bot_id.clone(),
            bot_name: bot_name.into(),
            user_id: request.user_id.clone(),
            duration: request.duration,
            price,
            payment_method: request.payment_method,
            status: RentalStatus::Active,
            rented_at,
            expires_at: rented_at + request.duration.period(),
            created_at: rented_at,
        }
    }

    /// 남은 시간 (초, 만료 후 음수)
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

/// 렌탈 생성 요청
#[derive(Debug, Clone, Deserialize)]
pub struct RentalRequest {
    pub bot_id: String,
    pub duration: RentalDuration,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl RentalRequest {
    /// 요청 필드 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.bot_id.trim().is_empty() {
            return Err(CoreError::validation("bot_id", "비어 있을 수 없습니다"));
        }
        Ok(())
    }
}
