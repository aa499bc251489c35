//! 봇 렌탈 API 핸들러.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use phoenix_core::error::CoreError;
use phoenix_core::models::rental::{
    BotRental, PaymentMethod, RentalDuration, RentalRequest, RentalStatus,
};
use phoenix_core::pricing::{self, round2, PriceQuote};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// 생성된 렌탈
#[derive(Debug, Serialize)]
pub struct RentalCreated {
    pub id: String,
    pub bot_id: String,
    pub bot_name: String,
    pub duration: RentalDuration,
    pub price: f64,
    pub performance_multiplier: f64,
    pub payment_method: PaymentMethod,
    pub status: RentalStatus,
    pub rented_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RentResponse {
    pub status: &'static str,
    pub rental: RentalCreated,
}

/// 봇의 현재 성능
#[derive(Debug, Default, Serialize)]
pub struct BotPerformance {
    /// 버퍼 내 성공률 (%)
    pub success_rate: f64,
    /// 가장 최근 이벤트의 지연
    pub latency_ms: u64,
}

/// 활성 렌탈 항목
#[derive(Debug, Serialize)]
pub struct ActiveRental {
    pub id: String,
    pub bot_id: String,
    pub bot_name: String,
    pub duration: RentalDuration,
    pub price: f64,
    pub status: RentalStatus,
    pub rented_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 만료까지 남은 초
    pub time_remaining: i64,
    pub current_performance: BotPerformance,
}

#[derive(Debug, Serialize)]
pub struct RentalsResponse {
    pub status: &'static str,
    pub rentals: Vec<ActiveRental>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RentalInfoResponse {
    pub status: &'static str,
    pub bot_id: String,
    pub bot_name: String,
    pub pricing: PriceQuote,
    pub performance: BotPerformance,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub status: &'static str,
    pub message: String,
    pub rental_id: String,
}

/// 버퍼에서 봇 이름과 성능 조회. 이벤트가 없으면 id를 이름으로 쓴다.
fn bot_profile(state: &AppState, bot_id: &str) -> (String, BotPerformance) {
    let buffer = state.hub.buffer();
    match buffer.latest_for_bot(bot_id) {
        Some(latest) => (
            latest.source_name,
            BotPerformance {
                success_rate: buffer.bot_success_rate(bot_id).unwrap_or(0.0),
                latency_ms: latest.latency_ms,
            },
        ),
        None => (bot_id.to_string(), BotPerformance::default()),
    }
}

/// 렌탈 생성
///
/// POST /api/bots/rent
pub async fn rent_bot(
    State(state): State<AppState>,
    payload: Result<Json<RentalRequest>, JsonRejection>,
) -> Result<Json<RentResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate()?;

    let (bot_name, performance) = bot_profile(&state, &request.bot_id);
    let (price, multiplier) = pricing::rental_price(request.duration, performance.success_rate);

    let id = format!("rental_{}_{}", request.bot_id, Uuid::new_v4().simple());
    let rental = BotRental::activate(id, &request, bot_name, price, Utc::now());
    state.rentals.create_rental(&rental).await?;
    info!(
        "렌탈 생성: {} ({}, {}, 가격 {:.2})",
        rental.id,
        rental.bot_id,
        rental.duration.as_str(),
        rental.price
    );

    Ok(Json(RentResponse {
        status: "success",
        rental: RentalCreated {
            id: rental.id,
            bot_id: rental.bot_id,
            bot_name: rental.bot_name,
            duration: rental.duration,
            price: round2(rental.price),
            performance_multiplier: round2(multiplier),
            payment_method: rental.payment_method,
            status: rental.status,
            rented_at: rental.rented_at,
            expires_at: rental.expires_at,
        },
    }))
}

/// 만료 처리 후 활성 렌탈 목록
///
/// GET /api/bots/rentals
pub async fn list_rentals(
    State(state): State<AppState>,
) -> Result<Json<RentalsResponse>, ApiError> {
    let now = Utc::now();
    let expired = state.rentals.expire_rentals(now).await?;
    if expired > 0 {
        info!("만료된 렌탈 {expired}건 정리");
    }

    let rentals: Vec<ActiveRental> = state
        .rentals
        .list_active_rentals(None, now)
        .await?
        .into_iter()
        .map(|rental| {
            let (_, current_performance) = bot_profile(&state, &rental.bot_id);
            ActiveRental {
                time_remaining: rental.seconds_remaining(now),
                id: rental.id,
                bot_id: rental.bot_id,
                bot_name: rental.bot_name,
                duration: rental.duration,
                price: rental.price,
                status: rental.status,
                rented_at: rental.rented_at,
                expires_at: rental.expires_at,
                current_performance,
            }
        })
        .collect();

    Ok(Json(RentalsResponse {
        status: "success",
        count: rentals.len(),
        rentals,
    }))
}

/// 봇 가격 견적
///
/// GET /api/bots/{bot_id}/rental-info
pub async fn rental_info(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Json<RentalInfoResponse> {
    let (bot_name, mut performance) = bot_profile(&state, &bot_id);
    performance.success_rate = round2(performance.success_rate);
    let pricing = pricing::quote(&bot_id, performance.success_rate);

    Json(RentalInfoResponse {
        status: "success",
        bot_id,
        bot_name,
        pricing,
        performance,
        available: true,
    })
}

/// 렌탈 취소. 없는 렌탈은 404.
///
/// DELETE /api/bots/rentals/{rental_id}
pub async fn cancel_rental(
    State(state): State<AppState>,
    Path(rental_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    if !state.rentals.cancel_rental(&rental_id).await? {
        return Err(CoreError::not_found("Rental", rental_id).into());
    }
    info!("렌탈 취소: {rental_id}");

    Ok(Json(CancelResponse {
        status: "success",
        message: format!("Rental {rental_id} cancelled successfully"),
        rental_id,
    }))
}
