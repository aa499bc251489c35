//! 렌탈 저장소 포트.
//!
//! 구현: `phoenix-storage` crate (rusqlite)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::rental::{BotRental, RentalStatus};

/// 봇 렌탈 저장소
#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// 렌탈 저장 (ID 중복 시 에러)
    async fn create_rental(&self, rental: &BotRental) -> Result<(), CoreError>;

    /// ID로 렌탈 조회
    async fn get_rental(&self, rental_id: &str) -> Result<Option<BotRental>, CoreError>;

    /// `now` 시점에 만료되지 않은 활성 렌탈 (rented_at 내림차순)
    ///
    /// `user_id`가 있으면 해당 사용자 또는 사용자 미지정 렌탈만 반환한다.
    async fn list_active_rentals(
        &self,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BotRental>, CoreError>;

    /// 특정 봇의 렌탈 이력 (rented_at 내림차순)
    async fn list_rentals_for_bot(
        &self,
        bot_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<BotRental>, CoreError>;

    /// 상태 변경. 대상이 없으면 false.
    async fn update_rental_status(
        &self,
        rental_id: &str,
        status: RentalStatus,
    ) -> Result<bool, CoreError>;

    /// 렌탈 취소. 대상이 없으면 false.
    async fn cancel_rental(&self, rental_id: &str) -> Result<bool, CoreError> {
        self.update_rental_status(rental_id, RentalStatus::Cancelled)
            .await
    }

    /// `now` 이전에 만료된 활성 렌탈을 expired로 전환, 전환 건수 반환
    async fn expire_rentals(&self, now: DateTime<Utc>) -> Result<usize, CoreError>;
}
