//! 렌탈 원장 (RentalRepository 포트 구현).
//!
//! 렌탈 생성, 조회, 상태 변경, 만료 처리.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use phoenix_core::error::CoreError;
use phoenix_core::models::rental::{BotRental, RentalStatus};
use phoenix_core::ports::rental::RentalRepository;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::SqliteStorage;

const SELECT_COLUMNS: &str = "SELECT id, bot_id, bot_name, user_id, duration, price, payment_method, status, rented_at, expires_at, created_at FROM rentals";

/// DB 저장용 시각 문자열 (고정 폭, 마이크로초, `Z`)
fn to_db_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(field: &str, raw: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::Internal(format!("{field} 시각 해석 실패: {raw}: {e}")))
}

/// 변환 전 원시 행
struct RentalRow {
    id: String,
    bot_id: String,
    bot_name: String,
    user_id: Option<String>,
    duration: String,
    price: f64,
    payment_method: String,
    status: String,
    rented_at: String,
    expires_at: String,
    created_at: String,
}

impl RentalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            bot_id: row.get(1)?,
            bot_name: row.get(2)?,
            user_id: row.get(3)?,
            duration: row.get(4)?,
            price: row.get(5)?,
            payment_method: row.get(6)?,
            status: row.get(7)?,
            rented_at: row.get(8)?,
            expires_at: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_rental(self) -> Result<BotRental, CoreError> {
        Ok(BotRental {
            duration: self.duration.parse()?,
            payment_method: self.payment_method.parse()?,
            status: self.status.parse()?,
            rented_at: from_db_time("rented_at", &self.rented_at)?,
            expires_at: from_db_time("expires_at", &self.expires_at)?,
            created_at: from_db_time("created_at", &self.created_at)?,
            id: self.id,
            bot_id: self.bot_id,
            bot_name: self.bot_name,
            user_id: self.user_id,
            price: self.price,
        })
    }
}

impl SqliteStorage {
    fn query_rentals(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<BotRental>, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| CoreError::Internal(format!("쿼리 준비 실패: {e}")))?;

        let rows = stmt
            .query_map(params, RentalRow::from_row)
            .map_err(|e| CoreError::Internal(format!("렌탈 조회 실패: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Internal(format!("렌탈 행 읽기 실패: {e}")))?;

        rows.into_iter().map(RentalRow::into_rental).collect()
    }
}

#[async_trait]
impl RentalRepository for SqliteStorage {
    async fn create_rental(&self, rental: &BotRental) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        conn.execute(
            "INSERT INTO rentals (
                id, bot_id, bot_name, user_id, duration, price,
                payment_method, status, rented_at, expires_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                rental.id,
                rental.bot_id,
                rental.bot_name,
                rental.user_id,
                rental.duration.as_str(),
                rental.price,
                rental.payment_method.as_str(),
                rental.status.as_str(),
                to_db_time(&rental.rented_at),
                to_db_time(&rental.expires_at),
                to_db_time(&rental.created_at),
            ],
        )
        .map_err(|e| CoreError::Internal(format!("렌탈 저장 실패: {e}")))?;

        debug!("렌탈 저장: {} (bot={})", rental.id, rental.bot_id);
        Ok(())
    }

    async fn get_rental(&self, rental_id: &str) -> Result<Option<BotRental>, CoreError> {
        let raw = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![rental_id],
                RentalRow::from_row,
            )
            .optional()
            .map_err(|e| CoreError::Internal(format!("렌탈 조회 실패: {e}")))?
        };

        raw.map(RentalRow::into_rental).transpose()
    }

    async fn list_active_rentals(
        &self,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BotRental>, CoreError> {
        let now = to_db_time(&now);
        let active = RentalStatus::Active.as_str();
        match user_id {
            Some(user) => self.query_rentals(
                &format!(
                    "{SELECT_COLUMNS} WHERE status = ?1 AND expires_at > ?2 \
                     AND (user_id IS NULL OR user_id = ?3) ORDER BY rented_at DESC"
                ),
                &[&active, &now, &user],
            ),
            None => self.query_rentals(
                &format!(
                    "{SELECT_COLUMNS} WHERE status = ?1 AND expires_at > ?2 ORDER BY rented_at DESC"
                ),
                &[&active, &now],
            ),
        }
    }

    async fn list_rentals_for_bot(
        &self,
        bot_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<BotRental>, CoreError> {
        match user_id {
            Some(user) => self.query_rentals(
                &format!(
                    "{SELECT_COLUMNS} WHERE bot_id = ?1 AND (user_id IS NULL OR user_id = ?2) \
                     ORDER BY rented_at DESC"
                ),
                &[&bot_id, &user],
            ),
            None => self.query_rentals(
                &format!("{SELECT_COLUMNS} WHERE bot_id = ?1 ORDER BY rented_at DESC"),
                &[&bot_id],
            ),
        }
    }

    async fn update_rental_status(
        &self,
        rental_id: &str,
        status: RentalStatus,
    ) -> Result<bool, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        let updated = conn
            .execute(
                "UPDATE rentals SET status = ?1 WHERE id = ?2",
                params![status.as_str(), rental_id],
            )
            .map_err(|e| CoreError::Internal(format!("렌탈 상태 변경 실패: {e}")))?;

        debug!("렌탈 상태 변경: {rental_id} → {status:?} ({updated}건)");
        Ok(updated > 0)
    }

    async fn expire_rentals(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        let expired = conn
            .execute(
                "UPDATE rentals SET status = ?1 WHERE status = ?2 AND expires_at <= ?3",
                params![
                    RentalStatus::Expired.as_str(),
                    RentalStatus::Active.as_str(),
                    to_db_time(&now)
                ],
            )
            .map_err(|e| CoreError::Internal(format!("렌탈 만료 처리 실패: {e}")))?;

        if expired > 0 {
            info!("만료 렌탈 {expired}건 처리");
        }
        Ok(expired)
    }
}
