//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
const CURRENT_VERSION: u32 = 1;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
pub fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: rentals 테이블 + 인덱스
///
/// 시각은 고정 폭 RFC3339 UTC(마이크로초, `Z`) 텍스트로 저장하므로
/// 문자열 비교가 시간 순서와 같다.
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: rentals 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS rentals (
            id TEXT PRIMARY KEY,
            bot_id TEXT NOT NULL,
            bot_name TEXT NOT NULL,
            user_id TEXT,
            duration TEXT NOT NULL,
            price REAL NOT NULL,
            payment_method TEXT NOT NULL,
            status TEXT NOT NULL,
            rented_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_rentals_bot_id ON rentals(bot_id);
        CREATE INDEX IF NOT EXISTS idx_rentals_user_id ON rentals(user_id);
        CREATE INDEX IF NOT EXISTS idx_rentals_status ON rentals(status);
        CREATE INDEX IF NOT EXISTS idx_rentals_expires_at ON rentals(expires_at);

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    Ok(())
}
