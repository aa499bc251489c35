//! HTTP 핸들러 모듈.

pub mod dashboard;
pub mod feeds;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod rentals;
pub mod stream;

use serde::Deserialize;

/// 조회 개수 쿼리 파라미터
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    /// 최대 조회 개수
    pub limit: Option<usize>,
}

impl LimitQuery {
    /// 기본값이 적용된 제한 개수
    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }
}
