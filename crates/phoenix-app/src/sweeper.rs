//! 만료 렌탈 정리 루프.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use phoenix_core::ports::rental::RentalRepository;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// `every`마다 만료된 활성 렌탈을 expired로 전환한다.
pub async fn run_expiry_sweeper(
    rentals: Arc<dyn RentalRepository>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("렌탈 만료 정리 시작: {}초 주기", every.as_secs());
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match rentals.expire_rentals(Utc::now()).await {
                    Ok(0) => debug!("만료 렌탈 없음"),
                    Ok(n) => info!("만료 렌탈 {n}건 정리"),
                    Err(e) => warn!("렌탈 만료 정리 실패: {e}"),
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("렌탈 만료 정리 종료");
                break;
            }
        }
    }
}
