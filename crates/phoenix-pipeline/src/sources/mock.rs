//! 합성 샘플 이벤트 생성기.
//!
//! 로그 파일이 없을 때 대시보드가 움직이도록 임의 봇 이벤트를 만든다.
//! 간격은 [min, max]초 균등 분포 (기본 3~12초, 분당 5~20건).

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{debug, info};

use phoenix_core::models::metric::{EventStatus, MetricEvent};

use crate::buffer::round_to;
use crate::hub::MetricsHub;
use crate::normalize::shorten_tx_reference;

/// 샘플 봇 목록
pub const BOT_ROSTER: &[&str] = &[
    "arb-scout",
    "mev-watch",
    "sandwich-guard",
    "tx-relay",
    "arbit-bot",
    "eth-sniper",
];

const CRITICAL_RATIO: f64 = 0.08;
const WARNING_RATIO: f64 = 0.20;
const HEX_DIGITS: &[u8] = b"0123456789abcdef";

/// 샘플 간격 범위 (초)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockInterval {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl MockInterval {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = min_secs.max(0.0);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// 임의 샘플 이벤트 하나 생성
pub fn generate_event<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> MetricEvent {
    let bot = BOT_ROSTER.choose(rng).copied().unwrap_or("arb-scout");
    let latency = rng.gen_range(40.0..450.0_f64) as u64;

    let roll: f64 = rng.gen();
    let (status, error) = if roll < CRITICAL_RATIO {
        (EventStatus::Critical, Some("critical: simulated failure"))
    } else if roll < WARNING_RATIO {
        (EventStatus::Warning, Some("warning: simulated slowdown"))
    } else {
        (EventStatus::Ok, None)
    };

    let profit = round_to(rng.gen_range(-0.01..0.05), 4);

    let mut event = MetricEvent::new(now, bot, latency)
        .with_status(Some(status))
        .with_tx_reference(random_tx_reference(rng))
        .with_profit(profit);
    if let Some(error) = error {
        event = event.with_error(error);
    }
    event
}

/// 현재 시각의 샘플 이벤트 하나 (엔트로피 시드)
pub fn sample_event() -> MetricEvent {
    generate_event(&mut StdRng::from_entropy(), Utc::now())
}

/// 임의 66자 해시의 축약형
fn random_tx_reference<R: Rng>(rng: &mut R) -> String {
    let digits: String = (0..64)
        .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
        .collect();
    shorten_tx_reference(&format!("0x{digits}"))
}

/// 샘플 이벤트를 주기적으로 생성해 허브에 넣는다. 종료 신호까지 실행.
pub async fn run_mock_publisher(
    hub: MetricsHub,
    interval: MockInterval,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        "샘플 데이터 발행 시작: {:.1}~{:.1}초 간격",
        interval.min_secs, interval.max_secs
    );
    let mut rng = StdRng::from_entropy();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let event = generate_event(&mut rng, Utc::now());
        debug!("샘플 이벤트: {} {}ms", event.source_name, event.latency_ms);
        hub.ingest_one(event);

        let wait = interval.sample(&mut rng);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_rx.changed() => {
                break;
            }
        }
    }
    info!("샘플 데이터 발행 종료");
}
