//! # phoenix-pipeline
//!
//! 메트릭 이벤트 파이프라인.
//!
//! 입력 소스 → 정규화 → [`buffer::EventBuffer`] 추가 → 스냅샷 렌더링 →
//! [`broadcaster::Broadcaster`] 발행 → 구독자 메일박스.
//!
//! ## 구조
//!
//! - [`buffer`]: 용량 제한 이벤트 버퍼와 KPI/시계열/히트맵/일일 요약
//! - [`broadcaster`]: 구독자별 bounded 메일박스 팬아웃 (가득 차면 폐기)
//! - [`normalize`]: 이종 JSON 입력 → `MetricEvent`
//! - [`hub`]: 버퍼, 렌더러, 브로드캐스터 연결
//! - [`sources`]: 샘플 생성기, 로그 파일 추적기

pub mod broadcaster;
pub mod buffer;
pub mod hub;
pub mod normalize;
pub mod sources;

pub use broadcaster::{Broadcaster, PublishReport, Subscription};
pub use buffer::{DashboardSnapshot, EventBuffer};
pub use hub::{FragmentRenderer, MetricsHub};
