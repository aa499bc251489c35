//! Phoenix 도메인 모델.
//!
//! 파이프라인, 저장소, 웹 레이어가 공유하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod metric;
pub mod rental;
