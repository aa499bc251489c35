//! # phoenix-storage
//!
//! 렌탈 저장소 어댑터.
//! SQLite 기반 봇 렌탈 원장과 스키마 마이그레이션을 관리한다.
//!
//! ## 모듈
//! - `sqlite`: 렌탈 저장소 (RentalRepository 구현)
//! - `migration`: 스키마 마이그레이션

pub mod migration;
pub mod sqlite;

pub use sqlite::SqliteStorage;
