//! Hexagonal Architecture 포트 인터페이스.
//!
//! 어댑터 crate가 구현하고, 웹 레이어가 trait을 통해 호출한다.

pub mod rental;
