//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `availability`: 전문가의 주간 가용 시간대
//! - `lesson`: 수업 일정과 상태
//! - `directory`: 전문가/과목/가족/학교/학생 명부
//! - `row`: 저장소 행(JSON)을 타입 있는 레코드로 바꾸는 도우미
//! - `validation`: 폼 검증 에러
//!
//! `pub use X::*;`로 하위 모듈 항목을 재공개하여
//! `crate::models::Lesson`처럼 짧게 접근할 수 있습니다.

pub mod availability;
pub mod directory;
pub mod lesson;
pub mod row;
pub mod validation;

pub use availability::*;
pub use directory::*;
pub use lesson::*;
pub use validation::ValidationError;
