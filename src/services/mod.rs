//! # 비즈니스 로직 모듈
//!
//! 저장소나 HTTP에 묶이지 않은 계산을 담당합니다.
//! - `time`: 길이/자정 넘김/시간대 포함 여부 같은 시간 계산
//! - `query`: 목록 필터 → 저장소 쿼리 변환과 페이지 처리
//! - `stats`: 목록 통계 요약
//! - `sequence`: 오래된 응답을 버리는 요청 번호 관리

pub mod query;
pub mod sequence;
pub mod stats;
pub mod time;
