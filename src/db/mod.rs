//! # 데이터 접근 계층 (Data Access Layer)
//!
//! 라우트 핸들러(routes/)와 저장소(`store::Store`) 사이의 접착 계층입니다.
//! 쿼리를 만들어 실행하고, 받아온 행을 타입 있는 레코드로 정규화합니다.
//!
//! 각 하위 모듈:
//! - `lessons`: 수업 목록/조회/생성/수정/상태 변경/삭제, 학생 연결
//! - `availability`: 가용 시간대 목록/조회/생성/수정/삭제
//! - `directory`: 전문가/과목/가족/학교/학생 목록/생성/삭제
//!
//! 모든 함수는 `&dyn Store`를 받으므로 테스트에서는 인메모리 저장소를 넘깁니다.

pub mod availability;
pub mod directory;
pub mod lessons;

pub use availability::*;
pub use directory::*;
pub use lessons::*;

use crate::config::Config;

/// 쓰기 작업에 적용할 일정 규칙 (설정에서 켬)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleRules {
    /// 수업 상태 전이표 강제
    pub strict_transitions: bool,
    /// 같은 전문가의 겹치는 수업/가용 시간대 거부
    pub conflict_check: bool,
}

impl From<&Config> for ScheduleRules {
    fn from(config: &Config) -> Self {
        Self {
            strict_transitions: config.strict_status_transitions,
            conflict_check: config.conflict_check,
        }
    }
}

/// 목록 조회 결과: 한 페이지 + 같은 필터 전체에 대한 통계
#[derive(Debug)]
pub struct Listing<T, S> {
    pub page: crate::services::query::Page<T>,
    pub stats: S,
}
