//! # 입력 검증 에러
//!
//! 폼 입력을 저장소에 보내기 전에 검사하다가 발견한 문제를 나타냅니다.
//! 항상 사용자가 입력을 고쳐서 해결할 수 있는 에러이며, 재시도 대상이 아닙니다.
//! 검증 함수는 여러 에러를 모으지 않고 **처음 발견한 규칙 위반 하나**만 반환합니다.

use super::lesson::LessonStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Professional is required")]
    MissingProfessional,

    #[error("Subject is required")]
    MissingSubject,

    #[error("Name is required")]
    MissingName,

    #[error("Day of week is required")]
    MissingDayOfWeek,

    #[error("Invalid day of week: {0}")]
    InvalidDayOfWeek(String),

    #[error("Start time is required")]
    MissingStart,

    #[error("End time is required")]
    MissingEnd,

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid date and time: {0}")]
    InvalidTimestamp(String),

    #[error("Availability window must last at least {min} minutes (got {actual})")]
    WindowTooShort { actual: i64, min: i64 },

    #[error("Availability window must last at most {max} minutes (got {actual})")]
    WindowTooLong { actual: i64, max: i64 },

    #[error("End must be after start")]
    EndNotAfterStart,

    #[error("Lesson cannot start in the past")]
    StartInPast,

    #[error("Invalid meeting link: {0}")]
    InvalidMeetingUrl(String),

    #[error("Student #{0} does not exist")]
    UnknownStudent(i64),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Lesson status cannot change from {from} to {to}")]
    InvalidTransition { from: LessonStatus, to: LessonStatus },
}
