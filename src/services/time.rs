//! # 시간 계산 유틸리티
//!
//! 가용 시간대와 수업에 공통으로 쓰이는 순수 함수들입니다.
//!
//! - `duration_minutes()`: 자정을 넘기는 구간을 고려한 분 단위 길이
//! - `format_duration()`: "45 min", "1h 30min", "2h" 형태의 표시 문자열
//! - `is_upcoming()` / `is_overdue()`: 수업 강조 표시용 판정
//! - `is_within_window()`: 특정 시각이 주간 가용 시간대 안에 있는지
//!
//! 모든 함수는 패닉하지 않습니다. 해석할 수 없는 입력은 에러 대신
//! `None`, `"-"`, `false` 같은 "알 수 없음" 값으로 처리합니다 (화면 표시용 계약).

use crate::models::{DayOfWeek, LessonStatus};
use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Utc};

pub const MINUTES_PER_DAY: i64 = 24 * 60;
pub const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;

/// 수업 시작 전 이 시간 이내면 "곧 시작"으로 표시합니다.
pub const UPCOMING_WINDOW_MINUTES: i64 = 30;

/// "HH:MM" 또는 "HH:MM:SS"를 시각으로 해석합니다.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

/// 자정 이후 경과 분
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

/// `(end - start) mod 24h`를 분 단위로 계산합니다.
///
/// 항상 0 이상입니다. 0은 "길이 0" 또는 "정확히 24시간" 둘 다를 뜻하므로
/// 호출하는 쪽(가용 시간대 검증)에서 별도로 거부해야 합니다.
///
/// ```text
/// 09:00 → 10:30  =  90
/// 23:00 → 01:00  = 120  (자정 넘김)
/// ```
pub fn duration_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    (minute_of_day(end) - minute_of_day(start)).rem_euclid(MINUTES_PER_DAY)
}

pub fn duration_minutes_str(start: &str, end: &str) -> Option<i64> {
    Some(duration_minutes(parse_time_of_day(start)?, parse_time_of_day(end)?))
}

/// 분 단위 길이를 표시 문자열로 바꿉니다.
///
/// - 60분 미만: `"45 min"`
/// - 그 이상: `"1h 30min"`, 분이 0이면 `"2h"`
/// - 음수: `"-"`
pub fn format_duration(minutes: i64) -> String {
    if minutes < 0 {
        return "-".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}min")
    }
}

/// 두 "HH:MM" 문자열 사이 길이를 표시합니다. 해석 실패 시 `"-"`.
pub fn format_duration_between(start: &str, end: &str) -> String {
    duration_minutes_str(start, end)
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string())
}

/// `0 < start - now <= 30분`
pub fn is_upcoming(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let until = start - now;
    until > Duration::zero() && until <= Duration::minutes(UPCOMING_WINDOW_MINUTES)
}

/// 예정(scheduled) 상태인데 시작 시각이 이미 지난 수업
pub fn is_overdue(start: DateTime<Utc>, status: LessonStatus, now: DateTime<Utc>) -> bool {
    status == LessonStatus::Scheduled && start < now
}

/// 주 시작(월요일 00:00)부터의 경과 분
pub fn minute_of_week(day: DayOfWeek, time: NaiveTime) -> i64 {
    i64::from(day.ordinal()) * MINUTES_PER_DAY + minute_of_day(time)
}

/// 벽시계 시각 `at`이 주간 가용 시간대 `[start, end)` 안에 있는지 판정합니다.
///
/// 자정을 넘기는 구간(예: 토요일 22:00 → 02:00)은 다음 날 새벽까지 포함하며,
/// 일요일 밤에서 월요일 새벽으로 넘어가는 경우도 처리합니다.
/// 길이가 0인 구간은 어떤 시각도 포함하지 않습니다.
pub fn is_within_window(day: DayOfWeek, start: NaiveTime, end: NaiveTime, at: NaiveDateTime) -> bool {
    let length = duration_minutes(start, end);
    if length == 0 {
        return false;
    }
    let at_day = DayOfWeek::from_weekday(at.weekday());
    let window_start = minute_of_week(day, start);
    let offset = (minute_of_week(at_day, at.time()) - window_start).rem_euclid(MINUTES_PER_WEEK);
    offset < length
}
