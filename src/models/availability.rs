//! # 가용 시간대(Availability) 모델
//!
//! 전문가가 매주 반복해서 수업을 받을 수 있는 시간대를 표현합니다.
//!
//! ## 구조체 역할
//! - `AvailabilityWindow`: 저장소에서 읽어 정규화한 가용 시간대 (응답용)
//! - `AvailabilityForm`: 생성/수정 폼에서 들어온 원본 입력 (모든 필드 선택)
//! - `AvailabilityDraft`: 검증을 통과한 입력. 저장소에는 이것만 보냅니다.
//!
//! ## 불변식
//! 길이 `(end - start) mod 24h`가 15분 이상 12시간 이하여야 합니다.
//! `end < start`는 자정을 넘겨 다음 날 끝나는 구간으로, 허용됩니다.
//! 같은 전문가의 시간대끼리 겹치는 것은 기본적으로 막지 않습니다.

use super::row::{decode, related, Related};
use super::validation::ValidationError;
use crate::services::time;
use crate::store::{Record, StoreError};
use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

pub const MIN_WINDOW_MINUTES: i64 = 15;
pub const MAX_WINDOW_MINUTES: i64 = 12 * 60;

/// 요일. 주의 시작은 월요일입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// 저장 라벨을 요일 순서대로 나열한 서열표. 정렬에 그대로 사용됩니다.
    pub const LABELS: &'static [&'static str] = &[
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];

    /// 월요일 = 0 … 일요일 = 6
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        Self::LABELS[self as usize]
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        Self::ALL[weekday.num_days_from_monday() as usize]
    }

    /// 대소문자와 앞뒤 공백을 무시하고 라벨을 해석합니다.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        Self::ALL.into_iter().find(|day| day.as_str() == text)
    }
}

impl FromStr for DayOfWeek {
    type Err = ValidationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text).ok_or_else(|| ValidationError::InvalidDayOfWeek(text.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    #[default]
    Active,
    Inactive,
    Temporary,
}

impl AvailabilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityStatus::Active => "active",
            AvailabilityStatus::Inactive => "inactive",
            AvailabilityStatus::Temporary => "temporary",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "active" => Some(AvailabilityStatus::Active),
            "inactive" => Some(AvailabilityStatus::Inactive),
            "temporary" => Some(AvailabilityStatus::Temporary),
            _ => None,
        }
    }
}

impl FromStr for AvailabilityStatus {
    type Err = ValidationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text).ok_or_else(|| ValidationError::InvalidStatus(text.to_string()))
    }
}

/// `NaiveTime`을 "HH:MM"으로 직렬화합니다 (chrono 기본값은 "HH:MM:SS").
mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }
}

/// 정규화된 가용 시간대
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityWindow {
    pub id: i64,
    pub professional_id: i64,
    pub professional_name: Option<String>,
    pub day_of_week: DayOfWeek,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: AvailabilityStatus,
    pub created_at: String,
}

/// 저장소 행의 원래 모양
#[derive(Debug, Deserialize)]
struct AvailabilityRow {
    id: i64,
    professional_id: i64,
    day_of_week: String,
    start_time: String,
    end_time: String,
    status: String,
    created_at: String,
    #[serde(default, deserialize_with = "related")]
    professional: Option<Related>,
}

impl AvailabilityWindow {
    pub fn from_row(row: Value) -> Result<Self, StoreError> {
        let row: AvailabilityRow = decode(row)?;
        let malformed = |field: &str, value: &str| {
            StoreError::MalformedRow(format!("availability {}: bad {field} `{value}`", row.id))
        };

        Ok(Self {
            id: row.id,
            professional_id: row.professional_id,
            professional_name: row.professional.map(|p| p.name),
            day_of_week: DayOfWeek::parse(&row.day_of_week)
                .ok_or_else(|| malformed("day_of_week", &row.day_of_week))?,
            start_time: time::parse_time_of_day(&row.start_time)
                .ok_or_else(|| malformed("start_time", &row.start_time))?,
            end_time: time::parse_time_of_day(&row.end_time)
                .ok_or_else(|| malformed("end_time", &row.end_time))?,
            status: AvailabilityStatus::parse(&row.status)
                .ok_or_else(|| malformed("status", &row.status))?,
            created_at: row.created_at,
        })
    }

    /// 자정 넘김을 고려한 길이 (분)
    pub fn duration_minutes(&self) -> i64 {
        time::duration_minutes(self.start_time, self.end_time)
    }

    /// 비활성 시간대가 아니고, 벽시계 시각 `at`이 구간 안에 있는지
    pub fn is_available_at(&self, at: NaiveDateTime) -> bool {
        self.status != AvailabilityStatus::Inactive
            && time::is_within_window(self.day_of_week, self.start_time, self.end_time, at)
    }

    pub fn draft(&self) -> AvailabilityDraft {
        AvailabilityDraft {
            professional_id: self.professional_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
        }
    }

    pub fn view(self, now_local: NaiveDateTime) -> AvailabilityView {
        let duration_minutes = self.duration_minutes();
        AvailabilityView {
            available_now: self.is_available_at(now_local),
            duration_label: time::format_duration(duration_minutes),
            duration_minutes,
            window: self,
        }
    }
}

/// 화면 표시용: 가용 시간대 + 파생 값
#[derive(Debug, Serialize)]
pub struct AvailabilityView {
    #[serde(flatten)]
    pub window: AvailabilityWindow,
    pub duration_minutes: i64,
    pub duration_label: String,
    pub available_now: bool,
}

/// 가용 시간대 생성/수정 폼: `POST /availability`, `PUT /availability/{id}`의 요청 본문
///
/// 수정도 day/start/end/status 전체를 교체하므로 같은 폼을 씁니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityForm {
    pub professional_id: Option<i64>,
    pub day_of_week: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<String>,
}

impl AvailabilityForm {
    /// 규칙 순서: 전문가 → 요일 → 시작 → 종료 → 최소 길이 → 최대 길이 → 상태
    pub fn validate(&self) -> Result<AvailabilityDraft, ValidationError> {
        let professional_id = self
            .professional_id
            .filter(|id| *id > 0)
            .ok_or(ValidationError::MissingProfessional)?;

        let day = non_blank(&self.day_of_week).ok_or(ValidationError::MissingDayOfWeek)?;
        let day_of_week = DayOfWeek::parse(day)
            .ok_or_else(|| ValidationError::InvalidDayOfWeek(day.to_string()))?;

        let start_time = parse_required(&self.start_time, ValidationError::MissingStart)?;
        let end_time = parse_required(&self.end_time, ValidationError::MissingEnd)?;

        let actual = time::duration_minutes(start_time, end_time);
        if actual < MIN_WINDOW_MINUTES {
            return Err(ValidationError::WindowTooShort {
                actual,
                min: MIN_WINDOW_MINUTES,
            });
        }
        if actual > MAX_WINDOW_MINUTES {
            return Err(ValidationError::WindowTooLong {
                actual,
                max: MAX_WINDOW_MINUTES,
            });
        }

        let status = match non_blank(&self.status) {
            None => AvailabilityStatus::default(),
            Some(text) => AvailabilityStatus::parse(text)
                .ok_or_else(|| ValidationError::InvalidStatus(text.to_string()))?,
        };

        Ok(AvailabilityDraft {
            professional_id,
            day_of_week,
            start_time,
            end_time,
            status,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_required(value: &Option<String>, missing: ValidationError) -> Result<NaiveTime, ValidationError> {
    let text = non_blank(value).ok_or(missing)?;
    time::parse_time_of_day(text).ok_or_else(|| ValidationError::InvalidTimeOfDay(text.to_string()))
}

/// 검증을 통과한 가용 시간대 입력
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityDraft {
    pub professional_id: i64,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AvailabilityStatus,
}

impl AvailabilityDraft {
    pub fn duration_minutes(&self) -> i64 {
        time::duration_minutes(self.start_time, self.end_time)
    }

    pub fn to_record(&self) -> Record {
        let value = json!({
            "professional_id": self.professional_id,
            "day_of_week": self.day_of_week.as_str(),
            "start_time": self.start_time.format("%H:%M").to_string(),
            "end_time": self.end_time.format("%H:%M").to_string(),
            "status": self.status.as_str(),
        });
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    /// 두 시간대가 한 주 안에서 겹치는지 판정합니다.
    ///
    /// 각 구간을 "주 시작부터의 분" 위의 반열린 구간으로 보고,
    /// 일요일 밤 → 월요일 새벽처럼 주 경계를 넘는 경우도 원형으로 비교합니다.
    pub fn overlaps(&self, other: &AvailabilityDraft) -> bool {
        let (a_start, a_len) = (time::minute_of_week(self.day_of_week, self.start_time), self.duration_minutes());
        let (b_start, b_len) = (time::minute_of_week(other.day_of_week, other.start_time), other.duration_minutes());
        (b_start - a_start).rem_euclid(time::MINUTES_PER_WEEK) < a_len
            || (a_start - b_start).rem_euclid(time::MINUTES_PER_WEEK) < b_len
    }
}
