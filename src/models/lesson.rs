//! # 수업(Lesson) 모델
//!
//! 전문가 한 명과 과목 하나에 묶인 한 번의 수업 일정입니다.
//! 학생은 `lesson_students` 연결 테이블을 통해 여러 명 붙을 수 있습니다.
//!
//! - `Lesson`: 저장소 행을 정규화한 결과 (학생 목록은 저장소 계층에서 채움)
//! - `LessonForm` → `validate()` → `LessonDraft`: 생성/수정 입력 흐름
//! - `LessonView`: `duration`, `upcoming`, `overdue` 같은 파생 값을 붙인 응답
//!
//! 파생 값은 저장하지 않고 요청 시점의 `now`로 매번 다시 계산합니다.

use super::row::{decode, format_timestamp, parse_timestamp, related, Related};
use super::validation::ValidationError;
use crate::services::time;
use crate::store::{Record, StoreError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// 수업 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    Scheduled,
    InProgress,
    Done,
    Canceled,
    Postponed,
}

impl LessonStatus {
    pub const ALL: [LessonStatus; 5] = [
        LessonStatus::Scheduled,
        LessonStatus::InProgress,
        LessonStatus::Done,
        LessonStatus::Canceled,
        LessonStatus::Postponed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::InProgress => "in_progress",
            LessonStatus::Done => "done",
            LessonStatus::Canceled => "canceled",
            LessonStatus::Postponed => "postponed",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        Self::ALL.into_iter().find(|status| status.as_str() == text)
    }

    /// 엄격 모드에서 허용되는 상태 전이
    ///
    /// ```text
    /// scheduled   → in_progress | canceled | postponed
    /// in_progress → done | canceled
    /// postponed   → scheduled | canceled
    /// done, canceled: 종료 상태
    /// ```
    ///
    /// 같은 상태로의 "전이"는 항상 허용합니다 (수정 폼이 상태를 그대로 다시 보내는 경우).
    pub fn can_transition_to(self, next: LessonStatus) -> bool {
        use LessonStatus::*;
        self == next
            || matches!(
                (self, next),
                (Scheduled, InProgress | Canceled | Postponed)
                    | (InProgress, Done | Canceled)
                    | (Postponed, Scheduled | Canceled)
            )
    }
}

impl FromStr for LessonStatus {
    type Err = ValidationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text).ok_or_else(|| ValidationError::InvalidStatus(text.to_string()))
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정규화된 수업
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lesson {
    pub id: i64,
    pub professional_id: i64,
    pub professional_name: Option<String>,
    pub subject_id: i64,
    pub subject_name: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: LessonStatus,
    pub description: Option<String>,
    pub meeting_url: Option<String>,
    pub created_at: String,
    pub student_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct LessonRow {
    id: i64,
    professional_id: i64,
    subject_id: i64,
    start_at: String,
    end_at: String,
    status: String,
    description: Option<String>,
    meeting_url: Option<String>,
    created_at: String,
    #[serde(default, deserialize_with = "related")]
    professional: Option<Related>,
    #[serde(default, deserialize_with = "related")]
    subject: Option<Related>,
}

impl Lesson {
    pub fn from_row(row: Value) -> Result<Self, StoreError> {
        let row: LessonRow = decode(row)?;
        let status = LessonStatus::parse(&row.status).ok_or_else(|| {
            StoreError::MalformedRow(format!("lesson {}: bad status `{}`", row.id, row.status))
        })?;

        Ok(Self {
            id: row.id,
            professional_id: row.professional_id,
            professional_name: row.professional.map(|p| p.name),
            subject_id: row.subject_id,
            subject_name: row.subject.map(|s| s.name),
            start_at: parse_timestamp(&row.start_at)?,
            end_at: parse_timestamp(&row.end_at)?,
            status,
            description: row.description,
            meeting_url: row.meeting_url,
            created_at: row.created_at,
            student_ids: Vec::new(),
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_at - self.start_at).num_minutes()
    }

    pub fn flags(&self, now: DateTime<Utc>) -> LessonFlags {
        LessonFlags {
            upcoming: time::is_upcoming(self.start_at, now),
            overdue: time::is_overdue(self.start_at, self.status, now),
        }
    }

    pub fn draft(&self) -> LessonDraft {
        LessonDraft {
            professional_id: self.professional_id,
            subject_id: self.subject_id,
            start_at: self.start_at,
            end_at: self.end_at,
            status: self.status,
            description: self.description.clone(),
            meeting_url: self.meeting_url.clone(),
            student_ids: self.student_ids.clone(),
        }
    }

    pub fn view(self, now: DateTime<Utc>) -> LessonView {
        let duration_minutes = self.duration_minutes();
        let flags = self.flags(now);
        LessonView {
            duration_label: time::format_duration(duration_minutes),
            duration_minutes,
            upcoming: flags.upcoming,
            overdue: flags.overdue,
            lesson: self,
        }
    }
}

/// 화면 강조 표시용 플래그. 상태 전이를 막는 데는 쓰지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LessonFlags {
    pub upcoming: bool,
    pub overdue: bool,
}

#[derive(Debug, Serialize)]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub duration_minutes: i64,
    pub duration_label: String,
    pub upcoming: bool,
    pub overdue: bool,
}

/// 수업 생성/수정 요청 본문
///
/// 시각은 RFC 3339(`2026-03-02T14:00:00Z`) 또는 오프셋 없는
/// `2026-03-02T14:00`(UTC로 간주) 형식을 받습니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonForm {
    pub professional_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<i64>,
}

impl LessonForm {
    /// 규칙 순서: 전문가 → 과목 → 시작 → 종료 → 종료 > 시작 →
    /// (새 수업이면) 시작 ≥ now → 회의 링크 → 상태
    pub fn validate(&self, is_new: bool, now: DateTime<Utc>) -> Result<LessonDraft, ValidationError> {
        let professional_id = self
            .professional_id
            .filter(|id| *id > 0)
            .ok_or(ValidationError::MissingProfessional)?;
        let subject_id = self
            .subject_id
            .filter(|id| *id > 0)
            .ok_or(ValidationError::MissingSubject)?;

        let start_at = required_timestamp(&self.start_at, ValidationError::MissingStart)?;
        let end_at = required_timestamp(&self.end_at, ValidationError::MissingEnd)?;
        if end_at <= start_at {
            return Err(ValidationError::EndNotAfterStart);
        }
        if is_new && start_at < now {
            return Err(ValidationError::StartInPast);
        }

        let meeting_url = match non_blank(&self.meeting_url) {
            None => None,
            Some(text) => Some(check_meeting_url(text)?),
        };

        let status = match non_blank(&self.status) {
            None => LessonStatus::default(),
            Some(text) => {
                LessonStatus::parse(text).ok_or_else(|| ValidationError::InvalidStatus(text.to_string()))?
            }
        };

        let mut student_ids: Vec<i64> = self.student_ids.iter().copied().filter(|id| *id > 0).collect();
        student_ids.sort_unstable();
        student_ids.dedup();

        Ok(LessonDraft {
            professional_id,
            subject_id,
            start_at,
            end_at,
            status,
            description: non_blank(&self.description).map(str::to_string),
            meeting_url,
            student_ids,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// RFC 3339, 또는 오프셋이 없으면 UTC로 간주
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn required_timestamp(value: &Option<String>, missing: ValidationError) -> Result<DateTime<Utc>, ValidationError> {
    let text = non_blank(value).ok_or(missing)?;
    parse_datetime(text).ok_or_else(|| ValidationError::InvalidTimestamp(text.to_string()))
}

fn check_meeting_url(text: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidMeetingUrl(text.to_string());
    let url = url::Url::parse(text).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(text.to_string())
}

/// 검증을 통과한 수업 입력
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub professional_id: i64,
    pub subject_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: LessonStatus,
    pub description: Option<String>,
    pub meeting_url: Option<String>,
    /// 정렬 + 중복 제거됨
    pub student_ids: Vec<i64>,
}

impl LessonDraft {
    /// `lessons` 테이블 컬럼만 담습니다. 학생 연결은 따로 저장합니다.
    pub fn to_record(&self) -> Record {
        let value = json!({
            "professional_id": self.professional_id,
            "subject_id": self.subject_id,
            "start_at": format_timestamp(self.start_at),
            "end_at": format_timestamp(self.end_at),
            "status": self.status.as_str(),
            "description": self.description,
            "meeting_url": self.meeting_url,
        });
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    /// 같은 전문가의 두 수업이 반열린 구간 `[start, end)`에서 겹치는지.
    /// 취소된 수업은 어떤 수업과도 겹치지 않는 것으로 봅니다.
    pub fn conflicts_with(&self, other: &LessonDraft) -> bool {
        self.professional_id == other.professional_id
            && self.status != LessonStatus::Canceled
            && other.status != LessonStatus::Canceled
            && self.start_at < other.end_at
            && other.start_at < self.end_at
    }
}

/// `PATCH /lessons/{id}/status` 요청 본문
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

impl StatusForm {
    pub fn parse(&self) -> Result<LessonStatus, ValidationError> {
        let text = non_blank(&self.status).ok_or_else(|| ValidationError::InvalidStatus(String::new()))?;
        LessonStatus::parse(text).ok_or_else(|| ValidationError::InvalidStatus(text.to_string()))
    }
}
