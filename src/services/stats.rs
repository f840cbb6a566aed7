//! # 목록 화면 통계
//!
//! 주어진 행 집합을 한 번 훑어 요약 수치를 만듭니다.
//! 어떤 행 집합을 넘길지는 호출자가 정합니다. 목록 API는 페이지가 아니라
//! 같은 필터의 전체(페이지 없는) 결과를 넘기므로 `total`과 항상 맞습니다.

use crate::models::{AvailabilityStatus, AvailabilityWindow, Lesson, LessonStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonStatistics {
    pub total: i64,
    /// 다섯 상태 모두 키로 존재 (없으면 0)
    pub by_status: BTreeMap<&'static str, i64>,
    pub distinct_professionals: usize,
    /// 과목 이름 기준. 이름을 펼쳐 받지 못한 행은 `subject_id`로 구분합니다.
    pub distinct_subjects: usize,
    pub upcoming: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityStatistics {
    pub total: i64,
    pub active: usize,
    pub distinct_professionals: usize,
    pub total_minutes: i64,
    /// 소수 첫째 자리까지
    pub total_hours: f64,
}

pub fn summarize_lessons(rows: &[Lesson], total: i64, now: DateTime<Utc>) -> LessonStatistics {
    let mut by_status: BTreeMap<&'static str, i64> =
        LessonStatus::ALL.iter().map(|status| (status.as_str(), 0)).collect();
    let mut professionals = HashSet::new();
    let mut subjects = HashSet::new();
    let (mut upcoming, mut overdue) = (0, 0);

    for lesson in rows {
        *by_status.entry(lesson.status.as_str()).or_default() += 1;
        professionals.insert(lesson.professional_id);
        subjects.insert(match &lesson.subject_name {
            Some(name) => SubjectKey::Name(name.as_str()),
            None => SubjectKey::Id(lesson.subject_id),
        });

        let flags = lesson.flags(now);
        upcoming += usize::from(flags.upcoming);
        overdue += usize::from(flags.overdue);
    }

    LessonStatistics {
        total,
        by_status,
        distinct_professionals: professionals.len(),
        distinct_subjects: subjects.len(),
        upcoming,
        overdue,
    }
}

#[derive(PartialEq, Eq, Hash)]
enum SubjectKey<'a> {
    Name(&'a str),
    Id(i64),
}

pub fn summarize_availability(rows: &[AvailabilityWindow], total: i64) -> AvailabilityStatistics {
    let mut professionals = HashSet::new();
    let mut active = 0;
    let mut total_minutes = 0;

    for window in rows {
        professionals.insert(window.professional_id);
        if window.status == AvailabilityStatus::Active {
            active += 1;
        }
        // 자정 넘김을 반영한 길이라 항상 0 이상
        total_minutes += window.duration_minutes().max(0);
    }

    AvailabilityStatistics {
        total,
        active,
        distinct_professionals: professionals.len(),
        total_minutes,
        total_hours: (total_minutes as f64 / 6.0).round() / 10.0,
    }
}
