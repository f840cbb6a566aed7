//! # 수업 저장소 함수
//!
//! `lessons` 테이블과 `lesson_students` 연결 테이블을 다룹니다.
//!
//! 저장소는 트랜잭션을 제공하지 않습니다. 실패한 쓰기가 일부만 남지 않도록
//! - 쓰기 전에 학생 id가 모두 존재하는지 한 번에 확인하고
//! - 그래도 학생 연결이 실패하면 생성은 방금 만든 수업을 지우고,
//!   수정은 이전 행과 학생 연결을 되돌립니다.

use super::{Listing, ScheduleRules};
use crate::error::AppError;
use crate::models::row::format_timestamp;
use crate::models::{Lesson, LessonDraft, LessonStatus, ValidationError};
use crate::services::query::{self, LessonCriteria, PageRequest};
use crate::services::stats::{summarize_lessons, LessonStatistics};
use crate::services::time;
use crate::store::{FilterValue, Order, Predicate, QuerySpec, Record, Store, Table};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// 수업 목록 한 페이지와, 같은 필터의 전체 결과로 계산한 통계
pub async fn list_lessons(
    store: &dyn Store,
    criteria: &LessonCriteria,
    page: PageRequest,
    now: DateTime<Utc>,
) -> Result<Listing<Lesson, LessonStatistics>, AppError> {
    let spec = query::build_lesson_query(criteria, page);
    let mut page = query::execute(store, &spec).await?.try_map(Lesson::from_row)?;
    attach_students(store, &mut page.rows).await?;

    // 통계는 페이지가 아닌 전체 필터 결과 기준. 과목 이름만 있으면 됩니다.
    let all = store
        .select(&spec.for_statistics(&["subject"]))
        .await?
        .rows
        .into_iter()
        .map(Lesson::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let stats = summarize_lessons(&all, page.total, now);

    tracing::debug!(total = page.total, page = page.page, "listed lessons");
    Ok(Listing { page, stats })
}

pub async fn get_lesson(store: &dyn Store, id: i64) -> Result<Lesson, AppError> {
    let spec = QuerySpec::new(Table::Lessons)
        .embed("professional")
        .embed("subject")
        .filter(Predicate::Eq("id", id.into()));
    let row = store
        .select(&spec)
        .await?
        .rows
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)?;

    let mut lessons = vec![Lesson::from_row(row)?];
    attach_students(store, &mut lessons).await?;
    lessons.pop().ok_or(AppError::NotFound)
}

pub async fn create_lesson(store: &dyn Store, draft: &LessonDraft, rules: ScheduleRules) -> Result<Lesson, AppError> {
    if rules.conflict_check {
        ensure_no_conflict(store, draft, None).await?;
    }
    ensure_students_exist(store, &draft.student_ids).await?;

    let row = store.insert(Table::Lessons, draft.to_record()).await?;
    let id = row["id"]
        .as_i64()
        .ok_or_else(|| AppError::Internal("inserted lesson has no id".into()))?;

    if let Err(err) = insert_students(store, id, &draft.student_ids).await {
        tracing::warn!(lesson_id = id, error = %err, "student links failed, removing lesson");
        store.delete(Table::Lessons, "id", id).await?;
        return Err(err);
    }

    tracing::info!(lesson_id = id, professional_id = draft.professional_id, "lesson created");
    get_lesson(store, id).await
}

/// 전체 교체 수정. 학생 연결도 폼의 목록으로 교체합니다.
pub async fn update_lesson(
    store: &dyn Store,
    id: i64,
    draft: &LessonDraft,
    rules: ScheduleRules,
) -> Result<Lesson, AppError> {
    let existing = get_lesson(store, id).await?;
    check_transition(existing.status, draft.status, rules)?;
    if rules.conflict_check {
        ensure_no_conflict(store, draft, Some(id)).await?;
    }
    ensure_students_exist(store, &draft.student_ids).await?;

    store
        .update(Table::Lessons, "id", id, draft.to_record())
        .await?
        .ok_or(AppError::NotFound)?;

    if existing.student_ids != draft.student_ids {
        if let Err(err) = replace_students(store, id, &draft.student_ids).await {
            tracing::warn!(lesson_id = id, error = %err, "student links failed, restoring lesson");
            store
                .update(Table::Lessons, "id", id, existing.draft().to_record())
                .await?;
            replace_students(store, id, &existing.student_ids).await?;
            return Err(err);
        }
    }

    tracing::info!(lesson_id = id, status = %draft.status, "lesson updated");
    get_lesson(store, id).await
}

pub async fn update_lesson_status(
    store: &dyn Store,
    id: i64,
    status: LessonStatus,
    rules: ScheduleRules,
) -> Result<Lesson, AppError> {
    let existing = get_lesson(store, id).await?;
    check_transition(existing.status, status, rules)?;

    let mut patch = Record::new();
    patch.insert("status".into(), json!(status.as_str()));
    store
        .update(Table::Lessons, "id", id, patch)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(lesson_id = id, from = %existing.status, to = %status, "lesson status changed");
    get_lesson(store, id).await
}

/// 학생 연결은 저장소가 함께 지웁니다 (ON DELETE CASCADE).
pub async fn delete_lesson(store: &dyn Store, id: i64) -> Result<(), AppError> {
    if !store.delete(Table::Lessons, "id", id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(lesson_id = id, "lesson deleted");
    Ok(())
}

fn check_transition(from: LessonStatus, to: LessonStatus, rules: ScheduleRules) -> Result<(), AppError> {
    if rules.strict_transitions && !from.can_transition_to(to) {
        return Err(ValidationError::InvalidTransition { from, to }.into());
    }
    Ok(())
}

/// 같은 전문가의 시간이 겹치는 (취소되지 않은) 수업이 있으면 `Conflict`
async fn ensure_no_conflict(store: &dyn Store, draft: &LessonDraft, exclude: Option<i64>) -> Result<(), AppError> {
    let spec = QuerySpec::new(Table::Lessons)
        .filter(Predicate::Eq("professional_id", draft.professional_id.into()))
        .filter(Predicate::Lte("start_at", format_timestamp(draft.end_at).into()))
        .filter(Predicate::Gte("end_at", format_timestamp(draft.start_at).into()))
        .order(Order::Asc("start_at"));

    for row in store.select(&spec).await?.rows {
        let other = Lesson::from_row(row)?;
        if Some(other.id) != exclude && draft.conflicts_with(&other.draft()) {
            return Err(AppError::Conflict(format!(
                "Professional already has lesson #{} from {} to {} ({})",
                other.id,
                other.start_at.format("%Y-%m-%d %H:%M"),
                other.end_at.format("%H:%M"),
                time::format_duration(other.duration_minutes()),
            )));
        }
    }
    Ok(())
}

/// 없는 학생 id가 하나라도 있으면 (가장 작은 것을) `UnknownStudent`로 알립니다.
async fn ensure_students_exist(store: &dyn Store, student_ids: &[i64]) -> Result<(), AppError> {
    if student_ids.is_empty() {
        return Ok(());
    }

    let ids = student_ids.iter().map(|id| FilterValue::from(*id)).collect();
    let spec = QuerySpec::new(Table::Students).filter(Predicate::In("id", ids));
    let found: HashSet<i64> = store
        .select(&spec)
        .await?
        .rows
        .iter()
        .filter_map(|row| row["id"].as_i64())
        .collect();

    match student_ids.iter().filter(|id| !found.contains(id)).min() {
        Some(missing) => Err(ValidationError::UnknownStudent(*missing).into()),
        None => Ok(()),
    }
}

async fn replace_students(store: &dyn Store, lesson_id: i64, student_ids: &[i64]) -> Result<(), AppError> {
    store.delete(Table::LessonStudents, "lesson_id", lesson_id).await?;
    insert_students(store, lesson_id, student_ids).await
}

async fn insert_students(store: &dyn Store, lesson_id: i64, student_ids: &[i64]) -> Result<(), AppError> {
    for student_id in student_ids {
        let mut link = Record::new();
        link.insert("lesson_id".into(), json!(lesson_id));
        link.insert("student_id".into(), json!(student_id));
        store.insert(Table::LessonStudents, link).await?;
    }
    Ok(())
}

/// 수업들의 학생 id 목록을 한 번의 조회로 채웁니다.
async fn attach_students(store: &dyn Store, lessons: &mut [Lesson]) -> Result<(), AppError> {
    if lessons.is_empty() {
        return Ok(());
    }

    let ids = lessons.iter().map(|l| FilterValue::from(l.id)).collect();
    let spec = QuerySpec::new(Table::LessonStudents)
        .filter(Predicate::In("lesson_id", ids))
        .order(Order::Asc("lesson_id"))
        .order(Order::Asc("student_id"));

    let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in store.select(&spec).await?.rows {
        if let (Some(lesson_id), Some(student_id)) = (row["lesson_id"].as_i64(), row["student_id"].as_i64()) {
            links.entry(lesson_id).or_default().push(student_id);
        }
    }

    for lesson in lessons.iter_mut() {
        lesson.student_ids = links.remove(&lesson.id).unwrap_or_default();
    }
    Ok(())
}
