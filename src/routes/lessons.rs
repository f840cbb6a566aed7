//! # 수업(Lesson) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/lessons`             → 수업 목록 (필터 + 페이지 + 통계)
//! - `POST   /api/v1/lessons`             → 새 수업 예약
//! - `GET    /api/v1/lessons/{id}`        → 단일 수업 조회
//! - `PUT    /api/v1/lessons/{id}`        → 수업 전체 수정
//! - `PATCH  /api/v1/lessons/{id}/status` → 상태만 변경
//! - `DELETE /api/v1/lessons/{id}`        → 수업 삭제
//!
//! 목록 쿼리: `search`, `status`, `professional_id`, `subject_id`,
//! `date_from`, `date_to`(YYYY-MM-DD), `page`, `seq`
//!
//! 응답의 수업에는 `duration_minutes`, `duration_label`, `upcoming`, `overdue`가
//! 요청 시각 기준으로 붙습니다.

use super::{body, query, AppState, ListResponse};
use crate::db;
use crate::error::AppError;
use crate::models::{LessonForm, LessonView, StatusForm};
use crate::services::query::{LessonCriteria, PageRequest};
use crate::services::stats::LessonStatistics;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

pub async fn list_lessons(
    State(state): State<AppState>,
    criteria: Result<Query<LessonCriteria>, QueryRejection>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<ListResponse<LessonView, LessonStatistics>>, AppError> {
    let criteria = query(criteria)?;
    let page = query(page)?;
    let now = state.now();

    let listing = db::list_lessons(state.store.as_ref(), &criteria, page, now).await?;
    Ok(Json(ListResponse {
        page: listing.page.map(|lesson| lesson.view(now)),
        stats: listing.stats,
        seq: page.seq,
    }))
}

pub async fn get_lesson(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<LessonView>, AppError> {
    let lesson = db::get_lesson(state.store.as_ref(), id).await?;
    Ok(Json(lesson.view(state.now())))
}

/// 새 수업은 과거에 시작할 수 없습니다 (`start_at == now`는 허용).
pub async fn create_lesson(
    State(state): State<AppState>,
    form: Result<Json<LessonForm>, JsonRejection>,
) -> Result<(StatusCode, Json<LessonView>), AppError> {
    let now = state.now();
    let draft = body(form)?.validate(true, now)?;
    let lesson = db::create_lesson(state.store.as_ref(), &draft, state.rules).await?;
    Ok((StatusCode::CREATED, Json(lesson.view(now))))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    form: Result<Json<LessonForm>, JsonRejection>,
) -> Result<Json<LessonView>, AppError> {
    let now = state.now();
    let draft = body(form)?.validate(false, now)?;
    let lesson = db::update_lesson(state.store.as_ref(), id, &draft, state.rules).await?;
    Ok(Json(lesson.view(now)))
}

pub async fn update_lesson_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    form: Result<Json<StatusForm>, JsonRejection>,
) -> Result<Json<LessonView>, AppError> {
    let status = body(form)?.parse()?;
    let lesson = db::update_lesson_status(state.store.as_ref(), id, status, state.rules).await?;
    Ok(Json(lesson.view(state.now())))
}

pub async fn delete_lesson(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    db::delete_lesson(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
