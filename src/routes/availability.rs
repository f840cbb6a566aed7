//! # 가용 시간대(Availability) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/availability`      → 목록 (`professional_id`, `day_of_week`, `status`, `page`, `seq`)
//! - `POST   /api/v1/availability`      → 생성
//! - `GET    /api/v1/availability/{id}` → 조회
//! - `PUT    /api/v1/availability/{id}` → 요일/시작/종료/상태 전체 교체
//! - `DELETE /api/v1/availability/{id}` → 삭제
//!
//! 응답에는 `duration_minutes`, `duration_label`, `available_now`가 붙습니다.
//! `available_now`는 설정된 UTC 오프셋을 적용한 현지 시각 기준입니다.

use super::{body, query, AppState, ListResponse};
use crate::db;
use crate::error::AppError;
use crate::models::{AvailabilityForm, AvailabilityView};
use crate::services::query::{AvailabilityCriteria, PageRequest};
use crate::services::stats::AvailabilityStatistics;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

pub async fn list_availability(
    State(state): State<AppState>,
    criteria: Result<Query<AvailabilityCriteria>, QueryRejection>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<ListResponse<AvailabilityView, AvailabilityStatistics>>, AppError> {
    let criteria = query(criteria)?;
    let page = query(page)?;
    let now_local = state.now_local();

    let listing = db::list_availability(state.store.as_ref(), &criteria, page).await?;
    Ok(Json(ListResponse {
        page: listing.page.map(|window| window.view(now_local)),
        stats: listing.stats,
        seq: page.seq,
    }))
}

pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AvailabilityView>, AppError> {
    let window = db::get_availability(state.store.as_ref(), id).await?;
    Ok(Json(window.view(state.now_local())))
}

pub async fn create_availability(
    State(state): State<AppState>,
    form: Result<Json<AvailabilityForm>, JsonRejection>,
) -> Result<(StatusCode, Json<AvailabilityView>), AppError> {
    let draft = body(form)?.validate()?;
    let window = db::create_availability(state.store.as_ref(), &draft, state.rules).await?;
    Ok((StatusCode::CREATED, Json(window.view(state.now_local()))))
}

pub async fn update_availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    form: Result<Json<AvailabilityForm>, JsonRejection>,
) -> Result<Json<AvailabilityView>, AppError> {
    let draft = body(form)?.validate()?;
    let window = db::update_availability(state.store.as_ref(), id, &draft, state.rules).await?;
    Ok(Json(window.view(state.now_local())))
}

pub async fn delete_availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    db::delete_availability(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
