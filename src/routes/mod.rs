//! # 라우트 핸들러 모듈
//!
//! 콘솔 프론트엔드가 호출하는 JSON API입니다. 모든 경로는 `/api/v1` 아래에 있습니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버/저장소 상태 확인
//! - `lessons`: 수업 목록/생성/조회/수정/상태 변경/삭제
//! - `availability`: 가용 시간대 목록/생성/조회/수정/삭제
//! - `directory`: 전문가/과목/가족/학교/학생 목록/생성/삭제
//!
//! ## 목록 응답 형태
//! ```json
//! { "rows": [...], "total": 23, "page": 0, "page_size": 10, "page_count": 3,
//!   "stats": {...}, "seq": 7 }
//! ```
//! `seq`는 요청의 `?seq=`를 그대로 돌려준 값입니다 (최신 요청 우선 처리용).

pub mod availability;
pub mod directory;
pub mod health;
pub mod lessons;

use crate::db::ScheduleRules;
use crate::error::AppError;
use crate::models::{Family, Professional, School, Student, Subject};
use crate::services::query::Page;
use crate::store::Store;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// 애플리케이션 공유 상태
///
/// 모든 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 저장소는 트레잇 객체로 주입되므로 테스트에서는 인메모리 SQLite를 넣습니다.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub rules: ScheduleRules,
    /// 가용 시간대(벽시계)와 비교할 현지 시각 = UTC + 이 값(분)
    pub utc_offset_minutes: i32,
}

impl AppState {
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// 가용 시간대 판정에 쓰는 현지 벽시계 시각
    pub fn now_local(&self) -> NaiveDateTime {
        self.now().naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes))
    }
}

/// 목록 API 공통 응답
#[derive(Debug, Serialize)]
pub struct ListResponse<T, S> {
    #[serde(flatten)]
    pub page: Page<T>,
    pub stats: S,
    pub seq: Option<u64>,
}

/// 쿼리 문자열 해석 실패를 공통 에러 형식(400)으로 바꿉니다.
pub(crate) fn query<T>(extracted: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    extracted
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// 요청 본문 JSON 해석 실패를 공통 에러 형식(400)으로 바꿉니다.
pub(crate) fn body<T>(extracted: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    extracted
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// `/api/v1` 아래 전체 API 라우터
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        // 수업
        .route("/lessons", get(lessons::list_lessons).post(lessons::create_lesson))
        .route(
            "/lessons/{id}",
            get(lessons::get_lesson)
                .put(lessons::update_lesson)
                .delete(lessons::delete_lesson),
        )
        .route("/lessons/{id}/status", patch(lessons::update_lesson_status))
        // 가용 시간대
        .route(
            "/availability",
            get(availability::list_availability).post(availability::create_availability),
        )
        .route(
            "/availability/{id}",
            get(availability::get_availability)
                .put(availability::update_availability)
                .delete(availability::delete_availability),
        )
        // 명부
        .merge(directory::routes::<Professional>("/professionals"))
        .merge(directory::routes::<Subject>("/subjects"))
        .merge(directory::routes::<Family>("/families"))
        .merge(directory::routes::<School>("/schools"))
        .merge(directory::routes::<Student>("/students"))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
