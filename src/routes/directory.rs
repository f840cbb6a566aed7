//! # 명부 라우트 핸들러
//!
//! 엔티티마다 같은 세 엔드포인트를 제네릭 핸들러로 등록합니다.
//! - `GET    /api/v1/{entities}?search=&page=&seq=` → 이름 검색 목록 (+ `dependents`)
//! - `POST   /api/v1/{entities}`                   → 생성
//! - `DELETE /api/v1/{entities}/{id}`              → 삭제 (참조 중이면 409)

use super::{body, query, AppState, ListResponse};
use crate::db;
use crate::error::AppError;
use crate::models::{DirectoryEntity, DirectoryEntry};
use crate::services::query::{DirectoryCriteria, PageRequest};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

/// `path`(예: "/professionals")와 `path/{id}` 라우트
pub fn routes<T: DirectoryEntity>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<T>).post(create::<T>))
        .route(&format!("{path}/{{id}}"), delete(remove::<T>))
}

async fn list<T: DirectoryEntity>(
    State(state): State<AppState>,
    criteria: Result<Query<DirectoryCriteria>, QueryRejection>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<ListResponse<DirectoryEntry<T>, ()>>, AppError> {
    let criteria = query(criteria)?;
    let page = query(page)?;
    let page_result = db::list_entries::<T>(state.store.as_ref(), &criteria, page).await?;
    Ok(Json(ListResponse {
        page: page_result,
        stats: (),
        seq: page.seq,
    }))
}

async fn create<T: DirectoryEntity>(
    State(state): State<AppState>,
    form: Result<Json<T::Form>, JsonRejection>,
) -> Result<(StatusCode, Json<T>), AppError> {
    let form = body(form)?;
    let entry = db::create_entry::<T>(state.store.as_ref(), &form).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove<T: DirectoryEntity>(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    db::delete_entry::<T>(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::db::ScheduleRules;
    use crate::routes::tests::{create, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn student_list_embeds_family_and_counts_dependents() {
        let app = test_app(ScheduleRules::default()).await;
        let family = create(&app, "/api/v1/families", json!({ "name": "Silva", "phone": "81 9999-0000" })).await;
        let school = create(&app, "/api/v1/schools", json!({ "name": "Escola Sol", "city": "Recife" })).await;
        create(
            &app,
            "/api/v1/students",
            json!({ "name": "Bia", "family_id": family, "school_id": school, "birth_date": "2016-08-09" }),
        )
        .await;

        let (status, list) = send(&app, Method::GET, "/api/v1/students?search=bi&seq=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);
        assert_eq!(list["rows"][0]["family"]["name"], "Silva");
        assert_eq!(list["rows"][0]["school"]["name"], "Escola Sol");
        assert_eq!(list["stats"], serde_json::Value::Null);

        let (_, families) = send(&app, Method::GET, "/api/v1/families", None).await;
        assert_eq!(families["rows"][0]["dependents"], 1);

        // 학교 삭제는 학생의 school_id를 비움
        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/schools/{school}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, list) = send(&app, Method::GET, "/api/v1/students", None).await;
        assert_eq!(list["rows"][0]["school_id"], serde_json::Value::Null);

        let (status, body) = send(&app, Method::DELETE, &format!("/api/v1/families/{family}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "foreign_key_violation");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = test_app(ScheduleRules::default()).await;
        let (status, body) = send(&app, Method::POST, "/api/v1/subjects", Some(json!({ "name": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Name is required");
    }
}
