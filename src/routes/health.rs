//! # 헬스체크(Health Check) 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/health` → `{ "status": "ok", "store": "ok" }`
//!
//! 저장소에 가벼운 개수 조회를 한 번 보내 연결 상태도 함께 알려줍니다.
//! 저장소가 응답하지 않아도 서버 자체는 살아 있으므로 상태 코드는 항상 200입니다.

use super::AppState;
use crate::store::{QuerySpec, Table};
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let store = match state.store.count(&QuerySpec::new(Table::Professionals)).await {
        Ok(_) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "health check: store unavailable");
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "store": store
    }))
}
