//! # 에러 처리 모듈
//!
//! 핸들러와 저장소 계층이 돌려주는 모든 실패를 `AppError` 하나로 모읍니다.
//!
//! - `AppError` 열거형(enum): 에러 종류별 variant
//! - `IntoResponse` 구현: `{ "error": { "code", "message" } }` JSON 응답으로 변환
//!
//! 검증 에러와 외래키 위반은 사용자가 고칠 수 있으므로 메시지를 그대로 보여주고,
//! 나머지 저장소 에러는 로그에만 자세히 남깁니다.

use crate::models::ValidationError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 `IntoResponse`를 호출해 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400). 쿼리 문자열 해석 실패 등
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 폼 검증 실패 (HTTP 400)
    /// #[from]: `?`로 ValidationError → AppError 자동 변환
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 일정 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 저장소 실패. 외래키 위반만 409, 나머지는 500
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// (상태 코드, 에러 코드, 클라이언트에 보여줄 메시지)
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Store(StoreError::ForeignKeyViolation { table, .. }) => (
                StatusCode::CONFLICT,
                "foreign_key_violation",
                format!("This {} record is still referenced by other records", singular(table)),
            ),
            AppError::Store(err) => {
                // 내부 에러는 로그에만 기록
                tracing::error!(error = %err, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

/// "professionals" → "professional"
fn singular(table: &str) -> &str {
    table.strip_suffix('s').unwrap_or(table)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let fk = AppError::Store(StoreError::ForeignKeyViolation {
            table: "professionals",
            message: "FOREIGN KEY constraint failed".into(),
        });
        let (status, code, message) = fk.parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "foreign_key_violation");
        assert!(message.contains("professional record"));

        let (status, code, message) = AppError::from(ValidationError::StartInPast).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "validation_error");
        assert_eq!(message, "Lesson cannot start in the past");

        let (status, _, message) = AppError::Store(StoreError::MalformedRow("x".into())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains('x'));

        assert_eq!(AppError::NotFound.parts().0, StatusCode::NOT_FOUND);
    }
}
