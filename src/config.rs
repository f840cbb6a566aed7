//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수(`.env` 포함)에서 서버 설정값을 읽어옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `HOST`, `PORT`: 서버 바인딩 주소
//! - `DATABASE_MAX_CONNECTIONS`: 연결 풀 크기
//! - `FRONTEND_DIST`: 빌드된 콘솔 프론트엔드 디렉토리
//! - `SCHEDULE_UTC_OFFSET_MINUTES`: "지금 가용한가" 판정에 쓰는 벽시계 오프셋
//! - `STRICT_STATUS_TRANSITIONS`: 수업 상태 전이표 강제 여부
//! - `SCHEDULE_CONFLICT_CHECK`: 같은 전문가의 겹치는 일정 거부 여부

// std::env: 표준 라이브러리의 환경변수 모듈
use std::env;
// FromStr: "3000" → 3000처럼 문자열을 다른 타입으로 바꾸는 트레이트 (`.parse()`가 사용)
use std::str::FromStr;

/// 애플리케이션 전체 설정
///
/// 서버 시작 시 한 번 읽어 `AppState`로 공유합니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// 예: "sqlite:data/aulas.db"
    pub database_url: String,
    /// 기본값 "0.0.0.0" (모든 네트워크 인터페이스)
    pub host: String,
    /// u16: 0~65535, 포트 번호 범위와 같습니다. 기본값 3000
    pub port: u16,
    /// 동시에 유지할 최대 연결 수. 기본값 5
    pub max_connections: u32,
    pub frontend_dist: String,
    /// 저장된 가용 시간대(벽시계 기준)와 비교할 때 UTC에 더할 분
    /// (예: 브라질리아 시간 -180). 음수가 가능하므로 i32
    pub utc_offset_minutes: i32,
    pub strict_status_transitions: bool,
    pub conflict_check: bool,
}

impl Config {
    /// 환경변수에서 설정값을 읽습니다.
    ///
    /// # 에러
    /// `DATABASE_URL`이 없으면 에러. 나머지는 없거나 해석할 수 없으면 기본값을 씁니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            // `?`: 필수 값이 없으면 VarError를 그대로 호출자(main)에게 전달
            database_url: env::var("DATABASE_URL")?,
            // unwrap_or_else: 에러일 때만 클로저를 실행해 기본값을 만듭니다.
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            // 숫자 설정은 parsed()로 읽고, 잘못된 값이면 기본값으로 대체
            port: parsed("PORT", 3000),
            max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5),
            frontend_dist: env::var("FRONTEND_DIST").unwrap_or_else(|_| "../frontend/dist".to_string()),
            utc_offset_minutes: parsed("SCHEDULE_UTC_OFFSET_MINUTES", 0),
            // 규칙 스위치는 기본적으로 꺼져 있음
            strict_status_transitions: flag("STRICT_STATUS_TRANSITIONS"),
            conflict_check: flag("SCHEDULE_CONFLICT_CHECK"),
        })
    }
}

/// 환경변수를 `T`로 해석합니다. 없거나 해석에 실패하면 `default`
///
/// `T: FromStr`: 제네릭 타입 T는 문자열에서 만들 수 있어야 한다는 제약(트레이트 바운드)
fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok() // Result → Option (없으면 None)
        .and_then(|value| value.trim().parse().ok()) // 해석 실패도 None
        .unwrap_or(default)
}

/// "1", "true", "yes", "on"(대소문자 무시)이면 켜짐
fn flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
