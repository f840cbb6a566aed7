//! # Aulas 관리 콘솔 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 저장소 연결 및 마이그레이션
//! 4. API 라우터 설정 (+ 빌드된 콘솔 프론트엔드 서빙)
//! 5. HTTP 서버 시작

// mod 선언: 같은 크레이트의 다른 파일(모듈)을 불러옵니다.
// `mod db;`는 src/db/mod.rs를 찾아 이 크레이트의 `db` 모듈로 등록합니다.
mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;
mod store;

// anyhow::Result: 어떤 에러든 담을 수 있는 범용 Result 타입.
// main처럼 "에러를 사용자에게 보여주고 끝내기만 하면 되는" 곳에서 씁니다.
use anyhow::Result;
use axum::Router;
use config::Config;
use routes::AppState;
use std::path::Path;
// Arc: 여러 스레드가 같은 값을 공유할 수 있게 하는 참조 카운트 포인터
use std::sync::Arc;
use store::sqlite::SqliteStore;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
// SubscriberExt / SubscriberInitExt: registry()에 .with(), .init()을 붙여주는 확장 트레이트
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// #[tokio::main]: main을 tokio 비동기 런타임 안에서 실행하게 해주는 매크로
#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .ok()로 Result를 버리므로 .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // registry()에 필터와 출력 포맷터를 레이어로 쌓은 뒤 전역 로거로 등록합니다.
    tracing_subscriber::registry()
        .with(
            // RUST_LOG가 없으면 aulas, tower_http, axum을 debug 레벨로
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aulas=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer()) // 터미널 출력 레이어
        .init();

    // ── 3단계: 설정 로딩 ──
    // `?`: DATABASE_URL이 없으면 여기서 바로 에러를 반환하고 종료합니다.
    let config = Config::from_env()?;
    tracing::info!("Starting Aulas server on {}:{}", config.host, config.port);
    // 구조화 로그: key = value 필드로 남겨 나중에 검색하기 쉽게 합니다.
    tracing::info!(
        strict_status_transitions = config.strict_status_transitions,
        conflict_check = config.conflict_check,
        utc_offset_minutes = config.utc_offset_minutes,
        "schedule rules"
    );

    // ── 4단계: 저장소 연결 + 마이그레이션 ──
    // 연결 풀은 요청마다 연결을 새로 만들지 않고 빌려 쓰고 돌려줍니다.
    let store = SqliteStore::connect(&config.database_url, config.max_connections).await?;
    tracing::info!("Running database migrations...");
    // 아직 적용되지 않은 ./migrations 파일만 순서대로 실행
    store.migrate().await?;

    // ── 5단계: 애플리케이션 상태(State) 생성 ──
    // 저장소는 `Arc<dyn Store>` 트레이트 객체로 넣습니다.
    // 핸들러는 구체 타입(SqliteStore)을 모르고 Store 트레이트만 사용합니다.
    let state = AppState {
        store: Arc::new(store),
        // (&config).into(): `From<&Config> for ScheduleRules` 구현을 호출
        rules: (&config).into(),
        utc_offset_minutes: config.utc_offset_minutes,
    };

    // ── 6단계: CORS 설정 ──
    // 개발 환경 기준으로 모든 출처/메서드/헤더 허용
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // ── 7단계: 라우터 + 프론트엔드 정적 파일 ──
    // /api/v1 밖의 경로는 빌드된 콘솔 파일로 넘깁니다.
    // SPA이므로 찾을 수 없는 경로는 index.html로 돌려보내 클라이언트 라우터가 처리하게 합니다.
    let frontend_dist = Path::new(&config.frontend_dist);
    let app: Router = if frontend_dist.exists() {
        tracing::info!("Serving frontend static files from {}", config.frontend_dist);
        let serve_dir = ServeDir::new(frontend_dist)
            .not_found_service(ServeFile::new(frontend_dist.join("index.html")));
        routes::router(state).fallback_service(serve_dir)
    } else {
        tracing::warn!("Frontend dist directory not found, serving API only");
        routes::router(state)
    };
    // .layer(): 모든 요청을 감싸는 미들웨어. 나중에 붙인 레이어가 바깥쪽에서 먼저 실행됩니다.
    // TraceLayer는 요청/응답마다 메서드, 경로, 상태 코드, 소요 시간을 로그로 남깁니다.
    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    // ── 8단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // 서버가 종료될 때까지 여기서 기다립니다.
    axum::serve(listener, app).await?;

    Ok(())
}
