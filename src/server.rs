use anyhow::Context;
use axum::Router;
use log::{info, warn};
use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::db::init_database;
use crate::settlement::{SettlementReconciler, SnapshotReader};

/// 서버 설정
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rest_port: u16,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_port: 7000,
            database_url: "sqlite://settlement.db".into(),
            max_connections: 5,
        }
    }
}

impl ServerConfig {
    /// 환경 변수(`REST_PORT`, `DATABASE_URL`, `DB_MAX_CONNECTIONS`)로 기본값 덮어쓰기
    ///
    /// `.env` 파일이 있으면 먼저 읽는다.
    pub fn from_env() -> Self {
        if dotenv::dotenv().is_err() {
            info!(".env 파일 없음, 환경 변수만 사용");
        }

        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(port) = env_number::<u16>("REST_PORT") {
            config.rest_port = port;
        }
        if let Some(max) = env_number::<u32>("DB_MAX_CONNECTIONS") {
            config.max_connections = max.max(1);
        }

        config
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("환경 변수 {} 값이 올바르지 않아 기본값 사용: {}", key, raw);
            None
        }
    }
}

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub pool: SqlitePool,
    pub reconciler: SettlementReconciler,
    pub reader: SnapshotReader,
}

impl ServerState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            reconciler: SettlementReconciler::new(pool.clone()),
            reader: SnapshotReader::new(pool.clone()),
            pool,
        }
    }
}

/// 미들웨어까지 붙인 앱 라우터
pub fn build_app(state: ServerState) -> Router {
    create_api_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 서버 시작
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    info!("정산 서버 시작 중...");

    let pool = init_database(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("데이터베이스 초기화 실패: {}", config.database_url))?;

    let app = build_app(ServerState::new(pool));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.rest_port))
        .await
        .with_context(|| format!("REST 포트 바인드 실패: {}", config.rest_port))?;

    info!("서버가 성공적으로 시작되었습니다!");
    info!("REST API: http://localhost:{}", config.rest_port);

    axum::serve(listener, app).await.context("REST 서버 종료")?;

    Ok(())
}
