use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::*;
use crate::server::ServerState;

/// API 라우터 생성
pub fn create_api_router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))

        // 정산 대사/조회 API
        .route("/api/v1/settlements/reconcile", post(reconcile_settlements))
        .route("/api/v1/settlements", get(list_settlements))
        .route("/api/v1/settlements/:settlement_id/orders", get(get_settlement_orders))

        // 정산 전 실시간 주문 조회 API
        .route("/api/v1/malls/:mall_id/orders", get(get_mall_orders))
}
