use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Local;
use log::error;
use serde_json::{json, Value};

use crate::api::models::*;
use crate::db::repository::SettlementRepository;
use crate::error::SettlementError;
use crate::server::ServerState;
use crate::settlement::model::{ReconcileSummary, SettlementPeriod};

/// 회사 식별 헤더 (상위 인증 계층이 채워준다)
pub const COMPANY_HEADER: &str = "x-company-id";

type ApiError = (StatusCode, Json<ErrorResponse>);

/// 정산 대사 실행 핸들러
pub async fn reconcile_settlements(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<ReconcileRequest>,
) -> Result<Json<ReconcileSummary>, ApiError> {
    let company_id = company_id_from(&headers).map_err(error_response)?;
    let period = SettlementPeriod::parse(payload.period_start.as_deref(), payload.period_end.as_deref())
        .map_err(error_response)?;

    let summary = state
        .reconciler
        .reconcile(company_id, period)
        .await
        .map_err(error_response)?;

    Ok(Json(summary))
}

/// 기간 정산 목록 조회 핸들러
pub async fn list_settlements(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<SettlementListResponse>, ApiError> {
    let company_id = company_id_from(&headers).map_err(error_response)?;
    let period = SettlementPeriod::parse(query.period_start.as_deref(), query.period_end.as_deref())
        .map_err(error_response)?;

    let mut conn = state
        .pool
        .acquire()
        .await
        .map_err(|e| error_response(e.into()))?;
    let settlements = SettlementRepository::find_by_company_period(&mut *conn, company_id, &period)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(SettlementListResponse {
        count: settlements.len(),
        settlements,
    }))
}

/// 정산 주문 동결 조회 핸들러
pub async fn get_settlement_orders(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(settlement_id): Path<String>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let company_id = company_id_from(&headers).map_err(error_response)?;
    let settlement_id = parse_id("settlementId", &settlement_id).map_err(error_response)?;

    let orders = state
        .reader
        .read_frozen(company_id, settlement_id, Local::now().date_naive())
        .await
        .map_err(error_response)?;

    Ok(Json(OrderListResponse {
        count: orders.len(),
        orders,
    }))
}

/// 몰 주문 실시간 조회 핸들러
pub async fn get_mall_orders(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(mall_id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let company_id = company_id_from(&headers).map_err(error_response)?;
    let mall_id = parse_id("mallId", &mall_id).map_err(error_response)?;
    let period = SettlementPeriod::parse(query.period_start.as_deref(), query.period_end.as_deref())
        .map_err(error_response)?;

    let orders = state
        .reader
        .read_live(company_id, mall_id, period, Local::now().date_naive())
        .await
        .map_err(error_response)?;

    Ok(Json(OrderListResponse {
        count: orders.len(),
        orders,
    }))
}

/// 헬스 체크
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn company_id_from(headers: &HeaderMap) -> Result<i64, SettlementError> {
    let raw = headers
        .get(COMPANY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| SettlementError::validation("회사 정보가 없습니다"))?;

    parse_id("companyId", raw)
}

fn parse_id(field: &str, raw: &str) -> Result<i64, SettlementError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| SettlementError::validation(format!("{} 값이 올바르지 않습니다: {}", field, raw)))
}

fn error_response(err: SettlementError) -> ApiError {
    let status = match err {
        SettlementError::Validation(_) => StatusCode::BAD_REQUEST,
        SettlementError::Store(_) => {
            error!("요청 처리 실패: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.code().to_string(),
            message: err.to_string(),
        }),
    )
}
