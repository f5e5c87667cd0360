use serde::{Deserialize, Serialize};

use crate::db::models::SettlementRecord;
use crate::settlement::model::SettlementOrderView;

/// 정산 대사 요청
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub period_start: Option<String>,
    pub period_end: Option<String>,
}

/// 기간 조회 파라미터
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub period_start: Option<String>,
    pub period_end: Option<String>,
}

/// 정산 목록 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementListResponse {
    pub count: usize,
    pub settlements: Vec<SettlementRecord>,
}

/// 정산 주문 조회 응답 (동결/실시간 공통)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub count: usize,
    pub orders: Vec<SettlementOrderView>,
}

/// 에러 응답
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
