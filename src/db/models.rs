use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::settlement::model::{ResolvedOrder, SettlementFigures};

/// 몰 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MallRecord {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
}

/// 상품 카탈로그 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductRecord {
    pub id: i64,
    pub company_id: i64,
    pub mapping_code: String,
    pub product_name: String,
    pub sale_price: Option<i64>,
    pub cost_price: Option<i64>,
}

/// 원천 주문 DB 모델
///
/// `row_data`는 엑셀에서 올라온 행을 그대로 담은 JSON 객체(키 순서 유지)다.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub company_id: i64,
    pub mall_id: Option<i64>,
    pub shop_name: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub row_data: String,
}

/// 정산 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub id: i64,
    pub company_id: i64,
    pub mall_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub order_quantity: i64,
    pub order_amount: i64,
    pub cancel_quantity: i64,
    pub cancel_amount: i64,
    pub net_sales_quantity: i64,
    pub net_sales_amount: i64,
    pub total_profit_amount: i64,
    pub total_profit_rate: f64,
    pub sales_fee_amount: Option<i64>,
    pub net_profit_amount: i64,
    pub net_profit_rate: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SettlementRecord {
    pub fn figures(&self) -> SettlementFigures {
        SettlementFigures {
            order_quantity: self.order_quantity,
            order_amount: self.order_amount,
            cancel_quantity: self.cancel_quantity,
            cancel_amount: self.cancel_amount,
            net_sales_quantity: self.net_sales_quantity,
            net_sales_amount: self.net_sales_amount,
            total_profit_amount: self.total_profit_amount,
            total_profit_rate: self.total_profit_rate,
            sales_fee_amount: self.sales_fee_amount,
            net_profit_amount: self.net_profit_amount,
            net_profit_rate: self.net_profit_rate,
        }
    }
}

/// 정산-주문 연결 DB 모델 (대사 시점 스냅샷 포함)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SettlementOrderRecord {
    pub settlement_id: i64,
    pub order_id: i64,
    pub snapshot_mapping_code: Option<String>,
    pub snapshot_product_name: Option<String>,
    pub snapshot_quantity: Option<i64>,
    pub snapshot_supply_price: Option<i64>,
    pub snapshot_cost_price: Option<i64>,
    pub snapshot_order_status: Option<String>,
    pub snapshot_order_date: Option<NaiveDateTime>,
}

impl SettlementOrderRecord {
    pub fn snapshot_of(settlement_id: i64, order: &ResolvedOrder) -> Self {
        Self {
            settlement_id,
            order_id: order.order_id,
            snapshot_mapping_code: order.mapping_code.clone(),
            snapshot_product_name: Some(order.product_name.clone()),
            snapshot_quantity: Some(order.quantity),
            snapshot_supply_price: Some(order.supply_price),
            snapshot_cost_price: Some(order.cost_price),
            snapshot_order_status: Some(order.status.clone()),
            snapshot_order_date: Some(order.created_at),
        }
    }
}

/// 동결 조회용: 연결 스냅샷 + 원천 주문의 식별 메타데이터
#[derive(Debug, Clone, FromRow)]
pub struct FrozenOrderRow {
    pub order_id: i64,
    pub snapshot_mapping_code: Option<String>,
    pub snapshot_product_name: Option<String>,
    pub snapshot_quantity: Option<i64>,
    pub snapshot_supply_price: Option<i64>,
    pub snapshot_cost_price: Option<i64>,
    pub snapshot_order_status: Option<String>,
    pub snapshot_order_date: Option<NaiveDateTime>,
    pub shop_name: Option<String>,
    pub mall_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

/// 프로모션 DB 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PromotionRecord {
    pub id: i64,
    pub mall_id: i64,
    pub product_code: String,
    pub discount_rate: Option<f64>,
    pub event_price: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// 주문 적재용 입력 (상위 엑셀 적재 단계와 테스트 시드에서 사용)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub company_id: i64,
    pub mall_id: Option<i64>,
    pub shop_name: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub row_data: serde_json::Map<String, serde_json::Value>,
}

/// 상품 등록 입력
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub company_id: i64,
    pub mapping_code: String,
    pub product_name: String,
    pub sale_price: Option<i64>,
    pub cost_price: Option<i64>,
}

/// 프로모션 등록 입력
#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub mall_id: i64,
    pub product_code: String,
    pub discount_rate: Option<f64>,
    pub event_price: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
