use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{SettlementError, SettlementResult};

/// 취소 주문을 나타내는 상태값. 그 외 상태는 모두 유효 주문으로 본다.
pub const CANCELLED_STATUS: &str = "취소";

/// 정산 기간 (양끝 포함)
///
/// 조회 시에는 `[start 00:00, end+1일 00:00)` 반개구간으로 변환된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SettlementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> SettlementResult<Self> {
        if start > end {
            return Err(SettlementError::validation(format!(
                "정산 시작일({})이 종료일({})보다 늦습니다",
                start, end
            )));
        }
        if end.checked_add_days(Days::new(1)).is_none() {
            return Err(SettlementError::validation(format!(
                "정산 종료일이 범위를 벗어났습니다: {}",
                end
            )));
        }
        Ok(Self { start, end })
    }

    /// `YYYY-MM-DD` 문자열 쌍으로부터 기간 생성
    pub fn parse(start: Option<&str>, end: Option<&str>) -> SettlementResult<Self> {
        let start = parse_date("periodStart", start)?;
        let end = parse_date("periodEnd", end)?;
        Self::new(start, end)
    }

    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// 종료일 다음날 0시 (배타적 상한)
    pub fn upper_bound(&self) -> NaiveDateTime {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(NaiveTime::MIN)
    }
}

fn parse_date(field: &str, value: Option<&str>) -> SettlementResult<NaiveDate> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SettlementError::validation(format!("{} 값이 필요합니다", field)))?;

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        SettlementError::validation(format!("{} 날짜 형식이 올바르지 않습니다: {}", field, raw))
    })
}

/// 정산 식별자 (회사, 몰, 기간)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementKey {
    pub company_id: i64,
    pub mall_id: i64,
    pub period: SettlementPeriod,
}

/// 원천 주문 행을 필드 별칭 규칙으로 해석한 결과
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOrder {
    pub order_id: i64,
    pub mall_id: Option<i64>,
    pub shop_name: Option<String>,
    pub mapping_code: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub supply_price: i64,
    pub cost_price: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl ResolvedOrder {
    pub fn is_cancelled(&self) -> bool {
        self.status == CANCELLED_STATUS
    }

    /// 공급가 × 수량 (i64 범위에서 포화)
    pub fn amount(&self) -> i64 {
        self.supply_price.saturating_mul(self.quantity)
    }

    /// (공급가 − 원가) × 수량 (i64 범위에서 포화)
    pub fn profit(&self) -> i64 {
        self.supply_price
            .saturating_sub(self.cost_price)
            .saturating_mul(self.quantity)
    }
}

/// 몰 하나의 기간 집계 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MallAggregate {
    pub order_quantity: i64,
    pub order_amount: i64,
    pub cancel_quantity: i64,
    pub cancel_amount: i64,
    pub total_profit_amount: i64,
    /// 집계에 기여한 주문 (주문 ID 중복 제거 후)
    pub orders: Vec<ResolvedOrder>,
}

impl MallAggregate {
    pub fn is_empty(&self) -> bool {
        self.order_quantity == 0 && self.cancel_quantity == 0
    }
}

/// 정산 행에 저장되는 수치 일체. 기존 정산과의 비교는 이 구조체의 완전 일치로 판단한다.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementFigures {
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
}

impl SettlementFigures {
    pub fn from_aggregate(aggregate: &MallAggregate) -> Self {
        // 판매수수료는 아직 산정하지 않는다
        let sales_fee_amount: Option<i64> = None;

        let net_sales_quantity = aggregate.order_quantity.saturating_sub(aggregate.cancel_quantity);
        let net_sales_amount = aggregate.order_amount.saturating_sub(aggregate.cancel_amount);
        let net_profit_amount = aggregate
            .total_profit_amount
            .saturating_sub(sales_fee_amount.unwrap_or(0));

        Self {
            order_quantity: aggregate.order_quantity,
            order_amount: aggregate.order_amount,
            cancel_quantity: aggregate.cancel_quantity,
            cancel_amount: aggregate.cancel_amount,
            net_sales_quantity,
            net_sales_amount,
            total_profit_amount: aggregate.total_profit_amount,
            total_profit_rate: rate_of(aggregate.total_profit_amount, net_sales_amount),
            sales_fee_amount,
            net_profit_amount,
            net_profit_rate: rate_of(net_profit_amount, net_sales_amount),
        }
    }
}

/// 순매출 대비 백분율 (소수 둘째 자리 반올림). 순매출이 0 이하이면 0.
pub fn rate_of(amount: i64, net_sales_amount: i64) -> f64 {
    if net_sales_amount <= 0 {
        return 0.0;
    }
    let rate = amount as f64 / net_sales_amount as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// 정산 주문 조회 결과 한 건 (동결/실시간 모드 공통)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOrderView {
    pub order_id: i64,
    pub mall_id: Option<i64>,
    pub shop_name: Option<String>,
    pub mapping_code: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub supply_price: i64,
    pub cost_price: i64,
    pub event_price: Option<i64>,
    pub discount_rate: Option<f64>,
    pub order_status: String,
    pub order_date: NaiveDateTime,
}

impl From<&ResolvedOrder> for SettlementOrderView {
    fn from(order: &ResolvedOrder) -> Self {
        Self {
            order_id: order.order_id,
            mall_id: order.mall_id,
            shop_name: order.shop_name.clone(),
            mapping_code: order.mapping_code.clone(),
            product_name: order.product_name.clone(),
            quantity: order.quantity,
            supply_price: order.supply_price,
            cost_price: order.cost_price,
            event_price: None,
            discount_rate: None,
            order_status: order.status.clone(),
            order_date: order.created_at,
        }
    }
}

/// 대사 결과 처리 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementAction {
    Created,
    Updated,
}

/// 신규 생성되거나 갱신된 몰의 정산 요약
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMall {
    pub mall_id: i64,
    pub mall_name: String,
    pub settlement_id: i64,
    pub action: SettlementAction,
    #[serde(flatten)]
    pub figures: SettlementFigures,
}

/// 대사 배치 응답
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub processed_malls: Vec<ProcessedMall>,
    pub total_orders_processed: usize,
    pub unchanged_malls: usize,
    pub deleted_malls: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_period_bounds_are_half_open() {
        let period = SettlementPeriod::new(date("2024-01-01"), date("2024-01-31")).unwrap();
        assert_eq!(period.lower_bound().to_string(), "2024-01-01 00:00:00");
        assert_eq!(period.upper_bound().to_string(), "2024-02-01 00:00:00");
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let err = SettlementPeriod::new(date("2024-02-01"), date("2024-01-01")).unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }

    #[test]
    fn test_period_parse_requires_both_dates() {
        assert!(SettlementPeriod::parse(Some("2024-01-01"), None).is_err());
        assert!(SettlementPeriod::parse(Some("2024/01/01"), Some("2024-01-02")).is_err());
        assert!(SettlementPeriod::parse(Some(" 2024-01-01 "), Some("2024-01-01")).is_ok());
    }

    #[test]
    fn test_figures_conservation() {
        let aggregate = MallAggregate {
            order_quantity: 1,
            order_amount: 2000,
            cancel_quantity: 1,
            cancel_amount: 500,
            total_profit_amount: 600,
            orders: vec![],
        };
        let figures = SettlementFigures::from_aggregate(&aggregate);

        assert_eq!(figures.net_sales_quantity, 0);
        assert_eq!(figures.net_sales_amount, 1500);
        assert_eq!(figures.total_profit_rate, 40.0);
        assert_eq!(figures.net_profit_amount, 600);
        assert_eq!(figures.net_profit_rate, 40.0);
        assert_eq!(figures.sales_fee_amount, None);
    }

    #[test]
    fn test_rates_zero_when_net_sales_not_positive() {
        assert_eq!(rate_of(100, 0), 0.0);
        assert_eq!(rate_of(100, -50), 0.0);
        assert_eq!(rate_of(1, 3), 33.33);
    }
}
