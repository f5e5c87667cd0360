//! 정산 집계기
//!
//! 주문 저장소와 상품 카탈로그에서 몰/기간 주문을 읽어 수량·금액·이익을 합산한다.
//! 실시간 조회 모드도 같은 조회/해석 경로(`load_mall_orders`)를 쓴다.

use std::collections::{BTreeSet, HashSet};

use log::debug;
use sqlx::sqlite::SqliteConnection;

use crate::db::models::OrderRecord;
use crate::db::repository::{OrderRepository, ProductRepository};
use crate::error::SettlementResult;
use crate::settlement::fields::{
    first_number, first_text, parse_row_data, Catalog, RowData, COST_PRICE_KEYS, DEFAULT_PRICE,
    DEFAULT_QUANTITY, MAPPING_CODE_KEYS, PRODUCT_NAME_KEYS, QUANTITY_KEYS,
    SUPPLY_PRICE_FALLBACK_KEYS, SUPPLY_PRICE_KEYS,
};
use crate::settlement::model::{MallAggregate, ResolvedOrder, SettlementKey, SettlementPeriod};

/// 몰/기간 주문을 조회해 해석된 주문 목록으로 반환 (주문 ID 중복 제거)
pub async fn load_mall_orders(
    conn: &mut SqliteConnection,
    company_id: i64,
    mall_id: i64,
    period: &SettlementPeriod,
) -> SettlementResult<Vec<ResolvedOrder>> {
    let records = OrderRepository::find_in_period(&mut *conn, company_id, mall_id, period).await?;
    let rows = parse_rows(dedupe_by_id(records));

    let codes: Vec<String> = rows
        .iter()
        .filter_map(|(_, data)| first_text(data, MAPPING_CODE_KEYS))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let catalog = if codes.is_empty() {
        Catalog::default()
    } else {
        Catalog::new(ProductRepository::find_by_codes(&mut *conn, company_id, &codes).await?)
    };

    debug!(
        "몰 {} 주문 {}건 조회 (매핑코드 {}종, 카탈로그 매칭 {}종)",
        mall_id,
        rows.len(),
        codes.len(),
        catalog.len()
    );

    Ok(rows
        .iter()
        .map(|(record, data)| resolve_order(record, data, &catalog))
        .collect())
}

/// 몰 하나의 기간 집계
pub async fn aggregate_mall(conn: &mut SqliteConnection, key: &SettlementKey) -> SettlementResult<MallAggregate> {
    let orders = load_mall_orders(conn, key.company_id, key.mall_id, &key.period).await?;
    Ok(aggregate(orders))
}

/// 같은 주문 ID는 처음 나온 것만 남긴다 (카탈로그 조인 팬아웃 대비)
pub fn dedupe_by_id(records: Vec<OrderRecord>) -> Vec<OrderRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.id))
        .collect()
}

fn parse_rows(records: Vec<OrderRecord>) -> Vec<(OrderRecord, RowData)> {
    records
        .into_iter()
        .map(|record| {
            let data = parse_row_data(record.id, &record.row_data);
            (record, data)
        })
        .collect()
}

/// 주문 행 하나를 필드별 대체 순서에 따라 해석
///
/// - 공급가: 행의 공급가 → 카탈로그 판매가 → 행의 대체 가격 → 0
/// - 수량: 행 → 1
/// - 원가: 카탈로그 원가 → 행 → 0
pub fn resolve_order(record: &OrderRecord, data: &RowData, catalog: &Catalog) -> ResolvedOrder {
    let mapping_code = first_text(data, MAPPING_CODE_KEYS);
    let product = catalog.get(mapping_code.as_deref());

    let supply_price = first_number(data, SUPPLY_PRICE_KEYS)
        .or_else(|| product.and_then(|p| p.sale_price))
        .or_else(|| first_number(data, SUPPLY_PRICE_FALLBACK_KEYS))
        .unwrap_or(DEFAULT_PRICE);

    let quantity = first_number(data, QUANTITY_KEYS).unwrap_or(DEFAULT_QUANTITY);

    let cost_price = product
        .and_then(|p| p.cost_price)
        .or_else(|| first_number(data, COST_PRICE_KEYS))
        .unwrap_or(DEFAULT_PRICE);

    let product_name = first_text(data, PRODUCT_NAME_KEYS)
        .or_else(|| product.map(|p| p.product_name.clone()))
        .unwrap_or_default();

    ResolvedOrder {
        order_id: record.id,
        mall_id: record.mall_id,
        shop_name: record.shop_name.clone(),
        mapping_code,
        product_name,
        quantity,
        supply_price,
        cost_price,
        status: record.status.clone(),
        created_at: record.created_at,
    }
}

/// 해석된 주문 목록을 유효/취소로 나눠 합산
///
/// 수량 항목은 주문 행 수, 금액은 공급가 × 수량의 합이다.
/// 이익은 유효 주문에 대해서만 (공급가 − 원가) × 수량을 더한다. 합계는 i64 범위에서 포화한다.
///
/// `load_mall_orders`를 거치지 않고 목록을 직접 넘기는 호출자도 있으므로
/// 주문 ID 중복은 여기서도 한 번만 센다.
pub fn aggregate(orders: Vec<ResolvedOrder>) -> MallAggregate {
    let mut result = MallAggregate::default();
    let mut seen = HashSet::with_capacity(orders.len());

    for order in orders {
        if !seen.insert(order.order_id) {
            continue;
        }

        if order.is_cancelled() {
            result.cancel_quantity += 1;
            result.cancel_amount = result.cancel_amount.saturating_add(order.amount());
        } else {
            result.order_quantity += 1;
            result.order_amount = result.order_amount.saturating_add(order.amount());
            result.total_profit_amount = result.total_profit_amount.saturating_add(order.profit());
        }

        result.orders.push(order);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ProductRecord;
    use crate::settlement::fields::MAX_ABS_NUMBER;
    use crate::settlement::model::CANCELLED_STATUS;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record(id: i64, status: &str, data: serde_json::Value) -> (OrderRecord, RowData) {
        let row_data = data.to_string();
        let record = OrderRecord {
            id,
            company_id: 1,
            mall_id: Some(10),
            shop_name: Some("테스트샵".into()),
            status: status.into(),
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            row_data: row_data.clone(),
        };
        let data = parse_row_data(id, &row_data);
        (record, data)
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![ProductRecord {
            id: 1,
            company_id: 1,
            mapping_code: "P-1".into(),
            product_name: "카탈로그 상품".into(),
            sale_price: Some(800),
            cost_price: Some(300),
        }])
    }

    fn resolve(rows: &[(OrderRecord, RowData)], catalog: &Catalog) -> Vec<ResolvedOrder> {
        rows.iter().map(|(r, d)| resolve_order(r, d, catalog)).collect()
    }

    #[test]
    fn test_single_cancel_scenario() {
        let rows = vec![
            record(1, "배송완료", json!({ "공급가": 1000, "수량": 2 })),
            record(2, CANCELLED_STATUS, json!({ "공급가": 500, "수량": 1 })),
        ];
        let result = aggregate(resolve(&rows, &Catalog::default()));

        assert_eq!(result.order_quantity, 1);
        assert_eq!(result.order_amount, 2000);
        assert_eq!(result.cancel_quantity, 1);
        assert_eq!(result.cancel_amount, 500);
        assert_eq!(result.total_profit_amount, 2000);
        assert_eq!(result.orders.len(), 2);
    }

    #[test]
    fn test_supply_price_fallback_chain() {
        let catalog = catalog();

        // 명시적 공급가가 카탈로그보다 우선
        let (r, d) = record(1, "결제완료", json!({ "매핑코드": "P-1", "공급가": "1,500" }));
        assert_eq!(resolve_order(&r, &d, &catalog).supply_price, 1500);

        // 공급가가 없으면 카탈로그 판매가
        let (r, d) = record(2, "결제완료", json!({ "매핑코드": "P-1", "판매가": 9999 }));
        assert_eq!(resolve_order(&r, &d, &catalog).supply_price, 800);

        // 카탈로그에도 없으면 행의 대체 가격
        let (r, d) = record(3, "결제완료", json!({ "매핑코드": "NONE", "price": "700" }));
        assert_eq!(resolve_order(&r, &d, &catalog).supply_price, 700);

        // 전부 없으면 0
        let (r, d) = record(4, "결제완료", json!({ "비고": "가격 누락" }));
        assert_eq!(resolve_order(&r, &d, &catalog).supply_price, 0);
    }

    #[test]
    fn test_cost_price_prefers_catalog() {
        let catalog = catalog();

        let (r, d) = record(1, "결제완료", json!({ "매핑코드": "P-1", "원가": 100 }));
        let resolved = resolve_order(&r, &d, &catalog);
        assert_eq!(resolved.cost_price, 300);
        assert_eq!(resolved.product_name, "카탈로그 상품");

        let (r, d) = record(2, "결제완료", json!({ "원가": "1,00" }));
        assert_eq!(resolve_order(&r, &d, &catalog).cost_price, 100);
    }

    #[test]
    fn test_malformed_quantity_defaults_to_one_and_still_counts() {
        let rows = vec![record(1, "결제완료", json!({ "공급가": 1000, "수량": "두개" }))];
        let result = aggregate(resolve(&rows, &Catalog::default()));

        assert_eq!(result.orders[0].quantity, 1);
        assert_eq!(result.order_quantity, 1);
        assert_eq!(result.order_amount, 1000);
    }

    #[test]
    fn test_duplicate_order_ids_contribute_once() {
        let rows = vec![
            record(7, "결제완료", json!({ "공급가": 1000 })),
            record(7, "결제완료", json!({ "공급가": 1000 })),
        ];
        let result = aggregate(resolve(&rows, &Catalog::default()));
        assert_eq!(result.order_quantity, 1);
        assert_eq!(result.order_amount, 1000);

        let records = rows.into_iter().map(|(r, _)| r).collect();
        assert_eq!(dedupe_by_id(records).len(), 1);
    }

    #[test]
    fn test_profit_excludes_cancelled_rows() {
        let catalog = catalog();
        let rows = vec![
            record(1, "결제완료", json!({ "매핑코드": "P-1", "수량": 3 })),
            record(2, CANCELLED_STATUS, json!({ "매핑코드": "P-1", "수량": 5 })),
        ];
        let result = aggregate(resolve(&rows, &catalog));

        assert_eq!(result.total_profit_amount, (800 - 300) * 3);
        assert_eq!(result.cancel_amount, 800 * 5);
    }

    #[test]
    fn test_huge_row_values_fall_back_to_defaults() {
        let rows = vec![record(1, "결제완료", json!({ "공급가": "1e30", "수량": 2, "원가": "9e40" }))];
        let orders = resolve(&rows, &Catalog::default());

        assert_eq!(orders[0].supply_price, 0);
        assert_eq!(orders[0].cost_price, 0);
        assert_eq!(orders[0].quantity, 2);

        let result = aggregate(orders);
        assert_eq!(result.order_quantity, 1);
        assert_eq!(result.order_amount, 0);
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let mut orders = resolve(
            &[
                record(1, "결제완료", json!({ "공급가": MAX_ABS_NUMBER, "수량": MAX_ABS_NUMBER })),
                record(2, "결제완료", json!({ "공급가": MAX_ABS_NUMBER, "수량": MAX_ABS_NUMBER })),
            ],
            &Catalog::default(),
        );
        orders[1].cost_price = -MAX_ABS_NUMBER;

        let result = aggregate(orders);

        assert_eq!(result.order_quantity, 2);
        assert_eq!(result.order_amount, i64::MAX);
        assert_eq!(result.total_profit_amount, i64::MAX);
    }

    #[test]
    fn test_empty_input_is_empty_aggregate() {
        let result = aggregate(Vec::new());
        assert!(result.is_empty());
        assert!(result.orders.is_empty());
    }
}
