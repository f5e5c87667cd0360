//! 주문 행 필드 해석
//!
//! 엑셀 헤더가 업체마다 달라 같은 논리 필드가 여러 키로 들어온다.
//! 논리 필드마다 허용 키 목록을 순서대로 두고 "앞에서부터 찾고, 없으면 기본값"
//! 규칙 하나로 해석한다. 숫자는 관대하게 파싱하며 실패하면 다음 후보로 넘어간다.

use std::collections::HashMap;

use log::warn;
use serde_json::{Map, Value};

use crate::db::models::ProductRecord;

/// 순서가 유지되는 주문 행 페이로드 (알 수 없는 키도 그대로 보존)
pub type RowData = Map<String, Value>;

pub const MAPPING_CODE_KEYS: &[&str] = &["매핑코드", "mappingCode", "mapping_code", "상품코드", "productCode"];
pub const PRODUCT_NAME_KEYS: &[&str] = &["상품명", "productName", "product_name"];
/// 카탈로그 판매가보다 우선하는 명시적 공급가
pub const SUPPLY_PRICE_KEYS: &[&str] = &["공급가", "supplyPrice", "supply_price"];
/// 카탈로그에도 없을 때 쓰는 대체 가격 키
pub const SUPPLY_PRICE_FALLBACK_KEYS: &[&str] = &["판매가", "salePrice", "price", "결제금액"];
pub const QUANTITY_KEYS: &[&str] = &["수량", "quantity", "qty", "주문수량"];
pub const COST_PRICE_KEYS: &[&str] = &["원가", "costPrice", "cost_price", "매입가"];

pub const DEFAULT_QUANTITY: i64 = 1;
pub const DEFAULT_PRICE: i64 = 0;

/// 저장된 JSON 문자열을 행 페이로드로 변환. 깨진 행은 빈 페이로드로 취급한다.
pub fn parse_row_data(order_id: i64, raw: &str) -> RowData {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            warn!("주문 {} 행 데이터가 JSON 객체가 아님, 빈 행으로 처리", order_id);
            RowData::new()
        }
    }
}

/// 첫 번째로 존재하는 비어있지 않은 문자열 값
pub fn first_text(row: &RowData, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// 첫 번째로 파싱 가능한 숫자 값
pub fn first_number(row: &RowData, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| row.get(*key).and_then(parse_number))
}

/// 금액/수량으로 받아들이는 절댓값 상한. 넘는 값은 파싱 실패로 본다.
pub const MAX_ABS_NUMBER: i64 = 1_000_000_000_000;

/// 관대한 숫자 파싱: `"1,200"`, `" 3 "`, `"₩15,000"`, `"15000원"`, `1200.6` 모두 허용
///
/// 소수는 가장 가까운 정수로 반올림한다. 파싱할 수 없거나 `MAX_ABS_NUMBER`를
/// 넘으면 `None`.
pub fn parse_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => within_range(v),
            None => n.as_f64().and_then(round_within_range),
        },
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ',' && *c != '₩' && *c != '원')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            match cleaned.parse::<i64>() {
                Ok(v) => within_range(v),
                Err(_) => cleaned.parse::<f64>().ok().and_then(round_within_range),
            }
        }
        _ => None,
    }
}

fn within_range(value: i64) -> Option<i64> {
    (value.unsigned_abs() <= MAX_ABS_NUMBER as u64).then_some(value)
}

fn round_within_range(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    (rounded.abs() <= MAX_ABS_NUMBER as f64).then_some(rounded as i64)
}

/// 매핑코드 → 상품 조회표. 같은 코드가 여러 번 등록돼 있으면 먼저 등록된 상품을 쓴다.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_code: HashMap<String, ProductRecord>,
}

impl Catalog {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        let mut by_code = HashMap::with_capacity(products.len());
        for product in products {
            by_code.entry(product.mapping_code.clone()).or_insert(product);
        }
        Self { by_code }
    }

    pub fn get(&self, mapping_code: Option<&str>) -> Option<&ProductRecord> {
        mapping_code.and_then(|code| self.by_code.get(code))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
