//! 통합 테스트 공용 헬퍼
//!
//! 인메모리 SQLite는 커넥션마다 별도 DB이므로 풀 크기를 1로 고정한다.
//! 따라서 헬퍼는 커넥션을 잡은 채로 대사/조회를 호출하지 않는다.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use mall_settlement::db::models::{NewOrder, NewProduct, NewPromotion, SettlementRecord};
use mall_settlement::db::{
    init_database, MallRepository, OrderRepository, ProductRepository, PromotionRepository,
    SettlementRepository,
};
use mall_settlement::settlement::{SettlementKey, SettlementPeriod};

pub const COMPANY: i64 = 1;

pub async fn setup() -> SqlitePool {
    init_database("sqlite::memory:", 1)
        .await
        .expect("in-memory database")
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn day(s: &str) -> SettlementPeriod {
    SettlementPeriod::new(date(s), date(s)).unwrap()
}

pub fn key(mall_id: i64, period: SettlementPeriod) -> SettlementKey {
    SettlementKey {
        company_id: COMPANY,
        mall_id,
        period,
    }
}

pub async fn add_mall(pool: &SqlitePool, name: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    MallRepository::insert(&mut conn, COMPANY, name).await.unwrap()
}

pub async fn add_product(pool: &SqlitePool, code: &str, sale_price: i64, cost_price: i64) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    ProductRepository::insert(
        &mut conn,
        &NewProduct {
            company_id: COMPANY,
            mapping_code: code.into(),
            product_name: format!("상품 {}", code),
            sale_price: Some(sale_price),
            cost_price: Some(cost_price),
        },
    )
    .await
    .unwrap()
}

pub async fn add_order(pool: &SqlitePool, mall_id: i64, status: &str, created_at: &str, row: Value) -> i64 {
    add_company_order(pool, COMPANY, mall_id, status, created_at, row).await
}

pub async fn add_company_order(
    pool: &SqlitePool,
    company_id: i64,
    mall_id: i64,
    status: &str,
    created_at: &str,
    row: Value,
) -> i64 {
    let row_data = match row {
        Value::Object(map) => map,
        other => panic!("row must be an object: {}", other),
    };

    let mut conn = pool.acquire().await.unwrap();
    OrderRepository::insert(
        &mut conn,
        &NewOrder {
            company_id,
            mall_id: Some(mall_id),
            shop_name: Some(format!("매장-{}", mall_id)),
            status: status.into(),
            created_at: at(created_at),
            row_data,
        },
    )
    .await
    .unwrap()
}

pub async fn add_promotion(
    pool: &SqlitePool,
    mall_id: i64,
    code: &str,
    event_price: Option<i64>,
    discount_rate: Option<f64>,
    start: &str,
    end: &str,
) {
    let mut conn = pool.acquire().await.unwrap();
    PromotionRepository::upsert(
        &mut conn,
        &NewPromotion {
            mall_id,
            product_code: code.into(),
            discount_rate,
            event_price,
            start_date: date(start),
            end_date: date(end),
        },
    )
    .await
    .unwrap();
}

pub async fn settlement(pool: &SqlitePool, mall_id: i64, period: SettlementPeriod) -> Option<SettlementRecord> {
    let mut conn = pool.acquire().await.unwrap();
    SettlementRepository::find_by_key(&mut conn, &key(mall_id, period))
        .await
        .unwrap()
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

pub async fn execute(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}
